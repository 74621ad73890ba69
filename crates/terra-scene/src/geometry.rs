//! Icosahedron-based sphere geometry with equirectangular UVs.
//!
//! Each of the 20 icosahedron faces is split into a triangular grid with
//! `detail + 1` segments per edge and every vertex is pushed out to the
//! sphere. Vertices are not shared between triangles so the UV seam can be
//! fixed per triangle.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

/// Triangle soup on a sphere, ready for upload.
#[derive(Clone, Debug)]
pub struct SphereGeometry {
    pub radius: f32,
    pub detail: u32,
    pub positions: Vec<Vec3>,
    /// Unit normals (the normalized positions).
    pub normals: Vec<Vec3>,
    /// Texture coordinates with `v = 0` at the north pole. `u` may exceed 1
    /// on triangles that straddle the seam, so samplers must repeat.
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl SphereGeometry {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

const FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

fn base_vertices() -> [Vec3; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
}

/// Build a sphere of `radius` from an icosahedron subdivided at `detail`.
///
/// Detail 0 is the bare icosahedron (20 triangles); detail `d` yields
/// `20 * (d + 1)^2` triangles.
pub fn icosahedron(radius: f32, detail: u32) -> SphereGeometry {
    let corners = base_vertices();
    let segments = detail as usize + 1;
    let mut triangles: Vec<[Vec3; 3]> = Vec::with_capacity(20 * segments * segments);

    for face in FACES {
        let (a, b, c) = (corners[face[0]], corners[face[1]], corners[face[2]]);
        subdivide_face(a, b, c, segments, &mut triangles);
    }

    let mut positions = Vec::with_capacity(triangles.len() * 3);
    let mut normals = Vec::with_capacity(triangles.len() * 3);
    let mut uvs = Vec::with_capacity(triangles.len() * 3);

    for tri in &triangles {
        let unit = tri.map(|p| p.normalize());
        let centroid = (unit[0] + unit[1] + unit[2]) / 3.0;
        let mut tri_uvs = unit.map(|n| {
            // Pole vertices have no azimuth of their own.
            let u = if n.x.abs() < 1e-6 && n.z.abs() < 1e-6 {
                azimuth_u(centroid)
            } else {
                azimuth_u(n)
            };
            Vec2::new(u, 0.5 - n.y.clamp(-1.0, 1.0).asin() / PI)
        });
        fix_seam(&mut tri_uvs);

        for i in 0..3 {
            positions.push(unit[i] * radius);
            normals.push(unit[i]);
            uvs.push(tri_uvs[i]);
        }
    }

    let indices = (0..positions.len() as u32).collect();

    SphereGeometry {
        radius,
        detail,
        positions,
        normals,
        uvs,
        indices,
    }
}

/// Split triangle `abc` into a grid of `segments^2` triangles, keeping the
/// winding of the input.
fn subdivide_face(a: Vec3, b: Vec3, c: Vec3, segments: usize, out: &mut Vec<[Vec3; 3]>) {
    // rows[i][j]: i steps from edge ab toward c, j steps along the row.
    let mut rows: Vec<Vec<Vec3>> = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let start = a.lerp(c, t);
        let end = b.lerp(c, t);
        let count = segments - i;
        if count == 0 {
            rows.push(vec![start]);
            continue;
        }
        rows.push(
            (0..=count)
                .map(|j| start.lerp(end, j as f32 / count as f32))
                .collect(),
        );
    }

    for i in 0..segments {
        let width = segments - i;
        for j in 0..width {
            out.push([rows[i][j], rows[i][j + 1], rows[i + 1][j]]);
            if j + 1 < width {
                out.push([rows[i][j + 1], rows[i + 1][j + 1], rows[i + 1][j]]);
            }
        }
    }
}

fn azimuth_u(n: Vec3) -> f32 {
    n.z.atan2(-n.x) / TAU + 0.5
}

/// Triangles spanning the u wrap get their low coordinates pushed past 1.
fn fix_seam(uvs: &mut [Vec2; 3]) {
    let max = uvs.iter().map(|uv| uv.x).fold(f32::MIN, f32::max);
    let min = uvs.iter().map(|uv| uv.x).fold(f32::MAX, f32::min);
    if max - min > 0.5 {
        for uv in uvs.iter_mut() {
            if uv.x < 0.5 {
                uv.x += 1.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_zero_is_icosahedron() {
        let g = icosahedron(1.0, 0);
        assert_eq!(g.triangle_count(), 20);
    }

    #[test]
    fn test_triangle_count_grows_quadratically() {
        for detail in [1, 3, 12] {
            let g = icosahedron(1.0, detail);
            let segments = (detail + 1) as usize;
            assert_eq!(g.triangle_count(), 20 * segments * segments);
            assert_eq!(g.positions.len(), g.indices.len());
        }
    }

    #[test]
    fn test_vertices_on_sphere() {
        let g = icosahedron(2.5, 4);
        for p in &g.positions {
            assert!((p.length() - 2.5).abs() < 1e-4, "length = {}", p.length());
        }
        for n in &g.normals {
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_winding_faces_outward() {
        let g = icosahedron(1.0, 2);
        for tri in g.positions.chunks(3) {
            let normal = (tri[1] - tri[0]).cross(tri[2] - tri[0]);
            let center = (tri[0] + tri[1] + tri[2]) / 3.0;
            assert!(normal.dot(center) > 0.0, "inward-facing triangle");
        }
    }

    #[test]
    fn test_uv_ranges() {
        let g = icosahedron(1.0, 6);
        for uv in &g.uvs {
            assert!((0.0..1.5).contains(&uv.x), "u = {}", uv.x);
            assert!((0.0..=1.0).contains(&uv.y), "v = {}", uv.y);
        }
    }

    #[test]
    fn test_no_triangle_spans_the_seam() {
        let g = icosahedron(1.0, 5);
        for tri in g.uvs.chunks(3) {
            let max = tri.iter().map(|uv| uv.x).fold(f32::MIN, f32::max);
            let min = tri.iter().map(|uv| uv.x).fold(f32::MAX, f32::min);
            assert!(max - min < 0.5, "seam span {min}..{max}");
        }
    }

    #[test]
    fn test_north_pole_maps_to_top_row() {
        let g = icosahedron(1.0, 3);
        let top = g
            .positions
            .iter()
            .zip(&g.uvs)
            .max_by(|a, b| a.0.y.total_cmp(&b.0.y))
            .unwrap();
        assert!(top.1.y < 0.2);
    }
}
