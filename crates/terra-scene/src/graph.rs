//! Scene graph: owned nodes with local transforms, addressed by [`NodeId`].
//!
//! Nodes live in a flat arena. A node has at most one parent; attaching it
//! somewhere else detaches it from the previous parent first. Removed slots
//! are never reused, so a stale handle reports [`SceneError::UnknownNode`]
//! instead of silently pointing at a different node.

use glam::{Mat4, Quat, Vec3};

use crate::geometry::SphereGeometry;
use crate::light::DirectionalLight;
use crate::material::Material;
use crate::starfield::Starfield;

/// Handle to a node in a [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena slot of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a geometry shared between meshes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(usize);

/// Errors from scene graph lookups and edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The handle does not refer to a live node.
    #[error("scene node {0:?} does not exist")]
    UnknownNode(NodeId),

    /// The geometry handle is not registered with this graph.
    #[error("geometry {0:?} does not exist")]
    UnknownGeometry(GeometryId),

    /// Attaching would make a node its own ancestor.
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    /// The root node cannot be removed or re-parented.
    #[error("the scene root cannot be detached")]
    RootLocked,

    /// The node exists but does not carry the expected payload.
    #[error("scene node {0:?} has an unexpected kind")]
    WrongKind(NodeId),
}

/// Local position, Euler rotation (XYZ order, radians) and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Rotation as a quaternion, applying X then Y then Z in the parent frame
    /// order `Rx * Ry * Rz`.
    pub fn quat(&self) -> Quat {
        Quat::from_rotation_x(self.rotation.x)
            * Quat::from_rotation_y(self.rotation.y)
            * Quat::from_rotation_z(self.rotation.z)
    }

    /// Local matrix `T * R * S`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

/// A drawable mesh: shared geometry plus its own material.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub geometry: GeometryId,
    pub material: Material,
}

/// What a node carries besides its transform.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    Points(Starfield),
    DirectionalLight(DirectionalLight),
}

/// A node in the scene graph.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena-backed scene graph with a single root group.
#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: Vec<Option<Node>>,
    geometries: Vec<SphereGeometry>,
    root: NodeId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// A graph holding only the root group.
    pub fn new() -> Self {
        let root = Node {
            name: "scene".to_string(),
            transform: Transform::default(),
            kind: NodeKind::Group,
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![Some(root)],
            geometries: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes. The root counts, so this is never zero.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Register a geometry so meshes can share it.
    pub fn add_geometry(&mut self, geometry: SphereGeometry) -> GeometryId {
        self.geometries.push(geometry);
        GeometryId(self.geometries.len() - 1)
    }

    pub fn geometry(&self, id: GeometryId) -> Result<&SphereGeometry, SceneError> {
        self.geometries
            .get(id.0)
            .ok_or(SceneError::UnknownGeometry(id))
    }

    /// All registered geometries with their handles.
    pub fn geometries(&self) -> impl Iterator<Item = (GeometryId, &SphereGeometry)> {
        self.geometries
            .iter()
            .enumerate()
            .map(|(i, g)| (GeometryId(i), g))
    }

    /// Create a node under `parent`.
    pub fn add(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
        transform: Transform,
    ) -> Result<NodeId, SceneError> {
        if let NodeKind::Mesh(mesh) = &kind {
            self.geometry(mesh.geometry)?;
        }
        self.node(parent)?;

        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            name: name.into(),
            transform,
            kind,
            parent: Some(parent),
            children: Vec::new(),
        }));
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Move `child` under `parent`, detaching it from its current parent.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if child == self.root {
            return Err(SceneError::RootLocked);
        }
        self.node(child)?;
        if self.is_ancestor_or_self(child, parent)? {
            return Err(SceneError::Cycle { parent, child });
        }

        if let Some(old_parent) = self.node(child)?.parent {
            self.node_mut(old_parent)?.children.retain(|&c| c != child);
        }
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Remove a node and its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root {
            return Err(SceneError::RootLocked);
        }
        if let Some(parent) = self.node(id)?.parent {
            self.node_mut(parent)?.children.retain(|&c| c != id);
        }

        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next.0).and_then(Option::take) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(SceneError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SceneError::UnknownNode(id))
    }

    pub fn transform(&self, id: NodeId) -> Result<&Transform, SceneError> {
        Ok(&self.node(id)?.transform)
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Result<&mut Transform, SceneError> {
        Ok(&mut self.node_mut(id)?.transform)
    }

    /// World matrix: product of every ancestor's local matrix, root first.
    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let mut matrix = Mat4::IDENTITY;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            matrix = node.transform.matrix() * matrix;
            cursor = node.parent;
        }
        Ok(matrix)
    }

    /// World-space origin of a node.
    pub fn world_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.world_matrix(id)?.transform_point3(Vec3::ZERO))
    }

    /// Live nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, of: NodeId) -> Result<bool, SceneError> {
        let mut cursor = Some(of);
        while let Some(current) = cursor {
            if current == candidate {
                return Ok(true);
            }
            cursor = self.node(current)?.parent;
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn vec_close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_new_graph_has_root_only() {
        let graph = SceneGraph::new();
        assert_eq!(graph.node_count(), 1);
        assert!(graph.node(graph.root()).unwrap().parent().is_none());
    }

    #[test]
    fn test_add_links_parent_and_child() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let group = graph
            .add(root, "group", NodeKind::Group, Transform::default())
            .unwrap();
        assert_eq!(graph.node(group).unwrap().parent(), Some(root));
        assert_eq!(graph.node(root).unwrap().children(), &[group]);
    }

    #[test]
    fn test_euler_order_matches_x_then_y_then_z() {
        let t = Transform {
            rotation: Vec3::new(0.3, 0.7, -0.4),
            ..Transform::default()
        };
        let expected =
            Mat4::from_rotation_x(0.3) * Mat4::from_rotation_y(0.7) * Mat4::from_rotation_z(-0.4);
        let actual = t.matrix();
        for col in 0..4 {
            assert!((actual.col(col) - expected.col(col)).length() < 1e-5);
        }
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let parent = graph
            .add(
                root,
                "parent",
                NodeKind::Group,
                Transform {
                    position: Vec3::new(1.0, 0.0, 0.0),
                    rotation: Vec3::new(0.0, FRAC_PI_2, 0.0),
                    ..Transform::default()
                },
            )
            .unwrap();
        let child = graph
            .add(
                parent,
                "child",
                NodeKind::Group,
                Transform {
                    position: Vec3::new(0.0, 0.0, 2.0),
                    ..Transform::default()
                },
            )
            .unwrap();
        // +Z rotated a quarter turn about Y becomes +X.
        assert!(vec_close(
            graph.world_position(child).unwrap(),
            Vec3::new(3.0, 0.0, 0.0)
        ));
    }

    #[test]
    fn test_attach_reparents() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph.add(root, "a", NodeKind::Group, Transform::default()).unwrap();
        let b = graph.add(a, "b", NodeKind::Group, Transform::default()).unwrap();

        graph.attach(root, b).unwrap();
        assert_eq!(graph.node(b).unwrap().parent(), Some(root));
        assert!(graph.node(a).unwrap().children().is_empty());
        assert_eq!(graph.node(root).unwrap().children(), &[a, b]);
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph.add(root, "a", NodeKind::Group, Transform::default()).unwrap();
        let b = graph.add(a, "b", NodeKind::Group, Transform::default()).unwrap();
        assert_eq!(
            graph.attach(b, a),
            Err(SceneError::Cycle {
                parent: b,
                child: a
            })
        );
        assert_eq!(
            graph.attach(a, a),
            Err(SceneError::Cycle {
                parent: a,
                child: a
            })
        );
    }

    #[test]
    fn test_root_is_locked() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph.add(root, "a", NodeKind::Group, Transform::default()).unwrap();
        assert_eq!(graph.attach(a, root), Err(SceneError::RootLocked));
        assert_eq!(graph.remove(root), Err(SceneError::RootLocked));
    }

    #[test]
    fn test_remove_invalidates_subtree_handles() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph.add(root, "a", NodeKind::Group, Transform::default()).unwrap();
        let b = graph.add(a, "b", NodeKind::Group, Transform::default()).unwrap();

        graph.remove(a).unwrap();
        assert_eq!(graph.node(a).unwrap_err(), SceneError::UnknownNode(a));
        assert_eq!(graph.transform_mut(b).unwrap_err(), SceneError::UnknownNode(b));
        assert!(graph.node(root).unwrap().children().is_empty());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_mesh_requires_registered_geometry() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let bogus = GeometryId(3);
        let kind = NodeKind::Mesh(Mesh {
            geometry: bogus,
            material: Material::Basic(crate::material::BasicMaterial::default()),
        });
        assert_eq!(
            graph.add(root, "m", kind, Transform::default()).unwrap_err(),
            SceneError::UnknownGeometry(bogus)
        );
    }
}
