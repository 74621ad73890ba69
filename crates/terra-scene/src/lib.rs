//! GPU-free scene model for the Terra viewer.
//!
//! Holds the scene graph with its transforms, materials and shared sphere
//! geometry, plus the motion model: the orbit function that places the Moon
//! and the per-frame [`Animator`] that spins the Earth layers and the
//! starfield. Nothing in here touches the GPU, so the motion rules can be
//! tested directly.

pub mod animation;
pub mod color;
pub mod earth;
pub mod geometry;
pub mod graph;
pub mod light;
pub mod material;
pub mod orbit;
pub mod starfield;

pub use animation::{Animator, FrameInput, FrameOutcome, SpinAngles, SpinRates};
pub use color::Color;
pub use earth::{EarthScene, SceneHandles};
pub use geometry::{SphereGeometry, icosahedron};
pub use graph::{GeometryId, Mesh, Node, NodeId, NodeKind, SceneError, SceneGraph, Transform};
pub use light::DirectionalLight;
pub use material::{
    BasicMaterial, Blending, FresnelMaterial, Material, PhongMaterial, RenderPhase,
    StandardMaterial,
};
pub use orbit::{OrbitParams, orbit_body, orbit_position};
pub use starfield::{Star, Starfield, StarfieldGenerator};
