//! # engine_scene
//!
//! A small retained scene graph standing in for the rendering library.
//!
//! Nodes live in an arena keyed by [`NodeId`], hang off a single root, and may
//! carry a [`Mesh`]: one geometry plus one or more materials, each material
//! holding textures in well-known slots. Every geometry, material and texture
//! is counted by a shared [`ResourceTracker`], which makes leaked resources
//! observable in tests.
//!
//! [`Scene`] implements [`engine_resource::SceneGraph`], so nodes registered
//! with a [`engine_resource::CleanupRegistry`] are detached and released
//! through it.

pub mod error;
pub mod node;
pub mod resources;
pub mod scene;

pub use engine_resource::{NodeId, TextureSlot};
pub use error::SceneError;
pub use node::{Node, NodeAllocator, Transform};
pub use resources::{
    Geometry, LiveResources, MaterialSlot, Mesh, ResourceKind, ResourceTracker, StandardMaterial,
    Texture,
};
pub use scene::Scene;

// Re-export glam types for convenience.
pub use glam::{Mat4, Quat, Vec3, Vec4};
