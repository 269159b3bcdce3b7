//! # engine_resource
//!
//! Resource ownership primitives for the component runtime.
//!
//! This crate provides:
//!
//! - [`Disposable`]: the contract for anything holding an explicitly
//!   released resource.
//! - [`SceneGraph`]: the narrow interface the runtime needs from the scene
//!   library: detach, depth-first traversal, and access to renderable slots.
//! - [`CleanupRegistry`]: a per-owner ledger of watchers, scene nodes and
//!   disposables, flushed in a single pass on teardown.
//! - [`DisposeError`]: errors raised while releasing a resource.

pub mod disposable;
pub mod error;
pub mod registry;
pub mod scene;

pub use disposable::{Disposable, StopHandle};
pub use error::DisposeError;
pub use registry::{CleanupRegistry, CleanupReport, RegisteredCount};
pub use scene::{Material, NodeId, Renderable, SceneGraph, TextureSlot};
