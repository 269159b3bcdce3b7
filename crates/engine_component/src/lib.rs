//! # engine_component
//!
//! The composition runtime: independently authored components attach to
//! entities, initialise in priority order against a shared
//! [`RuntimeContext`], find one another through capability tags, and release
//! everything they own on teardown.
//!
//! This crate provides:
//!
//! - [`Component`] trait: lifecycle hooks every behavior unit implements.
//! - [`ComponentCore`]: the state every component embeds: priority,
//!   capabilities, owner, and a private [`CleanupRegistry`].
//! - [`Capability`]: opaque tokens advertising an interface.
//! - [`Entity`]: the container that orchestrates init, update and destroy.
//! - [`InitContext`] / [`EntityView`]: what a component sees while it
//!   initialises.
//! - [`RuntimeContext`] / [`ServiceLocator`]: shared services injected at
//!   init.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use engine_component::{
//!     Capability, Component, ComponentCore, ComponentError, Entity, InitContext, RuntimeContext,
//! };
//! use engine_scene::Scene;
//!
//! const HEALTH: Capability = Capability::new("health");
//!
//! struct Health {
//!     core: ComponentCore,
//!     hit_points: u32,
//! }
//!
//! #[async_trait(?Send)]
//! impl Component for Health {
//!     fn core(&self) -> &ComponentCore { &self.core }
//!     fn core_mut(&mut self) -> &mut ComponentCore { &mut self.core }
//!
//!     async fn init(&mut self, _cx: &mut InitContext<'_>) -> Result<(), ComponentError> {
//!         self.hit_points = 100;
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> Result<(), ComponentError> {
//! let context = RuntimeContext::new(Scene::new()).into_shared();
//! let mut entity = Entity::new("player-1");
//! entity.attach(Health {
//!     core: ComponentCore::new().with_capability(HEALTH),
//!     hit_points: 0,
//! });
//! entity.init(context).await?;
//! assert!(entity.find_by_capability(HEALTH).is_some());
//! entity.destroy();
//! # Ok(())
//! # }
//! ```
//!
//! [`CleanupRegistry`]: engine_resource::CleanupRegistry

pub mod base;
pub mod capability;
pub mod component;
pub mod context;
pub mod entity;
pub mod error;
pub mod view;

pub use base::ComponentCore;
pub use capability::{Capability, CapabilitySet};
pub use component::{AsAny, Component, ComponentTypeId, Priority};
pub use context::{RuntimeContext, ServiceLocator};
pub use entity::{Entity, EntityId};
pub use error::ComponentError;
pub use view::{EntityView, InitContext};
