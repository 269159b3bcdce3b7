//! Core [`Component`] trait and type identity.
//!
//! A component is an independently authored unit of behavior. It embeds a
//! [`ComponentCore`], is attached to exactly one [`Entity`](crate::Entity),
//! and goes through three hooks:
//!
//! 1. [`Component::init`]: once, in ascending [`Priority`] order, possibly
//!    awaiting resource loads.
//! 2. [`Component::update`]: once per frame after the entity initialised.
//! 3. [`Component::destroy`]: once on teardown; flushes the component's
//!    cleanup registry.
//!
//! ## Type Identity
//!
//! Entities key components by [`ComponentTypeId`], the FNV-1a 64-bit hash of
//! [`Component::type_name`]. The default name is the fully qualified Rust
//! type path, so two distinct types never share a key unless one overrides
//! `type_name` on purpose.

use std::any::Any;

use async_trait::async_trait;
use engine_scene::Scene;
use tracing::warn;

use crate::base::ComponentCore;
use crate::capability::Capability;
use crate::error::ComponentError;
use crate::view::InitContext;

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// FNV-1a 64-bit hash of `name`'s UTF-8 bytes.
pub(crate) const fn fnv1a(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// A unique identifier for a component type, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// Compute the id for a component name.
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        Self(fnv1a(name))
    }

    /// Compute the id for a Rust component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        T::component_type_id()
    }
}

/// Initialisation tier. Lower tiers initialise first.
///
/// A component that depends on the output of another declares a higher
/// priority than the component it depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(pub i32);

impl Priority {
    /// Tier `0`, used when a component declares nothing. Negative tiers
    /// initialise before it.
    pub const DEFAULT: Priority = Priority(0);

    /// Create a priority from a raw tier.
    #[must_use]
    pub const fn new(tier: i32) -> Self {
        Self(tier)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upcast to [`Any`] for downcasting trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The core component trait.
///
/// Only [`Component::core`], [`Component::core_mut`] and
/// [`Component::init`] are required; the remaining hooks default to no-ops
/// (or, for `destroy`, to flushing the component's registry).
///
/// Init futures are not `Send`: the runtime is single-threaded and
/// components may hold `Rc` handles across awaits. Never hold a scene borrow
/// across an `.await`.
#[async_trait(?Send)]
pub trait Component: AsAny + 'static {
    /// A human-readable, unique name for this component type.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Returns the [`ComponentTypeId`] keying this type inside an entity.
    fn component_type_id() -> ComponentTypeId
    where
        Self: Sized,
    {
        ComponentTypeId::from_name(Self::type_name())
    }

    /// The embedded component state.
    fn core(&self) -> &ComponentCore;

    /// The embedded component state, mutably.
    fn core_mut(&mut self) -> &mut ComponentCore;

    /// Allocate resources and resolve dependencies.
    ///
    /// Every component with a lower priority has completed its own init by
    /// the time this runs and can be queried through `cx`.
    ///
    /// # Errors
    ///
    /// Any error aborts the entity's init pass and propagates to its caller.
    async fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), ComponentError>;

    /// Per-frame hook. `delta` is the frame time in seconds.
    fn update(&mut self, _delta: f64) {}

    /// Release everything this component owns.
    ///
    /// Implementations that override this must still flush
    /// [`ComponentCore::registry_mut`], or registered resources leak.
    fn destroy(&mut self, scene: &mut Scene) {
        let report = self.core_mut().registry_mut().cleanup(scene);
        if !report.is_clean() {
            warn!(
                owner = ?self.core().owner(),
                failures = report.failures,
                "component teardown finished with failures"
            );
        }
    }

    /// The interface advertised under `capability`, if this component
    /// implements one. Consumers downcast it with
    /// [`interface_as`](trait.Component.html#method.interface_as).
    fn interface(&self, _capability: Capability) -> Option<&dyn Any> {
        None
    }
}

impl<'c> dyn Component + 'c {
    /// Downcast to the concrete component type.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcast to the concrete component type, mutably.
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Whether the concrete type is `T`.
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Whether this component declared `capability`.
    #[must_use]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.core().has_capability(capability)
    }

    /// The interface behind `capability`, downcast to `T`.
    #[must_use]
    pub fn interface_as<T: Any>(&self, capability: Capability) -> Option<&T> {
        self.interface(capability)?.downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Health {
        core: ComponentCore,
    }

    #[async_trait(?Send)]
    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }

        fn core(&self) -> &ComponentCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut ComponentCore {
            &mut self.core
        }

        async fn init(&mut self, _cx: &mut InitContext<'_>) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    struct Velocity {
        core: ComponentCore,
    }

    #[async_trait(?Send)]
    impl Component for Velocity {
        fn core(&self) -> &ComponentCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut ComponentCore {
            &mut self.core
        }

        async fn init(&mut self, _cx: &mut InitContext<'_>) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    #[test]
    fn test_component_type_id_is_stable() {
        assert_eq!(Health::component_type_id(), Health::component_type_id());
        assert_eq!(ComponentTypeId::of::<Health>(), Health::component_type_id());
    }

    #[test]
    fn test_component_type_id_matches_from_name() {
        assert_eq!(
            Health::component_type_id(),
            ComponentTypeId::from_name("Health")
        );
    }

    #[test]
    fn test_default_type_name_is_rust_path() {
        assert!(Velocity::type_name().ends_with("Velocity"));
        assert_ne!(Health::component_type_id(), Velocity::component_type_id());
    }

    #[test]
    fn test_fnv1a_known_vector() {
        // FNV-1a 64-bit of the empty string is the offset basis itself.
        assert_eq!(ComponentTypeId::from_name(""), ComponentTypeId(FNV_OFFSET_BASIS));
    }

    #[test]
    fn test_priority_ordering() {
        assert_eq!(Priority::default(), Priority::DEFAULT);
        assert!(Priority::new(1) < Priority::new(100));
        assert!(Priority::new(-5) < Priority::DEFAULT);
    }

    #[test]
    fn test_downcast_through_trait_object() {
        let mut boxed: Box<dyn Component> = Box::new(Health {
            core: ComponentCore::new(),
        });
        assert!(boxed.is::<Health>());
        assert!(boxed.downcast_ref::<Velocity>().is_none());
        assert!(boxed.downcast_mut::<Health>().is_some());
    }
}
