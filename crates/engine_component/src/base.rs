//! [`ComponentCore`]: the state every component embeds.

use std::cell::OnceCell;

use engine_resource::CleanupRegistry;
use tracing::warn;

use crate::capability::{Capability, CapabilitySet};
use crate::component::Priority;
use crate::entity::EntityId;

/// Priority, capabilities, owner and cleanup ledger of one component.
///
/// Build it in the component's constructor:
///
/// ```rust
/// use engine_component::{Capability, ComponentCore, Priority};
///
/// const ANIMATED: Capability = Capability::new("animated");
///
/// let core = ComponentCore::new()
///     .with_priority(Priority::new(100))
///     .with_capability(ANIMATED);
/// assert!(core.has_capability(ANIMATED));
/// ```
#[derive(Debug, Default)]
pub struct ComponentCore {
    priority: Priority,
    capabilities: CapabilitySet,
    owner: OnceCell<EntityId>,
    registry: CleanupRegistry,
}

impl ComponentCore {
    /// Default priority, no capabilities, not attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the init priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Declare a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.register_capability(capability);
        self
    }

    /// Declare a capability. Only honoured before the component is attached;
    /// afterwards the set is frozen and this logs a warning.
    ///
    /// Returns `true` if the capability was added.
    pub fn register_capability(&mut self, capability: Capability) -> bool {
        if let Some(owner) = self.owner.get() {
            warn!(
                entity = %owner,
                %capability,
                "capabilities are frozen once a component is attached"
            );
            return false;
        }
        self.capabilities.insert(capability)
    }

    /// Whether `capability` was declared.
    #[must_use]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// All declared capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// The init priority.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// The owning entity, once attached.
    #[must_use]
    pub fn owner(&self) -> Option<&EntityId> {
        self.owner.get()
    }

    /// Whether the component has been attached to an entity.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.owner.get().is_some()
    }

    /// The component's private cleanup ledger.
    #[must_use]
    pub fn registry(&self) -> &CleanupRegistry {
        &self.registry
    }

    /// The component's private cleanup ledger, mutably. Register everything
    /// the component allocates here.
    pub fn registry_mut(&mut self) -> &mut CleanupRegistry {
        &mut self.registry
    }

    /// Record the owning entity. The owner can be set only once.
    pub(crate) fn attach_to(&self, owner: &EntityId) -> bool {
        match self.owner.set(owner.clone()) {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    entity = %owner,
                    previous = ?self.owner.get(),
                    "component already has an owner"
                );
                false
            }
        }
    }
}
