//! What a component sees of its entity and the runtime while it initialises.

use std::cell::{Ref, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use engine_scene::Scene;

use crate::capability::Capability;
use crate::component::{Component, ComponentTypeId};
use crate::context::{RuntimeContext, ServiceLocator};
use crate::entity::{EntityId, Slot};
use crate::error::ComponentError;

/// A read-only view of an entity's components.
///
/// The component currently initialising is absent from the view; every
/// other attached component is visible, initialised or not.
#[derive(Clone, Copy)]
pub struct EntityView<'a> {
    id: &'a EntityId,
    category: Option<&'a str>,
    slots: &'a HashMap<ComponentTypeId, Slot>,
    order: &'a [ComponentTypeId],
}

impl<'a> EntityView<'a> {
    pub(crate) fn new(
        id: &'a EntityId,
        category: Option<&'a str>,
        slots: &'a HashMap<ComponentTypeId, Slot>,
        order: &'a [ComponentTypeId],
    ) -> Self {
        Self {
            id,
            category,
            slots,
            order,
        }
    }

    /// The entity id.
    #[must_use]
    pub fn id(&self) -> &'a EntityId {
        self.id
    }

    /// The entity's category tag.
    #[must_use]
    pub fn category(&self) -> Option<&'a str> {
        self.category
    }

    /// The component of type `T`, if attached and visible.
    #[must_use]
    pub fn get_component<T: Component>(&self) -> Option<&'a T> {
        self.slots
            .get(&T::component_type_id())?
            .component()?
            .downcast_ref::<T>()
    }

    /// Whether a component of type `T` is visible. The component currently
    /// initialising is not.
    #[must_use]
    pub fn has_component<T: Component>(&self) -> bool {
        self.slots
            .get(&T::component_type_id())
            .and_then(Slot::component)
            .is_some()
    }

    /// The visible component declaring `capability` that initialises first:
    /// lowest priority, then earliest attached.
    #[must_use]
    pub fn find_by_capability(&self, capability: Capability) -> Option<&'a dyn Component> {
        let slots = self.slots;
        self.order
            .iter()
            .filter_map(|type_id| slots.get(type_id))
            .filter(|slot| {
                slot.component()
                    .is_some_and(|component| component.has_capability(capability))
            })
            .min_by_key(|slot| slot.priority())
            .and_then(Slot::component)
    }

    /// Like [`find_by_capability`](Self::find_by_capability), but missing is
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::MissingCapability`] naming the entity and
    /// the capability.
    pub fn require_by_capability(
        &self,
        capability: Capability,
    ) -> Result<&'a dyn Component, ComponentError> {
        self.find_by_capability(capability)
            .ok_or_else(|| ComponentError::MissingCapability {
                entity: self.id.clone(),
                capability,
                requester: None,
            })
    }

    /// Visible components in attach order.
    pub fn components(&self) -> impl Iterator<Item = &'a dyn Component> + 'a {
        let slots = self.slots;
        self.order
            .iter()
            .filter_map(move |type_id| slots.get(type_id)?.component())
    }
}

impl std::fmt::Debug for EntityView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityView")
            .field("id", self.id)
            .field("category", &self.category)
            .field("components", &self.order.len())
            .finish()
    }
}

/// Passed to [`Component::init`].
///
/// Lookups made through the context name the requesting component in their
/// errors.
pub struct InitContext<'a> {
    entity: EntityView<'a>,
    requester: &'static str,
    runtime: &'a Rc<RuntimeContext>,
}

impl<'a> InitContext<'a> {
    pub(crate) fn new(
        entity: EntityView<'a>,
        requester: &'static str,
        runtime: &'a Rc<RuntimeContext>,
    ) -> Self {
        Self {
            entity,
            requester,
            runtime,
        }
    }

    /// The owning entity.
    #[must_use]
    pub fn entity(&self) -> EntityView<'a> {
        self.entity
    }

    /// The id of the owning entity.
    #[must_use]
    pub fn entity_id(&self) -> &'a EntityId {
        self.entity.id()
    }

    /// The type name of the component being initialised.
    #[must_use]
    pub fn requester(&self) -> &'static str {
        self.requester
    }

    /// The shared runtime context.
    #[must_use]
    pub fn runtime(&self) -> &'a RuntimeContext {
        self.runtime
    }

    /// A handle to the runtime context a component may keep past init.
    #[must_use]
    pub fn runtime_handle(&self) -> Rc<RuntimeContext> {
        Rc::clone(self.runtime)
    }

    /// Borrow the scene. Do not hold across an `.await`.
    #[must_use]
    pub fn scene(&self) -> Ref<'a, Scene> {
        self.runtime.scene()
    }

    /// Borrow the scene mutably. Do not hold across an `.await`.
    #[must_use]
    pub fn scene_mut(&self) -> RefMut<'a, Scene> {
        self.runtime.scene_mut()
    }

    /// Named external systems.
    #[must_use]
    pub fn services(&self) -> &'a ServiceLocator {
        self.runtime.services()
    }

    /// The component of type `T` on the same entity.
    #[must_use]
    pub fn get_component<T: Component>(&self) -> Option<&'a T> {
        self.entity.get_component::<T>()
    }

    /// The component of type `T` on the same entity.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::MissingComponent`] naming the entity, this
    /// component, and `T`.
    pub fn require_component<T: Component>(&self) -> Result<&'a T, ComponentError> {
        self.get_component::<T>()
            .ok_or_else(|| ComponentError::MissingComponent {
                entity: self.entity.id().clone(),
                requester: self.requester,
                component: T::type_name(),
            })
    }

    /// Fail if a component of type `T` is attached to the same entity.
    ///
    /// Call this before allocating anything so a violation leaves nothing to
    /// clean up.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::IncompatibleComponents`].
    pub fn restrict_component<T: Component>(
        &self,
        reason: Option<&str>,
    ) -> Result<(), ComponentError> {
        if self.entity.has_component::<T>() {
            return Err(ComponentError::IncompatibleComponents {
                entity: self.entity.id().clone(),
                requester: self.requester,
                conflicting: T::type_name(),
                reason: reason.map(str::to_string),
            });
        }
        Ok(())
    }

    /// The first component on the same entity declaring `capability`.
    #[must_use]
    pub fn find_by_capability(&self, capability: Capability) -> Option<&'a dyn Component> {
        self.entity.find_by_capability(capability)
    }

    /// The first component on the same entity declaring `capability`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::MissingCapability`] naming the entity, the
    /// capability and this component.
    pub fn require_by_capability(
        &self,
        capability: Capability,
    ) -> Result<&'a dyn Component, ComponentError> {
        self.find_by_capability(capability)
            .ok_or_else(|| ComponentError::MissingCapability {
                entity: self.entity.id().clone(),
                capability,
                requester: Some(self.requester),
            })
    }
}

impl std::fmt::Debug for InitContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitContext")
            .field("entity", &self.entity)
            .field("requester", &self.requester)
            .finish_non_exhaustive()
    }
}
