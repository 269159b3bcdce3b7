//! The [`Entity`] container.
//!
//! An entity is an addressable bag of components, at most one per concrete
//! type. It owns its components outright; a component only remembers the
//! id of the entity it was attached to.
//!
//! ## Lifecycle
//!
//! 1. [`Entity::attach`] components (chaining).
//! 2. [`Entity::init`] awaits each component's init in ascending priority.
//! 3. [`Entity::update`] once per frame.
//! 4. [`Entity::destroy`] runs every started component's destroy hook in
//!    reverse priority order and drops the components.

use std::collections::HashMap;
use std::rc::Rc;

use engine_scene::Scene;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::capability::Capability;
use crate::component::{Component, ComponentTypeId, Priority};
use crate::context::RuntimeContext;
use crate::error::ComponentError;
use crate::view::{EntityView, InitContext};

/// A stable, human-readable entity identifier (e.g. `"tree-1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where a component is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    /// Attached, init not yet attempted.
    Attached,
    /// Init began but did not complete successfully.
    Started,
    /// Init completed.
    Ready,
}

/// One attached component.
pub(crate) struct Slot {
    name: &'static str,
    priority: Priority,
    stage: Stage,
    /// `None` only while the component's own init is running.
    component: Option<Box<dyn Component>>,
}

impl Slot {
    pub(crate) fn component(&self) -> Option<&dyn Component> {
        self.component.as_deref()
    }

    pub(crate) fn priority(&self) -> Priority {
        self.priority
    }
}

/// An addressable container of components.
pub struct Entity {
    id: EntityId,
    category: Option<String>,
    slots: HashMap<ComponentTypeId, Slot>,
    /// Attach order.
    order: Vec<ComponentTypeId>,
    initialized: bool,
    context: Option<Rc<RuntimeContext>>,
}

impl Entity {
    /// Create an empty entity.
    #[must_use]
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            category: None,
            slots: HashMap::new(),
            order: Vec::new(),
            initialized: false,
            context: None,
        }
    }

    /// Create an empty entity with a random id.
    #[must_use]
    pub fn with_generated_id() -> Self {
        Self::new(EntityId::generate())
    }

    /// Tag the entity with a category (e.g. `"prop"`, `"player"`).
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The entity id.
    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// The category tag.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Whether [`Entity::init`] completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of attached components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no component is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The context retained since init, if any.
    #[must_use]
    pub fn context(&self) -> Option<&Rc<RuntimeContext>> {
        self.context.as_ref()
    }

    /// Attach `component`, keyed by its concrete type.
    ///
    /// Attaching a type that is already present replaces the previous
    /// instance with a warning. A previous instance whose init had started,
    /// as after a failed pass, is destroyed first. Once the entity is
    /// initialised, attaching is a logged no-op and `component` is dropped
    /// without ever initialising.
    pub fn attach<T: Component>(&mut self, component: T) -> &mut Self {
        let type_id = T::component_type_id();
        let name = T::type_name();

        if self.initialized {
            warn!(
                entity = %self.id,
                component = name,
                "entity already initialized; attached component will never initialize"
            );
            return self;
        }

        component.core().attach_to(&self.id);
        let slot = Slot {
            name,
            priority: component.core().priority(),
            stage: Stage::Attached,
            component: Some(Box::new(component)),
        };

        match self.slots.insert(type_id, slot) {
            Some(previous) => {
                warn!(
                    entity = %self.id,
                    component = name,
                    "component type already attached; previous instance replaced"
                );
                self.release_detached(previous);
            }
            None => self.order.push(type_id),
        }
        self
    }

    /// The component of type `T`.
    #[must_use]
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.view().get_component::<T>()
    }

    /// The component of type `T`, mutably.
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.slots
            .get_mut(&T::component_type_id())?
            .component
            .as_deref_mut()?
            .downcast_mut::<T>()
    }

    /// Whether a component of type `T` is attached.
    #[must_use]
    pub fn has_component<T: Component>(&self) -> bool {
        self.slots.contains_key(&T::component_type_id())
    }

    /// Detach the component of type `T`.
    ///
    /// A component whose init has started is destroyed against the retained
    /// scene before it is dropped. Returns `false` if no such component was
    /// attached.
    pub fn remove_component<T: Component>(&mut self) -> bool {
        let type_id = T::component_type_id();
        let Some(slot) = self.slots.remove(&type_id) else {
            return false;
        };
        self.order.retain(|id| *id != type_id);

        let name = slot.name;
        self.release_detached(slot);
        debug!(entity = %self.id, component = name, "component removed");
        true
    }

    /// Destroy a component that was taken out of the map, if its init has
    /// started. Never-started components are just dropped.
    fn release_detached(&self, slot: Slot) {
        if slot.stage == Stage::Attached {
            return;
        }
        let Some(mut component) = slot.component else {
            return;
        };
        match self.context.as_ref().map(|context| context.try_scene_mut()) {
            Some(Ok(mut scene)) => {
                debug!(entity = %self.id, component = slot.name, "destroying detached component");
                component.destroy(&mut scene);
            }
            Some(Err(_)) => error!(
                entity = %self.id,
                component = slot.name,
                "scene is borrowed; detached component was not destroyed"
            ),
            None => warn!(
                entity = %self.id,
                component = slot.name,
                "no scene retained; detached component was not destroyed"
            ),
        }
    }

    /// The lowest-priority component declaring `capability`. Ties go to the
    /// earliest attached.
    #[must_use]
    pub fn find_by_capability(&self, capability: Capability) -> Option<&dyn Component> {
        self.view().find_by_capability(capability)
    }

    /// The first component declaring `capability`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::MissingCapability`] naming this entity and
    /// the capability.
    pub fn require_by_capability(
        &self,
        capability: Capability,
    ) -> Result<&dyn Component, ComponentError> {
        self.view().require_by_capability(capability)
    }

    /// A read-only view of the attached components.
    #[must_use]
    pub fn view(&self) -> EntityView<'_> {
        EntityView::new(&self.id, self.category.as_deref(), &self.slots, &self.order)
    }

    /// Initialise every attached component, one at a time, in ascending
    /// priority (ties keep attach order).
    ///
    /// A second call after success is a logged no-op. If a component fails,
    /// the pass stops there: components before it stay initialised, the
    /// entity is not marked initialised, and the error is returned. Call
    /// [`Entity::destroy`] to release what the completed components
    /// allocated.
    ///
    /// # Errors
    ///
    /// Returns the first [`ComponentError`] raised by a component.
    pub async fn init(&mut self, context: Rc<RuntimeContext>) -> Result<(), ComponentError> {
        if self.initialized {
            warn!(entity = %self.id, "entity already initialized");
            return Ok(());
        }
        self.context = Some(Rc::clone(&context));

        for type_id in self.priority_order() {
            let Some(slot) = self.slots.get_mut(&type_id) else {
                continue;
            };
            if slot.stage == Stage::Ready {
                continue;
            }
            let Some(mut component) = slot.component.take() else {
                continue;
            };
            slot.stage = Stage::Started;
            let (name, priority) = (slot.name, slot.priority);

            debug!(entity = %self.id, component = name, %priority, "initializing component");
            let result = {
                let view = self.view();
                let mut cx = InitContext::new(view, name, &context);
                component.init(&mut cx).await
            };

            if let Some(slot) = self.slots.get_mut(&type_id) {
                slot.component = Some(component);
                if result.is_ok() {
                    slot.stage = Stage::Ready;
                }
            }

            if let Err(err) = result {
                warn!(
                    entity = %self.id,
                    component = name,
                    error = %err,
                    "component init failed; entity left partially initialized"
                );
                return Err(err);
            }
        }

        self.initialized = true;
        debug!(entity = %self.id, components = self.slots.len(), "entity initialized");
        Ok(())
    }

    /// Run every initialised component's update hook, in priority order.
    /// A logged no-op before init.
    pub fn update(&mut self, delta: f64) {
        if !self.initialized {
            warn!(entity = %self.id, "update before init ignored");
            return;
        }
        for type_id in self.priority_order() {
            if let Some(slot) = self.slots.get_mut(&type_id)
                && slot.stage == Stage::Ready
                && let Some(component) = slot.component.as_mut()
            {
                component.update(delta);
            }
        }
    }

    /// Tear the entity down.
    ///
    /// Every component whose init started (including one whose init failed)
    /// runs its destroy hook, in reverse priority order. Then the component
    /// map is cleared, the context dropped, and the entity marked
    /// uninitialised. Calling this on a never-initialised entity logs a
    /// warning and still clears the map.
    pub fn destroy(&mut self) {
        if !self.initialized {
            warn!(entity = %self.id, "destroy called on an entity that was never initialized");
        }

        let order = self.priority_order();
        let context = self.context.take();
        let mut scene = context.as_ref().and_then(|context| match context.try_scene_mut() {
            Ok(scene) => Some(scene),
            Err(_) => {
                error!(entity = %self.id, "scene is borrowed; component teardown skipped");
                None
            }
        });

        let mut destroyed = 0usize;
        for type_id in order.into_iter().rev() {
            let Some(slot) = self.slots.remove(&type_id) else {
                continue;
            };
            if slot.stage == Stage::Attached {
                continue;
            }
            if let Some(component) = slot.component {
                destroy_component(&self.id, slot.name, component, scene.as_deref_mut());
                destroyed += 1;
            }
        }
        drop(scene);

        self.slots.clear();
        self.order.clear();
        self.initialized = false;
        debug!(entity = %self.id, destroyed, "entity destroyed");
    }

    /// Attach order, stably sorted by ascending priority.
    fn priority_order(&self) -> Vec<ComponentTypeId> {
        let mut order = self.order.clone();
        order.sort_by_key(|type_id| {
            self.slots
                .get(type_id)
                .map_or(Priority::DEFAULT, |slot| slot.priority)
        });
        order
    }
}

fn destroy_component(
    entity: &EntityId,
    name: &'static str,
    mut component: Box<dyn Component>,
    scene: Option<&mut Scene>,
) {
    match scene {
        Some(scene) => {
            debug!(%entity, component = name, "destroying component");
            component.destroy(scene);
        }
        None => warn!(
            %entity,
            component = name,
            "no scene available; component resources released on drop"
        ),
    }
}

impl Drop for Entity {
    fn drop(&mut self) {
        if self.context.is_some() {
            warn!(entity = %self.id, "entity dropped without destroy; tearing down");
            self.destroy();
        }
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let components: Vec<_> = self
            .order
            .iter()
            .filter_map(|type_id| self.slots.get(type_id).map(|slot| slot.name))
            .collect();
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("components", &components)
            .field("initialized", &self.initialized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use async_trait::async_trait;
    use engine_scene::Scene;

    use super::*;
    use crate::base::ComponentCore;

    const GLOWS: Capability = Capability::new("glows");

    type Journal = Rc<RefCell<Vec<String>>>;

    /// Records each lifecycle call into a shared journal.
    struct Recorder<const N: usize> {
        core: ComponentCore,
        journal: Journal,
    }

    impl<const N: usize> Recorder<N> {
        fn new(priority: i32, journal: &Journal) -> Self {
            Self {
                core: ComponentCore::new().with_priority(Priority::new(priority)),
                journal: Rc::clone(journal),
            }
        }
    }

    #[async_trait(?Send)]
    impl<const N: usize> Component for Recorder<N> {
        fn core(&self) -> &ComponentCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut ComponentCore {
            &mut self.core
        }

        async fn init(&mut self, _cx: &mut InitContext<'_>) -> Result<(), ComponentError> {
            self.journal.borrow_mut().push(format!("init {N}"));
            Ok(())
        }

        fn update(&mut self, _delta: f64) {
            self.journal.borrow_mut().push(format!("update {N}"));
        }

        fn destroy(&mut self, scene: &mut Scene) {
            self.journal.borrow_mut().push(format!("destroy {N}"));
            self.core.registry_mut().cleanup(scene);
        }
    }

    fn context() -> Rc<RuntimeContext> {
        RuntimeContext::new(Scene::new()).into_shared()
    }

    fn journal() -> Journal {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Entity::with_generated_id();
        let b = Entity::with_generated_id();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_attach_then_get_returns_same_instance() {
        let log = journal();
        let mut entity = Entity::new("tree-1").with_category("prop");
        entity.attach(Recorder::<1>::new(0, &log));
        let component = entity.get_component::<Recorder<1>>().unwrap();
        assert_eq!(component.core().owner().map(EntityId::as_str), Some("tree-1"));
        assert!(Rc::ptr_eq(&component.journal, &log));
        assert_eq!(entity.category(), Some("prop"));
    }

    #[test]
    fn test_remove_then_get_returns_none() {
        let log = journal();
        let mut entity = Entity::new("tree-1");
        entity.attach(Recorder::<1>::new(0, &log));
        assert!(entity.remove_component::<Recorder<1>>());
        assert!(entity.get_component::<Recorder<1>>().is_none());
        assert!(!entity.remove_component::<Recorder<1>>());
        assert!(entity.is_empty());
    }

    #[test]
    fn test_duplicate_attach_replaces() {
        let first = journal();
        let second = journal();
        let mut entity = Entity::new("tree-1");
        entity
            .attach(Recorder::<1>::new(0, &first))
            .attach(Recorder::<1>::new(0, &second));
        assert_eq!(entity.len(), 1);
        let kept = entity.get_component::<Recorder<1>>().unwrap();
        assert!(Rc::ptr_eq(&kept.journal, &second));
    }

    #[tokio::test]
    async fn test_init_runs_in_priority_order() {
        let log = journal();
        let mut entity = Entity::new("tree-1");
        entity
            .attach(Recorder::<3>::new(100, &log))
            .attach(Recorder::<1>::new(1, &log))
            .attach(Recorder::<2>::new(1, &log));

        entity.init(context()).await.unwrap();

        assert!(entity.is_initialized());
        assert_eq!(*log.borrow(), vec!["init 1", "init 2", "init 3"]);
        entity.destroy();
    }

    #[tokio::test]
    async fn test_second_init_is_noop() {
        let log = journal();
        let mut entity = Entity::new("tree-1");
        entity.attach(Recorder::<1>::new(0, &log));
        let context = context();
        entity.init(Rc::clone(&context)).await.unwrap();
        entity.init(context).await.unwrap();
        assert_eq!(*log.borrow(), vec!["init 1"]);
        entity.destroy();
    }

    #[test]
    fn test_update_before_init_is_noop() {
        let log = journal();
        let mut entity = Entity::new("tree-1");
        entity.attach(Recorder::<1>::new(0, &log));
        entity.update(0.016);
        assert!(log.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_update_runs_in_priority_order() {
        let log = journal();
        let mut entity = Entity::new("tree-1");
        entity
            .attach(Recorder::<2>::new(10, &log))
            .attach(Recorder::<1>::new(0, &log));
        entity.init(context()).await.unwrap();
        log.borrow_mut().clear();

        entity.update(0.016);

        assert_eq!(*log.borrow(), vec!["update 1", "update 2"]);
        entity.destroy();
    }

    #[tokio::test]
    async fn test_attach_after_init_is_ignored() {
        let log = journal();
        let mut entity = Entity::new("tree-1");
        entity.attach(Recorder::<1>::new(0, &log));
        entity.init(context()).await.unwrap();

        entity.attach(Recorder::<2>::new(0, &log));

        assert!(!entity.has_component::<Recorder<2>>());
        assert_eq!(*log.borrow(), vec!["init 1"]);
        entity.destroy();
    }

    #[tokio::test]
    async fn test_destroy_runs_in_reverse_priority_and_clears() {
        let log = journal();
        let mut entity = Entity::new("tree-1");
        entity
            .attach(Recorder::<2>::new(10, &log))
            .attach(Recorder::<1>::new(0, &log));
        entity.init(context()).await.unwrap();
        log.borrow_mut().clear();

        entity.destroy();

        assert_eq!(*log.borrow(), vec!["destroy 2", "destroy 1"]);
        assert!(entity.is_empty());
        assert!(!entity.is_initialized());
        assert!(entity.context().is_none());
    }

    #[test]
    fn test_destroy_without_init_clears_map() {
        let log = journal();
        let mut entity = Entity::new("tree-1");
        entity.attach(Recorder::<1>::new(0, &log));
        entity.destroy();
        assert!(entity.is_empty());
        assert!(log.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_remove_after_init_destroys_component() {
        let log = journal();
        let mut entity = Entity::new("tree-1");
        entity.attach(Recorder::<1>::new(0, &log));
        entity.init(context()).await.unwrap();

        assert!(entity.remove_component::<Recorder<1>>());

        assert_eq!(*log.borrow(), vec!["init 1", "destroy 1"]);
        entity.destroy();
    }

    #[tokio::test]
    async fn test_drop_tears_down_initialized_entity() {
        let log = journal();
        {
            let mut entity = Entity::new("tree-1");
            entity.attach(Recorder::<1>::new(0, &log));
            entity.init(context()).await.unwrap();
        }
        assert_eq!(*log.borrow(), vec!["init 1", "destroy 1"]);
    }

    struct Glow {
        core: ComponentCore,
    }

    #[async_trait(?Send)]
    impl Component for Glow {
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
    fn test_capability_queries() {
        let log = journal();
        let mut entity = Entity::new("lamp");
        entity
            .attach(Recorder::<1>::new(0, &log))
            .attach(Glow {
                core: ComponentCore::new().with_capability(GLOWS),
            });

        let found = entity.find_by_capability(GLOWS).unwrap();
        assert!(found.is::<Glow>());

        let missing = Capability::new("missing");
        assert!(entity.find_by_capability(missing).is_none());
        let err = match entity.require_by_capability(missing) {
            Ok(_) => panic!("no component declares the capability"),
            Err(err) => err,
        };
        assert!(matches!(
            err,
            ComponentError::MissingCapability { ref entity, capability, requester: None }
                if entity.as_str() == "lamp" && capability == missing
        ));
    }

    #[test]
    fn test_capability_lookup_prefers_lower_priority() {
        let log = journal();
        let mut late = Recorder::<2>::new(10, &log);
        assert!(late.core.register_capability(GLOWS));
        let mut entity = Entity::new("lamp");
        entity.attach(late).attach(Glow {
            core: ComponentCore::new().with_capability(GLOWS),
        });

        assert!(entity.find_by_capability(GLOWS).unwrap().is::<Glow>());
    }

    #[test]
    fn test_capability_lookup_ties_keep_attach_order() {
        let log = journal();
        let mut first = Recorder::<2>::new(0, &log);
        assert!(first.core.register_capability(GLOWS));
        let mut entity = Entity::new("lamp");
        entity.attach(first).attach(Glow {
            core: ComponentCore::new().with_capability(GLOWS),
        });

        assert!(entity.find_by_capability(GLOWS).unwrap().is::<Recorder<2>>());
    }

    #[test]
    fn test_get_component_mut() {
        let log = journal();
        let mut entity = Entity::new("tree-1");
        entity.attach(Recorder::<1>::new(0, &log));
        let other = journal();
        entity.get_component_mut::<Recorder<1>>().unwrap().journal = Rc::clone(&other);
        assert!(Rc::ptr_eq(
            &entity.get_component::<Recorder<1>>().unwrap().journal,
            &other
        ));
    }
}
