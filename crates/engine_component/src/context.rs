//! Shared services injected into components at init.

use std::any::Any;
use std::cell::{BorrowMutError, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use engine_resource::{CleanupRegistry, CleanupReport, NodeId};
use engine_scene::Scene;
use tracing::{debug, warn};

use crate::error::ComponentError;

/// Named external systems (physics world, audio mixer, asset loader, ...).
#[derive(Default)]
pub struct ServiceLocator {
    services: HashMap<String, Rc<dyn Any>>,
}

impl ServiceLocator {
    /// An empty locator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` under `name`, replacing any previous entry.
    pub fn register<T: Any>(&mut self, name: impl Into<String>, service: Rc<T>) {
        let name = name.into();
        if self.services.insert(name.clone(), service).is_some() {
            warn!(service = %name, "service replaced");
        }
    }

    /// The service registered under `name`, if it has type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        Rc::clone(self.services.get(name)?).downcast::<T>().ok()
    }

    /// The service registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::MissingService`] if nothing is registered
    /// under `name` or the entry is not a `T`.
    pub fn require<T: Any>(&self, name: &str) -> Result<Rc<T>, ComponentError> {
        self.get(name).ok_or_else(|| ComponentError::MissingService {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Whether anything is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether no service is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl std::fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.services.keys().collect();
        names.sort();
        f.debug_struct("ServiceLocator")
            .field("services", &names)
            .finish()
    }
}

/// Everything a component may consume during init.
///
/// One context is shared by reference between every entity of a scene. The
/// scene and the module-scoped cleanup registry sit behind `RefCell`s, so a
/// borrow must never be held across an `.await`.
#[derive(Debug)]
pub struct RuntimeContext {
    scene: RefCell<Scene>,
    root: NodeId,
    cleanup: RefCell<CleanupRegistry>,
    services: ServiceLocator,
    camera: Option<NodeId>,
    character: Option<NodeId>,
}

impl RuntimeContext {
    /// A context around `scene` with no services.
    #[must_use]
    pub fn new(scene: Scene) -> Self {
        let root = scene.root();
        Self {
            scene: RefCell::new(scene),
            root,
            cleanup: RefCell::new(CleanupRegistry::new()),
            services: ServiceLocator::new(),
            camera: None,
            character: None,
        }
    }

    /// Register a named service.
    #[must_use]
    pub fn with_service<T: Any>(mut self, name: impl Into<String>, service: Rc<T>) -> Self {
        self.services.register(name, service);
        self
    }

    /// Set the active camera node.
    #[must_use]
    pub fn with_camera(mut self, camera: NodeId) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Set the controlled character node.
    #[must_use]
    pub fn with_character(mut self, character: NodeId) -> Self {
        self.character = Some(character);
        self
    }

    /// Wrap in an `Rc` for sharing between entities.
    #[must_use]
    pub fn into_shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// The scene root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow the scene.
    ///
    /// # Panics
    ///
    /// Panics if the scene is currently borrowed mutably.
    #[must_use]
    pub fn scene(&self) -> Ref<'_, Scene> {
        self.scene.borrow()
    }

    /// Borrow the scene mutably.
    ///
    /// # Panics
    ///
    /// Panics if the scene is currently borrowed.
    #[must_use]
    pub fn scene_mut(&self) -> RefMut<'_, Scene> {
        self.scene.borrow_mut()
    }

    /// Borrow the scene mutably without panicking.
    ///
    /// # Errors
    ///
    /// Fails if the scene is currently borrowed.
    pub fn try_scene_mut(&self) -> Result<RefMut<'_, Scene>, BorrowMutError> {
        self.scene.try_borrow_mut()
    }

    /// Named external systems.
    #[must_use]
    pub fn services(&self) -> &ServiceLocator {
        &self.services
    }

    /// The active camera node.
    #[must_use]
    pub fn camera(&self) -> Option<NodeId> {
        self.camera
    }

    /// The controlled character node.
    #[must_use]
    pub fn character(&self) -> Option<NodeId> {
        self.character
    }

    /// The module-scoped cleanup registry, distinct from every component's
    /// own. Flushed by [`RuntimeContext::teardown`].
    ///
    /// # Panics
    ///
    /// Panics if the registry is already borrowed.
    #[must_use]
    pub fn cleanup_registry(&self) -> RefMut<'_, CleanupRegistry> {
        self.cleanup.borrow_mut()
    }

    /// Flush the module-scoped registry against the scene.
    ///
    /// # Panics
    ///
    /// Panics if the scene or the registry is currently borrowed.
    pub fn teardown(&self) -> CleanupReport {
        let mut registry = self.cleanup.borrow_mut();
        let mut scene = self.scene.borrow_mut();
        let report = registry.cleanup(&mut *scene);
        debug!(
            nodes = report.nodes_released,
            disposables = report.disposables_released,
            failures = report.failures,
            "runtime context torn down"
        );
        report
    }
}
