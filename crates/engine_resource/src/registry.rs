//! Per-owner cleanup ledger.
//!
//! Every component owns a [`CleanupRegistry`]. Whatever the component
//! allocates during init (scene nodes, raw GPU-like resources, store
//! subscriptions) is registered here, and the whole ledger is flushed in one
//! synchronous pass when the component is destroyed.
//!
//! ## Failure isolation
//!
//! Disposal never aborts half-way. A node or resource that fails to release
//! is logged and counted in the [`CleanupReport`]; every other entry is still
//! released.

use tracing::{debug, warn};

use crate::disposable::{Disposable, StopHandle};
use crate::error::DisposeError;
use crate::scene::{NodeId, SceneGraph, TextureSlot};

/// Number of entries currently held by a [`CleanupRegistry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisteredCount {
    /// Registered watcher stop handles.
    pub watchers: usize,
    /// Registered scene nodes.
    pub objects: usize,
    /// Registered raw disposables.
    pub disposables: usize,
}

impl RegisteredCount {
    /// Sum of all entries.
    #[must_use]
    pub fn total(&self) -> usize {
        self.watchers + self.objects + self.disposables
    }
}

/// What a single [`CleanupRegistry::cleanup`] pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Watchers stopped.
    pub watchers_stopped: usize,
    /// Scene nodes detached and walked.
    pub nodes_released: usize,
    /// Geometries, materials and textures released while walking nodes.
    pub node_resources_released: usize,
    /// Raw disposables released.
    pub disposables_released: usize,
    /// Items that failed to release. Each failure was logged.
    pub failures: usize,
}

impl CleanupReport {
    /// Returns `true` if nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: CleanupReport) {
        self.watchers_stopped += other.watchers_stopped;
        self.nodes_released += other.nodes_released;
        self.node_resources_released += other.node_resources_released;
        self.disposables_released += other.disposables_released;
        self.failures += other.failures;
    }
}

/// Ledger of resources owned by one component (or one module).
#[derive(Default)]
pub struct CleanupRegistry {
    watchers: Vec<StopHandle>,
    objects: Vec<NodeId>,
    disposables: Vec<Box<dyn Disposable>>,
}

impl CleanupRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stoppable subscription.
    pub fn register_watcher(&mut self, stop: impl FnOnce() + 'static) {
        self.watchers.push(Box::new(stop));
    }

    /// Register a scene node to be detached and recursively released.
    pub fn register_object(&mut self, node: NodeId) {
        self.objects.push(node);
    }

    /// Register several scene nodes at once.
    pub fn register_objects(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        self.objects.extend(nodes);
    }

    /// Register a raw disposable.
    pub fn register_disposable(&mut self, resource: impl Disposable + 'static) {
        self.disposables.push(Box::new(resource));
    }

    /// Register several boxed disposables at once.
    pub fn register_disposables(
        &mut self,
        resources: impl IntoIterator<Item = Box<dyn Disposable>>,
    ) {
        self.disposables.extend(resources);
    }

    /// Number of entries per kind.
    #[must_use]
    pub fn registered_count(&self) -> RegisteredCount {
        RegisteredCount {
            watchers: self.watchers.len(),
            objects: self.objects.len(),
            disposables: self.disposables.len(),
        }
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered_count().total() == 0
    }

    /// Release everything, in order: watchers, scene nodes, disposables.
    ///
    /// Each scene node is detached from its parent, then the node and its
    /// descendants are visited depth-first. Every visited renderable releases
    /// its geometry, then each material followed by that material's texture
    /// slots. Failures are logged and counted, never propagated.
    ///
    /// The registry is empty afterwards, so calling this again is a no-op.
    pub fn cleanup(&mut self, scene: &mut dyn SceneGraph) -> CleanupReport {
        let mut report = CleanupReport::default();

        for stop in self.watchers.drain(..) {
            stop();
            report.watchers_stopped += 1;
        }

        for node in self.objects.drain(..) {
            release_node(scene, node, &mut report);
        }

        for mut resource in self.disposables.drain(..) {
            let label = resource.label();
            let result = resource.dispose();
            if record(&mut report, &label, result) {
                report.disposables_released += 1;
            }
        }

        debug!(
            watchers = report.watchers_stopped,
            nodes = report.nodes_released,
            disposables = report.disposables_released,
            failures = report.failures,
            "cleanup registry flushed"
        );
        report
    }
}

/// Detach `node`, release the resources of its subtree, then prune it.
fn release_node(scene: &mut dyn SceneGraph, node: NodeId, report: &mut CleanupReport) {
    if let Err(err) = scene.detach(node) {
        warn!(%node, error = %err, "failed to detach scene node");
        report.failures += 1;
        return;
    }

    for visited in scene.subtree(node) {
        let Some(renderable) = scene.renderable_mut(visited) else {
            continue;
        };

        let geometry = renderable.geometry_mut();
        let label = geometry.label();
        let result = geometry.dispose();
        if record(report, &label, result) {
            report.node_resources_released += 1;
        }

        for material in renderable.materials_mut() {
            let label = material.label();
            let result = material.dispose();
            if record(report, &label, result) {
                report.node_resources_released += 1;
            }

            for slot in TextureSlot::ALL {
                let Some(texture) = material.texture_mut(slot) else {
                    continue;
                };
                let label = format!("{label}.{slot}");
                let result = texture.dispose();
                if record(report, &label, result) {
                    report.node_resources_released += 1;
                }
            }
        }
    }

    scene.prune(node);
    report.nodes_released += 1;
}

/// Log a failed release. Returns `true` on success.
fn record(report: &mut CleanupReport, label: &str, result: Result<(), DisposeError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(resource = label, error = %err, "resource disposal failed");
            report.failures += 1;
            false
        }
    }
}

impl std::fmt::Debug for CleanupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupRegistry")
            .field("watchers", &self.watchers.len())
            .field("objects", &self.objects)
            .field("disposables", &self.disposables.len())
            .finish()
    }
}

impl Drop for CleanupRegistry {
    fn drop(&mut self) {
        if self.is_empty() {
            return;
        }

        let count = self.registered_count();
        warn!(
            watchers = count.watchers,
            objects = count.objects,
            disposables = count.disposables,
            "cleanup registry dropped without cleanup"
        );

        for stop in self.watchers.drain(..) {
            stop();
        }
        for mut resource in self.disposables.drain(..) {
            if let Err(err) = resource.dispose() {
                warn!(resource = %resource.label(), error = %err, "resource disposal failed");
            }
        }
        // Scene nodes cannot be detached without the scene.
        for node in self.objects.drain(..) {
            warn!(%node, "scene node leaked by dropped cleanup registry");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;
    use crate::scene::{Material, Renderable};

    /// A disposable that records its release into a shared log.
    struct Probe {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl Probe {
        fn new(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                name,
                log: Rc::clone(log),
                fail: false,
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    impl Disposable for Probe {
        fn label(&self) -> String {
            self.name.to_string()
        }

        fn dispose(&mut self) -> Result<(), DisposeError> {
            if self.fail {
                return Err(DisposeError::Failed {
                    resource: self.label(),
                    reason: "device lost".to_string(),
                });
            }
            self.log.borrow_mut().push(self.name.to_string());
            Ok(())
        }
    }

    struct ProbeMaterial {
        inner: Probe,
        map: Option<Probe>,
    }

    impl Disposable for ProbeMaterial {
        fn label(&self) -> String {
            self.inner.label()
        }

        fn dispose(&mut self) -> Result<(), DisposeError> {
            self.inner.dispose()
        }
    }

    impl Material for ProbeMaterial {
        fn texture_mut(&mut self, slot: TextureSlot) -> Option<&mut dyn Disposable> {
            match slot {
                TextureSlot::Map => self.map.as_mut().map(|t| t as &mut dyn Disposable),
                _ => None,
            }
        }
    }

    struct ProbeMesh {
        geometry: Probe,
        materials: Vec<ProbeMaterial>,
    }

    impl Renderable for ProbeMesh {
        fn geometry_mut(&mut self) -> &mut dyn Disposable {
            &mut self.geometry
        }

        fn materials_mut(&mut self) -> Vec<&mut dyn Material> {
            self.materials
                .iter_mut()
                .map(|m| m as &mut dyn Material)
                .collect()
        }
    }

    #[derive(Default)]
    struct ProbeScene {
        parents: HashMap<NodeId, NodeId>,
        children: HashMap<NodeId, Vec<NodeId>>,
        meshes: HashMap<NodeId, ProbeMesh>,
        pruned: Vec<NodeId>,
    }

    impl ProbeScene {
        fn add(&mut self, parent: NodeId, node: NodeId, mesh: Option<ProbeMesh>) {
            self.parents.insert(node, parent);
            self.children.entry(parent).or_default().push(node);
            self.children.entry(node).or_default();
            if let Some(mesh) = mesh {
                self.meshes.insert(node, mesh);
            }
        }
    }

    impl SceneGraph for ProbeScene {
        fn detach(&mut self, node: NodeId) -> Result<(), DisposeError> {
            if !self.children.contains_key(&node) {
                return Err(DisposeError::UnknownNode(node));
            }
            if let Some(parent) = self.parents.remove(&node)
                && let Some(siblings) = self.children.get_mut(&parent)
            {
                siblings.retain(|&c| c != node);
            }
            Ok(())
        }

        fn children(&self, node: NodeId) -> Vec<NodeId> {
            self.children.get(&node).cloned().unwrap_or_default()
        }

        fn renderable_mut(&mut self, node: NodeId) -> Option<&mut dyn Renderable> {
            self.meshes
                .get_mut(&node)
                .map(|m| m as &mut dyn Renderable)
        }

        fn prune(&mut self, node: NodeId) {
            self.pruned.push(node);
        }
    }

    const ROOT: NodeId = NodeId(1);

    fn mesh(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> ProbeMesh {
        let (geometry, material, map) = match name {
            "hull" => ("hull.geometry", "hull.material", "hull.map"),
            _ => ("turret.geometry", "turret.material", "turret.map"),
        };
        ProbeMesh {
            geometry: Probe::new(geometry, log),
            materials: vec![ProbeMaterial {
                inner: Probe::new(material, log),
                map: Some(Probe::new(map, log)),
            }],
        }
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = CleanupRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.registered_count(), RegisteredCount::default());
    }

    #[test]
    fn test_registered_count_per_kind() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = CleanupRegistry::new();
        registry.register_watcher(|| {});
        registry.register_objects([NodeId(2), NodeId(3)]);
        registry.register_disposable(Probe::new("a", &log));
        let count = registry.registered_count();
        assert_eq!(count.watchers, 1);
        assert_eq!(count.objects, 2);
        assert_eq!(count.disposables, 1);
        assert_eq!(count.total(), 4);
        registry.cleanup(&mut ProbeScene::default());
    }

    #[test]
    fn test_cleanup_releases_node_then_disposable() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = ProbeScene::default();
        scene.add(ROOT, NodeId(2), Some(mesh("hull", &log)));
        scene.add(NodeId(2), NodeId(3), Some(mesh("turret", &log)));

        let stopped = Rc::new(Cell::new(false));
        let flag = Rc::clone(&stopped);

        let mut registry = CleanupRegistry::new();
        registry.register_watcher(move || flag.set(true));
        registry.register_object(NodeId(2));
        registry.register_disposable(Probe::new("loose", &log));

        let report = registry.cleanup(&mut scene);

        assert!(stopped.get());
        assert!(scene.children(ROOT).is_empty());
        assert_eq!(scene.pruned, vec![NodeId(2)]);
        assert_eq!(
            *log.borrow(),
            vec![
                "hull.geometry",
                "hull.material",
                "hull.map",
                "turret.geometry",
                "turret.material",
                "turret.map",
                "loose",
            ]
        );
        assert_eq!(report.nodes_released, 1);
        assert_eq!(report.node_resources_released, 6);
        assert_eq!(report.disposables_released, 1);
        assert!(report.is_clean());
        assert_eq!(registry.registered_count(), RegisteredCount::default());
    }

    #[test]
    fn test_second_cleanup_is_noop() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = ProbeScene::default();
        let mut registry = CleanupRegistry::new();
        registry.register_disposable(Probe::new("once", &log));

        registry.cleanup(&mut scene);
        let second = registry.cleanup(&mut scene);

        assert_eq!(second, CleanupReport::default());
        assert_eq!(*log.borrow(), vec!["once"]);
    }

    #[test]
    fn test_failing_disposable_does_not_block_others() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = CleanupRegistry::new();
        registry.register_disposable(Probe::new("first", &log));
        registry.register_disposable(Probe::new("broken", &log).failing());
        registry.register_disposable(Probe::new("last", &log));

        let report = registry.cleanup(&mut ProbeScene::default());

        assert_eq!(*log.borrow(), vec!["first", "last"]);
        assert_eq!(report.disposables_released, 2);
        assert_eq!(report.failures, 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_node_is_isolated() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = ProbeScene::default();
        scene.add(ROOT, NodeId(2), Some(mesh("hull", &log)));

        let mut registry = CleanupRegistry::new();
        registry.register_object(NodeId(99));
        registry.register_object(NodeId(2));

        let report = registry.cleanup(&mut scene);

        assert_eq!(report.failures, 1);
        assert_eq!(report.nodes_released, 1);
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_failing_geometry_still_releases_material() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = ProbeScene::default();
        let mut hull = mesh("hull", &log);
        hull.geometry.fail = true;
        scene.add(ROOT, NodeId(2), Some(hull));

        let mut registry = CleanupRegistry::new();
        registry.register_object(NodeId(2));
        let report = registry.cleanup(&mut scene);

        assert_eq!(*log.borrow(), vec!["hull.material", "hull.map"]);
        assert_eq!(report.failures, 1);
    }

    #[test]
    fn test_drop_releases_pending_disposables() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let stopped = Rc::new(Cell::new(false));
        {
            let flag = Rc::clone(&stopped);
            let mut registry = CleanupRegistry::new();
            registry.register_watcher(move || flag.set(true));
            registry.register_disposable(Probe::new("pending", &log));
        }
        assert!(stopped.get());
        assert_eq!(*log.borrow(), vec!["pending"]);
    }

    #[test]
    fn test_report_merge() {
        let mut total = CleanupReport {
            watchers_stopped: 1,
            failures: 1,
            ..CleanupReport::default()
        };
        total.merge(CleanupReport {
            disposables_released: 2,
            ..CleanupReport::default()
        });
        assert_eq!(total.watchers_stopped, 1);
        assert_eq!(total.disposables_released, 2);
        assert!(!total.is_clean());
    }
}
