//! Demo components composed onto the client's props.
//!
//! A prop carries exactly one mesh provider ([`BoxMesh`] or [`SphereMesh`]),
//! optionally a [`TextureLoader`] that binds a fetched texture to the mesh,
//! and optionally a [`Spinner`] that rotates it every tick.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use engine_component::{
    Capability, Component, ComponentCore, ComponentError, InitContext, Priority, RuntimeContext,
};
use engine_resource::{Disposable, NodeId, TextureSlot};
use engine_scene::{Mesh, Quat, Transform, Vec3};
use tracing::{debug, warn};

/// Declared by every component that puts a renderable mesh in the scene.
pub const MESH_PROVIDER: Capability = Capability::new("mesh-provider");

/// Service name of the shared [`Telemetry`] counters.
pub const TELEMETRY: &str = "telemetry";

/// What a mesh provider exposes under [`MESH_PROVIDER`].
#[derive(Debug, Default)]
pub struct MeshHandle {
    node: Cell<Option<NodeId>>,
}

impl MeshHandle {
    /// The mesh node, once the provider is initialised.
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.node.get()
    }
}

/// Counters shared through the service locator.
#[derive(Debug, Default)]
pub struct Telemetry {
    active_spinners: Cell<usize>,
    rotations: Cell<u64>,
}

impl Telemetry {
    #[must_use]
    pub fn active_spinners(&self) -> usize {
        self.active_spinners.get()
    }

    #[must_use]
    pub fn rotations(&self) -> u64 {
        self.rotations.get()
    }
}

/// The mesh node published by the entity's mesh provider.
fn provided_node(cx: &InitContext<'_>) -> Result<NodeId, ComponentError> {
    cx.require_by_capability(MESH_PROVIDER)?
        .interface_as::<MeshHandle>(MESH_PROVIDER)
        .and_then(MeshHandle::node)
        .ok_or_else(|| {
            anyhow!(
                "mesh provider on {} has not spawned its node",
                cx.entity_id()
            )
            .into()
        })
}

/// Spawn a mesh node under the scene root and hand it to the caller's
/// registry.
fn spawn_mesh_node(
    cx: &InitContext<'_>,
    core: &mut ComponentCore,
    kind: &str,
    vertex_count: usize,
    material_count: usize,
    position: Vec3,
) -> Result<NodeId, ComponentError> {
    let name = format!("{}.{kind}", cx.entity_id());
    let mut scene = cx.scene_mut();

    let geometry = scene.create_geometry(format!("{name}.geometry"), vertex_count);
    let mesh = if material_count <= 1 {
        Mesh::new(geometry, scene.create_material(format!("{name}.material")))
    } else {
        let materials = (0..material_count)
            .map(|group| scene.create_material(format!("{name}.material{group}")))
            .collect();
        Mesh::with_materials(geometry, materials)
    };

    let root = scene.root();
    let node = scene
        .spawn_mesh(root, name, mesh)
        .map_err(anyhow::Error::from)?;
    if let Some(node) = scene.node_mut(node) {
        node.transform = Transform::from_position(position);
    }

    core.registry_mut().register_object(node);
    Ok(node)
}

/// A cube mesh provider.
#[derive(Debug)]
pub struct BoxMesh {
    core: ComponentCore,
    size: f32,
    position: Vec3,
    handle: MeshHandle,
}

impl BoxMesh {
    #[must_use]
    pub fn new(size: f32) -> Self {
        Self {
            core: ComponentCore::new().with_capability(MESH_PROVIDER),
            size,
            position: Vec3::ZERO,
            handle: MeshHandle::default(),
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.handle.node()
    }
}

#[async_trait(?Send)]
impl Component for BoxMesh {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), ComponentError> {
        cx.restrict_component::<SphereMesh>(Some("a prop renders a single mesh"))?;
        let node = spawn_mesh_node(cx, &mut self.core, "box", 24, 1, self.position)?;
        if let Some(node) = cx.scene_mut().node_mut(node) {
            node.transform.scale = Vec3::splat(self.size);
        }
        self.handle.node.set(Some(node));
        debug!(entity = %cx.entity_id(), %node, size = self.size, "box mesh spawned");
        Ok(())
    }

    fn interface(&self, capability: Capability) -> Option<&dyn Any> {
        (capability == MESH_PROVIDER).then_some(&self.handle as &dyn Any)
    }
}

/// A UV sphere mesh provider with one material per hemisphere.
#[derive(Debug)]
pub struct SphereMesh {
    core: ComponentCore,
    segments: usize,
    position: Vec3,
    handle: MeshHandle,
}

impl SphereMesh {
    #[must_use]
    pub fn new(segments: usize) -> Self {
        Self {
            core: ComponentCore::new().with_capability(MESH_PROVIDER),
            segments: segments.max(3),
            position: Vec3::ZERO,
            handle: MeshHandle::default(),
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }
}

#[async_trait(?Send)]
impl Component for SphereMesh {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), ComponentError> {
        cx.restrict_component::<BoxMesh>(Some("a prop renders a single mesh"))?;
        let vertex_count = (self.segments + 1) * (self.segments / 2 + 1);
        let node = spawn_mesh_node(cx, &mut self.core, "sphere", vertex_count, 2, self.position)?;
        self.handle.node.set(Some(node));
        debug!(entity = %cx.entity_id(), %node, segments = self.segments, "sphere mesh spawned");
        Ok(())
    }

    fn interface(&self, capability: Capability) -> Option<&dyn Any> {
        (capability == MESH_PROVIDER).then_some(&self.handle as &dyn Any)
    }
}

/// Fetches a texture and binds it to the first material of the entity's
/// mesh. The texture then belongs to the mesh node and is released with it.
#[derive(Debug)]
pub struct TextureLoader {
    core: ComponentCore,
    slot: TextureSlot,
    size: u32,
    delay: Duration,
    bound: bool,
}

impl TextureLoader {
    #[must_use]
    pub fn new(slot: TextureSlot, delay: Duration) -> Self {
        Self {
            core: ComponentCore::new().with_priority(Priority::new(10)),
            slot,
            size: 256,
            delay,
            bound: false,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Whether the texture made it onto the mesh.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound
    }
}

#[async_trait(?Send)]
impl Component for TextureLoader {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), ComponentError> {
        let node = provided_node(cx)?;

        // Simulated fetch. No scene borrow is held across this point.
        tokio::time::sleep(self.delay).await;

        let mut scene = cx.scene_mut();
        let label = format!("{}.{}", cx.entity_id(), self.slot);
        let mut texture = scene.create_texture(label, self.size, self.size);

        let Some(material) = scene
            .node_mut(node)
            .and_then(|node| node.mesh.as_mut())
            .and_then(|mesh| mesh.material.iter_mut().next())
        else {
            if let Err(err) = texture.dispose() {
                warn!(entity = %cx.entity_id(), error = %err, "failed to release unused texture");
            }
            return Err(anyhow!("{node} has no material to bind {} to", self.slot).into());
        };

        if let Some(mut previous) = material.set_texture(self.slot, texture)
            && let Err(err) = previous.dispose()
        {
            warn!(entity = %cx.entity_id(), error = %err, "failed to release replaced texture");
        }
        self.bound = true;
        debug!(entity = %cx.entity_id(), %node, slot = %self.slot, "texture bound");
        Ok(())
    }
}

/// Rotates the entity's mesh around the Y axis.
#[derive(Debug)]
pub struct Spinner {
    core: ComponentCore,
    /// Radians per second.
    speed: f32,
    target: Option<NodeId>,
    runtime: Option<Rc<RuntimeContext>>,
    telemetry: Option<Rc<Telemetry>>,
}

impl Spinner {
    #[must_use]
    pub fn new(speed: f32) -> Self {
        Self {
            core: ComponentCore::new().with_priority(Priority::new(100)),
            speed,
            target: None,
            runtime: None,
            telemetry: None,
        }
    }

    #[must_use]
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }
}

#[async_trait(?Send)]
impl Component for Spinner {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    async fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), ComponentError> {
        let node = provided_node(cx)?;

        if let Some(telemetry) = cx.services().get::<Telemetry>(TELEMETRY) {
            telemetry.active_spinners.set(telemetry.active_spinners.get() + 1);
            let watcher = Rc::clone(&telemetry);
            self.core.registry_mut().register_watcher(move || {
                watcher
                    .active_spinners
                    .set(watcher.active_spinners.get().saturating_sub(1));
            });
            self.telemetry = Some(telemetry);
        }

        self.target = Some(node);
        self.runtime = Some(cx.runtime_handle());
        Ok(())
    }

    fn update(&mut self, delta: f64) {
        let (Some(runtime), Some(target)) = (&self.runtime, self.target) else {
            return;
        };
        let Ok(mut scene) = runtime.try_scene_mut() else {
            debug!(node = %target, "scene busy; spin skipped");
            return;
        };
        if let Some(node) = scene.node_mut(target) {
            node.transform.rotate(Quat::from_rotation_y(self.speed * delta as f32));
            if let Some(telemetry) = &self.telemetry {
                telemetry.rotations.set(telemetry.rotations.get() + 1);
            }
        }
    }
}
