//! Tracked graphics-like resources: geometry, materials, textures.
//!
//! Each resource holds a handle registered with a [`ResourceTracker`]. The
//! tracker counts live resources per kind; releasing a resource decrements the
//! count, and releasing it twice is an error. Dropping an unreleased resource
//! leaves the count untouched, which is exactly how a leak shows up.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use engine_resource::{Disposable, DisposeError, Material, Renderable, TextureSlot};
use glam::Vec4;

/// The kind of a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
}

/// Snapshot of live resource counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveResources {
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

impl LiveResources {
    /// Sum of all live resources.
    #[must_use]
    pub fn total(&self) -> usize {
        self.geometries + self.materials + self.textures
    }
}

#[derive(Debug, Default)]
struct Counters {
    geometries: Cell<usize>,
    materials: Cell<usize>,
    textures: Cell<usize>,
}

impl Counters {
    fn cell(&self, kind: ResourceKind) -> &Cell<usize> {
        match kind {
            ResourceKind::Geometry => &self.geometries,
            ResourceKind::Material => &self.materials,
            ResourceKind::Texture => &self.textures,
        }
    }
}

/// Shared counter of live resources. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    counters: Rc<Counters>,
}

impl ResourceTracker {
    /// Create a tracker with all counts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current live counts.
    #[must_use]
    pub fn live(&self) -> LiveResources {
        LiveResources {
            geometries: self.counters.geometries.get(),
            materials: self.counters.materials.get(),
            textures: self.counters.textures.get(),
        }
    }

    fn acquire(&self, kind: ResourceKind, label: String) -> Handle {
        let cell = self.counters.cell(kind);
        cell.set(cell.get() + 1);
        Handle {
            kind,
            label,
            tracker: self.clone(),
            released: false,
        }
    }
}

#[derive(Debug)]
struct Handle {
    kind: ResourceKind,
    label: String,
    tracker: ResourceTracker,
    released: bool,
}

impl Handle {
    fn release(&mut self) -> Result<(), DisposeError> {
        if self.released {
            return Err(DisposeError::AlreadyReleased(self.label.clone()));
        }
        let cell = self.tracker.counters.cell(self.kind);
        cell.set(cell.get().saturating_sub(1));
        self.released = true;
        Ok(())
    }
}

/// Vertex data uploaded for a mesh.
#[derive(Debug)]
pub struct Geometry {
    handle: Handle,
    vertex_count: usize,
}

impl Geometry {
    pub(crate) fn new(tracker: &ResourceTracker, label: String, vertex_count: usize) -> Self {
        Self {
            handle: tracker.acquire(ResourceKind::Geometry, label),
            vertex_count,
        }
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Whether the geometry has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.handle.released
    }
}

impl Disposable for Geometry {
    fn label(&self) -> String {
        self.handle.label.clone()
    }

    fn dispose(&mut self) -> Result<(), DisposeError> {
        self.handle.release()
    }
}

/// Image data sampled by a material.
#[derive(Debug)]
pub struct Texture {
    handle: Handle,
    width: u32,
    height: u32,
}

impl Texture {
    pub(crate) fn new(tracker: &ResourceTracker, label: String, width: u32, height: u32) -> Self {
        Self {
            handle: tracker.acquire(ResourceKind::Texture, label),
            width,
            height,
        }
    }

    /// `(width, height)` in texels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the texture has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.handle.released
    }
}

impl Disposable for Texture {
    fn label(&self) -> String {
        self.handle.label.clone()
    }

    fn dispose(&mut self) -> Result<(), DisposeError> {
        self.handle.release()
    }
}

/// A physically based material with optional texture maps.
#[derive(Debug)]
pub struct StandardMaterial {
    handle: Handle,
    /// Base color (RGBA).
    pub color: Vec4,
    textures: BTreeMap<TextureSlot, Texture>,
}

impl StandardMaterial {
    pub(crate) fn new(tracker: &ResourceTracker, label: String) -> Self {
        Self {
            handle: tracker.acquire(ResourceKind::Material, label),
            color: Vec4::ONE,
            textures: BTreeMap::new(),
        }
    }

    /// Bind `texture` to `slot`, returning the texture previously bound there.
    /// The caller owns the returned texture and must release it.
    pub fn set_texture(&mut self, slot: TextureSlot, texture: Texture) -> Option<Texture> {
        self.textures.insert(slot, texture)
    }

    /// The texture bound to `slot`.
    #[must_use]
    pub fn texture(&self, slot: TextureSlot) -> Option<&Texture> {
        self.textures.get(&slot)
    }

    /// Whether the material has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.handle.released
    }
}

impl Disposable for StandardMaterial {
    fn label(&self) -> String {
        self.handle.label.clone()
    }

    fn dispose(&mut self) -> Result<(), DisposeError> {
        self.handle.release()
    }
}

impl Material for StandardMaterial {
    fn texture_mut(&mut self, slot: TextureSlot) -> Option<&mut dyn Disposable> {
        self.textures
            .get_mut(&slot)
            .map(|texture| texture as &mut dyn Disposable)
    }
}

/// One material, or one material per geometry group.
#[derive(Debug)]
pub enum MaterialSlot {
    Single(StandardMaterial),
    Multi(Vec<StandardMaterial>),
}

impl MaterialSlot {
    /// Every material in the slot.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StandardMaterial> {
        match self {
            MaterialSlot::Single(material) => std::slice::from_mut(material).iter_mut(),
            MaterialSlot::Multi(materials) => materials.iter_mut(),
        }
    }
}

/// Geometry plus material: the renderable payload of a node.
#[derive(Debug)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: MaterialSlot,
}

impl Mesh {
    /// A mesh with a single material.
    #[must_use]
    pub fn new(geometry: Geometry, material: StandardMaterial) -> Self {
        Self {
            geometry,
            material: MaterialSlot::Single(material),
        }
    }

    /// A mesh with one material per geometry group.
    #[must_use]
    pub fn with_materials(geometry: Geometry, materials: Vec<StandardMaterial>) -> Self {
        Self {
            geometry,
            material: MaterialSlot::Multi(materials),
        }
    }
}

impl Renderable for Mesh {
    fn geometry_mut(&mut self) -> &mut dyn Disposable {
        &mut self.geometry
    }

    fn materials_mut(&mut self) -> Vec<&mut dyn Material> {
        self.material
            .iter_mut()
            .map(|material| material as &mut dyn Material)
            .collect()
    }
}
