//! The scene node contract consumed by [`CleanupRegistry`](crate::CleanupRegistry).
//!
//! The runtime does not implement a renderer. It only needs to detach a node
//! from its parent, walk the node's descendants, and reach the geometry,
//! material and texture slots those descendants expose. Any scene library
//! that implements [`SceneGraph`] can be torn down by the runtime.

use crate::disposable::Disposable;
use crate::error::DisposeError;

/// Handle to a node owned by a [`SceneGraph`].
///
/// Handles are plain numbers handed out by the scene. A handle outlives the
/// node it names; operations on a released node report
/// [`DisposeError::UnknownNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Well-known texture map slots a material may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureSlot {
    Map,
    NormalMap,
    RoughnessMap,
    MetalnessMap,
    AoMap,
    EmissiveMap,
    AlphaMap,
    BumpMap,
    DisplacementMap,
    EnvMap,
    LightMap,
    SpecularMap,
}

impl TextureSlot {
    /// Every slot, in the order they are released.
    pub const ALL: [TextureSlot; 12] = [
        TextureSlot::Map,
        TextureSlot::NormalMap,
        TextureSlot::RoughnessMap,
        TextureSlot::MetalnessMap,
        TextureSlot::AoMap,
        TextureSlot::EmissiveMap,
        TextureSlot::AlphaMap,
        TextureSlot::BumpMap,
        TextureSlot::DisplacementMap,
        TextureSlot::EnvMap,
        TextureSlot::LightMap,
        TextureSlot::SpecularMap,
    ];

    /// The conventional property name of the slot (e.g. `"normalMap"`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            TextureSlot::Map => "map",
            TextureSlot::NormalMap => "normalMap",
            TextureSlot::RoughnessMap => "roughnessMap",
            TextureSlot::MetalnessMap => "metalnessMap",
            TextureSlot::AoMap => "aoMap",
            TextureSlot::EmissiveMap => "emissiveMap",
            TextureSlot::AlphaMap => "alphaMap",
            TextureSlot::BumpMap => "bumpMap",
            TextureSlot::DisplacementMap => "displacementMap",
            TextureSlot::EnvMap => "envMap",
            TextureSlot::LightMap => "lightMap",
            TextureSlot::SpecularMap => "specularMap",
        }
    }
}

impl std::fmt::Display for TextureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A material: itself disposable, and possibly holding textures.
pub trait Material: Disposable {
    /// The texture bound to `slot`, if any.
    fn texture_mut(&mut self, slot: TextureSlot) -> Option<&mut dyn Disposable>;
}

/// A node payload exposing both a geometry slot and a material slot.
pub trait Renderable {
    /// The geometry slot.
    fn geometry_mut(&mut self) -> &mut dyn Disposable;

    /// Every material bound to the node. Single-material nodes return one
    /// element; multi-material nodes return each element in order.
    fn materials_mut(&mut self) -> Vec<&mut dyn Material>;
}

/// The narrow interface the runtime consumes from the scene library.
pub trait SceneGraph {
    /// Detach `node` from its parent. Detaching an orphan is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DisposeError::UnknownNode`] if the node does not exist.
    fn detach(&mut self, node: NodeId) -> Result<(), DisposeError>;

    /// The direct children of `node`, in order. Unknown nodes have none.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// The renderable payload of `node`, if it has one.
    fn renderable_mut(&mut self, node: NodeId) -> Option<&mut dyn Renderable>;

    /// Drop the storage of a detached subtree whose resources have been
    /// released. Scene libraries without node storage can ignore this.
    fn prune(&mut self, _node: NodeId) {}

    /// `node` followed by all of its descendants, depth-first pre-order.
    fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            order.push(current);
            // Reverse so the first child is visited first.
            stack.extend(self.children(current).into_iter().rev());
        }
        order
    }
}
