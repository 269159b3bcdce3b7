//! Scene nodes, their transforms, and node id allocation.

use engine_resource::NodeId;
use glam::{Mat4, Quat, Vec3};

use crate::resources::Mesh;

/// Local transform of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Offset from the parent's origin.
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Transform {
    /// Origin, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// An identity transform moved to `position`.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// The local 4×4 matrix.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Apply `rotation` on top of the current rotation.
    pub fn rotate(&mut self, rotation: Quat) {
        self.rotation = (rotation * self.rotation).normalize();
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A node in the scene arena.
#[derive(Debug)]
pub struct Node {
    /// Diagnostic name.
    pub name: String,
    /// Local transform.
    pub transform: Transform,
    /// Whether the node is drawn.
    pub visible: bool,
    /// Optional renderable payload.
    pub mesh: Option<Mesh>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            visible: true,
            mesh: None,
            parent,
            children: Vec::new(),
        }
    }

    /// The parent node, or `None` for the root and detached nodes.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Direct children in insertion order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Hands out node handles for one [`Scene`](crate::Scene). Handles are
/// never reused, so a stale handle cannot alias a newer node.
#[derive(Debug)]
pub struct NodeAllocator {
    issued: u64,
}

impl NodeAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self { issued: 0 }
    }

    /// The next unused handle.
    pub fn allocate(&mut self) -> NodeId {
        self.issued += 1;
        NodeId(self.issued)
    }

    /// How many handles have been issued.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

impl Default for NodeAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_never_reused() {
        let mut nodes = NodeAllocator::new();
        assert_eq!(nodes.allocate(), NodeId(1));
        assert_eq!(nodes.allocate(), NodeId(2));
        assert_eq!(nodes.issued(), 2);
    }

    #[test]
    fn test_identity_matrix() {
        assert_eq!(Transform::IDENTITY.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_rotate_accumulates() {
        let mut t = Transform::from_position(Vec3::X);
        let quarter = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        t.rotate(quarter);
        t.rotate(quarter);
        let half = Quat::from_rotation_y(std::f32::consts::PI);
        assert!(t.rotation.abs_diff_eq(half, 1e-5) || t.rotation.abs_diff_eq(-half, 1e-5));
        assert_eq!(t.position, Vec3::X);
    }
}
