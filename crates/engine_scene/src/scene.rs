//! The scene arena.

use std::collections::HashMap;

use engine_resource::{DisposeError, NodeId, Renderable, SceneGraph};
use glam::Mat4;
use tracing::debug;

use crate::error::SceneError;
use crate::node::{Node, NodeAllocator};
use crate::resources::{Geometry, LiveResources, Mesh, ResourceTracker, StandardMaterial, Texture};

/// A retained scene graph.
///
/// All nodes are owned by the scene and addressed by [`NodeId`]. A detached
/// node keeps its storage (it may be re-attached) until it is pruned.
#[derive(Debug)]
pub struct Scene {
    allocator: NodeAllocator,
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    tracker: ResourceTracker,
}

impl Scene {
    /// Create a scene containing only its root node.
    #[must_use]
    pub fn new() -> Self {
        let mut allocator = NodeAllocator::new();
        let root = allocator.allocate();
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::new("root", None));
        Self {
            allocator,
            nodes,
            root,
            tracker: ResourceTracker::new(),
        }
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The tracker counting this scene's resources.
    #[must_use]
    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    /// Live geometry, material and texture counts.
    #[must_use]
    pub fn live_resources(&self) -> LiveResources {
        self.tracker.live()
    }

    /// Allocate a geometry with `vertex_count` vertices.
    pub fn create_geometry(&self, label: impl Into<String>, vertex_count: usize) -> Geometry {
        Geometry::new(&self.tracker, label.into(), vertex_count)
    }

    /// Allocate a material.
    pub fn create_material(&self, label: impl Into<String>) -> StandardMaterial {
        StandardMaterial::new(&self.tracker, label.into())
    }

    /// Allocate a texture.
    pub fn create_texture(&self, label: impl Into<String>, width: u32, height: u32) -> Texture {
        Texture::new(&self.tracker, label.into(), width, height)
    }

    /// Add an empty node under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownNode`] if `parent` does not exist.
    pub fn spawn(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId, SceneError> {
        if !self.nodes.contains_key(&parent) {
            return Err(SceneError::UnknownNode(parent));
        }
        let id = self.allocator.allocate();
        self.nodes.insert(id, Node::new(name, Some(parent)));
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
        Ok(id)
    }

    /// Add a node carrying `mesh` under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownNode`] if `parent` does not exist. The
    /// mesh is dropped unreleased in that case.
    pub fn spawn_mesh(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        mesh: Mesh,
    ) -> Result<NodeId, SceneError> {
        let id = self.spawn(parent, name)?;
        if let Some(node) = self.nodes.get_mut(&id) {
            node.mesh = Some(mesh);
        }
        Ok(id)
    }

    /// Re-parent `node` under `parent`.
    ///
    /// # Errors
    ///
    /// Fails if either node is unknown, if `node` is the root, or if
    /// `parent` is `node` itself or one of its descendants.
    pub fn attach_to(&mut self, node: NodeId, parent: NodeId) -> Result<(), SceneError> {
        if node == self.root {
            return Err(SceneError::RootImmovable);
        }
        if !self.nodes.contains_key(&node) {
            return Err(SceneError::UnknownNode(node));
        }
        if !self.nodes.contains_key(&parent) {
            return Err(SceneError::UnknownNode(parent));
        }
        if self.is_ancestor_or_self(node, parent) {
            return Err(SceneError::Cycle { node, parent });
        }

        self.detach_node(node)?;
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(node);
        }
        if let Some(child) = self.nodes.get_mut(&node) {
            child.parent = Some(parent);
        }
        Ok(())
    }

    /// Remove `node` from its parent's children. The node keeps its subtree.
    ///
    /// # Errors
    ///
    /// Fails if the node is unknown or is the root.
    pub fn detach_node(&mut self, node: NodeId) -> Result<(), SceneError> {
        if node == self.root {
            return Err(SceneError::RootImmovable);
        }
        let parent = self
            .nodes
            .get_mut(&node)
            .ok_or(SceneError::UnknownNode(node))?
            .parent
            .take();
        if let Some(parent) = parent
            && let Some(parent_node) = self.nodes.get_mut(&parent)
        {
            parent_node.children.retain(|&child| child != node);
        }
        Ok(())
    }

    /// Returns the node with the given id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Returns the node with the given id, mutably.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Whether the scene stores `id` (attached or not).
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// The parent of `id`.
    #[must_use]
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(Node::parent)
    }

    /// The children of `id`. Unknown nodes have none.
    #[must_use]
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(Node::children).unwrap_or_default()
    }

    /// All descendants of `id`, depth-first pre-order, excluding `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut subtree = self.subtree(id);
        subtree.remove(0);
        subtree
    }

    /// Whether `id` is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent_of(node);
        }
        false
    }

    /// The world matrix of `id`, composed through its ancestors.
    #[must_use]
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let mut matrix = self.nodes.get(&id)?.transform.matrix();
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            let node = self.nodes.get(&parent)?;
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        Some(matrix)
    }

    /// Number of stored nodes, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene holds nothing but its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_of(id);
        }
        false
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph for Scene {
    fn detach(&mut self, node: NodeId) -> Result<(), DisposeError> {
        self.detach_node(node).map_err(|err| match err {
            SceneError::UnknownNode(id) => DisposeError::UnknownNode(id),
            other => DisposeError::Failed {
                resource: node.to_string(),
                reason: other.to_string(),
            },
        })
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.children_of(node).to_vec()
    }

    fn renderable_mut(&mut self, node: NodeId) -> Option<&mut dyn Renderable> {
        self.nodes
            .get_mut(&node)?
            .mesh
            .as_mut()
            .map(|mesh| mesh as &mut dyn Renderable)
    }

    fn prune(&mut self, node: NodeId) {
        // Re-attached nodes belong to someone else now.
        if self.parent_of(node).is_some() || node == self.root {
            return;
        }
        let subtree = self.subtree(node);
        for id in &subtree {
            self.nodes.remove(id);
        }
        debug!(%node, removed = subtree.len(), "pruned detached subtree");
    }
}
