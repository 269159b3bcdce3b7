//! Scene graph error types.

use engine_resource::NodeId;

/// Errors returned by [`Scene`](crate::Scene) operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    /// The node does not exist in this scene.
    #[error("scene node {0} does not exist")]
    UnknownNode(NodeId),

    /// Attaching would make a node its own ancestor.
    #[error("attaching {node} under {parent} would create a cycle")]
    Cycle {
        /// The node being attached.
        node: NodeId,
        /// The requested parent.
        parent: NodeId,
    },

    /// The root node cannot be detached or re-parented.
    #[error("the scene root cannot be moved")]
    RootImmovable,
}
