//! Disposal error types.

use crate::scene::NodeId;

/// Errors raised while releasing a resource.
///
/// These never escape a [`CleanupRegistry`](crate::CleanupRegistry) flush:
/// the registry logs them and moves on to the next item.
#[derive(Debug, thiserror::Error)]
pub enum DisposeError {
    /// The resource had already been released.
    #[error("`{0}` was already released")]
    AlreadyReleased(String),

    /// The scene does not know the node.
    #[error("scene node {0} does not exist")]
    UnknownNode(NodeId),

    /// The resource refused to release.
    #[error("failed to release `{resource}`: {reason}")]
    Failed {
        /// Diagnostic label of the resource.
        resource: String,
        /// Why the release failed.
        reason: String,
    },
}
