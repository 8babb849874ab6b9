use crate::client::Version;

/// Failures reported by a [`CoordinationClient`].
///
/// [`CoordinationClient`]: crate::CoordinationClient
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientError {
    /// `create` targeted a path that already holds a node.
    #[error("node already exists: {path}")]
    NodeExists { path: String },

    /// The addressed node does not exist.
    #[error("no node: {path}")]
    NoNode { path: String },

    /// `set_data` carried a stale version token.
    #[error("bad version at {path}: expected {expected}, found {actual}")]
    BadVersion {
        path: String,
        expected: Version,
        actual: Version,
    },

    /// The transport to the coordination service was lost.
    #[error("connection lost: {reason}")]
    ConnectionLoss { reason: String },

    /// The client session was closed and can no longer issue calls.
    #[error("session closed")]
    SessionClosed,
}
