//! Error types for the edge client.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for edge operations.
pub type Result<T> = std::result::Result<T, EdgeError>;

/// Errors that can occur when talking to an edge deployment.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// The endpoint could not be reached or the channel broke down.
    #[error("cannot reach edge endpoint {origin}: {source}")]
    Connect {
        /// The `host:port` origin that was dialed.
        origin: String,
        /// Underlying transport error.
        #[source]
        source: tonic::transport::Error,
    },

    /// The server answered an RPC with a non-OK status.
    #[error("rpc failed with {code:?}: {message}")]
    Rpc {
        /// gRPC status code.
        code: tonic::Code,
        /// Status message from the server.
        message: String,
    },

    /// The provided input sources do not have a submittable shape.
    #[error("invalid input sources: {message}")]
    InvalidSources {
        /// Description of the shape problem.
        message: String,
    },

    /// A blocking wait gave up before the job reached a terminal state.
    #[error("timed out after waiting {waited:?}")]
    Timeout {
        /// How long the caller waited before giving up.
        waited: Duration,
    },
}

impl EdgeError {
    /// Returns the gRPC status code behind this error, when one exists.
    pub fn code(&self) -> Option<tonic::Code> {
        match self {
            EdgeError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` when a blocking wait exhausted its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, EdgeError::Timeout { .. })
    }
}

impl From<tonic::Status> for EdgeError {
    fn from(status: tonic::Status) -> Self {
        EdgeError::Rpc {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}
