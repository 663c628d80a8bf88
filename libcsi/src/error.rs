//! CSI error types.
//!
//! All errors in the `libcsi` crate are represented by the [`CsiError`] enum,
//! which derives [`thiserror::Error`] for ergonomic error handling and also
//! implements [`Serialize`]/[`Deserialize`] so errors can travel across the
//! socket transport.  Every variant maps onto one categorical [`ErrorCode`]
//! that the orchestrator uses to decide whether a call may be retried.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categorical status code attached to every failed CSI call.
///
/// The numeric values match the gRPC status codes the CSI protocol is defined
/// against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Client specified a malformed or unsupported request.
    InvalidArgument = 3,
    /// The referenced volume does not exist.
    NotFound = 5,
    /// A duplicate forward transition was attempted.
    AlreadyExists = 6,
    /// The volume is not in the state the operation requires.
    FailedPrecondition = 9,
    /// A conflicting transition was rejected.
    Aborted = 10,
    /// The operation is not supported by this plugin.
    Unimplemented = 12,
    /// Filesystem or mount failure.
    Internal = 13,
    /// The plugin could not be reached.
    Unavailable = 14,
}

/// Unified error type for CSI operations.
#[derive(Debug, Error, Serialize, Deserialize, Clone)]
pub enum CsiError {
    /// The requested volume was not found.
    #[error("volume {0} not found")]
    VolumeNotFound(String),

    /// A controller attach was requested for a volume that is already
    /// attached.
    #[error("volume {0} already attached")]
    VolumeAlreadyAttached(String),

    /// A node operation requires the volume to be attached first.
    #[error("volume {0} not attached")]
    VolumeNotAttached(String),

    /// A node operation requires the volume to be staged first.
    #[error("volume {0} not staged")]
    VolumeNotStaged(String),

    /// The volume already has a staging path.
    #[error("volume {0} already staged")]
    VolumeAlreadyStaged(String),

    /// A mount operation failed.
    #[error("mount failed at {path}: {reason}")]
    MountFailed {
        /// Filesystem path where the mount was attempted.
        path: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// An unmount operation failed.
    #[error("unmount failed at {path}: {reason}")]
    UnmountFailed {
        /// Filesystem path where the unmount was attempted.
        path: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// The backing directory store returned an error.
    #[error("backend error: {0}")]
    BackendError(String),

    /// A socket / transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The caller supplied an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is deliberately not implemented by this plugin.
    #[error("{0} is not implemented")]
    Unimplemented(String),

    /// An unclassified internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CsiError {
    /// Create a [`CsiError::BackendError`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn backend<E: std::fmt::Display>(e: E) -> Self {
        Self::BackendError(e.to_string())
    }

    /// Create a [`CsiError::TransportError`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn transport<E: std::fmt::Display>(e: E) -> Self {
        Self::TransportError(e.to_string())
    }

    /// Create a [`CsiError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }

    /// Create a [`CsiError::Unimplemented`] naming the rejected operation.
    pub fn unimplemented(operation: &str) -> Self {
        Self::Unimplemented(operation.to_owned())
    }

    /// The categorical status code reported to the caller.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::VolumeNotFound(_) => ErrorCode::NotFound,
            Self::VolumeAlreadyAttached(_) => ErrorCode::Aborted,
            Self::VolumeNotAttached(_) | Self::VolumeNotStaged(_) => ErrorCode::FailedPrecondition,
            Self::VolumeAlreadyStaged(_) => ErrorCode::AlreadyExists,
            Self::MountFailed { .. }
            | Self::UnmountFailed { .. }
            | Self::BackendError(_)
            | Self::Internal(_) => ErrorCode::Internal,
            Self::TransportError(_) => ErrorCode::Unavailable,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Unimplemented(_) => ErrorCode::Unimplemented,
        }
    }
}
