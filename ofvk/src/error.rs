//! # Error types

use crate::caps::CapsParam;
use crate::execute::BindingRole;
use crate::handle::BufferHandle;
use ash::vk;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by optical flow instances and sessions.
///
/// Device failures keep the underlying `vk::Result` for logging, but the
/// status surface in [`crate::api`] collapses them into a single generic code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("device does not expose {0}")]
    CapabilityAbsent(&'static str),

    #[error("no queue family supports optical flow")]
    NoOpticalFlowQueue,

    #[error("no optical flow session has been initialized")]
    NoSession,

    #[error("unsupported {name} value {value}")]
    UnsupportedParameter { name: &'static str, value: u32 },

    #[error("unsupported capability query {0:?}")]
    UnsupportedCapability(CapsParam),

    #[error("stale or unknown buffer handle {0:?}")]
    InvalidHandle(BufferHandle),

    #[error("private data {id} is {len} bytes, expected at least {expected}")]
    MalformedPrivateData { id: u32, len: usize, expected: usize },

    #[error("private data {id} is {len} bytes, which exceeds the device limit")]
    PrivateDataTooLarge { id: u32, len: usize },

    #[error("no buffer handles left")]
    HandlesExhausted,

    #[error("failed to create image view ({0})")]
    ViewCreation(vk::Result),

    #[error("failed to create optical flow session ({0})")]
    SessionCreation(vk::Result),

    #[error("failed to bind {role:?} to session ({result})")]
    Bind {
        role: BindingRole,
        result: vk::Result,
    },
}
