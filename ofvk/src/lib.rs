//! # Hardware Optical Flow over Vulkan
//!
//! This library exposes GPU optical flow estimation as sessions. A [`FlowInstance`] is created on
//! a device, a session is initialized with fixed geometry and quality parameters, images are
//! registered as buffers, and each frame binds those buffers and records a single estimation
//! command into a caller provided command buffer.
//!
//! The easiest way to use the library is to import its prelude:
//!
//! ```
//! use ofvk::prelude::v1::*;
//! ```
//!
//! [`FlowInstance`]: instance::FlowInstance

pub mod api;
pub mod capability;
pub mod caps;
pub mod device;
pub mod error;
pub mod execute;
pub mod handle;
pub mod image;
pub mod instance;
pub mod params;
pub mod queue;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod vulkan;

pub mod prelude {
    pub mod v1 {
        pub use crate::{
            capability::{Capability, CapabilityCache},
            caps::CapsParam,
            device::FlowDevice,
            error::{Error, Result},
            execute::BindingRole,
            handle::BufferHandle,
            image::ExternalImage,
            instance::FlowInstance,
            params::*,
            vulkan::VulkanDevice,
        };
        pub use ash::vk;
    }
}
