//! # Status code surface
//!
//! Entry points for a vendor API dispatch layer. Errors are logged and collapsed into the
//! coarse [`Status`] codes the vendor API defines; callers at this level do not get to
//! distinguish device failure causes.

use crate::caps::CapsParam;
use crate::device::FlowDevice;
use crate::handle::BufferHandle;
use crate::image::ExternalImage;
use crate::instance::FlowInstance;
use crate::params::{ExecuteInputParams, ExecuteOutputParams, InitParams};
use crate::prelude::v1::*;
use ash::vk;
use log::*;

/// Vendor API status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Status {
    Success = 0,
    NotAvailable = 1,
    GenericError = 11,
}

impl Status {
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

impl From<&Error> for Status {
    fn from(err: &Error) -> Self {
        match err {
            Error::CapabilityAbsent(_) | Error::NoOpticalFlowQueue => Self::NotAvailable,
            _ => Self::GenericError,
        }
    }
}

impl<T> From<Result<T>> for Status {
    fn from(res: Result<T>) -> Self {
        match res {
            Ok(_) => Self::Success,
            Err(e) => (&e).into(),
        }
    }
}

fn status<T>(call: &str, res: Result<T>) -> Status {
    if let Err(e) = &res {
        error!("{call}: {e}");
    }
    res.into()
}

/// Create an optical flow instance on a Vulkan backed device.
///
/// # Arguments
///
/// * `device` - device to create the instance on.
/// * `instance` - receives the instance on success.
pub fn create_instance_vk<D: FlowDevice>(
    device: D,
    instance: &mut Option<FlowInstance<D>>,
) -> Status {
    match FlowInstance::new(device) {
        Ok(i) => {
            *instance = Some(i);
            Status::Success
        }
        Err(e) => status::<()>("CreateInstanceVk", Err(e)),
    }
}

/// CUDA interop is not provided by this layer.
pub fn create_instance_cuda(api_version: u32) -> Status {
    info!("CreateInstanceCuda (api version {api_version:#x}) is not available");
    Status::NotAvailable
}

pub fn init_session<D: FlowDevice>(instance: &mut FlowInstance<D>, params: &InitParams) -> Status {
    status("InitSession", instance.init_session(params))
}

/// Register an image, writing its raw handle on success.
///
/// # Arguments
///
/// * `instance` - instance to register with.
/// * `image` - caller owned image.
/// * `format` - view format.
/// * `handle` - receives the raw buffer handle.
pub fn register_buffer<D: FlowDevice>(
    instance: &mut FlowInstance<D>,
    image: ExternalImage,
    format: vk::Format,
    handle: &mut u64,
) -> Status {
    let res = instance.register_buffer(image, format).map(|h| {
        *handle = h.as_raw();
    });
    status("RegisterBuffer", res)
}

/// Release a raw buffer handle. Releasing the null handle succeeds without doing anything.
pub fn unregister_buffer<D: FlowDevice>(instance: &mut FlowInstance<D>, handle: u64) -> Status {
    match BufferHandle::from_raw(handle) {
        Some(h) => status("UnregisterBuffer", instance.unregister_buffer(h)),
        None => Status::Success,
    }
}

pub fn record_execute<D: FlowDevice>(
    instance: &mut FlowInstance<D>,
    input: &ExecuteInputParams,
    output: &ExecuteOutputParams,
    command_buffer: vk::CommandBuffer,
) -> Status {
    status(
        "RecordCmdBuf",
        instance.record_execute(input, output, command_buffer),
    )
}

/// Query a capability by raw id.
///
/// `size` always receives the number of values. Values are written into `values` only when it
/// is provided, up to its length.
///
/// # Arguments
///
/// * `instance` - instance to query.
/// * `param` - raw capability id.
/// * `values` - optional output for the capability values.
/// * `size` - receives the number of values.
pub fn get_caps<D: FlowDevice>(
    instance: &FlowInstance<D>,
    param: u32,
    values: Option<&mut [u32]>,
    size: &mut u32,
) -> Status {
    let caps = match CapsParam::try_from_raw(param) {
        Some(param) => instance.get_caps(param),
        None => {
            warn!("GetCaps: unknown capability id {param}");
            return Status::GenericError;
        }
    };

    let res = caps.map(|caps| {
        *size = caps.len() as u32;
        if let Some(values) = values {
            values
                .iter_mut()
                .zip(caps)
                .for_each(|(out, &val)| *out = val);
        }
    });

    status("GetCaps", res)
}
