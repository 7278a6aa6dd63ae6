//! # Optical flow sessions
//!
//! Translation of vendor neutral [`InitParams`] into device session creation, and the session
//! object itself.

use crate::device::{FlowDevice, PrivateDataDesc, SessionCreateDesc};
use crate::params::{BufferFormat, InitParams, OutputGridSize, PerfLevel, PredDirection};
use crate::prelude::v1::*;
use ash::vk;
use log::*;

/// Map a buffer format onto the device image format sessions are created with.
///
/// Only grayscale, NV12 and ABGR8 inputs have a device counterpart. Everything else is rejected
/// rather than passed to the device with an undefined format.
pub fn image_format(format: BufferFormat) -> Result<vk::Format> {
    match format {
        BufferFormat::Grayscale8 => Ok(vk::Format::R8_UNORM),
        BufferFormat::Nv12 => Ok(vk::Format::G8_B8R8_2PLANE_420_UNORM),
        BufferFormat::Abgr8 => Ok(vk::Format::B8G8R8A8_UNORM),
        BufferFormat::Undefined
        | BufferFormat::Short
        | BufferFormat::Short2
        | BufferFormat::Uint
        | BufferFormat::Uint8 => Err(Error::UnsupportedParameter {
            name: "input buffer format",
            value: format.as_raw(),
        }),
    }
}

/// Map a performance level, treating anything unknown as the device's unknown level.
pub fn performance_level(level: PerfLevel) -> vk::OpticalFlowPerformanceLevelNV {
    match level {
        PerfLevel::Slow => vk::OpticalFlowPerformanceLevelNV::SLOW,
        PerfLevel::Medium => vk::OpticalFlowPerformanceLevelNV::MEDIUM,
        PerfLevel::Fast => vk::OpticalFlowPerformanceLevelNV::FAST,
        PerfLevel::Undefined => vk::OpticalFlowPerformanceLevelNV::UNKNOWN,
    }
}

/// Map the requested output grid. Only 4x4 is available; undefined selects it as well.
pub fn output_grid_size(size: OutputGridSize) -> Result<vk::OpticalFlowGridSizeFlagsNV> {
    match size {
        OutputGridSize::Undefined | OutputGridSize::Four => {
            Ok(vk::OpticalFlowGridSizeFlagsNV::TYPE_4X4)
        }
        OutputGridSize::One | OutputGridSize::Two => Err(Error::UnsupportedParameter {
            name: "output grid size",
            value: size.as_raw(),
        }),
    }
}

/// Session creation flags implied by the enabled features.
pub fn create_flags(params: &InitParams) -> vk::OpticalFlowSessionCreateFlagsNV {
    let mut flags = vk::OpticalFlowSessionCreateFlagsNV::empty();

    if params.enable_external_hints {
        flags |= vk::OpticalFlowSessionCreateFlagsNV::ENABLE_HINT;
    }

    if params.enable_output_cost {
        flags |= vk::OpticalFlowSessionCreateFlagsNV::ENABLE_COST;
    }

    if params.enable_global_flow {
        flags |= vk::OpticalFlowSessionCreateFlagsNV::ENABLE_GLOBAL_FLOW;
    }

    if params.enable_roi {
        flags |= vk::OpticalFlowSessionCreateFlagsNV::ALLOW_REGIONS;
    }

    if params.pred_direction == PredDirection::Both {
        flags |= vk::OpticalFlowSessionCreateFlagsNV::BOTH_DIRECTIONS;
    }

    flags
}

/// Translate session parameters into the device creation descriptor.
///
/// Fails without touching any device if a parameter has no device counterpart.
pub fn create_desc(params: &InitParams) -> Result<SessionCreateDesc<'_>> {
    let private_data = params
        .private_data
        .as_ref()
        .map(|p| {
            let size = p.size().ok_or(Error::PrivateDataTooLarge {
                id: p.id,
                len: p.data.len(),
            })?;

            Ok::<_, Error>(PrivateDataDesc {
                id: p.id,
                size,
                data: &p.data,
            })
        })
        .transpose()?;

    Ok(SessionCreateDesc {
        width: params.width,
        height: params.height,
        image_format: image_format(params.input_buffer_format)?,
        output_grid_size: output_grid_size(params.out_grid_size)?,
        performance_level: performance_level(params.perf_level),
        flags: create_flags(params),
        private_data,
    })
}

/// Configured device side estimation context.
///
/// Geometry and format are fixed at creation. Changing them requires creating a new session.
#[derive(Debug)]
pub struct Session {
    handle: vk::OpticalFlowSessionNV,
    width: u32,
    height: u32,
    format: BufferFormat,
    perf_level: PerfLevel,
}

impl Session {
    /// Create a session on the device.
    ///
    /// Parameters are logged, translated, and passed to a single device creation call. The
    /// private data blob, if any, is chained to the creation call verbatim. On failure no session
    /// object exists.
    ///
    /// # Arguments
    ///
    /// * `device` - device to create the session on.
    /// * `params` - session parameters.
    pub fn create(device: &impl FlowDevice, params: &InitParams) -> Result<Self> {
        info!(
            "OFSessionInit params: width: {} height: {} outGrid: {:?} hintGrid: {:?} mode: {:?} perfLevel: {:?} enableExternalHints: {} enableOutputCost: {} privData: {:?} enableRoi: {} predDirection: {:?} enableGlobalFlow: {} inputBufferFormat: {:?}",
            params.width,
            params.height,
            params.out_grid_size,
            params.hint_grid_size,
            params.mode,
            params.perf_level,
            params.enable_external_hints,
            params.enable_output_cost,
            params.private_data.as_ref().map(|p| (p.id, p.data.len())),
            params.enable_roi,
            params.pred_direction,
            params.enable_global_flow,
            params.input_buffer_format,
        );

        let desc = create_desc(params)?;

        let handle = device.create_session(&desc).map_err(|e| {
            error!("failed to create optical flow session: {e}");
            Error::SessionCreation(e)
        })?;

        Ok(Self {
            handle,
            width: params.width,
            height: params.height,
            format: params.input_buffer_format,
            perf_level: params.perf_level,
        })
    }

    /// Release the device session.
    pub fn destroy(self, device: &impl FlowDevice) {
        if self.handle != vk::OpticalFlowSessionNV::null() {
            device.destroy_session(self.handle);
        }
    }

    pub fn handle(&self) -> vk::OpticalFlowSessionNV {
        self.handle
    }

    /// Width and height the session was created with.
    pub fn dim(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> BufferFormat {
        self.format
    }

    pub fn perf_level(&self) -> PerfLevel {
        self.perf_level
    }
}
