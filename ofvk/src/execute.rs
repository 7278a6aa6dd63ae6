//! # Resource binding and execution recording

use crate::device::{ExecuteDesc, FlowDevice};
use crate::handle::{BufferHandle, HandleArena};
use crate::image::GpuImage;
use crate::params::{
    ExecuteInputParams, ExecuteOutputParams, InputMips, Roi, EXECUTE_PRIV_DATA_ID_INPUT_MIPS,
};
use crate::prelude::v1::*;
use crate::session::Session;
use ash::vk;
use log::*;

/// The role a registered buffer plays in one execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum BindingRole {
    Input,
    Reference,
    FlowVector,
    Cost,
    BackwardFlowVector,
    BackwardCost,
    GlobalFlow,
}

impl BindingRole {
    pub fn binding_point(self) -> vk::OpticalFlowSessionBindingPointNV {
        match self {
            Self::Input => vk::OpticalFlowSessionBindingPointNV::INPUT,
            Self::Reference => vk::OpticalFlowSessionBindingPointNV::REFERENCE,
            Self::FlowVector => vk::OpticalFlowSessionBindingPointNV::FLOW_VECTOR,
            Self::Cost => vk::OpticalFlowSessionBindingPointNV::COST,
            Self::BackwardFlowVector => vk::OpticalFlowSessionBindingPointNV::BACKWARD_FLOW_VECTOR,
            Self::BackwardCost => vk::OpticalFlowSessionBindingPointNV::BACKWARD_COST,
            Self::GlobalFlow => vk::OpticalFlowSessionBindingPointNV::GLOBAL_FLOW,
        }
    }
}

/// Convert regions of interest into device rectangles, keeping their order.
///
/// Offsets beyond `i32::MAX` have no device representation and are rejected.
pub fn regions(rois: &[Roi]) -> Result<Vec<vk::Rect2D>> {
    let offset = |value: u32| {
        i32::try_from(value).map_err(|_| Error::UnsupportedParameter {
            name: "roi offset",
            value,
        })
    };

    rois.iter()
        .map(|roi| {
            Ok(vk::Rect2D {
                offset: vk::Offset2D {
                    x: offset(roi.start_x)?,
                    y: offset(roi.start_y)?,
                },
                extent: vk::Extent2D {
                    width: roi.width,
                    height: roi.height,
                },
            })
        })
        .collect()
}

/// Execution flags for the given input parameters.
pub fn execute_flags(params: &ExecuteInputParams) -> vk::OpticalFlowExecuteFlagsNV {
    let mut flags = vk::OpticalFlowExecuteFlagsNV::empty();

    if params.disable_temporal_hints {
        flags |= vk::OpticalFlowExecuteFlagsNV::DISABLE_TEMPORAL_HINTS;
    }

    flags
}

/// Binds registered buffers to a session and records executions.
///
/// Binding state lives on the session, so binds and the execution they feed must not interleave
/// with those of another recorder on the same session.
pub struct Recorder<'a, D> {
    device: &'a D,
    session: &'a Session,
    images: &'a HandleArena<GpuImage>,
}

impl<'a, D: FlowDevice> Recorder<'a, D> {
    pub fn new(device: &'a D, session: &'a Session, images: &'a HandleArena<GpuImage>) -> Self {
        Self {
            device,
            session,
            images,
        }
    }

    /// Bind a registered buffer to the session.
    ///
    /// A missing handle is not an error and results in no device call. The image is expected to
    /// already be in the general layout; no transitions are recorded here.
    ///
    /// # Arguments
    ///
    /// * `handle` - buffer to bind, if any.
    /// * `role` - binding point to bind it at.
    pub fn bind(&self, handle: Option<BufferHandle>, role: BindingRole) -> Result<()> {
        let handle = match handle {
            Some(handle) => handle,
            None => return Ok(()),
        };

        let view = self
            .images
            .get(handle)
            .and_then(GpuImage::view)
            .ok_or(Error::InvalidHandle(handle))?;

        debug!("bind {role:?} <- {handle:?} ({view:?})");

        self.device
            .bind_session_image(
                self.session.handle(),
                role.binding_point(),
                view,
                vk::ImageLayout::GENERAL,
            )
            .map_err(|result| Error::Bind { role, result })
    }

    /// Bind every resource of an execution and record it.
    ///
    /// Regions of interest and the input mips payload are checked before anything is bound. The
    /// seven top level roles are bound next, followed by the input mips pairs if the input
    /// private data selects them. Only once all binds succeed is the single execution command
    /// recorded. On failure nothing is written to the command buffer.
    ///
    /// # Arguments
    ///
    /// * `input` - execution inputs.
    /// * `output` - execution outputs.
    /// * `command_buffer` - command buffer to record into.
    pub fn record(
        &self,
        input: &ExecuteInputParams,
        output: &ExecuteOutputParams,
        command_buffer: vk::CommandBuffer,
    ) -> Result<()> {
        let regions = regions(&input.rois)?;

        let mips = input
            .private_data
            .as_ref()
            .filter(|p| p.id == EXECUTE_PRIV_DATA_ID_INPUT_MIPS)
            .map(|p| {
                InputMips::parse(&p.data).ok_or(Error::MalformedPrivateData {
                    id: p.id,
                    len: p.data.len(),
                    expected: std::mem::size_of::<InputMips>(),
                })
            })
            .transpose()?;

        let binds = [
            (input.input_frame, BindingRole::Input),
            (input.reference_frame, BindingRole::Reference),
            (output.output, BindingRole::FlowVector),
            (output.output_cost, BindingRole::Cost),
            (output.bwd_output, BindingRole::BackwardFlowVector),
            (output.bwd_output_cost, BindingRole::BackwardCost),
            (output.global_flow, BindingRole::GlobalFlow),
        ];

        for (handle, role) in binds {
            self.bind(handle, role)?;
        }

        if let Some(mips) = mips {
            // Levels go in ascending order, hierarchical estimation depends on it.
            for (level, input, reference) in mips.populated_levels() {
                trace!("input mip level {level}");
                self.bind(Some(input), BindingRole::Input)?;
                self.bind(Some(reference), BindingRole::Reference)?;
            }
        }

        let desc = ExecuteDesc {
            flags: execute_flags(input),
            regions: &regions,
        };

        debug!(
            "record optical flow execution: {} regions, flags {:?}",
            regions.len(),
            desc.flags
        );

        self.device.cmd_execute(command_buffer, self.session.handle(), &desc);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roi_round_trip() {
        let rois = [Roi::new(0, 0, 64, 64), Roi::new(64, 0, 32, 32)];
        let rects = regions(&rois).unwrap();

        assert_eq!(rects.len(), 2);
        for (roi, rect) in rois.iter().zip(&rects) {
            assert_eq!(rect.offset.x, roi.start_x as i32);
            assert_eq!(rect.offset.y, roi.start_y as i32);
            assert_eq!(rect.extent.width, roi.width);
            assert_eq!(rect.extent.height, roi.height);
        }
        assert_eq!(rects[1].offset.x, 64);
        assert_eq!(rects[1].extent.width, 32);
    }

    #[test]
    fn no_rois_means_whole_frame() {
        assert!(regions(&[]).unwrap().is_empty());
    }

    #[test]
    fn oversized_roi_offset_rejected() {
        assert_eq!(
            regions(&[Roi::new(0x8000_0000, 5, 16, 16)]),
            Err(Error::UnsupportedParameter {
                name: "roi offset",
                value: 0x8000_0000
            })
        );
        assert_eq!(
            regions(&[Roi::new(0, 0, 8, 8), Roi::new(1, u32::MAX, 8, 8)]),
            Err(Error::UnsupportedParameter {
                name: "roi offset",
                value: u32::MAX
            })
        );

        let edge = regions(&[Roi::new(i32::MAX as u32, 0, 1, 1)]).unwrap();
        assert_eq!(edge[0].offset.x, i32::MAX);
    }

    #[test]
    fn temporal_hint_flag() {
        let mut params = ExecuteInputParams::default();
        assert_eq!(execute_flags(&params), vk::OpticalFlowExecuteFlagsNV::empty());
        params.disable_temporal_hints = true;
        assert_eq!(
            execute_flags(&params),
            vk::OpticalFlowExecuteFlagsNV::DISABLE_TEMPORAL_HINTS
        );
    }

    #[test]
    fn binding_points_are_distinct() {
        let roles = [
            BindingRole::Input,
            BindingRole::Reference,
            BindingRole::FlowVector,
            BindingRole::Cost,
            BindingRole::BackwardFlowVector,
            BindingRole::BackwardCost,
            BindingRole::GlobalFlow,
        ];
        let points = roles
            .iter()
            .map(|r| r.binding_point())
            .collect::<std::collections::HashSet<_>>();
        assert_eq!(points.len(), roles.len());
    }
}
