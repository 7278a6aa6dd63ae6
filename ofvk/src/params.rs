//! # Session and execution parameters
//!
//! Vendor neutral descriptors passed into [`FlowInstance`](crate::instance::FlowInstance). Enum
//! discriminants match the raw values used by the optical flow vendor API, so the status surface
//! can convert between the two without lookup tables.

use crate::handle::BufferHandle;
use bytemuck::{Pod, Zeroable};

/// Private data id selecting the hierarchical input variant of execution.
pub const EXECUTE_PRIV_DATA_ID_INPUT_MIPS: u32 = 6;

/// Number of extra input/reference pairs carried by [`InputMips`].
pub const INPUT_MIPS_LEVELS: usize = 6;

macro_rules! raw_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $val:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
        #[repr(u32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $val),*
        }

        impl $name {
            /// Convert from the raw vendor value.
            pub fn try_from_raw(raw: u32) -> Option<Self> {
                match raw {
                    $($val => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Get the raw vendor value.
            pub fn as_raw(self) -> u32 {
                self as u32
            }
        }
    };
}

raw_enum!(
    /// Granularity of the produced motion vector field.
    OutputGridSize {
        Undefined = 0,
        One = 1,
        Two = 2,
        Four = 4,
    }
);

raw_enum!(
    /// Granularity of externally supplied hint vectors.
    HintGridSize {
        Undefined = 0,
        One = 1,
        Two = 2,
        Four = 4,
        Eight = 8,
    }
);

raw_enum!(
    /// Estimation mode.
    FlowMode {
        Undefined = 0,
        OpticalFlow = 1,
        StereoDisparity = 2,
    }
);

raw_enum!(
    /// Performance/quality trade-off of the session.
    PerfLevel {
        Undefined = 0,
        Slow = 5,
        Medium = 10,
        Fast = 20,
    }
);

raw_enum!(
    /// Pixel format of registered buffers.
    BufferFormat {
        Undefined = 0,
        Grayscale8 = 1,
        /// Biplanar 4:2:0.
        Nv12 = 2,
        /// Packed 8 bit per channel, stored as BGRA in memory.
        Abgr8 = 3,
        Short = 4,
        Short2 = 5,
        Uint = 6,
        Uint8 = 7,
    }
);

raw_enum!(
    /// Which flow directions a session produces.
    PredDirection {
        Forward = 0,
        Both = 1,
    }
);

impl PerfLevel {
    /// Convert from the raw vendor value, falling back to `Undefined` on unknown values.
    pub fn from_raw(raw: u32) -> Self {
        Self::try_from_raw(raw).unwrap_or(Self::Undefined)
    }
}

fn payload_size(len: usize) -> Option<u32> {
    u32::try_from(len).ok()
}

/// Opaque blob forwarded to the device untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct PrivateData {
    pub id: u32,
    pub data: Vec<u8>,
}

impl PrivateData {
    pub fn new(id: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Size of the payload, as reported to the device.
    ///
    /// Returns `None` if the payload is too large to describe to the device.
    pub fn size(&self) -> Option<u32> {
        payload_size(self.data.len())
    }
}

/// Session initialization parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InitParams {
    pub width: u32,
    pub height: u32,
    pub out_grid_size: OutputGridSize,
    pub hint_grid_size: HintGridSize,
    pub mode: FlowMode,
    pub perf_level: PerfLevel,
    pub enable_external_hints: bool,
    pub enable_output_cost: bool,
    pub private_data: Option<PrivateData>,
    pub enable_roi: bool,
    pub pred_direction: PredDirection,
    pub enable_global_flow: bool,
    pub input_buffer_format: BufferFormat,
}

impl Default for InitParams {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            out_grid_size: OutputGridSize::Four,
            hint_grid_size: HintGridSize::Undefined,
            mode: FlowMode::OpticalFlow,
            perf_level: PerfLevel::Medium,
            enable_external_hints: false,
            enable_output_cost: false,
            private_data: None,
            enable_roi: false,
            pred_direction: PredDirection::Forward,
            enable_global_flow: false,
            input_buffer_format: BufferFormat::Abgr8,
        }
    }
}

/// Region of interest rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct Roi {
    pub start_x: u32,
    pub start_y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(start_x: u32, start_y: u32, width: u32, height: u32) -> Self {
        Self {
            start_x,
            start_y,
            width,
            height,
        }
    }
}

impl From<(u32, u32, u32, u32)> for Roi {
    fn from((x, y, w, h): (u32, u32, u32, u32)) -> Self {
        Self::new(x, y, w, h)
    }
}

/// Per-execution inputs.
#[derive(Clone, Debug, Default)]
pub struct ExecuteInputParams {
    pub input_frame: Option<BufferHandle>,
    pub reference_frame: Option<BufferHandle>,
    pub disable_temporal_hints: bool,
    /// Regions to estimate, in order. Empty means the whole frame.
    pub rois: Vec<Roi>,
    pub private_data: Option<PrivateData>,
}

/// Per-execution outputs.
#[derive(Clone, Debug, Default)]
pub struct ExecuteOutputParams {
    pub output: Option<BufferHandle>,
    pub output_cost: Option<BufferHandle>,
    pub bwd_output: Option<BufferHandle>,
    pub bwd_output_cost: Option<BufferHandle>,
    pub global_flow: Option<BufferHandle>,
}

/// Payload of the input mips private data.
///
/// Raw buffer handles of up to 6 lower resolution input/reference pairs. A zero handle marks an
/// unused level. On the wire the handles are followed by reserved bytes, which are ignored.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct InputMips {
    pub input: [u64; INPUT_MIPS_LEVELS],
    pub reference: [u64; INPUT_MIPS_LEVELS],
}

impl InputMips {
    /// Size of the full payload, including the reserved tail.
    pub const PAYLOAD_SIZE: usize = 200;

    /// Set the handles of a mip level.
    ///
    /// # Arguments
    ///
    /// * `level` - mip level, below [`INPUT_MIPS_LEVELS`].
    /// * `input` - input frame at this level.
    /// * `reference` - reference frame at this level.
    pub fn set_level(
        &mut self,
        level: usize,
        input: Option<BufferHandle>,
        reference: Option<BufferHandle>,
    ) {
        self.input[level] = input.map(BufferHandle::as_raw).unwrap_or(0);
        self.reference[level] = reference.map(BufferHandle::as_raw).unwrap_or(0);
    }

    /// Levels that carry both an input and a reference, in ascending order.
    pub fn populated_levels(
        &self,
    ) -> impl Iterator<Item = (usize, BufferHandle, BufferHandle)> + '_ {
        (0..INPUT_MIPS_LEVELS).filter_map(move |i| {
            Some((
                i,
                BufferHandle::from_raw(self.input[i])?,
                BufferHandle::from_raw(self.reference[i])?,
            ))
        })
    }

    /// Parse the handles from the start of a payload.
    ///
    /// Returns `None` if the payload is too short to hold them.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        payload
            .get(..std::mem::size_of::<Self>())
            .map(bytemuck::pod_read_unaligned)
    }

    /// Wrap into private data with the input mips id.
    pub fn into_private_data(self) -> PrivateData {
        let mut data = bytemuck::bytes_of(&self).to_vec();
        data.resize(Self::PAYLOAD_SIZE, 0);
        PrivateData::new(EXECUTE_PRIV_DATA_ID_INPUT_MIPS, data)
    }
}
