//! # Static capability reporting

use crate::params::OutputGridSize;
use crate::prelude::v1::*;

/// Capability ids of the vendor API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[repr(u32)]
pub enum CapsParam {
    SupportedOutputGridSizes = 0,
    SupportedHintGridSizes = 1,
    SupportHintWithOfMode = 2,
    SupportHintWithStMode = 3,
    WidthMin = 4,
    HeightMin = 5,
    WidthMax = 6,
    HeightMax = 7,
    SupportRoi = 8,
    SupportRoiMaxNum = 9,
}

impl CapsParam {
    pub const ALL: [Self; 10] = [
        Self::SupportedOutputGridSizes,
        Self::SupportedHintGridSizes,
        Self::SupportHintWithOfMode,
        Self::SupportHintWithStMode,
        Self::WidthMin,
        Self::HeightMin,
        Self::WidthMax,
        Self::HeightMax,
        Self::SupportRoi,
        Self::SupportRoiMaxNum,
    ];

    pub fn try_from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

const OUTPUT_GRID_SIZES: [u32; 1] = [OutputGridSize::Four as u32];

/// Query a static capability.
///
/// Only the supported output grid sizes are answered, always with the single 4x4 grid. Every
/// other capability is reported as unsupported.
pub fn get_caps(param: CapsParam) -> Result<&'static [u32]> {
    match param {
        // TODO: ask the physical device for its supported grid sizes once sessions can be
        // created with anything other than 4x4.
        CapsParam::SupportedOutputGridSizes => Ok(&OUTPUT_GRID_SIZES),
        other => Err(Error::UnsupportedCapability(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_grid_sizes() {
        assert_eq!(get_caps(CapsParam::SupportedOutputGridSizes), Ok(&[4u32][..]));
    }

    #[test]
    fn everything_else_unsupported() {
        for param in CapsParam::ALL.into_iter().skip(1) {
            assert_eq!(get_caps(param), Err(Error::UnsupportedCapability(param)));
        }
    }

    #[test]
    fn raw_ids() {
        for param in CapsParam::ALL {
            assert_eq!(CapsParam::try_from_raw(param.as_raw()), Some(param));
        }
        assert_eq!(CapsParam::try_from_raw(10), None);
    }
}
