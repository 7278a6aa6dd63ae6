//! # Optical flow queue discovery

use crate::device::FlowDevice;
use crate::prelude::v1::*;
use ash::vk;

/// Find the first queue family in a property list that supports optical flow.
pub fn find_optical_flow_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .position(|f| f.queue_flags.contains(vk::QueueFlags::OPTICAL_FLOW_NV))
        .map(|i| i as u32)
}

/// Find the queue family optical flow work has to be submitted to.
///
/// Queue families are enumerated once per call.
pub fn find_optical_flow_queue(device: &impl FlowDevice) -> Result<u32> {
    find_optical_flow_family(&device.queue_family_properties()).ok_or(Error::NoOpticalFlowQueue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeDevice};

    #[test]
    fn finds_third_family() {
        let device = FakeDevice::default().with_queue_families([
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
            vk::QueueFlags::TRANSFER,
            vk::QueueFlags::OPTICAL_FLOW_NV,
            vk::QueueFlags::OPTICAL_FLOW_NV | vk::QueueFlags::TRANSFER,
        ]);

        assert_eq!(find_optical_flow_queue(&device), Ok(2));
        assert_eq!(device.calls(), vec![Call::QueueFamilyProperties]);
    }

    #[test]
    fn reports_missing_family() {
        let device = FakeDevice::default()
            .with_queue_families([vk::QueueFlags::GRAPHICS, vk::QueueFlags::VIDEO_DECODE_KHR]);

        assert_eq!(
            find_optical_flow_queue(&device),
            Err(Error::NoOpticalFlowQueue)
        );
    }

    #[test]
    fn empty_family_list() {
        assert_eq!(find_optical_flow_family(&[]), None);
    }
}
