//! # Vulkan backend
//!
//! [`FlowDevice`] on top of `VK_NV_optical_flow`.

use crate::device::{ExecuteDesc, FlowDevice, SessionCreateDesc};
use ash::prelude::VkResult;
use ash::vk;
use std::ffi::CStr;
use std::ptr;

/// Vulkan device with the optical flow function table loaded.
///
/// The instance and device are borrowed. They are not destroyed on drop.
#[derive(Clone)]
pub struct VulkanDevice {
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    fp: ash::nv::optical_flow::DeviceFn,
}

impl VulkanDevice {
    /// Load optical flow entry points for a device.
    ///
    /// If the device was created without `VK_NV_optical_flow`, the extension entry points are
    /// left unloaded; calling them panics. [`FlowInstance`](crate::instance::FlowInstance)
    /// checks the extension before using any of them.
    ///
    /// # Safety
    ///
    /// `device` must have been created from `physical_device` of `instance`, and all three must
    /// outlive the returned value.
    pub unsafe fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
    ) -> Self {
        let optical_flow = ash::nv::optical_flow::Device::new(instance, device);

        Self {
            instance: instance.clone(),
            physical_device,
            device: device.clone(),
            fp: optical_flow.fp().clone(),
        }
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }
}

impl FlowDevice for VulkanDevice {
    fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties> {
        unsafe {
            self.instance
                .get_physical_device_queue_family_properties(self.physical_device)
        }
    }

    fn supports_extension(&self, name: &CStr) -> bool {
        let extensions = unsafe {
            self.instance
                .enumerate_device_extension_properties(self.physical_device)
        };

        match extensions {
            Ok(extensions) => extensions
                .iter()
                .any(|e| unsafe { CStr::from_ptr(e.extension_name.as_ptr()) } == name),
            Err(e) => {
                log::warn!("failed to enumerate device extensions: {e}");
                false
            }
        }
    }

    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> VkResult<vk::ImageView> {
        let info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe { self.device.create_image_view(&info, None) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn create_session(&self, desc: &SessionCreateDesc) -> VkResult<vk::OpticalFlowSessionNV> {
        let mut priv_info = vk::OpticalFlowSessionCreatePrivateDataInfoNV::default();

        let mut info = vk::OpticalFlowSessionCreateInfoNV::default()
            .width(desc.width)
            .height(desc.height)
            .image_format(desc.image_format)
            .output_grid_size(desc.output_grid_size)
            .performance_level(desc.performance_level)
            .flags(desc.flags);

        if let Some(private_data) = desc.private_data {
            priv_info.id = private_data.id;
            priv_info.size = private_data.size;
            priv_info.p_private_data = private_data.data.as_ptr().cast();
            info = info.push_next(&mut priv_info);
        }

        let mut session = vk::OpticalFlowSessionNV::null();

        unsafe {
            (self.fp.create_optical_flow_session_nv)(
                self.device.handle(),
                &info,
                ptr::null(),
                &mut session,
            )
        }
        .result_with_success(session)
    }

    fn destroy_session(&self, session: vk::OpticalFlowSessionNV) {
        unsafe {
            (self.fp.destroy_optical_flow_session_nv)(self.device.handle(), session, ptr::null())
        }
    }

    fn bind_session_image(
        &self,
        session: vk::OpticalFlowSessionNV,
        binding_point: vk::OpticalFlowSessionBindingPointNV,
        view: vk::ImageView,
        layout: vk::ImageLayout,
    ) -> VkResult<()> {
        unsafe {
            (self.fp.bind_optical_flow_session_image_nv)(
                self.device.handle(),
                session,
                binding_point,
                view,
                layout,
            )
        }
        .result()
    }

    fn cmd_execute(
        &self,
        command_buffer: vk::CommandBuffer,
        session: vk::OpticalFlowSessionNV,
        desc: &ExecuteDesc,
    ) {
        let info = vk::OpticalFlowExecuteInfoNV::default()
            .flags(desc.flags)
            .regions(desc.regions);

        unsafe { (self.fp.cmd_optical_flow_execute_nv)(command_buffer, session, &info) }
    }
}
