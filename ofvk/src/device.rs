//! # Device abstraction
//!
//! The narrow set of lower-layer primitives optical flow sessions are built on. The Vulkan
//! implementation lives in [`crate::vulkan`]; tests drive the same code through fakes.

use ash::prelude::VkResult;
use ash::vk;
use std::ffi::CStr;

/// Device native session creation descriptor.
///
/// Mirrors `VkOpticalFlowSessionCreateInfoNV` together with the private data extension struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCreateDesc<'a> {
    pub width: u32,
    pub height: u32,
    /// `vk::Format::UNDEFINED` is never produced here; unmapped formats are rejected earlier.
    pub image_format: vk::Format,
    pub output_grid_size: vk::OpticalFlowGridSizeFlagsNV,
    pub performance_level: vk::OpticalFlowPerformanceLevelNV,
    pub flags: vk::OpticalFlowSessionCreateFlagsNV,
    pub private_data: Option<PrivateDataDesc<'a>>,
}

/// Private data chained into session creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrivateDataDesc<'a> {
    pub id: u32,
    pub size: u32,
    pub data: &'a [u8],
}

/// Device native execution descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecuteDesc<'a> {
    pub flags: vk::OpticalFlowExecuteFlagsNV,
    pub regions: &'a [vk::Rect2D],
}

/// Lower level device the optical flow layer orchestrates.
///
/// All methods map one to one onto device calls. Implementations do not validate arguments;
/// the device itself is the arbiter of invalid geometry, formats and layouts.
pub trait FlowDevice {
    /// Enumerate queue family properties of the physical device.
    fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties>;

    /// Check whether the device exposes an extension.
    ///
    /// # Arguments
    ///
    /// * `name` - extension name, for example `VK_NV_optical_flow`.
    fn supports_extension(&self, name: &CStr) -> bool;

    /// Create a 2D view over a caller owned image.
    ///
    /// # Arguments
    ///
    /// * `image` - image to view. It is not owned by the device wrapper.
    /// * `format` - format of the view.
    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> VkResult<vk::ImageView>;

    /// Destroy a view created through `create_image_view`.
    fn destroy_image_view(&self, view: vk::ImageView);

    /// Create an optical flow session.
    fn create_session(&self, desc: &SessionCreateDesc) -> VkResult<vk::OpticalFlowSessionNV>;

    /// Destroy an optical flow session.
    fn destroy_session(&self, session: vk::OpticalFlowSessionNV);

    /// Bind an image view to a session binding point.
    ///
    /// # Arguments
    ///
    /// * `session` - session to bind to.
    /// * `binding_point` - role the view plays in the next execution.
    /// * `view` - view to bind.
    /// * `layout` - layout the image is in at execution time.
    fn bind_session_image(
        &self,
        session: vk::OpticalFlowSessionNV,
        binding_point: vk::OpticalFlowSessionBindingPointNV,
        view: vk::ImageView,
        layout: vk::ImageLayout,
    ) -> VkResult<()>;

    /// Record an optical flow execution into a command buffer.
    fn cmd_execute(
        &self,
        command_buffer: vk::CommandBuffer,
        session: vk::OpticalFlowSessionNV,
        desc: &ExecuteDesc,
    );
}

impl<T: FlowDevice + ?Sized> FlowDevice for &T {
    fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties> {
        (**self).queue_family_properties()
    }

    fn supports_extension(&self, name: &CStr) -> bool {
        (**self).supports_extension(name)
    }

    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> VkResult<vk::ImageView> {
        (**self).create_image_view(image, format)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        (**self).destroy_image_view(view)
    }

    fn create_session(&self, desc: &SessionCreateDesc) -> VkResult<vk::OpticalFlowSessionNV> {
        (**self).create_session(desc)
    }

    fn destroy_session(&self, session: vk::OpticalFlowSessionNV) {
        (**self).destroy_session(session)
    }

    fn bind_session_image(
        &self,
        session: vk::OpticalFlowSessionNV,
        binding_point: vk::OpticalFlowSessionBindingPointNV,
        view: vk::ImageView,
        layout: vk::ImageLayout,
    ) -> VkResult<()> {
        (**self).bind_session_image(session, binding_point, view, layout)
    }

    fn cmd_execute(
        &self,
        command_buffer: vk::CommandBuffer,
        session: vk::OpticalFlowSessionNV,
        desc: &ExecuteDesc,
    ) {
        (**self).cmd_execute(command_buffer, session, desc)
    }
}
