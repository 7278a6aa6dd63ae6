//! # Registered GPU images

use crate::device::FlowDevice;
use crate::prelude::v1::*;
use ash::vk;

/// Caller owned image, borrowed without lifetime tracking.
///
/// The optical flow layer never destroys these images. Every [`GpuImage`] built on top of one,
/// and every command buffer such a wrapper was bound into, must be gone before the image is
/// destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExternalImage(vk::Image);

impl ExternalImage {
    /// Borrow a caller owned image.
    ///
    /// # Safety
    ///
    /// `image` must stay alive until all wrappers registered from it have been released and all
    /// command buffers recorded against those wrappers have completed execution.
    pub unsafe fn new(image: vk::Image) -> Self {
        Self(image)
    }

    pub fn handle(self) -> vk::Image {
        self.0
    }
}

/// A registered image and the view created over it.
#[derive(Debug)]
pub struct GpuImage {
    image: ExternalImage,
    format: vk::Format,
    view: Option<vk::ImageView>,
}

impl GpuImage {
    /// Wrap an image without creating its view yet.
    pub fn new(image: ExternalImage, format: vk::Format) -> Self {
        Self {
            image,
            format,
            view: None,
        }
    }

    /// Create the view over the wrapped image.
    ///
    /// Any previously created view is destroyed first.
    pub fn initialize(&mut self, device: &impl FlowDevice) -> Result<()> {
        self.destroy(device);

        let view = device
            .create_image_view(self.image.handle(), self.format)
            .map_err(Error::ViewCreation)?;

        self.view = Some(view);

        Ok(())
    }

    /// Destroy the view. Calling this on an uninitialized or destroyed image does nothing.
    pub fn destroy(&mut self, device: &impl FlowDevice) {
        if let Some(view) = self.view.take() {
            device.destroy_image_view(view);
        }
    }

    pub fn view(&self) -> Option<vk::ImageView> {
        self.view
    }

    pub fn image(&self) -> ExternalImage {
        self.image
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }
}
