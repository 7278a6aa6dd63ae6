//! # Optical flow instance
//!
//! [`FlowInstance`] owns a device, at most one session, and every buffer registered against it.

use crate::capability::{Capability, CapabilityCache};
use crate::caps::{get_caps, CapsParam};
use crate::device::FlowDevice;
use crate::execute::{BindingRole, Recorder};
use crate::handle::{BufferHandle, HandleArena};
use crate::image::{ExternalImage, GpuImage};
use crate::params::{ExecuteInputParams, ExecuteOutputParams, InitParams};
use crate::prelude::v1::*;
use crate::queue::find_optical_flow_queue;
use crate::session::{create_desc, Session};
use ash::vk;
use log::*;

/// Optical flow instance bound to a single device.
///
/// Calls that touch session binding state take `&mut self`, so a single instance can not bind
/// or record from two places at once.
pub struct FlowInstance<D: FlowDevice> {
    device: D,
    queue_family: u32,
    session: Option<Session>,
    images: HandleArena<GpuImage>,
}

impl<D: FlowDevice> FlowInstance<D> {
    /// Create an instance, checking device support through the process wide capability cache.
    pub fn new(device: D) -> Result<Self> {
        Self::with_cache(device, CapabilityCache::global())
    }

    /// Create an instance, checking device support through the given cache.
    ///
    /// Fails if the device lacks optical flow support, or has no queue family able to run it.
    ///
    /// # Arguments
    ///
    /// * `device` - device to run optical flow on.
    /// * `cache` - capability cache to consult.
    pub fn with_cache(device: D, cache: &CapabilityCache) -> Result<Self> {
        if !cache.query(&device, Capability::OPTICAL_FLOW) {
            warn!(
                "{} is not supported by the device",
                Capability::OPTICAL_FLOW.display_name()
            );
            return Err(Error::CapabilityAbsent(
                Capability::OPTICAL_FLOW.display_name(),
            ));
        }

        let queue_family = find_optical_flow_queue(&device)?;

        info!("optical flow queue family: {queue_family}");

        Ok(Self {
            device,
            queue_family,
            session: None,
            images: HandleArena::new(),
        })
    }

    /// Queue family optical flow work must be submitted to.
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Currently active session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Create the session, replacing any existing one.
    ///
    /// Parameters without a device counterpart are rejected up front, leaving any existing
    /// session intact. Otherwise the previous session is destroyed before the new one is created,
    /// and if creation fails the instance is left without a session.
    pub fn init_session(&mut self, params: &InitParams) -> Result<()> {
        create_desc(params)?;
        self.destroy_session();
        self.session = Some(Session::create(&self.device, params)?);
        Ok(())
    }

    /// Destroy the session. Does nothing if there is none.
    pub fn destroy_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.destroy(&self.device);
        }
    }

    /// Register a caller owned image for use in executions.
    ///
    /// A view over the image is created immediately. No compatibility checks are made; an
    /// unusable image or format surfaces when it is bound.
    ///
    /// # Arguments
    ///
    /// * `image` - image to register.
    /// * `format` - format to view the image with.
    pub fn register_buffer(
        &mut self,
        image: ExternalImage,
        format: vk::Format,
    ) -> Result<BufferHandle> {
        let mut gpu_image = GpuImage::new(image, format);
        gpu_image.initialize(&self.device)?;

        let handle = self.images.insert(gpu_image).map_err(|mut gpu_image| {
            gpu_image.destroy(&self.device);
            Error::HandlesExhausted
        })?;
        debug!("registered {:?} as {handle:?}", image.handle());

        Ok(handle)
    }

    /// Release a registered buffer and destroy its view.
    pub fn unregister_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        let mut image = self
            .images
            .remove(handle)
            .ok_or(Error::InvalidHandle(handle))?;
        image.destroy(&self.device);
        Ok(())
    }

    /// Number of currently registered buffers.
    pub fn registered_buffers(&self) -> usize {
        self.images.len()
    }

    fn recorder(&self) -> Result<Recorder<'_, D>> {
        let session = self.session.as_ref().ok_or(Error::NoSession)?;
        Ok(Recorder::new(&self.device, session, &self.images))
    }

    /// Bind a single buffer to the session.
    ///
    /// A `None` handle succeeds without touching the device.
    pub fn bind(&mut self, handle: Option<BufferHandle>, role: BindingRole) -> Result<()> {
        self.recorder()?.bind(handle, role)
    }

    /// Bind all resources of an execution and record it into a command buffer.
    ///
    /// See [`Recorder::record`].
    pub fn record_execute(
        &mut self,
        input: &ExecuteInputParams,
        output: &ExecuteOutputParams,
        command_buffer: vk::CommandBuffer,
    ) -> Result<()> {
        self.recorder()?.record(input, output, command_buffer)
    }

    /// Query a static capability.
    pub fn get_caps(&self, param: CapsParam) -> Result<&'static [u32]> {
        get_caps(param)
    }
}

impl<D: FlowDevice> Drop for FlowInstance<D> {
    fn drop(&mut self) {
        for mut image in self.images.drain() {
            image.destroy(&self.device);
        }
        self.destroy_session();
    }
}
