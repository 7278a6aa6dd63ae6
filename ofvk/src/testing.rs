//! # Recording fake device
//!
//! A [`FlowDevice`] that hands out sequential handles and records every call, with optional
//! failure injection. Useful for testing code built on top of [`FlowInstance`] without a GPU.

use crate::device::{ExecuteDesc, FlowDevice, SessionCreateDesc};
use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::ffi::{CStr, CString};

/// Owned copy of the session descriptor a fake device received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedSession {
    pub width: u32,
    pub height: u32,
    pub image_format: vk::Format,
    pub output_grid_size: vk::OpticalFlowGridSizeFlagsNV,
    pub performance_level: vk::OpticalFlowPerformanceLevelNV,
    pub flags: vk::OpticalFlowSessionCreateFlagsNV,
    /// `(id, size, bytes)`
    pub private_data: Option<(u32, u32, Vec<u8>)>,
}

/// A single device call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    QueueFamilyProperties,
    SupportsExtension(CString),
    CreateImageView(vk::Image, vk::Format),
    DestroyImageView(vk::ImageView),
    CreateSession(RecordedSession),
    DestroySession(vk::OpticalFlowSessionNV),
    Bind(
        vk::OpticalFlowSessionNV,
        vk::OpticalFlowSessionBindingPointNV,
        vk::ImageView,
        vk::ImageLayout,
    ),
    Execute {
        command_buffer: vk::CommandBuffer,
        session: vk::OpticalFlowSessionNV,
        flags: vk::OpticalFlowExecuteFlagsNV,
        regions: Vec<vk::Rect2D>,
    },
}

/// Fake device recording calls.
///
/// By default it exposes every extension and a single queue family with the optical flow bit.
pub struct FakeDevice {
    calls: RefCell<Vec<Call>>,
    next_handle: Cell<u64>,
    queue_families: RefCell<Vec<vk::QueueFlags>>,
    missing_extensions: RefCell<HashSet<CString>>,
    view_error: Cell<Option<vk::Result>>,
    session_error: Cell<Option<vk::Result>>,
    bind_errors: RefCell<Vec<(vk::ImageView, vk::Result)>>,
    views: RefCell<Vec<vk::ImageView>>,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            calls: RefCell::new(vec![]),
            next_handle: Cell::new(0x1000),
            queue_families: RefCell::new(vec![vk::QueueFlags::OPTICAL_FLOW_NV]),
            missing_extensions: RefCell::new(HashSet::new()),
            view_error: Cell::new(None),
            session_error: Cell::new(None),
            bind_errors: RefCell::new(vec![]),
            views: RefCell::new(vec![]),
        }
    }
}

impl FakeDevice {
    /// Replace the queue families reported by the device.
    pub fn with_queue_families(self, families: impl IntoIterator<Item = vk::QueueFlags>) -> Self {
        *self.queue_families.borrow_mut() = families.into_iter().collect();
        self
    }

    /// Report an extension as absent.
    pub fn without_extension(self, name: &CStr) -> Self {
        self.missing_extensions.borrow_mut().insert(name.to_owned());
        self
    }

    /// Make every following view creation fail.
    pub fn fail_view_creation(&self, err: vk::Result) {
        self.view_error.set(Some(err));
    }

    /// Make every following session creation fail.
    pub fn fail_session_creation(&self, err: vk::Result) {
        self.session_error.set(Some(err));
    }

    /// Make binds of a given view fail.
    pub fn fail_bind_of(&self, view: vk::ImageView, err: vk::Result) {
        self.bind_errors.borrow_mut().push((view, err));
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Views created so far, in creation order.
    pub fn views(&self) -> Vec<vk::ImageView> {
        self.views.borrow().clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Recorded binds, as `(binding point, view)` pairs in call order.
    pub fn binds(&self) -> Vec<(vk::OpticalFlowSessionBindingPointNV, vk::ImageView)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Bind(_, point, view, _) => Some((*point, *view)),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded executions.
    pub fn executions(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Execute { .. }))
            .count()
    }

    /// Number of extension checks made for a given extension.
    pub fn extension_checks(&self, name: &CStr) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::SupportsExtension(n) if n.as_c_str() == name))
            .count()
    }

    fn handle<T: Handle>(&self) -> T {
        let raw = self.next_handle.get();
        self.next_handle.set(raw + 1);
        T::from_raw(raw)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl FlowDevice for FakeDevice {
    fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties> {
        self.record(Call::QueueFamilyProperties);
        self.queue_families
            .borrow()
            .iter()
            .map(|&queue_flags| vk::QueueFamilyProperties {
                queue_flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect()
    }

    fn supports_extension(&self, name: &CStr) -> bool {
        self.record(Call::SupportsExtension(name.to_owned()));
        !self.missing_extensions.borrow().contains(name)
    }

    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> VkResult<vk::ImageView> {
        self.record(Call::CreateImageView(image, format));
        match self.view_error.get() {
            Some(err) => Err(err),
            None => {
                let view = self.handle();
                self.views.borrow_mut().push(view);
                Ok(view)
            }
        }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.record(Call::DestroyImageView(view));
    }

    fn create_session(&self, desc: &SessionCreateDesc) -> VkResult<vk::OpticalFlowSessionNV> {
        self.record(Call::CreateSession(RecordedSession {
            width: desc.width,
            height: desc.height,
            image_format: desc.image_format,
            output_grid_size: desc.output_grid_size,
            performance_level: desc.performance_level,
            flags: desc.flags,
            private_data: desc.private_data.map(|p| (p.id, p.size, p.data.to_vec())),
        }));
        match self.session_error.get() {
            Some(err) => Err(err),
            None => Ok(self.handle()),
        }
    }

    fn destroy_session(&self, session: vk::OpticalFlowSessionNV) {
        self.record(Call::DestroySession(session));
    }

    fn bind_session_image(
        &self,
        session: vk::OpticalFlowSessionNV,
        binding_point: vk::OpticalFlowSessionBindingPointNV,
        view: vk::ImageView,
        layout: vk::ImageLayout,
    ) -> VkResult<()> {
        self.record(Call::Bind(session, binding_point, view, layout));
        match self.bind_errors.borrow().iter().find(|(v, _)| *v == view) {
            Some((_, err)) => Err(*err),
            None => Ok(()),
        }
    }

    fn cmd_execute(
        &self,
        command_buffer: vk::CommandBuffer,
        session: vk::OpticalFlowSessionNV,
        desc: &ExecuteDesc,
    ) {
        self.record(Call::Execute {
            command_buffer,
            session,
            flags: desc.flags,
            regions: desc.regions.to_vec(),
        });
    }
}
