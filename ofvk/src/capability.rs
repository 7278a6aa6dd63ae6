//! # Device capability cache
//!
//! Capability checks against the device are answered once per process. A capability observed
//! present stays present, and one observed absent stays absent, for the remaining lifetime of
//! the process.

use crate::device::FlowDevice;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::ffi::CStr;
use std::sync::Mutex;

/// A device capability, identified by the extension that provides it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capability(&'static CStr);

impl Capability {
    /// `VK_NV_optical_flow`.
    pub const OPTICAL_FLOW: Self = Self(c"VK_NV_optical_flow");

    /// Capability provided by an arbitrary device extension.
    pub const fn extension(name: &'static CStr) -> Self {
        Self(name)
    }

    pub fn name(self) -> &'static CStr {
        self.0
    }

    /// Human readable name.
    pub fn display_name(self) -> &'static str {
        self.0.to_str().unwrap_or("<non-utf8 extension>")
    }
}

/// Cached capability answers.
#[derive(Default)]
pub struct CapabilityCache {
    entries: Mutex<HashMap<Capability, bool>>,
}

static GLOBAL: OnceCell<CapabilityCache> = OnceCell::new();

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process wide cache.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::new)
    }

    /// Answer whether a capability is supported, querying the device only on the first call.
    ///
    /// # Arguments
    ///
    /// * `device` - device to query if the answer is not cached yet.
    /// * `capability` - capability to check.
    pub fn query(&self, device: &impl FlowDevice, capability: Capability) -> bool {
        // Poisoning leaves the map intact.
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        *entries.entry(capability).or_insert_with(|| {
            let supported = device.supports_extension(capability.name());
            log::debug!(
                "capability {} supported: {}",
                capability.display_name(),
                supported
            );
            supported
        })
    }

    /// Peek at the cached answer without touching the device.
    pub fn cached(&self, capability: Capability) -> Option<bool> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&capability)
            .copied()
    }
}
