//! VM parameter model.
//!
//! `VmParams` is what a caller fills in (directly, from JSON, or from the
//! CLI). It may be incomplete or out of range. [`VmParams::normalize`] runs
//! the defaulting stage exactly once and produces a read-only
//! [`BootParams`] that the bootstrap pipeline consumes.

mod boot;
pub mod constants;
mod defaults;

pub use boot::BootSpec;
pub use defaults::BootParams;

use hyvekit_shared::errors::{HyvekitError, HyvekitResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Requested VM description, before defaulting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmParams {
    /// Guest vCPUs. Anything below 1 becomes 1.
    pub vcpu_count: i64,
    /// Memory size expression, e.g. `"1024"` (MiB) or `"2G"`.
    pub memory_size: String,
    /// PCI slot descriptors, e.g. `"2:0,virtio-net"`.
    pub pci_slots: Vec<String>,
    /// LPC device descriptors, e.g. `"com1,stdio"`.
    pub lpc_devices: Vec<String>,
    pub enable_acpi: bool,
    pub enable_mptables: bool,
    pub enable_bvm_console: bool,
    /// UUID of this instance. Generated when empty.
    pub instance_id: String,
    /// Seed the RTC with UTC instead of local time.
    pub use_utc_clock: bool,
    pub boot_spec: BootSpec,
}

impl VmParams {
    /// Load parameters from a JSON file. Missing fields take their zero value
    /// and are filled in by the defaulting stage.
    pub fn from_json_file(path: &Path) -> HyvekitResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HyvekitError::Config(format!(
                "Failed to read VM parameters from {}: {}",
                path.display(),
                e
            ))
        })?;
        let params = serde_json::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "Loaded VM parameters");
        Ok(params)
    }
}
