//! Hypervisor backend seam.
//!
//! The bootstrap pipeline never touches virtualization primitives itself.
//! Every stage delegates to a [`HypervisorBackend`], which reports success or
//! a raw status code. Classification of those codes into
//! [`HyvekitError`](hyvekit_shared::HyvekitError) variants happens in the
//! bootstrap tasks.
//!
//! Backends are process-global and thread-affine: they are not `Send`, and
//! must be created, driven and dispatched on one OS thread
//! (see [`crate::bootstrap::boot_pinned`]).

mod dry_run;
#[cfg(all(target_os = "macos", feature = "xhyve-backend"))]
mod xhyve;

pub use dry_run::DryRunBackend;
#[cfg(all(target_os = "macos", feature = "xhyve-backend"))]
pub use xhyve::XhyveBackend;

use hyvekit_shared::errors::{HyvekitError, HyvekitResult};
use std::ffi::CStr;

/// Result of a backend call: `Err` carries the backend's raw status code.
pub type RawStatus<T = ()> = Result<T, i32>;

/// Guest shutdown report returned by the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestExit {
    pub status: i32,
}

impl GuestExit {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Capabilities the bootstrap pipeline needs from a hypervisor.
///
/// Method order mirrors bootstrap order. String arguments are borrowed from
/// the bootstrap's argument arena and stay valid until the dispatch loop
/// returns, so a backend may retain their pointers.
pub trait HypervisorBackend {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Register one PCI slot descriptor.
    fn pci_parse_slot(&mut self, descriptor: &CStr) -> RawStatus;

    /// Register one LPC device descriptor.
    fn lpc_device_parse(&mut self, descriptor: &CStr) -> RawStatus;

    /// Resolve a memory size expression into bytes.
    fn parse_memsize(&mut self, spec: &CStr) -> RawStatus<u64>;

    /// Validate the firmware/boot descriptor and record the loader. The
    /// image is not placed in guest memory until [`load_firmware`].
    ///
    /// [`load_firmware`]: HypervisorBackend::load_firmware
    fn firmware_parse(&mut self, descriptor: &CStr) -> RawStatus;

    /// Create the guest VM context.
    fn vm_create(&mut self) -> RawStatus;

    /// Maximum vCPUs this host permits for the created VM.
    fn max_vcpus(&mut self) -> u32;

    /// Map `bytes` of guest memory, populating the whole region up front.
    fn setup_memory(&mut self, bytes: u64) -> RawStatus;

    fn init_msr(&mut self) -> RawStatus;
    fn init_mem(&mut self);
    fn init_inout(&mut self);
    fn pci_irq_init(&mut self);
    fn ioapic_init(&mut self);
    /// Seed the RTC from local time (`true`) or UTC (`false`).
    fn rtc_init(&mut self, use_local_time: bool);
    fn sci_init(&mut self);

    /// Finalize PCI bus enumeration.
    fn init_pci(&mut self) -> RawStatus;

    fn init_bvmcons(&mut self);
    fn mptable_build(&mut self, vcpus: u32) -> RawStatus;
    /// Build SMBIOS tables, advertising `instance_id` as the system UUID.
    fn smbios_build(&mut self, instance_id: &CStr) -> RawStatus;
    fn acpi_build(&mut self, vcpus: u32) -> RawStatus;

    /// Run the loader recorded by `firmware_parse`, copying the boot image
    /// into guest memory. Returns the bootstrap processor's entry point.
    fn load_firmware(&mut self) -> RawStatus<u64>;

    /// Start vCPU `vcpu` (spawned from `from_vcpu`) at `rip`.
    fn vcpu_add(&mut self, from_vcpu: u32, vcpu: u32, rip: u64) -> RawStatus;

    /// Run the event dispatch loop until the guest shuts down.
    fn dispatch(&mut self) -> GuestExit;
}

/// Backends selectable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// Host-independent validation backend; the guest never runs.
    DryRun,
    /// libxhyve on macOS Hypervisor.framework.
    Xhyve,
}

/// Tuning for backends that take host facts as input.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// vCPU ceiling the dry-run backend reports.
    pub max_vcpus: Option<u32>,
    /// Host memory the dry-run backend pretends to have.
    pub host_memory_bytes: Option<u64>,
}

/// Construct a backend. Call this on the thread that will run the bootstrap.
pub fn create_backend(
    kind: BackendKind,
    options: &BackendOptions,
) -> HyvekitResult<Box<dyn HypervisorBackend>> {
    match kind {
        BackendKind::DryRun => {
            let mut backend = DryRunBackend::new();
            if let Some(max) = options.max_vcpus {
                backend = backend.with_max_vcpus(max);
            }
            if let Some(bytes) = options.host_memory_bytes {
                backend = backend.with_host_memory(bytes);
            }
            Ok(Box::new(backend))
        }
        BackendKind::Xhyve => create_xhyve(),
    }
}

#[cfg(all(target_os = "macos", feature = "xhyve-backend"))]
fn create_xhyve() -> HyvekitResult<Box<dyn HypervisorBackend>> {
    Ok(Box::new(XhyveBackend::new()))
}

#[cfg(not(all(target_os = "macos", feature = "xhyve-backend")))]
fn create_xhyve() -> HyvekitResult<Box<dyn HypervisorBackend>> {
    Err(HyvekitError::Unsupported(
        "xhyve backend requires macOS and the 'xhyve-backend' feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dry_run() {
        let options = BackendOptions {
            max_vcpus: Some(4),
            ..Default::default()
        };
        let mut backend = create_backend(BackendKind::DryRun, &options).unwrap();
        assert_eq!(backend.name(), "dry-run");
        assert_eq!(backend.max_vcpus(), 4);
    }

    #[cfg(not(all(target_os = "macos", feature = "xhyve-backend")))]
    #[test]
    fn test_xhyve_unsupported_without_feature() {
        let result = create_backend(BackendKind::Xhyve, &BackendOptions::default());
        assert!(matches!(result, Err(HyvekitError::Unsupported(_))));
    }
}
