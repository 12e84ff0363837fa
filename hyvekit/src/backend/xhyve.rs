//! libxhyve backend (macOS Hypervisor.framework).
//!
//! Links against the vendored libxhyve built with the exit patch applied:
//! `mevent_dispatch` returns the guest exit status instead of calling
//! `exit(3)`, so the orchestrator's buffers are released on the normal
//! return path.
//!
//! `firmware_parse` only records the loader arguments. The image is copied
//! into guest memory by `kexec()`/`fbsd_load()`, which need mapped memory and
//! return the entry point, so they run from `load_firmware`.

use super::{GuestExit, HypervisorBackend, RawStatus};
use crate::config::BootSpec;
use std::ffi::CStr;
use std::marker::PhantomData;

use libc::{c_char, c_int, size_t};

const VM_MMAP_ALL: c_int = 1;

#[derive(Debug, Clone, Copy)]
enum Loader {
    Kexec,
    Fbsd,
}

#[link(name = "xhyve")]
#[link(name = "Hypervisor", kind = "framework")]
#[link(name = "vmnet", kind = "framework")]
unsafe extern "C" {
    static mut guest_uuid_str: *const c_char;

    fn pci_parse_slot(opt: *const c_char) -> c_int;
    fn lpc_device_parse(opt: *const c_char) -> c_int;
    fn parse_memsize(opt: *const c_char, ret_memsize: *mut size_t) -> c_int;
    fn firmware_parse(opt: *const c_char) -> c_int;
    fn xh_vm_create() -> c_int;
    fn num_vcpus_allowed() -> c_int;
    fn xh_vm_setup_memory(len: size_t, style: c_int) -> c_int;
    fn kexec() -> u64;
    fn fbsd_load() -> u64;
    fn init_msr() -> c_int;
    fn init_mem();
    fn init_inout();
    fn pci_irq_init();
    fn ioapic_init();
    fn rtc_init(use_localtime: c_int);
    fn sci_init();
    fn init_pci() -> c_int;
    fn init_bvmcons();
    fn mptable_build(ncpu: c_int) -> c_int;
    fn smbios_build() -> c_int;
    fn acpi_build(ncpu: c_int) -> c_int;
    fn vcpu_add(fromcpu: c_int, newcpu: c_int, rip: u64);
    fn mevent_dispatch() -> c_int;
}

fn status(code: c_int) -> RawStatus {
    if code == 0 { Ok(()) } else { Err(code) }
}

fn to_c_int(value: u32) -> RawStatus<c_int> {
    c_int::try_from(value).map_err(|_| libc::EINVAL)
}

/// Handle on the process-global libxhyve state.
///
/// Not `Send`: libxhyve registers per-thread Hypervisor.framework state.
pub struct XhyveBackend {
    loader: Option<Loader>,
    _not_send: PhantomData<*const ()>,
}

impl XhyveBackend {
    pub fn new() -> Self {
        Self {
            loader: None,
            _not_send: PhantomData,
        }
    }
}

impl Default for XhyveBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HypervisorBackend for XhyveBackend {
    fn name(&self) -> &str {
        "xhyve"
    }

    fn pci_parse_slot(&mut self, descriptor: &CStr) -> RawStatus {
        // SAFETY: descriptor outlives the dispatch loop (argument arena).
        status(unsafe { pci_parse_slot(descriptor.as_ptr()) })
    }

    fn lpc_device_parse(&mut self, descriptor: &CStr) -> RawStatus {
        // SAFETY: libxhyve keeps the backend part of the descriptor; the arena
        // keeps it alive until dispatch returns.
        status(unsafe { lpc_device_parse(descriptor.as_ptr()) })
    }

    fn parse_memsize(&mut self, spec: &CStr) -> RawStatus<u64> {
        let mut bytes: size_t = 0;
        // SAFETY: valid C string and a valid out pointer.
        status(unsafe { parse_memsize(spec.as_ptr(), &mut bytes) })?;
        Ok(bytes as u64)
    }

    fn firmware_parse(&mut self, descriptor: &CStr) -> RawStatus {
        let spec: BootSpec = descriptor
            .to_str()
            .map_err(|_| libc::EINVAL)?
            .parse()
            .map_err(|_| libc::EINVAL)?;
        // SAFETY: kernel/initrd/cmdline pointers are retained by libxhyve and
        // stay valid through dispatch.
        status(unsafe { firmware_parse(descriptor.as_ptr()) })?;
        self.loader = Some(match spec {
            BootSpec::Kernel { .. } => Loader::Kexec,
            BootSpec::Loader { .. } => Loader::Fbsd,
        });
        Ok(())
    }

    fn vm_create(&mut self) -> RawStatus {
        // SAFETY: plain call into libxhyve.
        status(unsafe { xh_vm_create() })
    }

    fn max_vcpus(&mut self) -> u32 {
        // SAFETY: plain call into libxhyve, VM already created.
        let max = unsafe { num_vcpus_allowed() };
        u32::try_from(max).unwrap_or(0)
    }

    fn setup_memory(&mut self, bytes: u64) -> RawStatus {
        let len = size_t::try_from(bytes).map_err(|_| libc::EINVAL)?;
        // SAFETY: plain call into libxhyve.
        status(unsafe { xh_vm_setup_memory(len, VM_MMAP_ALL) })
    }

    fn init_msr(&mut self) -> RawStatus {
        // SAFETY: plain call into libxhyve.
        status(unsafe { init_msr() })
    }

    fn init_mem(&mut self) {
        // SAFETY: plain call into libxhyve.
        unsafe { init_mem() }
    }

    fn init_inout(&mut self) {
        // SAFETY: plain call into libxhyve.
        unsafe { init_inout() }
    }

    fn pci_irq_init(&mut self) {
        // SAFETY: plain call into libxhyve.
        unsafe { pci_irq_init() }
    }

    fn ioapic_init(&mut self) {
        // SAFETY: plain call into libxhyve.
        unsafe { ioapic_init() }
    }

    fn rtc_init(&mut self, use_local_time: bool) {
        // SAFETY: plain call into libxhyve.
        unsafe { rtc_init(c_int::from(use_local_time)) }
    }

    fn sci_init(&mut self) {
        // SAFETY: plain call into libxhyve.
        unsafe { sci_init() }
    }

    fn init_pci(&mut self) -> RawStatus {
        // SAFETY: plain call into libxhyve.
        status(unsafe { init_pci() })
    }

    fn init_bvmcons(&mut self) {
        // SAFETY: plain call into libxhyve.
        unsafe { init_bvmcons() }
    }

    fn mptable_build(&mut self, vcpus: u32) -> RawStatus {
        let ncpu = to_c_int(vcpus)?;
        // SAFETY: plain call into libxhyve.
        status(unsafe { mptable_build(ncpu) })
    }

    fn smbios_build(&mut self, instance_id: &CStr) -> RawStatus {
        // SAFETY: single-threaded bootstrap; the pointer stays valid through
        // dispatch.
        unsafe {
            guest_uuid_str = instance_id.as_ptr();
            status(smbios_build())
        }
    }

    fn acpi_build(&mut self, vcpus: u32) -> RawStatus {
        let ncpu = to_c_int(vcpus)?;
        // SAFETY: plain call into libxhyve.
        status(unsafe { acpi_build(ncpu) })
    }

    fn load_firmware(&mut self) -> RawStatus<u64> {
        // SAFETY: guest memory is mapped and firmware_parse recorded the
        // loader arguments.
        let rip = match self.loader.ok_or(libc::EINVAL)? {
            Loader::Kexec => unsafe { kexec() },
            Loader::Fbsd => unsafe { fbsd_load() },
        };
        Ok(rip)
    }

    fn vcpu_add(&mut self, from_vcpu: u32, vcpu: u32, rip: u64) -> RawStatus {
        let from = to_c_int(from_vcpu)?;
        let new = to_c_int(vcpu)?;
        // SAFETY: plain call into libxhyve.
        unsafe { vcpu_add(from, new, rip) };
        Ok(())
    }

    fn dispatch(&mut self) -> GuestExit {
        // SAFETY: called once, on the bootstrap thread, after all setup.
        let status = unsafe { mevent_dispatch() };
        GuestExit { status }
    }
}
