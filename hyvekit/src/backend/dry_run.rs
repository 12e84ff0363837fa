//! Dry-run backend.
//!
//! Validates everything a real backend would validate, using the host-side
//! descriptor grammars, but never creates a guest. Useful for checking a
//! configuration on hosts without hypervisor support.

use super::{GuestExit, HypervisorBackend, RawStatus};
use crate::config::BootSpec;
use crate::config::constants::DEFAULT_MAX_VCPUS;
use crate::descriptor::{LpcDevice, PciSlot, parse_memsize};
use std::collections::HashSet;
use std::ffi::CStr;
use std::fs::File;

pub struct DryRunBackend {
    max_vcpus: u32,
    host_memory_bytes: Option<u64>,
    occupied_slots: HashSet<(u8, u8, u8)>,
    lpc_devices: HashSet<String>,
    firmware_parsed: bool,
    vm_created: bool,
    memory_bytes: Option<u64>,
    pci_ready: bool,
}

impl Default for DryRunBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn as_str(s: &CStr) -> RawStatus<&str> {
    s.to_str().map_err(|_| libc::EINVAL)
}

impl DryRunBackend {
    pub fn new() -> Self {
        Self {
            max_vcpus: DEFAULT_MAX_VCPUS,
            host_memory_bytes: None,
            occupied_slots: HashSet::new(),
            lpc_devices: HashSet::new(),
            firmware_parsed: false,
            vm_created: false,
            memory_bytes: None,
            pci_ready: false,
        }
    }

    pub fn with_max_vcpus(mut self, max: u32) -> Self {
        self.max_vcpus = max;
        self
    }

    pub fn with_host_memory(mut self, bytes: u64) -> Self {
        self.host_memory_bytes = Some(bytes);
        self
    }

    fn require_vm(&self) -> RawStatus {
        if self.vm_created {
            Ok(())
        } else {
            Err(libc::EINVAL)
        }
    }

    fn require_pci(&self) -> RawStatus {
        if self.pci_ready {
            Ok(())
        } else {
            Err(libc::EINVAL)
        }
    }
}

impl HypervisorBackend for DryRunBackend {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn pci_parse_slot(&mut self, descriptor: &CStr) -> RawStatus {
        let text = as_str(descriptor)?;
        let slot: PciSlot = text.parse().map_err(|e| {
            tracing::debug!(descriptor = text, error = %e, "Rejected PCI slot");
            libc::EINVAL
        })?;
        if !self.occupied_slots.insert(slot.location()) {
            tracing::debug!(descriptor = text, "PCI slot already occupied");
            return Err(libc::EEXIST);
        }
        tracing::trace!(slot = %slot, "Registered PCI slot");
        Ok(())
    }

    fn lpc_device_parse(&mut self, descriptor: &CStr) -> RawStatus {
        let text = as_str(descriptor)?;
        let device: LpcDevice = text.parse().map_err(|e| {
            tracing::debug!(descriptor = text, error = %e, "Rejected LPC device");
            libc::EINVAL
        })?;
        if !self.lpc_devices.insert(device.device.clone()) {
            return Err(libc::EEXIST);
        }
        tracing::trace!(device = %device, "Registered LPC device");
        Ok(())
    }

    fn parse_memsize(&mut self, spec: &CStr) -> RawStatus<u64> {
        parse_memsize(as_str(spec)?).map_err(|_| libc::EINVAL)
    }

    fn firmware_parse(&mut self, descriptor: &CStr) -> RawStatus {
        let spec: BootSpec = as_str(descriptor)?.parse().map_err(|_| libc::EINVAL)?;
        spec.encode().map_err(|_| libc::EINVAL)?;
        for path in spec.required_files() {
            File::open(path).map_err(|e| {
                tracing::debug!(path = %path.display(), error = %e, "Boot image is not readable");
                e.raw_os_error().unwrap_or(libc::ENOENT)
            })?;
        }
        self.firmware_parsed = true;
        Ok(())
    }

    fn vm_create(&mut self) -> RawStatus {
        if self.vm_created {
            return Err(libc::EEXIST);
        }
        self.vm_created = true;
        Ok(())
    }

    fn max_vcpus(&mut self) -> u32 {
        self.max_vcpus
    }

    fn setup_memory(&mut self, bytes: u64) -> RawStatus {
        self.require_vm()?;
        if self.host_memory_bytes.is_some_and(|host| bytes > host) {
            return Err(libc::ENOMEM);
        }
        self.memory_bytes = Some(bytes);
        Ok(())
    }

    fn init_msr(&mut self) -> RawStatus {
        self.require_vm()
    }

    fn init_mem(&mut self) {}

    fn init_inout(&mut self) {}

    fn pci_irq_init(&mut self) {}

    fn ioapic_init(&mut self) {}

    fn rtc_init(&mut self, use_local_time: bool) {
        tracing::trace!(use_local_time, "RTC seeded");
    }

    fn sci_init(&mut self) {}

    fn init_pci(&mut self) -> RawStatus {
        self.require_vm()?;
        if self.memory_bytes.is_none() {
            return Err(libc::EINVAL);
        }
        self.pci_ready = true;
        Ok(())
    }

    fn init_bvmcons(&mut self) {}

    fn mptable_build(&mut self, vcpus: u32) -> RawStatus {
        self.require_pci()?;
        if vcpus == 0 || vcpus > self.max_vcpus {
            return Err(libc::EINVAL);
        }
        Ok(())
    }

    fn smbios_build(&mut self, instance_id: &CStr) -> RawStatus {
        self.require_pci()?;
        uuid::Uuid::parse_str(as_str(instance_id)?).map_err(|_| libc::EINVAL)?;
        Ok(())
    }

    fn acpi_build(&mut self, vcpus: u32) -> RawStatus {
        self.require_pci()?;
        if vcpus == 0 || vcpus > self.max_vcpus {
            return Err(libc::EINVAL);
        }
        Ok(())
    }

    fn load_firmware(&mut self) -> RawStatus<u64> {
        if !self.firmware_parsed || self.memory_bytes.is_none() {
            return Err(libc::EINVAL);
        }
        Ok(0)
    }

    fn vcpu_add(&mut self, _from_vcpu: u32, vcpu: u32, _rip: u64) -> RawStatus {
        self.require_pci()?;
        if vcpu >= self.max_vcpus {
            return Err(libc::EINVAL);
        }
        Ok(())
    }

    fn dispatch(&mut self) -> GuestExit {
        tracing::info!("Dry run complete, guest not started");
        GuestExit { status: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_pci_slot_rejected() {
        let mut backend = DryRunBackend::new();
        assert_eq!(backend.pci_parse_slot(c"2:0,virtio-net"), Ok(()));
        assert_eq!(backend.pci_parse_slot(c"2,virtio-blk"), Err(libc::EEXIST));
        assert_eq!(backend.pci_parse_slot(c"2:0,bogus"), Err(libc::EINVAL));
    }

    #[test]
    fn test_lpc_requires_known_device() {
        let mut backend = DryRunBackend::new();
        assert_eq!(backend.lpc_device_parse(c"com1,stdio"), Ok(()));
        assert_eq!(backend.lpc_device_parse(c"com1,autopty"), Err(libc::EEXIST));
        assert_eq!(backend.lpc_device_parse(c"stdio"), Err(libc::EINVAL));
    }

    #[test]
    fn test_firmware_requires_readable_images() {
        let kernel = tempfile::NamedTempFile::new().unwrap();
        let descriptor = format!("kexec,{},,console=ttyS0", kernel.path().display());
        let descriptor = std::ffi::CString::new(descriptor).unwrap();

        let mut backend = DryRunBackend::new();
        assert_eq!(backend.firmware_parse(&descriptor), Ok(()));
        assert_eq!(
            backend.firmware_parse(c"kexec,/nonexistent/vmlinuz,,"),
            Err(libc::ENOENT)
        );
        assert_eq!(backend.firmware_parse(c"kexec,,,"), Err(libc::EINVAL));
    }

    #[test]
    fn test_memory_requires_vm_and_host_capacity() {
        let mut backend = DryRunBackend::new().with_host_memory(512 * 1024 * 1024);
        assert_eq!(
            backend.setup_memory(256 * 1024 * 1024),
            Err(libc::EINVAL)
        );
        backend.vm_create().unwrap();
        assert_eq!(
            backend.setup_memory(1024 * 1024 * 1024),
            Err(libc::ENOMEM)
        );
        assert_eq!(
            backend.setup_memory(256 * 1024 * 1024),
            Ok(())
        );
    }

    #[test]
    fn test_tables_require_pci() {
        let mut backend = DryRunBackend::new();
        backend.vm_create().unwrap();
        assert_eq!(backend.acpi_build(1), Err(libc::EINVAL));
        backend.setup_memory(256 * 1024 * 1024).unwrap();
        backend.init_pci().unwrap();
        assert_eq!(backend.acpi_build(2), Ok(()));
        assert_eq!(backend.mptable_build(17), Err(libc::EINVAL));
    }

    #[test]
    fn test_firmware_load_needs_parsed_image_and_memory() {
        let kernel = tempfile::NamedTempFile::new().unwrap();
        let descriptor = format!("kexec,{},,", kernel.path().display());
        let descriptor = std::ffi::CString::new(descriptor).unwrap();

        let mut backend = DryRunBackend::new();
        backend.vm_create().unwrap();
        backend.setup_memory(256 * 1024 * 1024).unwrap();
        assert_eq!(backend.load_firmware(), Err(libc::EINVAL));

        let mut backend = DryRunBackend::new();
        backend.firmware_parse(&descriptor).unwrap();
        backend.vm_create().unwrap();
        assert_eq!(backend.load_firmware(), Err(libc::EINVAL));
        backend.setup_memory(256 * 1024 * 1024).unwrap();
        assert_eq!(backend.load_firmware(), Ok(0));
    }
}
