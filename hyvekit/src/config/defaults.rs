//! Defaulting stage.

use super::constants::{
    DEFAULT_LPC_DEVICES, DEFAULT_MEMORY, DEFAULT_PCI_SLOTS, DEFAULT_VCPUS, MIN_MEMORY_MIB,
};
use super::{BootSpec, VmParams};
use crate::descriptor::{MIB, parse_memsize};
use uuid::Uuid;

/// Normalized, read-only VM description.
///
/// Only [`VmParams::normalize`] constructs this, so every instance has been
/// through the defaulting stage exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootParams {
    vcpu_count: u32,
    memory_size: String,
    pci_slots: Vec<String>,
    lpc_devices: Vec<String>,
    enable_acpi: bool,
    enable_mptables: bool,
    enable_bvm_console: bool,
    instance_id: Uuid,
    use_utc_clock: bool,
    boot_spec: BootSpec,
}

impl BootParams {
    pub fn vcpu_count(&self) -> u32 {
        self.vcpu_count
    }

    pub fn memory_size(&self) -> &str {
        &self.memory_size
    }

    pub fn pci_slots(&self) -> &[String] {
        &self.pci_slots
    }

    pub fn lpc_devices(&self) -> &[String] {
        &self.lpc_devices
    }

    pub fn enable_acpi(&self) -> bool {
        self.enable_acpi
    }

    pub fn enable_mptables(&self) -> bool {
        self.enable_mptables
    }

    pub fn enable_bvm_console(&self) -> bool {
        self.enable_bvm_console
    }

    pub fn instance_id(&self) -> &Uuid {
        &self.instance_id
    }

    pub fn use_utc_clock(&self) -> bool {
        self.use_utc_clock
    }

    pub fn boot_spec(&self) -> &BootSpec {
        &self.boot_spec
    }
}

fn memory_is_acceptable(spec: &str) -> bool {
    parse_memsize(spec).is_ok_and(|bytes| bytes >= MIN_MEMORY_MIB * MIB)
}

fn default_list(list: Vec<String>, defaults: &[&str]) -> Vec<String> {
    if list.is_empty() {
        defaults.iter().map(|s| s.to_string()).collect()
    } else {
        list
    }
}

impl VmParams {
    /// Fill unset or invalid fields with safe defaults. Never fails.
    pub fn normalize(self) -> BootParams {
        let VmParams {
            vcpu_count,
            memory_size,
            pci_slots,
            lpc_devices,
            enable_acpi,
            enable_mptables,
            enable_bvm_console,
            instance_id,
            use_utc_clock,
            boot_spec,
        } = self;

        let vcpu_count = if vcpu_count < 1 {
            DEFAULT_VCPUS
        } else {
            u32::try_from(vcpu_count).unwrap_or(u32::MAX)
        };

        // The backend parser rejects surrounding whitespace.
        let memory_size = if memory_is_acceptable(&memory_size) {
            memory_size.trim().to_string()
        } else {
            if !memory_size.is_empty() {
                tracing::warn!(
                    requested = %memory_size,
                    default = DEFAULT_MEMORY,
                    "Memory size invalid or below minimum, using default"
                );
            }
            DEFAULT_MEMORY.to_string()
        };

        let instance_id = if instance_id.is_empty() {
            Uuid::new_v4()
        } else {
            Uuid::parse_str(&instance_id).unwrap_or_else(|e| {
                tracing::warn!(
                    requested = %instance_id,
                    error = %e,
                    "Instance ID is not a valid UUID, generating a new one"
                );
                Uuid::new_v4()
            })
        };

        let params = BootParams {
            vcpu_count,
            memory_size,
            pci_slots: default_list(pci_slots, &DEFAULT_PCI_SLOTS),
            lpc_devices: default_list(lpc_devices, &DEFAULT_LPC_DEVICES),
            enable_acpi,
            enable_mptables,
            enable_bvm_console,
            instance_id,
            use_utc_clock,
            boot_spec,
        };

        tracing::debug!(
            instance_id = %params.instance_id,
            vcpus = params.vcpu_count,
            memory = %params.memory_size,
            pci_slots = params.pci_slots.len(),
            lpc_devices = params.lpc_devices.len(),
            "Normalized VM parameters"
        );

        params
    }
}
