//! Identity of each bootstrap stage.

use std::fmt;

/// The fixed, ordered stages of a VM bootstrap.
///
/// Discriminants follow execution order, so `a < b` means `a` runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BootStage {
    PciSlots = 1,
    LpcDevices,
    MemorySize,
    BootSpec,
    VmCreate,
    VcpuLimit,
    MemorySetup,
    Chipset,
    PciBus,
    BvmConsole,
    MpTable,
    Smbios,
    Acpi,
    BootstrapVcpu,
    Dispatch,
}

impl BootStage {
    /// All stages in execution order.
    pub const ALL: [BootStage; 15] = [
        BootStage::PciSlots,
        BootStage::LpcDevices,
        BootStage::MemorySize,
        BootStage::BootSpec,
        BootStage::VmCreate,
        BootStage::VcpuLimit,
        BootStage::MemorySetup,
        BootStage::Chipset,
        BootStage::PciBus,
        BootStage::BvmConsole,
        BootStage::MpTable,
        BootStage::Smbios,
        BootStage::Acpi,
        BootStage::BootstrapVcpu,
        BootStage::Dispatch,
    ];

    /// 1-based position in the bootstrap sequence.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BootStage::PciSlots => "pci_slots",
            BootStage::LpcDevices => "lpc_devices",
            BootStage::MemorySize => "memory_size",
            BootStage::BootSpec => "boot_spec",
            BootStage::VmCreate => "vm_create",
            BootStage::VcpuLimit => "vcpu_limit",
            BootStage::MemorySetup => "memory_setup",
            BootStage::Chipset => "chipset",
            BootStage::PciBus => "pci_bus",
            BootStage::BvmConsole => "bvm_console",
            BootStage::MpTable => "mptable",
            BootStage::Smbios => "smbios",
            BootStage::Acpi => "acpi",
            BootStage::BootstrapVcpu => "bootstrap_vcpu",
            BootStage::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for BootStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
