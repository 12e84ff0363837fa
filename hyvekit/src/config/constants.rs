//! Defaults and hypervisor-imposed limits.

/// Smallest guest memory the backend accepts, in MiB.
pub const MIN_MEMORY_MIB: u64 = 256;

/// Memory expression substituted for missing, invalid or undersized input.
pub const DEFAULT_MEMORY: &str = "256";

pub const DEFAULT_VCPUS: u32 = 1;

/// Slot the LPC bridge occupies in the default topology.
pub const LPC_BRIDGE_SLOT: u8 = 31;

/// Network device, host bridge and LPC bridge.
pub const DEFAULT_PCI_SLOTS: [&str; 3] = ["2:0,virtio-net", "0:0,hostbridge", "31,lpc"];

/// COM1 wired to the process's standard I/O.
pub const DEFAULT_LPC_DEVICES: [&str; 2] = ["com1", "stdio"];

/// vCPU ceiling reported by backends that have no host-specific answer.
pub const DEFAULT_MAX_VCPUS: u32 = 16;

/// Name of the OS thread that owns a pinned bootstrap.
pub const BOOT_THREAD_NAME: &str = "hyvekit-boot";
