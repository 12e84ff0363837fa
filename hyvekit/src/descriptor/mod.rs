//! Textual descriptor grammars understood by the hypervisor backend.
//!
//! The orchestrator hands descriptors to the backend as strings. These
//! parsers describe the same grammar on the host side: the defaulting stage
//! uses them to decide what is valid, the dry-run backend uses them in place
//! of the native parser, and the LPC registration stage uses them to join
//! split device/backend pairs.

mod lpc;
mod memsize;
mod pci;

pub use lpc::{LPC_DEVICES, LpcDevice, coalesce_lpc_entries};
pub use memsize::{MIB, parse_memsize};
pub use pci::{KNOWN_EMULATIONS, PciSlot};

use thiserror::Error;

/// Why a descriptor failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("descriptor is empty")]
    Empty,
    #[error("invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{field} {value} out of range (max {max})")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
    #[error("missing device emulation")]
    MissingEmulation,
    #[error("unknown device emulation '{0}'")]
    UnknownEmulation(String),
    #[error("unknown LPC device '{0}'")]
    UnknownDevice(String),
    #[error("empty backend for LPC device '{0}'")]
    MissingBackend(String),
    #[error("invalid size suffix '{0}'")]
    InvalidSuffix(String),
    #[error("size overflows 64 bits")]
    Overflow,
}
