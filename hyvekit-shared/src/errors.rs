//! Error taxonomy for hyvekit.
//!
//! Every bootstrap stage failure maps to exactly one classified variant that
//! carries the raw backend status code. The remaining variants cover the
//! ambient concerns around a bootstrap (configuration files, process-wide
//! exclusivity, unsupported hosts).

use crate::stage::BootStage;
use thiserror::Error;

pub type HyvekitResult<T> = Result<T, HyvekitError>;

#[derive(Debug, Error)]
pub enum HyvekitError {
    #[error("error parsing PCI slot '{descriptor}' (code {code})")]
    PciSlot { descriptor: String, code: i32 },

    #[error("error parsing LPC device '{descriptor}' (code {code})")]
    LpcDevice { descriptor: String, code: i32 },

    #[error("invalid memory size '{spec}' (code {code})")]
    InvalidMemsize { spec: String, code: i32 },

    #[error("boot parameters are invalid: {reason} (code {code})")]
    InvalidBootParams { reason: String, code: i32 },

    #[error("unable to create VM (code {code})")]
    VmCreate { code: i32 },

    #[error("requested {requested} vCPUs but the host allows at most {max}")]
    VcpuLimitExceeded { requested: u32, max: u32 },

    #[error("unable to set up {bytes} bytes of guest memory (code {code})")]
    MemorySetup { bytes: u64, code: i32 },

    #[error("unable to initialize MSR emulation (code {code})")]
    MsrInit { code: i32 },

    #[error("unable to initialize PCI bus (code {code})")]
    PciInit { code: i32 },

    #[error("unable to build MP table (code {code})")]
    MpTableBuild { code: i32 },

    #[error("unable to build SMBIOS tables (code {code})")]
    SmbiosBuild { code: i32 },

    #[error("unable to build ACPI tables (code {code})")]
    AcpiBuild { code: i32 },

    #[error("unable to create bootstrap vCPU (code {code})")]
    VcpuCreate { code: i32 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HyvekitError {
    /// The bootstrap stage that produced this error, if it is a stage failure.
    pub fn stage(&self) -> Option<BootStage> {
        let stage = match self {
            HyvekitError::PciSlot { .. } => BootStage::PciSlots,
            HyvekitError::LpcDevice { .. } => BootStage::LpcDevices,
            HyvekitError::InvalidMemsize { .. } => BootStage::MemorySize,
            HyvekitError::InvalidBootParams { .. } => BootStage::BootSpec,
            HyvekitError::VmCreate { .. } => BootStage::VmCreate,
            HyvekitError::VcpuLimitExceeded { .. } => BootStage::VcpuLimit,
            HyvekitError::MemorySetup { .. } => BootStage::MemorySetup,
            HyvekitError::MsrInit { .. } => BootStage::Chipset,
            HyvekitError::PciInit { .. } => BootStage::PciBus,
            HyvekitError::MpTableBuild { .. } => BootStage::MpTable,
            HyvekitError::SmbiosBuild { .. } => BootStage::Smbios,
            HyvekitError::AcpiBuild { .. } => BootStage::Acpi,
            HyvekitError::VcpuCreate { .. } => BootStage::BootstrapVcpu,
            _ => return None,
        };
        Some(stage)
    }

    /// Raw backend status code, when the failure came from the backend.
    pub fn raw_code(&self) -> Option<i32> {
        match self {
            HyvekitError::PciSlot { code, .. }
            | HyvekitError::LpcDevice { code, .. }
            | HyvekitError::InvalidMemsize { code, .. }
            | HyvekitError::InvalidBootParams { code, .. }
            | HyvekitError::VmCreate { code }
            | HyvekitError::MemorySetup { code, .. }
            | HyvekitError::MsrInit { code }
            | HyvekitError::PciInit { code }
            | HyvekitError::MpTableBuild { code }
            | HyvekitError::SmbiosBuild { code }
            | HyvekitError::AcpiBuild { code }
            | HyvekitError::VcpuCreate { code } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_classification() {
        let err = HyvekitError::VcpuLimitExceeded {
            requested: 64,
            max: 16,
        };
        assert_eq!(err.stage(), Some(BootStage::VcpuLimit));
        assert_eq!(err.raw_code(), None);

        let err = HyvekitError::MsrInit { code: -1 };
        assert_eq!(err.stage(), Some(BootStage::Chipset));
        assert_eq!(err.raw_code(), Some(-1));

        assert_eq!(HyvekitError::Config("bad".into()).stage(), None);
    }

    #[test]
    fn test_display_carries_descriptor() {
        let err = HyvekitError::PciSlot {
            descriptor: "2:0,bogus".into(),
            code: 22,
        };
        assert!(err.to_string().contains("2:0,bogus"));
    }
}
