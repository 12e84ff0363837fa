//! Bootstrap tasks, one module per concern.
//!
//! Each task calls into the backend and classifies a failure into exactly
//! one error kind. Tasks never roll back earlier stages.

mod chipset;
mod firmware;
mod memory;
mod tables;
mod topology;
mod vm;

pub use chipset::{
    IoApicTask, MemoryEmulationTask, MsrTask, PciIrqTask, PortIoTask, RtcTask, SciTask,
};
pub use firmware::BootSpecTask;
pub use memory::{MemorySetupTask, MemorySizeTask};
pub use tables::{AcpiTask, BvmConsoleTask, MpTableTask, PciBusTask, SmbiosTask};
pub use topology::{LpcDevicesTask, PciSlotsTask};
pub use vm::{BootstrapVcpuTask, VcpuLimitTask, VmCreateTask};

use super::types::BootContext;
use hyvekit_shared::errors::HyvekitError;
use uuid::Uuid;

pub type BootCtx<'a> = BootContext<'a>;

fn task_start(ctx: &BootCtx<'_>, task_name: &str) -> Uuid {
    let instance_id = *ctx.params.instance_id();
    tracing::debug!(instance_id = %instance_id, task = task_name, "Running bootstrap task");
    instance_id
}

fn log_task_error(instance_id: &Uuid, task_name: &str, error: &HyvekitError) {
    tracing::error!(
        instance_id = %instance_id,
        task = task_name,
        stage = ?error.stage(),
        code = ?error.raw_code(),
        "Bootstrap task failed: {}",
        error
    );
}
