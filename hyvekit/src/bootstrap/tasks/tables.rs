//! Tasks: PCI bus finalization, boot console and firmware tables.
//!
//! Table construction follows PCI bus finalization because the tables
//! describe the enumerated devices.

use super::{BootCtx, log_task_error, task_start};
use crate::pipeline::PipelineTask;
use hyvekit_shared::errors::{HyvekitError, HyvekitResult};

pub struct PciBusTask;

impl<'a> PipelineTask<BootCtx<'a>> for PciBusTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        ctx.backend
            .init_pci()
            .map_err(|code| HyvekitError::PciInit { code })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))
    }

    fn name(&self) -> &str {
        "pci_bus"
    }
}

pub struct BvmConsoleTask;

impl<'a> PipelineTask<BootCtx<'a>> for BvmConsoleTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        task_start(ctx, self.name());
        ctx.backend.init_bvmcons();
        Ok(())
    }

    fn name(&self) -> &str {
        "bvm_console"
    }
}

pub struct MpTableTask;

impl<'a> PipelineTask<BootCtx<'a>> for MpTableTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        let vcpus = ctx.params.vcpu_count();
        ctx.backend
            .mptable_build(vcpus)
            .map_err(|code| HyvekitError::MpTableBuild { code })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))
    }

    fn name(&self) -> &str {
        "mptable"
    }
}

/// Always runs; the instance ID becomes the SMBIOS system UUID.
pub struct SmbiosTask;

impl<'a> PipelineTask<BootCtx<'a>> for SmbiosTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        let uuid = instance_id.hyphenated().to_string();
        let descriptor = ctx
            .arena
            .intern(&uuid)
            .map_err(|_| HyvekitError::SmbiosBuild { code: libc::EINVAL })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))?;

        ctx.backend
            .smbios_build(descriptor)
            .map_err(|code| HyvekitError::SmbiosBuild { code })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))
    }

    fn name(&self) -> &str {
        "smbios"
    }
}

pub struct AcpiTask;

impl<'a> PipelineTask<BootCtx<'a>> for AcpiTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        let vcpus = ctx.params.vcpu_count();
        ctx.backend
            .acpi_build(vcpus)
            .map_err(|code| HyvekitError::AcpiBuild { code })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))
    }

    fn name(&self) -> &str {
        "acpi"
    }
}
