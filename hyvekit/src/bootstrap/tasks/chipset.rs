//! Tasks: core chipset emulation.
//!
//! Run in order: MSRs, memory-range emulation, port I/O dispatch, PCI
//! interrupt routing, I/O APIC, RTC, SCI. Only MSR setup can fail.

use super::{BootCtx, log_task_error, task_start};
use crate::pipeline::PipelineTask;
use hyvekit_shared::errors::{HyvekitError, HyvekitResult};

pub struct MsrTask;

impl<'a> PipelineTask<BootCtx<'a>> for MsrTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        ctx.backend
            .init_msr()
            .map_err(|code| HyvekitError::MsrInit { code })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))
    }

    fn name(&self) -> &str {
        "msr"
    }
}

pub struct MemoryEmulationTask;

impl<'a> PipelineTask<BootCtx<'a>> for MemoryEmulationTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        task_start(ctx, self.name());
        ctx.backend.init_mem();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory_emulation"
    }
}

pub struct PortIoTask;

impl<'a> PipelineTask<BootCtx<'a>> for PortIoTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        task_start(ctx, self.name());
        ctx.backend.init_inout();
        Ok(())
    }

    fn name(&self) -> &str {
        "port_io"
    }
}

pub struct PciIrqTask;

impl<'a> PipelineTask<BootCtx<'a>> for PciIrqTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        task_start(ctx, self.name());
        ctx.backend.pci_irq_init();
        Ok(())
    }

    fn name(&self) -> &str {
        "pci_irq"
    }
}

pub struct IoApicTask;

impl<'a> PipelineTask<BootCtx<'a>> for IoApicTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        task_start(ctx, self.name());
        ctx.backend.ioapic_init();
        Ok(())
    }

    fn name(&self) -> &str {
        "ioapic"
    }
}

pub struct RtcTask;

impl<'a> PipelineTask<BootCtx<'a>> for RtcTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        task_start(ctx, self.name());
        let use_local_time = !ctx.params.use_utc_clock();
        ctx.backend.rtc_init(use_local_time);
        tracing::debug!(use_local_time, "RTC initialized");
        Ok(())
    }

    fn name(&self) -> &str {
        "rtc"
    }
}

pub struct SciTask;

impl<'a> PipelineTask<BootCtx<'a>> for SciTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        task_start(ctx, self.name());
        ctx.backend.sci_init();
        Ok(())
    }

    fn name(&self) -> &str {
        "sci"
    }
}
