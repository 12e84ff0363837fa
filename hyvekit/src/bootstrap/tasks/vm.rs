//! Tasks: VM creation, vCPU limit check, bootstrap processor.

use super::{BootCtx, log_task_error, task_start};
use crate::pipeline::PipelineTask;
use hyvekit_shared::errors::{HyvekitError, HyvekitResult};

/// Index of the bootstrap processor.
const BSP: u32 = 0;

pub struct VmCreateTask;

impl<'a> PipelineTask<BootCtx<'a>> for VmCreateTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        ctx.backend
            .vm_create()
            .map_err(|code| HyvekitError::VmCreate { code })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))?;

        tracing::info!(instance_id = %instance_id, "VM context created");
        Ok(())
    }

    fn name(&self) -> &str {
        "vm_create"
    }
}

/// Compares the requested vCPUs with the host ceiling, which is only known
/// once the VM exists.
pub struct VcpuLimitTask;

impl<'a> PipelineTask<BootCtx<'a>> for VcpuLimitTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        let requested = ctx.params.vcpu_count();
        let max = ctx.backend.max_vcpus();
        ctx.max_vcpus = Some(max);

        if requested > max {
            let err = HyvekitError::VcpuLimitExceeded { requested, max };
            log_task_error(&instance_id, task_name, &err);
            return Err(err);
        }

        tracing::debug!(requested, max, "vCPU count within host limit");
        Ok(())
    }

    fn name(&self) -> &str {
        "vcpu_limit"
    }
}

/// Loads the boot image into mapped memory, then starts vCPU 0 at the
/// entry point the loader reports.
pub struct BootstrapVcpuTask;

impl<'a> PipelineTask<BootCtx<'a>> for BootstrapVcpuTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        let max_vcpus = ctx
            .max_vcpus
            .ok_or_else(|| HyvekitError::Internal("vcpu_limit task must run first".into()))?;

        let rip = ctx
            .backend
            .load_firmware()
            .and_then(|rip| ctx.backend.vcpu_add(BSP, BSP, rip).map(|()| rip))
            .map_err(|code| HyvekitError::VcpuCreate { code })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))?;

        tracing::info!(
            vcpu = BSP,
            max_vcpus,
            rip = %format!("{:#x}", rip),
            "Bootstrap vCPU started"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "bootstrap_vcpu"
    }
}
