//! Tasks: memory size resolution and guest memory setup.

use super::{BootCtx, log_task_error, task_start};
use crate::pipeline::PipelineTask;
use hyvekit_shared::errors::{HyvekitError, HyvekitResult};

pub struct MemorySizeTask;

impl<'a> PipelineTask<BootCtx<'a>> for MemorySizeTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        let params = ctx.params;
        let spec = params.memory_size();
        let classify = |code| HyvekitError::InvalidMemsize {
            spec: spec.to_string(),
            code,
        };
        let bytes = ctx
            .arena
            .intern(spec)
            .map_err(|_| classify(libc::EINVAL))
            .and_then(|s| ctx.backend.parse_memsize(s).map_err(classify))
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))?;

        tracing::debug!(spec, bytes, "Resolved guest memory size");
        ctx.memory_bytes = Some(bytes);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory_size"
    }
}

pub struct MemorySetupTask;

impl<'a> PipelineTask<BootCtx<'a>> for MemorySetupTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        let bytes = ctx
            .memory_bytes
            .ok_or_else(|| HyvekitError::Internal("memory_size task must run first".into()))?;

        ctx.backend
            .setup_memory(bytes)
            .map_err(|code| HyvekitError::MemorySetup { bytes, code })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))?;

        tracing::info!(bytes, "Guest memory mapped");
        Ok(())
    }

    fn name(&self) -> &str {
        "memory_setup"
    }
}
