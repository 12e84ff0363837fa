//! Task: boot specification resolution.
//!
//! Encodes the boot variant into the backend's firmware descriptor and has
//! the backend validate and load it. An inconsistent variant (a kernel boot
//! with no kernel image) is rejected before the backend is called.

use super::{BootCtx, log_task_error, task_start};
use crate::pipeline::PipelineTask;
use hyvekit_shared::errors::{HyvekitError, HyvekitResult};

pub struct BootSpecTask;

impl<'a> PipelineTask<BootCtx<'a>> for BootSpecTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        let params = ctx.params;
        let spec = params.boot_spec();
        let encoded = spec
            .encode()
            .map_err(|reason| HyvekitError::InvalidBootParams {
                reason,
                code: libc::EINVAL,
            })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))?;

        let descriptor = ctx
            .arena
            .intern(&encoded)
            .map_err(|_| HyvekitError::InvalidBootParams {
                reason: "boot parameters contain a NUL byte".into(),
                code: libc::EINVAL,
            })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))?;

        ctx.backend
            .firmware_parse(descriptor)
            .map_err(|code| HyvekitError::InvalidBootParams {
                reason: format!("backend rejected '{}'", encoded),
                code,
            })
            .inspect_err(|e| log_task_error(&instance_id, task_name, e))?;

        tracing::info!(boot = %spec, "Boot image loaded");
        Ok(())
    }

    fn name(&self) -> &str {
        "boot_spec"
    }
}
