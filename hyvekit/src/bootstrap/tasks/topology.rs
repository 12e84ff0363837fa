//! Tasks: PCI slot and LPC device registration.

use super::{BootCtx, log_task_error, task_start};
use crate::descriptor::coalesce_lpc_entries;
use crate::pipeline::PipelineTask;
use hyvekit_shared::errors::{HyvekitError, HyvekitResult};

pub struct PciSlotsTask;

impl<'a> PipelineTask<BootCtx<'a>> for PciSlotsTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        let params = ctx.params;
        for slot in params.pci_slots() {
            let classify = |code| HyvekitError::PciSlot {
                descriptor: slot.clone(),
                code,
            };
            let descriptor = ctx.arena.intern(slot).map_err(|_| classify(libc::EINVAL));
            descriptor
                .and_then(|d| ctx.backend.pci_parse_slot(d).map_err(classify))
                .inspect_err(|e| log_task_error(&instance_id, task_name, e))?;
        }

        tracing::debug!(count = params.pci_slots().len(), "Registered PCI slots");
        Ok(())
    }

    fn name(&self) -> &str {
        "pci_slots"
    }
}

pub struct LpcDevicesTask;

impl<'a> PipelineTask<BootCtx<'a>> for LpcDevicesTask {
    fn run(self: Box<Self>, ctx: &mut BootCtx<'a>) -> HyvekitResult<()> {
        let task_name = self.name();
        let instance_id = task_start(ctx, task_name);

        // ["com1", "stdio"] is registered as "com1,stdio".
        let devices = coalesce_lpc_entries(ctx.params.lpc_devices());
        for device in &devices {
            let classify = |code| HyvekitError::LpcDevice {
                descriptor: device.clone(),
                code,
            };
            let descriptor = ctx.arena.intern(device).map_err(|_| classify(libc::EINVAL));
            descriptor
                .and_then(|d| ctx.backend.lpc_device_parse(d).map_err(classify))
                .inspect_err(|e| log_task_error(&instance_id, task_name, e))?;
        }

        tracing::debug!(count = devices.len(), "Registered LPC devices");
        Ok(())
    }

    fn name(&self) -> &str {
        "lpc_devices"
    }
}
