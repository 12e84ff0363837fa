//! VM bootstrap orchestration.
//!
//! ## Architecture
//!
//! Bootstrap is table-driven. The plan is built once from the normalized
//! parameters and executed strictly in order; the first failing task aborts
//! the boot with its classified error and nothing after it runs.
//!
//! ```text
//!   1. PciSlots        (register every slot descriptor)
//!   2. LpcDevices      (register legacy devices)
//!   3. MemorySize      (resolve the size expression to bytes)
//!   4. BootSpec        (validate and load kernel or loader)
//!   5. VmCreate        (allocate the guest VM context)
//!   6. VcpuLimit       (compare against the host maximum)
//!   7. MemorySetup     (map guest memory, eagerly)
//!   8. Chipset         (MSR ─ mem ─ port I/O ─ PCI IRQ ─ I/O APIC ─ RTC ─ SCI)
//!   9. PciBus          (finalize enumeration)
//!  10. BvmConsole      (only when enabled)
//!  11. MpTable         (only when enabled)
//!  12. Smbios          (always)
//!  13. Acpi            (only when enabled)
//!  14. BootstrapVcpu   (vCPU 0 at the boot entry point)
//!  15. Dispatch        (block in the backend event loop)
//! ```
//!
//! Earlier stages are never rolled back on failure. `ArgArena` and
//! `BootLock` are released on every exit path.

mod dispatch;
mod tasks;
mod types;

pub use types::{ArgArena, BootContext, BootLock};

use crate::backend::{GuestExit, HypervisorBackend};
use crate::config::constants::BOOT_THREAD_NAME;
use crate::config::{BootParams, VmParams};
use crate::pipeline::{BoxedTask, ExecutionPlan, PipelineExecutor, PipelineMetrics, Stage};
use crate::util::{PinnedTask, spawn_pinned};
use hyvekit_shared::BootStage;
use hyvekit_shared::errors::HyvekitResult;

use tasks::{
    AcpiTask, BootCtx, BootSpecTask, BootstrapVcpuTask, BvmConsoleTask, IoApicTask,
    LpcDevicesTask, MemoryEmulationTask, MemorySetupTask, MemorySizeTask, MpTableTask, MsrTask,
    PciBusTask, PciIrqTask, PciSlotsTask, PortIoTask, RtcTask, SciTask, SmbiosTask, VcpuLimitTask,
    VmCreateTask,
};

// ============================================================================
// EXECUTION PLAN
// ============================================================================

fn stage<'a>(
    boot_stage: BootStage,
    tasks: Vec<BoxedTask<BootCtx<'a>>>,
) -> Stage<BoxedTask<BootCtx<'a>>> {
    Stage::new(boot_stage.as_str(), tasks)
}

/// Build the plan for the given parameters. Optional firmware stages are
/// left out of the plan entirely when disabled.
fn get_execution_plan<'a>(params: &BootParams) -> ExecutionPlan<BootCtx<'a>> {
    let mut stages = vec![
        // Phase 1: Declare topology, memory and boot image before the VM exists
        stage(BootStage::PciSlots, vec![Box::new(PciSlotsTask)]),
        stage(BootStage::LpcDevices, vec![Box::new(LpcDevicesTask)]),
        stage(BootStage::MemorySize, vec![Box::new(MemorySizeTask)]),
        stage(BootStage::BootSpec, vec![Box::new(BootSpecTask)]),
        // Phase 2: Create the VM; the vCPU ceiling is only known afterwards
        stage(BootStage::VmCreate, vec![Box::new(VmCreateTask)]),
        stage(BootStage::VcpuLimit, vec![Box::new(VcpuLimitTask)]),
        stage(BootStage::MemorySetup, vec![Box::new(MemorySetupTask)]),
        // Phase 3: Chipset and bus
        stage(
            BootStage::Chipset,
            vec![
                Box::new(MsrTask),
                Box::new(MemoryEmulationTask),
                Box::new(PortIoTask),
                Box::new(PciIrqTask),
                Box::new(IoApicTask),
                Box::new(RtcTask),
                Box::new(SciTask),
            ],
        ),
        stage(BootStage::PciBus, vec![Box::new(PciBusTask)]),
    ];

    // Phase 4: Firmware tables describe the enumerated bus
    if params.enable_bvm_console() {
        stages.push(stage(BootStage::BvmConsole, vec![Box::new(BvmConsoleTask)]));
    }
    if params.enable_mptables() {
        stages.push(stage(BootStage::MpTable, vec![Box::new(MpTableTask)]));
    }
    stages.push(stage(BootStage::Smbios, vec![Box::new(SmbiosTask)]));
    if params.enable_acpi() {
        stages.push(stage(BootStage::Acpi, vec![Box::new(AcpiTask)]));
    }

    // Phase 5: Bootstrap processor goes last
    stages.push(stage(BootStage::BootstrapVcpu, vec![Box::new(BootstrapVcpuTask)]));

    ExecutionPlan::new(stages)
}

fn log_pipeline_metrics(params: &BootParams, metrics: &PipelineMetrics) {
    for stage in &metrics.stages {
        tracing::debug!(
            instance_id = %params.instance_id(),
            stage = stage.name,
            duration_us = stage.duration_us as u64,
            tasks = stage.tasks.len(),
            "Bootstrap stage finished"
        );
    }
    tracing::info!(
        instance_id = %params.instance_id(),
        stages = metrics.stages.len(),
        duration_us = metrics.total_duration_us as u64,
        "Bootstrap pipeline completed"
    );
}

// ============================================================================
// BOOTSTRAP
// ============================================================================

/// One boot attempt: normalized parameters plus the backend they drive.
///
/// # Example
///
/// ```ignore
/// let backend = create_backend(BackendKind::DryRun, &BackendOptions::default())?;
/// let exit = VmBootstrap::new(params, backend).boot()?;
/// std::process::exit(exit.status);
/// ```
pub struct VmBootstrap {
    params: BootParams,
    backend: Box<dyn HypervisorBackend>,
}

impl VmBootstrap {
    /// Runs the defaulting stage; the result is read-only from here on.
    pub fn new(params: VmParams, backend: Box<dyn HypervisorBackend>) -> Self {
        Self {
            params: params.normalize(),
            backend,
        }
    }

    pub fn params(&self) -> &BootParams {
        &self.params
    }

    /// Run every bootstrap stage, then block in the dispatch loop.
    ///
    /// Returns the guest's exit once the backend's event loop returns, or
    /// the first stage failure. Must be called on the thread that created
    /// the backend and stays there until the guest exits.
    pub fn boot(self) -> HyvekitResult<GuestExit> {
        let VmBootstrap {
            params,
            mut backend,
        } = self;

        let _lock = BootLock::acquire()?;
        let mut arena = ArgArena::new();

        let span = tracing::info_span!("boot", instance_id = %params.instance_id());
        let _enter = span.enter();

        tracing::info!(
            backend = backend.name(),
            vcpus = params.vcpu_count(),
            memory = params.memory_size(),
            boot = %params.boot_spec(),
            "Starting VM bootstrap"
        );

        let plan = get_execution_plan(&params);
        let metrics = {
            let mut ctx = BootContext::new(&params, backend.as_mut(), &mut arena);
            PipelineExecutor::execute(plan, &mut ctx)?
        };
        log_pipeline_metrics(&params, &metrics);

        // Backend may still reference arena buffers until dispatch returns.
        let exit = dispatch::hand_off(backend.as_mut(), params.instance_id());
        drop(arena);

        Ok(exit)
    }
}

/// Normalize `params` and boot on the current thread.
pub fn boot(params: VmParams, backend: Box<dyn HypervisorBackend>) -> HyvekitResult<GuestExit> {
    VmBootstrap::new(params, backend).boot()
}

/// Boot on a dedicated OS thread.
///
/// `make_backend` runs on that thread, so backend construction, every
/// bootstrap stage, and the dispatch loop share one OS thread for the
/// guest's whole lifetime.
pub fn boot_pinned<F>(
    params: VmParams,
    make_backend: F,
) -> HyvekitResult<PinnedTask<HyvekitResult<GuestExit>>>
where
    F: FnOnce() -> HyvekitResult<Box<dyn HypervisorBackend>> + Send + 'static,
{
    spawn_pinned(BOOT_THREAD_NAME, move || {
        let backend = make_backend()?;
        boot(params, backend)
    })
}
