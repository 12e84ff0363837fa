//! hyvekit command-line front end.
//!
//! Flags mirror xhyve's. A JSON parameter file may supply the base
//! configuration; flags given on the command line override it.

use clap::Parser;
use hyvekit::{
    BackendKind, BackendOptions, BootSpec, HyvekitResult, LoggingOptions, VmParams, boot_pinned,
    create_backend, init_logging,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hyvekit", version, about = "Boot a lightweight virtual machine")]
struct Cli {
    /// Number of guest vCPUs
    #[arg(short = 'c', long = "cpus")]
    cpus: Option<i64>,

    /// Guest memory, e.g. 1024 (MiB), 2G
    #[arg(short = 'm', long = "memory")]
    memory: Option<String>,

    /// PCI slot descriptor: [bus:]slot[:func],emulation[,options]
    #[arg(short = 's', long = "slot")]
    slots: Vec<String>,

    /// LPC device descriptor: device,backend
    #[arg(short = 'l', long = "lpc")]
    lpc: Vec<String>,

    /// Build ACPI tables
    #[arg(short = 'A', long = "acpi")]
    acpi: bool,

    /// Build MP tables
    #[arg(long = "mptable")]
    mptable: bool,

    /// Enable the BVM console
    #[arg(short = 'b', long = "bvmconsole")]
    bvmconsole: bool,

    /// Instance UUID
    #[arg(short = 'U', long = "uuid")]
    uuid: Option<String>,

    /// RTC keeps UTC time
    #[arg(short = 'u', long = "utc")]
    utc: bool,

    /// Boot firmware: kexec,kernel,initrd,"cmdline" or fbsd,loader,volume,"env"
    #[arg(short = 'f', long = "firmware")]
    firmware: Option<BootSpec>,

    /// JSON file with VM parameters
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Hypervisor backend
    #[arg(long, value_enum, default_value = "dry-run")]
    backend: BackendKind,

    /// vCPU ceiling reported by the dry-run backend
    #[arg(long = "max-vcpus")]
    max_vcpus: Option<u32>,

    /// Also write logs to this directory
    #[arg(long = "log-dir")]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn vm_params(&self) -> HyvekitResult<VmParams> {
        let mut params = match &self.config {
            Some(path) => VmParams::from_json_file(path)?,
            None => VmParams::default(),
        };

        if let Some(cpus) = self.cpus {
            params.vcpu_count = cpus;
        }
        if let Some(memory) = &self.memory {
            params.memory_size = memory.clone();
        }
        if !self.slots.is_empty() {
            params.pci_slots = self.slots.clone();
        }
        if !self.lpc.is_empty() {
            params.lpc_devices = self.lpc.clone();
        }
        if let Some(uuid) = &self.uuid {
            params.instance_id = uuid.clone();
        }
        if let Some(firmware) = &self.firmware {
            params.boot_spec = firmware.clone();
        }
        params.enable_acpi |= self.acpi;
        params.enable_mptables |= self.mptable;
        params.enable_bvm_console |= self.bvmconsole;
        params.use_utc_clock |= self.utc;

        Ok(params)
    }

    fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            max_vcpus: self.max_vcpus,
            ..Default::default()
        }
    }
}

async fn run(cli: Cli) -> HyvekitResult<i32> {
    let params = cli.vm_params()?;
    let kind = cli.backend;
    let options = cli.backend_options();

    let task = boot_pinned(params, move || create_backend(kind, &options))?;
    let exit = task.wait().await??;
    Ok(exit.status)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let logging = LoggingOptions {
        log_dir: cli.log_dir.clone(),
        ..Default::default()
    };
    let guard = match init_logging(&logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("hyvekit: {}", e);
            std::process::exit(1);
        }
    };

    let code = match run(cli).await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(stage = ?e.stage(), code = ?e.raw_code(), "Bootstrap failed: {}", e);
            1
        }
    };

    // Flush the file writer before exiting.
    drop(guard);
    std::process::exit(code);
}
