//! hyvekit: bootstrap orchestrator for lightweight hardware-virtualized
//! guests.
//!
//! A caller describes the VM with [`VmParams`], picks a
//! [`HypervisorBackend`], and calls [`boot`] (or [`boot_pinned`] to get a
//! dedicated OS thread). Parameters are normalized once, then every
//! bootstrap stage runs in a fixed order and the first failure is returned
//! as a classified [`HyvekitError`]. On success the call blocks in the
//! backend's dispatch loop until the guest exits.

pub mod backend;
pub mod bootstrap;
pub mod config;
pub mod descriptor;
pub mod logging;
pub mod pipeline;
pub mod util;

pub use backend::{
    BackendKind, BackendOptions, DryRunBackend, GuestExit, HypervisorBackend, RawStatus,
    create_backend,
};
pub use bootstrap::{VmBootstrap, boot, boot_pinned};
pub use config::{BootParams, BootSpec, VmParams};
pub use logging::{LoggingOptions, init_logging};
pub use util::PinnedTask;

pub use hyvekit_shared::{BootStage, HyvekitError, HyvekitResult};
