//! Types shared between the hyvekit library and its tooling.

pub mod errors;
pub mod stage;

pub use errors::{HyvekitError, HyvekitResult};
pub use stage::BootStage;
