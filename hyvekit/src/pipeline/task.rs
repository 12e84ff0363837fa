//! Generic task trait for pipeline execution.

use hyvekit_shared::errors::HyvekitResult;

/// Trait for tasks that can be executed in a pipeline.
///
/// Tasks are consumed when run and get exclusive access to the shared
/// context for their duration.
pub trait PipelineTask<Ctx> {
    /// Execute the task against the shared pipeline context.
    fn run(self: Box<Self>, ctx: &mut Ctx) -> HyvekitResult<()>;

    /// Get human-readable task name for logging.
    fn name(&self) -> &str;
}

pub type BoxedTask<Ctx> = Box<dyn PipelineTask<Ctx>>;
