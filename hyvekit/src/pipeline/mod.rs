//! Generic table-driven pipeline execution framework.
//!
//! ## Architecture
//!
//! ```text
//! ExecutionPlan → Stages → Tasks
//!
//! - ExecutionPlan: ordered stages, built from a table
//! - Stage: named group of tasks that run one after another
//! - Task: atomic unit of work against a shared, mutably borrowed context
//! ```
//!
//! Execution is strictly sequential on the calling thread. The first task
//! that fails stops the pipeline: no later task in the same stage and no
//! later stage runs, and the error is returned as-is.
//!
//! ## Example
//!
//! ```ignore
//! use pipeline::{ExecutionPlan, PipelineExecutor, Stage};
//!
//! struct Context;
//! struct TaskA;
//! struct TaskB;
//!
//! let plan = ExecutionPlan::new(vec![
//!     Stage::new("first", vec![Box::new(TaskA)]),
//!     Stage::new("second", vec![Box::new(TaskB)]),
//! ]);
//!
//! let mut ctx = Context;
//! let metrics = PipelineExecutor::execute(plan, &mut ctx)?;
//! println!("pipeline took {}us", metrics.total_duration_us);
//! ```

mod metrics;
#[allow(clippy::module_inception)]
mod pipeline;
mod stage;
mod task;

pub use metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
pub use pipeline::{ExecutionPlan, PipelineExecutor};
pub use stage::Stage;
pub use task::{BoxedTask, PipelineTask};
