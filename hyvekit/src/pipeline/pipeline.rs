//! Generic pipeline execution framework.
//!
//! Provides a table-driven pipeline executor that runs stages of tasks in
//! order and stops at the first failure.

use super::metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
use super::stage::Stage;
use super::task::BoxedTask;
use hyvekit_shared::errors::HyvekitResult;
use std::time::Instant;

pub struct ExecutionPlan<Ctx> {
    stages: Vec<Stage<BoxedTask<Ctx>>>,
}

impl<Ctx> ExecutionPlan<Ctx> {
    pub fn new(stages: Vec<Stage<BoxedTask<Ctx>>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name).collect()
    }

    pub fn stages(self) -> Vec<Stage<BoxedTask<Ctx>>> {
        self.stages
    }
}

/// Pipeline executor framework.
///
/// This provides the generic infrastructure for executing a table-driven pipeline.
/// The actual task execution logic is provided by task implementations.
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Execute a plan.
    ///
    /// Iterates through stages and runs their tasks in order. Returns the
    /// first task error unchanged; nothing after the failing task runs.
    pub fn execute<Ctx>(
        plan: ExecutionPlan<Ctx>,
        ctx: &mut Ctx,
    ) -> HyvekitResult<PipelineMetrics> {
        let total_start = Instant::now();
        let mut stage_metrics = Vec::new();

        for (index, stage) in plan.stages().into_iter().enumerate() {
            let stage_start = Instant::now();
            let mut task_metrics = Vec::with_capacity(stage.tasks.len());

            for task in stage.tasks {
                let name = task.name().to_string();
                let task_start = Instant::now();
                task.run(ctx)?;
                task_metrics.push(TaskMetrics {
                    name,
                    duration_us: task_start.elapsed().as_micros(),
                });
            }

            stage_metrics.push(StageMetrics {
                index,
                name: stage.name,
                duration_us: stage_start.elapsed().as_micros(),
                tasks: task_metrics,
            });
        }

        Ok(PipelineMetrics {
            total_duration_us: total_start.elapsed().as_micros(),
            stages: stage_metrics,
        })
    }
}
