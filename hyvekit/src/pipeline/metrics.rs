#[derive(Debug, Clone)]
pub struct TaskMetrics {
    pub name: String,
    pub duration_us: u128,
}

#[derive(Debug, Clone)]
pub struct StageMetrics {
    pub index: usize,
    pub name: &'static str,
    pub duration_us: u128,
    pub tasks: Vec<TaskMetrics>,
}

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_duration_us: u128,
    pub stages: Vec<StageMetrics>,
}

impl PipelineMetrics {
    pub fn task_duration_us(&self, name: &str) -> Option<u128> {
        self.stages
            .iter()
            .flat_map(|stage| stage.tasks.iter())
            .find(|task| task.name == name)
            .map(|task| task.duration_us)
    }

    /// Names of the stages that ran, in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name).collect()
    }
}
