//! Stage dependency graph and ready-set computation.

use std::collections::BTreeSet;

use super::stage::Stage;
use crate::types::{LensError, Result};

/// Declared stages with their dependencies, in declaration order
#[derive(Debug, Clone)]
pub struct TaskGraph {
    stages: Vec<Stage>,
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self {
            stages: Stage::ALL.to_vec(),
        }
    }
}

impl TaskGraph {
    /// Graph over a subset of stages. Every dependency must be included and
    /// the graph must be acyclic.
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        let graph = Self { stages };
        graph.validate()?;
        Ok(graph)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages not yet done whose dependencies are all done, in declaration order
    pub fn ready(&self, done: &BTreeSet<Stage>) -> Vec<Stage> {
        self.stages
            .iter()
            .copied()
            .filter(|stage| !done.contains(stage))
            .filter(|stage| stage.dependencies().iter().all(|dep| done.contains(dep)))
            .collect()
    }

    /// Successive ready sets until every stage is scheduled
    pub fn waves(&self) -> Vec<Vec<Stage>> {
        let mut done = BTreeSet::new();
        let mut waves = Vec::new();
        loop {
            let ready = self.ready(&done);
            if ready.is_empty() {
                break;
            }
            done.extend(ready.iter().copied());
            waves.push(ready);
        }
        waves
    }

    fn validate(&self) -> Result<()> {
        let members: BTreeSet<Stage> = self.stages.iter().copied().collect();
        if members.len() != self.stages.len() {
            return Err(LensError::Config("Duplicate stage in pipeline".to_string()));
        }

        for stage in &self.stages {
            if let Some(missing) = stage.dependencies().iter().find(|d| !members.contains(*d)) {
                return Err(LensError::Config(format!(
                    "Stage '{}' depends on '{}', which is not in the pipeline",
                    stage, missing
                )));
            }
        }

        let scheduled: usize = self.waves().iter().map(Vec::len).sum();
        if scheduled != self.stages.len() {
            return Err(LensError::Config(
                "Pipeline stages contain a dependency cycle".to_string(),
            ));
        }
        Ok(())
    }
}
