//! Agent Pipeline
//!
//! Four personas run over one context blob as an explicit task graph:
//!
//! ```text
//! Analyst ──► Tech Lead ──► Writer
//!    │                        ▲
//!    ├────────────────────────┘
//!    └──────► Architect
//! ```
//!
//! Sequential mode runs one ready stage at a time in declaration order, which
//! reproduces Analyst, Tech Lead, Writer, Architect. Parallel mode runs each
//! ready set concurrently. Every stage produces an outcome; a failed stage
//! never stops the run.

pub mod agent;
pub mod graph;
pub mod outcome;
pub mod progress;
pub mod stage;

pub use agent::Agent;
pub use graph::TaskGraph;
pub use outcome::{FailurePolicy, StageOutcome, StageRecord};
pub use progress::{ProgressEvent, ProgressState, ProgressTracker};
pub use stage::{Stage, build_input};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info};

use crate::ai::{ContextGuard, SharedProvider, TokenUsage};
use crate::config::Config;
use crate::types::RunId;

/// Outcomes of one pipeline run, keyed by stage
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub id: RunId,
    pub started_at: DateTime<Utc>,
    records: BTreeMap<Stage, StageRecord>,
}

impl PipelineRun {
    pub fn record(&self, stage: Stage) -> Option<&StageRecord> {
        self.records.get(&stage)
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.record(stage).map(|r| &r.outcome)
    }

    /// Display text for a stage (response or failure message); empty if the
    /// stage was not part of the run
    pub fn text(&self, stage: Stage) -> String {
        self.outcome(stage).map(StageOutcome::text).unwrap_or_default()
    }

    /// Records in declaration order
    pub fn records(&self) -> impl Iterator<Item = &StageRecord> {
        Stage::ALL.iter().filter_map(|s| self.records.get(s))
    }

    pub fn failed_stages(&self) -> Vec<Stage> {
        self.records()
            .filter(|r| r.outcome.is_failed())
            .map(|r| r.outcome.stage())
            .collect()
    }

    pub fn total_usage(&self) -> TokenUsage {
        let mut total = TokenUsage::default();
        for record in self.records.values() {
            total += record.usage;
        }
        total
    }

    pub fn total_duration(&self) -> Duration {
        self.records.values().map(|r| r.duration).sum()
    }
}

/// Scheduler over a [`TaskGraph`] of agents
pub struct Pipeline {
    agent: Agent,
    graph: TaskGraph,
    policy: FailurePolicy,
    parallel: bool,
    progress: ProgressTracker,
}

impl Pipeline {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            graph: TaskGraph::default(),
            policy: FailurePolicy::default(),
            parallel: false,
            progress: ProgressTracker::default(),
        }
    }

    /// Pipeline configured from `[pipeline]` and `[llm]` settings
    pub fn from_config(provider: SharedProvider, config: &Config) -> Self {
        let agent = Agent::new(
            provider,
            ContextGuard::new(config.pipeline.max_context_chars),
            Duration::from_secs(config.llm.timeout_secs),
        );
        Self::new(agent)
            .with_policy(config.pipeline.failure_policy)
            .with_parallel(config.pipeline.parallel)
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_graph(mut self, graph: TaskGraph) -> Self {
        self.progress = ProgressTracker::new(graph.len());
        self.graph = graph;
        self
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Run every stage over `raw`. Always returns one record per stage.
    pub async fn run(&self, raw: &str) -> PipelineRun {
        let id = RunId::generate();
        let started_at = Utc::now();
        info!(
            "Pipeline {} starting ({} stages, {} mode, provider {})",
            id.short(),
            self.graph.len(),
            if self.parallel { "parallel" } else { "sequential" },
            self.agent.provider_name()
        );

        let mut records: BTreeMap<Stage, StageRecord> = BTreeMap::new();
        let mut done: BTreeSet<Stage> = BTreeSet::new();

        loop {
            let ready = self.graph.ready(&done);
            if ready.is_empty() {
                break;
            }

            let batch = if self.parallel {
                ready
            } else {
                ready.into_iter().take(1).collect()
            };
            debug!("Scheduling {:?}", batch);

            let inputs: Vec<(Stage, String)> = batch
                .iter()
                .map(|&stage| (stage, self.input_for(stage, raw, &records)))
                .collect();

            let finished = join_all(
                inputs
                    .iter()
                    .map(|(stage, input)| self.run_stage(*stage, input)),
            )
            .await;

            for record in finished {
                let stage = record.outcome.stage();
                done.insert(stage);
                records.insert(stage, record);
            }
        }

        self.progress.finish();
        let run = PipelineRun {
            id,
            started_at,
            records,
        };
        info!(
            "Pipeline {} finished: {} failed, {} tokens",
            run.id.short(),
            run.failed_stages().len(),
            run.total_usage().total()
        );
        run
    }

    async fn run_stage(&self, stage: Stage, input: &str) -> StageRecord {
        self.progress.stage_started(stage);
        let record = self.agent.run(stage, input).await;
        self.progress
            .stage_finished(stage, record.outcome.is_failed(), record.duration);
        record
    }

    fn input_for(&self, stage: Stage, raw: &str, records: &BTreeMap<Stage, StageRecord>) -> String {
        let forwarded: HashMap<Stage, String> = stage
            .dependencies()
            .iter()
            .filter_map(|dep| {
                records
                    .get(dep)
                    .map(|r| (*dep, r.outcome.forwarded_text(self.policy)))
            })
            .collect();
        build_input(stage, raw, |dep| {
            forwarded.get(&dep).map(String::as_str).unwrap_or_default()
        })
    }
}
