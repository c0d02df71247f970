// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::exec::request::{ExecRequest, OutputSink};
use crate::types::{ExecutionMode, StdinMode};

/// Top-level plan file as read from TOML, before validation.
///
/// ```toml
/// [defaults]
/// success_codes = [0]
/// cleanup_on_shutdown = true
///
/// [[step]]
/// name = "server"
/// command = ["python3", "-m", "http.server"]
/// mode = "async"
/// output_file = "target/logs/server.log"
///
/// [[step]]
/// name = "smoke"
/// command = "curl -fsS http://localhost:8000/"
/// ```
///
/// Steps run in file order.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPlanFile {
    /// Values applied to every step that does not override them.
    #[serde(default)]
    pub defaults: DefaultsSection,

    /// All steps from `[[step]]`.
    #[serde(default)]
    pub step: Vec<StepConfig>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultsSection {
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Empty means "only 0 succeeds".
    #[serde(default)]
    pub success_codes: Vec<i32>,

    /// Defaults to `true` when unset here and on the step.
    #[serde(default)]
    pub cleanup_on_shutdown: Option<bool>,

    /// Defaults to `true` when unset here and on the step.
    #[serde(default)]
    pub inherit_env: Option<bool>,

    /// Variables set for every step; step-level `env` wins on conflicts.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub stdin: Option<StdinMode>,
}

/// A command either as one shell-quoted line or as an argument list.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CommandConfig {
    Line(String),
    Args(Vec<String>),
}

/// `[[step]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    pub name: String,

    pub command: CommandConfig,

    /// `"sync"` (default) or `"async"`.
    #[serde(default)]
    pub mode: ExecutionMode,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Write combined stdout/stderr here instead of inheriting.
    #[serde(default)]
    pub output_file: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub inherit_env: Option<bool>,

    /// Replaces `defaults.success_codes` when present.
    #[serde(default)]
    pub success_codes: Option<Vec<i32>>,

    #[serde(default)]
    pub cleanup_on_shutdown: Option<bool>,

    #[serde(default)]
    pub stdin: Option<StdinMode>,
}

/// One validated step, ready to hand to an executor backend.
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub name: String,
    pub request: ExecRequest,
}

/// Validated plan. Build one via `PlanFile::try_from(RawPlanFile)`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    steps: Vec<PlannedStep>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(steps: Vec<PlannedStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Make relative working directories and output files relative to
    /// `base` (normally the directory holding the plan file).
    pub fn rooted_at(mut self, base: &Path) -> Self {
        for step in &mut self.steps {
            let request = &mut step.request;
            if let Some(dir) = request.working_dir.take() {
                request.working_dir = Some(join_relative(base, dir));
            }
            if let OutputSink::File(path) = &mut request.output {
                *path = join_relative(base, std::mem::take(path));
            }
        }
        self
    }
}

fn join_relative(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() { path } else { base.join(path) }
}
