#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use execkit::config::{CommandConfig, DefaultsSection, PlanFile, RawPlanFile, StepConfig};
use execkit::types::ExecutionMode;

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanFileBuilder {
    plan: RawPlanFile,
}

impl PlanFileBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile {
                defaults: DefaultsSection::default(),
                step: Vec::new(),
            },
        }
    }

    pub fn with_step(mut self, step: StepConfig) -> Self {
        self.plan.step.push(step);
        self
    }

    pub fn with_default_success_codes(mut self, codes: &[i32]) -> Self {
        self.plan.defaults.success_codes = codes.to_vec();
        self
    }

    pub fn with_default_env(mut self, key: &str, value: &str) -> Self {
        self.plan.defaults.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> PlanFile {
        PlanFile::try_from(self.plan).expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StepConfig`.
pub struct StepConfigBuilder {
    step: StepConfig,
}

impl StepConfigBuilder {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            step: StepConfig {
                name: name.to_string(),
                command: CommandConfig::Line(command.to_string()),
                mode: ExecutionMode::Sync,
                working_dir: None,
                output_file: None,
                env: BTreeMap::new(),
                inherit_env: None,
                success_codes: None,
                cleanup_on_shutdown: None,
                stdin: None,
            },
        }
    }

    pub fn args(name: &str, argv: &[&str]) -> Self {
        let mut builder = Self::new(name, "");
        builder.step.command = CommandConfig::Args(argv.iter().map(|s| s.to_string()).collect());
        builder
    }

    pub fn detached(mut self) -> Self {
        self.step.mode = ExecutionMode::Async;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.step.working_dir = Some(dir.into());
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.step.output_file = Some(path.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.step.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn inherit_env(mut self, val: bool) -> Self {
        self.step.inherit_env = Some(val);
        self
    }

    pub fn success_codes(mut self, codes: &[i32]) -> Self {
        self.step.success_codes = Some(codes.to_vec());
        self
    }

    pub fn cleanup_on_shutdown(mut self, val: bool) -> Self {
        self.step.cleanup_on_shutdown = Some(val);
        self
    }

    pub fn build(self) -> StepConfig {
        self.step
    }
}
