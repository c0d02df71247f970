// src/config/validate.rs

use std::collections::{BTreeMap, HashSet};

use crate::config::model::{
    CommandConfig, DefaultsSection, PlanFile, PlannedStep, RawPlanFile, StepConfig,
};
use crate::errors::{ExecError, Result};
use crate::exec::command::CommandSpec;
use crate::exec::request::{Environment, ExecRequest, OutputSink};
use crate::exec::success::SuccessCodes;

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = crate::errors::ExecError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_steps(&raw)?;
        validate_step_names(&raw)?;

        let steps = raw
            .step
            .iter()
            .map(|step| resolve_step(&raw.defaults, step))
            .collect::<Result<Vec<_>>>()?;

        Ok(PlanFile::new_unchecked(steps))
    }
}

fn ensure_has_steps(cfg: &RawPlanFile) -> Result<()> {
    if cfg.step.is_empty() {
        return Err(ExecError::ConfigError(
            "plan must contain at least one [[step]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_step_names(cfg: &RawPlanFile) -> Result<()> {
    let mut seen = HashSet::new();
    for step in cfg.step.iter() {
        let name = step.name.trim();
        if name.is_empty() {
            return Err(ExecError::ConfigError(
                "every [[step]] needs a non-empty `name`".to_string(),
            ));
        }
        if !seen.insert(name) {
            return Err(ExecError::ConfigError(format!(
                "duplicate step name '{}'",
                name
            )));
        }
    }
    Ok(())
}

fn resolve_step(defaults: &DefaultsSection, step: &StepConfig) -> Result<PlannedStep> {
    let command = resolve_command(&step.command).map_err(|e| match e {
        ExecError::InvalidCommand(msg) => {
            ExecError::InvalidCommand(format!("step '{}': {}", step.name, msg))
        }
        other => other,
    })?;

    let success_codes = match &step.success_codes {
        Some(codes) => SuccessCodes::new(codes.iter().copied()),
        None => SuccessCodes::new(defaults.success_codes.iter().copied()),
    };

    let mut request = ExecRequest::new(command)
        .mode(step.mode)
        .env(resolve_env(defaults, step))
        .success_codes(success_codes)
        .stdin(step.stdin.or(defaults.stdin).unwrap_or_default())
        .cleanup_on_shutdown(
            step.cleanup_on_shutdown
                .or(defaults.cleanup_on_shutdown)
                .unwrap_or(true),
        );

    request.working_dir = step
        .working_dir
        .clone()
        .or_else(|| defaults.working_dir.clone());

    if let Some(path) = &step.output_file {
        request.output = OutputSink::File(path.clone());
    }

    Ok(PlannedStep {
        name: step.name.trim().to_string(),
        request,
    })
}

fn resolve_command(command: &CommandConfig) -> Result<CommandSpec> {
    match command {
        CommandConfig::Line(line) => CommandSpec::parse(line),
        CommandConfig::Args(args) => CommandSpec::new(args.iter().cloned()),
    }
}

fn resolve_env(defaults: &DefaultsSection, step: &StepConfig) -> Environment {
    let inherit = step.inherit_env.or(defaults.inherit_env).unwrap_or(true);

    let mut overlay: BTreeMap<String, String> = defaults.env.clone();
    overlay.extend(step.env.iter().map(|(k, v)| (k.clone(), v.clone())));

    match (inherit, overlay.is_empty()) {
        (true, true) => Environment::Inherit,
        (true, false) => Environment::inherited_with(overlay),
        (false, _) => Environment::Exact(overlay.into_iter().collect()),
    }
}
