// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::{PlanFile, PlannedStep, load_and_validate};
use crate::engine::{PlanReport, PlanRunner, RunnerOptions};
use crate::errors::Result;
use crate::exec::{Environment, Executor, OutputSink, ShutdownRegistry};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading (file or inline command)
/// - the shutdown registry and the process supervisor
/// - the plan runner
/// - Ctrl-C handling (terminates detached processes, then stops)
pub async fn run(args: CliArgs) -> Result<PlanReport> {
    let plan = load_plan(&args)?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(PlanReport::default());
    }

    // One registry per host process; it is drained before we return.
    let registry = ShutdownRegistry::new();
    let executor = Executor::new(registry.clone());

    let options = RunnerOptions {
        wait_detached: args.wait_detached,
    };
    let runner = PlanRunner::new(executor, options);

    tokio::select! {
        report = runner.run(plan.steps()) => Ok(report),
        () = shutdown_signal() => {
            warn!("interrupted; terminating detached processes");
            let shutdown = registry.run_shutdown_pass().await;
            Ok(PlanReport {
                steps: Vec::new(),
                shutdown,
                interrupted: true,
            })
        }
    }
}

/// Either the `--config` plan or a one-step plan for the inline command.
fn load_plan(args: &CliArgs) -> Result<PlanFile> {
    match &args.config {
        Some(path) => {
            let plan = load_and_validate(path)?;
            info!(path = %path.display(), steps = plan.len(), "loaded plan");
            Ok(plan)
        }
        None => {
            let request = args.inline_request()?;
            Ok(PlanFile::new_unchecked(vec![PlannedStep {
                name: "command".to_string(),
                request,
            }]))
        }
    }
}

/// Resolves on Ctrl-C. If the signal cannot be listened for, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Simple dry-run output: print steps and their resolved settings.
fn print_dry_run(plan: &PlanFile) {
    println!("execkit dry-run");
    println!();

    println!("steps ({}):", plan.len());
    for step in plan.steps() {
        let req = &step.request;
        println!("  - {}", step.name);
        println!("      command: {}", req.command);
        println!("      mode: {:?}", req.mode);
        if let Some(dir) = &req.working_dir {
            println!("      working_dir: {}", dir.display());
        }
        if let OutputSink::File(path) = &req.output {
            println!("      output_file: {}", path.display());
        }
        if !req.success_codes.is_empty() {
            let codes: Vec<i32> = req.success_codes.iter().collect();
            println!("      success_codes: {:?}", codes);
        }
        match &req.env {
            Environment::Inherit => {}
            Environment::Exact(vars) => println!("      env: {} variables", vars.len()),
        }
        if req.mode.is_async() {
            println!("      cleanup_on_shutdown: {}", req.cleanup_on_shutdown);
        }
    }

    debug!("dry-run complete (no execution)");
}
