// src/main.rs

use execkit::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(status) => std::process::exit(status),
        Err(err) => {
            eprintln!("execkit error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    let report = run(args).await?;

    if let Some(failed) = report.first_failure() {
        eprintln!("execkit: step '{}' failed", failed.name);
    }
    Ok(report.exit_status())
}
