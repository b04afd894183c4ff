//! reward-validator - CLI entry point
//!
//! Usage: `reward-validator [TASK_ID] [--response-file PATH] [--json]`
//!
//! With no task id every registered task runs in registry order. `--json`
//! prints all reports as one JSON array. Exits 0 only if every requested task
//! scored 1.0.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use reward_validator::{
    format, Clock, Config, GoogleWorkspaceClient, SystemClock, TaskRegistry, ValidationEngine,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "reward-validator")]
#[command(about = "Check agent runs against live mailbox and calendar state", long_about = None)]
#[command(version)]
struct CliArgs {
    /// Task to validate (all registered tasks when omitted)
    task_id: Option<String>,

    /// File holding the agent's final response, kept as a preview on the report
    #[arg(long, value_name = "PATH")]
    response_file: Option<PathBuf>,

    /// Print a JSON array of report records instead of trace lines
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the reports.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reward_validator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Usage errors exit with status 2, help and version with 0.
    let args = CliArgs::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::from(2);
        }
    };

    match runtime.block_on(run(args)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether every requested task scored 1.0.
async fn run(args: CliArgs) -> anyhow::Result<bool> {
    let config = Config::from_env()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = GoogleWorkspaceClient::new(
        config.google_access_token.clone(),
        config.google.clone(),
        Arc::clone(&clock),
    )?;
    let registry = Arc::new(TaskRegistry::builtin());
    let engine = ValidationEngine::with_config(
        Arc::clone(&registry),
        Arc::new(client),
        clock,
        config.engine(),
    );

    let agent_response = match &args.response_file {
        Some(path) => Some(tokio::fs::read_to_string(path).await?),
        None => None,
    };

    let requested = match args.task_id {
        Some(id) => vec![id],
        None => registry.ids(),
    };
    info!("Validating {} task(s)", requested.len());

    let mut reports = Vec::new();
    let mut all_passed = true;
    for id in &requested {
        match engine.evaluate(id, agent_response.as_deref()).await {
            Ok(report) => {
                if !args.json {
                    for line in format::render_lines(&report) {
                        println!("{}", line);
                    }
                }
                all_passed &= report.is_full_score();
                reports.push(report);
            }
            Err(e) => {
                error!("{}", e);
                all_passed = false;
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&format::to_records(&reports))?);
    } else if requested.len() > 1 {
        for line in format::render_summary(&reports, requested.len()) {
            println!("{}", line);
        }
    }

    Ok(all_passed && !reports.is_empty())
}
