//! # wetlab CLI
//!
//! Command-line interface for running and auditing protocol scripts.
//!
//! Usage:
//!   wetlab run <script.json>
//!   wetlab replay <protocol_flow.json>
//!   wetlab show <script.json | protocol_flow.json>
//!   wetlab schema
//!
//! Examples:
//!   wetlab run protocols/pcr_setup.json
//!   wetlab --log-dir /tmp/sched run protocols/pcr_setup.json
//!   wetlab --permissive replay /tmp/sched/protocol_flow.json

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wetlab_runner::{RunOutcome, Runner, RunnerConfig};
use wetlab_sim::{
    replay, Error, ExecutionLog, LabConfig, LabLayout, Script, ScriptSchema, Strictness, LOG_DIR_ENV,
};

#[derive(Parser)]
#[command(name = "wetlab")]
#[command(author, version, about = "wetlab - wet-lab protocol simulator and auditor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory that receives protocol_flow.json
    #[arg(long, global = true, env = LOG_DIR_ENV)]
    log_dir: Option<PathBuf>,

    /// Let instruments run with no containers and read any number of tubes
    #[arg(long, global = true)]
    permissive: bool,

    /// Lab layout JSON overriding instrument locations
    #[arg(long, global = true)]
    layout: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a protocol script and write its execution log
    Run {
        /// Path to the script JSON file
        file: PathBuf,

        /// Wall-clock limit for the whole run
        #[arg(short, long, default_value = "30")]
        timeout_secs: u64,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-apply a persisted execution log and report the first divergence
    Replay {
        /// Path to protocol_flow.json
        file: PathBuf,
    },
    /// Pretty-print a script or an execution log
    Show {
        file: PathBuf,
    },
    /// Show the script schema (available ops and instruments)
    Schema {
        /// Print as JSON instead of Markdown
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Print the one-line feedback and exit non-zero
fn fail(err: Error) -> ! {
    eprintln!("{}", err.feedback());
    std::process::exit(1);
}

fn lab_config(cli: &Cli) -> Result<LabConfig, Error> {
    let mut lab = LabConfig::default();
    if let Some(dir) = &cli.log_dir {
        lab = lab.with_log_dir(dir);
    }
    if cli.permissive {
        lab = lab.with_strictness(Strictness::Permissive);
    }
    if let Some(path) = &cli.layout {
        lab = lab.with_layout(LabLayout::load(path)?);
    }
    Ok(lab)
}

async fn run_script(file: &Path, lab: LabConfig, timeout_secs: u64, json: bool) {
    let script = Script::load(file).unwrap_or_else(|e| fail(e));

    let runner = Runner::with_config(RunnerConfig {
        timeout: Duration::from_secs(timeout_secs),
        lab,
    });
    let outcome = runner.run(script).await.unwrap_or_else(|e| fail(e));

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
        if !outcome.is_completed() {
            std::process::exit(1);
        }
        return;
    }

    match outcome {
        RunOutcome::Completed(report) => {
            for step in &report.trace {
                println!("  [{:>3}] {:<22} {}", step.step, step.op, step.result);
            }
            let mut names: Vec<_> = report.readings.keys().collect();
            names.sort();
            for name in names {
                println!("  {} = {:?}", name, report.readings[name]);
            }
            println!(
                "\n{} commands written to {}",
                report.commands,
                report.log_path.display()
            );
        }
        RunOutcome::Failed { feedback, step, trace } => {
            for s in &trace {
                eprintln!("  [{:>3}] {:<22} {}", s.step, s.op, s.result);
            }
            if let Some(step) = step {
                eprintln!("  [{:>3}] failed", step);
            }
            eprintln!("{}", feedback);
            std::process::exit(1);
        }
        RunOutcome::TimedOut { feedback } => {
            eprintln!("{}", feedback);
            std::process::exit(1);
        }
    }
}

fn replay_log(file: &Path, lab: LabConfig) {
    let log = ExecutionLog::load(file).unwrap_or_else(|e| fail(e));
    let report = replay(&log, lab).unwrap_or_else(|e| fail(e));

    println!("Replayed {} commands, all matched.\n", report.commands);
    println!("  {:<6} {:<28} {:<6} {:>10}  {}", "index", "label", "type", "volume", "location");
    for c in &report.containers {
        println!(
            "  {:<6} {:<28} {:<6} {:>10.2}  {}",
            c.index(),
            c.label(),
            c.container_type(),
            c.volume(),
            c.location()
        );
    }
}

fn show_file(file: &Path) {
    if let Ok(script) = Script::load(file) {
        script.pretty_print();
        return;
    }

    let log = ExecutionLog::load(file).unwrap_or_else(|e| fail(e));
    println!("Protocol started {}", log.protocol_start_time);
    println!("Commands: {}\n", log.len());
    for cmd in log.iter() {
        println!("  {}", cmd.summary());
    }
}

fn show_schema(json: bool) {
    let schema = ScriptSchema::new();
    if json {
        println!("{}", schema.to_json());
    } else {
        println!("{}", schema.to_text());
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run {
            file,
            timeout_secs,
            json,
        } => {
            let lab = lab_config(&cli).unwrap_or_else(|e| fail(e));
            run_script(file, lab, *timeout_secs, *json).await;
        }
        Commands::Replay { file } => {
            let lab = lab_config(&cli).unwrap_or_else(|e| fail(e));
            replay_log(file, lab);
        }
        Commands::Show { file } => show_file(file),
        Commands::Schema { json } => show_schema(*json),
    }
}
