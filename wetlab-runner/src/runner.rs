//! Runner implementation - supervises one script run

use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use wetlab_sim::{
    Error, ExecutionLog, ExecutionStep, FileSink, Interpreter, LabConfig, LogSink, MemorySink,
    Result, Script, Session,
};

/// Default wall-clock budget for a whole run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Wall-clock limit for one script
    pub timeout: Duration,
    /// Lab the script runs against; its `log_path` receives the artifact
    pub lab: LabConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            lab: LabConfig::from_env(),
        }
    }
}

/// Result of a clean run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Commands written to the execution log
    pub commands: usize,
    /// Where the execution log was persisted
    pub log_path: PathBuf,
    pub trace: Vec<ExecutionStep>,
    /// Fluorometer readings stored by name
    pub readings: HashMap<String, Vec<i64>>,
}

/// How a run ended
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(RunReport),
    /// The script stopped on an error; nothing was persisted
    Failed {
        feedback: String,
        step: Option<usize>,
        trace: Vec<ExecutionStep>,
    },
    /// The run exceeded its time budget and was abandoned
    TimedOut { feedback: String },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    /// Single-line message for whoever wrote the script
    pub fn feedback(&self) -> Option<&str> {
        match self {
            RunOutcome::Completed(_) => None,
            RunOutcome::Failed { feedback, .. } | RunOutcome::TimedOut { feedback } => Some(feedback),
        }
    }
}

/// What the blocking half hands back
enum Execution {
    Finished {
        log: ExecutionLog,
        trace: Vec<ExecutionStep>,
        readings: HashMap<String, Vec<i64>>,
    },
    Aborted {
        error: Error,
        trace: Vec<ExecutionStep>,
    },
}

/// Runs scripts in fresh sessions under a wall-clock timeout
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    /// Create a runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `script` to completion, failure or timeout.
    ///
    /// Script failures are outcomes, not errors. `Err` means the runner
    /// itself broke: the worker panicked or the log could not be written.
    pub async fn run(&self, script: Script) -> Result<RunOutcome> {
        if let Err(e) = script.check_bindings() {
            return Ok(failed(e, Vec::new()));
        }

        let lab = self.config.lab.clone();
        let script_id = script.id.clone();
        let execution = supervise(self.config.timeout, move || execute(lab, &script)).await?;

        match execution {
            None => {
                let error = Error::timeout(format!(
                    "script '{}' did not finish within {} s",
                    script_id,
                    self.config.timeout.as_secs_f64()
                ));
                warn!(script = %script_id, "run timed out, log discarded");
                Ok(RunOutcome::TimedOut {
                    feedback: error.feedback(),
                })
            }
            Some(Execution::Aborted { error, trace }) => {
                warn!(script = %script_id, error = %error, "run failed, log discarded");
                Ok(failed(error, trace))
            }
            Some(Execution::Finished { log, trace, readings }) => {
                let sink = FileSink::new(&self.config.lab.log_path);
                sink.persist(&log)?;
                info!(script = %script_id, commands = log.len(), path = %sink.location(), "run complete");
                Ok(RunOutcome::Completed(RunReport {
                    commands: log.len(),
                    log_path: sink.path().to_path_buf(),
                    trace,
                    readings,
                }))
            }
        }
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(error: Error, trace: Vec<ExecutionStep>) -> RunOutcome {
    RunOutcome::Failed {
        feedback: error.feedback(),
        step: error.context_value("step").and_then(|s| s.parse().ok()),
        trace,
    }
}

/// Blocking half: the log stays in memory until the async side decides to keep it
fn execute(lab: LabConfig, script: &Script) -> Execution {
    let session = match Session::with_sink(lab, MemorySink::new()) {
        Ok(s) => s,
        Err(error) => {
            return Execution::Aborted {
                error,
                trace: Vec::new(),
            }
        }
    };

    let mut interp = Interpreter::new(session);
    match interp.run(script) {
        Ok(()) => {
            let trace = interp.trace().to_vec();
            let readings = interp.stored_readings().clone();
            Execution::Finished {
                log: interp.into_session().into_log(),
                trace,
                readings,
            }
        }
        Err(error) => Execution::Aborted {
            error,
            trace: interp.trace().to_vec(),
        },
    }
}

/// Run `work` on the blocking pool, giving up after `timeout`.
///
/// `Ok(None)` means the deadline passed. The worker thread is left to
/// finish on its own and its result is dropped.
pub(crate) async fn supervise<T, F>(timeout: Duration, work: F) -> Result<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(value)) => Ok(Some(value)),
        Ok(Err(join)) => Err(Error::unexpected(format!("script worker panicked: {}", join))
            .with_operation("runner::supervise")),
        Err(_) => Ok(None),
    }
}
