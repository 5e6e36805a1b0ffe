//! Execution sandbox.
//!
//! Runs the compiled submission once per test case: stages the test input
//! into the working directory, launches the executable with its streams
//! bound to the fixed input/output/error files, and classifies the raw exit
//! outcome into an execution status.
//!
//! The resource ceilings are also the enforcement mechanism: a kill by
//! SIGXCPU or SIGALRM is how a time limit manifests, and an address-space
//! kill is how a memory limit manifests.

use std::path::Path;
use std::sync::Arc;

use nix::sys::signal::Signal;
use tracing::debug;

use crate::compiler::EXECUTABLE_FILE;
use crate::launcher::{
    CommandSpec, ExitOutcome, LaunchError, Launcher, ProcessStatus, ResourceBudget, StreamSpec,
};

/// Fixed relative file names for one test-case run.
pub const INPUT_FILE: &str = "data.in";
pub const OUTPUT_FILE: &str = "user.out";
pub const ERROR_FILE: &str = "err.out";

/// Classified outcome of running the submission on one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Program exited normally with the given exit code.
    Exited(i32),
    /// CPU/alarm ceiling kill, or measured CPU time at or above the budget.
    TimeLimitExceeded,
    /// Peak RSS at or above the budget, or an address-space kill observed
    /// through the allocator before RSS could reach the ceiling.
    MemoryLimitExceeded,
    /// Killed by some other signal (crash, SIGXFSZ on runaway output).
    Signaled(i32),
}

/// Outcome of one sandboxed run.
#[derive(Debug)]
pub struct Execution {
    pub status: ExecutionStatus,
    /// CPU time used in milliseconds.
    pub time_ms: u64,
    /// Peak memory used in kilobytes.
    pub memory_kb: u64,
}

/// Run the compiled executable against one test case's input.
///
/// Stages `input` into `data.in`, binds stdin to it and stdout/stderr to
/// `user.out`/`err.out`, and blocks until the child terminates. A launcher
/// failure is infrastructure trouble for the caller, distinct from any
/// verdict about the submission.
pub async fn run_case(
    launcher: Arc<dyn Launcher>,
    work_dir: &Path,
    input: &str,
    budget: ResourceBudget,
) -> Result<Execution, LaunchError> {
    tokio::fs::write(work_dir.join(INPUT_FILE), input)
        .await
        .map_err(|source| LaunchError::Redirect {
            path: work_dir.join(INPUT_FILE),
            source,
        })?;

    let cmd = CommandSpec::new(work_dir.join(EXECUTABLE_FILE).to_string_lossy())
        .with_work_dir(work_dir);
    let streams = StreamSpec::new()
        .with_stdin(work_dir.join(INPUT_FILE))
        .with_stdout(work_dir.join(OUTPUT_FILE))
        .with_stderr(work_dir.join(ERROR_FILE));

    let outcome =
        tokio::task::spawn_blocking(move || launcher.launch(&cmd, &streams, budget))
            .await
            .expect("execution task panicked")?;

    debug!(
        "run finished: status={:?}, cpu_time_ms={}, max_rss_kb={}",
        outcome.status, outcome.cpu_time_ms, outcome.max_rss_kb
    );

    let stderr = tokio::fs::read(work_dir.join(ERROR_FILE))
        .await
        .map(|raw| String::from_utf8_lossy(&raw).into_owned())
        .unwrap_or_default();

    Ok(Execution {
        status: classify(&outcome, &budget, &stderr),
        time_ms: outcome.cpu_time_ms,
        memory_kb: outcome.max_rss_kb,
    })
}

/// Map a raw exit outcome onto an execution status under `budget`.
fn classify(outcome: &ExitOutcome, budget: &ResourceBudget, stderr: &str) -> ExecutionStatus {
    if let ProcessStatus::Signaled(sig) = outcome.status {
        if matches!(
            Signal::try_from(sig),
            Ok(Signal::SIGXCPU) | Ok(Signal::SIGALRM)
        ) {
            return ExecutionStatus::TimeLimitExceeded;
        }
    }
    if outcome.cpu_time_ms >= budget.cpu_millis() {
        return ExecutionStatus::TimeLimitExceeded;
    }
    if outcome.max_rss_kb * 1024 >= budget.memory_bytes {
        return ExecutionStatus::MemoryLimitExceeded;
    }
    // An RLIMIT_AS kill can strike before resident memory reaches the
    // ceiling; the allocator's failure message is the reliable tell.
    if stderr.contains("bad_alloc") {
        return ExecutionStatus::MemoryLimitExceeded;
    }
    match outcome.status {
        ProcessStatus::Exited(code) => ExecutionStatus::Exited(code),
        ProcessStatus::Signaled(sig) => ExecutionStatus::Signaled(sig),
    }
}
