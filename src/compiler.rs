//! Compiler invoker.
//!
//! Builds the submitted source into an executable by running the external
//! C++ toolchain through the resource-limited launcher. Diagnostics go to a
//! compile log in the working directory; a compiler killed by its own
//! resource ceiling is a compile failure like any other nonzero exit, never
//! an infrastructure error.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::launcher::{
    CommandSpec, ExitOutcome, LaunchError, Launcher, ProcessStatus, ResourceBudget, StreamSpec,
};

/// Fixed relative file names inside a submission's working directory.
pub const SOURCE_FILE: &str = "main.cpp";
pub const EXECUTABLE_FILE: &str = "main";
pub const COMPILE_LOG_FILE: &str = "compile.log";

const COMPILER: &str = "g++";
const COMPILE_ARGS: [&str; 8] = [
    "-Wall",
    "-fno-asm",
    "-lm",
    "--static",
    "-std=c++11",
    SOURCE_FILE,
    "-o",
    EXECUTABLE_FILE,
];

/// Result of a compilation attempt.
#[derive(Debug)]
pub struct CompileResult {
    pub success: bool,
    pub message: Option<String>,
}

/// Compile `main.cpp` in `work_dir` into `main` under the compile budget.
///
/// A launcher failure (the compiler could not be spawned at all) is returned
/// as an error and maps to SYSTEM_ERROR upstream; every other outcome is a
/// regular [`CompileResult`].
pub async fn compile(
    launcher: Arc<dyn Launcher>,
    work_dir: &Path,
    budget: ResourceBudget,
) -> Result<CompileResult, LaunchError> {
    debug!("compiling with {} {:?}", COMPILER, COMPILE_ARGS);

    let cmd = CommandSpec::new(COMPILER)
        .with_args(COMPILE_ARGS)
        .with_work_dir(work_dir);
    let streams = StreamSpec::new().with_stderr(work_dir.join(COMPILE_LOG_FILE));

    let outcome =
        tokio::task::spawn_blocking(move || launcher.launch(&cmd, &streams, budget))
            .await
            .expect("compile task panicked")?;

    if matches!(outcome.status, ProcessStatus::Exited(0)) {
        return Ok(CompileResult {
            success: true,
            message: None,
        });
    }

    let log = tokio::fs::read(work_dir.join(COMPILE_LOG_FILE))
        .await
        .map(|raw| String::from_utf8_lossy(&raw).into_owned())
        .unwrap_or_default();

    Ok(CompileResult {
        success: false,
        message: Some(failure_message(&outcome, log)),
    })
}

/// Prefer the compiler's own diagnostics; fall back to a description of how
/// it died (a ceiling kill during compilation leaves an empty log).
fn failure_message(outcome: &ExitOutcome, log: String) -> String {
    if !log.trim().is_empty() {
        return log;
    }
    match outcome.status {
        ProcessStatus::Exited(code) => format!("compiler exited with status {}", code),
        ProcessStatus::Signaled(sig) => format!("compiler killed by signal {}", sig),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: ProcessStatus) -> ExitOutcome {
        ExitOutcome {
            status,
            cpu_time_ms: 100,
            max_rss_kb: 20_000,
        }
    }

    #[test]
    fn test_failure_message_prefers_compile_log() {
        let msg = failure_message(
            &outcome(ProcessStatus::Exited(1)),
            "main.cpp:3: error: expected ';'".into(),
        );
        assert!(msg.contains("expected ';'"));
    }

    #[test]
    fn test_failure_message_falls_back_to_exit_status() {
        let msg = failure_message(&outcome(ProcessStatus::Exited(1)), String::new());
        assert_eq!(msg, "compiler exited with status 1");
    }

    #[test]
    fn test_failure_message_reports_ceiling_kill() {
        let msg = failure_message(&outcome(ProcessStatus::Signaled(libc::SIGXCPU)), String::new());
        assert_eq!(msg, format!("compiler killed by signal {}", libc::SIGXCPU));
    }
}
