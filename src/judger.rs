//! Verdict orchestrator.
//!
//! Drives one submission through the pipeline: compile, then each test case
//! through the execution sandbox and the output verifier, stopping at the
//! first non-accepting verdict. Every verdict transition is published to the
//! status store as it is computed, so progress is externally observable
//! before the final outcome.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::checker;
use crate::compiler;
use crate::config::JudgeConfig;
use crate::errlog::ErrorLog;
use crate::executor::{self, ExecutionStatus};
use crate::launcher::Launcher;
use crate::store::StatusStore;
use crate::submission::Submission;
use crate::verdict::Verdict;

/// Judge one submission whose source is already staged in `work_dir` as
/// `main.cpp`. Returns the final verdict; infrastructure failures are
/// recorded in the error log and collapse to SYSTEM_ERROR.
pub async fn judge_submission<S: StatusStore>(
    launcher: Arc<dyn Launcher>,
    store: &mut S,
    errlog: &ErrorLog,
    config: &JudgeConfig,
    work_dir: &Path,
    submission: &mut Submission,
) -> Verdict {
    publish(store, errlog, submission, Verdict::Compiling).await;

    let compiled = match compiler::compile(launcher.clone(), work_dir, config.compile_budget).await
    {
        Ok(result) => result,
        Err(e) => {
            errlog.append(
                &format!("compile launch failed for submission {}", submission.id),
                &e,
            );
            publish(store, errlog, submission, Verdict::SystemError).await;
            return Verdict::SystemError;
        }
    };

    if !compiled.success {
        info!(
            "compilation failed: submission_id={}, diagnostics={}",
            submission.id,
            compiled.message.as_deref().unwrap_or("<none>")
        );
        publish(store, errlog, submission, Verdict::CompileError).await;
        return Verdict::CompileError;
    }

    publish(store, errlog, submission, Verdict::Running).await;

    let cases = match store.fetch_test_cases(submission.problem_id).await {
        Ok(cases) => cases,
        Err(e) => {
            errlog.append(
                &format!(
                    "failed to fetch test cases for problem {}",
                    submission.problem_id
                ),
                &e,
            );
            publish(store, errlog, submission, Verdict::SystemError).await;
            return Verdict::SystemError;
        }
    };

    let total = cases.len();
    for (index, case) in cases.iter().enumerate() {
        let execution = match executor::run_case(
            launcher.clone(),
            work_dir,
            &case.input,
            config.run_budget,
        )
        .await
        {
            Ok(execution) => execution,
            Err(e) => {
                errlog.append(
                    &format!("run launch failed for submission {}", submission.id),
                    &e,
                );
                publish(store, errlog, submission, Verdict::SystemError).await;
                return Verdict::SystemError;
            }
        };

        let verdict = match execution.status {
            ExecutionStatus::TimeLimitExceeded => Verdict::TimeLimitExceeded,
            ExecutionStatus::MemoryLimitExceeded => Verdict::MemoryLimitExceeded,
            // Normal exits and leftover signals alike are judged by what the
            // program managed to print.
            ExecutionStatus::Exited(_) | ExecutionStatus::Signaled(_) => {
                match checker::verify_file(&case.output, &work_dir.join(executor::OUTPUT_FILE))
                    .await
                {
                    Ok(verdict) => verdict,
                    Err(e) => {
                        errlog.append(
                            &format!(
                                "failed to read captured output for submission {}",
                                submission.id
                            ),
                            &e,
                        );
                        publish(store, errlog, submission, Verdict::SystemError).await;
                        return Verdict::SystemError;
                    }
                }
            }
        };

        info!(
            "test case {}/{}: submission_id={}, verdict={}, time_ms={}, memory_kb={}",
            index + 1,
            total,
            submission.id,
            verdict,
            execution.time_ms,
            execution.memory_kb
        );

        publish(store, errlog, submission, verdict).await;

        if verdict != Verdict::Accept {
            return verdict;
        }
    }

    if total == 0 {
        // A problem without test cases accepts everything that compiles.
        publish(store, errlog, submission, Verdict::Accept).await;
    }

    Verdict::Accept
}

/// Advance the submission and push the transition to the status store.
/// Publishing is best-effort: a failed write is recorded for reconciliation
/// and judging continues.
async fn publish<S: StatusStore>(
    store: &mut S,
    errlog: &ErrorLog,
    submission: &mut Submission,
    verdict: Verdict,
) {
    submission.advance(verdict);
    if let Err(e) = store.publish_verdict(submission.id, verdict).await {
        warn!(
            "verdict write failed: submission_id={}, verdict={}, error={}",
            submission.id, verdict, e
        );
        errlog.append(
            &format!(
                "verdict write failed for submission {} ({})",
                submission.id, verdict
            ),
            e,
        );
    }
}
