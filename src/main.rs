use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use arbiter_judge::compiler::SOURCE_FILE;
use arbiter_judge::errlog::ErrorLog;
use arbiter_judge::judger::judge_submission;
use arbiter_judge::launcher::{Launcher, RlimitLauncher};
use arbiter_judge::store::{RedisStore, StatusStore};
use arbiter_judge::{JudgeConfig, Verdict};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("arbiter_judge=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = JudgeConfig::from_env()?;
    let errlog = ErrorLog::new(&config.error_log);
    let launcher: Arc<dyn Launcher> = Arc::new(RlimitLauncher);

    let mut store = RedisStore::connect(&config.store)
        .await
        .context("failed to reach the status store")?;

    info!("judge worker ready, waiting for submissions");

    loop {
        let mut submission = store.next_submission().await?;
        info!(
            "received submission: submission_id={}, problem_id={}",
            submission.id, submission.problem_id
        );

        // Every submission judges inside its own scratch directory, so the
        // fixed relative file names cannot race across workers.
        let work_dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                errlog.append(
                    &format!(
                        "failed to create working directory for submission {}",
                        submission.id
                    ),
                    &e,
                );
                let _ = store
                    .publish_verdict(submission.id, Verdict::SystemError)
                    .await;
                continue;
            }
        };

        if let Err(e) =
            tokio::fs::write(work_dir.path().join(SOURCE_FILE), &submission.source).await
        {
            errlog.append(
                &format!("failed to stage source for submission {}", submission.id),
                &e,
            );
            let _ = store
                .publish_verdict(submission.id, Verdict::SystemError)
                .await;
            continue;
        }

        let verdict = judge_submission(
            launcher.clone(),
            &mut store,
            &errlog,
            &config,
            work_dir.path(),
            &mut submission,
        )
        .await;

        if verdict == Verdict::SystemError {
            error!(
                "judging hit an infrastructure failure: submission_id={}",
                submission.id
            );
        }
        info!(
            "submission judged: submission_id={}, verdict={}",
            submission.id, verdict
        );
    }
}
