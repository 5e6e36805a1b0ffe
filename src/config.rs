//! Judge configuration.
//!
//! Built once in `main` from the environment and passed by reference into
//! every component that needs it; nothing in the judge reads connection
//! details from ambient global state.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::launcher::ResourceBudget;

pub const MB: u64 = 1 << 20;

const DEFAULT_CPU_SECONDS: u64 = 6;
const DEFAULT_MEMORY_MB: u64 = 128;
const DEFAULT_OUTPUT_LIMIT_MB: u64 = 10;

/// Where the status store lives: connection URL plus the key namespace all
/// of this judge's keys are scoped under.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub namespace: String,
}

/// Full configuration for one judge worker.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub store: StoreConfig,
    /// Ceilings for the compiler invocation.
    pub compile_budget: ResourceBudget,
    /// Ceilings for each test-case run.
    pub run_budget: ResourceBudget,
    /// Durable log for infrastructure failures.
    pub error_log: PathBuf,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        let budget = ResourceBudget {
            cpu_seconds: DEFAULT_CPU_SECONDS,
            memory_bytes: DEFAULT_MEMORY_MB * MB,
            file_size_bytes: DEFAULT_OUTPUT_LIMIT_MB * MB,
        };
        Self {
            store: StoreConfig {
                url: "redis://localhost:6379".into(),
                namespace: "judge".into(),
            },
            compile_budget: budget,
            run_budget: budget,
            error_log: "system_error.log".into(),
        }
    }
}

impl JudgeConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let compile_budget = ResourceBudget {
            cpu_seconds: env_u64("COMPILE_CPU_SECONDS", DEFAULT_CPU_SECONDS)?,
            memory_bytes: env_u64("COMPILE_MEMORY_MB", DEFAULT_MEMORY_MB)? * MB,
            file_size_bytes: env_u64("OUTPUT_LIMIT_MB", DEFAULT_OUTPUT_LIMIT_MB)? * MB,
        };
        let run_budget = ResourceBudget {
            cpu_seconds: env_u64("RUN_CPU_SECONDS", DEFAULT_CPU_SECONDS)?,
            memory_bytes: env_u64("RUN_MEMORY_MB", DEFAULT_MEMORY_MB)? * MB,
            file_size_bytes: env_u64("OUTPUT_LIMIT_MB", DEFAULT_OUTPUT_LIMIT_MB)? * MB,
        };

        Ok(Self {
            store: StoreConfig {
                url: env::var("REDIS_URL").unwrap_or(defaults.store.url),
                namespace: env::var("STORE_NAMESPACE").unwrap_or(defaults.store.namespace),
            },
            compile_budget,
            run_budget,
            error_log: env::var("ERROR_LOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.error_log),
        })
    }
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}
