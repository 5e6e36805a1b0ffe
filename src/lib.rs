//! Arbiter judge worker: compiles a submitted C++ program, runs it against
//! the problem's test cases under CPU/memory/output ceilings, and records
//! the resulting verdicts in the status store.

pub mod checker;
pub mod compiler;
pub mod config;
pub mod errlog;
pub mod executor;
pub mod judger;
pub mod launcher;
pub mod store;
pub mod submission;
pub mod verdict;

pub use config::JudgeConfig;
pub use launcher::{Launcher, ResourceBudget, RlimitLauncher};
pub use submission::{Submission, TestCase};
pub use verdict::Verdict;
