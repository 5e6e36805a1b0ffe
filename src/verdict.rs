use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict states a submission moves through while being judged.
///
/// `Queued`, `Compiling` and `Running` are intermediate stages; everything
/// else is terminal. A submission holds exactly one verdict at any instant
/// and only ever advances through stages (see [`Verdict::stage`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    #[default]
    Queued,
    Compiling,
    CompileError,
    Running,
    Accept,
    WrongAnswer,
    OutputLimitExceeded,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    SystemError,
}

impl Verdict {
    /// Pipeline stage ordinal. Verdict transitions never decrease the stage:
    /// QUEUED (0) -> COMPILING (1) -> RUNNING (2) -> terminal (3), with
    /// COMPILE_ERROR jumping straight from stage 1 to stage 3.
    pub fn stage(&self) -> u8 {
        match self {
            Verdict::Queued => 0,
            Verdict::Compiling => 1,
            Verdict::Running => 2,
            _ => 3,
        }
    }

    /// Whether this verdict ends the pipeline for a submission.
    pub fn is_terminal(&self) -> bool {
        self.stage() == 3
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Queued => "QUEUED",
            Verdict::Compiling => "COMPILING",
            Verdict::CompileError => "COMPILE_ERROR",
            Verdict::Running => "RUNNING",
            Verdict::Accept => "ACCEPT",
            Verdict::WrongAnswer => "WRONG_ANSWER",
            Verdict::OutputLimitExceeded => "OUTPUT_LIMIT_EXCEEDED",
            Verdict::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            Verdict::MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
            Verdict::SystemError => "SYSTEM_ERROR",
        };
        write!(f, "{}", s)
    }
}
