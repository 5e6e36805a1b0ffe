//! Submission and test-case data model.

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// A submission dequeued from the status store.
///
/// The verdict field is judge-local state, not part of the wire payload; it
/// starts at QUEUED and is advanced only by the orchestrator.
#[derive(Debug, Serialize, Deserialize)]
pub struct Submission {
    #[serde(rename = "submission_id")]
    pub id: i64,
    pub problem_id: i64,
    pub source: String,
    #[serde(skip)]
    verdict: Verdict,
}

impl Submission {
    pub fn new(id: i64, problem_id: i64, source: impl Into<String>) -> Self {
        Self {
            id,
            problem_id,
            source: source.into(),
            verdict: Verdict::Queued,
        }
    }

    /// The verdict currently held by this submission.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Advance to the next verdict. Verdicts move forward through the
    /// pipeline only; a transition to an earlier stage is a logic error.
    pub fn advance(&mut self, next: Verdict) {
        debug_assert!(
            next.stage() >= self.verdict.stage(),
            "verdict reverted: {} -> {}",
            self.verdict,
            next
        );
        self.verdict = next;
    }
}

/// One reference test case: input fed to the program and the output it is
/// expected to produce. Immutable, consumed in stored order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_submission_starts_queued() {
        let s = Submission::new(1, 7, "int main() {}");
        assert_eq!(s.verdict(), Verdict::Queued);
    }

    #[test]
    fn test_advance_through_pipeline() {
        let mut s = Submission::new(1, 7, "");
        s.advance(Verdict::Compiling);
        s.advance(Verdict::Running);
        s.advance(Verdict::Accept);
        assert_eq!(s.verdict(), Verdict::Accept);
    }

    #[test]
    fn test_accept_may_be_followed_by_failing_case() {
        // Both are stage-3 verdicts: a later test case overwrites an
        // earlier ACCEPT without reverting the stage.
        let mut s = Submission::new(1, 7, "");
        s.advance(Verdict::Compiling);
        s.advance(Verdict::Running);
        s.advance(Verdict::Accept);
        s.advance(Verdict::WrongAnswer);
        assert_eq!(s.verdict(), Verdict::WrongAnswer);
    }

    #[test]
    #[should_panic(expected = "verdict reverted")]
    fn test_advance_rejects_stage_reversal() {
        let mut s = Submission::new(1, 7, "");
        s.advance(Verdict::Running);
        s.advance(Verdict::Compiling);
    }

    #[test]
    fn test_wire_format_field_names() {
        let payload = r#"{"submission_id":42,"problem_id":9,"source":"int main(){}"}"#;
        let s: Submission = serde_json::from_str(payload).unwrap();
        assert_eq!(s.id, 42);
        assert_eq!(s.problem_id, 9);
        assert_eq!(s.verdict(), Verdict::Queued);
    }
}
