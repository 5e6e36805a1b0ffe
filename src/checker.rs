//! Output verifier.
//!
//! Compares the output a submission produced against the expected output of
//! a test case. The captured output is normalized by reconstructing it as a
//! newline-joined sequence of lines, so a missing trailing newline does not
//! fail an otherwise correct answer. The expected output is compared verbatim
//! as stored.

use std::io;
use std::path::Path;

use crate::verdict::Verdict;

/// Slack added on top of twice the expected length before output is
/// classified as runaway. Checked before the equality comparison so that
/// verification time stays bounded by the expected output, not by whatever
/// the submission managed to print.
pub const OUTPUT_LIMIT_OFFSET: usize = 1024;

/// Read the captured output file and classify it against `expected`.
pub async fn verify_file(expected: &str, actual_path: &Path) -> io::Result<Verdict> {
    let raw = tokio::fs::read(actual_path).await?;
    let actual = String::from_utf8_lossy(&raw);
    Ok(verify(expected, &actual))
}

/// Classify a captured output against the expected output of a test case.
pub fn verify(expected: &str, actual: &str) -> Verdict {
    let actual = reconstruct_lines(actual);

    if actual.len() >= 2 * expected.len() + OUTPUT_LIMIT_OFFSET {
        Verdict::OutputLimitExceeded
    } else if actual.len() != expected.len() || actual != expected {
        Verdict::WrongAnswer
    } else {
        Verdict::Accept
    }
}

/// Rebuild the output as lines each terminated by a single `\n`. Normalizes
/// CRLF endings and a missing final newline; interior blank lines survive.
fn reconstruct_lines(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 1);
    for line in raw.lines() {
        out.push_str(line);
        out.push('\n');
    }
    out
}
