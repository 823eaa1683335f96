//! Decides whether a checker result reflects a complete type check.
//!
//! The daemon can hang, crash or hand back stale output. A result is only
//! trusted when its exit code, stderr and stdout all look like a checker
//! that ran to the end:
//!
//! - exit code 0 (clean) or 1 (issues found)
//! - nothing on stderr
//! - stdout is exactly the success line, or ends with the summary footer

use std::sync::OnceLock;

use regex::Regex;

use crate::process::ProcessResult;

/// Whole stdout of a clean run.
const SUCCESS_PATTERN: &str = r"\ASuccess: no issues found in [0-9]+ source files?\n\z";

/// Last line of a run that reported diagnostics.
const FOOTER_PATTERN: &str =
    r"\nFound [0-9]+ errors? in [0-9]+ files? \(checked [0-9]+ source files\)\n\z";

fn success_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SUCCESS_PATTERN).expect("success pattern is valid"))
}

fn footer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FOOTER_PATTERN).expect("footer pattern is valid"))
}

/// Returns true if `result` looks like a finished, uncorrupted type check.
pub fn is_trustworthy(result: &ProcessResult) -> bool {
    if !matches!(result.exit_code, 0 | 1) {
        return false;
    }
    if !result.stderr.is_empty() {
        return false;
    }
    success_re().is_match(&result.stdout) || footer_re().is_match(&result.stdout)
}
