//! Closure-eligibility analysis of agent summaries.
//!
//! A pure, ordered classifier: given the free-text summary and the test
//! signal, produce the list of reasons closure must be withheld. The grammar
//! is fixed and documented here rather than scattered through control flow:
//!
//! 1. `tests_passed == false` → blocker `"tests did not pass"`.
//! 2. The `⚠️ REQUIRES ACTION:` marker → the text that follows it, up to the
//!    next blank line.
//! 3. "test … fail" within one clause, case-insensitive, suppressed when
//!    rule 1 already covers it.
//! 4. The first of the blocked / manual-needed / follow-up-needed /
//!    pending-resolution patterns, reported once with ~50 characters of
//!    surrounding context so overlapping patterns do not stack noise.

use std::sync::LazyLock;

use regex::Regex;

const CONTEXT_RADIUS: usize = 50;

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)⚠️ REQUIRES ACTION:(.*?)(?:\n\n|\z)").expect("action regex")
});

static TEST_FAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btest[^.!?\n]*fail").expect("test-fail regex"));

static BLOCKER_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bblocked\b",
        r"(?i)\bmanual\b.*\b(?:required|needed)\b",
        r"(?i)\bfollow-?up\b.*\b(?:required|needed)\b",
        r"(?i)\bpending\b.*\bresolution\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("blocker regex"))
    .collect()
});

/// Outcome of closure analysis for one summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureEvaluation {
    /// True iff no blockers were found.
    pub eligible: bool,
    /// Blockers in evaluation order.
    pub blockers: Vec<String>,
}

/// Classify a summary. Deterministic: same inputs, same blockers.
pub fn evaluate_closure(summary: &str, tests_passed: bool) -> ClosureEvaluation {
    let mut blockers = Vec::new();

    if !tests_passed {
        blockers.push("tests did not pass".to_string());
    }

    if let Some(caps) = ACTION_RE.captures(summary) {
        let items = caps[1].trim();
        blockers.push(format!("Action required: {items}"));
    }

    // Only flag a textual test-failure mention when the explicit signal has
    // not already produced a blocker for the same condition.
    if tests_passed && TEST_FAIL_RE.is_match(summary) {
        blockers.push("Test failures mentioned in summary".to_string());
    }

    for pattern in BLOCKER_RES.iter() {
        if let Some(found) = pattern.find(summary) {
            let context = context_window(summary, found.start(), found.end());
            blockers.push(format!("Potential blocker found: ...{context}..."));
            break;
        }
    }

    ClosureEvaluation {
        eligible: blockers.is_empty(),
        blockers,
    }
}

/// Slice ~[`CONTEXT_RADIUS`] bytes around a match, snapped to char
/// boundaries so multi-byte text cannot split.
fn context_window(text: &str, start: usize, end: usize) -> &str {
    let mut from = start.saturating_sub(CONTEXT_RADIUS);
    while !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + CONTEXT_RADIUS).min(text.len());
    while !text.is_char_boundary(to) {
        to += 1;
    }
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_summary_is_eligible() {
        let eval = evaluate_closure("All tests pass. No further action needed.", true);
        assert!(eval.eligible);
        assert!(eval.blockers.is_empty());
    }

    #[test]
    fn failed_tests_yield_exactly_one_blocker() {
        let eval = evaluate_closure("Implemented the feature cleanly.", false);
        assert!(!eval.eligible);
        assert_eq!(eval.blockers, vec!["tests did not pass".to_string()]);
    }

    #[test]
    fn action_marker_extracts_following_text() {
        let summary = "Done.\n\n⚠️ REQUIRES ACTION: rotate the API key\nand redeploy\n\nUnrelated trailer.";
        let eval = evaluate_closure(summary, true);
        assert!(!eval.eligible);
        assert_eq!(eval.blockers.len(), 1);
        assert!(eval.blockers[0].contains("rotate the API key"));
        assert!(eval.blockers[0].contains("and redeploy"));
        assert!(!eval.blockers[0].contains("Unrelated trailer"));
    }

    #[test]
    fn action_marker_runs_to_end_without_blank_line() {
        let eval = evaluate_closure("⚠️ REQUIRES ACTION: rotate the API key", true);
        assert_eq!(eval.blockers, vec!["Action required: rotate the API key".to_string()]);
    }

    #[test]
    fn test_failure_mention_is_a_blocker() {
        let eval = evaluate_closure("Two unit tests fail on CI.", true);
        assert_eq!(
            eval.blockers,
            vec!["Test failures mentioned in summary".to_string()]
        );
    }

    #[test]
    fn test_failure_mention_is_suppressed_by_explicit_signal() {
        let eval = evaluate_closure("Two unit tests fail on CI.", false);
        assert_eq!(eval.blockers, vec!["tests did not pass".to_string()]);
    }

    #[test]
    fn mention_must_stay_within_one_clause() {
        // "test" and "fail" in separate sentences is not a failure report.
        let eval = evaluate_closure("Added a test. Nothing can fail now.", true);
        assert!(eval.eligible);
    }

    #[test]
    fn only_first_blocker_pattern_is_reported() {
        let summary = "Work is blocked; manual migration needed before merge.";
        let eval = evaluate_closure(summary, true);
        assert_eq!(eval.blockers.len(), 1);
        assert!(eval.blockers[0].contains("blocked"));
    }

    #[test]
    fn blocker_carries_surrounding_context() {
        let pad = "x".repeat(80);
        let summary = format!("{pad} deployment is blocked on infra {pad}");
        let eval = evaluate_closure(&summary, true);
        assert_eq!(eval.blockers.len(), 1);
        assert!(eval.blockers[0].contains("deployment is blocked on infra"));
        // Context window keeps the blocker line readable, not the whole text.
        assert!(eval.blockers[0].len() < summary.len());
    }

    #[test]
    fn context_window_respects_char_boundaries() {
        let summary = format!("{} blocked {}", "é".repeat(40), "é".repeat(40));
        let eval = evaluate_closure(&summary, true);
        assert_eq!(eval.blockers.len(), 1);
    }

    #[test]
    fn blockers_preserve_evaluation_order() {
        let summary = "⚠️ REQUIRES ACTION: fix config\n\nAlso blocked on review.";
        let eval = evaluate_closure(summary, false);
        assert_eq!(eval.blockers.len(), 3);
        assert_eq!(eval.blockers[0], "tests did not pass");
        assert!(eval.blockers[1].starts_with("Action required:"));
        assert!(eval.blockers[2].starts_with("Potential blocker found:"));
    }
}
