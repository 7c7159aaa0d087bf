//! Test-runner output signatures.
//!
//! Covers the summary lines of the common runners (mocha, jest, pytest,
//! cargo, minitest/rspec-style "N tests, M failures").

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).unwrap())
        .collect()
}

// Evidence that tests ran and some failed.
static RED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"\b\d+ tests?, [1-9]\d* failures?",
        r"\bFAIL\b.*\btest",
        r"AssertionError",
        r"expected .* to (?:equal|be|deep equal)",
        r"\btest suites? failed to run\b",
        r"\b[1-9]\d* (?:failing|failed)\b",
        r"✖ \d+ tests? failed",
        r"test result: FAILED",
    ])
});

// Evidence that tests ran and passed.
static GREEN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"\b\d+ tests?, 0 failures?",
        r"all tests passed",
        r"\bPASS\b.*\btest",
        r"\b\d+ (?:passing|passed)\b",
        r"✓ \d+ tests? passed",
        r"test result: ok",
    ])
});

// A nonzero failure count anywhere vetoes green.
static FAILURE_COUNT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"\b[1-9]\d* (?:failing|failures?|failed|errors?)\b",
        r"✖ [1-9]\d* tests? failed",
        r"test result: FAILED",
    ])
});

/// Coarse reading of a test run's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Red,
    Green,
    Unknown,
}

fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}

/// True when `output` reports a nonzero failure count.
pub fn has_failures(output: &str) -> bool {
    any_match(&FAILURE_COUNT_PATTERNS, output)
}

/// Failing tests observed. A clean passing summary is never red.
pub fn is_red(output: &str) -> bool {
    !is_green(output) && any_match(&RED_PATTERNS, output)
}

/// Passing tests observed and no failures reported.
pub fn is_green(output: &str) -> bool {
    !has_failures(output) && any_match(&GREEN_PATTERNS, output)
}

pub fn classify(output: &str) -> TestOutcome {
    if is_green(output) {
        TestOutcome::Green
    } else if is_red(output) || has_failures(output) {
        TestOutcome::Red
    } else {
        TestOutcome::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_red_signatures() {
        for output in [
            "5 tests, 5 failures",
            "FAIL src/app.test.js",
            "AssertionError: expected 200 to equal 404",
            "expected 'hello' to equal 'world'",
            "Test suite failed to run",
            "  3 failing",
            "✖ 2 tests failed",
            "===== 2 failed, 1 passed in 0.12s =====",
            "test result: FAILED. 1 passed; 2 failed",
        ] {
            assert!(is_red(output), "{}", output);
        }
    }

    #[test]
    fn test_red_ignores_zero_failure_summaries() {
        assert!(!is_red("10 tests, 0 failures"));
        assert!(!is_red("10 passing"));
        assert!(!is_red("test result: ok. 14 passed; 0 failed; 0 ignored; 0 measured"));
        assert!(!is_red("Tests: 12 passed, 0 failed, 12 total"));
    }

    #[test]
    fn test_green_signatures() {
        for output in [
            "10 tests, 0 failures",
            "All tests passed!",
            "PASS  test/hello.test.js",
            "  10 passing (42ms)",
            "✓ 12 tests passed",
            "===== 7 passed in 0.30s =====",
            "test result: ok. 14 passed; 0 failed; 0 ignored",
        ] {
            assert!(is_green(output), "{}", output);
        }
    }

    #[test]
    fn test_failure_count_vetoes_green() {
        for output in [
            "8 passing, 2 failing",
            "10 tests, 1 failure",
            "===== 1 failed, 9 passed =====",
            "PASS test/a.test.js\nFAIL test/b.test.js\nTests: 1 failed, 3 passed",
            "6 passed, 1 error",
        ] {
            assert!(!is_green(output), "{}", output);
            assert_eq!(classify(output), TestOutcome::Red, "{}", output);
        }
    }

    #[test]
    fn test_zero_counts_are_not_failures() {
        assert!(!has_failures("14 passed; 0 failed; 0 ignored"));
        assert!(!has_failures("10 tests, 0 failures"));
        assert!(has_failures("10 tests, 10 failures"));
    }

    #[test]
    fn test_unrelated_output_is_unknown() {
        assert_eq!(classify("Compiling hello v0.1.0"), TestOutcome::Unknown);
        assert_eq!(classify(""), TestOutcome::Unknown);
    }
}
