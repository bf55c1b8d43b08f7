//! Display functions for terminal output.
//!
//! Renders test results as a line-per-step diff: matched steps are indented,
//! surplus steps the runtime produced are marked `+`, scripted steps that
//! never happened are marked `-`.

use std::time::Duration;
use turncheck_core::AlignmentSummary;
use turncheck_proto::{DiffStep, TestResult, Theme};

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
}

/// Longest step description printed before truncation.
const MAX_STEP_WIDTH: usize = 100;

/// Formats elapsed duration as human-readable string.
pub fn format_elapsed(d: Duration) -> String {
    let total_secs = d.as_secs();
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Truncates a string to max_len characters, adding ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Formats one diff step as a single report line.
pub fn format_step_line(step: &DiffStep, use_colors: bool) -> String {
    use colors::*;

    let text = truncate(&step.step.to_string(), MAX_STEP_WIDTH);
    let (marker, color) = match step.theme {
        None => (" ", DIM),
        Some(Theme::Actual) => ("+", YELLOW),
        Some(Theme::Expected) => ("-", RED),
    };

    if use_colors {
        format!("  {color}{marker} {text}{RESET}")
    } else {
        format!("  {marker} {text}")
    }
}

/// Formats the report block for one test result.
pub fn format_result(result: &TestResult, use_colors: bool) -> Vec<String> {
    use colors::*;

    let summary = AlignmentSummary::of(&result.test_results);
    let (color, label) = if result.success {
        (GREEN, "PASS")
    } else {
        (RED, "FAIL")
    };
    let counts = format!(
        "{} matched, {} unexpected, {} missing",
        summary.matched, summary.unexpected, summary.missing
    );

    let mut lines = Vec::with_capacity(result.test_results.len() + 1);
    if use_colors {
        lines.push(format!(
            "{BOLD}{color}{label}{RESET} {BOLD}{}{RESET} {DIM}({counts}){RESET}",
            result.id
        ));
    } else {
        lines.push(format!("{label} {} ({counts})", result.id));
    }

    // Passing cases are summarized by their header alone
    if !result.success {
        lines.extend(
            result
                .test_results
                .iter()
                .map(|step| format_step_line(step, use_colors)),
        );
    }
    lines
}

/// Prints every test result followed by a summary line.
pub fn print_report(results: &[TestResult], elapsed: Duration, use_colors: bool) {
    use colors::*;

    for result in results {
        for line in format_result(result, use_colors) {
            println!("{line}");
        }
    }

    let passed = results.iter().filter(|result| result.success).count();
    let failed = results.len() - passed;
    let separator = "-".repeat(58);
    let elapsed = format_elapsed(elapsed);

    if use_colors {
        let color = if failed == 0 { GREEN } else { RED };
        println!("{BOLD}{separator}{RESET}");
        println!(
            "{color}{BOLD}{passed} passed{RESET}, {color}{BOLD}{failed} failed{RESET} in {elapsed}"
        );
    } else {
        println!("{separator}");
        println!("{passed} passed, {failed} failed in {elapsed}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turncheck_proto::{Step, UserStep};

    fn failing_result() -> TestResult {
        TestResult {
            id: "tc-1".to_string(),
            project_id: "bf".to_string(),
            success: false,
            test_results: vec![
                DiffStep::matched(UserStep::new("hi").with_intent("greet").into()),
                DiffStep::actual(Step::action("utter_x")),
                DiffStep::expected(Step::action("utter_greet")),
            ],
        }
    }

    #[test]
    fn test_format_elapsed_seconds_only() {
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.5s");
    }

    #[test]
    fn test_format_elapsed_minutes_and_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_does_not_panic_on_multibyte_chars() {
        let s = "こんにちは世界、元気ですか";
        let truncated = truncate(s, 6);
        assert_eq!(truncated, "こんに...");
    }

    #[test]
    fn test_format_failing_result_lists_steps() {
        let lines = format_result(&failing_result(), false);
        assert_eq!(
            lines,
            vec![
                "FAIL tc-1 (1 matched, 1 unexpected, 1 missing)".to_string(),
                r#"    user: "hi" (greet)"#.to_string(),
                "  + action: utter_x".to_string(),
                "  - action: utter_greet".to_string(),
            ]
        );
    }

    #[test]
    fn test_format_passing_result_header_only() {
        let result = TestResult {
            id: "ok".to_string(),
            project_id: "bf".to_string(),
            success: true,
            test_results: vec![DiffStep::matched(Step::action("utter_greet"))],
        };
        let lines = format_result(&result, false);
        assert_eq!(lines, vec!["PASS ok (1 matched, 0 unexpected, 0 missing)".to_string()]);
    }

    #[test]
    fn test_colored_line_resets() {
        let line = format_step_line(&DiffStep::expected(Step::action("utter_a")), true);
        assert!(line.contains(colors::RED));
        assert!(line.ends_with(colors::RESET));
    }
}
