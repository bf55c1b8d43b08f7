//! Diff annotations and per-test-case verdicts.

use crate::step::Step;
use serde::{Deserialize, Serialize};

/// Marks a result step as a mismatch.
///
/// A step without a theme was part of a confirmed match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    /// Produced by the runtime but not scripted.
    Actual,
    /// Scripted but never produced.
    Expected,
}

/// A step in an alignment result.
///
/// Serializes as the step's own wire shape plus an optional `theme` key:
/// `{"action": "utter_a", "theme": "expected"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffStep {
    #[serde(flatten)]
    pub step: Step,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl DiffStep {
    /// A step that matched its scripted counterpart.
    pub fn matched(step: Step) -> Self {
        Self { step, theme: None }
    }

    /// A step the runtime produced that was not scripted.
    pub fn actual(step: Step) -> Self {
        Self {
            step,
            theme: Some(Theme::Actual),
        }
    }

    /// A scripted step the runtime never produced.
    pub fn expected(step: Step) -> Self {
        Self {
            step,
            theme: Some(Theme::Expected),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.theme.is_none()
    }
}

/// Verdict for one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Identifier of the test case this result belongs to.
    #[serde(rename = "_id")]
    pub id: String,

    pub project_id: String,

    /// True iff no step in `test_results` carries a theme.
    pub success: bool,

    /// Annotated alignment of actual against expected steps.
    pub test_results: Vec<DiffStep>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::UserStep;
    use serde_json::json;

    #[test]
    fn test_diff_step_wire_shape() {
        let themed = DiffStep::expected(Step::action("utter_a"));
        assert_eq!(
            serde_json::to_value(&themed).unwrap(),
            json!({"action": "utter_a", "theme": "expected"})
        );

        let matched = DiffStep::matched(UserStep::new("hi").with_intent("greet").into());
        assert_eq!(
            serde_json::to_value(&matched).unwrap(),
            json!({"user": "hi", "intent": "greet", "entities": []})
        );
    }

    #[test]
    fn test_diff_step_parses_theme() {
        let step: DiffStep =
            serde_json::from_str(r#"{"user": "hi", "entities": [], "theme": "actual"}"#).unwrap();
        assert_eq!(step, DiffStep::actual(Step::user("hi")));
        assert!(!step.is_matched());
    }

    #[test]
    fn test_test_result_wire_keys() {
        let result = TestResult {
            id: "tc-1".to_string(),
            project_id: "bf".to_string(),
            success: false,
            test_results: vec![
                DiffStep::actual(Step::action("utter_x")),
                DiffStep::matched(Step::action("utter_a")),
                DiffStep::expected(Step::action("utter_b")),
            ],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["_id"], "tc-1");
        assert_eq!(value["projectId"], "bf");
        assert_eq!(value["success"], false);
        assert_eq!(value["testResults"][0]["theme"], "actual");
        assert!(value["testResults"][1].get("theme").is_none());
    }
}
