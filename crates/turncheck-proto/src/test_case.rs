//! Test cases and batch run requests.

use crate::step::Step;
use serde::{Deserialize, Serialize};

/// A scripted conversation: the steps a test writer expects to happen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Test case identifier.
    #[serde(rename = "_id")]
    pub id: String,

    /// Language tag the utterances are delivered with.
    pub language: String,

    /// Expected steps, in conversation order.
    pub steps: Vec<Step>,
}

impl TestCase {
    pub fn new(id: impl Into<String>, language: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            language: language.into(),
            steps,
        }
    }

    /// Number of user utterances that will be delivered to the runtime.
    pub fn user_turns(&self) -> usize {
        self.steps.iter().filter(|step| step.is_user()).count()
    }
}

/// A batch of test cases submitted for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub test_cases: Vec<TestCase>,
    pub project_id: String,
}
