//! Runs batches of test cases against a conversational runtime.
//!
//! Test cases run one after another: each gets its own conversation session,
//! its user turns are simulated, and what the runtime produced is aligned
//! against the scripted steps. Every test case yields exactly one
//! [`TestResult`], whatever happened to its deliveries.

use crate::align::{AlignmentSummary, align, check_success};
use crate::config::SimulationConfig;
use crate::simulate::{ConversationRuntime, SessionIds, Simulator};
use std::time::Duration;
use tracing::{Instrument, info, info_span};
use turncheck_proto::{RunRequest, TestCase, TestResult};

/// Runs test cases through a [`Simulator`] and aligns the outcome.
pub struct TestCaseRunner<'a, R: ConversationRuntime + ?Sized> {
    simulator: Simulator<'a, R>,
    session_prefix: String,
}

impl<'a, R: ConversationRuntime + ?Sized> TestCaseRunner<'a, R> {
    pub fn new(runtime: &'a R, config: &SimulationConfig) -> Self {
        Self {
            simulator: Simulator::new(runtime, config),
            session_prefix: config.session_prefix.clone(),
        }
    }

    /// Overrides the per-delivery deadline.
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.simulator = self.simulator.with_delivery_timeout(timeout);
        self
    }

    /// Runs every test case of a batch request.
    pub async fn run_request(&self, request: &RunRequest) -> Vec<TestResult> {
        self.run_all(&request.test_cases, &request.project_id).await
    }

    /// Runs `test_cases` sequentially, returning one result per case in input order.
    pub async fn run_all(&self, test_cases: &[TestCase], project_id: &str) -> Vec<TestResult> {
        let mut session_ids = SessionIds::new(self.session_prefix.as_str());
        let mut results = Vec::with_capacity(test_cases.len());

        info!(
            test_cases = test_cases.len(),
            project_id, "Starting test run"
        );

        for test_case in test_cases {
            let sender_id = session_ids.next_id();
            let span = info_span!("test_case", id = %test_case.id, sender_id = %sender_id);
            let result = self
                .run_one(test_case, project_id, &sender_id)
                .instrument(span)
                .await;
            results.push(result);
        }

        let passed = results.iter().filter(|result| result.success).count();
        info!(
            passed,
            failed = results.len() - passed,
            "Test run complete"
        );

        results
    }

    /// Runs a single test case in the given conversation session.
    pub async fn run_one(
        &self,
        test_case: &TestCase,
        project_id: &str,
        sender_id: &str,
    ) -> TestResult {
        let actual = self
            .simulator
            .simulate(&test_case.steps, &test_case.language, sender_id)
            .await;

        let test_results = align(&actual, &test_case.steps);
        let success = check_success(&test_results);
        let summary = AlignmentSummary::of(&test_results);

        info!(
            success,
            matched = summary.matched,
            unexpected = summary.unexpected,
            missing = summary.missing,
            "Test case evaluated"
        );

        TestResult {
            id: test_case.id.clone(),
            project_id: project_id.to_string(),
            success,
            test_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::DeliveryError;
    use crate::testing::ScriptedRuntime;
    use async_trait::async_trait;
    use turncheck_proto::{DiffStep, ProducedMessage, Step, UserMessage, UserStep};

    fn greet() -> Step {
        UserStep::new("hi").with_intent("greet").into()
    }

    #[tokio::test]
    async fn test_results_in_input_order_with_project_id() {
        let runtime = ScriptedRuntime::new().on_parsed("hi", Some("greet"), &["utter_greet"]);
        let runner = TestCaseRunner::new(&runtime, &SimulationConfig::default());

        let cases = vec![
            TestCase::new("pass", "en", vec![greet(), Step::action("utter_greet")]),
            TestCase::new("fail", "en", vec![greet(), Step::action("utter_other")]),
        ];
        let results = runner.run_all(&cases, "project-1").await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "pass");
        assert!(results[0].success);
        assert_eq!(results[1].id, "fail");
        assert!(!results[1].success);
        assert!(results.iter().all(|r| r.project_id == "project-1"));
        assert_eq!(
            results[1].test_results,
            vec![
                DiffStep::matched(greet()),
                DiffStep::actual(Step::action("utter_greet")),
                DiffStep::expected(Step::action("utter_other")),
            ]
        );
    }

    #[tokio::test]
    async fn test_each_test_case_gets_its_own_session() {
        let runtime = ScriptedRuntime::new().on_parsed("hi", Some("greet"), &[]);
        let runner = TestCaseRunner::new(&runtime, &SimulationConfig::default());

        let cases = vec![
            TestCase::new("a", "en", vec![greet()]),
            TestCase::new("b", "en", vec![greet()]),
        ];
        runner.run_all(&cases, "p").await;

        let deliveries = runtime.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_ne!(deliveries[0].sender_id, deliveries[1].sender_id);
        assert!(deliveries[0].sender_id.starts_with("botfront_test_case_"));
    }

    #[tokio::test]
    async fn test_failed_delivery_still_yields_result() {
        let runtime = ScriptedRuntime::new().failing("hi", "connection refused");
        let runner = TestCaseRunner::new(&runtime, &SimulationConfig::default());

        let results = runner
            .run_all(&[TestCase::new("down", "en", vec![greet()])], "p")
            .await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert_eq!(results[0].test_results, vec![DiffStep::expected(greet())]);
    }

    struct PanicsOnBoom;

    #[async_trait]
    impl ConversationRuntime for PanicsOnBoom {
        async fn deliver(
            &self,
            message: UserMessage,
        ) -> Result<Vec<ProducedMessage>, DeliveryError> {
            assert_ne!(message.text, "boom", "unexpected fault in runtime");
            Ok(vec![ProducedMessage::parsed(message.text, None, Vec::new())])
        }
    }

    #[tokio::test]
    async fn test_runtime_panic_still_yields_every_result() {
        let runtime = PanicsOnBoom;
        let runner = TestCaseRunner::new(&runtime, &SimulationConfig::default());

        let cases = vec![
            TestCase::new("a", "en", vec![Step::user("boom"), Step::user("ok")]),
            TestCase::new("b", "en", vec![Step::user("ok")]),
        ];
        let results = runner.run_all(&cases, "p").await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert_eq!(
            results[0].test_results,
            vec![
                DiffStep::expected(Step::user("boom")),
                DiffStep::matched(Step::user("ok")),
            ]
        );
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn test_run_request() {
        let runtime = ScriptedRuntime::new().on_parsed("hi", Some("greet"), &[]);
        let runner = TestCaseRunner::new(&runtime, &SimulationConfig::default());
        let request = RunRequest {
            test_cases: vec![TestCase::new("only", "en", vec![greet()])],
            project_id: "bf".to_string(),
        };

        let results = runner.run_request(&request).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].project_id, "bf");
        assert!(results[0].success);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let runtime = ScriptedRuntime::new();
        let runner = TestCaseRunner::new(&runtime, &SimulationConfig::default());
        assert!(runner.run_all(&[], "p").await.is_empty());
    }
}
