//! End-to-end alignment scenarios: scripted runtime → runner → verdicts.

use serde_json::json;
use turncheck_core::{
    ScriptedRuntime, SimulationConfig, TestCaseRunner, Transcript, align, check_success,
    entities_equal,
};
use turncheck_proto::{
    DiffStep, Entity, ProducedMessage, Step, TestCase, Theme, UserStep,
};

fn greet() -> Step {
    UserStep::new("hi").with_intent("greet").into()
}

fn act(name: &str) -> Step {
    Step::action(name)
}

fn e(entity_type: &str, value: i64, start: i64, end: i64) -> Entity {
    Entity::new(entity_type, value, start, end)
}

#[test]
fn test_identical_sequences_match_fully() {
    let sequences = vec![
        vec![],
        vec![greet()],
        vec![greet(), act("utter_greet"), act("action_listen")],
        vec![act("utter_a"), act("utter_a"), greet(), greet()],
    ];

    for steps in sequences {
        let result = align(&steps, &steps);
        assert!(result.iter().all(DiffStep::is_matched), "{steps:?}");
        assert!(check_success(&result));
        assert_eq!(result.len(), steps.len());
    }
}

#[test]
fn test_actual_themed_steps_are_exactly_the_unmatched_actual_steps() {
    let actual = vec![
        act("utter_x"),
        act("utter_a"),
        act("utter_y"),
        act("utter_a"),
        act("utter_c"),
        act("utter_z"),
    ];
    let expected = vec![act("utter_a"), act("utter_b"), act("utter_c")];

    let result = align(&actual, &expected);
    let surplus: Vec<Step> = result
        .iter()
        .filter(|step| step.theme == Some(Theme::Actual))
        .map(|step| step.step.clone())
        .collect();

    assert_eq!(
        surplus,
        vec![act("utter_x"), act("utter_y"), act("utter_a"), act("utter_z")]
    );

    let missing: Vec<Step> = result
        .iter()
        .filter(|step| step.theme == Some(Theme::Expected))
        .map(|step| step.step.clone())
        .collect();
    assert_eq!(missing, vec![act("utter_b")]);
}

#[test]
fn test_entity_comparator_examples() {
    assert!(!entities_equal(
        &[e("x", 1, 0, 1), e("x", 1, 0, 1)],
        &[e("x", 1, 0, 1)]
    ));
    assert!(entities_equal(&[e("x", 1, 0, 1)], &[e("x", 1, 0, 1)]));
    assert!(entities_equal(
        &[e("x", 1, 0, 1), e("y", 2, 2, 3)],
        &[e("y", 2, 2, 3), e("x", 1, 0, 1)]
    ));
}

#[test]
fn test_entity_comparator_commutative() {
    let lists = vec![
        vec![],
        vec![e("x", 1, 0, 1)],
        vec![e("x", 1, 0, 1), e("x", 1, 0, 1)],
        vec![e("x", 1, 0, 1), e("y", 2, 2, 3)],
        vec![e("y", 2, 2, 3), e("x", 1, 0, 1)],
        vec![e("x", 1, 0, 1), e("y", 2, 2, 3), e("x", 1, 0, 1)],
    ];
    for a in &lists {
        for b in &lists {
            assert_eq!(entities_equal(a, b), entities_equal(b, a), "{a:?} vs {b:?}");
        }
    }
}

#[test]
fn test_align_is_idempotent() {
    let actual = vec![act("utter_x"), greet(), act("utter_b")];
    let expected = vec![greet(), act("utter_a"), act("utter_b"), act("utter_c")];
    assert_eq!(align(&actual, &expected), align(&actual, &expected));
}

#[tokio::test]
async fn test_scenario_greeting_matches() {
    let runtime = ScriptedRuntime::new().on_parsed("hi", Some("greet"), &["utter_greet"]);
    let runner = TestCaseRunner::new(&runtime, &SimulationConfig::default());

    let case = TestCase::new("tc-1", "en", vec![greet(), act("utter_greet")]);
    let results = runner.run_all(&[case], "project").await;

    assert!(results[0].success);
    assert_eq!(
        results[0].test_results,
        vec![DiffStep::matched(greet()), DiffStep::matched(act("utter_greet"))]
    );
}

#[tokio::test]
async fn test_scenario_delivery_failed() {
    let runtime = ScriptedRuntime::new().failing("hi", "runtime crashed");
    let runner = TestCaseRunner::new(&runtime, &SimulationConfig::default());

    let case = TestCase::new("tc-2", "en", vec![greet()]);
    let results = runner.run_all(&[case], "project").await;

    assert!(!results[0].success);
    assert_eq!(results[0].test_results, vec![DiffStep::expected(greet())]);
}

#[test]
fn test_scenario_missing_leading_action() {
    let result = align(&[act("utter_b")], &[act("utter_a"), act("utter_b")]);
    assert_eq!(
        result,
        vec![
            DiffStep::expected(act("utter_a")),
            DiffStep::matched(act("utter_b")),
        ]
    );
}

#[test]
fn test_scenario_unscripted_leading_action() {
    let result = align(&[act("utter_x"), act("utter_a")], &[act("utter_a")]);
    assert_eq!(
        result,
        vec![
            DiffStep::actual(act("utter_x")),
            DiffStep::matched(act("utter_a")),
        ]
    );
}

#[tokio::test]
async fn test_wrong_entities_reported_as_surplus_and_missing() {
    let produced_user = ProducedMessage::parsed(
        "table for 3",
        Some("book_table"),
        vec![e("guests", 3, 10, 11)],
    );
    let runtime = ScriptedRuntime::new().on(
        "table for 3",
        vec![produced_user, ProducedMessage::from_template("utter_ask_time")],
    );
    let runner = TestCaseRunner::new(&runtime, &SimulationConfig::default());

    let scripted: Step = UserStep::new("table for 3")
        .with_intent("book_table")
        .with_entities(vec![e("guests", 2, 10, 11)])
        .into();
    let case = TestCase::new("tc-ent", "en", vec![scripted.clone(), act("utter_ask_time")]);
    let results = runner.run_all(&[case], "project").await;

    let produced: Step = UserStep::new("table for 3")
        .with_intent("book_table")
        .with_entities(vec![e("guests", 3, 10, 11)])
        .into();
    assert!(!results[0].success);
    assert_eq!(
        results[0].test_results,
        vec![
            DiffStep::actual(produced),
            DiffStep::expected(scripted),
            DiffStep::matched(act("utter_ask_time")),
        ]
    );
}

#[tokio::test]
async fn test_transcript_driven_batch_serializes_to_wire_results() {
    let transcript = Transcript::parse_yaml(
        r#"
turns:
  - user: hi
    produces:
      - { text: hi, intent: greet }
      - { text: "Hey!", metadata: { template_name: utter_greet } }
  - user: bye
    produces:
      - { text: bye, intent: goodbye }
"#,
    )
    .unwrap();
    let runtime = ScriptedRuntime::from_transcript(transcript);
    let runner = TestCaseRunner::new(&runtime, &SimulationConfig::default());

    let cases = vec![
        TestCase::new("ok", "en", vec![greet(), act("utter_greet")]),
        TestCase::new(
            "no-goodbye",
            "en",
            vec![
                UserStep::new("bye").with_intent("goodbye").into(),
                act("utter_goodbye"),
            ],
        ),
    ];
    let results = runner.run_all(&cases, "bf").await;

    assert_eq!(
        serde_json::to_value(&results).unwrap(),
        json!([
            {
                "_id": "ok",
                "projectId": "bf",
                "success": true,
                "testResults": [
                    {"user": "hi", "intent": "greet", "entities": []},
                    {"action": "utter_greet"}
                ]
            },
            {
                "_id": "no-goodbye",
                "projectId": "bf",
                "success": false,
                "testResults": [
                    {"user": "bye", "intent": "goodbye", "entities": []},
                    {"action": "utter_goodbye", "theme": "expected"}
                ]
            }
        ])
    );
}
