//! Structural step equality.
//!
//! Steps compare by variant first: a user utterance never equals an agent
//! action. Entity annotations compare as multisets, so extraction order does
//! not matter but multiplicity does.

use turncheck_proto::{Entity, Step};

/// Order-independent, duplicate-sensitive comparison of entity annotations.
///
/// Each actual entity consumes the first not-yet-consumed equal entity on the
/// expected side (first match, no backtracking). The lists are equal iff
/// every expected entity was consumed and both sides have the same length.
pub fn entities_equal(actual: &[Entity], expected: &[Entity]) -> bool {
    if actual.len() != expected.len() {
        return false;
    }

    let mut consumed = vec![false; expected.len()];
    for entity in actual {
        if let Some(slot) = expected
            .iter()
            .zip(consumed.iter())
            .position(|(candidate, used)| !used && candidate == entity)
        {
            consumed[slot] = true;
        }
    }

    consumed.iter().all(|used| *used)
}

/// Structural equality between two steps.
///
/// User steps must agree on text, intent and entities (as a multiset).
/// Action steps must agree on the action name. Mixed variants never match.
pub fn steps_equal(a: &Step, b: &Step) -> bool {
    match (a, b) {
        (Step::User(a), Step::User(b)) => {
            a.text == b.text && a.intent == b.intent && entities_equal(&a.entities, &b.entities)
        }
        (Step::Action(a), Step::Action(b)) => a.action_name == b.action_name,
        _ => false,
    }
}
