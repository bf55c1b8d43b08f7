//! Step-list alignment.
//!
//! Aligns the steps a runtime actually produced against the steps a test case
//! scripted. Every actual step is matched greedily against the earliest equal
//! step still ahead of the expected cursor:
//!
//! - no match: the step is surplus and is buffered, themed [`Theme::Actual`]
//! - match: buffered surplus steps are flushed, then every expected step the
//!   cursor skipped is emitted themed [`Theme::Expected`], then the match
//!   itself, unthemed
//!
//! Once the actual steps are exhausted, remaining surplus steps are flushed,
//! followed by every expected step never reached.
//!
//! Surplus steps are always reported before the expected steps skipped to
//! reach the next match, which keeps the output in the order the run
//! happened.

use crate::compare::steps_equal;
use turncheck_proto::{DiffStep, Step, Theme};

/// Aligns `actual` against `expected`, annotating every mismatch.
///
/// Pure and deterministic: the output depends only on the two inputs.
/// Matched steps are emitted as scripted.
pub fn align(actual: &[Step], expected: &[Step]) -> Vec<DiffStep> {
    let mut output = Vec::with_capacity(actual.len().max(expected.len()));
    let mut pending_actual: Vec<DiffStep> = Vec::new();
    let mut cursor = 0;

    for step in actual {
        let remaining = &expected[cursor..];
        match remaining.iter().position(|candidate| steps_equal(step, candidate)) {
            None => pending_actual.push(DiffStep::actual(step.clone())),
            Some(offset) => {
                output.append(&mut pending_actual);
                output.extend(remaining[..offset].iter().cloned().map(DiffStep::expected));
                output.push(DiffStep::matched(remaining[offset].clone()));
                cursor += offset + 1;
            }
        }
    }

    output.append(&mut pending_actual);
    output.extend(expected[cursor..].iter().cloned().map(DiffStep::expected));
    output
}

/// True iff every step of an alignment result matched.
pub fn check_success(result: &[DiffStep]) -> bool {
    result.iter().all(DiffStep::is_matched)
}

/// Counts of each kind of step in an alignment result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignmentSummary {
    pub matched: usize,
    pub unexpected: usize,
    pub missing: usize,
}

impl AlignmentSummary {
    pub fn of(result: &[DiffStep]) -> Self {
        result
            .iter()
            .fold(Self::default(), |mut summary, step| {
                match step.theme {
                    None => summary.matched += 1,
                    Some(Theme::Actual) => summary.unexpected += 1,
                    Some(Theme::Expected) => summary.missing += 1,
                }
                summary
            })
    }
}
