//! # turncheck-proto
//!
//! Shared data model for turncheck.
//!
//! This crate provides:
//! - The conversational step model (`Step`, `UserStep`, `ActionStep`, `Entity`)
//! - Test case and batch request types as they appear on the wire
//! - Diff annotations (`Theme`, `DiffStep`) and per-test-case verdicts (`TestResult`)
//! - Messages exchanged with a conversational runtime (`UserMessage`, `ProducedMessage`)

mod diff;
mod message;
mod step;
mod test_case;

pub use diff::{DiffStep, TestResult, Theme};
pub use message::{MessageMetadata, ProducedMessage, UserMessage};
pub use step::{ActionStep, Entity, Step, UserStep};
pub use test_case::{RunRequest, TestCase};
