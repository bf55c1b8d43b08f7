//! # turncheck-core
//!
//! Conversation test-case checking for turncheck.
//!
//! This crate provides:
//! - Structural step equality with order-independent entity comparison
//! - The step-list aligner that diffs actual against expected steps
//! - The simulation driver that replays user turns through a runtime
//! - The test case runner that ties simulation and alignment together
//! - Configuration loading and validation
//! - A scripted runtime for tests and offline runs

pub mod align;
pub mod compare;
mod config;
pub mod runner;
pub mod simulate;
pub mod testing;

pub use align::{AlignmentSummary, align, check_success};
pub use compare::{entities_equal, steps_equal};
pub use config::{ConfigError, ConfigWarning, RuntimeConfig, SimulationConfig, TurncheckConfig};
pub use runner::TestCaseRunner;
pub use simulate::{ConversationRuntime, DeliveryError, SessionIds, Simulator};
pub use testing::{ScriptedRuntime, ScriptedTurn, Transcript, TranscriptError};
