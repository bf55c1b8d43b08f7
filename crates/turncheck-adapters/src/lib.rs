//! # turncheck-adapters
//!
//! Conversational runtimes turncheck can drive.
//!
//! This crate provides:
//! - `RestRuntime`: drives a Rasa-compatible server over HTTP

mod rest_runtime;

pub use rest_runtime::{RestRuntime, RestRuntimeError};
