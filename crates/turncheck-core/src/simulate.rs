//! Replays a test case's user turns through a conversational runtime.
//!
//! Only user steps are delivered; scripted agent actions are what the runtime
//! is expected to produce, not input. Deliveries are strictly sequential and
//! each is bounded by a deadline. A failed or timed-out delivery contributes
//! no steps and never aborts the simulation. A runtime that panics while
//! handling an utterance is treated as a failed delivery.

use crate::config::SimulationConfig;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};
use turncheck_proto::{MessageMetadata, ProducedMessage, Step, UserMessage};

/// Format of the timestamp part of a session id.
const SESSION_STAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// A conversational runtime that can handle one user message at a time.
///
/// Implementations return every message produced while handling the
/// utterance, in production order: typically the parsed user message
/// followed by the bot's responses.
#[async_trait]
pub trait ConversationRuntime: Send + Sync {
    async fn deliver(&self, message: UserMessage) -> Result<Vec<ProducedMessage>, DeliveryError>;
}

/// Errors raised while delivering one utterance.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The runtime did not finish handling the message in time.
    #[error("message handling timed out after {0:?}")]
    Timeout(Duration),

    /// The runtime could not be reached.
    #[error("runtime unavailable: {0}")]
    Unavailable(String),

    /// The runtime refused or failed to handle the message.
    #[error("runtime failed to handle message: {0}")]
    Rejected(String),

    /// The runtime answered with something that is not a list of messages.
    #[error("malformed runtime response: {0}")]
    Malformed(String),

    /// The runtime panicked while handling the message.
    #[error("runtime panicked: {0}")]
    Panicked(String),
}

/// Extracts the message of a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Generates conversation session ids from the wall clock.
///
/// Ids have second resolution: `{prefix}_{%Y-%m-%d_%H:%M:%S}`. A stamp that
/// repeats the previous one gets a `_{n}` suffix so every id handed out by one
/// generator is distinct.
#[derive(Debug, Clone)]
pub struct SessionIds {
    prefix: String,
    last_stamp: Option<String>,
    repeats: u32,
}

impl SessionIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            last_stamp: None,
            repeats: 0,
        }
    }

    /// Returns a fresh session id for the current local time.
    pub fn next_id(&mut self) -> String {
        self.next_at(chrono::Local::now().naive_local())
    }

    /// Returns a fresh session id for the given time.
    pub fn next_at(&mut self, now: NaiveDateTime) -> String {
        let stamp = now.format(SESSION_STAMP_FORMAT).to_string();
        if self.last_stamp.as_deref() == Some(stamp.as_str()) {
            self.repeats += 1;
        } else {
            self.repeats = 1;
            self.last_stamp = Some(stamp.clone());
        }

        let base = if self.prefix.is_empty() {
            stamp
        } else {
            format!("{}_{}", self.prefix, stamp)
        };

        if self.repeats > 1 {
            format!("{base}_{}", self.repeats)
        } else {
            base
        }
    }
}

/// Drives a runtime through the user turns of a scripted conversation.
pub struct Simulator<'a, R: ConversationRuntime + ?Sized> {
    runtime: &'a R,
    input_channel: String,
    delivery_timeout: Duration,
}

impl<'a, R: ConversationRuntime + ?Sized> Simulator<'a, R> {
    pub fn new(runtime: &'a R, config: &SimulationConfig) -> Self {
        Self {
            runtime,
            input_channel: config.input_channel.clone(),
            delivery_timeout: config.delivery_timeout(),
        }
    }

    /// Overrides the per-delivery deadline.
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Delivers every user step of `steps` and collects what the runtime produced.
    ///
    /// Returned steps are classified and kept in production order.
    pub async fn simulate(&self, steps: &[Step], language: &str, sender_id: &str) -> Vec<Step> {
        let mut actual = Vec::new();

        for user in steps.iter().filter_map(Step::as_user) {
            let message = UserMessage {
                text: user.text.clone(),
                sender_id: sender_id.to_string(),
                input_channel: self.input_channel.clone(),
                metadata: MessageMetadata {
                    language: language.to_string(),
                },
            };

            match self.deliver(message).await {
                Ok(produced) => {
                    debug!(
                        text = %user.text,
                        produced = produced.len(),
                        "Delivered user message"
                    );
                    actual.extend(produced.into_iter().map(ProducedMessage::classify));
                }
                Err(DeliveryError::Timeout(after)) => {
                    error!(
                        text = %user.text,
                        timeout = ?after,
                        "Message handling timed out for user message"
                    );
                }
                Err(e) => {
                    error!(
                        text = %user.text,
                        error = %e,
                        "Failed to handle user message"
                    );
                }
            }
        }

        actual
    }

    async fn deliver(&self, message: UserMessage) -> Result<Vec<ProducedMessage>, DeliveryError> {
        let delivery = AssertUnwindSafe(self.runtime.deliver(message)).catch_unwind();
        match tokio::time::timeout(self.delivery_timeout, delivery).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(DeliveryError::Panicked(panic_message(payload.as_ref()))),
            Err(_) => Err(DeliveryError::Timeout(self.delivery_timeout)),
        }
    }
}
