//! Scripted conversational runtime for tests and offline runs.
//!
//! A [`ScriptedRuntime`] answers each utterance from a transcript instead of
//! a live agent. Transcripts can be built in code or loaded from YAML:
//!
//! ```yaml
//! turns:
//!   - user: hi
//!     produces:
//!       - { text: hi, intent: greet }
//!       - { text: "Hello!", metadata: { template_name: utter_greet } }
//!   - user: crash
//!     fail: "action server unreachable"
//!   - user: slow
//!     stall_ms: 5000
//! ```
//!
//! An utterance scripted several times replays its turns in order, then keeps
//! repeating the last one. An utterance that is not scripted at all is parsed
//! with no intent and no entities, and gets no bot response.

use crate::simulate::{ConversationRuntime, DeliveryError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;
use turncheck_proto::{ProducedMessage, UserMessage};

/// One scripted reaction to an utterance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptedTurn {
    /// Utterance text this turn answers.
    pub user: String,

    /// Messages produced, in order.
    #[serde(default)]
    pub produces: Vec<ProducedMessage>,

    /// When set, delivery fails with this message instead of producing anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,

    /// When set, delivery waits this long before answering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stall_ms: Option<u64>,
}

/// A list of scripted turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub turns: Vec<ScriptedTurn>,
}

impl Transcript {
    /// Loads a transcript from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TranscriptError> {
        let path_ref = path.as_ref();
        debug!(path = %path_ref.display(), "Loading transcript from file");
        let content = std::fs::read_to_string(path_ref)?;
        Self::parse_yaml(&content)
    }

    /// Parses a transcript from a YAML string.
    pub fn parse_yaml(content: &str) -> Result<Self, TranscriptError> {
        let transcript: Self = serde_yaml::from_str(content)?;
        if let Some(turn) = transcript.turns.iter().find(|t| t.user.is_empty()) {
            return Err(TranscriptError::EmptyUtterance {
                produces: turn.produces.len(),
            });
        }
        Ok(transcript)
    }
}

/// Transcript loading errors.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Transcript turn with {produces} produced message(s) has an empty 'user' utterance")]
    EmptyUtterance { produces: usize },
}

/// A runtime that answers from a transcript and records what it was sent.
#[derive(Debug, Default)]
pub struct ScriptedRuntime {
    turns: Vec<ScriptedTurn>,
    replayed: Mutex<HashMap<String, usize>>,
    deliveries: Mutex<Vec<UserMessage>>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_transcript(transcript: Transcript) -> Self {
        Self {
            turns: transcript.turns,
            ..Self::default()
        }
    }

    /// Scripts `text` to produce the given messages.
    pub fn on(mut self, text: impl Into<String>, produces: Vec<ProducedMessage>) -> Self {
        self.turns.push(ScriptedTurn {
            user: text.into(),
            produces,
            ..ScriptedTurn::default()
        });
        self
    }

    /// Scripts `text` to be parsed with `intent` and answered by `templates`.
    pub fn on_parsed(self, text: &str, intent: Option<&str>, templates: &[&str]) -> Self {
        let mut produces = vec![ProducedMessage::parsed(text, intent, Vec::new())];
        produces.extend(templates.iter().map(|name| ProducedMessage::from_template(*name)));
        self.on(text, produces)
    }

    /// Scripts `text` to fail delivery with `reason`.
    pub fn failing(mut self, text: impl Into<String>, reason: impl Into<String>) -> Self {
        self.turns.push(ScriptedTurn {
            user: text.into(),
            fail: Some(reason.into()),
            ..ScriptedTurn::default()
        });
        self
    }

    /// Scripts `text` to stall for `delay` and then produce nothing.
    pub fn stalling(mut self, text: impl Into<String>, delay: Duration) -> Self {
        self.turns.push(ScriptedTurn {
            user: text.into(),
            stall_ms: Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)),
            ..ScriptedTurn::default()
        });
        self
    }

    /// Every message delivered so far, in delivery order.
    pub fn deliveries(&self) -> Vec<UserMessage> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Picks the turn answering `text`: the next unreplayed one, else the last.
    fn next_turn(&self, text: &str) -> Option<&ScriptedTurn> {
        let candidates: Vec<&ScriptedTurn> =
            self.turns.iter().filter(|turn| turn.user == text).collect();
        let last = candidates.len().checked_sub(1)?;

        let mut replayed = self.replayed.lock().unwrap_or_else(PoisonError::into_inner);
        let count = replayed.entry(text.to_string()).or_insert(0);
        let turn = candidates[(*count).min(last)];
        *count += 1;
        Some(turn)
    }
}

#[async_trait]
impl ConversationRuntime for ScriptedRuntime {
    async fn deliver(&self, message: UserMessage) -> Result<Vec<ProducedMessage>, DeliveryError> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());

        let Some(turn) = self.next_turn(&message.text) else {
            debug!(text = %message.text, "No scripted turn, parsing without intent");
            return Ok(vec![ProducedMessage::parsed(message.text, None, Vec::new())]);
        };

        if let Some(delay) = turn.stall_ms {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if let Some(reason) = &turn.fail {
            return Err(DeliveryError::Rejected(reason.clone()));
        }

        Ok(turn.produces.clone())
    }
}
