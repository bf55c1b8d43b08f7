//! Messages exchanged with a conversational runtime.
//!
//! The runner hands the runtime one [`UserMessage`] per scripted utterance and
//! gets back every [`ProducedMessage`] the runtime emitted while handling it:
//! the parsed user message first, then whatever the bot uttered.

use crate::step::{ActionStep, Entity, Step, UserStep};
use serde::{Deserialize, Deserializer, Serialize};

/// Metadata key under which a produced bot message names its response template.
pub const TEMPLATE_NAME_KEY: &str = "template_name";

/// An utterance delivered to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    /// Utterance text.
    pub text: String,

    /// Conversation session the utterance belongs to.
    pub sender_id: String,

    /// Name of the channel the message is attributed to.
    pub input_channel: String,

    pub metadata: MessageMetadata,
}

/// Per-message metadata forwarded to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Language tag of the test case.
    #[serde(rename = "lang")]
    pub language: String,
}

/// Accepts the intent either as a plain label or as a parse result object.
///
/// - `"intent": "greet"` → `Some("greet")`
/// - `"intent": {"name": "greet", "confidence": 0.98}` → `Some("greet")`
/// - `"intent": null`, `{}` or missing → `None`
fn deserialize_flexible_intent<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleIntent {
        Name(String),
        Parsed {
            #[serde(default)]
            name: Option<String>,
        },
    }

    let opt = Option::<FlexibleIntent>::deserialize(deserializer)?;
    Ok(opt.and_then(|flex| match flex {
        FlexibleIntent::Name(name) => Some(name),
        FlexibleIntent::Parsed { name } => name,
    }))
}

/// A raw message produced by the runtime while handling an utterance.
///
/// Parsed user messages carry the recognized intent and entities; bot
/// messages generated from a response template carry its name under
/// `metadata.template_name`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProducedMessage {
    #[serde(default, alias = "user", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_flexible_intent",
        skip_serializing_if = "Option::is_none"
    )]
    pub intent: Option<String>,

    #[serde(default)]
    pub entities: Vec<Entity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ProducedMessage {
    /// A parsed user message.
    pub fn parsed(text: impl Into<String>, intent: Option<&str>, entities: Vec<Entity>) -> Self {
        Self {
            text: Some(text.into()),
            intent: intent.map(str::to_string),
            entities,
            metadata: None,
        }
    }

    /// A bot message rendered from the named response template.
    pub fn from_template(template_name: impl Into<String>) -> Self {
        let mut metadata = serde_json::Map::new();
        metadata.insert(
            TEMPLATE_NAME_KEY.to_string(),
            serde_json::Value::String(template_name.into()),
        );
        Self {
            metadata: Some(metadata),
            ..Self::default()
        }
    }

    /// Name of the response template this message was rendered from, if any.
    pub fn template_name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(TEMPLATE_NAME_KEY))
            .and_then(serde_json::Value::as_str)
    }

    /// Classifies the message as a conversational step.
    ///
    /// A message naming a response template is the agent acting; anything
    /// else is read as a parsed user utterance.
    pub fn classify(self) -> Step {
        if let Some(name) = self.template_name() {
            return Step::Action(ActionStep::new(name));
        }
        Step::User(UserStep {
            text: self.text.unwrap_or_default(),
            intent: self.intent,
            entities: self.entities,
        })
    }
}

impl From<ProducedMessage> for Step {
    fn from(message: ProducedMessage) -> Self {
        message.classify()
    }
}
