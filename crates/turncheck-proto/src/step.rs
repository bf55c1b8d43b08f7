//! Conversational steps.
//!
//! A step is one turn of a conversation: either something the user said
//! (with the intent and entities the runtime should recognize) or an action
//! the agent took. On the wire the variant is carried by the key present:
//!
//! ```yaml
//! - user: "book a table for two"
//!   intent: book_table
//!   entities:
//!     - { entity: guests, value: 2, start: 15, end: 18 }
//! - action: utter_ask_time
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// A user utterance.
    User(UserStep),
    /// An action taken by the agent.
    Action(ActionStep),
}

impl Step {
    /// Creates a user step with no intent and no entities.
    pub fn user(text: impl Into<String>) -> Self {
        Step::User(UserStep::new(text))
    }

    /// Creates an action step.
    pub fn action(action_name: impl Into<String>) -> Self {
        Step::Action(ActionStep::new(action_name))
    }

    /// Returns the user step, if this is one.
    pub fn as_user(&self) -> Option<&UserStep> {
        match self {
            Step::User(user) => Some(user),
            Step::Action(_) => None,
        }
    }

    /// Returns true if this step is a user utterance.
    pub fn is_user(&self) -> bool {
        matches!(self, Step::User(_))
    }
}

impl From<UserStep> for Step {
    fn from(step: UserStep) -> Self {
        Step::User(step)
    }
}

impl From<ActionStep> for Step {
    fn from(step: ActionStep) -> Self {
        Step::Action(step)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::User(user) => {
                write!(f, "user: {:?}", user.text)?;
                if let Some(intent) = &user.intent {
                    write!(f, " ({intent})")?;
                }
                if !user.entities.is_empty() {
                    let entities: Vec<String> =
                        user.entities.iter().map(ToString::to_string).collect();
                    write!(f, " [{}]", entities.join(", "))?;
                }
                Ok(())
            }
            Step::Action(action) => write!(f, "action: {}", action.action_name),
        }
    }
}

/// A user utterance together with its expected interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStep {
    /// The utterance text.
    #[serde(rename = "user")]
    pub text: String,

    /// Intent label recognized for the utterance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    /// Entities recognized in the utterance, in extraction order.
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl UserStep {
    /// Creates a user step with no intent and no entities.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent: None,
            entities: Vec::new(),
        }
    }

    /// Sets the intent label.
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    /// Sets the entity annotations.
    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = entities;
        self
    }
}

/// An action the agent invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStep {
    /// Action (or response template) name.
    #[serde(rename = "action")]
    pub action_name: String,
}

impl ActionStep {
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
        }
    }
}

/// An entity annotation on a user utterance.
///
/// Two entities are equal iff type, value, start and end are all equal. The
/// value is arbitrary JSON and compares by deep equality. Extra keys on the
/// wire (extractor, confidence, ...) are dropped on ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity type, e.g. `"guests"`.
    #[serde(rename = "entity")]
    pub entity_type: String,

    /// Extracted value.
    pub value: serde_json::Value,

    /// Character offset where the entity starts.
    pub start: i64,

    /// Character offset where the entity ends.
    pub end: i64,
}

impl Entity {
    pub fn new(
        entity_type: impl Into<String>,
        value: impl Into<serde_json::Value>,
        start: i64,
        end: i64,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            value: value.into(),
            start,
            end,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}@{}..{}",
            self.entity_type, self.value, self.start, self.end
        )
    }
}
