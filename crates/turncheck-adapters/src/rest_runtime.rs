//! HTTP runtime for Rasa-compatible servers.
//!
//! Handling one utterance takes two requests:
//! 1. `POST {url}/model/parse` returns how the utterance was understood
//!    (intent and entities), which becomes the produced user message.
//! 2. `POST {url}/webhooks/{channel}/webhook` runs the utterance through the
//!    conversation and returns the bot messages, which carry
//!    `metadata.template_name` when rendered from a response template.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use turncheck_core::{ConversationRuntime, DeliveryError, RuntimeConfig};
use turncheck_proto::{MessageMetadata, ProducedMessage, UserMessage};

/// Errors building a [`RestRuntime`].
#[derive(Debug, Error)]
pub enum RestRuntimeError {
    #[error("invalid runtime url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct ParseRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct WebhookRequest<'a> {
    sender: &'a str,
    message: &'a str,
    metadata: &'a MessageMetadata,
}

/// A [`ConversationRuntime`] backed by a Rasa-compatible HTTP server.
#[derive(Debug, Clone)]
pub struct RestRuntime {
    client: Client,
    parse_url: Url,
    webhook_url: Url,
    request_timeout: Duration,
}

impl RestRuntime {
    /// Creates a runtime from configuration.
    pub fn new(config: &RuntimeConfig) -> Result<Self, RestRuntimeError> {
        let invalid = |reason: String| RestRuntimeError::InvalidUrl {
            url: config.url.clone(),
            reason,
        };

        // Url::join replaces the last path segment unless the base ends in '/'
        let mut base = config.url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a base url".to_string()));
        }

        let parse_url = base
            .join("model/parse")
            .map_err(|e| invalid(e.to_string()))?;
        let webhook_url = base
            .join(&format!("webhooks/{}/webhook", config.webhook_channel))
            .map_err(|e| invalid(e.to_string()))?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            parse_url,
            webhook_url,
            request_timeout: config.request_timeout(),
        })
    }

    pub fn parse_url(&self) -> &Url {
        &self.parse_url
    }

    pub fn webhook_url(&self) -> &Url {
        &self.webhook_url
    }

    async fn parse(&self, message: &UserMessage) -> Result<ProducedMessage, DeliveryError> {
        let body = ParseRequest {
            text: &message.text,
        };
        let response = self
            .client
            .post(self.parse_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;
        let response = Self::check_status(response, &self.parse_url)?;

        let mut parsed: ProducedMessage = response
            .json()
            .await
            .map_err(|e| DeliveryError::Malformed(format!("{}: {e}", self.parse_url)))?;
        // the parse response echoes metadata only on some server versions
        parsed.metadata = None;
        if parsed.text.is_none() {
            parsed.text = Some(message.text.clone());
        }
        Ok(parsed)
    }

    async fn webhook(&self, message: &UserMessage) -> Result<Vec<ProducedMessage>, DeliveryError> {
        let body = WebhookRequest {
            sender: &message.sender_id,
            message: &message.text,
            metadata: &message.metadata,
        };
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;
        let response = Self::check_status(response, &self.webhook_url)?;

        response
            .json()
            .await
            .map_err(|e| DeliveryError::Malformed(format!("{}: {e}", self.webhook_url)))
    }

    fn check_status(
        response: reqwest::Response,
        url: &Url,
    ) -> Result<reqwest::Response, DeliveryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(match status {
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                DeliveryError::Unavailable(format!("HTTP {status} from {url}"))
            }
            _ => DeliveryError::Rejected(format!("HTTP {status} from {url}")),
        })
    }

    fn request_error(&self, error: &reqwest::Error) -> DeliveryError {
        if error.is_timeout() {
            DeliveryError::Timeout(self.request_timeout)
        } else if error.is_connect() {
            DeliveryError::Unavailable(error.to_string())
        } else {
            DeliveryError::Rejected(error.to_string())
        }
    }
}

#[async_trait]
impl ConversationRuntime for RestRuntime {
    async fn deliver(&self, message: UserMessage) -> Result<Vec<ProducedMessage>, DeliveryError> {
        let parsed = self.parse(&message).await?;
        let responses = self.webhook(&message).await?;
        debug!(
            sender_id = %message.sender_id,
            intent = parsed.intent.as_deref().unwrap_or("-"),
            responses = responses.len(),
            "Runtime handled message"
        );

        let mut produced = Vec::with_capacity(responses.len() + 1);
        produced.push(parsed);
        produced.extend(responses);
        Ok(produced)
    }
}
