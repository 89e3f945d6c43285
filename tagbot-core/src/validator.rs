//! Entry and author gates applied to every delivery.
//!
//! Ordered cheapest-first: token compare, event type, author, action. None
//! of these checks touch the network.

use std::fmt;

use subtle::ConstantTimeEq;

use crate::config::TagbotConfig;
use crate::errors::{TagbotError, TagbotResult};
use crate::event::MergeRequestEvent;

/// Event category handled by the bot.
pub const MERGE_REQUEST_EVENT: &str = "merge_request";

/// Action selected for a validated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Open,
    Merge,
}

impl Action {
    fn parse(action: &str) -> Option<Self> {
        match action {
            "open" => Some(Action::Open),
            "merge" => Some(Action::Merge),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct EventValidator {
    webhook_token: String,
    registrator_id: u64,
}

impl fmt::Debug for EventValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventValidator")
            .field("webhook_token", &"<redacted>")
            .field("registrator_id", &self.registrator_id)
            .finish()
    }
}

impl EventValidator {
    pub fn new(config: &TagbotConfig) -> Self {
        Self {
            webhook_token: config.webhook_token.clone(),
            registrator_id: config.registrator_id,
        }
    }

    /// Checks the `X-Gitlab-Token` header value against the shared secret.
    pub fn authenticate(&self, token: Option<&str>) -> TagbotResult<()> {
        let provided = token.unwrap_or_default();
        let matches: bool = provided
            .as_bytes()
            .ct_eq(self.webhook_token.as_bytes())
            .into();

        if matches {
            Ok(())
        } else {
            Err(TagbotError::Authentication)
        }
    }

    /// Event type, author and action gates; returns the handler to run.
    pub fn validate(&self, event: &MergeRequestEvent) -> TagbotResult<Action> {
        match event.event_type() {
            Some(MERGE_REQUEST_EVENT) => {}
            other => {
                return Err(TagbotError::UnsupportedEventType(
                    other.unwrap_or("none").to_string(),
                ));
            }
        }

        if event.author_id() != Some(self.registrator_id) {
            return Err(TagbotError::UnauthorizedAuthor(event.author_id()));
        }

        let action = event.action().unwrap_or("none");
        Action::parse(action).ok_or_else(|| TagbotError::UnsupportedAction(action.to_string()))
    }
}
