//! Single entry point for webhook deliveries.
//!
//! Runs the gates in a fixed order (token, decode, event type, author,
//! action) and hands the event to the matching handler. Each delivery gets
//! exactly one plain-text answer: [`SUCCESS_BODY`] or the error's `Display`.

use hosting_gateway::HostingGateway;
use tracing::{error, info, instrument, warn};

use crate::config::TagbotConfig;
use crate::errors::{ErrorKind, TagbotResult};
use crate::event::MergeRequestEvent;
use crate::handlers::{MergeHandler, OpenHandler, Outcome};
use crate::validator::{Action, EventValidator};

/// Response body for a delivery that was acted on successfully.
pub const SUCCESS_BODY: &str = "No error";

#[derive(Debug)]
pub struct Dispatcher<G> {
    validator: EventValidator,
    open: OpenHandler,
    merge: MergeHandler,
    gateway: G,
}

impl<G: HostingGateway> Dispatcher<G> {
    pub fn new(config: &TagbotConfig, gateway: G) -> Self {
        Self {
            validator: EventValidator::new(config),
            open: OpenHandler::new(config),
            merge: MergeHandler::new(config),
            gateway,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Decides and performs the action for one delivery.
    #[instrument(skip_all)]
    pub async fn dispatch(&self, token: Option<&str>, body: &[u8]) -> TagbotResult<Outcome> {
        self.validator.authenticate(token)?;

        let event = MergeRequestEvent::from_slice(body)?;
        let action = self.validator.validate(&event)?;

        match action {
            Action::Open => self.open.handle(&event, &self.gateway).await,
            Action::Merge => self.merge.handle(&event, &self.gateway).await,
        }
    }

    /// Like [`Self::dispatch`], folded into the response body and logged.
    pub async fn respond(&self, token: Option<&str>, body: &[u8]) -> String {
        match self.dispatch(token, body).await {
            Ok(outcome) => {
                info!(%outcome, "webhook handled");
                SUCCESS_BODY.to_string()
            }
            Err(err) => {
                match err.kind() {
                    ErrorKind::Rejected => warn!(error = %err, "webhook rejected"),
                    ErrorKind::Failed => error!(error = %err, "webhook action failed"),
                }
                err.to_string()
            }
        }
    }
}
