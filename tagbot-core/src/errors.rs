//! Error taxonomy for webhook decisions.
//!
//! Every variant is terminal for the delivery and ends up, via `Display`, as
//! the plain-text response body. [`TagbotError::kind`] separates benign
//! rejections from hosting API failures for logging only.

use hosting_gateway::GatewayError;
use thiserror::Error;

use crate::extractor::ExtractionError;
use crate::release_notes::ReleaseNotesError;

/// Convenient alias for crate-wide results.
pub type TagbotResult<T> = Result<T, TagbotError>;

/// Why an event was not acted upon, or why acting on it failed.
#[derive(Debug, Error)]
pub enum TagbotError {
    /// `X-Gitlab-Token` missing or different from the configured secret.
    #[error("Invalid webhook token")]
    Authentication,

    /// Body is not a JSON document of the expected shape.
    #[error("Parsing body: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// Not a merge request event.
    #[error("Unknown event type ({0})")]
    UnsupportedEventType(String),

    /// MR author is not the registration bot.
    #[error(
        "MR not created by registrator (author_id: {})",
        .0.map_or_else(|| "none".to_string(), |id| id.to_string())
    )]
    UnauthorizedAuthor(Option<u64>),

    /// Action other than `open` or `merge`.
    #[error("Unsupported action ({0})")]
    UnsupportedAction(String),

    /// Open event received while automatic merging is switched off.
    #[error("Automatic merging is disabled")]
    AutoMergeDisabled,

    /// Lifecycle fields rule the event out (replay, not merged, not new).
    #[error(transparent)]
    StaleOrInvalidState(#[from] StateRejection),

    /// Merged into something other than the default branch.
    #[error("Invalid target branch ({target}, default is {default})")]
    InvalidTargetBranch { target: String, default: String },

    /// Description lacks one of the labelled fields.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Approve MR: {0}")]
    ApprovalFailed(#[source] GatewayError),

    /// Accept failed after a successful approval; the MR stays approved.
    #[error("Accept MR: {0}")]
    AcceptFailed(#[source] GatewayError),

    #[error("Create tag: {0}")]
    TagCreationFailed(#[source] GatewayError),

    /// The tag exists but its release could not be published.
    #[error("Release notes: {0}")]
    ReleaseNotesFailed(#[source] ReleaseNotesError),
}

/// Lifecycle checks that make an event stale or not actionable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateRejection {
    #[error("MR state was previously merged")]
    PreviouslyMerged,

    #[error("MR state is not merged ({0})")]
    NotMerged(String),

    #[error("Not a new MR")]
    NotNew,

    #[error("MR iid missing from payload")]
    MissingIid,

    #[error("MR project missing from payload")]
    MissingProject,
}

/// Coarse classification used when logging the outcome of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The event is not actionable; nothing was called.
    Rejected,
    /// A hosting API call failed.
    Failed,
}

impl TagbotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TagbotError::ApprovalFailed(_)
            | TagbotError::AcceptFailed(_)
            | TagbotError::TagCreationFailed(_)
            | TagbotError::ReleaseNotesFailed(_) => ErrorKind::Failed,
            _ => ErrorKind::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        assert_eq!(
            TagbotError::UnauthorizedAuthor(Some(12)).to_string(),
            "MR not created by registrator (author_id: 12)"
        );
        assert_eq!(
            TagbotError::UnauthorizedAuthor(None).to_string(),
            "MR not created by registrator (author_id: none)"
        );
        assert_eq!(
            TagbotError::from(StateRejection::NotMerged("opened".into())).to_string(),
            "MR state is not merged (opened)"
        );
        assert_eq!(
            TagbotError::TagCreationFailed(GatewayError::Unauthorized).to_string(),
            "Create tag: unauthorized"
        );
    }

    #[test]
    fn only_gateway_failures_are_failures() {
        assert_eq!(TagbotError::Authentication.kind(), ErrorKind::Rejected);
        assert_eq!(
            TagbotError::from(StateRejection::PreviouslyMerged).kind(),
            ErrorKind::Rejected
        );
        assert_eq!(
            TagbotError::AcceptFailed(GatewayError::Timeout).kind(),
            ErrorKind::Failed
        );
    }
}
