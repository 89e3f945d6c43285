//! Typed view of a GitLab merge request webhook body.
//!
//! Only the fields the bot reads are modelled. Absent sections decode as
//! `None` so that an incomplete payload is rejected by the validator with a
//! precise message instead of a generic parse error.
//!
//! Payload format:
//! https://docs.gitlab.com/ee/user/project/integrations/webhook_events.html#merge-request-events

use serde::{Deserialize, Deserializer};

use crate::errors::{TagbotError, TagbotResult};

/// Decoded merge request event. Immutable once decoded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MergeRequestEvent {
    event_type: Option<String>,
    object_kind: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    object_attributes: ObjectAttributes,
    #[serde(default, deserialize_with = "null_as_default")]
    changes: Changes,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ObjectAttributes {
    action: Option<String>,
    author_id: Option<u64>,
    source_project_id: Option<u64>,
    iid: Option<u64>,
    description: Option<String>,
    target_branch: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    target: Target,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Target {
    default_branch: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Changes {
    iid: Option<Change<u64>>,
    state: Option<Change<String>>,
}

/// `{"previous": ..., "current": ...}` pair from the `changes` section.
#[derive(Debug, Clone, Deserialize)]
struct Change<T> {
    previous: Option<T>,
    current: Option<T>,
}

/// Treats an explicit `null` section like a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl MergeRequestEvent {
    /// Decodes a raw webhook body.
    pub fn from_slice(body: &[u8]) -> TagbotResult<Self> {
        serde_json::from_slice(body).map_err(TagbotError::MalformedPayload)
    }

    /// `event_type`, falling back to `object_kind` (both are sent by GitLab).
    pub fn event_type(&self) -> Option<&str> {
        self.event_type
            .as_deref()
            .or(self.object_kind.as_deref())
    }

    pub fn action(&self) -> Option<&str> {
        self.object_attributes.action.as_deref()
    }

    pub fn author_id(&self) -> Option<u64> {
        self.object_attributes.author_id
    }

    pub fn source_project_id(&self) -> Option<u64> {
        self.object_attributes.source_project_id
    }

    pub fn description(&self) -> &str {
        self.object_attributes.description.as_deref().unwrap_or("")
    }

    pub fn target_branch(&self) -> Option<&str> {
        self.object_attributes.target_branch.as_deref()
    }

    pub fn default_branch(&self) -> Option<&str> {
        self.object_attributes.target.default_branch.as_deref()
    }

    /// Previous request iid; `None` for a newly created request.
    pub fn previous_iid(&self) -> Option<u64> {
        self.changes.iid.as_ref().and_then(|c| c.previous)
    }

    /// Current request iid from `changes`, else from `object_attributes`.
    pub fn current_iid(&self) -> Option<u64> {
        self.changes
            .iid
            .as_ref()
            .and_then(|c| c.current)
            .or(self.object_attributes.iid)
    }

    pub fn previous_state(&self) -> Option<&str> {
        self.changes.state.as_ref().and_then(|c| c.previous.as_deref())
    }

    pub fn current_state(&self) -> Option<&str> {
        self.changes.state.as_ref().and_then(|c| c.current.as_deref())
    }
}
