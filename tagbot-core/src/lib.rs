//! Decision logic of the tagging bot.
//!
//! A delivery flows through [`Dispatcher`]: the [`validator`] gates it, the
//! [`event`] module decodes it, and one of the [`handlers`] acts on it through
//! a [`hosting_gateway::HostingGateway`]. Merged registration MRs are turned
//! into tags using the fields found by the [`extractor`]; optionally a release
//! with generated [`release_notes`] is attached.

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod event;
pub mod extractor;
pub mod handlers;
pub mod release_notes;
pub mod validator;

pub use config::TagbotConfig;
pub use dispatcher::{Dispatcher, SUCCESS_BODY};
pub use errors::{ErrorKind, StateRejection, TagbotError, TagbotResult};
pub use event::MergeRequestEvent;
pub use extractor::{DescriptionField, ExtractedTagInfo, ExtractionError, extract_tag_info};
pub use handlers::Outcome;
pub use release_notes::{ReleaseNotes, ReleaseNotesError};
pub use validator::{Action, EventValidator};
