//! Per-action handlers selected by the dispatcher.

mod merge;
mod open;

pub use merge::MergeHandler;
pub use open::{MergeRequestTarget, OpenHandler};

use std::fmt;

/// What a successful delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Registration MR approved and set to merge when its pipeline succeeds.
    AutoMerged { project: String, iid: u64 },
    /// Tag created, with a published release when release notes are on.
    Tagged {
        project: String,
        tag: String,
        commit: String,
        released: bool,
    },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::AutoMerged { project, iid } => {
                write!(f, "Approved and merged MR !{iid} of project {project}")
            }
            Outcome::Tagged {
                project,
                tag,
                commit,
                released,
            } => {
                write!(f, "Created tag {tag} for {project} at {commit}")?;
                if *released {
                    f.write_str(" with release notes")?;
                }
                Ok(())
            }
        }
    }
}
