use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// A message accepted by the composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Text sent to the agent: the trimmed draft followed by the persisted attachment paths.
    pub payload: String,
    /// Text recorded in prompt history. This is the draft as typed (not trimmed), or the joined
    /// attachment paths when the draft was empty.
    pub history_text: String,
    /// Persisted paths of the attachments included in `payload`, in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<PathBuf>,
}
