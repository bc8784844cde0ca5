//! The message composer: draft, history browsing and search, and image attachments.

use std::time::Duration;

pub mod attachments;
pub mod draft_store;
pub mod history_navigation;
pub mod history_search;
pub mod history_sources;
pub mod input_session;
mod render;
pub mod submission;
mod text_buffer;

pub use attachments::Attachment;
pub use attachments::AttachmentLimits;
pub use attachments::AttachmentState;
pub use attachments::PastedImage;
pub use input_session::InputResult;
pub use input_session::InputSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposerConfig {
    /// Quiet period before the committed draft follows the displayed one.
    pub debounce: Duration,
    pub attachment_limits: AttachmentLimits,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            debounce: draft_store::DEFAULT_DEBOUNCE,
            attachment_limits: AttachmentLimits::default(),
        }
    }
}
