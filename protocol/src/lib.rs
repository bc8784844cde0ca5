//! Types shared between the draftpad composer and the collaborators it talks to.
//!
//! Kept free of terminal and runtime dependencies so the binary, the composer, and any alternative
//! front end can agree on the same attachment and submission shapes.

pub mod agent;
pub mod attachment;
pub mod submission;

pub use agent::AgentEvent;
pub use agent::AgentOp;
pub use attachment::AttachmentId;
pub use attachment::ImageFormat;
pub use attachment::SaveImageRequest;
pub use attachment::SaveImageResponse;
pub use submission::Submission;
