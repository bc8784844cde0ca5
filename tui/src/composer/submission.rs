//! Builds the outbound message from the committed draft and ready attachments.

use std::path::PathBuf;

use draftpad_protocol::Submission;

/// Why a submit attempt was ignored. None of these are surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejection {
    #[error("an attachment is still saving")]
    AttachmentsLoading,
    #[error("nothing to submit")]
    Empty,
    #[error("a task is already running")]
    TaskRunning,
}

/// Assemble a submission.
///
/// The payload is the trimmed draft followed by the space-joined attachment paths. History keeps
/// the draft as typed (untrimmed), or the joined paths when the draft is blank.
pub fn assemble(
    committed_text: &str,
    ready_paths: Vec<PathBuf>,
    attachments_loading: bool,
) -> Result<Submission, SubmitRejection> {
    if attachments_loading {
        return Err(SubmitRejection::AttachmentsLoading);
    }

    let joined_paths = ready_paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let trimmed = committed_text.trim();

    let (payload, history_text) = match (trimmed.is_empty(), joined_paths.is_empty()) {
        (true, true) => return Err(SubmitRejection::Empty),
        (true, false) => (joined_paths.clone(), joined_paths),
        (false, true) => (trimmed.to_string(), committed_text.to_string()),
        (false, false) => (
            format!("{trimmed} {joined_paths}"),
            committed_text.to_string(),
        ),
    };

    Ok(Submission {
        payload,
        history_text,
        attachments: ready_paths,
    })
}
