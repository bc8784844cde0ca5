//! Collaborator contracts consumed by the composer.
//!
//! The composer only depends on these traits. The workspace ships concrete implementations
//! (`TempImageStore`, `PromptHistoryStore`, `CommandFilePicker`), and tests substitute in-memory
//! fakes.

use std::io;
use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use draftpad_protocol::SaveImageRequest;
use draftpad_protocol::SaveImageResponse;

/// Persists pasted images so they can be referenced by path in a submission.
#[async_trait]
pub trait TempFileService: Send + Sync {
    /// Persist `request.bytes`.
    ///
    /// `Ok` responses may still carry a service-reported error; `Err` means the request never
    /// reached the service (transport failure). The composer treats both as a failed save.
    async fn save(&self, request: SaveImageRequest) -> Result<SaveImageResponse, TempFileError>;

    /// Delete a previously persisted file. Callers fire and forget.
    async fn delete(&self, path: &Path) -> Result<(), TempFileError>;
}

/// Global prompt history shared across sessions.
pub trait HistoryStore: Send {
    fn append_message(&mut self, text: &str);

    /// Entries ordered most recent first.
    fn recent_messages(&self) -> Vec<String>;
}

/// Lets the user pick a file or directory to reference in the draft.
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Returns `Ok(None)` when the user dismissed the picker.
    async fn choose_file_or_directory(&self) -> Result<Option<PathBuf>, FilePickerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TempFileError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("refusing to delete {} outside the image store", .0.display())]
    OutsideStore(PathBuf),
    #[error("temp-file service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FilePickerError {
    #[error("no file picker configured")]
    NotConfigured,
    #[error("file picker command `{0}` not found")]
    CommandNotFound(String),
    #[error("failed to run file picker: {0}")]
    Spawn(#[from] io::Error),
    #[error("file picker exited with status {0}")]
    Failed(i32),
}
