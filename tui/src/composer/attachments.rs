//! Pasted image attachments and their asynchronous save lifecycle.
//!
//! Entries live in display order and are always addressed by [`AttachmentId`]. Each admitted
//! image gets its own save task; tasks report back through [`AppEvent::ImageSaved`] and the event
//! loop hands the response to [`AttachmentPipeline::on_saved`], the single place where entries
//! change state. Completions may arrive in any order, and a completion for an entry that has been
//! removed in the meantime simply finds nothing to update.
//!
//! Validation failures (too many images, oversized or undecodable data) never start a save.
//! They become preview-less `Error` entries ("notices") that expire on their own.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use draftpad_protocol::AttachmentId;
use draftpad_protocol::ImageFormat;
use draftpad_protocol::SaveImageRequest;
use draftpad_protocol::SaveImageResponse;
use tokio::task::AbortHandle;

use crate::app_event::AppEvent;
use crate::app_event_sender::AppEventSender;
use crate::services::TempFileService;

pub const DEFAULT_MAX_ATTACHMENTS: usize = 5;
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_NOTICE_TIMEOUT: Duration = Duration::from_secs(3);

/// Error badges are rendered inline, so messages are capped.
const MAX_ERROR_MESSAGE_CHARS: usize = 120;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentLimits {
    pub max_per_message: usize,
    pub max_image_bytes: u64,
    pub notice_timeout: Duration,
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self {
            max_per_message: DEFAULT_MAX_ATTACHMENTS,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            notice_timeout: DEFAULT_NOTICE_TIMEOUT,
        }
    }
}

/// Raw image data as delivered by a paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PastedImage {
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

/// Decoded metadata kept for rendering and for re-issuing a failed save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePreview {
    pub bytes: Arc<[u8]>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentState {
    Loading,
    Ready { persisted_path: PathBuf },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: AttachmentId,
    /// `None` for validation notices.
    pub preview: Option<ImagePreview>,
    pub state: AttachmentState,
    /// Set for notices only; the entry disappears once this passes.
    pub expires_at: Option<Instant>,
}

impl Attachment {
    pub fn is_notice(&self) -> bool {
        self.preview.is_none()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AttachmentState::Loading)
    }

    pub fn persisted_path(&self) -> Option<&Path> {
        match &self.state {
            AttachmentState::Ready { persisted_path } => Some(persisted_path),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            AttachmentState::Error { message } => Some(message),
            _ => None,
        }
    }

    /// Only real images that failed to persist can be retried.
    pub fn can_retry(&self) -> bool {
        self.preview.is_some() && self.error_message().is_some()
    }
}

/// Why an image never entered the save pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttachmentRejection {
    #[error("Cannot paste {pasted} image(s). Maximum {max} images per message allowed.")]
    TooMany { pasted: usize, max: usize },
    #[error("Image file too large ({size_mb}MB). Maximum {max_mb}MB allowed.")]
    TooLarge { size_mb: u64, max_mb: u64 },
    #[error("Unsupported image data: {0}")]
    Undecodable(String),
}

pub struct AttachmentPipeline {
    entries: Vec<Attachment>,
    in_flight: HashMap<AttachmentId, AbortHandle>,
    temp_files: Arc<dyn TempFileService>,
    app_event_tx: AppEventSender,
    limits: AttachmentLimits,
}

impl AttachmentPipeline {
    pub fn new(
        temp_files: Arc<dyn TempFileService>,
        app_event_tx: AppEventSender,
        limits: AttachmentLimits,
    ) -> Self {
        Self {
            entries: Vec::new(),
            in_flight: HashMap::new(),
            temp_files,
            app_event_tx,
            limits,
        }
    }

    pub fn entries(&self) -> &[Attachment] {
        &self.entries
    }

    pub fn get(&self, id: AttachmentId) -> Option<&Attachment> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.entries.iter().any(Attachment::is_loading)
    }

    /// Persisted paths of every ready attachment, in display order.
    pub fn ready_paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter_map(|entry| entry.persisted_path().map(Path::to_path_buf))
            .collect()
    }

    /// Admit a paste batch. Returns the ids of the images that entered `Loading`.
    ///
    /// The count check applies to the whole batch: if it would push the number of images past
    /// the limit, nothing from the batch is admitted. Size and decode checks apply per image.
    pub fn paste(&mut self, images: Vec<PastedImage>, now: Instant) -> Vec<AttachmentId> {
        if images.is_empty() {
            return Vec::new();
        }

        let existing = self.entries.iter().filter(|e| !e.is_notice()).count();
        if existing + images.len() > self.limits.max_per_message {
            let rejection = AttachmentRejection::TooMany {
                pasted: images.len(),
                max: self.limits.max_per_message,
            };
            tracing::debug!(existing, pasted = images.len(), "rejecting paste batch");
            self.push_notice(&rejection, now);
            return Vec::new();
        }

        let mut admitted = Vec::new();
        for image in images {
            match self.validate(image) {
                Ok(preview) => {
                    let id = AttachmentId::new();
                    self.entries.push(Attachment {
                        id,
                        preview: Some(preview),
                        state: AttachmentState::Loading,
                        expires_at: None,
                    });
                    self.spawn_save(id);
                    admitted.push(id);
                }
                Err(rejection) => {
                    tracing::debug!("rejecting pasted image: {rejection}");
                    self.push_notice(&rejection, now);
                }
            }
        }
        admitted
    }

    /// Reconcile a finished save. Returns `true` when an entry changed.
    pub fn on_saved(&mut self, response: SaveImageResponse) -> bool {
        self.in_flight.remove(&response.id);
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == response.id) else {
            tracing::debug!(attachment_id = %response.id, "ignoring save for removed attachment");
            return false;
        };
        if !entry.is_loading() {
            tracing::debug!(attachment_id = %response.id, "ignoring duplicate save completion");
            return false;
        }

        entry.state = match (response.persisted_path, response.error) {
            (Some(persisted_path), None) => {
                tracing::debug!(
                    attachment_id = %response.id,
                    path = %persisted_path.display(),
                    "attachment ready"
                );
                AttachmentState::Ready { persisted_path }
            }
            (_, Some(error)) => {
                tracing::warn!(attachment_id = %response.id, "failed to save image: {error}");
                AttachmentState::Error {
                    message: bounded_message(&error),
                }
            }
            (None, None) => AttachmentState::Error {
                message: "Failed to save image".to_string(),
            },
        };
        true
    }

    /// Re-issue the save for an errored image. Returns `false` when `id` is not retryable.
    pub fn retry(&mut self, id: AttachmentId) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        if !entry.can_retry() {
            return false;
        }
        entry.state = AttachmentState::Loading;
        self.spawn_save(id);
        true
    }

    /// Retry every errored image. Returns how many saves were re-issued.
    pub fn retry_all(&mut self) -> usize {
        let ids: Vec<AttachmentId> = self
            .entries
            .iter()
            .filter(|e| e.can_retry())
            .map(|e| e.id)
            .collect();
        ids.into_iter().filter(|id| self.retry(*id)).count()
    }

    /// Drop an entry, cancelling its save and deleting its persisted file (fire and forget).
    pub fn remove(&mut self, id: AttachmentId) -> bool {
        let Some(idx) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let entry = self.entries.remove(idx);
        if let Some(handle) = self.in_flight.remove(&id) {
            handle.abort();
        }
        if let AttachmentState::Ready { persisted_path } = entry.state {
            self.spawn_delete(persisted_path);
        }
        true
    }

    /// Remove the most recently added entry, if any.
    pub fn remove_last(&mut self) -> bool {
        match self.entries.last() {
            Some(entry) => self.remove(entry.id),
            None => false,
        }
    }

    /// Drop notices whose timeout has passed. Returns `true` when anything was removed.
    pub fn expire_notices(&mut self, now: Instant) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.expires_at.is_none_or(|expires_at| now < expires_at));
        self.entries.len() != before
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().filter_map(|e| e.expires_at).min()
    }

    /// Reset after a submission. Persisted files now belong to the submitted message, so nothing
    /// is deleted.
    pub fn clear(&mut self) {
        self.abort_in_flight();
        self.entries.clear();
    }

    /// Reset because the draft was replaced from outside: every persisted file is released.
    pub fn release_all(&mut self) {
        self.abort_in_flight();
        for entry in std::mem::take(&mut self.entries) {
            if let AttachmentState::Ready { persisted_path } = entry.state {
                self.spawn_delete(persisted_path);
            }
        }
    }

    fn validate(&self, image: PastedImage) -> Result<ImagePreview, AttachmentRejection> {
        let size = image.bytes.len() as u64;
        if size > self.limits.max_image_bytes {
            return Err(AttachmentRejection::TooLarge {
                size_mb: (size as f64 / BYTES_PER_MB).round() as u64,
                max_mb: (self.limits.max_image_bytes as f64 / BYTES_PER_MB).round() as u64,
            });
        }
        decode_preview(image)
    }

    fn push_notice(&mut self, rejection: &AttachmentRejection, now: Instant) {
        self.entries.push(Attachment {
            id: AttachmentId::new(),
            preview: None,
            state: AttachmentState::Error {
                message: bounded_message(&rejection.to_string()),
            },
            expires_at: Some(now + self.limits.notice_timeout),
        });
    }

    fn spawn_save(&mut self, id: AttachmentId) {
        let Some(preview) = self.get(id).and_then(|e| e.preview.as_ref()) else {
            return;
        };
        let request = SaveImageRequest {
            id,
            bytes: Arc::clone(&preview.bytes),
            format: preview.format,
        };
        let temp_files = Arc::clone(&self.temp_files);
        let app_event_tx = self.app_event_tx.clone();
        let handle = tokio::spawn(async move {
            let response = match temp_files.save(request).await {
                Ok(response) => response,
                Err(err) => SaveImageResponse::failed(id, err.to_string()),
            };
            app_event_tx.send(AppEvent::ImageSaved(response));
        });
        if let Some(previous) = self.in_flight.insert(id, handle.abort_handle()) {
            previous.abort();
        }
    }

    fn spawn_delete(&self, path: PathBuf) {
        let temp_files = Arc::clone(&self.temp_files);
        tokio::spawn(async move {
            if let Err(err) = temp_files.delete(&path).await {
                tracing::warn!("failed to delete attachment file: {err}");
            }
        });
    }

    fn abort_in_flight(&mut self) {
        for (_, handle) in self.in_flight.drain() {
            handle.abort();
        }
    }
}

impl Drop for AttachmentPipeline {
    fn drop(&mut self) {
        self.abort_in_flight();
    }
}

fn decode_preview(image: PastedImage) -> Result<ImagePreview, AttachmentRejection> {
    let reader = image::ImageReader::new(Cursor::new(image.bytes.as_slice()))
        .with_guessed_format()
        .map_err(|err| AttachmentRejection::Undecodable(err.to_string()))?;
    let format = match reader.format() {
        Some(image::ImageFormat::Png) => ImageFormat::Png,
        Some(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
        Some(image::ImageFormat::Gif) => ImageFormat::Gif,
        Some(image::ImageFormat::WebP) => ImageFormat::Webp,
        _ => image
            .mime
            .as_deref()
            .map_or(ImageFormat::Other, ImageFormat::from_mime),
    };
    let (width, height) = reader
        .into_dimensions()
        .map_err(|err| AttachmentRejection::Undecodable(err.to_string()))?;
    Ok(ImagePreview {
        bytes: Arc::from(image.bytes),
        format,
        width,
        height,
    })
}

fn bounded_message(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_MESSAGE_CHARS {
        return message.to_string();
    }
    let mut truncated: String = message.chars().take(MAX_ERROR_MESSAGE_CHARS - 1).collect();
    truncated.push('…');
    truncated
}
