//! Writes pasted images under a per-user temp directory so submissions can reference them by path.

use std::io;
use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use draftpad_protocol::SaveImageRequest;
use draftpad_protocol::SaveImageResponse;

use crate::services::TempFileError;
use crate::services::TempFileService;

const IMAGE_DIR_NAME: &str = "draftpad-images";

#[derive(Debug, Clone)]
pub struct TempImageStore {
    dir: PathBuf,
}

impl TempImageStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// `<system temp>/draftpad-images`.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join(IMAGE_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl TempFileService for TempImageStore {
    /// I/O failures are reported in the response so the attachment shows them and can be retried.
    async fn save(&self, request: SaveImageRequest) -> Result<SaveImageResponse, TempFileError> {
        let path = self
            .dir
            .join(format!("{}.{}", request.id, request.format.extension()));
        let written = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&path, &request.bytes[..]).await
        }
        .await;

        Ok(match written {
            Ok(()) => SaveImageResponse::saved(request.id, path),
            Err(err) => {
                tracing::warn!(path = %path.display(), "failed to write image: {err}");
                SaveImageResponse::failed(request.id, format!("Failed to save image: {err}"))
            }
        })
    }

    async fn delete(&self, path: &Path) -> Result<(), TempFileError> {
        if !path.starts_with(&self.dir) {
            return Err(TempFileError::OutsideStore(path.to_path_buf()));
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(TempFileError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
