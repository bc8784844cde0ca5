//! Turns paste payloads into attachments, dropped paths, or plain text.
//!
//! Terminals deliver drag-and-drop as a bracketed paste of one or more (possibly shell-escaped)
//! paths, so a paste is classified before it reaches the draft. Images can also be read straight
//! from the system clipboard.

use std::io;
use std::io::Cursor;
use std::path::Path;
use std::path::PathBuf;

use draftpad_protocol::ImageFormat;

use crate::composer::PastedImage;

#[derive(Debug, thiserror::Error)]
pub enum PasteImageError {
    #[error("clipboard unavailable: {0}")]
    ClipboardUnavailable(String),
    #[error("no image on the clipboard: {0}")]
    NoImage(String),
    #[error("failed to encode clipboard image: {0}")]
    EncodeFailed(String),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a paste should turn into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteKind {
    /// Every pasted path is an existing image file.
    ImageFiles(Vec<PathBuf>),
    /// Existing files or directories to reference in the draft.
    Paths(Vec<PathBuf>),
    Text,
}

pub fn classify_paste(pasted: &str) -> PasteKind {
    let Some(paths) = existing_pasted_paths(pasted) else {
        return PasteKind::Text;
    };
    if paths.iter().all(|path| is_image_file(path)) {
        PasteKind::ImageFiles(paths)
    } else {
        PasteKind::Paths(paths)
    }
}

/// All pasted tokens as paths, or `None` unless every one of them exists.
fn existing_pasted_paths(pasted: &str) -> Option<Vec<PathBuf>> {
    let pasted = pasted.trim();
    if pasted.is_empty() {
        return None;
    }

    if let Some(path) = normalize_pasted_path(pasted)
        && path.exists()
    {
        return Some(vec![path]);
    }

    let tokens = shlex::split(pasted)?;
    if tokens.len() < 2 {
        return None;
    }
    tokens
        .iter()
        .map(|token| {
            let path = normalize_split_token(token);
            path.exists().then_some(path)
        })
        .collect()
}

/// A token `shlex::split` has already unquoted, so it may contain spaces.
fn normalize_split_token(token: &str) -> PathBuf {
    url_or_windows_path(token).unwrap_or_else(|| PathBuf::from(token))
}

/// Normalize pasted text that may represent a filesystem path.
///
/// Supports:
/// - `file://` URLs (converted to local paths)
/// - Windows/UNC paths (mapped under `/mnt` on WSL)
/// - shell-escaped single paths (via `shlex`)
pub fn normalize_pasted_path(pasted: &str) -> Option<PathBuf> {
    let pasted = pasted.trim();
    if let Some(path) = url_or_windows_path(pasted) {
        return Some(path);
    }

    let mut parts = shlex::Shlex::new(pasted);
    match (parts.next(), parts.next()) {
        (Some(single), None) => Some(PathBuf::from(single)),
        _ => None,
    }
}

fn url_or_windows_path(pasted: &str) -> Option<PathBuf> {
    if let Ok(url) = url::Url::parse(pasted)
        && url.scheme() == "file"
    {
        return url.to_file_path().ok();
    }

    // POSIX shlex treats backslashes as escapes, so Windows paths bypass it.
    let looks_like_windows_path = {
        let drive = pasted
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && pasted.get(1..2) == Some(":")
            && pasted.get(2..3).is_some_and(|s| s == "\\" || s == "/");
        let unc = pasted.starts_with("\\\\");
        drive || unc
    };
    if looks_like_windows_path {
        #[cfg(target_os = "linux")]
        {
            if is_probably_wsl()
                && let Some(converted) = convert_windows_path_to_wsl(pasted)
            {
                return Some(converted);
            }
        }
        return Some(PathBuf::from(pasted));
    }
    None
}

#[cfg(target_os = "linux")]
pub fn is_probably_wsl() -> bool {
    if let Ok(version) = std::fs::read_to_string("/proc/version") {
        let version_lower = version.to_lowercase();
        if version_lower.contains("microsoft") || version_lower.contains("wsl") {
            return true;
        }
    }

    // Custom WSL kernels may not say so in /proc/version.
    std::env::var_os("WSL_DISTRO_NAME").is_some() || std::env::var_os("WSL_INTEROP").is_some()
}

#[cfg(target_os = "linux")]
fn convert_windows_path_to_wsl(input: &str) -> Option<PathBuf> {
    if input.starts_with("\\\\") {
        return None;
    }

    let drive_letter = input.chars().next()?.to_ascii_lowercase();
    if !drive_letter.is_ascii_lowercase() || input.get(1..2) != Some(":") {
        return None;
    }

    let mut result = PathBuf::from(format!("/mnt/{drive_letter}"));
    for component in input
        .get(2..)?
        .trim_start_matches(['\\', '/'])
        .split(['\\', '/'])
        .filter(|component| !component.is_empty())
    {
        result.push(component);
    }

    Some(result)
}

pub fn image_format_for_path(path: &Path) -> ImageFormat {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(ImageFormat::Other, ImageFormat::from_extension)
}

fn is_image_file(path: &Path) -> bool {
    path.is_file() && image_format_for_path(path) != ImageFormat::Other
}

pub fn read_image_file(path: &Path) -> Result<PastedImage, PasteImageError> {
    let bytes = std::fs::read(path).map_err(|source| PasteImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mime = match image_format_for_path(path) {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Webp => Some("image/webp"),
        ImageFormat::Other => None,
    };
    Ok(PastedImage {
        bytes,
        mime: mime.map(str::to_string),
    })
}

/// Read the clipboard image and re-encode it as PNG.
pub fn read_clipboard_image() -> Result<PastedImage, PasteImageError> {
    let mut clipboard = arboard::Clipboard::new()
        .map_err(|err| PasteImageError::ClipboardUnavailable(err.to_string()))?;
    let data = clipboard
        .get_image()
        .map_err(|err| PasteImageError::NoImage(err.to_string()))?;

    let width = u32::try_from(data.width)
        .map_err(|err| PasteImageError::EncodeFailed(err.to_string()))?;
    let height = u32::try_from(data.height)
        .map_err(|err| PasteImageError::EncodeFailed(err.to_string()))?;
    let rgba = image::RgbaImage::from_raw(width, height, data.bytes.into_owned()).ok_or_else(
        || PasteImageError::EncodeFailed("clipboard returned a truncated buffer".to_string()),
    )?;

    let mut png = Cursor::new(Vec::new());
    rgba.write_to(&mut png, image::ImageFormat::Png)
        .map_err(|err| PasteImageError::EncodeFailed(err.to_string()))?;
    tracing::debug!(width, height, "read clipboard image");
    Ok(PastedImage {
        bytes: png.into_inner(),
        mime: Some("image/png".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[cfg(not(windows))]
    #[test]
    fn normalize_file_url() {
        let result = normalize_pasted_path("file:///tmp/example.png").expect("file url");
        assert_eq!(result, PathBuf::from("/tmp/example.png"));
    }

    #[test]
    fn normalize_shell_escaped_single_path() {
        let result = normalize_pasted_path("/home/user/My\\ File.png").expect("escaped path");
        assert_eq!(result, PathBuf::from("/home/user/My File.png"));
    }

    #[test]
    fn normalize_quoted_paths() {
        assert_eq!(
            normalize_pasted_path("\"/home/user/My File.png\""),
            Some(PathBuf::from("/home/user/My File.png"))
        );
        assert_eq!(
            normalize_pasted_path("'/home/user/My File.png'"),
            Some(PathBuf::from("/home/user/My File.png"))
        );
    }

    #[test]
    fn normalize_multiple_tokens_returns_none() {
        assert_eq!(
            normalize_pasted_path("/home/user/a\\ b.png /home/user/c.png"),
            None
        );
    }

    #[test]
    fn normalize_unc_windows_path() {
        let input = r"\\server\share\folder\file.jpg";
        assert_eq!(normalize_pasted_path(input), Some(PathBuf::from(input)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn normalize_windows_path_in_wsl() {
        if !is_probably_wsl() {
            return;
        }
        let result = normalize_pasted_path(r"C:\Users\Alice\Pictures\example image.png")
            .expect("windows path");
        assert_eq!(
            result,
            PathBuf::from("/mnt/c/Users/Alice/Pictures/example image.png")
        );
    }

    #[test]
    fn image_format_from_path_extension() {
        assert_eq!(image_format_for_path(Path::new("/a/b/c.PNG")), ImageFormat::Png);
        assert_eq!(image_format_for_path(Path::new("/a/b/c.jpeg")), ImageFormat::Jpeg);
        assert_eq!(image_format_for_path(Path::new("/a/b/c.webp")), ImageFormat::Webp);
        assert_eq!(image_format_for_path(Path::new("/a/b/c")), ImageFormat::Other);
    }

    #[test]
    fn classify_existing_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = dir.path().join("shot one.png");
        let notes = dir.path().join("notes.md");
        std::fs::write(&image, b"png").expect("write image");
        std::fs::write(&notes, b"# notes").expect("write notes");

        let escaped_image = image.display().to_string().replace(' ', "\\ ");
        assert_eq!(
            classify_paste(&escaped_image),
            PasteKind::ImageFiles(vec![image.clone()])
        );

        let both = format!("{escaped_image} {}", notes.display());
        assert_eq!(classify_paste(&both), PasteKind::Paths(vec![image, notes]));

        let dir_only = dir.path().display().to_string();
        assert_eq!(
            classify_paste(&dir_only),
            PasteKind::Paths(vec![dir.path().to_path_buf()])
        );
    }

    #[test]
    fn classify_quoted_and_url_tokens_with_spaces() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("design notes.md");
        let second = dir.path().join("final shot.png");
        std::fs::write(&first, b"# notes").expect("write notes");
        std::fs::write(&second, b"png").expect("write image");

        let url = url::Url::from_file_path(&second).expect("file url");
        let pasted = format!("'{}' {url}", first.display());
        assert_eq!(classify_paste(&pasted), PasteKind::Paths(vec![first, second]));
    }

    #[test]
    fn classify_plain_text() {
        assert_eq!(classify_paste("hello world"), PasteKind::Text);
        assert_eq!(classify_paste("   "), PasteKind::Text);
        assert_eq!(classify_paste("/definitely/not/here.png"), PasteKind::Text);
    }

    #[test]
    fn read_image_file_reports_missing_files() {
        let err = read_image_file(Path::new("/definitely/not/here.png")).expect_err("missing");
        assert!(matches!(err, PasteImageError::Io { .. }));
    }
}
