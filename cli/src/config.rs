use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use draftpad_tui::composer::AttachmentLimits;
use draftpad_tui::composer::ComposerConfig;
use toml_edit::DocumentMut;
use toml_edit::Item as TomlItem;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Values read from `config.toml`. Every key is optional; absent keys fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub debounce_ms: Option<u64>,
    pub notice_timeout_ms: Option<u64>,
    pub max_per_message: Option<usize>,
    pub max_image_mb: Option<u64>,
    pub picker_command: Option<String>,
    pub agent_command: Option<String>,
}

impl FileConfig {
    pub fn composer_config(&self) -> ComposerConfig {
        let defaults = ComposerConfig::default();
        let limits = defaults.attachment_limits;
        ComposerConfig {
            debounce: self
                .debounce_ms
                .map_or(defaults.debounce, Duration::from_millis),
            attachment_limits: AttachmentLimits {
                max_per_message: self.max_per_message.unwrap_or(limits.max_per_message),
                max_image_bytes: self
                    .max_image_mb
                    .map_or(limits.max_image_bytes, |mb| mb.saturating_mul(BYTES_PER_MB)),
                notice_timeout: self
                    .notice_timeout_ms
                    .map_or(limits.notice_timeout, Duration::from_millis),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config file. A missing file yields defaults; a file that is not valid TOML is
    /// scanned line by line so one typo does not discard every setting.
    pub fn load(&self) -> anyhow::Result<FileConfig> {
        let Some(content) = read_document_string(&self.path)? else {
            return Ok(FileConfig::default());
        };

        match content.parse::<DocumentMut>() {
            Ok(doc) => Ok(read_file_config(&doc)),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "config is not valid TOML, falling back to line parsing: {err}"
                );
                Ok(parse_file_config_fallback(&content))
            }
        }
    }
}

pub fn default_config_path(home: &Path) -> PathBuf {
    home.join(".draftpad").join("config.toml")
}

fn read_file_config(doc: &DocumentMut) -> FileConfig {
    FileConfig {
        debounce_ms: read_u64(doc, None, "debounce_ms"),
        notice_timeout_ms: read_u64(doc, None, "notice_timeout_ms"),
        max_per_message: read_u64(doc, Some("attachments"), "max_per_message")
            .and_then(|n| usize::try_from(n).ok()),
        max_image_mb: read_u64(doc, Some("attachments"), "max_image_mb"),
        picker_command: read_string(doc, Some("picker"), "command"),
        agent_command: read_string(doc, None, "agent_command"),
    }
}

fn lookup<'a>(doc: &'a DocumentMut, table: Option<&str>, key: &str) -> Option<&'a TomlItem> {
    match table {
        Some(table) => doc.get(table).and_then(TomlItem::as_table)?.get(key),
        None => doc.get(key),
    }
}

fn read_u64(doc: &DocumentMut, table: Option<&str>, key: &str) -> Option<u64> {
    lookup(doc, table, key)
        .and_then(TomlItem::as_integer)
        .and_then(|n| u64::try_from(n).ok())
}

fn read_string(doc: &DocumentMut, table: Option<&str>, key: &str) -> Option<String> {
    lookup(doc, table, key)
        .and_then(TomlItem::as_str)
        .map(ToString::to_string)
}

fn parse_file_config_fallback(contents: &str) -> FileConfig {
    let mut config = FileConfig::default();
    let mut table: Option<String> = None;

    for line in contents.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            table = parse_table_header_name(trimmed).map(ToString::to_string);
            continue;
        }

        let Some(line) = strip_toml_comment(trimmed) else {
            continue;
        };
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        match (table.as_deref(), key) {
            (None, "debounce_ms") => config.debounce_ms = parse_u64(value),
            (None, "notice_timeout_ms") => config.notice_timeout_ms = parse_u64(value),
            (None, "agent_command") => config.agent_command = parse_string(value),
            (Some("attachments"), "max_per_message") => {
                config.max_per_message = parse_u64(value).and_then(|n| usize::try_from(n).ok());
            }
            (Some("attachments"), "max_image_mb") => config.max_image_mb = parse_u64(value),
            (Some("picker"), "command") => config.picker_command = parse_string(value),
            _ => {}
        }
    }

    config
}

fn parse_u64(value: &str) -> Option<u64> {
    value.replace('_', "").parse().ok()
}

fn parse_string(value: &str) -> Option<String> {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
        .map(ToString::to_string)
}

fn parse_table_header_name(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if !line.starts_with('[') {
        return None;
    }
    let end = line.find(']')?;
    if end <= 1 {
        return None;
    }
    let name = line[1..end].trim();
    if name.is_empty() {
        return None;
    }
    Some(name)
}

fn strip_toml_comment(line: &str) -> Option<&str> {
    let line = line.split_once('#').map_or(line, |(head, _)| head).trim();
    if line.is_empty() { None } else { Some(line) }
}

fn read_document_string(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_with(contents: &str) -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).expect("write config");
        (dir, ConfigStore::new(path))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("config.toml"));
        let config = store.load().expect("load");
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.composer_config(), ComposerConfig::default());
    }

    #[test]
    fn reads_all_keys() {
        let (_dir, store) = store_with(
            r#"# top comment
debounce_ms = 300
notice_timeout_ms = 5_000
agent_command = "cat -n"

[attachments]
max_per_message = 3
max_image_mb = 2

[picker]
command = "fzf --height 40%"
"#,
        );

        let config = store.load().expect("load");
        assert_eq!(
            config,
            FileConfig {
                debounce_ms: Some(300),
                notice_timeout_ms: Some(5_000),
                max_per_message: Some(3),
                max_image_mb: Some(2),
                picker_command: Some("fzf --height 40%".to_string()),
                agent_command: Some("cat -n".to_string()),
            }
        );

        let composer = config.composer_config();
        assert_eq!(composer.debounce, Duration::from_millis(300));
        assert_eq!(composer.attachment_limits.max_per_message, 3);
        assert_eq!(composer.attachment_limits.max_image_bytes, 2 * 1024 * 1024);
        assert_eq!(
            composer.attachment_limits.notice_timeout,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn wrong_types_and_negative_values_are_ignored() {
        let (_dir, store) = store_with(
            r#"debounce_ms = "fast"
notice_timeout_ms = -1
agent_command = 7
"#,
        );
        assert_eq!(store.load().expect("load"), FileConfig::default());
    }

    #[test]
    fn reads_values_when_toml_is_invalid() {
        let (_dir, store) = store_with(
            r#"# broken table header makes this TOML invalid
[other
key = 1

[attachments]
max_per_message = 2 # keep me

[picker]
command = 'sk'
"#,
        );

        let config = store.load().expect("load");
        assert_eq!(config.max_per_message, Some(2));
        assert_eq!(config.picker_command.as_deref(), Some("sk"));
        assert_eq!(config.debounce_ms, None);
    }

    #[test]
    fn default_config_path_uses_draftpad_home_dir() {
        let home = Path::new("home");
        assert_eq!(
            default_config_path(home),
            home.join(".draftpad").join("config.toml")
        );
    }
}
