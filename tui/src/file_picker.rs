//! File picker backed by an external command such as `fzf`.
//!
//! The command inherits the terminal (the event loop suspends the TUI while it runs) and prints
//! the chosen path on stdout.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;

use crate::services::FilePicker;
use crate::services::FilePickerError;

/// Exit codes that mean "nothing chosen": fzf uses 1 for no match and 130 for Esc/Ctrl+C.
const DISMISSED_EXIT_CODES: [i32; 2] = [1, 130];

#[derive(Debug, Clone, Default)]
pub struct CommandFilePicker {
    command: Option<String>,
}

impl CommandFilePicker {
    /// `command` is a shell-style command line, e.g. `fzf --height 40%`.
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }

    fn argv(&self) -> Result<Vec<String>, FilePickerError> {
        let command = self
            .command
            .as_deref()
            .map(str::trim)
            .filter(|command| !command.is_empty())
            .ok_or(FilePickerError::NotConfigured)?;
        shlex::split(command)
            .filter(|argv| !argv.is_empty())
            .ok_or_else(|| FilePickerError::CommandNotFound(command.to_string()))
    }
}

#[async_trait]
impl FilePicker for CommandFilePicker {
    async fn choose_file_or_directory(&self) -> Result<Option<PathBuf>, FilePickerError> {
        let argv = self.argv()?;
        let program = which::which(&argv[0])
            .map_err(|_| FilePickerError::CommandNotFound(argv[0].clone()))?;

        let output = tokio::process::Command::new(program)
            .args(&argv[1..])
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .stdout(Stdio::piped())
            .output()
            .await?;

        match output.status.code() {
            Some(0) => Ok(parse_choice(&String::from_utf8_lossy(&output.stdout))),
            Some(code) if DISMISSED_EXIT_CODES.contains(&code) => Ok(None),
            Some(code) => Err(FilePickerError::Failed(code)),
            // Killed by a signal.
            None => Ok(None),
        }
    }
}

fn parse_choice(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(PathBuf::from)
}
