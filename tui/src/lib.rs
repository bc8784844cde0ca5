// Forbid accidental stdout/stderr writes in the library portion of the TUI.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod app;
mod app_event;
mod app_event_sender;
mod atomic_write;
mod clipboard_paste;
pub mod composer;
mod draft_file;
mod exit;
mod file_picker;
mod prompt_history_store;
mod render;
pub mod services;
mod temp_image_store;
mod transcript;
mod tui;

pub use app::AgentChannels;
pub use app::AppOptions;
pub use app::run_app;
pub use draft_file::default_draft_path;
pub use exit::AppExitInfo;
pub use exit::ExitReason;
pub use file_picker::CommandFilePicker;
pub use prompt_history_store::PromptHistoryStore;
pub use prompt_history_store::default_history_path;
pub use temp_image_store::TempImageStore;
