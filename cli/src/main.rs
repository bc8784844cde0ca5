mod agent_runner;
mod config;

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use draftpad_tui::AgentChannels;
use draftpad_tui::AppOptions;
use tokio::sync::mpsc::unbounded_channel;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigStore;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Compose messages (text, file paths, pasted images) and hand them to an agent command"
)]
struct Cli {
    /// Command that receives each message on stdin. Its output is shown above the composer.
    /// Without one, messages are echoed back.
    #[arg(long, env = "DRAFTPAD_AGENT_CMD")]
    agent_cmd: Option<String>,

    /// File picker opened with Ctrl+O, e.g. `fzf`. It must print the chosen path on stdout.
    #[arg(long, env = "DRAFTPAD_PICKER_CMD")]
    picker_cmd: Option<String>,

    /// Quiet period (milliseconds) before the draft is committed and saved.
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Config file to read instead of `~/.draftpad/config.toml`.
    #[arg(long, env = "DRAFTPAD_CONFIG")]
    config: Option<PathBuf>,

    /// Do not restore or save the unsent draft.
    #[arg(long)]
    no_draft: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let home = dirs::home_dir().context("cannot determine home directory")?;
    init_logging(&home)?;

    let store = ConfigStore::new(
        cli.config
            .clone()
            .unwrap_or_else(|| config::default_config_path(&home)),
    );
    let mut file_config = store
        .load()
        .with_context(|| format!("load config from {}", store.path().display()))?;
    if cli.debounce_ms.is_some() {
        file_config.debounce_ms = cli.debounce_ms;
    }

    let options = AppOptions {
        composer: file_config.composer_config(),
        history_path: Some(draftpad_tui::default_history_path(&home)),
        draft_path: (!cli.no_draft).then(|| draftpad_tui::default_draft_path(&home)),
        image_dir: None,
        picker_command: cli.picker_cmd.or(file_config.picker_command),
    };
    let agent_command = cli.agent_cmd.or(file_config.agent_command);
    tracing::info!(
        config = %store.path().display(),
        agent = agent_command.as_deref().unwrap_or("<echo>"),
        "starting draftpad"
    );

    let (op_tx, op_rx) = unbounded_channel();
    let (event_tx, event_rx) = unbounded_channel();
    let runner = tokio::spawn(agent_runner::run_agent_loop(agent_command, op_rx, event_tx));

    let exit = draftpad_tui::run_app(options, AgentChannels { op_tx, event_rx }).await;
    runner.abort();

    let exit = exit?;
    tracing::info!(
        messages_sent = exit.messages_sent,
        reason = ?exit.exit_reason,
        "draftpad exited"
    );
    Ok(())
}

/// Log to `~/.draftpad/log/draftpad.log`; the terminal belongs to the TUI.
fn init_logging(home: &Path) -> anyhow::Result<()> {
    let log_dir = home.join(".draftpad").join("log");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("create log directory {}", log_dir.display()))?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("draftpad.log"))
        .context("open draftpad.log")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("draftpad=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}
