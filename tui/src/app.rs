//! The event loop: terminal input, background completions, agent output, and composer timers.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossterm::event::Event;
use crossterm::event::KeyEvent;
use draftpad_protocol::AgentEvent;
use draftpad_protocol::AgentOp;
use draftpad_protocol::Submission;
use ratatui::Frame;
use ratatui::layout::Constraint;
use ratatui::layout::Layout;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;

use crate::app_event::AppEvent;
use crate::app_event_sender::AppEventSender;
use crate::composer::ComposerConfig;
use crate::composer::InputResult;
use crate::composer::InputSession;
use crate::draft_file::DraftFile;
use crate::exit::AppExitInfo;
use crate::exit::ExitReason;
use crate::file_picker::CommandFilePicker;
use crate::prompt_history_store::PromptHistoryStore;
use crate::render::Renderable;
use crate::services::FilePicker;
use crate::temp_image_store::TempImageStore;
use crate::transcript::Transcript;
use crate::tui;
use crate::tui::Tui;

#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub composer: ComposerConfig,
    /// Persisted prompt history. `None` keeps history in memory only.
    pub history_path: Option<PathBuf>,
    /// Where the unsent draft is kept between runs. `None` disables draft persistence.
    pub draft_path: Option<PathBuf>,
    /// Directory for pasted images. Defaults to a directory under the system temp dir.
    pub image_dir: Option<PathBuf>,
    /// Shell-style command line for the file picker, e.g. `fzf`.
    pub picker_command: Option<String>,
}

/// The two ends of the agent connection owned by the UI.
pub struct AgentChannels {
    pub op_tx: UnboundedSender<AgentOp>,
    pub event_rx: UnboundedReceiver<AgentEvent>,
}

/// Run the interactive session until the user exits.
pub async fn run_app(options: AppOptions, agent: AgentChannels) -> anyhow::Result<AppExitInfo> {
    let (app_event_tx, app_event_rx) = unbounded_channel();
    let mut app = App::new(options, agent.op_tx, AppEventSender::new(app_event_tx));

    let mut terminal = tui::init()?;
    terminal.clear()?;
    let mut tui = Tui::new(terminal);

    let result = app.run(&mut tui, app_event_rx, agent.event_rx).await;
    app.session.flush_draft();
    app.persist_draft();
    app.session.dispose();
    result
}

enum Step {
    Terminal(Option<io::Result<Event>>),
    App(AppEvent),
    Agent(Option<AgentEvent>),
    Tick,
}

struct App {
    session: InputSession,
    transcript: Transcript,
    picker: CommandFilePicker,
    draft_file: Option<DraftFile>,
    /// History text of every message sent this session, newest first.
    sent: Vec<String>,
    agent_op_tx: UnboundedSender<AgentOp>,
    agent_connected: bool,
}

impl App {
    fn new(
        options: AppOptions,
        agent_op_tx: UnboundedSender<AgentOp>,
        app_event_tx: AppEventSender,
    ) -> Self {
        let history = PromptHistoryStore::new_with_path(options.history_path);
        let images = match options.image_dir {
            Some(dir) => TempImageStore::new(dir),
            None => TempImageStore::in_temp_dir(),
        };
        let mut session = InputSession::new(
            options.composer,
            Arc::new(images),
            Box::new(history),
            app_event_tx,
        );

        let mut draft_file = options.draft_path.map(DraftFile::new);
        if let Some(file) = draft_file.as_mut() {
            match file.load() {
                Ok(text) if !text.is_empty() => session.reset_draft(text),
                Ok(_) => {}
                Err(err) => tracing::warn!("failed to restore draft: {err:#}"),
            }
        }

        Self {
            session,
            transcript: Transcript::default(),
            picker: CommandFilePicker::new(options.picker_command),
            draft_file,
            sent: Vec::new(),
            agent_op_tx,
            agent_connected: true,
        }
    }

    async fn run(
        &mut self,
        tui: &mut Tui,
        mut app_event_rx: UnboundedReceiver<AppEvent>,
        mut agent_event_rx: UnboundedReceiver<AgentEvent>,
    ) -> anyhow::Result<AppExitInfo> {
        loop {
            tui.draw(|frame| self.draw(frame))?;

            let deadline = self.session.next_deadline();
            let step = tokio::select! {
                event = tui.next_event() => Step::Terminal(event),
                Some(event) = app_event_rx.recv() => Step::App(event),
                event = agent_event_rx.recv(), if self.agent_connected => Step::Agent(event),
                () = sleep_until(deadline) => Step::Tick,
            };

            match step {
                Step::Terminal(None) => return Ok(self.exit_info(ExitReason::InputClosed)),
                Step::Terminal(Some(event)) => {
                    if let Some(reason) = self.handle_terminal_event(event?) {
                        return Ok(self.exit_info(reason));
                    }
                }
                Step::App(event) => self.handle_app_event(tui, event).await?,
                Step::Agent(event) => self.handle_agent_event(event),
                Step::Tick => {
                    self.session.on_tick(Instant::now());
                }
            }
            self.persist_draft();
        }
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        let area = frame.area();
        let composer_height = self.session.desired_height(area.width).min(area.height);
        let [transcript_area, composer_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(composer_height)])
                .areas(area);
        self.transcript.render(transcript_area, frame.buffer_mut());
        self.session.render(composer_area, frame.buffer_mut());
        if let Some((x, y)) = self.session.cursor_pos(composer_area) {
            frame.set_cursor_position((x, y));
        }
    }

    fn handle_terminal_event(&mut self, event: Event) -> Option<ExitReason> {
        match event {
            Event::Key(key) => return self.handle_key_event(key),
            Event::Paste(pasted) => self.session.handle_paste(pasted, Instant::now()),
            _ => {}
        }
        None
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Option<ExitReason> {
        match self.session.handle_key_event(key, Instant::now()) {
            InputResult::None => {}
            InputResult::Submitted(submission) => self.submit(submission),
            InputResult::Stop => {
                self.send_op(AgentOp::Stop);
                self.transcript.push_status("stopping…");
            }
            InputResult::Exit => return Some(ExitReason::UserRequested),
        }
        None
    }

    async fn handle_app_event(&mut self, tui: &mut Tui, event: AppEvent) -> io::Result<()> {
        match event {
            AppEvent::ImageSaved(response) => {
                self.session.on_image_saved(response);
            }
            AppEvent::OpenFilePicker => {
                let picked = tui
                    .with_restored(self.picker.choose_file_or_directory())
                    .await?;
                self.session.on_file_picked(picked);
            }
        }
        Ok(())
    }

    fn handle_agent_event(&mut self, event: Option<AgentEvent>) {
        match event {
            Some(AgentEvent::Output { line }) => self.transcript.push_agent(line),
            Some(AgentEvent::Finished { success }) => {
                self.session.set_task_running(false);
                if !success {
                    self.transcript.push_status("task ended without success");
                }
            }
            Some(AgentEvent::Error { message }) => {
                self.session.set_task_running(false);
                self.transcript.push_error(message);
            }
            None => {
                tracing::warn!("agent event channel closed");
                self.agent_connected = false;
                self.session.set_task_running(false);
                self.transcript.push_error("agent disconnected");
            }
        }
    }

    fn submit(&mut self, submission: Submission) {
        tracing::info!(
            attachments = submission.attachments.len(),
            "submitting message"
        );
        self.transcript.push_user(submission.payload.clone());
        self.sent.insert(0, submission.history_text.clone());
        self.session.set_session_history(self.sent.clone());
        if self.agent_connected {
            self.session.set_task_running(true);
        }
        self.send_op(AgentOp::Submit(submission));
    }

    fn send_op(&mut self, op: AgentOp) {
        if self.agent_op_tx.send(op).is_err() {
            tracing::warn!("agent op channel closed");
            self.agent_connected = false;
            self.session.set_task_running(false);
        }
    }

    fn persist_draft(&mut self) {
        let Some(file) = self.draft_file.as_mut() else {
            return;
        };
        if let Err(err) = file.save(self.session.committed_text()) {
            tracing::warn!("failed to persist draft: {err:#}");
        }
    }

    fn exit_info(&self, exit_reason: ExitReason) -> AppExitInfo {
        AppExitInfo {
            messages_sent: self.sent.len(),
            exit_reason,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        }
        None => std::future::pending().await,
    }
}
