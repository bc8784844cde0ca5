//! The input session: one draft, its history modes, and its attachments.
//!
//! `InputSession` owns every piece of composer state and is the only thing the event loop talks
//! to. It is driven by discrete calls (key events, pastes, save completions, timer ticks) that
//! each run to completion, so no locking is involved.
//!
//! Browsing history and searching history are variants of one [`ComposerMode`]: entering either
//! replaces the other, so their saved drafts can never both be live.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use draftpad_protocol::AttachmentId;
use draftpad_protocol::SaveImageResponse;
use draftpad_protocol::Submission;

use super::ComposerConfig;
use super::attachments::Attachment;
use super::attachments::AttachmentPipeline;
use super::attachments::PastedImage;
use super::draft_store::DraftStore;
use super::history_navigation::Navigation;
use super::history_navigation::NewerStep;
use super::history_search::SearchSession;
use super::history_sources::HistorySources;
use super::submission;
use super::submission::SubmitRejection;
use super::text_buffer::EditCommand;
use super::text_buffer::TextCursor;
use crate::app_event::AppEvent;
use crate::app_event_sender::AppEventSender;
use crate::clipboard_paste;
use crate::clipboard_paste::PasteKind;
use crate::services::FilePickerError;
use crate::services::HistoryStore;
use crate::services::TempFileService;

/// What the outer application should do after an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
    None,
    Submitted(Submission),
    /// Interrupt the running task.
    Stop,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ComposerMode {
    Editing,
    Navigating(Navigation),
    Searching(SearchSession),
}

pub struct InputSession {
    draft: DraftStore,
    cursor: TextCursor,
    attachments: AttachmentPipeline,
    mode: ComposerMode,
    /// Messages sent in this session, as supplied by the outer application.
    session_history: Vec<String>,
    history: Box<dyn HistoryStore>,
    app_event_tx: AppEventSender,
    task_running: bool,
}

impl InputSession {
    pub fn new(
        config: ComposerConfig,
        temp_files: Arc<dyn TempFileService>,
        history: Box<dyn HistoryStore>,
        app_event_tx: AppEventSender,
    ) -> Self {
        Self {
            draft: DraftStore::new(config.debounce),
            cursor: TextCursor::default(),
            attachments: AttachmentPipeline::new(
                temp_files,
                app_event_tx.clone(),
                config.attachment_limits,
            ),
            mode: ComposerMode::Editing,
            session_history: Vec::new(),
            history,
            app_event_tx,
            task_running: false,
        }
    }

    pub fn display_text(&self) -> &str {
        self.draft.display_text()
    }

    pub fn committed_text(&self) -> &str {
        self.draft.committed_text()
    }

    /// Byte offset of the cursor within [`Self::display_text`].
    pub fn cursor_offset(&self) -> usize {
        self.cursor.pos()
    }

    pub fn attachments(&self) -> &[Attachment] {
        self.attachments.entries()
    }

    pub fn search(&self) -> Option<&SearchSession> {
        match &self.mode {
            ComposerMode::Searching(search) => Some(search),
            _ => None,
        }
    }

    pub fn navigation(&self) -> Option<&Navigation> {
        match &self.mode {
            ComposerMode::Navigating(navigation) => Some(navigation),
            _ => None,
        }
    }

    pub fn is_task_running(&self) -> bool {
        self.task_running
    }

    pub fn set_task_running(&mut self, running: bool) {
        self.task_running = running;
    }

    /// Submit is offered only when nothing is saving and no task is running.
    pub fn can_submit(&self) -> bool {
        !self.task_running && !self.attachments.is_loading()
    }

    pub fn set_session_history(&mut self, entries: Vec<String>) {
        self.session_history = entries;
    }

    pub fn handle_key_event(&mut self, key: KeyEvent, now: Instant) -> InputResult {
        if key.kind == KeyEventKind::Release {
            return InputResult::None;
        }
        if matches!(self.mode, ComposerMode::Searching(_)) {
            self.handle_search_key(key);
            return InputResult::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Enter if key.modifiers.is_empty() => return self.submit(),
            KeyCode::Esc if self.task_running => return InputResult::Stop,
            KeyCode::Char('c') if ctrl => return self.interrupt_draft(),
            KeyCode::Char('r') if ctrl => self.open_search(),
            KeyCode::Up if ctrl || alt => self.step_older(),
            KeyCode::Char('p') if ctrl => self.step_older(),
            KeyCode::Down if ctrl || alt => self.step_newer(),
            KeyCode::Char('n') if ctrl => self.step_newer(),
            KeyCode::Char('o') if ctrl => self.open_file_picker(),
            KeyCode::Char('v') if ctrl || alt => self.paste_clipboard_image(now),
            KeyCode::Char('x') if ctrl => {
                self.attachments.remove_last();
            }
            KeyCode::Char('t') if ctrl => {
                let retried = self.attachments.retry_all();
                tracing::debug!(retried, "retrying failed attachments");
            }
            _ => {
                if let Some(command) = EditCommand::from_key(&key) {
                    self.apply_edit(command, now);
                }
            }
        }
        InputResult::None
    }

    /// Route a bracketed paste.
    pub fn handle_paste(&mut self, pasted: String, now: Instant) {
        let pasted = pasted.replace("\r\n", "\n").replace('\r', "\n");
        if let ComposerMode::Searching(search) = &mut self.mode {
            let global = self.history.recent_messages();
            let sources = HistorySources::new(&self.session_history, &global);
            search.push_query(&pasted, &sources);
            self.show_search_selection();
            return;
        }

        match clipboard_paste::classify_paste(&pasted) {
            PasteKind::ImageFiles(paths) => {
                let images: Result<Vec<_>, _> = paths
                    .iter()
                    .map(|path| clipboard_paste::read_image_file(path))
                    .collect();
                match images {
                    Ok(images) => {
                        self.handle_image_paste(images, now);
                    }
                    Err(err) => {
                        tracing::warn!("failed to read pasted image: {err}");
                        self.append_paths(paths);
                    }
                }
            }
            PasteKind::Paths(paths) => self.append_paths(paths),
            PasteKind::Text => self.apply_edit(EditCommand::Insert(pasted), now),
        }
    }

    /// Feed pasted image data into the attachment pipeline.
    pub fn handle_image_paste(
        &mut self,
        images: Vec<PastedImage>,
        now: Instant,
    ) -> Vec<AttachmentId> {
        self.attachments.paste(images, now)
    }

    /// Replace the draft from outside (a new conversation, a restored draft).
    ///
    /// History browsing and search are dropped without restoring what they saved, and every
    /// attachment is released along with its persisted file.
    pub fn reset_draft(&mut self, initial: String) {
        self.mode = ComposerMode::Editing;
        self.draft.force_set(initial);
        self.cursor.move_to_end(self.draft.display_text());
        self.attachments.release_all();
    }

    /// Append dropped or picked paths to the draft, separated by spaces.
    pub fn append_paths(&mut self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        self.leave_history_modes();

        let joined = paths
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let current = self.draft.display_text().trim();
        let next = if current.is_empty() {
            joined
        } else {
            format!("{current} {joined}")
        };
        self.draft.force_set(next);
        self.cursor.move_to_end(self.draft.display_text());
    }

    /// Ask the event loop to run the file picker; the result comes back via
    /// [`Self::on_file_picked`].
    pub fn open_file_picker(&self) {
        self.app_event_tx.send(AppEvent::OpenFilePicker);
    }

    pub fn on_file_picked(&mut self, picked: Result<Option<PathBuf>, FilePickerError>) {
        match picked {
            Ok(Some(path)) => self.append_paths(vec![path]),
            Ok(None) => {}
            Err(err) => tracing::warn!("file picker failed: {err}"),
        }
    }

    /// Returns `true` when an attachment changed state.
    pub fn on_image_saved(&mut self, response: SaveImageResponse) -> bool {
        self.attachments.on_saved(response)
    }

    pub fn retry_attachment(&mut self, id: AttachmentId) -> bool {
        self.attachments.retry(id)
    }

    pub fn remove_attachment(&mut self, id: AttachmentId) -> bool {
        self.attachments.remove(id)
    }

    /// Run due timers. Returns `true` when anything visible changed.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        let committed = self.draft.commit_if_due(now);
        let expired = self.attachments.expire_notices(now);
        committed || expired
    }

    /// Earliest instant at which [`Self::on_tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.draft.next_deadline(), self.attachments.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Commit the displayed draft immediately. Returns `true` when the committed text changed.
    pub fn flush_draft(&mut self) -> bool {
        self.draft.flush()
    }

    /// Cancel pending timers for good. In-flight saves are aborted when the session is dropped.
    pub fn dispose(&mut self) {
        self.draft.dispose();
    }

    fn submit(&mut self) -> InputResult {
        self.draft.flush();
        match self.try_submit() {
            Ok(submission) => {
                self.history.append_message(&submission.history_text);
                self.mode = ComposerMode::Editing;
                self.draft.force_set(String::new());
                self.cursor = TextCursor::default();
                self.attachments.clear();
                tracing::debug!(
                    attachments = submission.attachments.len(),
                    "submitted message"
                );
                InputResult::Submitted(submission)
            }
            Err(rejection) => {
                tracing::debug!("ignoring submit: {rejection}");
                InputResult::None
            }
        }
    }

    fn try_submit(&self) -> Result<Submission, SubmitRejection> {
        if self.task_running {
            return Err(SubmitRejection::TaskRunning);
        }
        submission::assemble(
            self.draft.committed_text(),
            self.attachments.ready_paths(),
            self.attachments.is_loading(),
        )
    }

    /// Ctrl+C: clear a non-empty composer (keeping the text in history), otherwise exit.
    fn interrupt_draft(&mut self) -> InputResult {
        let text = self.draft.display_text().to_string();
        if text.trim().is_empty() && self.attachments.is_empty() {
            return InputResult::Exit;
        }
        if !text.trim().is_empty() {
            self.history.append_message(&text);
        }
        self.reset_draft(String::new());
        InputResult::None
    }

    fn apply_edit(&mut self, command: EditCommand, now: Instant) {
        let edited = self.cursor.apply(self.draft.display_text(), command);
        if let Some(text) = edited {
            // Typing over a recalled entry makes it the live draft.
            if matches!(self.mode, ComposerMode::Navigating(_)) {
                self.mode = ComposerMode::Editing;
            }
            self.draft.update(text, now);
        }
    }

    fn step_older(&mut self) {
        let global = self.history.recent_messages();
        let sources = HistorySources::new(&self.session_history, &global);
        let shown = match &mut self.mode {
            ComposerMode::Searching(_) => return,
            ComposerMode::Navigating(navigation) => navigation.older(&sources),
            ComposerMode::Editing => {
                match Navigation::start(self.draft.display_text(), &sources) {
                    Some((navigation, text)) => {
                        self.mode = ComposerMode::Navigating(navigation);
                        Some(text)
                    }
                    None => None,
                }
            }
        };
        if let Some(text) = shown {
            self.show(text);
        }
    }

    fn step_newer(&mut self) {
        let mode = std::mem::replace(&mut self.mode, ComposerMode::Editing);
        let ComposerMode::Navigating(navigation) = mode else {
            self.mode = mode;
            return;
        };
        let global = self.history.recent_messages();
        let sources = HistorySources::new(&self.session_history, &global);
        match navigation.newer(&sources) {
            NewerStep::Moved { navigation, text } => {
                self.mode = ComposerMode::Navigating(navigation);
                self.show(text);
            }
            NewerStep::Restored(saved_draft) => self.show(saved_draft),
        }
    }

    fn open_search(&mut self) {
        if matches!(self.mode, ComposerMode::Searching(_)) {
            return;
        }
        // Any browse in progress is dropped; whatever is on screen becomes the original draft.
        let original_draft = self.draft.display_text().to_string();
        let global = self.history.recent_messages();
        let sources = HistorySources::new(&self.session_history, &global);
        self.mode = ComposerMode::Searching(SearchSession::open(&original_draft, &sources));
        self.show_search_selection();
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let global = self.history.recent_messages();
        let sources = HistorySources::new(&self.session_history, &global);
        let ComposerMode::Searching(search) = &mut self.mode else {
            return;
        };
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                self.close_search();
                return;
            }
            KeyCode::Char('c') if ctrl => {
                self.close_search();
                return;
            }
            KeyCode::Char('r') if ctrl => search.select_next(),
            KeyCode::Down => search.select_next(),
            KeyCode::Char('s') if ctrl => search.select_previous(),
            KeyCode::Up => search.select_previous(),
            KeyCode::Backspace => {
                search.pop_query(&sources);
            }
            KeyCode::Char(c) if !ctrl && !alt => search.push_query(&c.to_string(), &sources),
            _ => return,
        }
        self.show_search_selection();
    }

    /// Confirm and cancel share this exit: the draft from before the search comes back.
    fn close_search(&mut self) {
        let mode = std::mem::replace(&mut self.mode, ComposerMode::Editing);
        if let ComposerMode::Searching(search) = mode {
            self.show(search.finish());
        }
    }

    fn show_search_selection(&mut self) {
        if let ComposerMode::Searching(search) = &self.mode {
            let text = search.displayed_text().to_string();
            self.show(text);
        }
    }

    fn leave_history_modes(&mut self) {
        let mode = std::mem::replace(&mut self.mode, ComposerMode::Editing);
        if let ComposerMode::Searching(search) = mode {
            self.show(search.finish());
        }
    }

    /// Display `text` as the draft without waiting for the debounce.
    fn show(&mut self, text: String) {
        self.draft.force_set(text);
        self.cursor.move_to_end(self.draft.display_text());
    }

    fn paste_clipboard_image(&mut self, now: Instant) {
        match clipboard_paste::read_clipboard_image() {
            Ok(image) => {
                self.handle_image_paste(vec![image], now);
            }
            Err(err) => tracing::warn!("failed to paste image: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::attachments::AttachmentLimits;
    use crate::composer::attachments::tests::ManualTempFiles;
    use crate::composer::attachments::tests::png_image;
    use crate::composer::draft_store::DEFAULT_DEBOUNCE;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::sync::mpsc::unbounded_channel;

    #[derive(Clone, Default)]
    struct SharedHistory {
        appended: Arc<Mutex<Vec<String>>>,
        recent: Arc<Mutex<Vec<String>>>,
    }

    impl HistoryStore for SharedHistory {
        fn append_message(&mut self, text: &str) {
            self.appended.lock().unwrap().push(text.to_string());
        }

        fn recent_messages(&self) -> Vec<String> {
            self.recent.lock().unwrap().clone()
        }
    }

    struct Harness {
        session: InputSession,
        history: SharedHistory,
        temp_files: Arc<ManualTempFiles>,
        rx: UnboundedReceiver<AppEvent>,
        now: Instant,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, rx) = unbounded_channel();
            let history = SharedHistory::default();
            let temp_files = Arc::new(ManualTempFiles::default());
            let session = InputSession::new(
                ComposerConfig {
                    debounce: DEFAULT_DEBOUNCE,
                    attachment_limits: AttachmentLimits::default(),
                },
                temp_files.clone(),
                Box::new(history.clone()),
                AppEventSender::new(tx),
            );
            Self {
                session,
                history,
                temp_files,
                rx,
                now: Instant::now(),
            }
        }

        fn with_history(session: &[&str], global: &[&str]) -> Self {
            let mut harness = Self::new();
            harness
                .session
                .set_session_history(session.iter().map(|s| (*s).to_string()).collect());
            *harness.history.recent.lock().unwrap() =
                global.iter().map(|s| (*s).to_string()).collect();
            harness
        }

        fn press(&mut self, code: KeyCode, modifiers: KeyModifiers) -> InputResult {
            self.session
                .handle_key_event(KeyEvent::new(code, modifiers), self.now)
        }

        fn type_text(&mut self, text: &str) {
            for c in text.chars() {
                self.press(KeyCode::Char(c), KeyModifiers::NONE);
            }
        }

        fn advance(&mut self, by: Duration) {
            self.now += by;
            self.session.on_tick(self.now);
        }

        fn older(&mut self) {
            self.press(KeyCode::Up, KeyModifiers::CONTROL);
        }

        fn newer(&mut self) {
            self.press(KeyCode::Down, KeyModifiers::CONTROL);
        }

        fn appended(&self) -> Vec<String> {
            self.history.appended.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn typing_updates_display_now_and_commits_after_quiet_window() {
        let mut h = Harness::new();
        h.type_text("hi");
        assert_eq!(h.session.display_text(), "hi");
        assert_eq!(h.session.committed_text(), "");
        assert_eq!(h.session.next_deadline(), Some(h.now + DEFAULT_DEBOUNCE));

        h.advance(Duration::from_millis(100));
        assert_eq!(h.session.committed_text(), "");
        h.advance(Duration::from_millis(50));
        assert_eq!(h.session.committed_text(), "hi");
        assert_eq!(h.session.next_deadline(), None);
    }

    #[tokio::test]
    async fn older_saturates_and_newer_restores_draft() {
        let mut h = Harness::with_history(&["s0", "s1"], &["g0", "s0"]);
        h.type_text("wip");

        for _ in 0..10 {
            h.older();
        }
        assert_eq!(h.session.display_text(), "g0");

        for _ in 0..10 {
            h.newer();
        }
        assert_eq!(h.session.display_text(), "wip");
        assert!(h.session.navigation().is_none());
    }

    #[tokio::test]
    async fn older_without_history_keeps_draft() {
        let mut h = Harness::new();
        h.type_text("keep");
        h.older();
        assert_eq!(h.session.display_text(), "keep");
        assert!(h.session.navigation().is_none());
    }

    #[tokio::test]
    async fn editing_a_recalled_entry_ends_navigation() {
        let mut h = Harness::with_history(&["recalled"], &[]);
        h.older();
        h.type_text("!");
        assert_eq!(h.session.display_text(), "recalled!");
        assert!(h.session.navigation().is_none());
        // A newer step no longer jumps back to the old draft.
        h.newer();
        assert_eq!(h.session.display_text(), "recalled!");
    }

    #[tokio::test]
    async fn search_then_cancel_restores_draft_exactly() {
        let mut h = Harness::with_history(&["deploy"], &["run tests"]);
        h.type_text("my draft ");
        h.press(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(h.session.display_text(), "deploy");

        h.press(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(h.session.display_text(), "my draft ");
        assert!(h.session.search().is_none());
    }

    #[tokio::test]
    async fn search_filters_cycles_and_confirm_restores() {
        let mut h = Harness::with_history(&["Run tests"], &["deploy", "run lint"]);
        h.type_text("orig");
        h.press(KeyCode::Char('r'), KeyModifiers::CONTROL);
        h.type_text("RUN");
        assert_eq!(h.session.display_text(), "Run tests");
        assert_eq!(h.session.search().map(SearchSession::query), Some("RUN"));

        h.press(KeyCode::Down, KeyModifiers::NONE);
        assert_eq!(h.session.display_text(), "run lint");
        h.press(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(h.session.display_text(), "Run tests");

        h.type_text("zzz");
        assert_eq!(h.session.display_text(), "orig");

        h.press(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(h.session.display_text(), "orig");
        assert!(h.session.search().is_none());
        assert!(h.appended().is_empty());
    }

    #[tokio::test]
    async fn search_replaces_navigation_and_blocks_it() {
        let mut h = Harness::with_history(&["s0", "s1"], &[]);
        h.type_text("live");
        h.older();
        assert_eq!(h.session.display_text(), "s0");

        h.press(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert!(h.session.navigation().is_none());
        assert_eq!(h.session.search().map(SearchSession::original_draft), Some("s0"));
        // Ctrl+Up is not a navigation step while searching.
        h.older();
        assert!(h.session.search().is_some());

        h.press(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(h.session.display_text(), "s0");
        // The abandoned browse cannot restore its draft any more.
        h.newer();
        assert_eq!(h.session.display_text(), "s0");
    }

    #[tokio::test]
    async fn submit_with_loading_attachment_is_noop() {
        let mut h = Harness::new();
        h.type_text("text");
        h.session.handle_image_paste(vec![png_image()], h.now);
        assert!(!h.session.can_submit());

        assert_eq!(h.press(KeyCode::Enter, KeyModifiers::NONE), InputResult::None);
        assert!(h.appended().is_empty());
        assert_eq!(h.session.display_text(), "text");
    }

    #[tokio::test]
    async fn submit_assembles_payload_and_records_draft() {
        let mut h = Harness::new();
        h.type_text("build it");
        let ids = h.session.handle_image_paste(vec![png_image()], h.now);
        assert!(h.session.on_image_saved(SaveImageResponse::saved(
            ids[0],
            PathBuf::from("/tmp/a.png")
        )));

        let result = h.press(KeyCode::Enter, KeyModifiers::NONE);
        let InputResult::Submitted(submission) = result else {
            panic!("expected submission, got {result:?}");
        };
        assert_eq!(submission.payload, "build it /tmp/a.png");
        assert_eq!(h.appended(), vec!["build it".to_string()]);

        assert_eq!(h.session.display_text(), "");
        assert_eq!(h.session.committed_text(), "");
        assert!(h.session.attachments().is_empty());
        tokio::task::yield_now().await;
        // Submitted files are not deleted.
        assert!(h.temp_files.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_with_only_attachment_uses_path() {
        let mut h = Harness::new();
        let ids = h.session.handle_image_paste(vec![png_image()], h.now);
        h.session
            .on_image_saved(SaveImageResponse::saved(ids[0], PathBuf::from("/tmp/b.png")));

        let result = h.press(KeyCode::Enter, KeyModifiers::NONE);
        let InputResult::Submitted(submission) = result else {
            panic!("expected submission, got {result:?}");
        };
        assert_eq!(submission.payload, "/tmp/b.png");
        assert_eq!(h.appended(), vec!["/tmp/b.png".to_string()]);
    }

    #[tokio::test]
    async fn empty_submit_and_running_task_are_ignored() {
        let mut h = Harness::new();
        assert_eq!(h.press(KeyCode::Enter, KeyModifiers::NONE), InputResult::None);

        h.type_text("busy");
        h.session.set_task_running(true);
        assert_eq!(h.press(KeyCode::Enter, KeyModifiers::NONE), InputResult::None);
        assert_eq!(h.press(KeyCode::Esc, KeyModifiers::NONE), InputResult::Stop);
        assert!(h.appended().is_empty());
    }

    #[tokio::test]
    async fn too_many_images_leave_one_notice_until_timeout() {
        let mut h = Harness::new();
        let images = (0..6).map(|_| png_image()).collect();
        assert!(h.session.handle_image_paste(images, h.now).is_empty());
        assert_eq!(h.session.attachments().len(), 1);

        h.advance(Duration::from_secs(3));
        assert!(h.session.attachments().is_empty());
    }

    #[tokio::test]
    async fn reset_draft_discards_modes_and_releases_files() {
        let mut h = Harness::with_history(&["s0"], &[]);
        let ids = h.session.handle_image_paste(vec![png_image()], h.now);
        h.session
            .on_image_saved(SaveImageResponse::saved(ids[0], PathBuf::from("/tmp/old.png")));
        h.type_text("old");
        h.older();

        h.session.reset_draft("fresh".to_string());
        assert_eq!(h.session.display_text(), "fresh");
        assert_eq!(h.session.committed_text(), "fresh");
        assert!(h.session.navigation().is_none());
        assert!(h.session.attachments().is_empty());

        // The saved draft is gone: stepping newer does nothing.
        h.newer();
        assert_eq!(h.session.display_text(), "fresh");

        tokio::task::yield_now().await;
        assert_eq!(
            *h.temp_files.deletes.lock().unwrap(),
            vec![PathBuf::from("/tmp/old.png")]
        );
    }

    #[tokio::test]
    async fn append_paths_joins_with_spaces() {
        let mut h = Harness::new();
        h.type_text("look at ");
        h.session.append_paths(vec![
            PathBuf::from("/src/main.rs"),
            PathBuf::from("/src/lib.rs"),
        ]);
        assert_eq!(h.session.display_text(), "look at /src/main.rs /src/lib.rs");
        assert_eq!(h.session.cursor_offset(), h.session.display_text().len());
    }

    #[tokio::test]
    async fn file_picker_round_trip() {
        let mut h = Harness::new();
        h.press(KeyCode::Char('o'), KeyModifiers::CONTROL);
        assert!(matches!(h.rx.recv().await, Some(AppEvent::OpenFilePicker)));

        h.session.on_file_picked(Ok(Some(PathBuf::from("/work/notes.md"))));
        assert_eq!(h.session.display_text(), "/work/notes.md");
        h.session.on_file_picked(Ok(None));
        h.session.on_file_picked(Err(FilePickerError::NotConfigured));
        assert_eq!(h.session.display_text(), "/work/notes.md");
    }

    #[tokio::test]
    async fn pasted_text_is_inserted_at_cursor() {
        let mut h = Harness::new();
        h.type_text("ab");
        h.press(KeyCode::Left, KeyModifiers::NONE);
        h.session.handle_paste("line1\r\nline2".to_string(), h.now);
        assert_eq!(h.session.display_text(), "aline1\nline2b");
    }

    #[tokio::test]
    async fn pasted_image_path_becomes_attachment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shot.png");
        std::fs::write(&path, png_image().bytes).expect("write png");

        let mut h = Harness::new();
        h.session.handle_paste(path.display().to_string(), h.now);
        assert_eq!(h.session.display_text(), "");
        assert_eq!(h.session.attachments().len(), 1);
        assert!(h.session.attachments()[0].is_loading());
    }

    #[tokio::test]
    async fn ctrl_c_clears_then_exits() {
        let mut h = Harness::new();
        h.type_text("scratch");
        assert_eq!(
            h.press(KeyCode::Char('c'), KeyModifiers::CONTROL),
            InputResult::None
        );
        assert_eq!(h.session.display_text(), "");
        assert_eq!(h.appended(), vec!["scratch".to_string()]);
        assert_eq!(
            h.press(KeyCode::Char('c'), KeyModifiers::CONTROL),
            InputResult::Exit
        );
    }

    #[tokio::test]
    async fn failed_attachment_can_be_retried_and_removed() {
        let mut h = Harness::new();
        let ids = h.session.handle_image_paste(vec![png_image()], h.now);
        h.session
            .on_image_saved(SaveImageResponse::failed(ids[0], "Failed to save image"));
        assert!(h.session.attachments()[0].can_retry());

        h.press(KeyCode::Char('t'), KeyModifiers::CONTROL);
        assert!(h.session.attachments()[0].is_loading());

        h.press(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert!(h.session.attachments().is_empty());
        // A completion for the removed entry is ignored.
        assert!(!h.session.on_image_saved(SaveImageResponse::saved(
            ids[0],
            PathBuf::from("/tmp/late.png")
        )));
    }
}
