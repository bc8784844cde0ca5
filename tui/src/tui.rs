//! Terminal setup, teardown, and the crossterm event stream.

use std::future::Future;
use std::io;
use std::io::Stdout;
use std::io::stdout;

use crossterm::event::DisableBracketedPaste;
use crossterm::event::EnableBracketedPaste;
use crossterm::event::Event;
use crossterm::event::EventStream;
use crossterm::execute;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use ratatui::Frame;
use ratatui::backend::CrosstermBackend;
use tokio_stream::StreamExt;

pub type Terminal = ratatui::Terminal<CrosstermBackend<Stdout>>;

/// Enter raw mode on the alternate screen with bracketed paste enabled.
pub fn init() -> io::Result<Terminal> {
    set_modes()?;
    set_panic_hook();
    Terminal::new(CrosstermBackend::new(stdout()))
}

pub fn restore() -> io::Result<()> {
    execute!(stdout(), DisableBracketedPaste, LeaveAlternateScreen)?;
    disable_raw_mode()
}

fn set_modes() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen, EnableBracketedPaste)
}

fn set_panic_hook() {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        hook(panic_info);
    }));
}

pub struct Tui {
    pub terminal: Terminal,
    /// `None` while the terminal is handed to a child process.
    events: Option<EventStream>,
}

impl Tui {
    pub fn new(terminal: Terminal) -> Self {
        Self {
            terminal,
            events: Some(EventStream::new()),
        }
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame<'_>)) -> io::Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }

    /// Next terminal event. Pending forever while events are paused.
    pub async fn next_event(&mut self) -> Option<io::Result<Event>> {
        match self.events.as_mut() {
            Some(events) => events.next().await,
            None => std::future::pending().await,
        }
    }

    /// Drop the event stream so its reader thread stops consuming stdin.
    pub fn pause_events(&mut self) {
        self.events = None;
    }

    pub fn resume_events(&mut self) {
        if self.events.is_none() {
            self.events = Some(EventStream::new());
        }
    }

    /// Give the terminal to `fut` (e.g. an interactive child process) and take it back after.
    pub async fn with_restored<F, T>(&mut self, fut: F) -> io::Result<T>
    where
        F: Future<Output = T>,
    {
        self.pause_events();
        restore()?;
        let output = fut.await;
        set_modes()?;
        self.terminal.clear()?;
        self.resume_events();
        Ok(output)
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        self.pause_events();
        if let Err(err) = restore() {
            tracing::warn!("failed to restore terminal: {err}");
        }
    }
}
