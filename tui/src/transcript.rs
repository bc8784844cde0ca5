//! The scrollback above the composer: sent messages and agent output.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Wrap;

use crate::render::Renderable;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    User(String),
    Agent(String),
    Status(String),
    Error(String),
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn push_user(&mut self, text: String) {
        self.entries.push(Entry::User(text));
    }

    pub fn push_agent(&mut self, line: String) {
        self.entries.push(Entry::Agent(line));
    }

    pub fn push_status(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::Status(text.into()));
    }

    pub fn push_error(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::Error(text.into()));
    }

    fn lines(&self) -> Vec<Line<'_>> {
        let mut lines = Vec::new();
        for entry in &self.entries {
            match entry {
                Entry::User(text) => {
                    for (idx, line) in text.lines().enumerate() {
                        let prefix = if idx == 0 { "› ".bold() } else { "  ".into() };
                        lines.push(Line::from(vec![prefix, line.cyan()]));
                    }
                }
                Entry::Agent(line) => lines.push(Line::from(line.as_str())),
                Entry::Status(text) => lines.push(Line::from(format!("• {text}").dim())),
                Entry::Error(text) => lines.push(Line::from(format!("■ {text}").red())),
            }
        }
        lines
    }
}

impl Renderable for Transcript {
    /// Bottom-aligned: when the transcript overflows, the oldest lines scroll off the top.
    fn render(&self, area: Rect, buf: &mut Buffer) {
        let paragraph = Paragraph::new(self.lines()).wrap(Wrap { trim: false });
        let total = u16::try_from(paragraph.line_count(area.width)).unwrap_or(u16::MAX);
        let scroll = total.saturating_sub(area.height);
        paragraph.scroll((scroll, 0)).render(area, buf);
    }

    fn desired_height(&self, width: u16) -> u16 {
        let lines = Paragraph::new(self.lines())
            .wrap(Wrap { trim: false })
            .line_count(width);
        u16::try_from(lines).unwrap_or(u16::MAX)
    }
}
