//! Rendering of the input session: attachment badges, the search bar, the draft, and a hint line.
//!
//! The draft is wrapped by display width (not by words) so the cursor position can be computed
//! from the same byte ranges that were drawn.

use std::ops::Range;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use unicode_width::UnicodeWidthChar;

use super::attachments::Attachment;
use super::attachments::AttachmentState;
use super::input_session::InputSession;
use crate::render::ColumnRenderable;
use crate::render::Renderable;

const PROMPT_COLS: u16 = 2;
const PLACEHOLDER: &str = "Type a message";

impl InputSession {
    fn layout(&self) -> ColumnRenderable<'_> {
        let mut rows: Vec<Box<dyn Renderable + '_>> = self
            .attachments()
            .iter()
            .map(|attachment| attachment_line(attachment).into())
            .collect();
        if let Some(search) = self.search() {
            let status = match search.results().len() {
                0 => "no matches".to_string(),
                n => format!("{}/{n}", search.selected_index() + 1),
            };
            rows.push(
                Line::from(vec![
                    "search: ".cyan().bold(),
                    Span::from(search.query().to_string()),
                    "  ".into(),
                    status.dim(),
                ])
                .into(),
            );
        }
        rows.push(
            DraftView {
                text: self.display_text(),
                cursor: self.cursor_offset(),
                show_placeholder: self.search().is_none(),
            }
            .into(),
        );
        rows.push(self.footer_line().into());
        ColumnRenderable::with(rows)
    }

    fn footer_line(&self) -> Line<'static> {
        let hint = if self.is_task_running() {
            "esc stop"
        } else if self.search().is_some() {
            "enter/esc close search · ctrl+r next · ctrl+s previous"
        } else if !self.can_submit() {
            "saving attachments…"
        } else if self.attachments().iter().any(Attachment::can_retry) {
            "enter send · ctrl+t retry images · ctrl+x remove image"
        } else {
            "enter send · shift+enter newline · ctrl+r search · ctrl+o file · ctrl+v image"
        };
        Line::from(hint.dim())
    }
}

impl Renderable for InputSession {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        self.layout().render(area, buf);
    }

    fn desired_height(&self, width: u16) -> u16 {
        self.layout().desired_height(width)
    }

    fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        self.layout().cursor_pos(area)
    }
}

fn attachment_line(attachment: &Attachment) -> Line<'static> {
    let label = attachment
        .preview
        .as_ref()
        .map(|preview| {
            format!(
                "{} {}×{} ",
                preview.format.label(),
                preview.width,
                preview.height
            )
        })
        .unwrap_or_default();
    match &attachment.state {
        AttachmentState::Loading => {
            Line::from(vec!["◌ ".dim(), label.into(), "saving…".dim()])
        }
        AttachmentState::Ready { persisted_path } => Line::from(vec![
            "✓ ".green(),
            label.into(),
            persisted_path.display().to_string().dim(),
        ]),
        AttachmentState::Error { message } if attachment.is_notice() => {
            Line::from(vec!["! ".red().bold(), message.clone().red()])
        }
        AttachmentState::Error { message } => Line::from(vec![
            "✗ ".red().bold(),
            label.into(),
            message.clone().red(),
        ]),
    }
}

struct DraftView<'a> {
    text: &'a str,
    cursor: usize,
    show_placeholder: bool,
}

impl DraftView<'_> {
    fn text_width(area_width: u16) -> usize {
        usize::from(area_width.saturating_sub(PROMPT_COLS).max(1))
    }

    fn cursor_row(&self, ranges: &[Range<usize>]) -> usize {
        ranges
            .iter()
            .rposition(|range| range.start <= self.cursor)
            .unwrap_or(0)
    }

    /// First visible row, chosen so the cursor row stays on screen.
    fn scroll_top(&self, ranges: &[Range<usize>], height: u16) -> usize {
        let height = usize::from(height.max(1));
        self.cursor_row(ranges).saturating_sub(height - 1)
    }
}

impl Renderable for DraftView<'_> {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        let text_area = Rect::new(
            area.x + PROMPT_COLS.min(area.width),
            area.y,
            area.width.saturating_sub(PROMPT_COLS),
            area.height,
        );

        if self.text.is_empty() && self.show_placeholder {
            buf.set_span(area.x, area.y, &"›".bold(), area.width);
            buf.set_span(text_area.x, text_area.y, &PLACEHOLDER.dim(), text_area.width);
            return;
        }

        let ranges = wrap_ranges(self.text, Self::text_width(area.width));
        let top = self.scroll_top(&ranges, area.height);
        if top == 0 {
            buf.set_span(area.x, area.y, &"›".bold(), area.width);
        }
        for (y, range) in (text_area.y..text_area.bottom()).zip(ranges.into_iter().skip(top)) {
            let segment = self.text[range].replace('\t', " ");
            buf.set_stringn(
                text_area.x,
                y,
                segment,
                usize::from(text_area.width),
                ratatui::style::Style::default(),
            );
        }
    }

    fn desired_height(&self, width: u16) -> u16 {
        let rows = wrap_ranges(self.text, Self::text_width(width)).len();
        u16::try_from(rows).unwrap_or(u16::MAX)
    }

    fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        if area.is_empty() {
            return None;
        }
        let ranges = wrap_ranges(self.text, Self::text_width(area.width));
        let row = self.cursor_row(&ranges);
        let start = ranges.get(row).map_or(0, |range| range.start);
        let col: usize = self
            .text
            .get(start..self.cursor)
            .unwrap_or_default()
            .chars()
            .map(char_width)
            .sum();
        let col = u16::try_from(col).unwrap_or(u16::MAX);
        let visible_row = u16::try_from(row - self.scroll_top(&ranges, area.height))
            .unwrap_or(u16::MAX);
        let x = area
            .x
            .saturating_add(PROMPT_COLS)
            .saturating_add(col)
            .min(area.right().saturating_sub(1));
        let y = area
            .y
            .saturating_add(visible_row)
            .min(area.bottom().saturating_sub(1));
        Some((x, y))
    }
}

/// Byte ranges of each visual row: hard breaks at `\n`, soft breaks once `width` columns fill.
fn wrap_ranges(text: &str, width: usize) -> Vec<Range<usize>> {
    let width = width.max(1);
    let mut ranges = Vec::new();
    let mut line_start = 0;
    for line in text.split('\n') {
        let mut start = line_start;
        let mut used = 0;
        for (idx, ch) in line.char_indices() {
            let ch_width = char_width(ch);
            if used > 0 && used + ch_width > width {
                ranges.push(start..line_start + idx);
                start = line_start + idx;
                used = 0;
            }
            used += ch_width;
        }
        ranges.push(start..line_start + line.len());
        line_start += line.len() + 1;
    }
    ranges
}

fn char_width(ch: char) -> usize {
    if ch == '\t' {
        1
    } else {
        ch.width().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_event_sender::AppEventSender;
    use crate::composer::ComposerConfig;
    use crate::composer::attachments::tests::ManualTempFiles;
    use crate::composer::attachments::tests::png_image;
    use crate::services::HistoryStore;
    use crossterm::event::KeyCode;
    use crossterm::event::KeyEvent;
    use crossterm::event::KeyModifiers;
    use draftpad_protocol::SaveImageResponse;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::sync::mpsc::unbounded_channel;

    struct FixedHistory(Vec<String>);

    impl HistoryStore for FixedHistory {
        fn append_message(&mut self, _text: &str) {}

        fn recent_messages(&self) -> Vec<String> {
            self.0.clone()
        }
    }

    fn session_with_history(global: &[&str]) -> InputSession {
        let (tx, _rx) = unbounded_channel();
        InputSession::new(
            ComposerConfig::default(),
            Arc::new(ManualTempFiles::default()),
            Box::new(FixedHistory(
                global.iter().map(|s| (*s).to_string()).collect(),
            )),
            AppEventSender::new(tx),
        )
    }

    fn snapshot_session(name: &str, session: &InputSession, width: u16, height: u16) {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal
            .draw(|f| session.render(f.area(), f.buffer_mut()))
            .expect("draw");
        assert_snapshot!(name, terminal.backend());
    }

    #[test]
    fn wrap_ranges_split_on_newlines_and_width() {
        assert_eq!(wrap_ranges("", 10), vec![0..0]);
        assert_eq!(wrap_ranges("a\n", 10), vec![0..1, 2..2]);
        assert_eq!(wrap_ranges("abcdefg", 3), vec![0..3, 3..6, 6..7]);
        // Wide characters take two columns each.
        assert_eq!(wrap_ranges("日本語", 4), vec![0..6, 6..9]);
    }

    #[test]
    fn empty_draft_shows_placeholder() {
        let session = session_with_history(&[]);
        assert_eq!(session.desired_height(40), 2);
        snapshot_session("composer_placeholder", &session, 40, 2);
        assert_eq!(session.cursor_pos(Rect::new(0, 0, 40, 2)), Some((2, 0)));
    }

    #[test]
    fn wrapped_draft_places_cursor_on_last_row() {
        let mut session = session_with_history(&[]);
        session.reset_draft("hello world".to_string());
        assert_eq!(session.desired_height(8), 3);
        snapshot_session("composer_wrapped_draft", &session, 8, 3);
        assert_eq!(session.cursor_pos(Rect::new(0, 0, 8, 3)), Some((7, 1)));
    }

    #[test]
    fn tall_draft_scrolls_to_cursor() {
        let mut session = session_with_history(&[]);
        session.reset_draft("one\ntwo\nthree".to_string());
        snapshot_session("composer_scrolled_draft", &session, 20, 2);
        assert_eq!(session.cursor_pos(Rect::new(0, 0, 20, 2)), Some((7, 1)));
    }

    #[test]
    fn huge_paste_saturates_height() {
        let mut session = session_with_history(&[]);
        session.reset_draft("x\n".repeat(70_000));
        assert_eq!(session.desired_height(80), u16::MAX);
        assert_eq!(session.cursor_pos(Rect::new(0, 0, 80, 10)), Some((2, 9)));
    }

    #[test]
    fn search_bar_reports_position() {
        let mut session = session_with_history(&["alpha", "beta"]);
        session.handle_key_event(
            KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL),
            Instant::now(),
        );
        assert_eq!(session.desired_height(60), 3);
        snapshot_session("composer_search_bar", &session, 60, 3);
    }

    #[tokio::test]
    async fn attachment_badges_follow_state() {
        let mut session = session_with_history(&[]);
        let now = Instant::now();
        let ids = session.handle_image_paste(vec![png_image(), png_image()], now);
        session.on_image_saved(SaveImageResponse::saved(ids[0], PathBuf::from("/tmp/a.png")));
        session.on_image_saved(SaveImageResponse::failed(ids[1], "disk full"));
        session.handle_image_paste((0..5).map(|_| png_image()).collect(), now);

        assert_eq!(session.desired_height(80), 5);
        snapshot_session("composer_attachment_badges", &session, 80, 5);
    }
}
