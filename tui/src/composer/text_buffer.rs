//! Single-cursor editing over the display draft.
//!
//! The draft text itself lives in [`DraftStore`](super::draft_store::DraftStore); this module only
//! tracks the cursor and turns editing keys into new text so every change flows through
//! `DraftStore::update`.

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EditCommand {
    Insert(String),
    Backspace,
    Delete,
    DeleteWordBackward,
    KillToLineStart,
    KillToLineEnd,
    MoveLeft,
    MoveRight,
    MoveWordLeft,
    MoveWordRight,
    MoveLineStart,
    MoveLineEnd,
}

impl EditCommand {
    /// Map an editing key to a command. Shortcuts owned by the composer (history, search,
    /// attachments) are matched before this is consulted.
    pub(crate) fn from_key(key: &KeyEvent) -> Option<Self> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let command = match key.code {
            KeyCode::Enter if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) => {
                EditCommand::Insert("\n".to_string())
            }
            KeyCode::Char('j') if ctrl => EditCommand::Insert("\n".to_string()),
            KeyCode::Char('h') if ctrl => EditCommand::Backspace,
            KeyCode::Char('w') if ctrl => EditCommand::DeleteWordBackward,
            KeyCode::Char('d') if ctrl => EditCommand::Delete,
            KeyCode::Char('u') if ctrl => EditCommand::KillToLineStart,
            KeyCode::Char('k') if ctrl => EditCommand::KillToLineEnd,
            KeyCode::Char('a') if ctrl => EditCommand::MoveLineStart,
            KeyCode::Char('e') if ctrl => EditCommand::MoveLineEnd,
            KeyCode::Char('b') if ctrl => EditCommand::MoveLeft,
            KeyCode::Char('f') if ctrl => EditCommand::MoveRight,
            KeyCode::Char('b') if alt => EditCommand::MoveWordLeft,
            KeyCode::Char('f') if alt => EditCommand::MoveWordRight,
            KeyCode::Char(c) if !ctrl && !alt => EditCommand::Insert(c.to_string()),
            KeyCode::Tab if key.modifiers.is_empty() => EditCommand::Insert("\t".to_string()),
            KeyCode::Backspace if ctrl || alt => EditCommand::DeleteWordBackward,
            KeyCode::Backspace => EditCommand::Backspace,
            KeyCode::Delete => EditCommand::Delete,
            KeyCode::Left if ctrl || alt => EditCommand::MoveWordLeft,
            KeyCode::Right if ctrl || alt => EditCommand::MoveWordRight,
            KeyCode::Left => EditCommand::MoveLeft,
            KeyCode::Right => EditCommand::MoveRight,
            KeyCode::Home => EditCommand::MoveLineStart,
            KeyCode::End => EditCommand::MoveLineEnd,
            _ => return None,
        };
        Some(command)
    }
}

/// Cursor position as a byte offset into the display text, always on a char boundary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextCursor {
    pos: usize,
}

impl TextCursor {
    pub(crate) fn pos(self) -> usize {
        self.pos
    }

    pub(crate) fn move_to_end(&mut self, text: &str) {
        self.pos = text.len();
    }

    /// Apply `command` to `text`. Returns the edited text when the content changed; cursor-only
    /// moves return `None`.
    pub(crate) fn apply(&mut self, text: &str, command: EditCommand) -> Option<String> {
        let pos = clamp_to_char_boundary(text, self.pos);
        self.pos = pos;
        match command {
            EditCommand::Insert(inserted) => {
                let mut next = String::with_capacity(text.len() + inserted.len());
                next.push_str(&text[..pos]);
                next.push_str(&inserted);
                next.push_str(&text[pos..]);
                self.pos = pos + inserted.len();
                Some(next)
            }
            EditCommand::Backspace => {
                let start = previous_grapheme_start(text, pos);
                self.remove_range(text, start, pos)
            }
            EditCommand::Delete => {
                let end = next_grapheme_end(text, pos);
                self.remove_range(text, pos, end)
            }
            EditCommand::DeleteWordBackward => {
                let start = previous_word_start(text, pos);
                self.remove_range(text, start, pos)
            }
            EditCommand::KillToLineStart => {
                let start = line_start(text, pos);
                self.remove_range(text, start, pos)
            }
            EditCommand::KillToLineEnd => {
                let end = line_end(text, pos);
                self.remove_range(text, pos, end)
            }
            EditCommand::MoveLeft => {
                self.pos = previous_grapheme_start(text, pos);
                None
            }
            EditCommand::MoveRight => {
                self.pos = next_grapheme_end(text, pos);
                None
            }
            EditCommand::MoveWordLeft => {
                self.pos = previous_word_start(text, pos);
                None
            }
            EditCommand::MoveWordRight => {
                self.pos = next_word_end(text, pos);
                None
            }
            EditCommand::MoveLineStart => {
                self.pos = line_start(text, pos);
                None
            }
            EditCommand::MoveLineEnd => {
                self.pos = line_end(text, pos);
                None
            }
        }
    }

    fn remove_range(&mut self, text: &str, start: usize, end: usize) -> Option<String> {
        if start >= end {
            return None;
        }
        let mut next = String::with_capacity(text.len() - (end - start));
        next.push_str(&text[..start]);
        next.push_str(&text[end..]);
        self.pos = start;
        Some(next)
    }
}

fn clamp_to_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn previous_grapheme_start(text: &str, pos: usize) -> usize {
    text[..pos]
        .grapheme_indices(true)
        .next_back()
        .map_or(0, |(idx, _)| idx)
}

fn next_grapheme_end(text: &str, pos: usize) -> usize {
    pos + text[pos..].graphemes(true).next().map_or(0, str::len)
}

fn previous_word_start(text: &str, pos: usize) -> usize {
    text[..pos]
        .split_word_bound_indices()
        .rev()
        .find(|(_, segment)| !segment.trim().is_empty())
        .map_or(0, |(idx, _)| idx)
}

fn next_word_end(text: &str, pos: usize) -> usize {
    text[pos..]
        .split_word_bound_indices()
        .find(|(_, segment)| !segment.trim().is_empty())
        .map_or(text.len(), |(idx, segment)| pos + idx + segment.len())
}

fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map_or(0, |idx| idx + 1)
}

fn line_end(text: &str, pos: usize) -> usize {
    text[pos..].find('\n').map_or(text.len(), |idx| pos + idx)
}
