//! Raw text editing with a snapshot for cancel.
//!
//! The escape hatch from structural editing: type the text directly. The
//! buffer keeps the original value so cancel is a true restore, and the
//! cursor is a real position — insertion and deletion happen *at* the
//! cursor, not just at the end. Only printable input is accepted; the
//! application layer owns the keybindings that move in and out of raw
//! editing.

/// Hard cap on a raw edit buffer's length (bytes) — matches the maximum
/// expression length.
pub const MAX_EDIT_LEN: usize = 1023;

/// A raw text edit in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEdit {
    buf: String,
    orig: String,
    /// Byte offset of the cursor, always on a char boundary.
    cursor: usize,
}

impl RawEdit {
    /// Start editing `initial`, cursor at the end.
    #[must_use]
    pub fn new(initial: &str) -> Self {
        let mut buf = initial.to_string();
        truncate_to_boundary(&mut buf, MAX_EDIT_LEN);
        let cursor = buf.len();
        Self {
            orig: buf.clone(),
            buf,
            cursor,
        }
    }

    /// The buffer text as it currently stands.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.buf
    }

    /// The pre-edit snapshot.
    #[inline]
    #[must_use]
    pub fn original(&self) -> &str {
        &self.orig
    }

    /// Cursor position as a byte offset into [`text`](Self::text).
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cursor position in characters, for display.
    #[must_use]
    pub fn cursor_chars(&self) -> usize {
        self.buf[..self.cursor].chars().count()
    }

    /// Insert a character at the cursor. Ignored when the buffer is full.
    pub fn insert(&mut self, c: char) {
        if self.buf.len() + c.len_utf8() > MAX_EDIT_LEN {
            return;
        }
        self.buf.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(&self.buf, self.cursor);
        self.buf.drain(prev..self.cursor);
        self.cursor = prev;
    }

    /// Move the cursor one character left.
    pub fn left(&mut self) {
        self.cursor = prev_boundary(&self.buf, self.cursor);
    }

    /// Move the cursor one character right.
    pub fn right(&mut self) {
        if let Some(c) = self.buf[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    /// Replace the whole buffer (after validation), cursor to the end.
    pub fn replace(&mut self, text: &str) {
        self.buf = text.to_string();
        truncate_to_boundary(&mut self.buf, MAX_EDIT_LEN);
        self.cursor = self.buf.len();
    }

    /// Discard the edit, returning the original text.
    #[must_use]
    pub fn cancel(self) -> String {
        self.orig
    }
}

/// The byte offset of the char boundary before `pos` (0 at the start).
fn prev_boundary(s: &str, pos: usize) -> usize {
    s[..pos].char_indices().last().map_or(0, |(i, _)| i)
}

/// Truncate at `max` bytes without splitting a character.
fn truncate_to_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
