// SPDX-License-Identifier: MIT
//
// Terminal input decoding.
//
// Turns raw stdin bytes into structured key events:
//
// - Control bytes (0x01–0x1A) → Ctrl+letter
// - Legacy CSI sequences (arrows, Home/End/Delete)
// - Alt+key (ESC followed by a printable character)
// - UTF-8 multi-byte characters
//
// # Batch scope
//
// The frame loop drains stdin exactly once per frame and hands the whole
// batch to `decode_batch`. Keystrokes decode strictly in arrival order,
// and multi-byte escape sequences are consumed as a unit by peeking ahead
// *within the batch*. There is no cross-batch buffering: an escape
// sequence truncated at the end of a batch is silently dropped. A real
// keypress delivers its bytes atomically, so truncation only happens on
// pathological input — and dropping it beats replaying stale prefixes a
// frame late.
//
// Number-free decoding: CSI parameter digits are skipped, not interpreted —
// the visualizer binds no modified arrow keys.

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

/// A decoded keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Which key was pressed.
    pub code: KeyCode,
    /// Active modifier keys (Ctrl, Alt).
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A plain (unmodified) key.
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// Ctrl + a letter.
    #[must_use]
    pub const fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            modifiers: Modifiers::CTRL,
        }
    }

    /// Alt + a printable character.
    #[must_use]
    pub const fn alt(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            modifiers: Modifiers::ALT,
        }
    }
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    /// A Unicode character (printable).
    Char(char),
    // ── Named keys ──────────────────────────────────────────────
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    // ── Navigation ──────────────────────────────────────────────
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
}

bitflags! {
    /// Keyboard modifier flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const CTRL = 0b0000_0001;
        const ALT  = 0b0000_0010;
    }
}

// ─── Batch decoding ─────────────────────────────────────────────────────────

/// Result of trying to decode one event at a position in the batch.
enum Decoded {
    /// An event, consuming `usize` bytes.
    Event(KeyEvent, usize),
    /// A sequence truncated at the batch boundary — drop the rest.
    Truncated,
    /// Unrecognized byte(s); skip `usize` bytes.
    Skip(usize),
}

/// Decode a full input batch into key events, in arrival order.
///
/// See the module docs for batch-boundary semantics.
#[must_use]
pub fn decode_batch(bytes: &[u8]) -> Vec<KeyEvent> {
    let mut events = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match decode_one(&bytes[pos..]) {
            Decoded::Event(event, consumed) => {
                events.push(event);
                pos += consumed;
            }
            Decoded::Truncated => break,
            Decoded::Skip(n) => pos += n.max(1),
        }
    }

    events
}

/// Decode a single event from the front of `buf`.
fn decode_one(buf: &[u8]) -> Decoded {
    let Some(&first) = buf.first() else {
        return Decoded::Skip(1);
    };

    match first {
        0x1B => decode_escape(buf),
        // Enter before the generic control range: CR and LF both count.
        0x0A | 0x0D => Decoded::Event(KeyEvent::plain(KeyCode::Enter), 1),
        0x09 => Decoded::Event(KeyEvent::plain(KeyCode::Tab), 1),
        0x08 | 0x7F => Decoded::Event(KeyEvent::plain(KeyCode::Backspace), 1),
        // Remaining control bytes: Ctrl+letter.
        b @ 0x01..=0x1A => Decoded::Event(KeyEvent::ctrl((b + b'a' - 1) as char), 1),
        // ASCII printable.
        b @ 0x20..=0x7E => Decoded::Event(KeyEvent::plain(KeyCode::Char(b as char)), 1),
        // UTF-8 multi-byte.
        0xC0..=0xFF => decode_utf8(buf),
        // Stray continuation bytes or unprintable control codes.
        _ => Decoded::Skip(1),
    }
}

// ── Escape sequences ────────────────────────────────────────────────────────

fn decode_escape(buf: &[u8]) -> Decoded {
    debug_assert_eq!(buf[0], 0x1B);

    let Some(&second) = buf.get(1) else {
        // Lone ESC at the batch boundary: can't tell a keypress from a
        // truncated sequence — drop it.
        return Decoded::Truncated;
    };

    match second {
        b'[' => decode_csi(buf),
        // ESC ESC: a deliberate double-tap reads as the Escape key.
        0x1B => Decoded::Event(KeyEvent::plain(KeyCode::Escape), 2),
        // Alt+printable (but not Alt+[ — that's CSI).
        b @ 0x20..=0x7E => Decoded::Event(KeyEvent::alt(b as char), 2),
        // ESC + anything else: swallow both bytes.
        _ => Decoded::Skip(2),
    }
}

/// CSI: `ESC [` parameters (digits and `;`) then a final byte.
fn decode_csi(buf: &[u8]) -> Decoded {
    // Scan past parameter bytes.
    let mut pos = 2;
    while matches!(buf.get(pos), Some(b) if b.is_ascii_digit() || *b == b';') {
        pos += 1;
    }
    let Some(&last) = buf.get(pos) else {
        return Decoded::Truncated;
    };
    let consumed = pos + 1;

    let code = match last {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'~' => match &buf[2..pos] {
            b"1" | b"7" => KeyCode::Home,
            b"3" => KeyCode::Delete,
            b"4" | b"8" => KeyCode::End,
            _ => return Decoded::Skip(consumed),
        },
        _ => return Decoded::Skip(consumed),
    };

    Decoded::Event(KeyEvent::plain(code), consumed)
}

// ── UTF-8 ───────────────────────────────────────────────────────────────────

fn decode_utf8(buf: &[u8]) -> Decoded {
    let len = match buf[0] {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return Decoded::Skip(1),
    };

    if buf.len() < len {
        return Decoded::Truncated;
    }

    match std::str::from_utf8(&buf[..len]) {
        Ok(s) => s.chars().next().map_or(Decoded::Skip(len), |c| {
            Decoded::Event(KeyEvent::plain(KeyCode::Char(c)), len)
        }),
        Err(_) => Decoded::Skip(1),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
