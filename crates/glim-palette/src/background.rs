//! Background fill — what blank cells look like.
//!
//! Whenever the value-selected glyph is the ASCII space, the renderer emits
//! the background glyph instead. The background can be any glyph, but the
//! interactive "cycle background" key walks a fixed candidate list rather
//! than requiring free text entry — so the state here remembers *where in
//! the cycle* the current glyph sits, if it sits there at all.

use crate::charset::Glyph;

/// The fixed background cycle, in rotation order. A custom glyph not on
/// this list re-enters the cycle at the first candidate.
pub const BG_CANDIDATES: [&str; 11] =
    [" ", ".", "·", "•", ":", "°", "░", "▒", "▓", "@", "#"];

/// Current background glyph plus its position in the candidate cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background {
    glyph: Glyph,
    /// Index into [`BG_CANDIDATES`], or `None` for a custom glyph.
    cycle_idx: Option<usize>,
}

impl Background {
    /// Build from a configured glyph string. An empty string means the
    /// space glyph (edges-only rendering).
    #[must_use]
    pub fn from_glyph(s: &str) -> Self {
        let text = if s.is_empty() { " " } else { s };
        Self {
            glyph: Glyph::new(text),
            cycle_idx: BG_CANDIDATES.iter().position(|c| *c == text),
        }
    }

    /// The glyph to substitute for blank cells.
    #[inline]
    #[must_use]
    pub const fn glyph(&self) -> &Glyph {
        &self.glyph
    }

    /// Advance to the next candidate (custom glyphs restart the cycle).
    pub fn cycle_next(&mut self) {
        let idx = self
            .cycle_idx
            .map_or(0, |i| (i + 1) % BG_CANDIDATES.len());
        self.cycle_idx = Some(idx);
        self.glyph = Glyph::new(BG_CANDIDATES[idx]);
    }
}

impl Default for Background {
    /// Space background: blank cells stay blank.
    fn default() -> Self {
        Self::from_glyph(" ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
