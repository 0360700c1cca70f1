//! Character palettes — ordered glyph ramps indexed by value.
//!
//! A [`Charset`] is an ordered sequence of up to 256 glyphs, densest last
//! by convention (`" .:-=+*#%@"`). The single canonical mapping from a
//! sample value in `[-1, 1]` to a glyph index lives here as
//! [`value_index`]; every render mode goes through it.

use unicode_segmentation::UnicodeSegmentation;

/// Hard cap on glyphs per charset. Input beyond this is ignored.
pub const MAX_GLYPHS: usize = 256;

// ---------------------------------------------------------------------------
// Glyph
// ---------------------------------------------------------------------------

/// One renderable character unit — a single grapheme cluster, treated as an
/// opaque byte sequence by the renderer.
///
/// The `is_space` flag marks the plain ASCII space, which is what triggers
/// background substitution downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    text: String,
    is_space: bool,
}

impl Glyph {
    /// Build a glyph from its literal text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let is_space = text == " ";
        Self { text, is_space }
    }

    /// The space glyph — the charset fallback and the default background.
    #[must_use]
    pub fn space() -> Self {
        Self::new(" ")
    }

    /// The literal UTF-8 text to emit.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether this is the single ASCII space.
    #[inline]
    #[must_use]
    pub const fn is_space(&self) -> bool {
        self.is_space
    }
}

// ---------------------------------------------------------------------------
// Value → index
// ---------------------------------------------------------------------------

/// Map a value known to lie in `[-1, 1]` onto `0..n` with round-half-up.
///
/// `t = clamp((v+1)/2, 0, 1)`, `index = floor(t·(n−1) + 0.5)`. Palettes of
/// one (or zero) entries always select index 0. Monotonically non-decreasing
/// in `v`; the result is always in `0..n.max(1)`.
#[must_use]
pub fn value_index(v: f64, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let t = ((v + 1.0) * 0.5).clamp(0.0, 1.0);
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let idx = (t * (n - 1) as f64 + 0.5).floor() as usize;
    idx.min(n - 1)
}

// ---------------------------------------------------------------------------
// Charset
// ---------------------------------------------------------------------------

/// An ordered, named glyph ramp. Never empty: every constructor falls back
/// to a single space glyph when it finds nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    glyphs: Vec<Glyph>,
    name: String,
}

impl Charset {
    /// Split a contiguous string (`" ▁▂▃▄▅▆▇█"`) into one glyph per
    /// grapheme cluster.
    #[must_use]
    pub fn from_str(s: &str, name: &str) -> Self {
        let glyphs: Vec<Glyph> = s
            .graphemes(true)
            .take(MAX_GLYPHS)
            .map(Glyph::new)
            .collect();
        Self::finish(glyphs, name)
    }

    /// Split a comma-separated list (`"·,•,░,▒"`) into glyphs, one per
    /// entry. Entries are trimmed; empty entries are skipped — a space
    /// glyph therefore cannot come from CSV form, only from string form.
    #[must_use]
    pub fn from_csv(csv: &str, name: &str) -> Self {
        let glyphs: Vec<Glyph> = csv
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .take(MAX_GLYPHS)
            .map(Glyph::new)
            .collect();
        Self::finish(glyphs, name)
    }

    fn finish(mut glyphs: Vec<Glyph>, name: &str) -> Self {
        if glyphs.is_empty() {
            glyphs.push(Glyph::space());
        }
        Self {
            glyphs,
            name: name.to_string(),
        }
    }

    /// Number of glyphs (always ≥ 1).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false — kept for API symmetry with collections.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Display name (may be empty for ad-hoc charsets).
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Glyph at `idx`, clamped into range.
    #[must_use]
    pub fn glyph(&self, idx: usize) -> &Glyph {
        &self.glyphs[idx.min(self.glyphs.len() - 1)]
    }

    /// The glyph selected by a sample value in `[-1, 1]`.
    #[must_use]
    pub fn glyph_for_value(&self, v: f64) -> &Glyph {
        &self.glyphs[value_index(v, self.glyphs.len())]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
