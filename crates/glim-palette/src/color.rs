//! Color palettes — 256-color ramps with expression-driven indexing.
//!
//! A color palette is at most ten terminal color codes plus an
//! index-selector expression. Two selection strategies exist, chosen per
//! pixel by the renderer:
//!
//! - **Expression indexing**: the selector is evaluated against the same
//!   variable record as the draw expression (with `n` = palette size),
//!   floored, and reduced with a Euclidean remainder — a selector of `-1`
//!   on a 3-code palette lands on code 2, never on a negative index.
//! - **Animated cycling**: a base index (the glyph index, or a fractal's
//!   iteration count) plus `round(t·20)`, modulo the palette size — the
//!   palette scrolls with time.

use glim_expr::{Expr, Vars};

use crate::charset::value_index;

/// Hard cap on codes per palette.
pub const MAX_CODES: usize = 10;

/// How fast the animated-cycling strategy scrolls: palette steps per
/// second is this times `round(t·…)`'s granularity (20 steps/second).
const CYCLE_RATE: f64 = 20.0;

// ---------------------------------------------------------------------------
// ColorPalette
// ---------------------------------------------------------------------------

/// An active, validated color palette. Construction yields `None` when the
/// source text defines no codes, so an existing `ColorPalette` always has
/// at least one code.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    codes: Vec<u8>,
    name: String,
    index_src: String,
    index_expr: Expr,
}

impl ColorPalette {
    /// Build from parts. Returns `None` for an empty code list; excess
    /// codes beyond [`MAX_CODES`] are dropped.
    #[must_use]
    pub fn new(name: &str, mut codes: Vec<u8>, index_src: &str) -> Option<Self> {
        if codes.is_empty() {
            return None;
        }
        codes.truncate(MAX_CODES);
        Some(Self {
            codes,
            name: name.to_string(),
            index_src: index_src.to_string(),
            index_expr: Expr::parse(index_src),
        })
    }

    /// Parse a palette text (see [`text`](crate::text)). `None` when the
    /// text defines no color codes. A missing index selector defaults to
    /// the constant `0`.
    #[must_use]
    pub fn parse(name: &str, body: &str) -> Option<Self> {
        let codes = crate::text::parse_color_codes(body);
        let index = crate::text::parse_index_expr(body).unwrap_or_else(|| "0".to_string());
        Self::new(name, codes, &index)
    }

    /// Number of codes (always ≥ 1).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Always false; palettes are never empty by construction.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Display name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The index-selector expression source text.
    #[inline]
    #[must_use]
    pub fn index_src(&self) -> &str {
        &self.index_src
    }

    /// Code at `idx`, clamped into range.
    #[must_use]
    pub fn code(&self, idx: usize) -> u8 {
        self.codes[idx.min(self.codes.len() - 1)]
    }

    /// Expression-indexing strategy. The caller's `vars` should carry the
    /// pixel context; `n` is overwritten with the palette size here.
    #[must_use]
    pub fn select_by_expr(&self, vars: &Vars) -> u8 {
        #[allow(clippy::cast_precision_loss)]
        let n = self.codes.len() as f64;
        let vars = Vars { n, ..*vars };
        let idx = self.index_expr.eval(&vars).floor();
        #[allow(clippy::cast_possible_truncation)]
        let idx = idx as i64;
        #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
        let m = idx.rem_euclid(self.codes.len() as i64) as usize;
        self.codes[m]
    }

    /// Value-based index via the canonical palette formula — the base for
    /// the cycling strategy in free-expression mode.
    #[must_use]
    pub fn index_for_value(&self, v: f64) -> usize {
        value_index(v, self.codes.len())
    }

    /// Animated cycling strategy: `base + round(t·20)`, mod palette size.
    #[must_use]
    pub fn select_cycled(&self, base: usize, t: f64) -> u8 {
        #[allow(clippy::cast_possible_truncation)]
        let shift = (t * CYCLE_RATE).round() as i64;
        #[allow(clippy::cast_possible_wrap)]
        let n = self.codes.len() as i64;
        #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
        let idx = (base as i64 + shift).rem_euclid(n) as usize;
        self.codes[idx]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
