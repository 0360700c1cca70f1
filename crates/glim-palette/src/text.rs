//! The palette text format.
//!
//! Palettes are defined in loose key=value text:
//!
//! ```text
//! name=fire
//! codes=16,52,88,124,160,196,202,208,214,220
//! index=i+j+t*10
//! ```
//!
//! Character palettes use `glyphs` (comma-separated) or `charset`
//! (contiguous string); color palettes use `codes` or individual
//! `c0..c9`/`color0..color9` keys, plus an optional `index`/`index_expr`/
//! `expr_index` selector. Values may be single- or double-quoted. Unknown
//! keys are ignored.

use regex::Regex;

use crate::charset::Charset;

/// Fallback ramp used when a character palette defines neither `glyphs`
/// nor `charset`.
const DEFAULT_RAMP: &str = " .:-=+*#%@";

/// Extract `key=value` from a palette text, honoring quotes.
///
/// The key must start a line (leading whitespace allowed); the first match
/// wins. Returns the value with surrounding quotes stripped and trailing
/// whitespace trimmed (leading whitespace is consumed by the pattern).
#[must_use]
pub fn extract_value(text: &str, key: &str) -> Option<String> {
    // Built per call: palette parsing happens on selection changes, not per
    // frame, and the pattern embeds the key.
    let pattern = format!(r"(?m)^[ \t]*{}[ \t]*=[ \t]*(.*)$", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    let raw = re.captures(text)?.get(1)?.as_str().trim_end();

    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return Some(raw[1..raw.len() - 1].to_string());
        }
    }
    Some(raw.to_string())
}

/// Parse a color palette's codes: the `codes` CSV if present, otherwise
/// individual `cN`/`colorN` keys (holes fill with 0, length runs to the
/// highest key found). Empty when the text defines no codes at all.
#[must_use]
pub fn parse_color_codes(text: &str) -> Vec<u8> {
    if let Some(csv) = extract_value(text, "codes") {
        return csv
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .take(crate::color::MAX_CODES)
            .map(parse_code)
            .collect();
    }

    let mut codes = vec![0u8; crate::color::MAX_CODES];
    let mut highest = None;
    for (i, slot) in codes.iter_mut().enumerate() {
        let keyed = extract_value(text, &format!("c{i}"))
            .or_else(|| extract_value(text, &format!("color{i}")));
        if let Some(v) = keyed {
            *slot = parse_code(&v);
            highest = Some(i);
        }
    }
    match highest {
        Some(last) => {
            codes.truncate(last + 1);
            codes
        }
        None => Vec::new(),
    }
}

/// A single color code: integer, clamped into the 256-color range.
/// Unparsable input degrades to 0, matching the expression engine's
/// substitution policy.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_code(s: &str) -> u8 {
    s.trim().parse::<i64>().map_or(0, |v| v.clamp(0, 255) as u8)
}

/// The index-selector expression, under any of its accepted keys.
#[must_use]
pub fn parse_index_expr(text: &str) -> Option<String> {
    extract_value(text, "index")
        .or_else(|| extract_value(text, "index_expr"))
        .or_else(|| extract_value(text, "expr_index"))
}

/// Parse a character palette text into a [`Charset`].
///
/// `glyphs` (CSV) wins over `charset` (contiguous); with neither, the
/// default density ramp is used. The palette's own `name` key overrides
/// `fallback_name`.
#[must_use]
pub fn parse_charset(text: &str, fallback_name: &str) -> Charset {
    let name = extract_value(text, "name").unwrap_or_else(|| fallback_name.to_string());

    if let Some(glyphs) = extract_value(text, "glyphs") {
        Charset::from_csv(&glyphs, &name)
    } else if let Some(charset) = extract_value(text, "charset") {
        Charset::from_str(&charset, &name)
    } else {
        Charset::from_str(DEFAULT_RAMP, "fallback")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
