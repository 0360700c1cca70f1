//! Named builtin palettes — ready-to-use configurations.
//!
//! Each builtin is a palette text in the same format external palette
//! files use, compiled into the binary. Lookup is case-insensitive by
//! name; cycling walks the tables in order.

use crate::charset::Charset;
use crate::color::ColorPalette;

/// Fallback charsets rotated by the "next charset" key when no builtin
/// character palette is selected. Density ramps, coarse to fine.
pub const FALLBACK_CHARSETS: [&str; 4] = [
    " .:-=+*#%@",
    " .'`^\",:;Il!i><~+_-?][}{1)(|\\/*tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@$",
    " ░▒▓█",
    " ▁▂▃▄▅▆▇█",
];

/// Builtin character palettes: `(name, palette text)`.
pub const CHAR_PALETTES: [(&str, &str); 5] = [
    ("classic", "charset=\" .:-=+*#%@\"\n"),
    ("blocks", "charset=\" ░▒▓█\"\n"),
    ("bars", "charset=\" ▁▂▃▄▅▆▇█\"\n"),
    ("dots", "glyphs=·,•,●,◉\n"),
    (
        "braille",
        "charset=\" ⡀⡄⡆⡇⣇⣧⣷⣿\"\n",
    ),
];

/// Builtin color palettes: `(name, palette text)`.
pub const COLOR_PALETTES: [(&str, &str); 4] = [
    (
        "fire",
        "codes=52,88,124,160,196,202,208,214,220,226\nindex=n*(r*0.5+t*0.05)\n",
    ),
    (
        "ocean",
        "codes=17,18,19,20,21,27,33,39,45,51\nindex=i+j+t*10\n",
    ),
    (
        "neon",
        "codes=201,199,198,197,196,208,214,220,190,118\nindex=floor((a+3.15)*n/6.3)\n",
    ),
    (
        "mono",
        "codes=232,236,240,244,248,252\nindex=(x+1)*0.5*n\n",
    ),
];

/// Find a builtin character palette by name (case-insensitive).
#[must_use]
pub fn find_charset(name: &str) -> Option<usize> {
    CHAR_PALETTES
        .iter()
        .position(|(n, _)| n.eq_ignore_ascii_case(name))
}

/// Find a builtin color palette by name (case-insensitive).
#[must_use]
pub fn find_color(name: &str) -> Option<usize> {
    COLOR_PALETTES
        .iter()
        .position(|(n, _)| n.eq_ignore_ascii_case(name))
}

/// Build the charset at a builtin table index.
#[must_use]
pub fn charset_at(idx: usize) -> Charset {
    let (name, text) = CHAR_PALETTES[idx % CHAR_PALETTES.len()];
    crate::text::parse_charset(text, name)
}

/// Build the color palette at a builtin table index.
#[must_use]
pub fn color_at(idx: usize) -> Option<ColorPalette> {
    let (name, text) = COLOR_PALETTES[idx % COLOR_PALETTES.len()];
    ColorPalette::parse(name, text)
}

/// All builtin character palette names, for `--help`.
#[must_use]
pub fn charset_names() -> Vec<&'static str> {
    CHAR_PALETTES.iter().map(|(n, _)| *n).collect()
}

/// All builtin color palette names, for `--help`.
#[must_use]
pub fn color_names() -> Vec<&'static str> {
    COLOR_PALETTES.iter().map(|(n, _)| *n).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
