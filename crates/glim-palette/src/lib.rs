//! glim-palette — what a value looks like.
//!
//! The render pipeline produces one number per pixel; this crate turns that
//! number into something visible. Character palettes map values to glyphs,
//! color palettes map values (or index expressions) to 256-color terminal
//! codes, and the background state decides what fills the cells a palette
//! left blank.
//!
//! Palettes are defined in a tiny key=value text format (see [`text`]) and
//! a set of named builtins ships in the binary (see [`builtin`]).

pub mod background;
pub mod builtin;
pub mod charset;
pub mod color;
pub mod text;

pub use background::{BG_CANDIDATES, Background};
pub use charset::{Charset, Glyph, value_index};
pub use color::ColorPalette;
