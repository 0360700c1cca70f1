//! glim-expr — the expression language behind every animated pixel.
//!
//! A small infix arithmetic language over a fixed set of scalar inputs
//! (coordinates, time, polar radius/angle, palette size). Expressions are
//! parsed once into a compact AST and then evaluated hundreds of thousands
//! of times per second, one call per pixel per frame.
//!
//! The language is deliberately unbreakable: parsing never fails (malformed
//! fragments collapse to the literal `0`), and evaluation never produces a
//! non-finite number at the public boundary. A screensaver must not crash
//! because someone typed `1/0` into the live editor mid-animation.

pub mod ast;
pub mod token;
pub mod validate;

pub use ast::{Expr, Vars, eval_str};
pub use token::{Token, TokenKind, classify, join, tokenize};
pub use validate::validate;
