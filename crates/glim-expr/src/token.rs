//! Expression tokens for structural editing.
//!
//! The live editor does not edit expression *text* — it edits a sequence of
//! classified tokens: bump a number, cycle an operator, wrap a span in
//! braces. This module provides the lossless tokenizer behind that view.
//!
//! Lossless means exactly that: whitespace and unrecognized characters each
//! become their own [`TokenKind::Other`] token, so [`join`]ing the token
//! texts in order reproduces the original string byte for byte.

use std::fmt;

// ---------------------------------------------------------------------------
// TokenKind
// ---------------------------------------------------------------------------

/// Structural classification of one lexical fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Digits and dots: `3`, `0.25`, `.5`.
    Number,
    /// Alphanumeric/underscore run starting with a letter or underscore.
    Ident,
    /// One of `+ - * / % ^`.
    Operator,
    /// One of `( ) [ ] { } ,`.
    Paren,
    /// Anything else (including whitespace), one character at a time.
    Other,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Number => "number",
            Self::Ident => "ident",
            Self::Operator => "operator",
            Self::Paren => "paren",
            Self::Other => "other",
        })
    }
}

/// Characters classified as operators when standing alone.
pub const OPERATORS: &str = "+-*/%^";

/// Characters classified as parens/braces/commas when standing alone.
pub const PARENS: &str = "()[]{},";

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// One classified fragment, owning its literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Structural kind, kept in sync with `text` via [`classify`].
    pub kind: TokenKind,
    /// The literal text, exactly as it appears in the expression.
    pub text: String,
}

impl Token {
    /// Build a token, classifying the text structurally.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: classify(&text),
            text,
        }
    }

    /// First character, if any. Brace matching keys off this.
    #[must_use]
    pub fn first_char(&self) -> Option<char> {
        self.text.chars().next()
    }
}

// ---------------------------------------------------------------------------
// Tokenize / classify / join
// ---------------------------------------------------------------------------

/// Split an expression string into a lossless token sequence.
#[must_use]
pub fn tokenize(expr: &str) -> Vec<Token> {
    let bytes = expr.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        if b.is_ascii_digit() || (b == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit))
        {
            let start = pos;
            while matches!(bytes.get(pos), Some(c) if c.is_ascii_digit() || *c == b'.') {
                pos += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Number,
                text: expr[start..pos].to_string(),
            });
        } else if b.is_ascii_alphabetic() {
            let start = pos;
            while matches!(bytes.get(pos), Some(c) if c.is_ascii_alphanumeric() || *c == b'_') {
                pos += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident,
                text: expr[start..pos].to_string(),
            });
        } else {
            // Everything else: one character per token, multi-byte included.
            let ch_len = expr[pos..].chars().next().map_or(1, char::len_utf8);
            let text = &expr[pos..pos + ch_len];
            let kind = if ch_len == 1 && OPERATORS.contains(b as char) {
                TokenKind::Operator
            } else if ch_len == 1 && PARENS.contains(b as char) {
                TokenKind::Paren
            } else {
                TokenKind::Other
            };
            tokens.push(Token {
                kind,
                text: text.to_string(),
            });
            pos += ch_len;
        }
    }

    tokens
}

/// Re-classify arbitrary (possibly hand-edited) token text by structure.
///
/// All digits/dots → [`Number`](TokenKind::Number); identifier-shaped →
/// [`Ident`](TokenKind::Ident); a single operator or brace character →
/// [`Operator`](TokenKind::Operator) / [`Paren`](TokenKind::Paren);
/// everything else (including the empty string) → [`Other`](TokenKind::Other).
#[must_use]
pub fn classify(text: &str) -> TokenKind {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return TokenKind::Other;
    };

    let mut is_number = first.is_ascii_digit() || first == '.';
    let mut is_ident = first.is_ascii_alphabetic() || first == '_';
    for c in text.chars().skip(1) {
        if !(c.is_ascii_digit() || c == '.') {
            is_number = false;
        }
        if !(c.is_ascii_alphanumeric() || c == '_') {
            is_ident = false;
        }
    }

    if is_number {
        TokenKind::Number
    } else if is_ident {
        TokenKind::Ident
    } else if text.len() == 1 && OPERATORS.contains(first) {
        TokenKind::Operator
    } else if text.len() == 1 && PARENS.contains(first) {
        TokenKind::Paren
    } else {
        TokenKind::Other
    }
}

/// Reassemble token texts, in order, into a flat expression string.
#[must_use]
pub fn join(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
