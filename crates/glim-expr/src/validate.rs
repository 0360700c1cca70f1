//! Expression repair.
//!
//! Free-form edited text arrives with mismatched or missing closing braces.
//! Rather than rejecting it (and interrupting a live preview), we repair it:
//! every closer is rewritten to match its innermost open brace, unmatched
//! closers are dropped, and still-open braces are closed at the end. If the
//! repaired string *still* fails to produce a finite number under an
//! all-zero variable context, the whole expression collapses to `"0"`.

use crate::ast::{Expr, Vars};

/// True for `(`, `[`, `{`.
#[must_use]
pub const fn is_open_brace(c: char) -> bool {
    matches!(c, '(' | '[' | '{')
}

/// True for `)`, `]`, `}`.
#[must_use]
pub const fn is_close_brace(c: char) -> bool {
    matches!(c, ')' | ']' | '}')
}

/// The closing brace matching an opener. `None` for non-brace input.
#[must_use]
pub const fn matching_close(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        _ => None,
    }
}

/// Repair braces and verify evaluability; see the module docs.
#[must_use]
pub fn validate(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len() + 8);
    let mut stack: Vec<char> = Vec::new();

    for ch in expr.chars() {
        if is_open_brace(ch) {
            stack.push(ch);
            out.push(ch);
        } else if is_close_brace(ch) {
            // Rewrite to whatever the innermost opener wants; drop closers
            // that have no opener at all.
            if let Some(open) = stack.pop() {
                out.push(matching_close(open).unwrap_or(')'));
            }
        } else {
            out.push(ch);
        }
    }
    while let Some(open) = stack.pop() {
        out.push(matching_close(open).unwrap_or(')'));
    }

    // Probe with the raw evaluator: the public `eval` clamps NaN to 0.0,
    // which would hide exactly the failure we're checking for.
    let probe = Expr::parse(&out).eval_raw(&Vars::default());
    if probe.is_finite() { out } else { "0".to_string() }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
