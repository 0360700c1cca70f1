//! The token editor — structural edits over a tokenized expression.
//!
//! A [`TokenEditor`] owns a token sequence (from [`glim_expr::tokenize`]),
//! a selection index, and a pending-brace flag. All edits are index-based
//! splices on the vector; after any removal the selection clamps back into
//! range. Out-of-capacity and out-of-range conditions are silently
//! ignored — an interactive session must shrug, not crash.

use glim_expr::validate::{is_close_brace, is_open_brace, matching_close};
use glim_expr::{Token, TokenKind, join, tokenize};

/// Hard cap on tokens in an editable expression.
pub const MAX_TOKENS: usize = 128;

/// Hard cap on one token's text length (bytes).
pub const MAX_TOKEN_LEN: usize = 63;

/// Operator cycle order for [`TokenEditor::adjust`].
const OP_CYCLE: [char; 6] = ['+', '-', '*', '/', '%', '^'];

/// Function-name cycle for identifier tokens.
const FUNC_CYCLE: [&str; 3] = ["sin", "cos", "tan"];

// ---------------------------------------------------------------------------
// TokenEditor
// ---------------------------------------------------------------------------

/// A tokenized view of one expression, with a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEditor {
    tokens: Vec<Token>,
    sel: usize,
    pending_brace: bool,
}

impl TokenEditor {
    /// Tokenize `expr` and select the first token.
    #[must_use]
    pub fn from_text(expr: &str) -> Self {
        let mut tokens = tokenize(expr);
        tokens.truncate(MAX_TOKENS);
        Self {
            tokens,
            sel: 0,
            pending_brace: false,
        }
    }

    // ── Introspection ───────────────────────────────────────────────

    /// Number of tokens.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the sequence is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// All tokens, for rendering.
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The selection index (0 when empty).
    #[inline]
    #[must_use]
    pub const fn selection(&self) -> usize {
        self.sel
    }

    /// The selected token, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&Token> {
        self.tokens.get(self.sel)
    }

    /// Reassemble the token texts into a flat expression string.
    #[must_use]
    pub fn text(&self) -> String {
        join(&self.tokens)
    }

    // ── Selection ───────────────────────────────────────────────────

    /// Select the next token (wraps).
    pub fn select_next(&mut self) {
        if !self.tokens.is_empty() {
            self.sel = (self.sel + 1) % self.tokens.len();
        }
    }

    /// Select the previous token (wraps).
    pub fn select_prev(&mut self) {
        if !self.tokens.is_empty() {
            self.sel = (self.sel + self.tokens.len() - 1) % self.tokens.len();
        }
    }

    // ── Value adjustment ────────────────────────────────────────────

    /// Adjust the selected token by `dir` (±1) at the given step size.
    ///
    /// Numbers add `dir·step`. Operators cycle through `+ - * / % ^`.
    /// Identifiers cycle `sin → cos → tan` when they currently match one
    /// of those names; anything else is a no-op.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn adjust(&mut self, dir: i32, step: f64) {
        let Some(token) = self.tokens.get_mut(self.sel) else {
            return;
        };
        match token.kind {
            TokenKind::Number => {
                let v = token.text.parse::<f64>().unwrap_or(0.0);
                token.text = format_number(f64::from(dir).mul_add(step, v));
            }
            TokenKind::Operator => {
                let Some(ch) = token.first_char() else { return };
                if let Some(idx) = OP_CYCLE.iter().position(|&op| op == ch) {
                    let len = OP_CYCLE.len();
                    let idx = (idx as i32 + dir).rem_euclid(len as i32) as usize;
                    token.text = OP_CYCLE[idx].to_string();
                }
            }
            TokenKind::Ident => {
                if let Some(idx) = FUNC_CYCLE.iter().position(|&f| f == token.text) {
                    let len = FUNC_CYCLE.len();
                    let idx = (idx as i32 + dir).rem_euclid(len as i32) as usize;
                    token.text = FUNC_CYCLE[idx].to_string();
                }
            }
            TokenKind::Paren | TokenKind::Other => {}
        }
    }

    // ── Brace blocks ────────────────────────────────────────────────

    /// Arm the pending-brace flag: the next open-brace keystroke becomes
    /// an [`insert_block`](Self::insert_block).
    pub const fn request_brace(&mut self) {
        self.pending_brace = true;
    }

    /// Whether a brace insertion is pending.
    #[inline]
    #[must_use]
    pub const fn brace_pending(&self) -> bool {
        self.pending_brace
    }

    /// Disarm the pending-brace flag.
    pub const fn cancel_brace(&mut self) {
        self.pending_brace = false;
    }

    /// Splice an `open`/empty/`close` token group right after the
    /// selection and select the empty middle token. Unknown openers fall
    /// back to parentheses. No-op when the token cap would be exceeded.
    pub fn insert_block(&mut self, open: char) {
        self.pending_brace = false;
        let (open, close) = match matching_close(open) {
            Some(close) => (open, close),
            None => ('(', ')'),
        };
        if self.tokens.len() + 3 > MAX_TOKENS {
            return;
        }

        let idx = (self.sel + 1).min(self.tokens.len());
        self.tokens.splice(
            idx..idx,
            [
                Token::new(open.to_string()),
                Token {
                    kind: TokenKind::Other,
                    text: String::new(),
                },
                Token::new(close.to_string()),
            ],
        );
        self.sel = idx + 1;
    }

    /// Remove the brace block enclosing the selection.
    ///
    /// Scans backward from the selection, tracking nesting depth, to find
    /// the enclosing open brace; then forward to its depth-balanced
    /// matching close (same delimiter type); removes the inclusive span
    /// and clamps the selection. No-op when the selection is not inside
    /// any block.
    pub fn remove_block(&mut self) {
        if self.tokens.is_empty() {
            return;
        }

        // Backward: find the enclosing opener.
        let mut depth = 0usize;
        let mut found = None;
        for i in (0..=self.sel.min(self.tokens.len() - 1)).rev() {
            let Some(ch) = self.tokens[i].first_char() else {
                continue;
            };
            if is_close_brace(ch) {
                depth += 1;
            } else if is_open_brace(ch) {
                if depth == 0 {
                    found = Some((i, ch));
                    break;
                }
                depth -= 1;
            }
        }
        let Some((start, open)) = found else { return };
        let Some(close) = matching_close(open) else {
            return;
        };

        // Forward: find the matching closer of the same type.
        let mut depth = 0usize;
        let mut end = None;
        for (i, token) in self.tokens.iter().enumerate().skip(start) {
            match token.first_char() {
                Some(ch) if ch == open => depth += 1,
                Some(ch) if ch == close => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(end) = end else { return };

        self.tokens.drain(start..=end);
        if self.tokens.is_empty() {
            self.sel = 0;
        } else if self.sel >= start {
            self.sel = start.min(self.tokens.len() - 1);
        }
    }

    // ── In-place token text edits ───────────────────────────────────

    /// Append a character to the selected token, reclassifying it.
    /// Ignored when the token would exceed [`MAX_TOKEN_LEN`].
    pub fn push_char(&mut self, c: char) {
        let Some(token) = self.tokens.get_mut(self.sel) else {
            return;
        };
        if token.text.len() + c.len_utf8() > MAX_TOKEN_LEN {
            return;
        }
        token.text.push(c);
        token.kind = glim_expr::classify(&token.text);
    }

    /// Delete the selected token's last character, reclassifying it.
    pub fn pop_char(&mut self) {
        let Some(token) = self.tokens.get_mut(self.sel) else {
            return;
        };
        token.text.pop();
        token.kind = glim_expr::classify(&token.text);
    }

    /// Replace a token's text wholesale (raw-edit commit), reclassifying.
    pub fn set_token_text(&mut self, idx: usize, text: &str) {
        if let Some(token) = self.tokens.get_mut(idx) {
            let mut text = text.to_string();
            if text.len() > MAX_TOKEN_LEN {
                let mut end = MAX_TOKEN_LEN;
                while end > 0 && !text.is_char_boundary(end) {
                    end -= 1;
                }
                text.truncate(end);
            }
            token.kind = glim_expr::classify(&text);
            token.text = text;
        }
    }

    /// Token text at `idx`, for seeding a raw edit.
    #[must_use]
    pub fn token_text(&self, idx: usize) -> Option<&str> {
        self.tokens.get(idx).map(|t| t.text.as_str())
    }

    /// Re-tokenize from new expression text (after validation), keeping
    /// the selection clamped into the new range.
    pub fn retokenize(&mut self, expr: &str) {
        let sel = self.sel;
        let mut tokens = tokenize(expr);
        tokens.truncate(MAX_TOKENS);
        self.tokens = tokens;
        self.sel = if self.tokens.is_empty() {
            0
        } else {
            sel.min(self.tokens.len() - 1)
        };
    }
}

/// Format an adjusted number the way a human would type it: up to six
/// decimal places, trailing zeros dropped, huge magnitudes passed through.
fn format_number(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    if v.abs() >= 1e15 {
        return format!("{v}");
    }
    let rounded = (v * 1e6).round() / 1e6;
    let s = format!("{rounded}");
    if s == "-0" { "0".to_string() } else { s }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(ed: &TokenEditor) -> Vec<&str> {
        ed.tokens().iter().map(|t| t.text.as_str()).collect()
    }

    // ── Selection ─────────────────────────────────────────────────────

    #[test]
    fn selection_wraps_both_ways() {
        let mut ed = TokenEditor::from_text("1+2");
        assert_eq!(ed.selection(), 0);
        ed.select_prev();
        assert_eq!(ed.selection(), 2);
        ed.select_next();
        assert_eq!(ed.selection(), 0);
    }

    #[test]
    fn selection_on_empty_is_safe() {
        let mut ed = TokenEditor::from_text("");
        ed.select_next();
        ed.select_prev();
        assert_eq!(ed.selection(), 0);
        assert!(ed.selected().is_none());
    }

    // ── Adjust ────────────────────────────────────────────────────────

    #[test]
    fn number_adjusts_by_step() {
        let mut ed = TokenEditor::from_text("5");
        ed.adjust(1, 1.0);
        assert_eq!(ed.text(), "6");
        ed.adjust(-1, 10.0);
        assert_eq!(ed.text(), "-4");
    }

    #[test]
    fn fractional_steps_format_cleanly() {
        let mut ed = TokenEditor::from_text("0.2");
        ed.adjust(1, 0.01);
        assert_eq!(ed.text(), "0.21");
    }

    #[test]
    fn operator_cycles_forward_and_back() {
        let mut ed = TokenEditor::from_text("1+2");
        ed.select_next();
        ed.adjust(1, 1.0);
        assert_eq!(ed.text(), "1-2");
        ed.adjust(-1, 1.0);
        assert_eq!(ed.text(), "1+2");
        ed.adjust(-1, 1.0);
        assert_eq!(ed.text(), "1^2"); // wraps to the end of the cycle
    }

    #[test]
    fn known_function_cycles() {
        let mut ed = TokenEditor::from_text("sin");
        ed.adjust(1, 1.0);
        assert_eq!(ed.text(), "cos");
        ed.adjust(1, 1.0);
        assert_eq!(ed.text(), "tan");
        ed.adjust(1, 1.0);
        assert_eq!(ed.text(), "sin");
    }

    #[test]
    fn unknown_ident_adjust_is_noop() {
        let mut ed = TokenEditor::from_text("sqrt");
        ed.adjust(1, 1.0);
        assert_eq!(ed.text(), "sqrt");
    }

    #[test]
    fn paren_adjust_is_noop() {
        let mut ed = TokenEditor::from_text("(");
        ed.adjust(1, 1.0);
        assert_eq!(ed.text(), "(");
    }

    // ── Brace blocks ──────────────────────────────────────────────────

    #[test]
    fn insert_block_selects_middle() {
        let mut ed = TokenEditor::from_text("1+2");
        ed.insert_block('(');
        assert_eq!(texts(&ed), vec!["1", "(", "", ")", "+", "2"]);
        assert_eq!(ed.selection(), 2);
        assert_eq!(ed.selected().unwrap().text, "");
    }

    #[test]
    fn insert_block_matches_delimiter_type() {
        let mut ed = TokenEditor::from_text("x");
        ed.insert_block('[');
        assert_eq!(texts(&ed), vec!["x", "[", "", "]"]);
        let mut ed = TokenEditor::from_text("x");
        ed.insert_block('{');
        assert_eq!(texts(&ed), vec!["x", "{", "", "}"]);
    }

    #[test]
    fn insert_block_unknown_opener_uses_parens() {
        let mut ed = TokenEditor::from_text("x");
        ed.insert_block('<');
        assert_eq!(texts(&ed), vec!["x", "(", "", ")"]);
    }

    #[test]
    fn insert_into_empty_sequence() {
        let mut ed = TokenEditor::from_text("");
        ed.insert_block('(');
        assert_eq!(texts(&ed), vec!["(", "", ")"]);
        assert_eq!(ed.selection(), 1);
    }

    #[test]
    fn insert_then_remove_restores_sequence() {
        let before = TokenEditor::from_text("sin(x)+2");
        let mut ed = before.clone();
        ed.insert_block('(');
        ed.remove_block();
        assert_eq!(texts(&ed), texts(&before));
    }

    #[test]
    fn remove_block_spans_nested_content() {
        // Selection inside `(x+1)` removes exactly that span.
        let mut ed = TokenEditor::from_text("2*(x+1)-3");
        while ed.selected().map(|t| t.text.as_str()) != Some("x") {
            ed.select_next();
        }
        ed.remove_block();
        assert_eq!(ed.text(), "2*-3");
    }

    #[test]
    fn remove_block_outside_any_braces_is_noop() {
        let mut ed = TokenEditor::from_text("1+2");
        ed.remove_block();
        assert_eq!(ed.text(), "1+2");
    }

    #[test]
    fn remove_block_clamps_selection() {
        let mut ed = TokenEditor::from_text("(1)");
        ed.select_next(); // on "1"
        ed.remove_block();
        assert!(ed.is_empty());
        assert_eq!(ed.selection(), 0);
    }

    #[test]
    fn pending_brace_flag_lifecycle() {
        let mut ed = TokenEditor::from_text("x");
        assert!(!ed.brace_pending());
        ed.request_brace();
        assert!(ed.brace_pending());
        ed.insert_block('(');
        assert!(!ed.brace_pending());
        ed.request_brace();
        ed.cancel_brace();
        assert!(!ed.brace_pending());
    }

    #[test]
    fn token_cap_blocks_insertion() {
        let long = "1+".repeat(MAX_TOKENS / 2);
        let mut ed = TokenEditor::from_text(&long);
        let before = ed.len();
        ed.insert_block('(');
        assert_eq!(ed.len(), before);
    }

    // ── In-place edits ────────────────────────────────────────────────

    #[test]
    fn push_char_reclassifies() {
        let mut ed = TokenEditor::from_text("1");
        ed.push_char('x');
        assert_eq!(ed.selected().unwrap().kind, TokenKind::Other); // "1x"
        let mut ed = TokenEditor::from_text("si");
        ed.push_char('n');
        assert_eq!(ed.selected().unwrap().kind, TokenKind::Ident);
        assert_eq!(ed.text(), "sin");
    }

    #[test]
    fn pop_char_reclassifies() {
        let mut ed = TokenEditor::from_text("12");
        ed.pop_char();
        assert_eq!(ed.text(), "1");
        ed.pop_char();
        assert_eq!(ed.text(), "");
        ed.pop_char(); // empty: no panic
    }

    #[test]
    fn set_token_text_replaces_and_classifies() {
        let mut ed = TokenEditor::from_text("1+2");
        ed.set_token_text(2, "cos");
        assert_eq!(ed.text(), "1+cos");
        assert_eq!(ed.tokens()[2].kind, TokenKind::Ident);
        ed.set_token_text(99, "zzz"); // out of range: ignored
        assert_eq!(ed.text(), "1+cos");
    }

    // ── Retokenize ────────────────────────────────────────────────────

    #[test]
    fn retokenize_clamps_selection() {
        let mut ed = TokenEditor::from_text("1+2+3");
        ed.select_prev(); // last token
        ed.retokenize("9");
        assert_eq!(ed.selection(), 0);
        assert_eq!(ed.text(), "9");
    }

    #[test]
    fn commit_round_trip() {
        let ed = TokenEditor::from_text("sin(t*0.7)+x");
        assert_eq!(ed.text(), "sin(t*0.7)+x");
    }
}
