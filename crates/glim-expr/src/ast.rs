//! Expression parsing and evaluation.
//!
//! A recursive-descent parser builds a small tagged-variant AST; the AST is
//! then evaluated once per pixel per frame. Parsing cost is paid only when
//! the expression text changes (a keystroke in the editor), never during
//! rendering.
//!
//! # Grammar
//!
//! Lowest to highest precedence:
//!
//! | Level   | Operators                         |
//! |---------|-----------------------------------|
//! | sum     | `+` `-`                           |
//! | term    | `*` `/` and the word `mod`        |
//! | power   | `^` (evaluated as a LEFT fold)    |
//! | unary   | `+` `-`                           |
//! | primary | `( … )`, variables, calls, numbers|
//!
//! `a^b^c` evaluates as `(a^b)^c`. The word `mod` is both the infix
//! operator (`a mod b`, term level) and a two-argument function
//! (`mod(a, b)`, primary position). After a complete operand the infix
//! reading wins, so `x mod(3)` is `x mod 3`, not a dropped call.
//!
//! # Failure policy
//!
//! Nothing here returns `Result`. An unparsable numeric literal becomes
//! `0`. An unknown identifier not followed by `(` falls through to number
//! parsing and becomes `0`. An unknown *function* poisons its subtree with
//! NaN, which the public [`Expr::eval`] boundary resolves to `0.0`.
//! Unclosed parentheses are tolerated; trailing garbage is left unconsumed.

use std::fmt;

/// Denominators (and `log` arguments) smaller than this in magnitude are
/// clamped to it, so `1/0` yields a large finite number instead of ±inf.
const TINY: f64 = 1e-300;

// ---------------------------------------------------------------------------
// Vars
// ---------------------------------------------------------------------------

/// The fixed record of scalar inputs visible to every expression.
///
/// Read-only per evaluation; the renderer fills a fresh one per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vars {
    /// Normalized (aspect-corrected) horizontal coordinate.
    pub x: f64,
    /// Normalized vertical coordinate in `[-1, 1]`.
    pub y: f64,
    /// Pixel column index.
    pub i: f64,
    /// Pixel row index.
    pub j: f64,
    /// Elapsed (non-paused) seconds.
    pub t: f64,
    /// Polar radius `hypot(x, y)`.
    pub r: f64,
    /// Polar angle `atan2(y, x)`.
    pub a: f64,
    /// Active color palette size (0 when none).
    pub n: f64,
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

/// A variable reference. One letter, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Var {
    X,
    Y,
    I,
    J,
    T,
    R,
    A,
    N,
}

impl Var {
    const fn read(self, v: &Vars) -> f64 {
        match self {
            Self::X => v.x,
            Self::Y => v.y,
            Self::I => v.i,
            Self::J => v.j,
            Self::T => v.t,
            Self::R => v.r,
            Self::A => v.a,
            Self::N => v.n,
        }
    }
}

/// Binary operators. `Mod` is the word form; `%` is not part of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// The fixed builtin function set. One or two arguments each; a missing
/// second argument defaults to `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Exp,
    Log,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Min,
    Max,
    Pow,
    Mod,
}

impl Func {
    /// Look up a function by its (already lowercased) name.
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "exp" => Self::Exp,
            "log" => Self::Log,
            "sqrt" => Self::Sqrt,
            "abs" => Self::Abs,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "min" => Self::Min,
            "max" => Self::Max,
            "pow" => Self::Pow,
            "mod" => Self::Mod,
            _ => return None,
        })
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Sin => a.sin(),
            Self::Cos => a.cos(),
            Self::Tan => a.tan(),
            Self::Asin => a.asin(),
            Self::Acos => a.acos(),
            Self::Atan => a.atan(),
            Self::Exp => a.exp(),
            // Absolute value first: log never domain-errors, and a zero
            // argument is clamped away from -inf.
            Self::Log => a.abs().max(TINY).ln(),
            Self::Sqrt => a.abs().sqrt(),
            Self::Abs => a.abs(),
            Self::Floor => a.floor(),
            Self::Ceil => a.ceil(),
            // C-style comparison selects, preserving NaN propagation from
            // either operand (f64::min/max would mask it).
            Self::Min => {
                if a < b {
                    a
                } else {
                    b
                }
            }
            Self::Max => {
                if a > b {
                    a
                } else {
                    b
                }
            }
            Self::Pow => a.powf(b),
            Self::Mod => a % if b == 0.0 { 1.0 } else { b },
        }
    }
}

/// A parsed expression. Construction via [`Expr::parse`] never fails.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal (also the substitute for anything unparsable).
    Num(f64),
    /// A variable reference.
    Var(Var),
    /// Unary negation.
    Neg(Box<Expr>),
    /// A binary operation.
    Bin(BinOp, Box<Expr>, Box<Expr>),
    /// A function call; the second argument defaults to `0` when absent.
    Call(Func, Box<Expr>, Option<Box<Expr>>),
}

impl Expr {
    /// Parse an expression. Never fails: malformed input degrades to `0`
    /// subtrees per the module-level failure policy.
    #[must_use]
    pub fn parse(src: &str) -> Self {
        Parser::new(src).parse_sum()
    }

    /// Evaluate against `vars`, returning a guaranteed-finite number.
    ///
    /// NaN or ±inf at the top level resolves to `0.0`.
    #[must_use]
    pub fn eval(&self, vars: &Vars) -> f64 {
        let out = self.eval_raw(vars);
        if out.is_finite() { out } else { 0.0 }
    }

    /// Evaluate without the top-level finiteness clamp.
    ///
    /// Used by [`validate`](crate::validate::validate) to probe whether a
    /// repaired expression is actually well-formed — the clamp in
    /// [`eval`](Self::eval) would hide the very NaN being tested for.
    #[must_use]
    pub fn eval_raw(&self, vars: &Vars) -> f64 {
        match self {
            Self::Num(n) => *n,
            Self::Var(v) => v.read(vars),
            Self::Neg(e) => -e.eval_raw(vars),
            Self::Bin(op, lhs, rhs) => {
                let a = lhs.eval_raw(vars);
                let b = rhs.eval_raw(vars);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / safe_denominator(b),
                    BinOp::Mod => a % safe_denominator(b),
                    BinOp::Pow => a.powf(b),
                }
            }
            Self::Call(f, a, b) => {
                let a = a.eval_raw(vars);
                let b = b.as_ref().map_or(0.0, |e| e.eval_raw(vars));
                f.apply(a, b)
            }
        }
    }
}

impl fmt::Display for Expr {
    /// Debug-oriented rendering; not guaranteed to round-trip spacing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Var(v) => write!(f, "{}", format!("{v:?}").to_lowercase()),
            Self::Neg(e) => write!(f, "-({e})"),
            Self::Bin(op, a, b) => {
                let sym = match op {
                    BinOp::Add => "+",
                    BinOp::Sub => "-",
                    BinOp::Mul => "*",
                    BinOp::Div => "/",
                    BinOp::Mod => " mod ",
                    BinOp::Pow => "^",
                };
                write!(f, "({a}{sym}{b})")
            }
            Self::Call(func, a, b) => {
                let name = format!("{func:?}").to_lowercase();
                match b {
                    Some(b) => write!(f, "{name}({a},{b})"),
                    None => write!(f, "{name}({a})"),
                }
            }
        }
    }
}

/// Parse and evaluate in one step. Convenience for one-shot probes; the
/// renderer holds compiled [`Expr`]s instead.
#[must_use]
pub fn eval_str(src: &str, vars: &Vars) -> f64 {
    Expr::parse(src).eval(vars)
}

/// Clamp a denominator's magnitude away from zero (sign is discarded for
/// sub-TINY values, matching the rendering pipeline's expectations: the
/// result is a huge positive-side quotient, not a signed infinity).
fn safe_denominator(b: f64) -> f64 {
    if b.abs() < TINY { TINY } else { b }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Single-letter variables tried, in order, before function-call parsing.
const VARS: [(char, Var); 8] = [
    ('x', Var::X),
    ('y', Var::Y),
    ('i', Var::I),
    ('j', Var::J),
    ('t', Var::T),
    ('r', Var::R),
    ('a', Var::A),
    ('n', Var::N),
];

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    /// Only space and tab separate tokens; everything else is significant.
    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn accept(&mut self, c: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Case-insensitive keyword match that refuses to split identifiers:
    /// `x` matches in `x+1` but not in `xy` or `x2`.
    fn match_keyword(&mut self, kw: &str) -> bool {
        self.skip_ws();
        let bytes = kw.as_bytes();
        let end = self.pos + bytes.len();
        if end > self.src.len() {
            return false;
        }
        if !self.src[self.pos..end].eq_ignore_ascii_case(bytes) {
            return false;
        }
        if let Some(&next) = self.src.get(end) {
            if next.is_ascii_alphanumeric() || next == b'_' {
                return false;
            }
        }
        self.pos = end;
        true
    }

    // ── Precedence levels ───────────────────────────────────────────

    fn parse_sum(&mut self) -> Expr {
        let mut lhs = self.parse_term();
        loop {
            if self.accept(b'+') {
                lhs = Expr::Bin(BinOp::Add, Box::new(lhs), Box::new(self.parse_term()));
            } else if self.accept(b'-') {
                lhs = Expr::Bin(BinOp::Sub, Box::new(lhs), Box::new(self.parse_term()));
            } else {
                return lhs;
            }
        }
    }

    fn parse_term(&mut self) -> Expr {
        let mut lhs = self.parse_power();
        loop {
            if self.accept(b'*') {
                lhs = Expr::Bin(BinOp::Mul, Box::new(lhs), Box::new(self.parse_power()));
            } else if self.accept(b'/') {
                lhs = Expr::Bin(BinOp::Div, Box::new(lhs), Box::new(self.parse_power()));
            } else if self.match_keyword("mod") {
                // Infix `mod` binds here whenever an operand precedes it;
                // the `mod(a,b)` call form only exists at primary position,
                // where no operand has been consumed yet.
                lhs = Expr::Bin(BinOp::Mod, Box::new(lhs), Box::new(self.parse_power()));
            } else {
                return lhs;
            }
        }
    }

    /// `^` parsed iteratively: the left fold makes `a^b^c` = `(a^b)^c`.
    fn parse_power(&mut self) -> Expr {
        let mut lhs = self.parse_unary();
        while self.accept(b'^') {
            lhs = Expr::Bin(BinOp::Pow, Box::new(lhs), Box::new(self.parse_unary()));
        }
        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        if self.accept(b'+') {
            return self.parse_unary();
        }
        if self.accept(b'-') {
            return Expr::Neg(Box::new(self.parse_unary()));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Expr {
        self.skip_ws();

        // Parenthesized sub-expression; a missing closer is tolerated.
        if self.accept(b'(') {
            let inner = self.parse_sum();
            self.accept(b')');
            return inner;
        }

        // Single-letter variables, matched only when not glued to a longer
        // identifier (so `t` never shadows `tan`).
        if let Some(b) = self.peek() {
            let lower = b.to_ascii_lowercase();
            if let Some(&(_, var)) = VARS.iter().find(|(c, _)| *c as u8 == lower) {
                let glued = matches!(
                    self.src.get(self.pos + 1),
                    Some(n) if n.is_ascii_alphanumeric() || *n == b'_'
                );
                if !glued {
                    self.pos += 1;
                    return Expr::Var(var);
                }
            }
        }

        // Function call: a run of letters directly followed by `(`.
        let save = self.pos;
        let mut name = String::new();
        while let Some(b) = self.peek() {
            if b.is_ascii_alphabetic() {
                name.push(b.to_ascii_lowercase() as char);
                self.pos += 1;
            } else {
                break;
            }
        }
        if !name.is_empty() {
            if self.accept(b'(') {
                let a = self.parse_sum();
                let b = if self.accept(b',') {
                    Some(Box::new(self.parse_sum()))
                } else {
                    None
                };
                self.accept(b')');
                return Func::from_name(&name).map_or(
                    // Unknown function: poison the subtree. The top-level
                    // finiteness clamp turns the whole result into 0.0.
                    Expr::Num(f64::NAN),
                    |f| Expr::Call(f, Box::new(a), b),
                );
            }
            // Unknown bare identifier: rewind and let number parsing fail
            // into the 0 literal.
            self.pos = save;
        }

        self.parse_number().map_or(Expr::Num(0.0), Expr::Num)
    }

    /// A decimal literal: digits, optional fraction, optional exponent.
    /// Consumes nothing on failure. Signs are handled by unary.
    fn parse_number(&mut self) -> Option<f64> {
        self.skip_ws();
        let start = self.pos;
        let mut end = self.pos;
        let mut digits = false;

        while matches!(self.src.get(end), Some(b) if b.is_ascii_digit()) {
            end += 1;
            digits = true;
        }
        if self.src.get(end) == Some(&b'.') {
            end += 1;
            while matches!(self.src.get(end), Some(b) if b.is_ascii_digit()) {
                end += 1;
                digits = true;
            }
        }
        if !digits {
            return None;
        }
        // Exponent only counts if at least one digit follows it.
        if matches!(self.src.get(end), Some(b'e' | b'E')) {
            let mut exp = end + 1;
            if matches!(self.src.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            if matches!(self.src.get(exp), Some(b) if b.is_ascii_digit()) {
                end = exp;
                while matches!(self.src.get(end), Some(b) if b.is_ascii_digit()) {
                    end += 1;
                }
            }
        }

        let text = std::str::from_utf8(&self.src[start..end]).ok()?;
        let value = text.parse::<f64>().ok()?;
        self.pos = end;
        Some(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ev(src: &str) -> f64 {
        eval_str(src, &Vars::default())
    }

    fn ev_with(src: &str, vars: Vars) -> f64 {
        eval_str(src, &vars)
    }

    // ── Precedence and associativity ──────────────────────────────────

    #[test]
    fn sum_binds_looser_than_term() {
        assert_eq!(ev("2+3*4"), 14.0);
    }

    #[test]
    fn parens_override_precedence() {
        assert_eq!(ev("(2+3)*4"), 20.0);
    }

    #[test]
    fn power_left_fold() {
        // (2^3)^2 = 64, not 2^(3^2) = 512.
        assert_eq!(ev("2^3^2"), 64.0);
    }

    #[test]
    fn unary_minus_binds_tighter_than_power_base() {
        assert_eq!(ev("-2^2"), 4.0); // (-2)^2, unary applies to the base.
    }

    #[test]
    fn double_unary() {
        assert_eq!(ev("--5"), 5.0);
        assert_eq!(ev("+-5"), -5.0);
    }

    #[test]
    fn term_chain_left_to_right() {
        assert_eq!(ev("12/2/3"), 2.0);
    }

    // ── Safe arithmetic ───────────────────────────────────────────────

    #[test]
    fn division_by_zero_is_large_finite() {
        let v = ev("1/0");
        assert!(v.is_finite());
        assert!(v > 1e290, "expected ≈1e300, got {v}");
    }

    #[test]
    fn division_by_tiny_negative_clamps() {
        let v = Expr::parse("1/0").eval_raw(&Vars::default());
        assert!(v.is_finite());
    }

    #[test]
    fn sqrt_takes_abs() {
        assert_eq!(ev("sqrt(-4)"), 2.0);
    }

    #[test]
    fn log_never_domain_errors() {
        assert!(ev("log(-1)").is_finite());
        assert!(ev("log(0)").is_finite());
        assert_eq!(ev("log(-1)"), 0.0); // ln(|-1|) = 0
    }

    #[test]
    fn top_level_nan_resolves_to_zero() {
        assert_eq!(ev("asin(2)"), 0.0); // domain NaN clamped at boundary
        assert_eq!(ev("0/0"), 0.0);
    }

    // ── Variables ─────────────────────────────────────────────────────

    #[test]
    fn all_variables_read() {
        let vars = Vars {
            x: 1.0,
            y: 2.0,
            i: 3.0,
            j: 4.0,
            t: 5.0,
            r: 6.0,
            a: 7.0,
            n: 8.0,
        };
        assert_eq!(ev_with("x+y+i+j+t+r+a+n", vars), 36.0);
    }

    #[test]
    fn variables_case_insensitive() {
        let vars = Vars {
            x: 2.0,
            ..Vars::default()
        };
        assert_eq!(ev_with("X*3", vars), 6.0);
    }

    #[test]
    fn variable_not_split_from_identifier() {
        // `xy` is not `x*y` — it's an unknown identifier, hence 0.
        let vars = Vars {
            x: 2.0,
            y: 3.0,
            ..Vars::default()
        };
        assert_eq!(ev_with("xy", vars), 0.0);
    }

    #[test]
    fn variable_t_does_not_shadow_tan() {
        let vars = Vars {
            t: 99.0,
            ..Vars::default()
        };
        assert_eq!(ev_with("tan(0)", vars), 0.0);
    }

    // ── Functions ─────────────────────────────────────────────────────

    #[test]
    fn functions_case_insensitive() {
        assert_eq!(ev("COS(0)"), 1.0);
        assert_eq!(ev("Sin(0)"), 0.0);
    }

    #[test]
    fn two_argument_functions() {
        assert_eq!(ev("min(3,5)"), 3.0);
        assert_eq!(ev("max(3,5)"), 5.0);
        assert_eq!(ev("pow(2,10)"), 1024.0);
    }

    #[test]
    fn missing_second_argument_defaults_to_zero() {
        assert_eq!(ev("pow(2)"), 1.0); // 2^0
        assert_eq!(ev("max(-3)"), 0.0); // max(-3, 0)
    }

    #[test]
    fn extra_arguments_stop_the_parse() {
        // The third argument is never consumed; the call yields min(1,2).
        assert_eq!(ev("min(1,2,3)"), 1.0);
    }

    #[test]
    fn unknown_function_poisons_to_zero() {
        assert_eq!(ev("frob(3)+5"), 0.0);
    }

    #[test]
    fn unknown_identifier_reads_as_zero() {
        assert_eq!(ev("q+5"), 5.0);
    }

    #[test]
    fn function_mod_zero_divisor_uses_one() {
        assert_eq!(ev("mod(7,0)"), 0.0); // fmod(7,1) = 0
    }

    // ── mod disambiguation ───────────────────────────────────────────

    #[test]
    fn infix_mod() {
        assert_eq!(ev("10 mod 4"), 2.0);
    }

    #[test]
    fn infix_mod_at_term_precedence() {
        assert_eq!(ev("2+3 mod 2"), 3.0); // 2 + (3 mod 2)
    }

    #[test]
    fn call_and_infix_mod_in_one_expression() {
        // mod(7,4) = 3, 10 mod 4 = 2.
        assert_eq!(ev("mod(7,4) + 10 mod 4"), 5.0);
    }

    #[test]
    fn infix_mod_wins_after_an_operand() {
        // With an operand on the left, `mod(…)` reads as the infix
        // operator applied to a parenthesized right-hand side.
        assert_eq!(ev("6 mod(4)"), 2.0);
    }

    #[test]
    fn modab_is_not_the_operator() {
        // `modx` is an unknown identifier, not `mod x`.
        let vars = Vars {
            x: 3.0,
            ..Vars::default()
        };
        assert_eq!(ev_with("6 modx", vars), 6.0);
    }

    // ── Malformed input ───────────────────────────────────────────────

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(ev(""), 0.0);
        assert_eq!(ev("   "), 0.0);
    }

    #[test]
    fn unclosed_paren_tolerated() {
        assert_eq!(ev("(2+3"), 5.0);
        assert!((ev_with(
            "sin(x",
            Vars {
                x: 0.5,
                ..Vars::default()
            }
        ) - 0.5f64.sin())
        .abs()
            < 1e-12);
    }

    #[test]
    fn bare_dot_is_zero() {
        assert_eq!(ev("."), 0.0);
    }

    #[test]
    fn trailing_garbage_ignored() {
        assert_eq!(ev("7 $$"), 7.0);
    }

    #[test]
    fn exponent_literals() {
        assert_eq!(ev("1e2"), 100.0);
        assert_eq!(ev("2.5e-1"), 0.25);
        // `1e` with no digits: the exponent is not consumed.
        assert_eq!(ev("1e"), 1.0);
    }

    #[test]
    fn whitespace_between_tokens() {
        assert_eq!(ev("  2\t+ 3 "), 5.0);
    }

    // ── AST reuse ─────────────────────────────────────────────────────

    #[test]
    fn compiled_expr_reusable_across_vars() {
        let e = Expr::parse("x*2+t");
        let a = e.eval(&Vars {
            x: 1.0,
            t: 0.0,
            ..Vars::default()
        });
        let b = e.eval(&Vars {
            x: 3.0,
            t: 1.0,
            ..Vars::default()
        });
        assert_eq!(a, 2.0);
        assert_eq!(b, 7.0);
    }

    #[test]
    fn eval_always_finite_property() {
        let nasty = ["1/0", "0/0", "exp(1000)", "log(0)", "asin(9)", "tan(1.5707963267948966)^9"];
        for src in nasty {
            let v = ev(src);
            assert!(v.is_finite(), "{src} evaluated non-finite: {v}");
        }
    }
}
