//! glim-editor — structural editing for live expressions.
//!
//! The visualizer's expressions are edited while the animation keeps
//! running, so the editor never operates on raw text if it can help it:
//! the expression is held as a sequence of classified tokens, and edits
//! are structural — bump this number by the step size, cycle that
//! operator, wrap the selection in braces, unwrap it again. Raw text
//! entry exists as an escape hatch (with a snapshot for cancel), and a
//! commit flattens the tokens back into the expression string.
//!
//! Nothing in this crate touches the terminal; it is pure state that the
//! application layer drives from key events and renders into the info bar.

pub mod mode;
pub mod raw;
pub mod tokens;

pub use mode::{EditTarget, Param, StepCursor, SubMode};
pub use raw::RawEdit;
pub use tokens::TokenEditor;
