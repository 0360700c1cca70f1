// SPDX-License-Identifier: MIT
//
// glim-term — Terminal backend for glim.
//
// A small, direct terminal layer for a full-redraw animation loop:
// raw mode with guaranteed restore (even on panic), non-blocking
// stdin drained once per frame, raw bytes decoded into key events,
// and a frame's worth of output accumulated for a single write()
// syscall with color escapes coalesced along each row.
//
// This crate intentionally avoids external TUI frameworks (ratatui,
// crossterm) in favor of direct terminal control via ANSI escape
// sequences and raw termios. The renderer repaints every cell every
// frame, so there is no diffing layer — the economy is in escape
// coalescing and batched writes, not in skipping cells.

pub mod ansi;
pub mod frame;
pub mod input;
pub mod output;
pub mod terminal;

pub use frame::{Action, App, FrameLoop};
pub use input::{KeyCode, KeyEvent, Modifiers, decode_batch};
pub use output::{OutputBuffer, Pen};
pub use terminal::{Size, Terminal};
