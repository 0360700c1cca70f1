// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Frame loop — the heartbeat of the visualizer.
//
// One thread, one loop, fixed rhythm: drain whatever stdin has, dispatch
// the decoded keys in arrival order, pick up a pending resize, let the
// application do its once-per-frame bookkeeping, repaint the whole frame
// into the output buffer, flush it in one write, sleep out the remainder
// of the frame interval. Repeat.
//
// There is deliberately no diffing and no dirty flag: every frame is an
// animation frame, so every frame repaints. The frame interval is asked
// of the application every iteration — live fps changes take effect on
// the very next frame.
//
// # SIGWINCH Handling
//
// Terminal resize is detected via a SIGWINCH handler that only sets an
// `AtomicBool`. All actual work — re-querying the size, clearing the
// screen — happens synchronously at the top of the next frame, never
// inside the signal handler itself.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::input::{KeyEvent, decode_batch};
use crate::output::OutputBuffer;
use crate::terminal::{Size, Terminal, read_input};

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

/// Global flag set by the SIGWINCH handler. Checked each loop iteration.
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Install a signal handler for SIGWINCH (terminal resize).
///
/// The handler simply sets the [`SIGWINCH_RECEIVED`] flag. This is
/// async-signal-safe: writing to an atomic is one of the few operations
/// permitted inside signal handlers.
#[cfg(unix)]
fn install_sigwinch_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
fn install_sigwinch_handler() {
    // No-op on non-unix platforms.
}

/// Consume the pending-resize flag, returning whether it was set.
#[must_use]
pub fn take_resize() -> bool {
    SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed)
}

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the frame loop to do after an event or tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue running.
    Continue,
    /// Exit the frame loop cleanly.
    Quit,
}

/// Application interface for the frame loop.
///
/// The loop calls these in a fixed order each frame:
///
/// 1. [`on_key`](App::on_key) — for each decoded key, in arrival order
/// 2. [`on_resize`](App::on_resize) — when the terminal size changed
/// 3. [`tick`](App::tick) — once per frame (timing, duration bounds)
/// 4. [`frame`](App::frame) — repaint the whole frame into the buffer
/// 5. [`frame_interval`](App::frame_interval) — how long this frame lasts
///
/// Only [`frame`](App::frame) and [`frame_interval`](App::frame_interval)
/// are required.
pub trait App {
    /// Handle one decoded key. Return [`Action::Quit`] to exit.
    fn on_key(&mut self, _key: &KeyEvent) -> Action {
        Action::Continue
    }

    /// The terminal was resized; the screen has already been cleared.
    fn on_resize(&mut self, _size: Size) {}

    /// Once-per-frame bookkeeping before painting (elapsed time, duration
    /// bound). Return [`Action::Quit`] to exit — a frame that has started
    /// still completes first on the next loop entry, never mid-paint.
    fn tick(&mut self) -> Action {
        Action::Continue
    }

    /// Repaint the entire frame into `out`. The buffer is flushed in a
    /// single write after this returns.
    fn frame(&mut self, out: &mut OutputBuffer, size: Size);

    /// The duration of one frame (`1000/fps` ms). Re-read every iteration
    /// so live fps adjustments take effect immediately.
    fn frame_interval(&self) -> Duration;
}

// ─── FrameLoop ───────────────────────────────────────────────────────────────

/// Input batches are read into a buffer this large, once per frame. One
/// frame's worth of human keystrokes is far smaller.
const INPUT_BATCH: usize = 256;

/// The fixed-fps frame loop driver.
///
/// Owns the terminal and the frame's output buffer. Call
/// [`run`](Self::run) to enter the loop — it returns when the application
/// signals [`Action::Quit`].
pub struct FrameLoop {
    terminal: Terminal,
    out: OutputBuffer,
}

impl FrameLoop {
    /// Create a frame loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialized.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            terminal: Terminal::new()?,
            out: OutputBuffer::new(),
        })
    }

    /// The current terminal size.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.terminal.size()
    }

    /// Run the frame loop until the application returns [`Action::Quit`].
    ///
    /// Enters raw mode and the alternate screen, installs the SIGWINCH
    /// handler, runs the loop, and restores the terminal on the way out —
    /// even if the loop body errored.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal enter/leave or frame output fails.
    pub fn run(&mut self, app: &mut impl App) -> io::Result<()> {
        self.terminal.enter()?;
        install_sigwinch_handler();

        let result = self.run_inner(app);

        // Always clean up, even if the loop errored.
        self.terminal.leave()?;
        result
    }

    /// The inner loop, separated so cleanup runs regardless of outcome.
    fn run_inner(&mut self, app: &mut impl App) -> io::Result<()> {
        let mut batch = [0u8; INPUT_BATCH];

        loop {
            let frame_start = Instant::now();

            // ── Drain input, dispatch in arrival order ───────────
            let n = read_input(&mut batch);
            for key in decode_batch(&batch[..n]) {
                if app.on_key(&key) == Action::Quit {
                    return Ok(());
                }
            }

            // ── Pending resize: all work happens here, not in the
            //    signal handler ─────────────────────────────────────
            if take_resize() {
                let size = self.terminal.refresh_size();
                let mut stdout = io::stdout().lock();
                crate::ansi::clear_screen(&mut stdout)?;
                drop(stdout);
                app.on_resize(size);
            }

            // ── Size is re-queried every frame regardless ────────
            let size = self.terminal.refresh_size();

            // ── Per-frame bookkeeping (duration bound, pause) ────
            if app.tick() == Action::Quit {
                return Ok(());
            }

            // ── Paint and flush in one write ─────────────────────
            self.out.clear();
            app.frame(&mut self.out, size);
            self.out.flush_stdout()?;

            // ── Sleep out the rest of the interval ───────────────
            let interval = app.frame_interval();
            let elapsed = frame_start.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
