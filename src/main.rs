// SPDX-License-Identifier: MIT
//
// glim — animated character mosaics for the terminal.
//
// This is the main binary that wires together all the crates:
//
//   glim-term    → raw mode, ANSI output, decoded input, frame loop
//   glim-expr    → expression parsing and per-pixel evaluation
//   glim-palette → glyph charsets, color ramps, background fill
//   glim-editor  → token-structured live expression editing
//
// The Viz struct implements glim-term's App trait, connecting the frame
// loop to the visualizer's state. Each frame flows through:
//
//   stdin → decode_batch → on_key → mode dispatch → config/editor mutation
//   frame → per-pixel eval → glyph+color selection → pen → one write()
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ animated mosaic              │  ← rows - info_rows
//   ├──────────────────────────────┤
//   │ info bar (1-2 logical lines, │  ← info_rows (wraps to width,
//   │ wrapped)                     │     recomputed every frame)
//   └──────────────────────────────┘

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use glim_editor::{EditTarget, Param, RawEdit, StepCursor, SubMode, TokenEditor};
use glim_expr::{Expr, TokenKind, Vars, tokenize, validate};
use glim_palette::{Background, Charset, ColorPalette, builtin};
use glim_term::frame::App;
use glim_term::{Action, FrameLoop, KeyCode, KeyEvent, Modifiers, OutputBuffer, Pen, Size, ansi};
use unicode_width::UnicodeWidthChar;

// ─── Info-bar colors ────────────────────────────────────────────────────────

const COL_RESET: &str = "\x1b[0m";
const COL_KEY: &str = "\x1b[1;38;5;208m"; // orange & bold
const COL_NAME: &str = "\x1b[38;5;30m"; // dark cyan
const COL_STATE: &str = "\x1b[4;38;5;118m"; // underline lime green
const COL_VALUE: &str = "\x1b[1;31m"; // bright red bold
const COL_SEL: &str = "\x1b[7m"; // reverse video for selection

// Editor accents, per submode.
const COL_DRAW_KEY: &str = "\x1b[1;32m";
const COL_DRAW_NAME: &str = "\x1b[38;5;240m";
const COL_DRAW_VALUE: &str = "\x1b[1;37m";
const COL_COLOR_KEY: &str = "\x1b[1;35m";
const COL_COLOR_NAME: &str = "\x1b[38;5;69m";
const COL_COLOR_VALUE: &str = "\x1b[1;36m";

// Token syntax colors for the editor's expression views.
const COL_TOK_NUM: &str = "\x1b[38;5;220m";
const COL_TOK_FUNC: &str = "\x1b[38;5;39m";
const COL_TOK_OP: &str = "\x1b[1;35m";
const COL_TOK_PAR: &str = "\x1b[38;5;244m";

// ─── Limits ─────────────────────────────────────────────────────────────────

const MAX_EXPR_LEN: usize = 1023;
const FPS_MIN: i64 = 1;
const FPS_MAX: i64 = 240;

// ─── Config ─────────────────────────────────────────────────────────────────

/// Render mode: what produces the per-pixel sample value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// The configured expression, over normalized coordinates.
    #[default]
    Expr,
    /// Mandelbrot escape-time iteration.
    Mandelbrot,
    /// Julia escape-time iteration with a fixed constant.
    Julia,
}

impl Mode {
    const fn display_name(self) -> &'static str {
        match self {
            Self::Expr => "expr",
            Self::Mandelbrot => "mandelbrot",
            Self::Julia => "julia",
        }
    }

    const fn is_fractal(self) -> bool {
        matches!(self, Self::Mandelbrot | Self::Julia)
    }
}

/// The full configuration record, as loaded from an INI file, a baked
/// preset, or defaults. Loading replaces the whole record.
#[derive(Debug, Clone, PartialEq)]
struct Config {
    // [render]
    fps: u32,
    use_color: bool,
    color_func: bool,
    transparent_ws: bool,
    /// Run bound in milliseconds; `None` runs forever.
    duration_ms: Option<u64>,
    /// Fixed size overrides; 0 means "use the terminal's".
    width: u16,
    height: u16,
    /// Fallback charset when no builtin character palette is selected.
    charset: String,
    background: String,

    // [mode]
    mode: Mode,

    // [expr]
    expr_value: String,
    expr_color: String,

    // [fractal]
    max_iter: u32,
    center_x: f64,
    center_y: f64,
    scale: f64,
    c_re: f64,
    c_im: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fps: 30,
            use_color: true,
            color_func: false,
            transparent_ws: true,
            duration_ms: None,
            width: 0,
            height: 0,
            charset: " .:-=+*#%@".to_string(),
            background: " ".to_string(),
            mode: Mode::Expr,
            expr_value: "sin(6.0*(x+0.2*sin(t*0.7))+t)*cos(6.0*(y+0.2*cos(t*0.5))-t)"
                .to_string(),
            expr_color: "128+127*sin(t+3.0*r)".to_string(),
            max_iter: 200,
            center_x: -0.5,
            center_y: 0.0,
            scale: 2.8,
            c_re: -0.8,
            c_im: 0.156,
        }
    }
}

// ─── INI loading ────────────────────────────────────────────────────────────

/// Strip one layer of matching single or double quotes.
fn unquote(v: &str) -> &str {
    for quote in ['"', '\''] {
        if v.len() >= 2 && v.starts_with(quote) && v.ends_with(quote) {
            return &v[1..v.len() - 1];
        }
    }
    v
}

/// Integer parsing with substitution-on-failure, like the rest of the
/// system: garbage reads as 0.
fn parse_int(v: &str) -> i64 {
    v.trim().parse().unwrap_or(0)
}

fn parse_float(v: &str) -> f64 {
    v.trim().parse().unwrap_or(0.0)
}

fn parse_bool(v: &str) -> bool {
    parse_int(v) != 0
}

/// Apply section-delimited key=value text onto a config. Unknown keys and
/// sections are ignored; `#` and `;` start comments; values may be quoted.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn apply_ini(cfg: &mut Config, text: &str) {
    let mut section = String::new();

    for raw_line in text.lines() {
        let line = raw_line.split(['#', ';']).next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            if let Some(end) = rest.find(']') {
                section = rest[..end].to_ascii_lowercase();
            }
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = unquote(value.trim());

        match section.as_str() {
            "render" => match key.as_str() {
                "fps" => cfg.fps = parse_int(value).clamp(0, FPS_MAX) as u32,
                "use_color" => cfg.use_color = parse_bool(value),
                "color_func" => cfg.color_func = parse_bool(value),
                "transparent_ws" | "transparent_spaces" => {
                    cfg.transparent_ws = parse_bool(value);
                }
                "duration" => {
                    let secs = parse_float(value);
                    cfg.duration_ms = if secs < 0.0 {
                        None
                    } else {
                        Some((secs * 1000.0) as u64)
                    };
                }
                "width" => cfg.width = parse_int(value).clamp(0, i64::from(u16::MAX)) as u16,
                "height" => cfg.height = parse_int(value).clamp(0, i64::from(u16::MAX)) as u16,
                "charset" => cfg.charset = value.to_string(),
                "background" | "background_char" => cfg.background = value.to_string(),
                _ => {}
            },
            "mode" => {
                if key == "type" {
                    match value.to_ascii_lowercase().as_str() {
                        "expr" => cfg.mode = Mode::Expr,
                        "mandelbrot" => cfg.mode = Mode::Mandelbrot,
                        "julia" => cfg.mode = Mode::Julia,
                        _ => {}
                    }
                }
            }
            "expr" => match key.as_str() {
                "value" => cfg.expr_value = clip_expr(value),
                "color" => cfg.expr_color = clip_expr(value),
                _ => {}
            },
            "fractal" => match key.as_str() {
                "max_iter" => cfg.max_iter = parse_int(value).clamp(1, 1_000_000) as u32,
                "center_x" => cfg.center_x = parse_float(value),
                "center_y" => cfg.center_y = parse_float(value),
                "scale" => cfg.scale = parse_float(value),
                "c_re" => cfg.c_re = parse_float(value),
                "c_im" => cfg.c_im = parse_float(value),
                _ => {}
            },
            _ => {}
        }
    }
}

/// Parse an INI text into a fresh config (defaults + overrides).
fn parse_ini(text: &str) -> Config {
    let mut cfg = Config::default();
    apply_ini(&mut cfg, text);
    cfg
}

/// Cap an expression at the maximum length, on a char boundary.
fn clip_expr(s: &str) -> String {
    let mut out = s.to_string();
    if out.len() > MAX_EXPR_LEN {
        let mut end = MAX_EXPR_LEN;
        while end > 0 && !out.is_char_boundary(end) {
            end -= 1;
        }
        out.truncate(end);
    }
    out
}

/// The export format: a minimal `[expr]` section with the two live
/// expressions, loadable back through the INI path.
fn export_text(cfg: &Config) -> String {
    format!("[expr]\nvalue={}\ncolor={}\n", cfg.expr_value, cfg.expr_color)
}

// ─── Presets ────────────────────────────────────────────────────────────────

/// Baked presets: complete INI texts compiled into the binary. The first
/// entry is the startup default when no config or preset is named.
const PRESETS: [(&str, &str); 4] = [
    (
        "waves",
        "[render]\nfps=30\n[mode]\ntype=expr\n[expr]\n\
         value=sin(6.0*(x+0.2*sin(t*0.7))+t)*cos(6.0*(y+0.2*cos(t*0.5))-t)\n\
         color=128+127*sin(t+3.0*r)\n",
    ),
    (
        "ripple",
        "[mode]\ntype=expr\n[expr]\nvalue=sin(12.0*r-3.0*t)*exp(-r)\n\
         color=160+60*sin(r*8-t*2)\n",
    ),
    (
        "mandelbrot",
        "[render]\ncolor_func=1\n[mode]\ntype=mandelbrot\n[fractal]\n\
         max_iter=120\ncenter_x=-0.743\ncenter_y=0.131\nscale=2.4\n",
    ),
    (
        "julia",
        "[render]\ncolor_func=1\n[mode]\ntype=julia\n[fractal]\n\
         max_iter=160\nc_re=-0.8\nc_im=0.156\nscale=2.8\n",
    ),
];

fn find_preset(name: &str) -> Option<usize> {
    PRESETS.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
}

// ─── Run state ──────────────────────────────────────────────────────────────

/// Player renders and reacts to playback keys; Editor exposes the live
/// expression editor in the info bar.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    #[default]
    Player,
    Editor,
}

/// Info-bar verbosity, cycled by `i`: everything → nothing → values only.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum InfoMode {
    #[default]
    All,
    None,
    Values,
}

impl InfoMode {
    const fn next(self) -> Self {
        match self {
            Self::All => Self::None,
            Self::None => Self::Values,
            Self::Values => Self::All,
        }
    }
}

/// Which palettes are selected, and where the fallback-charset rotation
/// stands. Explicit state passed around instead of process globals — the
/// loop is single-threaded, this is purely for testability.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PaletteSelect {
    /// Builtin character palette index; `None` falls back to the config
    /// charset string (or the rotation below when that is empty).
    char_idx: Option<usize>,
    /// Rotation position among `builtin::FALLBACK_CHARSETS`.
    fallback_idx: usize,
    /// Builtin color palette index; `None` uses the legacy color expression.
    color_idx: Option<usize>,
}

/// The two expressions compiled to ASTs. Rebuilt whenever either text
/// changes; evaluated once per pixel per frame.
#[derive(Debug, Clone)]
struct Compiled {
    value: Expr,
    color: Expr,
}

impl Compiled {
    fn from_config(cfg: &Config) -> Self {
        Self {
            value: Expr::parse(&cfg.expr_value),
            color: Expr::parse(&cfg.expr_color),
        }
    }
}

/// Editor-session state: submode, parameter selection, step size, the
/// per-slot token editors, and an in-progress raw text edit.
struct EditorState {
    submode: SubMode,
    param: Param,
    step: StepCursor,
    live_preview: bool,
    /// One token editor per expression slot (draw, color); `Some` means
    /// that slot is in token-editing mode.
    tokens: [Option<TokenEditor>; 2],
    raw: Option<RawEdit>,
    raw_target: EditTarget,
}

impl EditorState {
    fn new() -> Self {
        Self {
            submode: SubMode::Draw,
            param: Param::Fps,
            step: StepCursor::default(),
            live_preview: true,
            tokens: [None, None],
            raw: None,
            raw_target: EditTarget::Expr { token: None },
        }
    }

    const fn slot(submode: SubMode) -> usize {
        match submode {
            SubMode::Draw => 0,
            SubMode::Color => 1,
        }
    }
}

// ─── Viz ────────────────────────────────────────────────────────────────────

/// The visualizer application.
struct Viz {
    cfg: Config,
    /// Where the config came from, for the reload key.
    config_path: Option<PathBuf>,
    preset_idx: Option<usize>,

    select: PaletteSelect,
    charset: Charset,
    color: Option<ColorPalette>,
    background: Background,
    compiled: Compiled,

    run_mode: RunMode,
    editor: EditorState,
    info_mode: InfoMode,
    info_rows: u16,
    prev_info_rows: u16,

    started: Instant,
    pause_started: Option<Instant>,
}

impl Viz {
    fn new(cfg: Config, select: PaletteSelect) -> Self {
        let mut viz = Self {
            charset: Charset::from_str(&cfg.charset, "cfg"),
            color: None,
            background: Background::from_glyph(&cfg.background),
            compiled: Compiled::from_config(&cfg),
            cfg,
            config_path: None,
            preset_idx: None,
            select,
            run_mode: RunMode::Player,
            editor: EditorState::new(),
            info_mode: InfoMode::All,
            info_rows: 0,
            prev_info_rows: 0,
            started: Instant::now(),
            pause_started: None,
        };
        viz.pick_charset();
        viz.pick_color();
        viz
    }

    // ── Derived state ───────────────────────────────────────────────

    /// Rebuild the active charset from the current selection: builtin
    /// palette, else the config's charset string, else the fallback
    /// rotation.
    fn pick_charset(&mut self) {
        self.charset = match self.select.char_idx {
            Some(idx) => builtin::charset_at(idx),
            None if !self.cfg.charset.is_empty() => Charset::from_str(&self.cfg.charset, "cfg"),
            None => Charset::from_str(
                builtin::FALLBACK_CHARSETS
                    [self.select.fallback_idx % builtin::FALLBACK_CHARSETS.len()],
                "fallback",
            ),
        };
    }

    /// Rebuild the active color palette from the current selection.
    fn pick_color(&mut self) {
        self.color = self.select.color_idx.and_then(builtin::color_at);
    }

    fn recompile(&mut self) {
        self.compiled = Compiled::from_config(&self.cfg);
    }

    /// Replace the whole config and rebuild everything derived from it.
    fn apply_config(&mut self, cfg: Config) {
        self.cfg = cfg;
        self.background = Background::from_glyph(&self.cfg.background);
        self.pick_charset();
        self.pick_color();
        self.recompile();
    }

    fn load_config_text(&mut self, text: &str) {
        self.apply_config(parse_ini(text));
    }

    fn load_config_file(&mut self, path: &Path) -> io::Result<()> {
        let text = fs::read_to_string(path)?;
        self.load_config_text(&text);
        Ok(())
    }

    fn load_preset(&mut self, idx: usize) {
        let idx = idx % PRESETS.len();
        self.preset_idx = Some(idx);
        self.load_config_text(PRESETS[idx].1);
    }

    /// Reload the startup source: the config file if one was given,
    /// otherwise the current preset.
    fn reload(&mut self) {
        if let Some(path) = self.config_path.clone() {
            if let Err(e) = self.load_config_file(&path) {
                eprintln!("glim: reload failed: {}: {e}", path.display());
            }
        } else if let Some(idx) = self.preset_idx {
            self.load_preset(idx);
        }
    }

    // ── Time ────────────────────────────────────────────────────────

    /// Elapsed non-paused seconds since start.
    fn elapsed(&self) -> f64 {
        let now = self.pause_started.unwrap_or_else(Instant::now);
        now.duration_since(self.started).as_secs_f64()
    }

    const fn paused(&self) -> bool {
        self.pause_started.is_some()
    }

    /// Pause freezes elapsed time; resume shifts the start so the
    /// animation continues where it stopped.
    fn toggle_pause(&mut self) {
        match self.pause_started.take() {
            Some(since) => self.started += since.elapsed(),
            None => self.pause_started = Some(Instant::now()),
        }
    }

    // ── Expression slots ────────────────────────────────────────────

    fn current_expr(&self) -> &str {
        match self.editor.submode {
            SubMode::Draw => &self.cfg.expr_value,
            SubMode::Color => &self.cfg.expr_color,
        }
    }

    fn set_current_expr(&mut self, text: &str) {
        let text = clip_expr(text);
        match self.editor.submode {
            SubMode::Draw => self.cfg.expr_value = text,
            SubMode::Color => self.cfg.expr_color = text,
        }
        self.recompile();
    }

    // ── Editor state transitions ────────────────────────────────────

    fn set_submode(&mut self, submode: SubMode) {
        self.editor.submode = submode;
        // An in-flight raw edit is abandoned; per-slot token editors
        // survive the switch.
        self.editor.raw = None;
    }

    fn active_slot(&self) -> usize {
        EditorState::slot(self.editor.submode)
    }

    fn in_token_mode(&self) -> bool {
        self.editor.tokens[self.active_slot()].is_some()
    }

    fn enter_token_mode(&mut self) {
        let expr = self.current_expr().to_string();
        self.editor.tokens[self.active_slot()] = Some(TokenEditor::from_text(&expr));
    }

    /// Flatten the active token sequence into the expression slot.
    fn commit_tokens(&mut self) {
        if let Some(tokens) = &self.editor.tokens[self.active_slot()] {
            let text = tokens.text();
            self.set_current_expr(&text);
        }
    }

    fn exit_token_mode(&mut self) {
        self.commit_tokens();
        self.editor.tokens[self.active_slot()] = None;
    }

    /// Re-derive the expression after a structural edit, when live
    /// preview is on.
    fn live_sync(&mut self) {
        if self.editor.live_preview {
            self.commit_tokens();
        }
    }

    fn start_raw_edit(&mut self, target: EditTarget) {
        let initial = match target {
            EditTarget::Expr { token: Some(idx) } => self.editor.tokens[self.active_slot()]
                .as_ref()
                .and_then(|t| t.token_text(idx))
                .unwrap_or("")
                .to_string(),
            EditTarget::Expr { token: None } => {
                // Raw-editing the whole expression leaves token mode; the
                // committed text is the starting point.
                self.editor.tokens[self.active_slot()] = None;
                self.current_expr().to_string()
            }
            EditTarget::Export | EditTarget::Import => String::new(),
        };
        self.editor.raw = Some(RawEdit::new(&initial));
        self.editor.raw_target = target;
    }

    fn start_path_edit(&mut self, target: EditTarget) {
        if self.in_token_mode() {
            self.exit_token_mode();
        }
        self.start_raw_edit(target);
    }

    /// Apply the raw edit buffer to its target. Path targets only act on
    /// exit; expression targets apply every time (live preview calls this
    /// with `exit = false` after each keystroke).
    fn apply_raw_edit(&mut self, exit: bool) {
        let Some(raw) = &self.editor.raw else { return };
        let text = raw.text().to_string();

        match self.editor.raw_target {
            EditTarget::Expr { token: Some(idx) } => {
                let slot = self.active_slot();
                if let Some(tokens) = &mut self.editor.tokens[slot] {
                    tokens.set_token_text(idx, &text);
                }
                if self.editor.live_preview {
                    self.commit_tokens();
                }
            }
            EditTarget::Expr { token: None } => {
                self.set_current_expr(&text);
            }
            EditTarget::Export => {
                if exit {
                    if let Err(e) = fs::write(&text, export_text(&self.cfg)) {
                        eprintln!("glim: export failed: {text}: {e}");
                    }
                }
            }
            EditTarget::Import => {
                if exit {
                    let path = PathBuf::from(&text);
                    if let Err(e) = self.load_config_file(&path) {
                        eprintln!("glim: import failed: {text}: {e}");
                    }
                }
            }
        }

        if exit {
            self.editor.raw = None;
            self.editor.raw_target = EditTarget::Expr { token: None };
        }
    }

    /// Abandon the raw edit, restoring the snapshot.
    fn cancel_raw_edit(&mut self) {
        let Some(raw) = self.editor.raw.take() else {
            return;
        };
        let orig = raw.cancel();

        match self.editor.raw_target {
            EditTarget::Expr { token: Some(idx) } => {
                let slot = self.active_slot();
                if let Some(tokens) = &mut self.editor.tokens[slot] {
                    tokens.set_token_text(idx, &orig);
                }
                if self.editor.live_preview {
                    self.commit_tokens();
                }
            }
            EditTarget::Expr { token: None } => {
                self.set_current_expr(&orig);
            }
            EditTarget::Export | EditTarget::Import => {}
        }
        self.editor.raw_target = EditTarget::Expr { token: None };
    }

    /// Alt-V: repair braces, re-check evaluability, re-derive.
    fn validate_current(&mut self) {
        if let Some(raw) = &mut self.editor.raw {
            if matches!(self.editor.raw_target, EditTarget::Expr { .. }) {
                let fixed = validate(raw.text());
                raw.replace(&fixed);
                if self.editor.live_preview {
                    self.apply_raw_edit(false);
                }
            }
            return;
        }

        if self.in_token_mode() {
            self.commit_tokens();
        }
        let fixed = validate(self.current_expr());
        self.set_current_expr(&fixed);
        let slot = self.active_slot();
        if let Some(tokens) = &mut self.editor.tokens[slot] {
            tokens.retokenize(&fixed);
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn adjust_param(&mut self, dir: i64) {
        match self.editor.param {
            Param::Fps => {
                let step = self.editor.step.value() as i64;
                let fps = i64::from(self.cfg.fps) + dir * step;
                self.cfg.fps = fps.clamp(FPS_MIN, FPS_MAX) as u32;
            }
            Param::Expr => {}
        }
    }

    // ── Key dispatch ────────────────────────────────────────────────

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn handle_player(&mut self, key: &KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Char('t') if key.modifiers.contains(Modifiers::CTRL) => {
                self.run_mode = RunMode::Editor;
            }
            KeyCode::Char('p') => self.toggle_pause(),
            KeyCode::Char('i') => self.info_mode = self.info_mode.next(),
            KeyCode::Char('W') => self.cfg.transparent_ws = !self.cfg.transparent_ws,
            KeyCode::Char('w') => self.background.cycle_next(),
            KeyCode::Char('+') => {
                self.cfg.fps = (i64::from(self.cfg.fps) + 1).clamp(FPS_MIN, FPS_MAX) as u32;
            }
            KeyCode::Char('-') => {
                self.cfg.fps = (i64::from(self.cfg.fps) - 1).clamp(FPS_MIN, FPS_MAX) as u32;
            }
            KeyCode::Char('C') => self.cfg.use_color = !self.cfg.use_color,
            KeyCode::Char('c') => {
                let next = self
                    .select
                    .color_idx
                    .map_or(0, |i| (i + 1) % builtin::COLOR_PALETTES.len());
                self.select.color_idx = Some(next);
                self.cfg.use_color = true;
                self.pick_color();
            }
            KeyCode::Char('f') => self.cfg.color_func = !self.cfg.color_func,
            KeyCode::Char('n') => {
                match self.select.char_idx {
                    Some(i) => self.select.char_idx = Some((i + 1) % builtin::CHAR_PALETTES.len()),
                    None if self.cfg.charset.is_empty() => {
                        self.select.fallback_idx =
                            (self.select.fallback_idx + 1) % builtin::FALLBACK_CHARSETS.len();
                    }
                    None => self.select.char_idx = Some(0),
                }
                self.pick_charset();
            }
            KeyCode::Char('m') => {
                let next = self.preset_idx.map_or(0, |i| (i + 1) % PRESETS.len());
                self.load_preset(next);
            }
            KeyCode::Char('r') => self.reload(),
            KeyCode::Up if self.cfg.mode.is_fractal() => {
                self.cfg.center_y -= self.cfg.scale * 0.05;
            }
            KeyCode::Down if self.cfg.mode.is_fractal() => {
                self.cfg.center_y += self.cfg.scale * 0.05;
            }
            KeyCode::Right if self.cfg.mode.is_fractal() => {
                self.cfg.center_x += self.cfg.scale * 0.05;
            }
            KeyCode::Left if self.cfg.mode.is_fractal() => {
                self.cfg.center_x -= self.cfg.scale * 0.05;
            }
            KeyCode::Char(']') if self.cfg.mode.is_fractal() => self.cfg.scale *= 0.9,
            KeyCode::Char('[') if self.cfg.mode.is_fractal() => self.cfg.scale *= 1.1,
            _ => {}
        }
        Action::Continue
    }

    fn handle_editor(&mut self, key: &KeyEvent) -> Action {
        // Alt chords work from any editor sub-state.
        if key.modifiers.contains(Modifiers::ALT) {
            if let KeyCode::Char(c) = key.code {
                match c.to_ascii_lowercase() {
                    'c' => self.set_submode(SubMode::Color),
                    'd' => self.set_submode(SubMode::Draw),
                    'v' => self.validate_current(),
                    's' if self.editor.raw.is_none() => {
                        self.start_path_edit(EditTarget::Export);
                    }
                    'i' if self.editor.raw.is_none() => {
                        self.start_path_edit(EditTarget::Import);
                    }
                    _ => {}
                }
            }
            return Action::Continue;
        }

        if self.editor.raw.is_some() {
            return self.handle_raw_edit(key);
        }
        if self.in_token_mode() {
            return self.handle_token_mode(key);
        }
        self.handle_editor_params(key)
    }

    fn handle_raw_edit(&mut self, key: &KeyEvent) -> Action {
        let is_expr = matches!(self.editor.raw_target, EditTarget::Expr { .. });
        let ctrl = key.modifiers.contains(Modifiers::CTRL);

        match key.code {
            KeyCode::Enter => self.apply_raw_edit(true),
            KeyCode::Char('y') if ctrl => self.apply_raw_edit(true),
            KeyCode::Char('r') if ctrl && is_expr => self.apply_raw_edit(false),
            KeyCode::Char('x') if ctrl => self.cancel_raw_edit(),
            KeyCode::Char('l') if ctrl && is_expr => {
                self.editor.live_preview = !self.editor.live_preview;
                if self.editor.live_preview {
                    self.apply_raw_edit(false);
                }
            }
            KeyCode::Backspace => {
                if let Some(raw) = &mut self.editor.raw {
                    raw.backspace();
                }
                if self.editor.live_preview && is_expr {
                    self.apply_raw_edit(false);
                }
            }
            KeyCode::Left => {
                if let Some(raw) = &mut self.editor.raw {
                    raw.left();
                }
            }
            KeyCode::Right => {
                if let Some(raw) = &mut self.editor.raw {
                    raw.right();
                }
            }
            KeyCode::Char(c) if !ctrl && (' '..='~').contains(&c) => {
                if let Some(raw) = &mut self.editor.raw {
                    raw.insert(c);
                }
                if self.editor.live_preview && is_expr {
                    self.apply_raw_edit(false);
                }
            }
            _ => {}
        }
        Action::Continue
    }

    fn handle_token_mode(&mut self, key: &KeyEvent) -> Action {
        let slot = self.active_slot();
        let ctrl = key.modifiers.contains(Modifiers::CTRL);

        // A pending brace request consumes the next open-brace key; any
        // other key disarms it and is handled normally.
        if self.editor.tokens[slot]
            .as_ref()
            .is_some_and(TokenEditor::brace_pending)
        {
            if let KeyCode::Char(c @ ('(' | '[' | '{')) = key.code {
                if !ctrl {
                    if let Some(tokens) = &mut self.editor.tokens[slot] {
                        tokens.insert_block(c);
                    }
                    self.live_sync();
                    return Action::Continue;
                }
            }
            if let Some(tokens) = &mut self.editor.tokens[slot] {
                tokens.cancel_brace();
            }
        }

        match key.code {
            KeyCode::Char('t') if ctrl => self.run_mode = RunMode::Player,
            KeyCode::Char('e') if ctrl => {
                self.start_raw_edit(EditTarget::Expr { token: None });
            }
            KeyCode::Char('l') if ctrl => {
                self.editor.live_preview = !self.editor.live_preview;
                if self.editor.live_preview {
                    self.commit_tokens();
                }
            }
            KeyCode::Char('o') if ctrl => {
                if let Some(tokens) = &mut self.editor.tokens[slot] {
                    tokens.remove_block();
                }
                self.live_sync();
            }
            KeyCode::Char('p') if ctrl => {
                if let Some(tokens) = &mut self.editor.tokens[slot] {
                    tokens.request_brace();
                }
            }
            KeyCode::Char('i') if !ctrl => self.info_mode = self.info_mode.next(),
            KeyCode::Char('e') if !ctrl => {
                let sel = self.editor.tokens[slot].as_ref().map(TokenEditor::selection);
                if let Some(sel) = sel {
                    self.start_raw_edit(EditTarget::Expr { token: Some(sel) });
                }
            }
            KeyCode::Backspace => {
                if let Some(tokens) = &mut self.editor.tokens[slot] {
                    tokens.pop_char();
                }
                self.live_sync();
            }
            KeyCode::Up => {
                let step = self.editor.step.value();
                if let Some(tokens) = &mut self.editor.tokens[slot] {
                    tokens.adjust(1, step);
                }
                self.live_sync();
            }
            KeyCode::Down => {
                let step = self.editor.step.value();
                if let Some(tokens) = &mut self.editor.tokens[slot] {
                    tokens.adjust(-1, step);
                }
                self.live_sync();
            }
            KeyCode::Right => {
                if let Some(tokens) = &mut self.editor.tokens[slot] {
                    tokens.select_next();
                }
            }
            KeyCode::Left => {
                if let Some(tokens) = &mut self.editor.tokens[slot] {
                    tokens.select_prev();
                }
            }
            KeyCode::Enter => self.exit_token_mode(),
            KeyCode::Char(c) if !ctrl && (' '..='~').contains(&c) => {
                if let Some(tokens) = &mut self.editor.tokens[slot] {
                    tokens.push_char(c);
                }
                self.live_sync();
            }
            _ => {}
        }
        Action::Continue
    }

    fn handle_editor_params(&mut self, key: &KeyEvent) -> Action {
        let ctrl = key.modifiers.contains(Modifiers::CTRL);

        match key.code {
            KeyCode::Char('t') if ctrl => self.run_mode = RunMode::Player,
            KeyCode::Char('e') if ctrl => {
                if self.editor.param == Param::Expr {
                    self.start_raw_edit(EditTarget::Expr { token: None });
                }
            }
            KeyCode::Char('l') if ctrl => {
                self.editor.live_preview = !self.editor.live_preview;
            }
            KeyCode::Char('i') => self.info_mode = self.info_mode.next(),
            KeyCode::Char('+') => self.adjust_param(1),
            KeyCode::Char('-') => self.adjust_param(-1),
            KeyCode::Char('[') => self.editor.step.smaller(),
            KeyCode::Char(']') => self.editor.step.larger(),
            KeyCode::Enter => {
                if self.editor.param == Param::Expr {
                    self.enter_token_mode();
                }
            }
            KeyCode::Right => self.editor.param = self.editor.param.next(),
            KeyCode::Left => self.editor.param = self.editor.param.prev(),
            KeyCode::Up => self.adjust_param(1),
            KeyCode::Down => self.adjust_param(-1),
            _ => {}
        }
        Action::Continue
    }

    // ── Rendering ───────────────────────────────────────────────────

    /// The effective frame size: terminal size with config overrides.
    const fn effective_size(&self, term: Size) -> Size {
        Size {
            cols: if self.cfg.width > 0 { self.cfg.width } else { term.cols },
            rows: if self.cfg.height > 0 { self.cfg.height } else { term.rows },
        }
    }

    /// Per-pixel color decision, shared by all render modes.
    ///
    /// `cycle_base` feeds the animated cycling strategy: the glyph-derived
    /// palette index for expression mode, the iteration count for fractals.
    fn pixel_color(&self, cycle_base: usize, vars: &Vars, t: f64) -> Option<u8> {
        if !self.cfg.use_color {
            return None;
        }
        if let Some(pal) = &self.color {
            if self.cfg.color_func {
                return Some(pal.select_cycled(cycle_base, t));
            }
            return Some(pal.select_by_expr(vars));
        }
        // Legacy fallback: the color expression yields the terminal code
        // directly.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let code = self.compiled.color.eval(vars).clamp(0.0, 255.0).round() as u8;
        Some(code)
    }

    /// Emit one cell: glyph selection, background substitution, and the
    /// coalesced color escape.
    fn shade(
        &self,
        out: &mut OutputBuffer,
        pen: &mut Pen,
        val: f64,
        cycle_base: usize,
        vars: &Vars,
        t: f64,
    ) {
        let glyph = self.charset.glyph_for_value(val);
        let glyph = if glyph.is_space() {
            self.background.glyph()
        } else {
            glyph
        };

        let code = self.pixel_color(cycle_base, vars, t);
        let want_color = code.is_some() && !(self.cfg.transparent_ws && glyph.is_space());
        match code {
            Some(code) if want_color => pen.set(out, code),
            _ => pen.clear(out),
        }

        out.push_str(glyph.as_str());
    }

    /// Free-expression mode: normalized, aspect-corrected coordinates.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn render_expr(&self, out: &mut OutputBuffer, cols: u16, content_h: u16, t: f64) {
        let w = cols as usize;
        let h = content_h as usize;
        if w == 0 || h == 0 {
            return;
        }
        let aspect = w as f64 / h as f64;
        let x_span = w.saturating_sub(1).max(1);
        let y_span = h.saturating_sub(1).max(1);

        for j in 0..h {
            ansi::cursor_to(out, 0, j as u16).ok();
            let mut pen = Pen::new();

            for i in 0..w {
                let x = (i as f64 / x_span as f64).mul_add(2.0, -1.0) * aspect;
                let y = (j as f64 / y_span as f64).mul_add(2.0, -1.0);
                let vars = Vars {
                    x,
                    y,
                    i: i as f64,
                    j: j as f64,
                    t,
                    r: x.hypot(y),
                    a: y.atan2(x),
                    n: 0.0,
                };

                let val = self.compiled.value.eval(&vars).clamp(-1.0, 1.0);
                let base = self.color.as_ref().map_or(0, |p| p.index_for_value(val));
                self.shade(out, &mut pen, val, base, &vars, t);
            }
            pen.finish_row(out);
        }
    }

    /// Escape-time iteration shared by the two fractal modes: Mandelbrot
    /// iterates z from 0 with c at the pixel, Julia iterates z from the
    /// pixel with a fixed c.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn render_fractal(&self, out: &mut OutputBuffer, cols: u16, content_h: u16, t: f64) {
        let w = cols as usize;
        let h = content_h as usize;
        if w == 0 || h == 0 {
            return;
        }
        let ar = h as f64 / w as f64;
        let x_span = w.saturating_sub(1).max(1);
        let y_span = h.saturating_sub(1).max(1);
        let max = self.cfg.max_iter.max(1);
        let julia = self.cfg.mode == Mode::Julia;

        for j in 0..h {
            ansi::cursor_to(out, 0, j as u16).ok();
            let mut pen = Pen::new();

            for i in 0..w {
                let px = self.cfg.center_x + (i as f64 / x_span as f64 - 0.5) * self.cfg.scale;
                let py =
                    self.cfg.center_y + (j as f64 / y_span as f64 - 0.5) * self.cfg.scale * ar;

                let (mut zx, mut zy, cx, cy) = if julia {
                    (px, py, self.cfg.c_re, self.cfg.c_im)
                } else {
                    (0.0, 0.0, px, py)
                };

                let mut iter = 0u32;
                while zx * zx + zy * zy <= 4.0 && iter < max {
                    let next_x = zx.mul_add(zx, -(zy * zy)) + cx;
                    zy = 2.0 * zx * zy + cy;
                    zx = next_x;
                    iter += 1;
                }

                let val = if iter >= max {
                    -1.0
                } else {
                    f64::from(iter) / f64::from(max) * 2.0 - 1.0
                };

                // Color context: Mandelbrot exposes the pixel's plane
                // point, Julia the escaped z.
                let (vx, vy) = if julia { (zx, zy) } else { (px, py) };
                let vars = Vars {
                    x: vx,
                    y: vy,
                    i: i as f64,
                    j: j as f64,
                    t,
                    r: vx.hypot(vy),
                    a: vy.atan2(vx),
                    n: 0.0,
                };

                self.shade(out, &mut pen, val, iter as usize, &vars, t);
            }
            pen.finish_row(out);
        }
    }

    // ── Info bar ────────────────────────────────────────────────────

    /// Recompute how many terminal rows the info bar occupies, after
    /// wrapping at the current width. Runs every frame — the line count
    /// changes with info mode, editor state, and terminal width.
    fn update_info_rows(&mut self, cols: u16) {
        if self.info_mode == InfoMode::None {
            self.info_rows = 0;
            return;
        }
        let (line1, line2) = self.format_info_lines();
        let mut rows = count_wrapped(&line1, cols);
        if self.info_mode == InfoMode::All {
            rows += count_wrapped(&line2, cols);
        }
        self.info_rows = rows;
    }

    /// Draw the info bar at the bottom, clearing the previous frame's bar
    /// first (it may have been taller).
    fn draw_info_bar(&mut self, out: &mut OutputBuffer, size: Size) {
        let max_rows = self.info_rows.max(self.prev_info_rows);
        if max_rows > 0 {
            let clear_start = size.rows.saturating_sub(max_rows);
            for r in clear_start..size.rows {
                ansi::cursor_to(out, 0, r).ok();
                ansi::clear_line(out).ok();
            }
        }
        if self.info_mode == InfoMode::None {
            self.prev_info_rows = 0;
            return;
        }

        let (line1, line2) = self.format_info_lines();
        let start = size.rows.saturating_sub(self.info_rows);
        let used = print_wrapped(out, &line1, size.cols, start);
        if self.info_mode == InfoMode::All {
            print_wrapped(out, &line2, size.cols, start + used);
        }
        self.prev_info_rows = self.info_rows;
    }

    /// The editor accent colors for the current submode.
    const fn accent(&self) -> (&'static str, &'static str, &'static str) {
        match self.editor.submode {
            SubMode::Draw => (COL_DRAW_KEY, COL_DRAW_NAME, COL_DRAW_VALUE),
            SubMode::Color => (COL_COLOR_KEY, COL_COLOR_NAME, COL_COLOR_VALUE),
        }
    }

    /// Build the info bar's two logical lines for the current state.
    fn format_info_lines(&self) -> (String, String) {
        match self.run_mode {
            RunMode::Player => self.format_player_lines(),
            RunMode::Editor => self.format_editor_lines(),
        }
    }

    fn format_player_lines(&self) -> (String, String) {
        let colname = self.color.as_ref().map_or("expr", ColorPalette::name);
        let color_state = if self.cfg.color_func { "func" } else { "pal" };
        let ws_state = if self.cfg.transparent_ws { "transp" } else { "color" };
        let charname = if self.charset.name().is_empty() {
            "(unnamed)"
        } else {
            self.charset.name()
        };
        let pause_tag = if self.paused() { " [paused]" } else { "" };

        let line1 = format!(
            "{COL_RESET}[{COL_NAME}FPS{COL_RESET}:{COL_VALUE}{fps}{COL_RESET}] \
             [{COL_KEY}m{COL_RESET}]({COL_NAME}{mode}{COL_RESET}) \
             [{COL_KEY}c{COL_RESET}]({COL_NAME}{colname}{COL_RESET}:{COL_STATE}{color_state}{COL_RESET}) \
             [{COL_KEY}n{COL_RESET}]({COL_NAME}{charname}{COL_RESET}) \
             [{COL_KEY}w{COL_RESET}]({COL_VALUE}'{bg}'{COL_RESET}) \
             [{COL_KEY}W{COL_RESET}]({COL_NAME}ws{COL_RESET}:{COL_STATE}{ws_state}{COL_RESET}){pause_tag}",
            fps = self.cfg.fps,
            mode = self.cfg.mode.display_name(),
            bg = self.background.glyph().as_str(),
        );

        let line2 = format!(
            "{COL_RESET}{k}[q]{r} quit | {k}[p]{r} pause | {k}[i]{r} info | \
             {k}[w]{r} cycle-bg | {k}[W]{r} ws-transp | {k}[+/-]{r} fps | \
             {k}[C]{r} toggle-color | {k}[c]{r} next-col | {k}[f]{r} col-math | \
             {k}[n]{r} next-char | {k}[m]{r} next-preset | {k}[r]{r} reload | \
             {k}[^T]{r} editor | {k}[arrows/[]]{r} pan/zoom",
            k = COL_KEY,
            r = COL_RESET,
        );

        (line1, line2)
    }

    fn format_editor_lines(&self) -> (String, String) {
        let (key, name, value) = self.accent();
        let sub = self.editor.submode.display_name();
        let step = self.editor.step.value();

        if let Some(tokens) = &self.editor.tokens[self.active_slot()] {
            let line1 = format!(
                "{COL_RESET}[{value}{sub}{COL_RESET}] {}",
                format_token_line(tokens)
            );
            let line2 = if let Some(raw) = &self.editor.raw {
                format!(
                    "{COL_RESET}Block: {value}{buf}{COL_RESET} \
                     ({key}^Y{COL_RESET}/{key}Enter{COL_RESET} save {key}^R{COL_RESET} run \
                     {key}^X{COL_RESET} cancel {key}^L{COL_RESET} live)",
                    buf = format_expr_colored(raw.text()),
                )
            } else {
                format!(
                    "{COL_RESET}{key}[Enter]{r} done | {key}[arrows]{r} sel/adj | \
                     {key}[e]{r} edit | {key}[^O]{r} rmblk | {key}[^P]{r} blk | \
                     {key}[^E]{r} raw | {key}[^T]{r} player | {key}[^L]{r} live | \
                     {key}[Alt+V]{r} val | {key}[Alt+S]{r} save | {key}[Alt+I]{r} load | \
                     {key}[i]{r} info",
                    r = COL_RESET,
                )
            };
            return (line1, line2);
        }

        let sel_fps = if self.editor.param == Param::Fps { COL_SEL } else { COL_RESET };
        let sel_expr = if self.editor.param == Param::Expr { COL_SEL } else { COL_RESET };
        let line1 = format!(
            "{COL_RESET}[{value}{sub}{COL_RESET}] \
             {sel_fps}[{name}FPS{value}:{fps}]{COL_RESET} \
             {sel_expr}[{name}Expr{COL_RESET}:{expr}]{COL_RESET} \
             [{name}step{COL_RESET}:{value}{step:.2}{COL_RESET}]",
            fps = self.cfg.fps,
            expr = format_expr_colored(self.current_expr()),
        );

        let line2 = if let Some(raw) = &self.editor.raw {
            match self.editor.raw_target {
                EditTarget::Expr { .. } => format!(
                    "{COL_RESET}Edit: {value}{buf}{COL_RESET} \
                     ({key}^Y{COL_RESET}/{key}Enter{COL_RESET} save {key}^R{COL_RESET} run \
                     {key}^X{COL_RESET} cancel {key}^L{COL_RESET} live)",
                    buf = format_expr_colored(raw.text()),
                ),
                EditTarget::Export | EditTarget::Import => format!(
                    "{COL_RESET}Path: {value}{buf}{COL_RESET} \
                     ({key}^Y{COL_RESET}/{key}Enter{COL_RESET} ok {key}^X{COL_RESET} cancel)",
                    buf = raw.text(),
                ),
            }
        } else {
            format!(
                "{COL_RESET}{key}[^T]{r} player | {key}[arrows]{r} select/adjust | \
                 {key}[+/-]{r} adjust | {key}[[]]{r} step | {key}[^E]{r} edit | \
                 {key}[^L]{r} live | {key}[Alt+V]{r} val | {key}[Alt+S]{r} save | \
                 {key}[Alt+I]{r} load | {key}[i]{r} info",
                r = COL_RESET,
            )
        };

        (line1, line2)
    }
}

// ─── Info-bar text helpers ──────────────────────────────────────────────────

/// Syntax color for a token kind in the editor views.
const fn token_color(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Number => COL_TOK_NUM,
        TokenKind::Ident => COL_TOK_FUNC,
        TokenKind::Operator => COL_TOK_OP,
        TokenKind::Paren => COL_TOK_PAR,
        TokenKind::Other => COL_RESET,
    }
}

/// Colorize an expression string by tokenizing it.
fn format_expr_colored(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len() * 3);
    for token in tokenize(expr) {
        out.push_str(token_color(token.kind));
        out.push_str(&token.text);
        out.push_str(COL_RESET);
    }
    out
}

/// Render a token sequence as bracketed, colored cells with the selection
/// in reverse video.
fn format_token_line(tokens: &TokenEditor) -> String {
    let mut out = String::new();
    for (i, token) in tokens.tokens().iter().enumerate() {
        let sel = if i == tokens.selection() { COL_SEL } else { "" };
        out.push_str(COL_RESET);
        out.push('[');
        out.push_str(sel);
        out.push_str(token_color(token.kind));
        out.push_str(&token.text);
        out.push_str(COL_RESET);
        out.push(']');
        if i + 1 < tokens.tokens().len() {
            out.push(' ');
        }
    }
    out
}

/// How many terminal rows `line` occupies when wrapped at `width`,
/// counting display columns and skipping SGR escape sequences.
fn count_wrapped(line: &str, width: u16) -> u16 {
    if width == 0 || line.is_empty() {
        return 0;
    }
    let width = usize::from(width);
    let mut col = 0usize;
    let mut rows: u16 = 1;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip to the SGR terminator.
            for e in chars.by_ref() {
                if e == 'm' {
                    break;
                }
            }
            continue;
        }
        let w = c.width().unwrap_or(0);
        if col + w > width {
            rows += 1;
            col = 0;
        }
        col += w;
    }
    rows
}

/// Emit `line` starting at `row`, wrapping at `width`, with a cursor move
/// at the start of every output row. Returns the number of rows used.
fn print_wrapped(out: &mut OutputBuffer, line: &str, width: u16, row: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let width = usize::from(width);
    let mut col = 0usize;
    let mut rows: u16 = 1;
    ansi::cursor_to(out, 0, row).ok();

    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Copy the escape sequence through untouched.
            out.push_str("\x1b");
            for e in chars.by_ref() {
                let mut tmp = [0u8; 4];
                out.push_str(e.encode_utf8(&mut tmp));
                if e == 'm' {
                    break;
                }
            }
            continue;
        }
        let w = c.width().unwrap_or(0);
        if col + w > width {
            rows += 1;
            col = 0;
            ansi::cursor_to(out, 0, row + rows - 1).ok();
        }
        let mut tmp = [0u8; 4];
        out.push_str(c.encode_utf8(&mut tmp));
        col += w;
    }
    rows
}

// ─── App wiring ─────────────────────────────────────────────────────────────

impl App for Viz {
    fn on_key(&mut self, key: &KeyEvent) -> Action {
        // Ctrl-C always quits: ISIG is off in raw mode, so the byte
        // arrives here instead of becoming a signal.
        if key.modifiers.contains(Modifiers::CTRL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }

        match self.run_mode {
            RunMode::Player => self.handle_player(key),
            RunMode::Editor => self.handle_editor(key),
        }
    }

    fn tick(&mut self) -> Action {
        if let Some(limit) = self.cfg.duration_ms {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let elapsed_ms = (self.elapsed() * 1000.0).round().max(0.0) as u64;
            if elapsed_ms >= limit {
                return Action::Quit;
            }
        }
        Action::Continue
    }

    fn frame(&mut self, out: &mut OutputBuffer, term_size: Size) {
        let size = self.effective_size(term_size);
        let t = self.elapsed();

        self.update_info_rows(size.cols);
        let content_h = size.rows.saturating_sub(self.info_rows);

        match self.cfg.mode {
            Mode::Expr => self.render_expr(out, size.cols, content_h, t),
            Mode::Mandelbrot | Mode::Julia => self.render_fractal(out, size.cols, content_h, t),
        }

        self.draw_info_bar(out, size);
    }

    fn frame_interval(&self) -> Duration {
        let fps = if self.cfg.fps == 0 { 30 } else { self.cfg.fps };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ms = (1000.0 / f64::from(fps)).round() as u64;
        Duration::from_millis(ms)
    }
}

// ─── CLI ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    config: Option<String>,
    preset: Option<String>,
    charset: Option<String>,
    color: Option<String>,
    background: Option<String>,
    color_func: bool,
}

/// Parse argv (without the program name). `Ok(None)` means help was
/// requested.
fn parse_cli(args: &[String]) -> Result<Option<CliOptions>, String> {
    let mut opts = CliOptions::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut take = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{name} requires a value"))
        };
        match arg.as_str() {
            "-c" | "--config" => opts.config = Some(take("--config")?),
            "--preset" => opts.preset = Some(take("--preset")?),
            "--char" => opts.charset = Some(take("--char")?),
            "--color" => opts.color = Some(take("--color")?),
            "--background" => opts.background = Some(take("--background")?),
            "--color-func" => opts.color_func = true,
            "-h" | "--help" => return Ok(None),
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(Some(opts))
}

fn usage() {
    eprintln!(
        "Usage: glim [--config FILE] [--preset NAME] [--char NAME] [--color NAME] \
         [--background GLYPH] [--color-func]"
    );
    eprintln!(
        "Keys: q quit | p pause | i info | W ws-transparency | w cycle background | \
         +/- fps | C toggle color | c next color | f col-math | n next charset | \
         m next preset | r reload | ^T editor | arrows/[] pan/zoom"
    );
    let presets: Vec<&str> = PRESETS.iter().map(|(n, _)| *n).collect();
    eprintln!("Presets: {}", presets.join(" "));
    eprintln!("Char palettes: {}", builtin::charset_names().join(" "));
    eprintln!("Color palettes: {}", builtin::color_names().join(" "));
    eprintln!(
        "Background cycle: {}",
        glim_palette::BG_CANDIDATES.join(", ")
    );
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let opts = match parse_cli(&args) {
        Ok(Some(opts)) => opts,
        Ok(None) => {
            usage();
            return;
        }
        Err(msg) => {
            eprintln!("glim: {msg}");
            usage();
            process::exit(1);
        }
    };

    // Palette selections are non-fatal: an unknown name warns and the
    // default stays.
    let mut select = PaletteSelect::default();
    if let Some(name) = &opts.charset {
        match builtin::find_charset(name) {
            Some(idx) => select.char_idx = Some(idx),
            None => eprintln!("glim: char palette not found: {name}"),
        }
    }
    if let Some(name) = &opts.color {
        match builtin::find_color(name) {
            Some(idx) => select.color_idx = Some(idx),
            None => eprintln!("glim: color palette not found: {name}"),
        }
    }

    let mut viz = Viz::new(Config::default(), select);

    // Config source: explicit file (fatal on failure), named preset
    // (fatal when unknown), else the first baked preset.
    if let Some(path) = &opts.config {
        let path = PathBuf::from(path);
        if let Err(e) = viz.load_config_file(&path) {
            eprintln!("glim: failed to load config: {}: {e}", path.display());
            process::exit(1);
        }
        viz.config_path = Some(path);
    } else if let Some(name) = &opts.preset {
        match find_preset(name) {
            Some(idx) => viz.load_preset(idx),
            None => {
                eprintln!("glim: preset not found: {name}");
                process::exit(1);
            }
        }
    } else {
        viz.load_preset(0);
    }

    if let Some(bg) = &opts.background {
        viz.cfg.background = bg.clone();
        viz.background = Background::from_glyph(bg);
    }
    if opts.color_func {
        viz.cfg.color_func = true;
    }

    let mut frame_loop = FrameLoop::new().unwrap_or_else(|e| {
        eprintln!("glim: failed to initialize terminal: {e}");
        process::exit(1);
    });

    if let Err(e) = frame_loop.run(&mut viz) {
        eprintln!("glim: {e}");
        process::exit(1);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── Helpers ───────────────────────────────────────────────────────

    fn press(ch: char) -> KeyEvent {
        KeyEvent::plain(KeyCode::Char(ch))
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::plain(code)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::ctrl(ch)
    }

    fn alt(ch: char) -> KeyEvent {
        KeyEvent::alt(ch)
    }

    fn feed(viz: &mut Viz, keys: &[KeyEvent]) {
        for k in keys {
            viz.on_key(k);
        }
    }

    /// A small deterministic test rig: 10×5, no info bar, no color.
    fn test_viz(expr: &str, charset: &str) -> Viz {
        let cfg = Config {
            width: 10,
            height: 5,
            use_color: false,
            charset: charset.to_string(),
            expr_value: expr.to_string(),
            ..Config::default()
        };
        let mut viz = Viz::new(cfg, PaletteSelect::default());
        viz.info_mode = InfoMode::None;
        viz
    }

    fn frame_text(viz: &mut Viz) -> String {
        let mut out = OutputBuffer::new();
        viz.frame(&mut out, Size { cols: 10, rows: 5 });
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    // ── INI loading ───────────────────────────────────────────────────

    #[test]
    fn ini_render_section() {
        let cfg = parse_ini(
            "[render]\nfps=60\nuse_color=0\ntransparent_ws=0\nwidth=120\nheight=40\n\
             charset=\" #\"\nbackground=\"·\"\nduration=2.5\n",
        );
        assert_eq!(cfg.fps, 60);
        assert!(!cfg.use_color);
        assert!(!cfg.transparent_ws);
        assert_eq!(cfg.width, 120);
        assert_eq!(cfg.height, 40);
        assert_eq!(cfg.charset, " #");
        assert_eq!(cfg.background, "·");
        assert_eq!(cfg.duration_ms, Some(2500));
    }

    #[test]
    fn ini_mode_and_fractal_sections() {
        let cfg = parse_ini(
            "[mode]\ntype=julia\n[fractal]\nmax_iter=99\ncenter_x=0.5\ncenter_y=-0.25\n\
             scale=1.5\nc_re=0.3\nc_im=-0.01\n",
        );
        assert_eq!(cfg.mode, Mode::Julia);
        assert_eq!(cfg.max_iter, 99);
        assert!((cfg.center_x - 0.5).abs() < 1e-12);
        assert!((cfg.center_y + 0.25).abs() < 1e-12);
        assert!((cfg.scale - 1.5).abs() < 1e-12);
        assert!((cfg.c_re - 0.3).abs() < 1e-12);
        assert!((cfg.c_im + 0.01).abs() < 1e-12);
    }

    #[test]
    fn ini_unknown_keys_and_sections_ignored() {
        let cfg = parse_ini("[render]\nbogus=1\n[nothing]\nfps=999\n");
        assert_eq!(cfg.fps, 30); // the [nothing] fps never applies
    }

    #[test]
    fn ini_comments_stripped() {
        let cfg = parse_ini("[render] # section\nfps=50 ; inline\n# whole line\n");
        assert_eq!(cfg.fps, 50);
    }

    #[test]
    fn ini_negative_duration_is_infinite() {
        let cfg = parse_ini("[render]\nduration=-1\n");
        assert_eq!(cfg.duration_ms, None);
    }

    #[test]
    fn export_round_trips_through_ini() {
        let cfg = Config {
            expr_value: "x*2".to_string(),
            expr_color: "t".to_string(),
            ..Config::default()
        };
        let text = export_text(&cfg);
        assert_eq!(text, "[expr]\nvalue=x*2\ncolor=t\n");

        let reloaded = parse_ini(&text);
        assert_eq!(reloaded.expr_value, "x*2");
        assert_eq!(reloaded.expr_color, "t");
    }

    // ── Presets ───────────────────────────────────────────────────────

    #[test]
    fn all_presets_parse() {
        for (name, text) in PRESETS {
            let cfg = parse_ini(text);
            assert!(cfg.fps > 0, "preset {name} has broken fps");
        }
    }

    #[test]
    fn preset_lookup_case_insensitive() {
        assert_eq!(find_preset("WAVES"), Some(0));
        assert!(find_preset("nope").is_none());
    }

    #[test]
    fn preset_cycling_wraps() {
        let mut viz = test_viz("x", " #");
        viz.load_preset(PRESETS.len() - 1);
        viz.on_key(&press('m'));
        assert_eq!(viz.preset_idx, Some(0));
    }

    // ── CLI ───────────────────────────────────────────────────────────

    #[test]
    fn cli_parses_all_options() {
        let args: Vec<String> = [
            "--config",
            "a.ini",
            "--char",
            "blocks",
            "--color",
            "fire",
            "--background",
            "·",
            "--color-func",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        let opts = parse_cli(&args).unwrap().unwrap();
        assert_eq!(opts.config.as_deref(), Some("a.ini"));
        assert_eq!(opts.charset.as_deref(), Some("blocks"));
        assert_eq!(opts.color.as_deref(), Some("fire"));
        assert_eq!(opts.background.as_deref(), Some("·"));
        assert!(opts.color_func);
    }

    #[test]
    fn cli_help_is_ok_none() {
        let args = vec!["-h".to_string()];
        assert_eq!(parse_cli(&args).unwrap(), None);
    }

    #[test]
    fn cli_missing_value_errors() {
        let args = vec!["--preset".to_string()];
        assert!(parse_cli(&args).is_err());
    }

    #[test]
    fn cli_unknown_arg_errors() {
        let args = vec!["--frobnicate".to_string()];
        assert!(parse_cli(&args).is_err());
    }

    // ── End-to-end rendering ──────────────────────────────────────────

    #[test]
    fn expr_x_splits_frame_at_midpoint() {
        // 10×5 frame, value = x, two glyphs (space, #): the left half is
        // background-substituted space, the right half '#'.
        let mut viz = test_viz("x", " #");
        let text = frame_text(&mut viz);

        let mut expected = String::new();
        for row in 1..=5 {
            expected.push_str(&format!("\x1b[{row};1H     #####"));
        }
        assert_eq!(text, expected);
    }

    #[test]
    fn colored_frame_coalesces_escapes() {
        // Constant color expression: one escape at the start of the
        // non-blank run, one reset at its end, per row.
        let mut viz = test_viz("x", " #");
        viz.cfg.use_color = true;
        viz.cfg.expr_color = "7".to_string();
        viz.recompile();
        let text = frame_text(&mut viz);

        let mut expected = String::new();
        for row in 1..=5 {
            expected.push_str(&format!("\x1b[{row};1H     \x1b[38;5;7m#####\x1b[0m"));
        }
        assert_eq!(text, expected);
    }

    #[test]
    fn background_substitution_fills_blanks() {
        let mut viz = test_viz("x", " #");
        viz.background = Background::from_glyph("·");
        let text = frame_text(&mut viz);
        assert!(text.contains("·····#####"));
    }

    #[test]
    fn transparent_ws_keeps_nonspace_background_colored() {
        let mut viz = test_viz("x", " #");
        viz.cfg.use_color = true;
        viz.cfg.expr_color = "7".to_string();
        viz.recompile();
        viz.background = Background::from_glyph("·");
        // Background glyph is not a space, so it IS colored even with
        // transparent_ws set.
        let text = frame_text(&mut viz);
        assert!(text.contains("\x1b[38;5;7m·····#####\x1b[0m"));
    }

    #[test]
    fn mandelbrot_interior_is_blank() {
        // Zoomed deep into the interior: nothing escapes, every value is
        // -1, every glyph is the blank end of the ramp.
        let cfg = Config {
            width: 10,
            height: 5,
            use_color: false,
            mode: Mode::Mandelbrot,
            center_x: 0.0,
            center_y: 0.0,
            scale: 0.001,
            max_iter: 50,
            charset: " #".to_string(),
            ..Config::default()
        };
        let mut viz = Viz::new(cfg, PaletteSelect::default());
        viz.info_mode = InfoMode::None;
        let text = frame_text(&mut viz);
        assert!(!text.contains('#'));
    }

    #[test]
    fn julia_far_exterior_escapes_fast() {
        // Centered far outside the set: every point is already past the
        // escape radius, so iter stays 0 and the first glyph is selected.
        let cfg = Config {
            width: 10,
            height: 5,
            use_color: false,
            mode: Mode::Julia,
            center_x: 10.0,
            center_y: 10.0,
            scale: 0.1,
            max_iter: 50,
            charset: "@#".to_string(),
            ..Config::default()
        };
        let mut viz = Viz::new(cfg, PaletteSelect::default());
        viz.info_mode = InfoMode::None;
        let text = frame_text(&mut viz);
        assert!(text.contains('@'));
        assert!(!text.contains('#'));
    }

    // ── Player keys ───────────────────────────────────────────────────

    #[test]
    fn quit_keys() {
        let mut viz = test_viz("x", " #");
        assert_eq!(viz.on_key(&press('q')), Action::Quit);
        assert_eq!(viz.on_key(&ctrl('c')), Action::Quit);
    }

    #[test]
    fn fps_adjust_clamps() {
        let mut viz = test_viz("x", " #");
        viz.cfg.fps = 240;
        viz.on_key(&press('+'));
        assert_eq!(viz.cfg.fps, 240);
        viz.cfg.fps = 1;
        viz.on_key(&press('-'));
        assert_eq!(viz.cfg.fps, 1);
        viz.on_key(&press('+'));
        assert_eq!(viz.cfg.fps, 2);
    }

    #[test]
    fn pause_toggles_and_freezes_clock() {
        let mut viz = test_viz("x", " #");
        assert!(!viz.paused());
        viz.on_key(&press('p'));
        assert!(viz.paused());
        let t1 = viz.elapsed();
        let t2 = viz.elapsed();
        assert!((t1 - t2).abs() < f64::EPSILON);
        viz.on_key(&press('p'));
        assert!(!viz.paused());
    }

    #[test]
    fn info_mode_cycles_three_states() {
        let mut viz = test_viz("x", " #");
        viz.info_mode = InfoMode::All;
        viz.on_key(&press('i'));
        assert_eq!(viz.info_mode, InfoMode::None);
        viz.on_key(&press('i'));
        assert_eq!(viz.info_mode, InfoMode::Values);
        viz.on_key(&press('i'));
        assert_eq!(viz.info_mode, InfoMode::All);
    }

    #[test]
    fn color_palette_cycling_enables_color() {
        let mut viz = test_viz("x", " #");
        assert!(viz.color.is_none());
        viz.on_key(&press('c'));
        assert!(viz.color.is_some());
        assert!(viz.cfg.use_color);
        assert_eq!(viz.select.color_idx, Some(0));
        viz.on_key(&press('c'));
        assert_eq!(viz.select.color_idx, Some(1));
    }

    #[test]
    fn charset_key_cycles_builtins() {
        let mut viz = test_viz("x", " #");
        viz.on_key(&press('n'));
        assert_eq!(viz.select.char_idx, Some(0));
        assert_eq!(viz.charset.name(), builtin::CHAR_PALETTES[0].0);
    }

    #[test]
    fn fallback_rotation_when_no_charset_configured() {
        let mut viz = test_viz("x", "");
        assert_eq!(viz.charset.name(), "fallback");
        viz.on_key(&press('n'));
        // With an empty config charset the rotation advances instead of
        // jumping to the builtin table.
        assert_eq!(viz.select.fallback_idx, 1);
    }

    #[test]
    fn background_cycle_key() {
        let mut viz = test_viz("x", " #");
        viz.on_key(&press('w'));
        assert_eq!(viz.background.glyph().as_str(), ".");
    }

    #[test]
    fn fractal_pan_and_zoom_only_in_fractal_modes() {
        let mut viz = test_viz("x", " #");
        let cx = viz.cfg.center_x;
        viz.on_key(&key(KeyCode::Right));
        assert!((viz.cfg.center_x - cx).abs() < f64::EPSILON); // expr mode: no pan

        viz.cfg.mode = Mode::Mandelbrot;
        viz.on_key(&key(KeyCode::Right));
        assert!(viz.cfg.center_x > cx);
        let scale = viz.cfg.scale;
        viz.on_key(&press(']'));
        assert!(viz.cfg.scale < scale);
    }

    // ── Duration bound ────────────────────────────────────────────────

    #[test]
    fn duration_bound_quits() {
        let mut viz = test_viz("x", " #");
        viz.cfg.duration_ms = Some(0);
        assert_eq!(viz.tick(), Action::Quit);
    }

    #[test]
    fn no_duration_runs_forever() {
        let mut viz = test_viz("x", " #");
        assert_eq!(viz.tick(), Action::Continue);
    }

    // ── Editor flows ──────────────────────────────────────────────────

    #[test]
    fn enter_and_leave_editor() {
        let mut viz = test_viz("x", " #");
        viz.on_key(&ctrl('t'));
        assert_eq!(viz.run_mode, RunMode::Editor);
        viz.on_key(&ctrl('t'));
        assert_eq!(viz.run_mode, RunMode::Player);
    }

    #[test]
    fn token_edit_adjust_commits_live() {
        let mut viz = test_viz("1+2", " #");
        feed(
            &mut viz,
            &[ctrl('t'), key(KeyCode::Right), key(KeyCode::Enter)],
        );
        assert!(viz.in_token_mode());

        // First token "1", step 1.0: Up bumps it to 2, live preview
        // re-derives immediately.
        viz.on_key(&key(KeyCode::Up));
        assert_eq!(viz.cfg.expr_value, "2+2");

        viz.on_key(&key(KeyCode::Enter));
        assert!(!viz.in_token_mode());
        assert_eq!(viz.cfg.expr_value, "2+2");
    }

    #[test]
    fn token_edit_without_live_defers_commit() {
        let mut viz = test_viz("5", " #");
        feed(
            &mut viz,
            &[ctrl('t'), key(KeyCode::Right), key(KeyCode::Enter), ctrl('l')],
        );
        assert!(!viz.editor.live_preview);
        viz.on_key(&key(KeyCode::Up));
        assert_eq!(viz.cfg.expr_value, "5"); // not yet
        viz.on_key(&key(KeyCode::Enter));
        assert_eq!(viz.cfg.expr_value, "6"); // committed on exit
    }

    #[test]
    fn brace_block_insert_and_remove() {
        let mut viz = test_viz("1+2", " #");
        feed(
            &mut viz,
            &[ctrl('t'), key(KeyCode::Right), key(KeyCode::Enter)],
        );

        feed(&mut viz, &[ctrl('p'), press('(')]);
        assert_eq!(viz.cfg.expr_value, "1()+2"); // live preview applied
        feed(&mut viz, &[ctrl('o')]);
        assert_eq!(viz.cfg.expr_value, "1+2");
    }

    #[test]
    fn pending_brace_disarmed_by_other_key() {
        let mut viz = test_viz("1", " #");
        feed(
            &mut viz,
            &[ctrl('t'), key(KeyCode::Right), key(KeyCode::Enter), ctrl('p')],
        );
        viz.on_key(&key(KeyCode::Right)); // not a brace: disarm
        let slot = viz.active_slot();
        assert!(!viz.editor.tokens[slot].as_ref().unwrap().brace_pending());
        viz.on_key(&press('('));
        // '(' now appends to the selected token instead of inserting a block.
        assert_eq!(viz.cfg.expr_value, "1(");
    }

    #[test]
    fn operator_cycle_via_arrows() {
        let mut viz = test_viz("1+2", " #");
        feed(
            &mut viz,
            &[
                ctrl('t'),
                key(KeyCode::Right),
                key(KeyCode::Enter),
                key(KeyCode::Right), // select "+"
                key(KeyCode::Up),
            ],
        );
        assert_eq!(viz.cfg.expr_value, "1-2");
    }

    #[test]
    fn raw_token_edit_commit_and_cancel() {
        let mut viz = test_viz("1+2", " #");
        feed(
            &mut viz,
            &[ctrl('t'), key(KeyCode::Right), key(KeyCode::Enter), press('e')],
        );
        assert!(viz.editor.raw.is_some());

        // Type "7" after the seeded "1", commit with Enter.
        feed(&mut viz, &[press('7'), key(KeyCode::Enter)]);
        assert!(viz.editor.raw.is_none());
        assert_eq!(viz.cfg.expr_value, "17+2");
        assert!(viz.in_token_mode()); // token mode survives the raw edit

        // Cancel path: edit again, type, then Ctrl-X restores.
        feed(&mut viz, &[press('e'), press('9'), ctrl('x')]);
        assert_eq!(viz.cfg.expr_value, "17+2");
    }

    #[test]
    fn whole_expr_raw_edit_replaces() {
        let mut viz = test_viz("1", " #");
        feed(&mut viz, &[ctrl('t'), key(KeyCode::Right), ctrl('e')]);
        assert!(viz.editor.raw.is_some());

        // Clear the seeded "1" and type a new expression.
        feed(&mut viz, &[key(KeyCode::Backspace)]);
        for c in "x*2".chars() {
            viz.on_key(&press(c));
        }
        viz.on_key(&key(KeyCode::Enter));
        assert_eq!(viz.cfg.expr_value, "x*2");
    }

    #[test]
    fn validate_repairs_raw_buffer() {
        let mut viz = test_viz("1", " #");
        feed(&mut viz, &[ctrl('t'), key(KeyCode::Right), ctrl('e')]);
        feed(&mut viz, &[key(KeyCode::Backspace)]);
        for c in "sin(x".chars() {
            viz.on_key(&press(c));
        }
        viz.on_key(&alt('v'));
        assert_eq!(viz.editor.raw.as_ref().unwrap().text(), "sin(x)");
        // Live preview already pushed the repaired text into the config.
        assert_eq!(viz.cfg.expr_value, "sin(x)");
    }

    #[test]
    fn validate_in_token_mode_retokenizes() {
        let mut viz = test_viz("(1+2", " #");
        feed(
            &mut viz,
            &[ctrl('t'), key(KeyCode::Right), key(KeyCode::Enter), alt('v')],
        );
        assert_eq!(viz.cfg.expr_value, "(1+2)");
        let slot = viz.active_slot();
        assert_eq!(viz.editor.tokens[slot].as_ref().unwrap().text(), "(1+2)");
    }

    #[test]
    fn submode_switch_selects_color_expression() {
        let mut viz = test_viz("x", " #");
        viz.cfg.expr_color = "42".to_string();
        viz.recompile();
        feed(&mut viz, &[ctrl('t'), alt('c')]);
        assert_eq!(viz.editor.submode, SubMode::Color);
        assert_eq!(viz.current_expr(), "42");
        feed(&mut viz, &[alt('d')]);
        assert_eq!(viz.current_expr(), "x");
    }

    #[test]
    fn per_slot_token_editors_are_independent() {
        let mut viz = test_viz("1+2", " #");
        viz.cfg.expr_color = "9".to_string();
        viz.recompile();

        // Enter token mode on the draw slot, then switch to color: the
        // draw slot's token editor survives.
        feed(
            &mut viz,
            &[ctrl('t'), key(KeyCode::Right), key(KeyCode::Enter), alt('c')],
        );
        assert!(!viz.in_token_mode()); // color slot has no editor
        assert!(viz.editor.tokens[0].is_some());
        feed(&mut viz, &[alt('d')]);
        assert!(viz.in_token_mode());
    }

    #[test]
    fn fps_param_adjust_with_step() {
        let mut viz = test_viz("x", " #");
        feed(&mut viz, &[ctrl('t'), press('+')]);
        assert_eq!(viz.cfg.fps, 31);
        feed(&mut viz, &[press(']'), press('+')]); // step 10
        assert_eq!(viz.cfg.fps, 41);
        feed(&mut viz, &[press('['), press('['), press('+')]); // step 0.1 → int 0
        assert_eq!(viz.cfg.fps, 41);
    }

    #[test]
    fn export_path_edit_is_plain_buffer() {
        let mut viz = test_viz("x", " #");
        feed(&mut viz, &[ctrl('t'), alt('s')]);
        assert!(viz.editor.raw.is_some());
        assert_eq!(viz.editor.raw_target, EditTarget::Export);
        // Cancel leaves everything untouched.
        viz.on_key(&ctrl('x'));
        assert!(viz.editor.raw.is_none());
    }

    #[test]
    fn export_and_import_round_trip_via_files() {
        let dir = std::env::temp_dir().join("glim-test-export");
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("out.ini");
        let path_str = path.to_string_lossy().to_string();

        let mut viz = test_viz("x+1", " #");
        feed(&mut viz, &[ctrl('t'), alt('s')]);
        for c in path_str.chars() {
            viz.on_key(&press(c));
        }
        viz.on_key(&key(KeyCode::Enter));

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("value=x+1"));

        // Import it back into a fresh app.
        let mut other = test_viz("0", " #");
        feed(&mut other, &[ctrl('t'), alt('i')]);
        for c in path_str.chars() {
            other.on_key(&press(c));
        }
        other.on_key(&key(KeyCode::Enter));
        assert_eq!(other.cfg.expr_value, "x+1");

        let _ = fs::remove_file(&path);
    }

    // ── Info bar ──────────────────────────────────────────────────────

    #[test]
    fn count_wrapped_skips_escapes() {
        assert_eq!(count_wrapped("hello", 80), 1);
        assert_eq!(count_wrapped("\x1b[1;38;5;208mhello\x1b[0m", 80), 1);
        assert_eq!(count_wrapped(&"x".repeat(100), 80), 2);
        assert_eq!(count_wrapped("", 80), 0);
    }

    #[test]
    fn print_wrapped_moves_cursor_per_row() {
        let mut out = OutputBuffer::new();
        let rows = print_wrapped(&mut out, &"ab".repeat(6), 8, 0);
        let text = String::from_utf8(out.as_bytes().to_vec()).unwrap();
        assert_eq!(rows, 2);
        assert!(text.starts_with("\x1b[1;1H"));
        assert!(text.contains("\x1b[2;1H"));
    }

    #[test]
    fn info_rows_zero_when_hidden() {
        let mut viz = test_viz("x", " #");
        viz.info_mode = InfoMode::None;
        viz.update_info_rows(80);
        assert_eq!(viz.info_rows, 0);
    }

    #[test]
    fn info_rows_values_mode_is_single_line() {
        let mut viz = test_viz("x", " #");
        viz.info_mode = InfoMode::Values;
        viz.update_info_rows(500);
        assert_eq!(viz.info_rows, 1);

        viz.info_mode = InfoMode::All;
        viz.update_info_rows(500);
        assert!(viz.info_rows >= 2);
    }

    #[test]
    fn frame_reserves_info_rows() {
        let mut viz = test_viz("x", " #");
        viz.info_mode = InfoMode::Values;
        let mut out = OutputBuffer::new();
        viz.frame(&mut out, Size { cols: 10, rows: 5 });
        let text = String::from_utf8(out.as_bytes().to_vec()).unwrap();
        // Content stops one row short of the bottom; the bar owns row 5.
        assert!(!text.contains("\x1b[5;1H     #####"));
    }

    #[test]
    fn token_line_marks_selection() {
        let tokens = TokenEditor::from_text("1+2");
        let line = format_token_line(&tokens);
        assert!(line.contains(COL_SEL));
        assert!(line.contains(COL_TOK_NUM));
        assert!(line.contains(COL_TOK_OP));
    }

    // ── Reload ────────────────────────────────────────────────────────

    #[test]
    fn reload_restores_preset_state() {
        let mut viz = test_viz("x", " #");
        viz.load_preset(0);
        let original = viz.cfg.expr_value.clone();
        viz.cfg.expr_value = "0".to_string();
        viz.on_key(&press('r'));
        assert_eq!(viz.cfg.expr_value, original);
    }
}
