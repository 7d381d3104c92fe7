//! Interactive CLI engine for router/switch-style administrative consoles.
//!
//! The engine is driven synchronously: the host event loop translates
//! terminal input into abstract [`Key`] codes and pushes them one at a time
//! into [`Engine::key`], which runs to completion and reports whether the
//! session should continue ([`LoopCode`]). There are no threads and no
//! suspension points inside the engine; command handlers run inline from
//! `key()` and produce output through the engine, where it passes the
//! per-command filter chain and the pager before reaching the renderer.
//!
//! Structure of this crate:
//! * `resolver` — word-by-word matching of the edit buffer against the
//!   command tree: completion, ambiguity, contextual help, filter suffix.
//! * `dfa` — the keystroke state machine across normal editing, incremental
//!   search, the pager prompt, and the Ctrl-X prefix state.
//! * `pager` — more-prompt buffering and its interaction keys.
//! * `output` — the filtered write path and newline normalization.
//! * `prompt` — prompt composition and horizontal scroll glyphs.
//!
//! Handlers and the dynamic-listing, command, and Ctrl-Z callbacks are
//! `Rc<dyn Fn>` values: the engine clones the `Rc` off its own state before
//! the call, so callbacks receive `&mut Engine` and may re-enter the public
//! API (print output, add history, enter modes, register commands).

mod dfa;
mod output;
mod pager;
mod prompt;
mod resolver;

pub use core_term::{CaptureScreen, CrosstermScreen, Key, Screen};
pub use core_tree::{NodeId, TreeError};
pub use resolver::{ResolveFlags, ResolveMode};

use core_edit::{EditBuffer, History, SearchState};
use core_filter::{FilterChain, FilterRegistry};
use core_tree::{CommandTree, ModeStack};
use pager::PagerState;
use std::any::Any;
use std::rc::Rc;
use tracing::debug;

/// Result of feeding one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCode {
    /// Keep feeding keys.
    Loop,
    /// An empty Enter was consumed (prompt reprinted).
    Enter,
    /// The line did not resolve to an executable command.
    Error,
    /// The session should end (Ctrl-D on an empty line, or a handler called
    /// [`Engine::exit`]).
    Eof,
}

/// Input DFA states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputState {
    Norm,
    Search,
    More,
    PrefixX,
}

/// Command handler: receives the engine and the parsed word list.
pub type Handler<S> = Rc<dyn Fn(&mut Engine<S>, &[String])>;
/// Observer invoked for every executed line with the resolved buffer text and
/// whether it dispatched.
pub type CmdCallback<S> = Rc<dyn Fn(&mut Engine<S>, &str, bool)>;
/// Dynamic-listing callback: populates a dynamic node via [`Engine::list`].
/// Must not stash the [`NodeId`] beyond the call.
pub type ListCallback<S> = Rc<dyn Fn(&mut Engine<S>, NodeId, i32)>;
/// Ctrl-Z notification hook.
pub type CtrlzCallback<S> = Rc<dyn Fn(&mut Engine<S>)>;

pub struct Engine<S: Screen> {
    screen: S,

    // prompt identity
    pub(crate) hostname: String,
    pub(crate) level: String,
    banner: String,
    modes_chain: String,

    // editing state
    pub(crate) buf: EditBuffer,
    pub(crate) hist: History,
    pub(crate) search: SearchState,

    // command tree and modes
    pub(crate) tree: CommandTree<Handler<S>>,
    modes: ModeStack<Handler<S>>,

    // filters
    pub(crate) registry: FilterRegistry,
    pub(crate) chain: FilterChain,

    // pager
    pub(crate) pager: PagerState,

    // input DFA
    pub(crate) state: InputState,
    pub(crate) retcode: LoopCode,
    pub(crate) was_tab: bool,
    pub(crate) in_cmd_cb: bool,
    pub(crate) redraw: bool,

    // terminal size
    pub(crate) sx: u16,
    pub(crate) sy: u16,

    // callbacks
    cmd_cb: Option<CmdCallback<S>>,
    list_cb: Option<ListCallback<S>>,
    ctrlz_cb: Option<CtrlzCallback<S>>,
    /// Handler selected by the last resolver pass, dispatched by Enter.
    pub(crate) pending_handler: Option<Handler<S>>,
    pub(crate) parsed: Vec<String>,

    // configuration
    telnet: bool,
    show_term_size: bool,
    handle_ctrlz: bool,
    ctrlz_exec: bool,

    // user hints
    hint_int: i64,
    hint_ptr: Option<Box<dyn Any>>,
}

/// Engine version line, printed by `Ctrl-X Ctrl-V` together with the
/// renderer's.
pub fn version() -> String {
    format!(
        "ironcli interactive console engine {}\n\n",
        env!("CARGO_PKG_VERSION")
    )
}

impl<S: Screen> Engine<S> {
    pub fn new(screen: S) -> Self {
        Self {
            screen,
            hostname: "none".to_string(),
            level: "#".to_string(),
            banner: version(),
            modes_chain: String::new(),
            buf: EditBuffer::new(),
            hist: History::new(),
            search: SearchState::new(),
            tree: CommandTree::new(),
            modes: ModeStack::new(),
            registry: FilterRegistry::with_builtins(),
            chain: FilterChain::new(),
            pager: PagerState::new(),
            state: InputState::Norm,
            retcode: LoopCode::Loop,
            was_tab: false,
            in_cmd_cb: false,
            redraw: true,
            sx: 80,
            sy: 25,
            cmd_cb: None,
            list_cb: None,
            ctrlz_cb: None,
            pending_handler: None,
            parsed: Vec::new(),
            telnet: false,
            show_term_size: false,
            handle_ctrlz: false,
            ctrlz_exec: true,
            hint_int: 0,
            hint_ptr: None,
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Begin the session: set up telnet if requested, ask for the terminal
    /// size, and emit the banner. The first prompt is drawn by the first
    /// `key()` call (feed a [`Key::ScreenSize`] to show it immediately).
    pub fn start(&mut self) {
        if self.telnet {
            self.screen.init_telnet();
        }
        self.screen.reqsize();
        if !self.banner.is_empty() {
            // Two spaces + backspaces: nudges terminal emulators that swallow
            // the first output after connect.
            self.screen.puts("  \x08\x08\r");
            let banner = self.banner.clone();
            self.screen.puts(&banner);
        }
        self.redraw = true;
        debug!(target = "engine", telnet = self.telnet, "session_start");
    }

    /// Revert telnet negotiation at session end.
    pub fn stop(&mut self) {
        if self.telnet {
            self.screen.set_telnet(false);
            self.screen.init_telnet();
        }
    }

    /// Request session teardown: the current `key()` returns [`LoopCode::Eof`].
    pub fn exit(&mut self) {
        self.retcode = LoopCode::Eof;
    }

    /// Size re-query (host-side SIGWINCH handler calls this).
    pub fn winch(&mut self) {
        self.screen.reqsize();
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    pub fn set_banner(&mut self, banner: &str) {
        self.banner = banner.to_string();
    }

    pub fn set_hostname(&mut self, hostname: &str) {
        self.hostname = hostname.to_string();
        self.redraw = true;
    }

    /// Access-level glyph shown after the mode chain (`#`, `>`, …).
    pub fn set_level(&mut self, level: &str) {
        self.level = level.to_string();
        self.redraw = true;
    }

    pub fn set_telnet(&mut self, on: bool) {
        self.telnet = on;
        self.screen.set_telnet(on);
    }

    /// Enable or disable paged output.
    pub fn set_more(&mut self, on: bool) {
        self.pager.more = on;
    }

    /// Whether the more-prompt line is erased after a single-line advance, a
    /// page advance, continue, and quit respectively.
    pub fn set_more_clear(&mut self, line: bool, page: bool, cont: bool, quit: bool) {
        self.pager.clear_line = line;
        self.pager.clear_page = page;
        self.pager.clear_cont = cont;
        self.pager.clear_quit = quit;
    }

    pub fn set_ctrlz(&mut self, on: bool) {
        self.handle_ctrlz = on;
    }

    /// Whether Ctrl-Z executes the current buffer (as opposed to discarding
    /// it) before unwinding the mode stack.
    pub fn set_ctrlz_exec(&mut self, on: bool) {
        self.ctrlz_exec = on;
    }

    pub fn set_show_term_size(&mut self, on: bool) {
        self.show_term_size = on;
    }

    // ---------------------------------------------------------------------
    // Callbacks and commands
    // ---------------------------------------------------------------------

    pub fn set_cmd_cb(&mut self, cb: CmdCallback<S>) {
        self.cmd_cb = Some(cb);
    }

    pub fn set_list_cb(&mut self, cb: ListCallback<S>) {
        self.list_cb = Some(cb);
    }

    pub fn set_ctrlz_cb(&mut self, cb: CtrlzCallback<S>) {
        self.ctrlz_cb = Some(cb);
    }

    /// Register a command word under `parent` (or at the top level of the
    /// tree currently in force). `@<id>` registers a dynamic placeholder,
    /// `^…$` a regex leaf (compiled here; bad patterns fail registration).
    pub fn add_cmd(
        &mut self,
        parent: Option<NodeId>,
        word: &str,
        help: &str,
        handler: Option<Handler<S>>,
    ) -> Result<NodeId, TreeError> {
        self.tree.add(parent, word, help, handler)
    }

    /// Insert one item into a dynamic node's listing; only valid from within
    /// the dynamic-listing callback.
    pub fn list(&mut self, node: NodeId, item: &str) -> Result<(), TreeError> {
        self.tree.list(node, item)
    }

    /// Refresh a dynamic node's items through the listing callback. The old
    /// items are discarded first so the callback starts from a clean list.
    pub(crate) fn dyn_refresh(&mut self, node: NodeId) {
        let Some(cb) = self.list_cb.clone() else {
            return;
        };
        let id = match self.tree.node(node).kind() {
            core_tree::NodeKind::Dynamic { id, .. } => *id,
            _ => return,
        };
        self.tree.clear_items(node);
        cb(self, node, id);
    }

    pub(crate) fn cmd_cb_clone(&self) -> Option<CmdCallback<S>> {
        self.cmd_cb.clone()
    }

    pub(crate) fn ctrlz_cb_clone(&self) -> Option<CtrlzCallback<S>> {
        self.ctrlz_cb.clone()
    }

    // ---------------------------------------------------------------------
    // Modes
    // ---------------------------------------------------------------------

    /// Push a submode: the current tree is parked on the mode stack and a
    /// fresh empty tree takes effect. Commands added now exist only within
    /// the mode.
    pub fn enter_mode(&mut self, name: &str, hint: Option<Box<dyn Any>>) {
        let saved = std::mem::take(&mut self.tree);
        self.modes.enter(name, hint, saved);
        self.modes_chain = self.modes.chain();
    }

    /// Pop the top mode, dropping its tree and restoring the parked one.
    /// No-op at the top level.
    pub fn exit_mode(&mut self) {
        if let Some(restored) = self.modes.exit() {
            self.tree = restored;
        }
        self.modes_chain = self.modes.chain();
    }

    pub fn set_mode_hint(&mut self, hint: Option<Box<dyn Any>>) {
        self.modes.set_hint(hint);
    }

    pub fn mode_hint(&self) -> Option<&dyn Any> {
        self.modes.hint()
    }

    pub(crate) fn mode_depth(&self) -> usize {
        self.modes.depth()
    }

    pub(crate) fn modes_chain(&self) -> &str {
        &self.modes_chain
    }

    // ---------------------------------------------------------------------
    // User hints
    // ---------------------------------------------------------------------

    pub fn set_hint_int(&mut self, hint: i64) {
        self.hint_int = hint;
    }

    pub fn hint_int(&self) -> i64 {
        self.hint_int
    }

    pub fn set_hint_ptr(&mut self, hint: Option<Box<dyn Any>>) {
        self.hint_ptr = hint;
    }

    pub fn hint_ptr(&self) -> Option<&dyn Any> {
        self.hint_ptr.as_deref()
    }

    // ---------------------------------------------------------------------
    // Buffer and history access
    // ---------------------------------------------------------------------

    /// Current edit buffer content.
    pub fn buf_get(&self) -> String {
        self.buf.text()
    }

    /// Append a line to the command history (same rules as Enter: empty
    /// lines and repeats of the newest entry are dropped).
    pub fn add_hist(&mut self, line: &str) {
        self.hist.push(line);
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    pub(crate) fn screen_puts(&mut self, text: &str) {
        self.screen.puts(text);
    }

    pub(crate) fn screen_write(&mut self, bytes: &[u8]) {
        self.screen.write(bytes);
    }

    pub(crate) fn clearln_seq(&self) -> &'static str {
        self.screen.clearln_seq()
    }

    pub(crate) fn update_size(&mut self) {
        let (sx, sy) = self.screen.getsize();
        self.sx = sx;
        self.sy = sy;
        debug!(target = "engine", cols = sx, rows = sy, "size_update");
    }

    pub(crate) fn show_term_size(&self) -> bool {
        self.show_term_size
    }

    pub(crate) fn handle_ctrlz(&self) -> bool {
        self.handle_ctrlz
    }

    pub(crate) fn ctrlz_exec(&self) -> bool {
        self.ctrlz_exec
    }

    pub(crate) fn screen_version(&self) -> String {
        self.screen.version()
    }

    /// Clear the buffer and rebuild an empty filter chain.
    pub(crate) fn delall(&mut self) {
        if self.buf.clear() {
            self.redraw = true;
        }
        self.chain.reset();
    }
}
