//! Keystroke state machine.
//!
//! Four states: normal editing, incremental history search, the pager's
//! more-prompt, and the one-shot Ctrl-X prefix. Each [`Engine::key`] call
//! runs to completion: state transition, buffer/tree/search mutation, then a
//! single coalesced prompt redraw at the end.
//!
//! The Ctrl-X prefix deliberately falls through to normal handling on an
//! unrecognized second key, so `Ctrl-X a` still inserts the `a`.

use crate::pager::MoreOutcome;
use crate::resolver::ResolveMode;
use crate::{Engine, InputState, Key, LoopCode, Screen};
use core_edit::BrowseMove;
use core_tree::{NodeId, NodeKind};
use tracing::trace;

impl<S: Screen> Engine<S> {
    /// Feed one keystroke. Runs synchronously; command handlers are invoked
    /// inline before this returns.
    pub fn key(&mut self, key: Key) -> LoopCode {
        let old_state = self.state;
        self.retcode = LoopCode::Loop;

        match self.state {
            InputState::More => self.key_more(key),
            InputState::Search => self.key_search(key),
            InputState::PrefixX => self.key_prefix_x(key),
            InputState::Norm => self.key_norm(key),
        }

        // Size events are handled regardless of state.
        match key {
            Key::TelnetSize => self.winch(),
            Key::ScreenSize => {
                self.update_size();
                if self.show_term_size() {
                    let clr = self.clearln_seq();
                    let (sx, sy) = (self.sx, self.sy);
                    self.print(&format!("{clr}\rTerminal size: {sx}x{sy}\n"));
                    self.redraw = true;
                }
            }
            _ => {}
        }

        trace!(
            target = "engine.dfa",
            ?old_state,
            new_state = ?self.state,
            ?key,
            "key_handled"
        );
        self.was_tab = key == Key::Tab;
        if self.redraw && self.retcode != LoopCode::Eof {
            self.draw_prompt();
        }
        self.retcode
    }

    fn key_more(&mut self, key: Key) {
        match key {
            Key::Ctrl('c') => self.more_end(MoreOutcome::CtrlC),
            Key::Char('q') | Key::Char('Q') => self.more_end(MoreOutcome::Quit),
            Key::Char(' ') => self.more_page(),
            Key::Enter | Key::Ctrl('m') => self.more_line(),
            Key::Char('c') | Key::Char('C') => self.more_continue(),
            k => {
                if k.printable_char().is_some() {
                    self.more_line();
                }
            }
        }
    }

    fn key_search(&mut self, key: Key) {
        match key {
            Key::Ctrl('c') => {
                self.search.clear_result();
                self.ctrl_c();
                self.end_search();
            }
            Key::Ctrl('g') => {
                self.search.clear_result();
                self.end_search();
            }
            Key::Enter | Key::Ctrl('m') => {
                let run = self.search.result().is_some();
                self.end_search();
                if run {
                    self.enter();
                }
            }
            Key::Esc => self.end_search(),
            Key::Ctrl('r') | Key::Up => {
                if self.search.older(&self.hist) {
                    self.redraw = true;
                }
            }
            Key::Ctrl('s') | Key::Down => {
                if self.search.newer(&self.hist) {
                    self.redraw = true;
                }
            }
            Key::Ctrl('h') | Key::Backspace => {
                if self.search.backspace(&self.hist) {
                    self.redraw = true;
                }
            }
            k => {
                if let Some(c) = k.printable_char()
                    && self.search.add_char(c, &self.hist)
                {
                    self.redraw = true;
                }
            }
        }
    }

    fn key_prefix_x(&mut self, key: Key) {
        if key == Key::Ctrl('x') {
            // Ctrl-X Ctrl-X: ignore the first, keep expecting the second.
            return;
        }
        self.state = InputState::Norm;
        match key {
            Key::Ctrl('v') => {
                let clr = self.clearln_seq();
                let renderer = self.screen_version();
                let engine = crate::version();
                self.print(&format!("{clr}\r{}", trim_one_newline(&renderer)));
                self.print(&format!("{clr}\r{}", trim_one_newline(&engine)));
                self.redraw = true;
            }
            Key::Ctrl('h') => self.hist_dump(),
            Key::Ctrl('z') => {
                let clr = self.clearln_seq();
                let (sx, sy) = (self.sx, self.sy);
                self.print(&format!("{clr}\rTerminal size: {sx}x{sy}\n"));
                self.redraw = true;
            }
            Key::Ctrl('c') => {
                self.cmd_dump();
                self.redraw = true;
            }
            k => self.key_norm(k),
        }
    }

    fn key_norm(&mut self, key: Key) {
        let disp = self.dispspace();
        match key {
            Key::Tab => {
                self.try_complete(ResolveMode::Complete);
            }
            Key::Char('?') => {
                self.try_complete(ResolveMode::Hint);
            }
            Key::Ctrl('a') | Key::Home => {
                if self.buf.move_home() {
                    self.redraw = true;
                }
            }
            Key::Ctrl('e') | Key::End => {
                if self.buf.move_end(disp) {
                    self.redraw = true;
                }
            }
            Key::Ctrl('b') | Key::Left => {
                if self.buf.move_left() {
                    self.redraw = true;
                }
            }
            Key::Ctrl('f') | Key::Right => {
                if self.buf.move_right(disp) {
                    self.redraw = true;
                }
            }
            Key::Alt('b') | Key::CtrlLeft => {
                if self.buf.move_word_left() {
                    self.redraw = true;
                }
            }
            Key::Alt('f') | Key::CtrlRight => {
                if self.buf.move_word_right(disp) {
                    self.redraw = true;
                }
            }
            Key::Ctrl('h') | Key::Backspace => {
                if self.buf.backspace() {
                    self.redraw = true;
                }
            }
            Key::Delete => {
                if self.buf.del() {
                    self.redraw = true;
                }
            }
            Key::Ctrl('d') => self.ctrl_d(),
            Key::Ctrl('k') => {
                if self.buf.del_to_end() {
                    self.redraw = true;
                }
            }
            Key::Ctrl('u') => self.delall(),
            Key::Ctrl('w') | Key::AltBackspace => {
                if self.buf.del_prev_word() {
                    self.redraw = true;
                }
            }
            Key::Alt('d') => {
                if self.buf.del_word() {
                    self.redraw = true;
                }
            }
            Key::Ctrl('l') => {
                self.screen_mut().clear();
                self.winch();
                self.redraw = true;
            }
            Key::Enter | Key::Ctrl('m') => self.enter(),
            Key::Ctrl('p') | Key::Up => self.hist_up(),
            Key::Ctrl('n') | Key::Down => self.hist_down(),
            Key::Ctrl('r') => self.start_search(),
            Key::Ctrl('c') => self.ctrl_c(),
            Key::Ctrl('x') => self.state = InputState::PrefixX,
            Key::Ctrl('z') => self.ctrl_z(),
            Key::Esc | Key::Ctrl('j') => {}
            k => {
                if let Some(c) = k.printable_char() {
                    let mut bytes = [0u8; 4];
                    for &b in c.encode_utf8(&mut bytes).as_bytes() {
                        self.buf.insert(b, disp);
                    }
                    self.redraw = true;
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Enter / execute
    // -----------------------------------------------------------------

    pub(crate) fn enter(&mut self) {
        let flags = self.try_complete(ResolveMode::Execute);
        self.draw_prompt();
        let line = self.buf.text();
        self.hist.push(&line);
        let mut code = u32::from(flags.bits());
        if self.buf.is_empty() {
            // Plain Enter reprints the prompt.
            code = 0x40;
        }
        self.retcode = LoopCode::Error;
        if let Some(cb) = self.cmd_cb_clone() {
            cb(self, &line, (3..=7).contains(&code));
        }
        match code {
            0..=2 => {
                self.print_unfiltered("\n");
                self.print_unfiltered(&format!("Command is not complete ({code})\n"));
            }
            3..=7 => {
                self.print_unfiltered("\n");
                match self.pending_handler.take() {
                    None => {
                        self.print_unfiltered("BUG: callback is NULL for valid command?!\n");
                    }
                    Some(handler) => {
                        self.retcode = LoopCode::Loop;
                        self.in_cmd_cb = true;
                        let args = std::mem::take(&mut self.parsed);
                        handler(self, &args);
                        self.in_cmd_cb = false;
                    }
                }
                self.flush_chain();
            }
            0x40 => {
                self.print("\n");
                self.retcode = LoopCode::Enter;
                self.redraw = true;
            }
            _ => {} // 0x80: diagnostic already printed
        }
        self.delall();
    }

    // -----------------------------------------------------------------
    // Editing helpers driven by the DFA
    // -----------------------------------------------------------------

    fn ctrl_c(&mut self) {
        self.delall();
        self.redraw = true;
        self.screen_puts("^C\r\n");
        self.hist.reset_browse();
    }

    fn ctrl_d(&mut self) {
        if !self.buf.is_empty() {
            if self.buf.del() {
                self.redraw = true;
            }
        } else {
            self.retcode = LoopCode::Eof;
            // Enter prints a newline before teardown output; stay consistent.
            self.screen_puts("\r\n");
        }
    }

    fn ctrl_z(&mut self) {
        if !self.handle_ctrlz() {
            return;
        }
        self.screen_puts("^Z\r\n");
        if let Some(cb) = self.ctrlz_cb_clone() {
            cb(self);
        }
        if self.ctrlz_exec() {
            self.enter();
        } else {
            self.delall();
        }
        while self.mode_depth() > 0 {
            if let Some(cb) = self.ctrlz_cb_clone() {
                cb(self);
            }
            self.exit_mode();
        }
        if !self.ctrlz_exec() {
            self.redraw = true;
        }
        self.hist.reset_browse();
    }

    fn hist_up(&mut self) {
        let current = self.buf.text();
        if let Some(entry) = self.hist.up(&current) {
            let entry = entry.to_string();
            let disp = self.dispspace();
            self.buf.set_text(&entry, disp);
            self.redraw = true;
        }
    }

    fn hist_down(&mut self) {
        match self.hist.down() {
            Some(BrowseMove::Entry(entry)) => {
                let disp = self.dispspace();
                self.buf.set_text(&entry, disp);
                self.redraw = true;
            }
            Some(BrowseMove::Restored(saved)) => {
                let disp = self.dispspace();
                self.buf.set_text(&saved, disp);
                self.redraw = true;
            }
            None => {}
        }
    }

    fn start_search(&mut self) {
        self.state = InputState::Search;
        self.search = core_edit::SearchState::new();
        self.redraw = true;
    }

    fn end_search(&mut self) {
        self.state = InputState::Norm;
        self.redraw = true;
        if let Some(result) = self.search.take_result() {
            let disp = self.dispspace();
            self.buf.set_text(&result, disp);
        }
        self.search = core_edit::SearchState::new();
    }

    // -----------------------------------------------------------------
    // Ctrl-X introspection dumps
    // -----------------------------------------------------------------

    fn hist_dump(&mut self) {
        let clr = self.clearln_seq();
        self.print(&format!("{clr}\rHistory dump:\n"));
        let entries: Vec<String> = self.hist.iter().map(str::to_string).collect();
        for entry in entries {
            self.print(&format!("{entry}\r\n"));
        }
        self.redraw = true;
    }

    /// Dump every executable command path, expanding dynamic listings.
    fn cmd_dump(&mut self) {
        let clr = self.clearln_seq();
        self.print(&format!("{clr}\rCommand dump:\n"));
        let top: Vec<NodeId> = self.tree.top_level().to_vec();
        for id in top {
            self.cmd_dump_walk(id);
        }
        self.tree.vacuum();
    }

    fn cmd_dump_walk(&mut self, id: NodeId) {
        if self.tree.node(id).handler().is_some() && self.cmd_dump_node(id) {
            self.print("\n");
        }
        let children: Vec<NodeId> = self.tree.node(id).children().to_vec();
        for child in children {
            self.cmd_dump_walk(child);
        }
    }

    /// Print the full path of one node; a dynamic node prints one path per
    /// listed item. Returns false when an empty dynamic listing makes the
    /// path unprintable.
    fn cmd_dump_node(&mut self, id: NodeId) -> bool {
        let parent = self.tree.node(id).parent();
        if matches!(self.tree.node(id).kind(), NodeKind::Dynamic { .. }) {
            self.dyn_refresh(id);
            let items = match self.tree.node(id).kind() {
                NodeKind::Dynamic { items, .. } => items.clone(),
                _ => unreachable!(),
            };
            if items.is_empty() {
                return false;
            }
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    self.print("\n");
                }
                if let Some(p) = parent {
                    if !self.cmd_dump_node(p) {
                        return false;
                    }
                    self.print(" ");
                }
                self.print(item);
            }
        } else {
            if let Some(p) = parent {
                if !self.cmd_dump_node(p) {
                    return false;
                }
                self.print(" ");
            }
            let word = self.tree.node(id).display_word().to_string();
            self.print(&word);
        }
        true
    }
}

fn trim_one_newline(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}
