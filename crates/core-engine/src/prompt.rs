//! Prompt composition and the horizontal scroll window.
//!
//! The normal prompt is `hostname(mode-chain)level` followed by one glyph
//! column: a space, or `$` when the buffer is scrolled left. When the line
//! overflows the remaining columns a `$` is drawn at the right edge and one
//! fewer buffer byte is shown. The cursor is positioned with an absolute
//! carriage return plus cursor-forward escape, so a single write repaints the
//! whole line.

use crate::{Engine, InputState, Screen};

impl<S: Screen> Engine<S> {
    /// Columns occupied by `hostname(modes)level` plus the scroll glyph.
    pub(crate) fn prompt_len(&self) -> usize {
        self.hostname.len() + self.modes_chain().len() + 1 + self.level.len()
    }

    /// Columns available for buffer text (the last column stays free).
    pub(crate) fn dispspace(&self) -> usize {
        (self.sx as usize).saturating_sub(self.prompt_len() + 1)
    }

    fn search_prompt_len(&self) -> usize {
        // "(i-search)'pattern': "
        "(i-search)".len() + 2 + self.search.pattern().len() + 2
    }

    fn search_dispspace(&self) -> usize {
        (self.sx as usize).saturating_sub(self.search_prompt_len() + 1)
    }

    /// Repaint the prompt line for the current DFA state.
    pub(crate) fn draw_prompt(&mut self) {
        match self.state {
            InputState::Search => {
                self.draw_search_prompt();
                return;
            }
            InputState::More => {
                self.draw_more_prompt();
                return;
            }
            _ => {}
        }

        self.pager.lines = 0;

        let promptlen = self.prompt_len();
        let disp = self.dispspace();
        let bufpos = self.buf.bufpos();
        let mut linelen = self.buf.len() - bufpos;
        let endc = if linelen > disp {
            linelen = disp.saturating_sub(1);
            "$"
        } else {
            ""
        };
        let begc = if bufpos > 0 { '$' } else { ' ' };
        let window =
            String::from_utf8_lossy(&self.buf.as_bytes()[bufpos..bufpos + linelen]).into_owned();
        let curpos = promptlen + self.buf.cursor() - bufpos;
        let line = format!(
            "{}\r{}{}{}{}{}{}\r\x1b[{}C",
            self.clearln_seq(),
            self.hostname,
            self.modes_chain(),
            self.level,
            begc,
            window,
            endc,
            curpos
        );
        self.screen_puts(&line);
        self.redraw = false;
    }

    fn draw_search_prompt(&mut self) {
        let promptlen = self.search_prompt_len();
        let disp = self.search_dispspace();
        let rcmd = self.search.result().unwrap_or("");
        let mut linelen = rcmd.len();
        let endc = if linelen > disp {
            linelen = disp.saturating_sub(1);
            "$"
        } else {
            ""
        };
        let shown = String::from_utf8_lossy(&rcmd.as_bytes()[..linelen]).into_owned();
        let line = format!(
            "{}\r(i-search)'{}': {}{}\r\x1b[{}C",
            self.clearln_seq(),
            self.search.pattern(),
            shown,
            endc,
            promptlen.saturating_sub(3)
        );
        self.screen_puts(&line);
        self.redraw = false;
    }
}
