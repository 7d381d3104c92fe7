//! Pager: line-counted buffering with more-prompt interactions.
//!
//! The pager sits at the sink end of the output path. It counts newlines
//! since the last prompt; when output would cross `rows - 1` lines it flushes
//! up to and including the boundary newline, stashes the surplus in
//! `morebuf`, and flips the input DFA into the more state. Everything a
//! handler writes while the prompt is up accumulates in `morebuf`; the
//! interaction keys release it a line or a page at a time, all at once, or
//! not at all.

use crate::{Engine, InputState, Screen};
use tracing::trace;

#[derive(Debug)]
pub(crate) struct PagerState {
    /// Paged output enabled.
    pub more: bool,
    /// Currently accumulating into `morebuf`.
    pub buffered: bool,
    /// Newlines emitted since the last prompt.
    pub lines: usize,
    pub morebuf: Vec<u8>,
    pub moreprompt: String,
    pub clear_line: bool,
    pub clear_page: bool,
    pub clear_cont: bool,
    pub clear_quit: bool,
}

const MORE_PROMPT: &str =
    "<<< more >>> [ enter=line | space=page | c=continue | q=quit ] <<< more >>>";

impl PagerState {
    pub fn new() -> Self {
        Self {
            more: true,
            buffered: false,
            lines: 0,
            morebuf: Vec::new(),
            moreprompt: MORE_PROMPT.to_string(),
            // Erase the prompt when stepping a line or continuing; keep it on
            // screen after a full page and after quit.
            clear_line: true,
            clear_page: false,
            clear_cont: true,
            clear_quit: false,
        }
    }
}

/// How a more-prompt interaction ended, for prompt-erasure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MoreOutcome {
    Page,
    Line,
    Quit,
    Cont,
    CtrlC,
    None,
}

impl<S: Screen> Engine<S> {
    /// Pager sink: count lines, flush or buffer, flip into the more state at
    /// the page boundary.
    pub(crate) fn write_more(&mut self, bytes: &[u8]) {
        let rows = self.sy as usize;

        // The previous write may have landed exactly on the boundary; arm the
        // prompt before emitting anything further.
        if self.pager.more && !self.pager.buffered && self.pager.lines + 1 >= rows {
            self.pager.lines = 0;
            self.redraw = true;
            self.pager.buffered = true;
            self.state = InputState::More;
            trace!(target = "engine.pager", "more_armed");
        }

        if self.pager.buffered {
            self.pager.morebuf.extend_from_slice(bytes);
            return;
        }

        for i in 0..bytes.len() {
            if bytes[i] == b'\n' {
                self.pager.lines += 1;
            }
            if self.pager.more && self.pager.lines + 1 >= rows {
                self.screen_write(&bytes[..=i]);
                if bytes.len() > i + 1 {
                    self.pager.lines = 0;
                    self.redraw = true;
                    self.pager.buffered = true;
                    self.state = InputState::More;
                    self.pager.morebuf.extend_from_slice(&bytes[i + 1..]);
                    trace!(target = "engine.pager", buffered = bytes.len() - i - 1, "more_buffering");
                }
                return;
            }
        }
        self.screen_write(bytes);
    }

    /// Erase or annotate the more-prompt line per the configured policy.
    fn more_clear_prompt(&mut self, outcome: MoreOutcome) {
        let erase = |engine: &mut Self| {
            let clr = engine.clearln_seq();
            engine.screen_puts(&format!("{clr}\r"));
        };
        match outcome {
            MoreOutcome::Line => {
                if self.pager.clear_line {
                    erase(self);
                } else {
                    self.screen_puts("\r\n");
                }
            }
            MoreOutcome::Page => {
                if self.pager.clear_page {
                    erase(self);
                } else {
                    self.screen_puts("\r\n");
                }
            }
            MoreOutcome::Cont => {
                if self.pager.clear_cont {
                    erase(self);
                } else {
                    self.screen_puts("\r\n");
                }
            }
            MoreOutcome::Quit => {
                if self.pager.clear_quit {
                    erase(self);
                } else {
                    self.screen_puts(" quit\r\n");
                }
            }
            MoreOutcome::CtrlC => {
                self.screen_puts(" ^C\r\n");
            }
            MoreOutcome::None => {}
        }
    }

    /// Leave the more state, dropping whatever is still buffered.
    pub(crate) fn more_end(&mut self, outcome: MoreOutcome) {
        self.more_clear_prompt(outcome);
        self.pager.morebuf.clear();
        self.pager.buffered = false;
        self.state = InputState::Norm;
        self.redraw = true;
        trace!(target = "engine.pager", ?outcome, "more_end");
    }

    /// Release a single buffered line.
    pub(crate) fn more_line(&mut self) {
        match self.pager.morebuf.iter().position(|&b| b == b'\n') {
            Some(nl) => {
                self.more_clear_prompt(MoreOutcome::Line);
                let chunk: Vec<u8> = self.pager.morebuf.drain(..=nl).collect();
                self.screen_write(&chunk);
                if self.pager.morebuf.is_empty() {
                    self.more_end(MoreOutcome::None);
                    return;
                }
                self.redraw = true;
            }
            None => {
                self.more_clear_prompt(MoreOutcome::Line);
                let rest = std::mem::take(&mut self.pager.morebuf);
                self.screen_write(&rest);
                self.more_end(MoreOutcome::None);
            }
        }
    }

    /// Release one more page.
    pub(crate) fn more_page(&mut self) {
        let rows = self.sy as usize;
        self.pager.lines = 0;
        self.more_clear_prompt(MoreOutcome::Page);

        let mut lines = 0;
        let mut cut = None;
        for (i, &b) in self.pager.morebuf.iter().enumerate() {
            if b == b'\n' {
                lines += 1;
            }
            if lines + 1 >= rows {
                cut = Some(i);
                break;
            }
        }
        match cut {
            Some(i) => {
                let chunk: Vec<u8> = self.pager.morebuf.drain(..=i).collect();
                self.screen_write(&chunk);
                self.pager.lines = lines;
                if self.pager.morebuf.is_empty() {
                    self.more_end(MoreOutcome::None);
                    return;
                }
                self.redraw = true;
            }
            None => {
                let rest = std::mem::take(&mut self.pager.morebuf);
                self.screen_write(&rest);
                self.more_end(MoreOutcome::None);
            }
        }
    }

    /// Release everything and stop buffering for this command.
    pub(crate) fn more_continue(&mut self) {
        self.more_clear_prompt(MoreOutcome::Cont);
        let rest = std::mem::take(&mut self.pager.morebuf);
        self.screen_write(&rest);
        self.more_end(MoreOutcome::None);
    }

    /// Draw the more prompt on a cleared line.
    pub(crate) fn draw_more_prompt(&mut self) {
        let clr = self.clearln_seq();
        let prompt = self.pager.moreprompt.clone();
        self.screen_puts(&format!("{clr}\r{prompt}"));
    }
}
