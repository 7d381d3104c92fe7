//! Handler output path: filter chain, newline normalization, pager handoff.
//!
//! Two write paths exist. [`Engine::write`]/[`Engine::print`] feed the
//! per-command filter chain and are what command handlers use; the
//! unfiltered variants skip the chain (resolver diagnostics, help listings'
//! leading newline) but still pass normalization and the pager. Out-of-band
//! [`Engine::message`] bypasses everything except the prompt redraw.

use crate::{Engine, Screen};

impl<S: Screen> Engine<S> {
    /// Write handler output through the filter chain.
    pub fn write(&mut self, bytes: &[u8]) {
        let out = self.chain.feed(bytes);
        self.write_nof(&out);
    }

    /// Write handler text through the filter chain.
    pub fn print(&mut self, text: &str) {
        self.write(text.as_bytes());
    }

    /// Write text bypassing the filter chain (diagnostics).
    pub(crate) fn print_unfiltered(&mut self, text: &str) {
        self.write_nof(text.as_bytes());
    }

    /// Normalize bare `\n` to `\r\n` (an existing `\r\n` passes through) and
    /// hand the result to the pager.
    pub(crate) fn write_nof(&mut self, bytes: &[u8]) {
        let mut start = 0;
        for i in 0..bytes.len() {
            if bytes[i] == b'\n' {
                if i > 0 && bytes[i - 1] == b'\r' {
                    self.write_more(&bytes[start..=i]);
                } else {
                    self.write_more(&bytes[start..i]);
                    self.write_more(b"\r\n");
                }
                start = i + 1;
            }
        }
        if start < bytes.len() {
            self.write_more(&bytes[start..]);
        }
    }

    /// End-of-command flush: run the chain's `done` cascade and rebuild an
    /// empty chain for the next command.
    pub(crate) fn flush_chain(&mut self) {
        let out = self.chain.finish();
        self.write_nof(&out);
        self.chain.reset();
    }

    /// Print a line outside the command flow (log messages, alarms). The
    /// prompt line is cleared first and redrawn after, unless a command
    /// handler is currently running (its output already owns the line).
    pub fn message(&mut self, line: &str) {
        if !self.in_cmd_cb {
            let clr = self.clearln_seq();
            self.screen_puts(&format!("{clr}\r"));
        }
        let mut rest = line;
        while !rest.is_empty() {
            match rest.find('\n') {
                Some(pos) => {
                    if pos > 0 {
                        let seg = rest[..pos].to_string();
                        self.screen_puts(&seg);
                    }
                    self.screen_puts("\r\n");
                    rest = &rest[pos + 1..];
                }
                None => {
                    let seg = rest.to_string();
                    self.screen_puts(&seg);
                    self.screen_puts("\n");
                    break;
                }
            }
        }
        if !self.in_cmd_cb {
            self.draw_prompt();
        }
    }
}
