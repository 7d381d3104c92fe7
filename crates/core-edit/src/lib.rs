//! Single-line edit buffer with a horizontal scroll window.
//!
//! The buffer is a growable byte vector; one byte is one display column. This
//! matches the byte-oriented terminal model of router consoles (and keeps the
//! cursor arithmetic trivial); multi-byte input is accepted but is not given
//! grapheme-aware movement.
//!
//! Three indices describe the editing state:
//! * `len` — content length (tracked by the vector),
//! * `cursor` — byte index the next insertion lands at,
//! * `bufpos` — leftmost displayed byte when the line is wider than the
//!   terminal.
//!
//! Invariant: `0 <= bufpos <= cursor <= len`. Movement operations take the
//! current display width `disp` (columns available for buffer text) so the
//! scroll window can follow the cursor; the window shifts right when the
//! cursor comes within two columns of its right edge.
//!
//! Mutating operations return `true` when a redraw is needed, letting the
//! caller coalesce redraw requests across several operations.

pub mod history;
pub use history::{BrowseMove, History, SearchState};

const BUFFER_STEP: usize = 1024;

#[derive(Debug, Default)]
pub struct EditBuffer {
    data: Vec<u8>,
    cursor: usize,
    bufpos: usize,
}

impl EditBuffer {
    pub fn new() -> Self {
        let mut data = Vec::new();
        data.reserve_exact(BUFFER_STEP);
        Self {
            data,
            cursor: 0,
            bufpos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn bufpos(&self) -> usize {
        self.bufpos
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Buffer content as text (lossy on invalid UTF-8 input bytes).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    fn byte_at(&self, idx: usize) -> u8 {
        self.data.get(idx).copied().unwrap_or(0)
    }

    /// Grow capacity in fixed steps; the buffer is never shrunk mid-session.
    fn reserve_step(&mut self, add: usize) {
        let need = self.data.len() + add;
        if need > self.data.capacity() {
            let target = (need / BUFFER_STEP + 1) * BUFFER_STEP;
            self.data.reserve_exact(target - self.data.len());
        }
    }

    /// True when the scroll window must shift right before the cursor moves
    /// one column further. The window keeps a two-column lead on its right
    /// edge so the `$` truncation glyph never sits on the cursor.
    fn shiftr(&self, disp: usize) -> bool {
        if self.data.len() - self.bufpos < disp {
            return false;
        }
        self.cursor - self.bufpos >= disp.saturating_sub(2)
    }

    pub fn insert(&mut self, ch: u8, disp: usize) -> bool {
        self.reserve_step(1);
        self.data.insert(self.cursor, ch);
        self.move_right(disp);
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        if self.cursor < self.bufpos {
            self.bufpos -= 1;
        }
        true
    }

    pub fn move_right(&mut self, disp: usize) -> bool {
        if self.cursor >= self.data.len() {
            return false;
        }
        let shift = self.shiftr(disp);
        self.cursor += 1;
        if shift {
            self.bufpos += 1;
        }
        true
    }

    pub fn move_word_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        if self.byte_at(self.cursor) != b' ' && self.byte_at(self.cursor - 1) == b' ' {
            self.cursor -= 1;
        }
        while self.cursor > 0 && self.byte_at(self.cursor) == b' ' {
            self.cursor -= 1;
        }
        if self.cursor > 0 && self.byte_at(self.cursor) != b' ' {
            while self.cursor > 0 && self.byte_at(self.cursor) != b' ' {
                self.cursor -= 1;
            }
            if self.byte_at(self.cursor) == b' ' {
                self.cursor += 1;
            }
        }
        if self.cursor < self.bufpos {
            self.bufpos = self.cursor;
        }
        true
    }

    pub fn move_word_right(&mut self, disp: usize) -> bool {
        if self.cursor >= self.data.len() {
            return false;
        }
        let mut shift = self.shiftr(disp);
        while self.cursor < self.data.len() && self.byte_at(self.cursor) == b' ' {
            self.cursor += 1;
            if shift {
                self.bufpos += 1;
            }
            shift = self.shiftr(disp);
        }
        while self.cursor < self.data.len() && self.byte_at(self.cursor) != b' ' {
            self.cursor += 1;
            if shift {
                self.bufpos += 1;
            }
            shift = self.shiftr(disp);
        }
        true
    }

    pub fn move_home(&mut self) -> bool {
        if self.cursor == 0 && self.bufpos == 0 {
            return false;
        }
        self.cursor = 0;
        self.bufpos = 0;
        true
    }

    pub fn move_end(&mut self, disp: usize) -> bool {
        let endcur = self.data.len();
        let endpos = self.data.len().saturating_sub(disp.saturating_sub(1));
        if self.cursor == endcur && self.bufpos == endpos {
            return false;
        }
        self.cursor = endcur;
        self.bufpos = endpos;
        true
    }

    /// Delete the byte under the cursor.
    pub fn del(&mut self) -> bool {
        if self.cursor >= self.data.len() {
            return false;
        }
        self.data.remove(self.cursor);
        true
    }

    /// Delete the byte left of the cursor.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.data.remove(self.cursor - 1);
        self.cursor -= 1;
        if self.bufpos > self.cursor {
            self.bufpos -= 1;
        }
        true
    }

    /// Delete the word under (or right of) the cursor.
    pub fn del_word(&mut self) -> bool {
        if self.cursor >= self.data.len() {
            return false;
        }
        while self.cursor < self.data.len() && self.byte_at(self.cursor) == b' ' {
            self.del();
        }
        while self.cursor < self.data.len() && self.byte_at(self.cursor) != b' ' {
            self.del();
        }
        true
    }

    /// Delete the word left of the cursor.
    pub fn del_prev_word(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        while self.cursor > 0 && self.byte_at(self.cursor - 1) == b' ' {
            self.backspace();
        }
        while self.cursor > 0 && self.byte_at(self.cursor - 1) != b' ' {
            self.backspace();
        }
        true
    }

    pub fn del_to_end(&mut self) -> bool {
        if self.cursor >= self.data.len() {
            return false;
        }
        self.data.truncate(self.cursor);
        true
    }

    /// Drop all content and reset the window.
    pub fn clear(&mut self) -> bool {
        if self.data.is_empty() && self.bufpos == 0 && self.cursor == 0 {
            return false;
        }
        self.data.clear();
        self.bufpos = 0;
        self.cursor = 0;
        true
    }

    /// Replace the whole buffer (history recall). The cursor lands at the end
    /// and the window is positioned so the end of the line is visible.
    pub fn set_text(&mut self, text: &str, disp: usize) -> bool {
        self.data.clear();
        self.reserve_step(text.len());
        self.data.extend_from_slice(text.as_bytes());
        self.cursor = self.data.len();
        self.bufpos = self.data.len().saturating_sub(disp.saturating_sub(1));
        true
    }

    /// Splice `word` over `[pos, pos + len)`. Cursor adjustment is the
    /// caller's business (the resolver applies its own rules).
    pub fn replace(&mut self, pos: usize, len: usize, word: &str) {
        self.reserve_step(word.len().saturating_sub(len));
        drop(self.data.splice(pos..pos + len, word.bytes()));
    }

    /// Move the cursor to an absolute position, pulling the window along so
    /// the cursor stays visible.
    pub fn set_cursor(&mut self, pos: usize, disp: usize) {
        self.cursor = pos.min(self.data.len());
        if self.cursor < self.bufpos {
            self.bufpos = self.cursor;
        } else if disp > 1 && self.cursor - self.bufpos >= disp {
            self.bufpos = self.cursor - (disp - 1);
        }
    }

    /// Collapse runs of spaces between words to a single space and strip
    /// leading spaces, shifting the cursor to compensate. A trailing space is
    /// preserved (runs at the end also collapse to one). Idempotent.
    pub fn compact_spaces(&mut self) {
        let mut out: Vec<u8> = Vec::with_capacity(self.data.len());
        let mut new_cursor = 0;
        let mut pending_space = false;
        for (i, &b) in self.data.iter().enumerate() {
            if i == self.cursor {
                new_cursor = out.len() + usize::from(pending_space);
            }
            if b == b' ' {
                pending_space = !out.is_empty();
            } else {
                if pending_space {
                    out.push(b' ');
                    pending_space = false;
                }
                out.push(b);
            }
        }
        if self.cursor >= self.data.len() {
            new_cursor = out.len() + usize::from(pending_space);
        }
        if pending_space {
            out.push(b' ');
        }
        if out != self.data {
            self.data = out;
            self.cursor = new_cursor.min(self.data.len());
            if self.bufpos > self.cursor {
                self.bufpos = self.cursor;
            }
        }
    }
}
