//! Command history ring and incremental search.
//!
//! The ring is stored as an owned vector, oldest entry first; wrap-around is
//! explicit index arithmetic rather than a linked structure. Browsing keeps a
//! cursor into the vector plus a stash of whatever the user had typed before
//! the first `up`, restored when they walk past the newest entry again.

use tracing::debug;

#[derive(Debug, Default)]
pub struct History {
    entries: Vec<String>,
    /// Browse position; `None` when not browsing.
    cursor: Option<usize>,
    /// Pre-browse buffer content, restored on walking past the newest entry.
    saved: Option<String>,
}

/// Outcome of a `down` step while browsing.
pub enum BrowseMove {
    /// Show this history entry.
    Entry(String),
    /// Walked past the newest entry; restore the stashed line.
    Restored(String),
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate oldest → newest (the order a history dump prints in).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Append a command line. Empty lines and exact repeats of the most
    /// recent entry are dropped. Always leaves browse mode.
    pub fn push(&mut self, line: &str) {
        self.cursor = None;
        if line.is_empty() {
            return;
        }
        if self.entries.last().is_some_and(|last| last == line) {
            return;
        }
        debug!(target = "edit.history", entry = line, "history_push");
        self.entries.push(line.to_string());
    }

    /// Step to an older entry. On the first step the current buffer content
    /// is stashed. Returns the entry to display, or `None` at the oldest
    /// entry (no rollover) or when there is no history.
    pub fn up(&mut self, current: &str) -> Option<&str> {
        match self.cursor {
            None => {
                if self.entries.is_empty() {
                    return None;
                }
                self.saved = Some(current.to_string());
                let idx = self.entries.len() - 1;
                self.cursor = Some(idx);
                Some(&self.entries[idx])
            }
            Some(0) => None,
            Some(idx) => {
                self.cursor = Some(idx - 1);
                Some(&self.entries[idx - 1])
            }
        }
    }

    /// Step to a newer entry, restoring the stashed line past the newest.
    /// Returns `None` when not browsing.
    pub fn down(&mut self) -> Option<BrowseMove> {
        let idx = self.cursor?;
        if idx + 1 >= self.entries.len() {
            self.cursor = None;
            let saved = self.saved.take().unwrap_or_default();
            return Some(BrowseMove::Restored(saved));
        }
        self.cursor = Some(idx + 1);
        Some(BrowseMove::Entry(self.entries[idx + 1].clone()))
    }

    /// Forget the browse position and any stashed line (Ctrl-C path).
    pub fn reset_browse(&mut self) {
        self.cursor = None;
        self.saved = None;
    }

    /// Find the most recent entry containing `pattern`, skipping `skip`
    /// more-recent matches. When fewer matches exist than `skip`, the oldest
    /// match is returned. Yields the entry and its match index (0 = newest
    /// match). An empty pattern never matches.
    pub fn find(&self, pattern: &str, skip: usize) -> Option<(&str, usize)> {
        if pattern.is_empty() {
            return None;
        }
        let mut found = None;
        let mut rpos = 0;
        let mut remaining = skip;
        for entry in self.entries.iter().rev() {
            if entry.contains(pattern) {
                found = Some(entry.as_str());
                if remaining == 0 {
                    return Some((entry, rpos));
                }
                remaining -= 1;
                rpos += 1;
            }
        }
        found.map(|e| (e, rpos.saturating_sub(1)))
    }
}

/// Incremental-search state: the pattern being typed, the entry currently
/// displayed, and how many newer matches were skipped to reach it.
#[derive(Debug, Default)]
pub struct SearchState {
    pattern: String,
    result: Option<String>,
    rpos: usize,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Take the displayed match out (used when the search finishes and the
    /// match becomes the edit buffer).
    pub fn take_result(&mut self) -> Option<String> {
        self.result.take()
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }

    fn refind(&mut self, hist: &History, skip: usize) {
        match hist.find(&self.pattern, skip) {
            Some((entry, rpos)) => {
                self.result = Some(entry.to_string());
                self.rpos = rpos;
            }
            None => self.result = None,
        }
    }

    /// Append a character to the pattern and re-run the search from the
    /// newest entry. Returns `true` (the prompt always changes).
    pub fn add_char(&mut self, ch: char, hist: &History) -> bool {
        self.pattern.push(ch);
        self.rpos = 0;
        self.refind(hist, 0);
        true
    }

    /// Drop the last pattern character and re-search. No-op on an empty
    /// pattern.
    pub fn backspace(&mut self, hist: &History) -> bool {
        if self.pattern.pop().is_none() {
            return false;
        }
        self.rpos = 0;
        self.refind(hist, 0);
        true
    }

    /// Move to the next older match. Returns `true` when the display changed.
    pub fn older(&mut self, hist: &History) -> bool {
        let before = self.rpos;
        self.rpos += 1;
        self.refind(hist, self.rpos);
        before != self.rpos
    }

    /// Move back toward the newest match.
    pub fn newer(&mut self, hist: &History) -> bool {
        if self.rpos == 0 {
            return false;
        }
        self.rpos -= 1;
        self.refind(hist, self.rpos);
        true
    }
}
