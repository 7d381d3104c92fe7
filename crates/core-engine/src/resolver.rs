//! Word-by-word resolution of the edit buffer against the command tree.
//!
//! One entry point, [`Engine::try_complete`], serves three callers: `?`
//! (hint), Tab (complete), and Enter (execute). The walk is shared; the mode
//! decides whether the buffer is rewritten (completion), whether the parsed
//! word list and filter chain are built (execute), and whether a listing is
//! printed (hint, or complete on double-Tab).
//!
//! Matching at one level of the tree follows the sorted sibling list:
//! an exact word descends; a unique prefix completes to the full word and
//! descends; several prefix-sharing siblings extend the buffer by their
//! longest common prefix and stop; anything else is a resolution error. A
//! dynamic placeholder is expanded through the listing callback right before
//! it is consulted, and a regex leaf matches the whole word against its
//! pre-compiled pattern.
//!
//! The returned bitfield is what Enter dispatches on: bits 0..2 describe
//! whether the last word is complete and the reached node executable; 0x80
//! flags a failed resolution whose diagnostic has already been printed.

use crate::{Engine, Handler, Screen};
use bitflags::bitflags;
use core_tree::{NodeId, NodeKind};
use std::cmp::Ordering;
use tracing::debug;

bitflags! {
    /// Resolver outcome bits observed by Enter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResolveFlags: u8 {
        /// Last word is complete and the reached node is executable.
        const EXEC = 0b0000_0001;
        /// Last word is complete.
        const COMPLETE = 0b0000_0010;
        /// Reached node is executable even though the following sibling is a
        /// proper prefix continuation without a space typed yet.
        const EXEC_ALONE = 0b0000_0100;
        /// No match; a diagnostic was already printed.
        const NO_MATCH = 0b1000_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// `?`: list continuations, never rewrite the buffer.
    Hint,
    /// Tab: rewrite the buffer, list on double-Tab.
    Complete,
    /// Enter: rewrite, build the parsed list and the filter chain.
    Execute,
}

/// One level of candidates: a static sibling list, or the expanded items of
/// a dynamic placeholder (whose handler and help stand in for every item).
#[derive(Clone)]
enum Level {
    Nodes(Vec<NodeId>),
    Items { owner: NodeId, items: Vec<String> },
}

enum WordOutcome {
    NoMatch,
    Exact { idx: usize },
    Unique { idx: usize },
    Multi { idx: usize, grow: usize },
}

impl<S: Screen> Engine<S> {
    pub(crate) fn try_complete(&mut self, mode: ResolveMode) -> ResolveFlags {
        let execute = mode == ResolveMode::Execute;
        let do_complete = mode != ResolveMode::Hint;

        if execute {
            self.parsed.clear();
        }
        self.pending_handler = None;

        if do_complete {
            self.buf.compact_spaces();
        }

        if self.tree.is_empty() {
            return ResolveFlags::empty();
        }

        let snapshot = self.buf.text();
        let bytes = snapshot.as_bytes();

        // Current level and position within it; `None` once the walk stepped
        // past a leaf (or an empty dynamic listing) - any further word is an
        // error.
        let mut level: Option<(Level, usize)> =
            Some((Level::Nodes(self.tree.top_level().to_vec()), 0));
        // Rewrites shift the live buffer relative to the snapshot offsets.
        let mut added: isize = 0;
        let mut used_dyn = false;

        let mut complete = false;
        let mut completex = false;
        let mut alonematch = false;
        let mut canexalone = false;
        // Node reached by the last complete word (listing target).
        let mut matched: Option<NodeId> = None;
        // Level the last word matched in, kept for ambiguity listings after
        // a descend.
        let mut match_level: Option<Level> = None;
        let mut descended = false;
        let mut last_word: Option<(usize, usize)> = None;
        let mut filter_start: Option<usize> = None;

        let mut p = 0usize;
        'words: while p < bytes.len() {
            while p < bytes.len() && bytes[p] == b' ' {
                p += 1;
            }
            if p >= bytes.len() {
                break;
            }
            let ws = p;
            while p < bytes.len() && bytes[p] != b' ' {
                p += 1;
            }
            let we = p;
            let word = &snapshot[ws..we];
            if word == "|" {
                filter_start = Some(we);
                break 'words;
            }
            last_word = Some((ws, we));

            let Some((mut lv, si)) = level.take() else {
                return self.resolve_fail("\nNo matched command (1)\n", used_dyn);
            };
            let mut si = si;

            // Expand a dynamic placeholder right before consulting it.
            let expand = match &lv {
                Level::Nodes(ids) if !ids.is_empty() => {
                    matches!(self.tree.node(ids[0]).kind(), NodeKind::Dynamic { .. })
                        .then_some(ids[0])
                }
                _ => None,
            };
            if let Some(owner) = expand {
                self.dyn_refresh(owner);
                used_dyn = true;
                let items = match self.tree.node(owner).kind() {
                    NodeKind::Dynamic { items, .. } => items.clone(),
                    _ => unreachable!(),
                };
                if items.is_empty() {
                    // Nothing listed: the walk dead-ends here without
                    // touching the flags of the previous word.
                    continue 'words;
                }
                lv = Level::Items { owner, items };
                si = 0;
            }

            let outcome = self.match_word(&lv, si, word);
            let pos = (ws as isize + added) as usize;
            let wl = word.len();

            match outcome {
                WordOutcome::NoMatch => {
                    return self.resolve_fail("\nNo matched command (2)\n", used_dyn);
                }
                WordOutcome::Exact { idx } => {
                    let (handler, node, children) = self.level_entry(&lv, idx);
                    let nxprefix = self
                        .level_word(&lv, idx + 1)
                        .is_some_and(|nw| nw.starts_with(word) && word.len() < nw.len());
                    let havespace =
                        pos + wl < self.buf.len() && self.buf.as_bytes()[pos + wl] == b' ';
                    if do_complete && self.buf.cursor() >= pos && self.buf.cursor() <= pos + wl
                    {
                        let disp = self.dispspace();
                        self.buf.set_cursor(pos + wl, disp);
                        if !nxprefix || havespace {
                            self.cursor_past_word();
                        }
                    }
                    if execute {
                        self.parsed.push(word.to_string());
                    }
                    complete = !nxprefix || havespace;
                    completex = complete && handler.is_some();
                    alonematch = true;
                    canexalone = handler.is_some();
                    if canexalone {
                        self.pending_handler = handler;
                    }
                    matched = Some(node);
                    match_level = Some(lv);
                    descended = true;
                    level = if children.is_empty() {
                        None
                    } else {
                        Some((Level::Nodes(children), 0))
                    };
                }
                WordOutcome::Unique { idx } => {
                    let full = self
                        .level_word(&lv, idx)
                        .expect("unique match index is valid")
                        .to_string();
                    let (handler, node, children) = self.level_entry(&lv, idx);
                    if do_complete {
                        added += self.complete_word_in_buffer(pos, wl, &full) as isize;
                    }
                    if execute {
                        self.parsed.push(full);
                    }
                    complete = true;
                    completex = handler.is_some();
                    alonematch = true;
                    canexalone = handler.is_some();
                    if canexalone {
                        self.pending_handler = handler;
                    }
                    matched = Some(node);
                    match_level = Some(lv);
                    descended = true;
                    level = if children.is_empty() {
                        None
                    } else {
                        Some((Level::Nodes(children), 0))
                    };
                }
                WordOutcome::Multi { idx, grow } => {
                    complete = false;
                    completex = false;
                    self.pending_handler = None;
                    let first = self
                        .level_word(&lv, idx)
                        .expect("run start index is valid")
                        .to_string();
                    if do_complete && grow > 0 {
                        let ext = first[wl..wl + grow].to_string();
                        self.extend_word_in_buffer(pos, wl, &ext);
                        added += grow as isize;
                    }
                    alonematch = false;
                    canexalone = false;
                    if grow > 0 && wl + grow == first.len() {
                        // The extension lands exactly on the first sibling:
                        // executable alone even though longer siblings exist.
                        alonematch = true;
                        let (handler, _, _) = self.level_entry(&lv, idx);
                        canexalone = handler.is_some();
                        if canexalone {
                            self.pending_handler = handler;
                        }
                    }
                    descended = false;
                    level = Some((lv, idx));
                }
            }
        }

        // Filter suffix.
        if let Some(fstart) = filter_start {
            if !completex {
                return self
                    .resolve_fail("\nCannot apply filter to incomplete command\n", used_dyn);
            }
            if let Some(flags) =
                self.resolve_filters(&snapshot, fstart, added, mode, used_dyn)
            {
                return flags;
            }
        }

        // Contextual help: `?`, or Tab directly after a Tab.
        if (self.was_tab || mode == ResolveMode::Hint) && !execute {
            self.print_unfiltered("\n");
            if complete {
                if let Some(node) = matched {
                    used_dyn |= self.help_node(node);
                }
            } else if let Some((ws, we)) = last_word {
                let partial = snapshot[ws..we].to_string();
                let target = if descended && alonematch {
                    match_level.clone()
                } else {
                    level.as_ref().map(|(lv, _)| lv.clone())
                };
                if let Some(lv) = target {
                    used_dyn |= self.help_siblings(&lv, &partial);
                }
            } else {
                self.help_top_level();
            }
        }
        self.redraw = true;
        if used_dyn {
            self.tree.vacuum();
        }

        let mut flags = ResolveFlags::empty();
        flags.set(ResolveFlags::EXEC, completex);
        flags.set(ResolveFlags::COMPLETE, complete);
        flags.set(ResolveFlags::EXEC_ALONE, canexalone);
        debug!(target = "engine.resolver", ?mode, flags = flags.bits(), "resolve_done");
        flags
    }

    fn resolve_fail(&mut self, msg: &str, used_dyn: bool) -> ResolveFlags {
        self.print_unfiltered(msg);
        self.redraw = true;
        if used_dyn {
            self.tree.vacuum();
        }
        ResolveFlags::NO_MATCH
    }

    // -----------------------------------------------------------------
    // Level access
    // -----------------------------------------------------------------

    fn level_word<'l>(&'l self, lv: &'l Level, idx: usize) -> Option<&'l str> {
        match lv {
            Level::Nodes(ids) => ids.get(idx).map(|&id| self.tree.node(id).word()),
            Level::Items { items, .. } => items.get(idx).map(String::as_str),
        }
    }

    /// Effective handler, listing-target node, and child level for an entry.
    /// For a dynamic item all three come from the owning placeholder.
    fn level_entry(
        &self,
        lv: &Level,
        idx: usize,
    ) -> (Option<Handler<S>>, NodeId, Vec<NodeId>) {
        match lv {
            Level::Nodes(ids) => {
                let id = ids[idx];
                let node = self.tree.node(id);
                (node.handler().cloned(), id, node.children().to_vec())
            }
            Level::Items { owner, .. } => {
                let node = self.tree.node(*owner);
                (node.handler().cloned(), *owner, node.children().to_vec())
            }
        }
    }

    fn match_word(&self, lv: &Level, start: usize, word: &str) -> WordOutcome {
        let mut i = start;
        loop {
            let Some(w) = self.level_word(lv, i) else {
                return WordOutcome::NoMatch;
            };
            if let Level::Nodes(ids) = lv
                && let NodeKind::Regex { compiled } = self.tree.node(ids[i]).kind()
            {
                if compiled.is_match(word) {
                    return WordOutcome::Exact { idx: i };
                }
                i += 1;
                continue;
            }
            match word.cmp(w) {
                Ordering::Equal => return WordOutcome::Exact { idx: i },
                Ordering::Less => {
                    if !w.starts_with(word) {
                        return WordOutcome::NoMatch;
                    }
                    let next_is_prefix = self.level_word(lv, i + 1).is_some_and(|nw| {
                        nw.starts_with(word) && word.len() < nw.len()
                    });
                    if !next_is_prefix {
                        return WordOutcome::Unique { idx: i };
                    }
                    // Count the contiguous run sharing the prefix, then the
                    // columns they all agree on beyond the typed word.
                    let mut run = 2;
                    while let Some(tw) = self.level_word(lv, i + run) {
                        if tw.starts_with(word) && word.len() < tw.len() {
                            run += 1;
                        } else {
                            break;
                        }
                    }
                    let first = self.level_word(lv, i).expect("run start exists");
                    let fbytes = first.as_bytes();
                    let mut grow = 0;
                    'cols: for ci in word.len()..first.len() {
                        for j in 1..run {
                            let tw = self.level_word(lv, i + j).expect("run member exists");
                            if tw.len() <= ci || tw.as_bytes()[ci] != fbytes[ci] {
                                break 'cols;
                            }
                        }
                        grow += 1;
                    }
                    return WordOutcome::Multi { idx: i, grow };
                }
                Ordering::Greater => i += 1,
            }
        }
    }

    // -----------------------------------------------------------------
    // Buffer rewrites
    // -----------------------------------------------------------------

    /// Walk the cursor over spaces following a completed word, appending one
    /// if the word ends the buffer.
    fn cursor_past_word(&mut self) {
        let disp = self.dispspace();
        if self.buf.cursor() == self.buf.len() {
            self.buf.insert(b' ', disp);
        }
        let mut c = self.buf.cursor();
        while c < self.buf.len() && self.buf.as_bytes()[c] == b' ' {
            c += 1;
        }
        self.buf.set_cursor(c, disp);
    }

    /// Replace the partial word at `pos` with `full`, applying the cursor
    /// preservation rules. Returns the length delta.
    fn complete_word_in_buffer(&mut self, pos: usize, len: usize, full: &str) -> usize {
        let add = full.len() - len;
        let cur = self.buf.cursor();
        self.buf.replace(pos, len, full);
        let disp = self.dispspace();
        if cur >= pos && cur <= pos + len {
            self.buf.set_cursor(pos + len + add, disp);
            self.cursor_past_word();
        } else if cur > pos {
            self.buf.set_cursor(cur + add, disp);
        }
        add
    }

    /// Insert a common-prefix extension after the partial word (no trailing
    /// space, no descent).
    fn extend_word_in_buffer(&mut self, pos: usize, len: usize, ext: &str) {
        let cur = self.buf.cursor();
        self.buf.replace(pos + len, 0, ext);
        let disp = self.dispspace();
        if cur >= pos && cur <= pos + len {
            self.buf.set_cursor(pos + len + ext.len(), disp);
        } else if cur > pos {
            self.buf.set_cursor(cur + ext.len(), disp);
        }
    }

    // -----------------------------------------------------------------
    // Filter suffix
    // -----------------------------------------------------------------

    /// Parse `| word params | word params …` after a successful command.
    /// Returns `Some(flags)` on failure; `None` when the suffix resolved
    /// (instantiating the chain when executing).
    fn resolve_filters(
        &mut self,
        snapshot: &str,
        fstart: usize,
        mut added: isize,
        mode: ResolveMode,
        used_dyn: bool,
    ) -> Option<ResolveFlags> {
        let execute = mode == ResolveMode::Execute;
        let do_complete = mode != ResolveMode::Hint;
        let bytes = snapshot.as_bytes();
        let mut p = fstart;

        loop {
            while p < bytes.len() && bytes[p] == b' ' {
                p += 1;
            }
            let fs = p;
            while p < bytes.len() && bytes[p] != b' ' {
                p += 1;
            }
            let fword = &snapshot[fs..p];
            if fword.is_empty() {
                return Some(self.resolve_fail("\nCannot apply empty filter\n", used_dyn));
            }

            let classes: Vec<(String, bool)> = self
                .registry
                .classes()
                .iter()
                .map(|c| (c.word().to_string(), c.allow_next()))
                .collect();
            let pos = (fs as isize + added) as usize;
            let mut k = 0;
            let selected = loop {
                let Some((cw, _)) = classes.get(k) else {
                    return Some(self.resolve_fail("\nNo matched filter\n", used_dyn));
                };
                match fword.cmp(cw.as_str()) {
                    Ordering::Equal => break k,
                    Ordering::Less => {
                        if !cw.starts_with(fword) {
                            return Some(self.resolve_fail("\nNo matched filter\n", used_dyn));
                        }
                        let next_is_prefix = classes
                            .get(k + 1)
                            .is_some_and(|(nw, _)| nw.starts_with(fword) && fword.len() < nw.len());
                        if !next_is_prefix {
                            if do_complete {
                                added +=
                                    self.complete_word_in_buffer(pos, fword.len(), cw) as isize;
                            }
                            break k;
                        }
                        // Common-prefix extension among filter words.
                        let mut run = 2;
                        while let Some((tw, _)) = classes.get(k + run) {
                            if tw.starts_with(fword) && fword.len() < tw.len() {
                                run += 1;
                            } else {
                                break;
                            }
                        }
                        let fbytes = cw.as_bytes();
                        let mut grow = 0;
                        'cols: for ci in fword.len()..cw.len() {
                            for j in 1..run {
                                let (tw, _) = &classes[k + j];
                                if tw.len() <= ci || tw.as_bytes()[ci] != fbytes[ci] {
                                    break 'cols;
                                }
                            }
                            grow += 1;
                        }
                        if do_complete && grow > 0 {
                            let ext = cw[fword.len()..fword.len() + grow].to_string();
                            self.extend_word_in_buffer(pos, fword.len(), &ext);
                            added += grow as isize;
                        }
                        if grow > 0 && fword.len() + grow == cw.len() {
                            break k;
                        }
                        return Some(self.resolve_fail("\nNo matched filter\n", used_dyn));
                    }
                    Ordering::Greater => k += 1,
                }
            };

            // Parameter text: everything up to the next `|` (or the end),
            // leading and trailing spaces stripped.
            let mut q = p;
            while q < bytes.len() && bytes[q] == b' ' {
                q += 1;
            }
            let ps = q;
            while q < bytes.len() && bytes[q] != b'|' {
                q += 1;
            }
            let have_next = q < bytes.len();
            let mut pe = q;
            while pe > ps && bytes[pe - 1] == b' ' {
                pe -= 1;
            }
            let params = &snapshot[ps..pe];

            if have_next && !classes[selected].1 {
                return Some(
                    self.resolve_fail("\nCannot chain another filter after this one\n", used_dyn),
                );
            }
            if execute {
                let stage = self.registry.classes()[selected].instantiate(params);
                self.chain.push(stage);
            }
            if !have_next {
                return None;
            }
            p = q + 1;
        }
    }

    // -----------------------------------------------------------------
    // Contextual help
    // -----------------------------------------------------------------

    fn help_entry_len(word: &str, executable: bool) -> usize {
        word.len() + if executable { " <cr>".len() } else { 0 }
    }

    /// One help line: command column padded to `padto`, then the help text.
    /// The synthetic `<cr>` entry (empty command) is followed by the filter
    /// availability line.
    fn help_line(&mut self, cmd: &str, help: &str, prcr: bool, padto: usize) {
        let pcr = if !cmd.is_empty() && prcr {
            " <cr>"
        } else if prcr {
            "<cr>"
        } else {
            ""
        };
        let pad = padto.saturating_sub(cmd.len() + pcr.len());
        self.print(&format!("{cmd}{pcr} {:pad$} {help}\n", ""));
        if cmd.is_empty() {
            self.print(&format!("{:<width$}Output filters\n", "|", width = padto + 2));
        }
    }

    /// Listing for a node whose word is complete: `<cr>` when executable,
    /// then every child. Returns whether a dynamic listing was expanded.
    fn help_node(&mut self, node: NodeId) -> bool {
        let mut used_dyn = false;
        let (node_exec, node_help) = {
            let n = self.tree.node(node);
            (n.handler().is_some(), n.help().to_string())
        };
        let children: Vec<NodeId> = self.tree.node(node).children().to_vec();

        // (display word, help, mark with <cr>)
        let mut entries: Vec<(String, String, bool)> = Vec::new();
        let dyn_child = children.first().copied().filter(|&c| {
            matches!(self.tree.node(c).kind(), NodeKind::Dynamic { .. })
        });
        if let Some(owner) = dyn_child {
            self.dyn_refresh(owner);
            used_dyn = true;
            let (owner_help, items) = match self.tree.node(owner).kind() {
                NodeKind::Dynamic { items, .. } => {
                    (self.tree.node(owner).help().to_string(), items.clone())
                }
                _ => unreachable!(),
            };
            for item in items {
                entries.push((item, owner_help.clone(), false));
            }
        } else {
            for &c in &children {
                let n = self.tree.node(c);
                entries.push((
                    n.display_word().to_string(),
                    n.display_help().to_string(),
                    n.handler().is_some(),
                ));
            }
        }

        let mut padto = 0;
        if node_exec {
            padto = "<cr>".len();
        }
        for (w, _, exec) in &entries {
            padto = padto.max(Self::help_entry_len(w, *exec));
        }
        if node_exec {
            self.help_line("", &node_help, true, padto);
        }
        for (w, h, exec) in entries {
            self.help_line(&w, &h, exec, padto);
        }
        used_dyn
    }

    /// Listing for an incomplete word: siblings of the current level whose
    /// word starts with the partial.
    fn help_siblings(&mut self, lv: &Level, partial: &str) -> bool {
        let mut used_dyn = false;
        let mut entries: Vec<(String, String, bool)> = Vec::new();
        match lv {
            Level::Nodes(ids) => {
                let dyn_owner = ids.first().copied().filter(|&c| {
                    matches!(self.tree.node(c).kind(), NodeKind::Dynamic { .. })
                });
                if let Some(owner) = dyn_owner {
                    self.dyn_refresh(owner);
                    used_dyn = true;
                    let (owner_help, items) = match self.tree.node(owner).kind() {
                        NodeKind::Dynamic { items, .. } => {
                            (self.tree.node(owner).help().to_string(), items.clone())
                        }
                        _ => unreachable!(),
                    };
                    for item in items {
                        if item.starts_with(partial) {
                            entries.push((item, owner_help.clone(), false));
                        }
                    }
                } else {
                    for &id in ids {
                        let n = self.tree.node(id);
                        if n.word().starts_with(partial) {
                            entries.push((
                                n.word().to_string(),
                                n.display_help().to_string(),
                                n.handler().is_some(),
                            ));
                        }
                    }
                }
            }
            Level::Items { owner, items } => {
                let owner_help = self.tree.node(*owner).help().to_string();
                for item in items {
                    if item.starts_with(partial) {
                        entries.push((item.clone(), owner_help.clone(), false));
                    }
                }
            }
        }
        let mut padto = 0;
        for (w, _, exec) in &entries {
            padto = padto.max(Self::help_entry_len(w, *exec));
        }
        for (w, h, exec) in entries {
            self.help_line(&w, &h, exec, padto);
        }
        used_dyn
    }

    /// Listing for an empty buffer: every top-level command.
    fn help_top_level(&mut self) {
        let ids: Vec<NodeId> = self.tree.top_level().to_vec();
        let mut entries: Vec<(String, String, bool)> = Vec::new();
        for &id in &ids {
            let n = self.tree.node(id);
            entries.push((
                n.display_word().to_string(),
                n.display_help().to_string(),
                n.handler().is_some(),
            ));
        }
        let mut padto = 0;
        for (w, _, exec) in &entries {
            padto = padto.max(Self::help_entry_len(w, *exec));
        }
        for (w, h, exec) in entries {
            self.help_line(&w, &h, exec, padto);
        }
    }
}
