//! Command tree: sorted sibling lists with literal, dynamic, and regex nodes.
//!
//! Nodes live in a flat arena owned by the tree; handles ([`NodeId`]) carry a
//! tree generation stamp so a handle that survived a mode switch is rejected
//! instead of silently indexing into the wrong tree.
//!
//! Node kinds are a tagged variant rather than leading-character sniffing,
//! but the registration strings keep the classic markers: `@<id>` registers a
//! dynamic placeholder (children enumerated at resolution time by a user
//! callback), `^…$` registers a regex leaf whose `help` doubles as the
//! abbreviation shown in listings. Within one sibling list either every node
//! is literal, or there is exactly one dynamic placeholder, or exactly one
//! regex placeholder; `add` rejects anything else.
//!
//! Regex patterns compile once here, at registration. A malformed pattern is
//! a registration error, not a silent never-matching leaf.

pub mod modes;
pub use modes::{ModeFrame, ModeStack};

use regex::Regex;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("duplicate command word {0:?} at this level")]
    Duplicate(String),
    #[error("cannot mix literal and dynamic/regex siblings")]
    MixedKinds,
    #[error("parent handle does not belong to the current tree")]
    ForeignParent,
    #[error("node is not a dynamic placeholder")]
    NotDynamic,
    #[error("invalid regex pattern")]
    InvalidRegex(#[from] regex::Error),
}

/// Handle to a node, valid only for the tree generation it was created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId {
    idx: usize,
    generation: u64,
}

#[derive(Debug)]
pub enum NodeKind {
    Literal,
    /// Children are enumerated on demand; `id` is handed back to the listing
    /// callback so one callback can service several dynamic points.
    Dynamic { id: i32, items: Vec<String> },
    Regex { compiled: Regex },
}

pub struct Node<H> {
    /// Registration word: the literal, `@<id>`, or `^…$`.
    word: String,
    /// Help text; for regex nodes, the abbreviation displayed instead of the
    /// pattern.
    help: String,
    handler: Option<H>,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<H> Node<H> {
    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn handler(&self) -> Option<&H> {
        self.handler.as_ref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The word shown in help and completion listings: the literal word, or
    /// the abbreviation for a regex leaf.
    pub fn display_word(&self) -> &str {
        match self.kind {
            NodeKind::Regex { .. } => &self.help,
            _ => &self.word,
        }
    }

    /// Help text shown next to `display_word`; empty for regex leaves (the
    /// abbreviation already occupies the command column).
    pub fn display_help(&self) -> &str {
        match self.kind {
            NodeKind::Regex { .. } => "",
            _ => &self.help,
        }
    }
}

pub struct CommandTree<H> {
    nodes: Vec<Node<H>>,
    top: Vec<NodeId>,
    generation: u64,
}

impl<H> Default for CommandTree<H> {
    fn default() -> Self {
        Self::new()
    }
}

static GENERATION: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);

impl<H> CommandTree<H> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            top: Vec::new(),
            generation: GENERATION.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    /// Top-level sibling list, sorted.
    pub fn top_level(&self) -> &[NodeId] {
        &self.top
    }

    pub fn node(&self, id: NodeId) -> &Node<H> {
        debug_assert_eq!(id.generation, self.generation);
        &self.nodes[id.idx]
    }

    fn contains(&self, id: NodeId) -> bool {
        id.generation == self.generation && id.idx < self.nodes.len()
    }

    /// Register a command word under `parent` (or at the top level).
    ///
    /// Fails on duplicate words, on mixing literal with dynamic/regex
    /// siblings, on a handle from another tree, and on a regex word that does
    /// not compile.
    pub fn add(
        &mut self,
        parent: Option<NodeId>,
        word: &str,
        help: &str,
        handler: Option<H>,
    ) -> Result<NodeId, TreeError> {
        if let Some(p) = parent
            && !self.contains(p)
        {
            return Err(TreeError::ForeignParent);
        }

        let kind = if let Some(id) = word.strip_prefix('@') {
            NodeKind::Dynamic {
                id: id.parse().unwrap_or(0),
                items: Vec::new(),
            }
        } else if word.starts_with('^') && word.ends_with('$') {
            NodeKind::Regex {
                compiled: Regex::new(word)?,
            }
        } else {
            NodeKind::Literal
        };

        let level: &[NodeId] = match parent {
            Some(p) => &self.nodes[p.idx].children,
            None => &self.top,
        };
        let placeholder = !matches!(kind, NodeKind::Literal);
        if !level.is_empty() {
            if placeholder {
                return Err(TreeError::MixedKinds);
            }
            let first = &self.nodes[level[0].idx];
            if !matches!(first.kind, NodeKind::Literal) {
                return Err(TreeError::MixedKinds);
            }
        }
        let pos = match level.binary_search_by(|id| self.nodes[id.idx].word.as_str().cmp(word)) {
            Ok(_) => return Err(TreeError::Duplicate(word.to_string())),
            Err(pos) => pos,
        };

        let id = NodeId {
            idx: self.nodes.len(),
            generation: self.generation,
        };
        self.nodes.push(Node {
            word: word.to_string(),
            help: help.to_string(),
            handler,
            kind,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.idx].children.insert(pos, id),
            None => self.top.insert(pos, id),
        }
        trace!(target = "tree", word, parent = ?parent.map(|p| p.idx), "node_added");
        Ok(id)
    }

    /// Insert one item into a dynamic node's current listing, keeping the
    /// list sorted; duplicates are silently dropped. Called (via the engine)
    /// from inside the dynamic-listing callback.
    pub fn list(&mut self, node: NodeId, item: &str) -> Result<(), TreeError> {
        if !self.contains(node) {
            return Err(TreeError::ForeignParent);
        }
        match &mut self.nodes[node.idx].kind {
            NodeKind::Dynamic { items, .. } => {
                if let Err(pos) = items.binary_search_by(|it| it.as_str().cmp(item)) {
                    items.insert(pos, item.to_string());
                }
                Ok(())
            }
            _ => Err(TreeError::NotDynamic),
        }
    }

    /// Discard the previous listing of a dynamic node (the engine calls this
    /// right before re-invoking the listing callback).
    pub fn clear_items(&mut self, node: NodeId) {
        if let NodeKind::Dynamic { items, .. } = &mut self.nodes[node.idx].kind {
            items.clear();
        }
    }

    /// Drop every dynamic listing in the tree so the next resolver pass sees
    /// fresh data.
    pub fn vacuum(&mut self) {
        for node in &mut self.nodes {
            if let NodeKind::Dynamic { items, .. } = &mut node.kind {
                items.clear();
            }
        }
    }
}
