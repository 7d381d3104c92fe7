//! Mode stack: named frames that each own the command tree they replaced.
//!
//! Entering a mode parks the current tree inside the new frame and the engine
//! starts from an empty tree; exiting drops the mode's tree and hands the
//! parked one back. Ownership therefore never leaves the stack, and handles
//! into a parked tree are rejected by its generation stamp until it is
//! restored.

use crate::CommandTree;
use std::any::Any;
use tracing::debug;

pub struct ModeFrame<H> {
    name: String,
    saved: CommandTree<H>,
    hint: Option<Box<dyn Any>>,
}

pub struct ModeStack<H> {
    frames: Vec<ModeFrame<H>>,
}

impl<H> Default for ModeStack<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> ModeStack<H> {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Push a frame holding the tree being replaced.
    pub fn enter(&mut self, name: &str, hint: Option<Box<dyn Any>>, saved: CommandTree<H>) {
        debug!(target = "tree.modes", mode = name, depth = self.frames.len() + 1, "enter_mode");
        self.frames.push(ModeFrame {
            name: name.to_string(),
            saved,
            hint,
        });
    }

    /// Pop the top frame, returning the tree it had parked. `None` at the top
    /// level.
    pub fn exit(&mut self) -> Option<CommandTree<H>> {
        let frame = self.frames.pop()?;
        debug!(target = "tree.modes", mode = frame.name.as_str(), depth = self.frames.len(), "exit_mode");
        Some(frame.saved)
    }

    pub fn set_hint(&mut self, hint: Option<Box<dyn Any>>) {
        if let Some(top) = self.frames.last_mut() {
            top.hint = hint;
        }
    }

    pub fn hint(&self) -> Option<&dyn Any> {
        self.frames.last().and_then(|f| f.hint.as_deref())
    }

    /// The prompt's mode chain, e.g. `(config-if)` for `config` entered
    /// first and `if` entered on top of it. Empty string at the top level.
    pub fn chain(&self) -> String {
        if self.frames.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        for (i, frame) in self.frames.iter().enumerate() {
            out.push(if i == 0 { '(' } else { '-' });
            out.push_str(&frame.name);
        }
        out.push(')');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chain_is_empty_at_top_level() {
        let stack: ModeStack<()> = ModeStack::new();
        assert_eq!(stack.chain(), "");
    }

    #[test]
    fn chain_joins_modes_in_entry_order() {
        let mut stack: ModeStack<()> = ModeStack::new();
        stack.enter("config", None, CommandTree::new());
        assert_eq!(stack.chain(), "(config)");
        stack.enter("if", None, CommandTree::new());
        assert_eq!(stack.chain(), "(config-if)");
    }

    #[test]
    fn exit_restores_the_parked_tree() {
        let mut stack: ModeStack<()> = ModeStack::new();
        let mut outer: CommandTree<()> = CommandTree::new();
        outer.add(None, "show", "", None).unwrap();
        stack.enter("config", None, outer);

        let restored = stack.exit().expect("frame");
        assert_eq!(restored.top_level().len(), 1);
        assert!(stack.exit().is_none());
    }

    #[test]
    fn hints_live_on_the_top_frame() {
        let mut stack: ModeStack<()> = ModeStack::new();
        stack.enter("config", Some(Box::new(7u32)), CommandTree::new());
        let got = stack.hint().and_then(|h| h.downcast_ref::<u32>());
        assert_eq!(got, Some(&7));
        stack.set_hint(None);
        assert!(stack.hint().is_none());
    }
}
