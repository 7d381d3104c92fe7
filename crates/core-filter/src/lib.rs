//! Output filter classes and the per-command filter chain.
//!
//! A filter class describes one word selectable after `|` (its help text,
//! whether another `|` may follow, and how to instantiate it); the sorted
//! registry is what the resolver prefix-matches against. A [`FilterChain`] is
//! built per executed command from the instantiated stages and always ends in
//! the no-op sink, whose output the engine hands to the pager.
//!
//! Stages are byte streams: `feed` receives an arbitrary run of bytes and
//! appends whatever should continue downstream to `out`; `done` flushes any
//! buffered tail once the command's handler has returned. The chain driver
//! guarantees `done` runs exactly once per stage, head to tail, with each
//! stage's flushed bytes fed through the stages after it.

pub mod builtin;
pub use builtin::{CountStage, ExcludeStage, IncludeStage, NoopStage};

use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("duplicate filter word {0:?}")]
    Duplicate(String),
}

/// One streaming transformer instance in a chain.
pub trait FilterStage {
    /// Consume a run of bytes, appending pass-through output to `out`.
    fn feed(&mut self, input: &[u8], out: &mut Vec<u8>);
    /// Flush buffered state at end of command, appending to `out`.
    fn done(&mut self, out: &mut Vec<u8>);
}

type StageCtor = Box<dyn Fn(&str) -> Box<dyn FilterStage>>;

/// A registered filter word.
pub struct FilterClass {
    word: String,
    help: String,
    allow_next: bool,
    make: StageCtor,
}

impl FilterClass {
    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    /// Whether another `|` may follow this filter.
    pub fn allow_next(&self) -> bool {
        self.allow_next
    }

    pub fn instantiate(&self, params: &str) -> Box<dyn FilterStage> {
        trace!(target = "filter", word = self.word.as_str(), params, "filter_instantiate");
        (self.make)(params)
    }
}

/// Sorted list of filter classes, seeded with the built-ins.
pub struct FilterRegistry {
    classes: Vec<FilterClass>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl FilterRegistry {
    pub fn empty() -> Self {
        Self {
            classes: Vec::new(),
        }
    }

    /// Registry with `include`, `exclude`, and `count`.
    pub fn with_builtins() -> Self {
        let mut reg = Self::empty();
        reg.add(
            "include",
            "Filter output that contains the parameter text",
            true,
            Box::new(|params| Box::new(IncludeStage::new(params))),
        )
        .expect("builtin filter words are distinct");
        reg.add(
            "exclude",
            "Filter output that contains the parameter text",
            true,
            Box::new(|params| Box::new(ExcludeStage::new(params))),
        )
        .expect("builtin filter words are distinct");
        reg.add(
            "count",
            "Display output line count",
            false,
            Box::new(|_| Box::new(CountStage::new())),
        )
        .expect("builtin filter words are distinct");
        reg
    }

    /// Register a filter word. Fails on duplicates; keeps the list sorted so
    /// the resolver can prefix-match the same way it matches commands.
    pub fn add(
        &mut self,
        word: &str,
        help: &str,
        allow_next: bool,
        make: StageCtor,
    ) -> Result<(), FilterError> {
        let pos = match self
            .classes
            .binary_search_by(|c| c.word.as_str().cmp(word))
        {
            Ok(_) => return Err(FilterError::Duplicate(word.to_string())),
            Err(pos) => pos,
        };
        self.classes.insert(
            pos,
            FilterClass {
                word: word.to_string(),
                help: help.to_string(),
                allow_next,
                make,
            },
        );
        Ok(())
    }

    pub fn classes(&self) -> &[FilterClass] {
        &self.classes
    }
}

/// The per-command chain. Created empty (sink only); the resolver pushes one
/// stage per `|` segment in command order.
pub struct FilterChain {
    stages: Vec<Box<dyn FilterStage>>,
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterChain {
    pub fn new() -> Self {
        Self {
            stages: vec![Box::new(NoopStage)],
        }
    }

    /// Number of stages including the sink.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the sink is always present
    }

    /// Insert a stage just before the sink.
    pub fn push(&mut self, stage: Box<dyn FilterStage>) {
        let sink = self.stages.len() - 1;
        self.stages.insert(sink, stage);
    }

    /// Drop every stage and start over with just the sink.
    pub fn reset(&mut self) {
        self.stages.clear();
        self.stages.push(Box::new(NoopStage));
    }

    /// Stream bytes through the chain, returning what leaves the sink.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<u8> {
        let mut data = bytes.to_vec();
        for stage in &mut self.stages {
            let mut out = Vec::new();
            stage.feed(&data, &mut out);
            data = out;
        }
        data
    }

    /// Run the `done` cascade: each stage flushes once, head to tail, its
    /// output passing through the stages downstream of it.
    pub fn finish(&mut self) -> Vec<u8> {
        let mut carry: Vec<u8> = Vec::new();
        for stage in &mut self.stages {
            let mut fed = Vec::new();
            if !carry.is_empty() {
                stage.feed(&carry, &mut fed);
            }
            stage.done(&mut fed);
            carry = fed;
        }
        carry
    }
}
