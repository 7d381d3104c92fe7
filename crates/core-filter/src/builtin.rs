//! Built-in filter stages: `include`, `exclude`, `count`, and the sink.
//!
//! `include`/`exclude` are line-oriented: bytes accumulate until a newline,
//! the completed line is tested against the parameter text, and passing lines
//! are forwarded newline included. On `done`, an unterminated tail line is
//! tested the same way and, if it passes, forwarded with a synthesized
//! newline. `count` swallows everything and emits a single summary line from
//! `done`.

use crate::FilterStage;

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty()
        || haystack
            .windows(needle.len())
            .any(|window| window == needle)
}

/// Pass-through terminal stage; every chain ends in one.
pub struct NoopStage;

impl FilterStage for NoopStage {
    fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) {
        out.extend_from_slice(input);
    }

    fn done(&mut self, _out: &mut Vec<u8>) {}
}

/// Forward only lines containing the parameter text.
pub struct IncludeStage {
    needle: Vec<u8>,
    buf: Vec<u8>,
}

impl IncludeStage {
    pub fn new(params: &str) -> Self {
        Self {
            needle: params.as_bytes().to_vec(),
            buf: Vec::new(),
        }
    }
}

impl FilterStage for IncludeStage {
    fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) {
        self.buf.extend_from_slice(input);
        while let Some(nl) = self.buf.iter().position(|&b| b == b'\n') {
            if contains(&self.buf[..nl], &self.needle) {
                out.extend_from_slice(&self.buf[..=nl]);
            }
            self.buf.drain(..=nl);
        }
    }

    fn done(&mut self, out: &mut Vec<u8>) {
        if !self.buf.is_empty() {
            if contains(&self.buf, &self.needle) {
                out.extend_from_slice(&self.buf);
                out.push(b'\n');
            }
            self.buf.clear();
        }
    }
}

/// Forward only lines not containing the parameter text.
pub struct ExcludeStage {
    needle: Vec<u8>,
    buf: Vec<u8>,
}

impl ExcludeStage {
    pub fn new(params: &str) -> Self {
        Self {
            needle: params.as_bytes().to_vec(),
            buf: Vec::new(),
        }
    }
}

impl FilterStage for ExcludeStage {
    fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) {
        self.buf.extend_from_slice(input);
        while let Some(nl) = self.buf.iter().position(|&b| b == b'\n') {
            if !contains(&self.buf[..nl], &self.needle) {
                out.extend_from_slice(&self.buf[..=nl]);
            }
            self.buf.drain(..=nl);
        }
    }

    fn done(&mut self, out: &mut Vec<u8>) {
        if !self.buf.is_empty() {
            if !contains(&self.buf, &self.needle) {
                out.extend_from_slice(&self.buf);
                out.push(b'\n');
            }
            self.buf.clear();
        }
    }
}

/// Count newlines; emit `Line count: N` downstream at end of command.
pub struct CountStage {
    count: u64,
}

impl CountStage {
    pub fn new() -> Self {
        Self { count: 0 }
    }
}

impl Default for CountStage {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterStage for CountStage {
    fn feed(&mut self, input: &[u8], _out: &mut Vec<u8>) {
        self.count += input.iter().filter(|&&b| b == b'\n').count() as u64;
    }

    fn done(&mut self, out: &mut Vec<u8>) {
        out.extend_from_slice(format!("Line count: {}\n", self.count).as_bytes());
    }
}
