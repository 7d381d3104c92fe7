//! Terminal renderer contract and crossterm implementation.
//!
//! The engine draws through the [`Screen`] trait and nothing else: clearing
//! the current line, writing bytes, reporting the terminal size, and toggling
//! telnet negotiation are the whole surface. Escape-sequence decoding lives on
//! the input side ([`keys::map_key_event`]) so the engine only ever sees
//! abstract [`Key`] codes.

use anyhow::Result;
use crossterm::{
    cursor, execute,
    terminal::{self, Clear, ClearType, disable_raw_mode, enable_raw_mode},
};
use std::io::{Write, stdout};
use tracing::debug;

pub mod capture;
pub mod keys;
pub use capture::CaptureScreen;
pub use keys::{Key, map_key_event};

/// Renderer surface consumed by the engine.
///
/// Implementations must treat `write` as opaque bytes (the engine performs its
/// own `\n` → `\r\n` normalization upstream) and must keep `getsize` cheap; it
/// is consulted on every size event.
pub trait Screen {
    /// Clear the whole screen and home the cursor.
    fn clear(&mut self);
    /// Clear the current line without moving to the next one.
    fn clearln(&mut self);
    /// The clear-line escape as a string, for embedding in a composed write.
    fn clearln_seq(&self) -> &'static str;
    /// Write a string as-is.
    fn puts(&mut self, text: &str);
    /// Write raw bytes as-is.
    fn write(&mut self, bytes: &[u8]);
    /// Current terminal size as (columns, rows).
    fn getsize(&self) -> (u16, u16);
    /// Ask the terminal for a size update. Push-model renderers emit a
    /// [`Key::ScreenSize`] event later; pull-model ones may do nothing.
    fn reqsize(&mut self);
    /// Start telnet option negotiation on the underlying transport.
    fn init_telnet(&mut self);
    /// Enable or disable telnet IAC handling.
    fn set_telnet(&mut self, on: bool);
    /// Human-readable renderer version line.
    fn version(&self) -> String;
}

const CLEARLN_SEQ: &str = "\x1b[2K";

/// [`Screen`] backed by crossterm on stdout.
///
/// Telnet negotiation is not implemented by this backend; a telnet-capable
/// transport would wrap the socket instead of stdout. The setters are kept as
/// no-ops so embedding code can stay backend-agnostic.
pub struct CrosstermScreen {
    raw: bool,
}

impl Default for CrosstermScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermScreen {
    pub fn new() -> Self {
        Self { raw: false }
    }

    /// Enter raw mode. Restored on drop (or explicitly via [`Self::leave_raw`]).
    pub fn enter_raw(&mut self) -> Result<()> {
        if !self.raw {
            enable_raw_mode()?;
            self.raw = true;
            debug!(target = "term", "raw_mode_enabled");
        }
        Ok(())
    }

    pub fn leave_raw(&mut self) -> Result<()> {
        if self.raw {
            disable_raw_mode()?;
            self.raw = false;
            debug!(target = "term", "raw_mode_disabled");
        }
        Ok(())
    }
}

impl Screen for CrosstermScreen {
    fn clear(&mut self) {
        let _ = execute!(stdout(), Clear(ClearType::All), cursor::MoveTo(0, 0));
    }

    fn clearln(&mut self) {
        let _ = execute!(stdout(), Clear(ClearType::CurrentLine));
    }

    fn clearln_seq(&self) -> &'static str {
        CLEARLN_SEQ
    }

    fn puts(&mut self, text: &str) {
        self.write(text.as_bytes());
    }

    fn write(&mut self, bytes: &[u8]) {
        let mut out = stdout();
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }

    fn getsize(&self) -> (u16, u16) {
        terminal::size().unwrap_or((80, 25))
    }

    fn reqsize(&mut self) {
        // crossterm reports size on demand; resize events arrive through the
        // host event loop as Key::ScreenSize.
    }

    fn init_telnet(&mut self) {}

    fn set_telnet(&mut self, _on: bool) {}

    fn version(&self) -> String {
        format!("crossterm terminal backend {}\n\n", env!("CARGO_PKG_VERSION"))
    }
}

// Raw mode is restored when the screen is dropped, even if the host loop
// early-returns or panics.
impl Drop for CrosstermScreen {
    fn drop(&mut self) {
        let _ = self.leave_raw();
    }
}
