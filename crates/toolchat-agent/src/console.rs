//! Line-based console abstraction.
//!
//! The session loop and the tools only talk to the terminal through this
//! trait, so tests can drive a session from a script.

use std::io;

/// A line-oriented console.
pub trait Console: Send {
    /// Show `prompt` and read one line without its trailing newline.
    /// Returns `Ok(None)` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Clear the visible screen.
    fn clear(&mut self) -> io::Result<()>;
}
