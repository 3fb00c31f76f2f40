//! Console double for unit tests.

use std::io;

use toolchat_agent::Console;

#[derive(Debug, Default)]
pub(crate) struct RecordingConsole {
    pub lines: Vec<String>,
    pub clears: usize,
    pub fail_clear: bool,
}

impl Console for RecordingConsole {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(None)
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.push(line.to_owned());
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        if self.fail_clear {
            return Err(io::Error::other("not a terminal"));
        }
        self.clears += 1;
        Ok(())
    }
}
