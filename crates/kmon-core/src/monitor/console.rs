//! Line sources for the monitor loop.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use crate::error::Result;

/// Blocking source of operator input lines.
pub trait LineSource
{
    /// Show `prompt` and read the next line, without its line terminator.
    ///
    /// Returns `Ok(None)` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive console over a reader and the writer that shows the prompt.
pub struct ConsoleLines<R, W>
{
    input: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> ConsoleLines<R, W>
{
    pub fn new(input: R, prompt_out: W) -> Self
    {
        Self { input, prompt_out }
    }
}

impl<R: BufRead, W: Write> LineSource for ConsoleLines<R, W>
{
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>
    {
        self.prompt_out.write_all(prompt.as_bytes())?;
        self.prompt_out.flush()?;

        // Invalid UTF-8 is replaced, not fatal.
        let mut raw = Vec::new();
        if self.input.read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }
        let mut line = String::from_utf8_lossy(&raw).into_owned();
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Pre-recorded lines, e.g. from the command line or a test.
///
/// Prompts are not shown.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLines
{
    lines: VecDeque<String>,
}

impl ScriptedLines
{
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Lines not yet read.
    pub fn remaining(&self) -> usize
    {
        self.lines.len()
    }
}

impl LineSource for ScriptedLines
{
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>>
    {
        Ok(self.lines.pop_front())
    }
}
