//! Line-oriented report output.
//!
//! Every normal output line goes through [`Report`], which drops it when
//! quiet mode is on. Errors are written by the caller directly and are never
//! suppressed.

use crate::{Result, error::JsqlError};
use std::io::Write;

/// Report writer with a quiet switch.
pub struct Report<W: Write> {
    out: W,
    quiet: bool,
}

impl<W: Write> Report<W> {
    /// Wraps `out`; when `quiet` is set nothing is written.
    pub fn new(out: W, quiet: bool) -> Self {
        Self { out, quiet }
    }

    /// Writes one full line.
    pub fn line(&mut self, text: impl AsRef<str>) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(self.out, "{}", text.as_ref())
            .map_err(|e| JsqlError::io("Failed to write report", e))
    }

    /// Writes an empty line.
    pub fn blank(&mut self) -> Result<()> {
        self.line("")
    }

    /// Writes each line in order.
    pub fn lines<I, S>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.line(line)?;
        }
        Ok(())
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| JsqlError::io("Failed to flush report", e))
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
