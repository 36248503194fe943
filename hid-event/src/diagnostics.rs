//! Best-effort diagnostic trace output
//!
//! The decoder writes free-form trace lines (report hex dumps, skipped
//! reports, classification notes) to a [`DiagnosticSink`]. Sinks never report
//! failure back to the decoder.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;

/// Receiver for diagnostic trace lines
pub trait DiagnosticSink {
    /// Record one line. Implementations must swallow their own errors.
    fn line(&self, args: fmt::Arguments<'_>);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn line(&self, args: fmt::Arguments<'_>) {
        (**self).line(args)
    }
}

/// Forwards trace lines to `tracing` at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn line(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: "hid_event::diagnostics", "{}", args);
    }
}

/// Keeps trace lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: RefCell<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines recorded so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Take the recorded lines, leaving the sink empty
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.borrow_mut())
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|l| l.contains(needle))
    }
}

impl DiagnosticSink for MemorySink {
    fn line(&self, args: fmt::Arguments<'_>) {
        // A re-entrant write while borrowed is dropped rather than panicking
        if let Ok(mut lines) = self.lines.try_borrow_mut() {
            lines.push(args.to_string());
        }
    }
}

/// Writes each line to an `io::Write`, ignoring write errors
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: RefCell<W>,
    prefix: &'static str,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_prefix(writer, "")
    }

    pub fn with_prefix(writer: W, prefix: &'static str) -> Self {
        Self {
            writer: RefCell::new(writer),
            prefix,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> DiagnosticSink for WriterSink<W> {
    fn line(&self, args: fmt::Arguments<'_>) {
        if let Ok(mut w) = self.writer.try_borrow_mut() {
            let _ = writeln!(w, "{}{}", self.prefix, args);
        }
    }
}

/// Displays a byte slice as contiguous uppercase hex (`01300A`)
#[derive(Debug, Clone, Copy)]
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}
