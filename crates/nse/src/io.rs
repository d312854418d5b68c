//! Output abstraction for `*stdout*`/`*stderr*` (spec §6: "a byte-stream
//! abstraction supporting get-character and printf-style writing").
//!
//! Grounded on `ouros::io`'s `PrintWriter` trait family (`StdPrint`,
//! `CollectStringPrint`, `NoPrint`), trimmed to NSE's simpler need: NSE has
//! no `contextlib.redirect_stdout`-style dynamic redirection, so the
//! thread-local redirect stack is dropped (noted in DESIGN.md) and the trait
//! collapses to a single `write_str`.

use std::io::{self, Write as _};

use crate::error::RunResult;

/// Receives text written to a native output stream.
pub trait PrintWriter: std::fmt::Debug {
    fn write_str(&mut self, s: &str) -> RunResult<()>;
}

/// Writes straight through to the process's real stdout/stderr.
#[derive(Debug, Default)]
pub struct StdOut;

impl PrintWriter for StdOut {
    fn write_str(&mut self, s: &str) -> RunResult<()> {
        io::stdout().write_all(s.as_bytes()).map_err(|e| crate::error::RunError::io(e.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct StdErr;

impl PrintWriter for StdErr {
    fn write_str(&mut self, s: &str) -> RunResult<()> {
        io::stderr().write_all(s.as_bytes()).map_err(|e| crate::error::RunError::io(e.to_string()))
    }
}

/// Collects everything written into an in-memory string. Useful for tests
/// and for embedding NSE in a host that wants to capture output.
#[derive(Debug, Default)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn write_str(&mut self, s: &str) -> RunResult<()> {
        self.0.push_str(s);
        Ok(())
    }
}

/// Discards everything written to it.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn write_str(&mut self, _s: &str) -> RunResult<()> {
        Ok(())
    }
}
