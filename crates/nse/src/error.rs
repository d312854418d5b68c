//! Error taxonomy, process-wide error state, and call-stack trace.
//!
//! Grounded on `ouros::exception_private`: a `strum`-derived error-kind enum,
//! a `RunError` payload, and a `RunResult<T>` alias used as the evaluator's
//! internal `Result` type (spec §9's "the evaluator's internal type is
//! `Result<Value, Error>`").

use std::fmt;

use strum::{Display, EnumString};

use crate::value::Value;

/// Result type alias used throughout the evaluator.
pub type RunResult<T> = Result<T, RunError>;

/// The six error kinds named in spec §7. No prefix/type-name coupling:
/// these are plain symbols, not an exception class hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ExcType {
    OutOfMemoryError,
    DomainError,
    PatternError,
    NameError,
    SyntaxError,
    IoError,
}

/// A single entry in the call-stack trace: the callable's name, the argument
/// values it was applied to, and the source form being evaluated when the
/// frame was pushed.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub callee: String,
    pub args: Vec<Value>,
    pub form: Option<Value>,
}

/// An error as observed at the point it is raised: kind, message, the syntax
/// form in play (if any), and a snapshot of the call stack (populated by
/// `try`, per spec §5).
#[derive(Debug, Clone)]
pub struct RunError {
    pub kind: ExcType,
    pub message: String,
    pub form: Option<Value>,
    pub stack_trace: Vec<StackFrame>,
}

impl RunError {
    pub fn new(kind: ExcType, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), form: None, stack_trace: Vec::new() }
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::new(ExcType::DomainError, message)
    }

    pub fn name(message: impl Into<String>) -> Self {
        Self::new(ExcType::NameError, message)
    }

    pub fn pattern(message: impl Into<String>) -> Self {
        Self::new(ExcType::PatternError, message)
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ExcType::SyntaxError, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ExcType::IoError, message)
    }

    pub fn out_of_memory(message: impl Into<String>) -> Self {
        Self::new(ExcType::OutOfMemoryError, message)
    }

    #[must_use]
    pub fn with_form(mut self, form: Value) -> Self {
        self.form = Some(form);
        self
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error({}): {}", self.kind, self.message)
    }
}

impl std::error::Error for RunError {}

/// Process-wide (really: per-`Interpreter`, see DESIGN.md) error state and
/// call-stack trace, per spec §5. The error state is *not* stacked: each raise
/// overwrites the previous one. Only `try` is permitted to consume it.
#[derive(Debug, Default)]
pub struct ErrorState {
    current: Option<RunError>,
    stack: Vec<StackFrame>,
}

impl ErrorState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, mut err: RunError) {
        err.stack_trace = self.stack.clone();
        self.current = Some(err);
    }

    /// Clears and returns the current error, if any. Used by `try` and by the
    /// (external) REPL's error printer.
    pub fn take(&mut self) -> Option<RunError> {
        self.current.take()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&RunError> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn push_frame(&mut self, frame: StackFrame) {
        self.stack.push(frame);
    }

    pub fn pop_frame(&mut self) {
        self.stack.pop();
    }

    #[must_use]
    pub fn trace(&self) -> &[StackFrame] {
        &self.stack
    }
}
