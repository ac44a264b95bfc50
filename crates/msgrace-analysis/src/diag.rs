//! The diagnostic channel for non-fatal conservativeness warnings.
//!
//! Every warning leaves the analysis sound; each one widens the set of
//! reported conflicts instead of shrinking it.

use std::cell::RefCell;
use std::fmt;

/// A non-fatal analysis warning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// The request of a non-blocking call could not be traced to a stack
    /// allocation; its scope is extended to every finalize call.
    UnresolvedScope { call: String },
    /// A non-blocking buffered, synchronous, or ready send is present; the
    /// analysis does not model its completion and reports nothing.
    UnsupportedVariant { name: String },
    /// A second non-blocking barrier was entered while one was pending.
    InterleavedBarriers,
    /// A pending trailing barrier already had a recorded wait set.
    ExtraTrailingBarrier,
    /// A call site can race with itself (it is re-issued in a loop).
    SelfConflict { call: String },
    /// Nothing is known about a callee; it is assumed to conflict.
    UnknownCallee { name: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedScope { call } => write!(
                f,
                "could not determine the scope of {call}; assuming it ends at finalize \
                 (false positives are more likely)"
            ),
            Self::UnsupportedVariant { name } => write!(
                f,
                "calls to `{name}` are not covered by this analysis; \
                 replace them with another send mode"
            ),
            Self::InterleavedBarriers => f.write_str(
                "interleaved non-blocking barriers; only the first one is tracked",
            ),
            Self::ExtraTrailingBarrier => f.write_str(
                "more pending non-blocking barriers than expected; the result is still \
                 correct but false positives are more likely",
            ),
            Self::SelfConflict { call } => write!(
                f,
                "{call} conflicts with itself, probably in a loop; \
                 safe only if the tag differs per iteration"
            ),
            Self::UnknownCallee { name } => write!(
                f,
                "cannot tell whether a call to `{name}` conflicts; assuming it does"
            ),
        }
    }
}

/// Receives analysis warnings.
pub trait DiagnosticSink {
    /// Reports one warning.
    fn report(&self, warning: Warning);
}

/// Forwards warnings to the `log` facade at warn level.
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, warning: Warning) {
        log::warn!("{warning}");
    }
}

/// Collects warnings in memory; mostly useful in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    warnings: RefCell<Vec<Warning>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything reported so far.
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.borrow().clone()
    }

    /// Drains the collected warnings.
    pub fn take(&self) -> Vec<Warning> {
        self.warnings.take()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, warning: Warning) {
        self.warnings.borrow_mut().push(warning);
    }
}
