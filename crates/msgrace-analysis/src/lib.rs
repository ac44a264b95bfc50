//! Static message-race detection for relaxed-order message matching.
//!
//! Some messaging runtimes can be told that matching messages may be
//! delivered out of the order they were issued. A program is safe under
//! that mode only if, for every pair of transfer calls that could match
//! the same (communicator, peer, tag) envelope, correctness does not
//! depend on program order. This crate analyzes a compiled module and
//! reports every pair it cannot prove safe.
//!
//! The analysis is conservative: false positives are expected and
//! harmless, a missed race is a bug. The host pass injects the module,
//! the resolved [`LibraryFunctionTable`], a [`FunctionMetadata`] oracle,
//! and a [`DiagnosticSink`] through an [`AnalysisContext`], then calls
//! [`detect_message_races`].

pub mod args;
pub mod classify;
pub mod diag;
pub mod disjoint;
pub mod driver;
mod error;
pub mod explore;
pub mod library;
pub mod metadata;
pub mod scope;

use msgrace_ir::InstRef;

pub use args::Polarity;
pub use classify::{classify_callee, CallClass};
pub use diag::{DiagnosticSink, LogSink, MemorySink, Warning};
pub use driver::{detect_message_races, AnalysisContext};
pub use error::AnalysisError;
pub use library::{LibraryFunc, LibraryFunctionTable, LIBRARY_PREFIX};
pub use metadata::{FunctionMetadata, ModuleMetadata, Verdict};

/// One reported race: the analyzed call and the call it can race with.
///
/// Pairs are not deduplicated across origins; the same race discovered
/// from both ends appears twice with origin and counterpart swapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConflictPair {
    /// The originating call whose continuations were explored.
    pub origin: InstRef,
    /// The call it can race with.
    pub counterpart: InstRef,
}
