//! Call classification: how a callee relates to message ordering.

use std::fmt;

use msgrace_ir::{Function, Handle, Module};

use crate::library::LibraryFunctionTable;

/// The role of one callee in the message-race analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallClass {
    /// A synchronization point (barrier-like, or finalize).
    Sync,
    /// A send or receive that can participate in a race.
    Conflicting,
    /// A call that can close an outstanding asynchronous scope.
    ScopeEnder,
    /// A library call with no bearing on message ordering. Unrecognized
    /// library symbols land here too: not a sync, not a conflict.
    OtherLibrary,
    /// Not part of the messaging library.
    NonLibrary,
}

impl fmt::Display for CallClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sync => "Sync",
            Self::Conflicting => "Conflicting",
            Self::ScopeEnder => "ScopeEnder",
            Self::OtherLibrary => "OtherLibrary",
            Self::NonLibrary => "NonLibrary",
        })
    }
}

/// Classifies the callee of a call site.
pub fn classify_callee(
    module: &Module,
    table: &LibraryFunctionTable,
    callee: Handle<Function>,
) -> CallClass {
    if let Some(entry) = table.entry_of(callee) {
        if entry.is_sync() {
            CallClass::Sync
        } else if entry.is_conflicting() {
            CallClass::Conflicting
        } else if entry.is_scope_ender() {
            CallClass::ScopeEnder
        } else {
            CallClass::OtherLibrary
        }
    } else if LibraryFunctionTable::is_library_name(&module.functions[callee].name) {
        CallClass::OtherLibrary
    } else {
        CallClass::NonLibrary
    }
}
