//! The messaging-library function table.
//!
//! Maps the library entry points the analysis knows about to the concrete
//! [`Function`]s of one module. Built once per module, immutable afterwards.

use std::collections::HashMap;
use std::fmt;

use msgrace_ir::{Function, Handle, Module};

/// The prefix shared by every entry point of the messaging library.
pub const LIBRARY_PREFIX: &str = "MPI_";

/// The library entry points the analyzer knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LibraryFunc {
    /// Blocking standard-mode send.
    Send,
    /// Blocking buffered send.
    Bsend,
    /// Blocking synchronous send.
    Ssend,
    /// Blocking ready send.
    Rsend,
    /// Non-blocking standard-mode send.
    Isend,
    /// Non-blocking buffered send.
    Ibsend,
    /// Non-blocking synchronous send.
    Issend,
    /// Non-blocking ready send.
    Irsend,
    /// Blocking receive.
    Recv,
    /// Non-blocking receive.
    Irecv,
    /// Combined send and receive.
    Sendrecv,
    /// Blocking barrier.
    Barrier,
    /// Non-blocking barrier.
    Ibarrier,
    /// Blocking all-reduce.
    Allreduce,
    /// Non-blocking all-reduce.
    Iallreduce,
    /// Completion of one outstanding request.
    Wait,
    /// Detach of the buffered-send buffer.
    BufferDetach,
    /// Library initialization.
    Init,
    /// Library teardown; no messaging happens beyond it.
    Finalize,
}

impl LibraryFunc {
    /// Every entry, in declaration order.
    pub const ALL: [LibraryFunc; 19] = [
        Self::Send,
        Self::Bsend,
        Self::Ssend,
        Self::Rsend,
        Self::Isend,
        Self::Ibsend,
        Self::Issend,
        Self::Irsend,
        Self::Recv,
        Self::Irecv,
        Self::Sendrecv,
        Self::Barrier,
        Self::Ibarrier,
        Self::Allreduce,
        Self::Iallreduce,
        Self::Wait,
        Self::BufferDetach,
        Self::Init,
        Self::Finalize,
    ];

    /// The linker symbol of this entry point.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Send => "MPI_Send",
            Self::Bsend => "MPI_Bsend",
            Self::Ssend => "MPI_Ssend",
            Self::Rsend => "MPI_Rsend",
            Self::Isend => "MPI_Isend",
            Self::Ibsend => "MPI_Ibsend",
            Self::Issend => "MPI_Issend",
            Self::Irsend => "MPI_Irsend",
            Self::Recv => "MPI_Recv",
            Self::Irecv => "MPI_Irecv",
            Self::Sendrecv => "MPI_Sendrecv",
            Self::Barrier => "MPI_Barrier",
            Self::Ibarrier => "MPI_Ibarrier",
            Self::Allreduce => "MPI_Allreduce",
            Self::Iallreduce => "MPI_Iallreduce",
            Self::Wait => "MPI_Wait",
            Self::BufferDetach => "MPI_Buffer_detach",
            Self::Init => "MPI_Init",
            Self::Finalize => "MPI_Finalize",
        }
    }

    /// Sends and receives — the calls that can participate in a race.
    pub fn is_conflicting(self) -> bool {
        matches!(
            self,
            Self::Send
                | Self::Bsend
                | Self::Ssend
                | Self::Rsend
                | Self::Isend
                | Self::Ibsend
                | Self::Issend
                | Self::Irsend
                | Self::Recv
                | Self::Irecv
                | Self::Sendrecv
        )
    }

    /// Calls whose completion orders messages across ranks.
    pub fn is_sync(self) -> bool {
        matches!(
            self,
            Self::Barrier | Self::Ibarrier | Self::Allreduce | Self::Iallreduce | Self::Finalize
        )
    }

    /// Calls that can close the scope of an outstanding operation.
    pub fn is_scope_ender(self) -> bool {
        matches!(self, Self::Wait | Self::BufferDetach)
    }

    /// `true` for pure send variants. The combined send-receive is neither
    /// a pure send nor a pure receive; its polarity is chosen per analysis
    /// run.
    pub fn is_send(self) -> bool {
        matches!(
            self,
            Self::Send
                | Self::Bsend
                | Self::Ssend
                | Self::Rsend
                | Self::Isend
                | Self::Ibsend
                | Self::Issend
                | Self::Irsend
        )
    }

    /// `true` for pure receive variants (see [`LibraryFunc::is_send`]).
    pub fn is_recv(self) -> bool {
        matches!(self, Self::Recv | Self::Irecv)
    }
}

impl fmt::Display for LibraryFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Resolved library entry points for one module.
#[derive(Debug, Default)]
pub struct LibraryFunctionTable {
    by_entry: HashMap<LibraryFunc, Handle<Function>>,
    by_handle: HashMap<Handle<Function>, LibraryFunc>,
}

impl LibraryFunctionTable {
    /// Creates an empty table; all entries unresolved.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds one entry to a concrete function.
    ///
    /// # Panics
    ///
    /// Panics if the entry is already bound; each entry appears once.
    pub fn bind(&mut self, entry: LibraryFunc, function: Handle<Function>) {
        let previous = self.by_entry.insert(entry, function);
        assert!(previous.is_none(), "{entry} bound twice");
        self.by_handle.insert(function, entry);
    }

    /// Builds the table by matching function names against the library
    /// symbols.
    pub fn scan(module: &Module) -> Self {
        let mut table = Self::new();
        for (handle, func) in module.functions.iter() {
            for entry in LibraryFunc::ALL {
                if func.name == entry.symbol() {
                    table.bind(entry, handle);
                    break;
                }
            }
        }
        table
    }

    /// The function bound to `entry`, or `None` if the module never
    /// references it.
    pub fn resolve(&self, entry: LibraryFunc) -> Option<Handle<Function>> {
        self.by_entry.get(&entry).copied()
    }

    /// The entry a function is bound to, if any.
    pub fn entry_of(&self, function: Handle<Function>) -> Option<LibraryFunc> {
        self.by_handle.get(&function).copied()
    }

    /// Returns `true` if at least one entry resolved — i.e. the module
    /// uses the library at all.
    pub fn is_used(&self) -> bool {
        !self.by_entry.is_empty()
    }

    /// Returns `true` if a symbol name belongs to the library.
    pub fn is_library_name(name: &str) -> bool {
        name.contains(LIBRARY_PREFIX)
    }

    /// `true` if `function` is a pure send variant.
    pub fn is_send_function(&self, function: Handle<Function>) -> bool {
        self.entry_of(function).is_some_and(LibraryFunc::is_send)
    }

    /// `true` if `function` is a pure receive variant.
    pub fn is_recv_function(&self, function: Handle<Function>) -> bool {
        self.entry_of(function).is_some_and(LibraryFunc::is_recv)
    }
}
