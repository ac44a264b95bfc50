//! Operand extraction for library calls.
//!
//! The positions of the communicator, peer-rank, tag, and request operands
//! are fixed per entry point, derived from the library signatures. Every
//! extractor checks the call's full operand count first; a mismatch means
//! the IR is malformed relative to the table and aborts the analysis.

use std::fmt;

use msgrace_ir::{InstRef, Instruction, Module, Value};

use crate::error::AnalysisError;
use crate::library::{LibraryFunc, LibraryFunctionTable};

/// Which half of a transfer a call is being asked about.
///
/// Only the combined send-receive answers differently per polarity; for
/// every other entry the polarity must match the entry itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    Send,
    Recv,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Send => "send",
            Self::Recv => "receive",
        })
    }
}

/// Resolves a call site to its table entry and operand list.
fn library_call<'m>(
    module: &'m Module,
    table: &LibraryFunctionTable,
    call: InstRef,
) -> Result<(LibraryFunc, &'m [Value]), AnalysisError> {
    match module.inst(call) {
        Instruction::Call { callee, args } => match table.entry_of(*callee) {
            Some(entry) => Ok((entry, args)),
            None => Err(AnalysisError::UnsupportedCall {
                name: module.functions[*callee].name.clone(),
                arity: args.len(),
            }),
        },
        _ => panic!("operand extraction on a non-call instruction"),
    }
}

fn operand(
    entry: LibraryFunc,
    args: &[Value],
    arity: usize,
    position: usize,
) -> Result<Value, AnalysisError> {
    if args.len() != arity {
        return Err(AnalysisError::UnsupportedCall {
            name: entry.symbol().to_owned(),
            arity: args.len(),
        });
    }
    Ok(args[position])
}

/// The communicator operand of a classified library call.
pub fn communicator(
    module: &Module,
    table: &LibraryFunctionTable,
    call: InstRef,
) -> Result<Value, AnalysisError> {
    let (entry, args) = library_call(module, table, call)?;
    let (arity, position) = match entry {
        LibraryFunc::Send
        | LibraryFunc::Bsend
        | LibraryFunc::Ssend
        | LibraryFunc::Rsend
        | LibraryFunc::Allreduce => (6, 5),
        LibraryFunc::Isend
        | LibraryFunc::Ibsend
        | LibraryFunc::Issend
        | LibraryFunc::Irsend
        | LibraryFunc::Recv
        | LibraryFunc::Irecv
        | LibraryFunc::Iallreduce => (7, 5),
        LibraryFunc::Sendrecv => (12, 10),
        LibraryFunc::Barrier => (1, 0),
        LibraryFunc::Ibarrier => (2, 0),
        LibraryFunc::Wait | LibraryFunc::BufferDetach | LibraryFunc::Init
        | LibraryFunc::Finalize => {
            return Err(AnalysisError::UnsupportedCall {
                name: entry.symbol().to_owned(),
                arity: args.len(),
            })
        }
    };
    operand(entry, args, arity, position)
}

/// The peer-rank operand: the destination of a send, the source of a
/// receive.
pub fn peer(
    module: &Module,
    table: &LibraryFunctionTable,
    call: InstRef,
    polarity: Polarity,
) -> Result<Value, AnalysisError> {
    let (entry, args) = library_call(module, table, call)?;
    let (arity, position) = match entry {
        LibraryFunc::Send | LibraryFunc::Bsend | LibraryFunc::Ssend | LibraryFunc::Rsend => {
            assert!(polarity == Polarity::Send, "{entry} asked as a receive");
            (6, 3)
        }
        LibraryFunc::Isend | LibraryFunc::Ibsend | LibraryFunc::Issend | LibraryFunc::Irsend => {
            assert!(polarity == Polarity::Send, "{entry} asked as a receive");
            (7, 3)
        }
        LibraryFunc::Recv | LibraryFunc::Irecv => {
            assert!(polarity == Polarity::Recv, "{entry} asked as a send");
            (7, 3)
        }
        LibraryFunc::Sendrecv => match polarity {
            Polarity::Send => (12, 3),
            Polarity::Recv => (12, 8),
        },
        _ => {
            return Err(AnalysisError::UnsupportedCall {
                name: entry.symbol().to_owned(),
                arity: args.len(),
            })
        }
    };
    operand(entry, args, arity, position)
}

/// The message-tag operand.
pub fn tag(
    module: &Module,
    table: &LibraryFunctionTable,
    call: InstRef,
    polarity: Polarity,
) -> Result<Value, AnalysisError> {
    let (entry, args) = library_call(module, table, call)?;
    let (arity, position) = match entry {
        LibraryFunc::Send | LibraryFunc::Bsend | LibraryFunc::Ssend | LibraryFunc::Rsend => {
            assert!(polarity == Polarity::Send, "{entry} asked as a receive");
            (6, 4)
        }
        LibraryFunc::Isend | LibraryFunc::Ibsend | LibraryFunc::Issend | LibraryFunc::Irsend => {
            assert!(polarity == Polarity::Send, "{entry} asked as a receive");
            (7, 4)
        }
        LibraryFunc::Recv | LibraryFunc::Irecv => {
            assert!(polarity == Polarity::Recv, "{entry} asked as a send");
            (7, 4)
        }
        LibraryFunc::Sendrecv => match polarity {
            Polarity::Send => (12, 4),
            Polarity::Recv => (12, 9),
        },
        _ => {
            return Err(AnalysisError::UnsupportedCall {
                name: entry.symbol().to_owned(),
                arity: args.len(),
            })
        }
    };
    operand(entry, args, arity, position)
}

/// The request operand of a non-blocking call: the last operand, except
/// for the non-blocking barrier where it is the second.
pub fn request(
    module: &Module,
    table: &LibraryFunctionTable,
    call: InstRef,
) -> Result<Value, AnalysisError> {
    let (entry, args) = library_call(module, table, call)?;
    let (arity, position) = match entry {
        LibraryFunc::Ibarrier => (2, 1),
        LibraryFunc::Isend
        | LibraryFunc::Ibsend
        | LibraryFunc::Issend
        | LibraryFunc::Irsend
        | LibraryFunc::Irecv
        | LibraryFunc::Iallreduce => (7, 6),
        _ => {
            return Err(AnalysisError::UnsupportedCall {
                name: entry.symbol().to_owned(),
                arity: args.len(),
            })
        }
    };
    operand(entry, args, arity, position)
}
