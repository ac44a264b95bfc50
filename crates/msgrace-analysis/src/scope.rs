//! Scope resolution: which calls close an outstanding asynchronous
//! operation.
//!
//! A non-blocking call opens a scope that lasts until its matching wait;
//! a buffered send's scope lasts until the send buffer is detached. While
//! the scope is open, later transfers can still overtake the originating
//! one, so synchronization points must not end the exploration.

use msgrace_ir::{format_inst_ref, InstRef, Instruction, Module, Value};

use crate::args;
use crate::diag::{DiagnosticSink, Warning};
use crate::error::AnalysisError;
use crate::library::{LibraryFunc, LibraryFunctionTable};

/// Call sites that end the asynchronous scope opened by `call`.
///
/// Blocking sends and receives have no scope; for them the result is empty
/// and the operation is complete the moment the call returns.
pub fn scope_endings(
    module: &Module,
    table: &LibraryFunctionTable,
    sink: &dyn DiagnosticSink,
    call: InstRef,
) -> Result<Vec<InstRef>, AnalysisError> {
    let callee = match module.inst(call) {
        Instruction::Call { callee, .. } => *callee,
        _ => panic!("scope resolution on a non-call instruction"),
    };
    match table.entry_of(callee) {
        Some(
            LibraryFunc::Isend
            | LibraryFunc::Irecv
            | LibraryFunc::Iallreduce
            | LibraryFunc::Ibarrier
            | LibraryFunc::Issend,
        ) => corresponding_waits(module, table, sink, call),
        Some(LibraryFunc::Bsend | LibraryFunc::Ibsend) => {
            match table.resolve(LibraryFunc::BufferDetach) {
                Some(detach) => Ok(module.call_sites_of(detach)),
                None => {
                    // a buffered send with no detach anywhere: fall back to
                    // the end of the library's lifetime
                    sink.report(Warning::UnresolvedScope {
                        call: format_inst_ref(module, call),
                    });
                    Ok(finalize_sites(module, table))
                }
            }
        }
        _ => Ok(Vec::new()),
    }
}

/// Wait calls whose request operand is the same stack slot as `call`'s.
///
/// When the request cannot be traced to a direct stack allocation (pointer
/// arithmetic, an array of requests), the scope is conservatively extended
/// to every finalize call site.
pub fn corresponding_waits(
    module: &Module,
    table: &LibraryFunctionTable,
    sink: &dyn DiagnosticSink,
    call: InstRef,
) -> Result<Vec<InstRef>, AnalysisError> {
    let request = args::request(module, table, call)?;
    let is_direct_alloca = matches!(
        request,
        Value::Inst(r) if matches!(module.inst(r), Instruction::Alloca { .. })
    );
    if !is_direct_alloca {
        sink.report(Warning::UnresolvedScope {
            call: format_inst_ref(module, call),
        });
        return Ok(finalize_sites(module, table));
    }

    let wait = match table.resolve(LibraryFunc::Wait) {
        Some(wait) => wait,
        None => return Ok(Vec::new()),
    };
    let mut result = Vec::new();
    for user in module.users_of(request) {
        if let Instruction::Call { callee, args } = module.inst(user) {
            if *callee == wait {
                if args.len() != 2 {
                    return Err(AnalysisError::UnsupportedCall {
                        name: LibraryFunc::Wait.symbol().to_owned(),
                        arity: args.len(),
                    });
                }
                assert!(
                    args[0] == request,
                    "first operand of a wait is the request"
                );
                result.push(user);
            }
        }
    }
    Ok(result)
}

fn finalize_sites(module: &Module, table: &LibraryFunctionTable) -> Vec<InstRef> {
    match table.resolve(LibraryFunc::Finalize) {
        Some(finalize) => module.call_sites_of(finalize),
        None => Vec::new(),
    }
}
