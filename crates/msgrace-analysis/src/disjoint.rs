//! The three-field disjointness proof between two transfer calls.
//!
//! Two transfers can only race when the runtime could match them against
//! the same (communicator, peer, tag) envelope. Proving any one field
//! different rules the race out; everything unprovable is conservatively a
//! conflict.

use msgrace_ir::{format_inst_ref, Function, Handle, InstRef, Instruction, Module, Value};

use crate::args::{self, Polarity};
use crate::diag::{DiagnosticSink, Warning};
use crate::error::AnalysisError;
use crate::library::LibraryFunctionTable;

/// Decides whether `origin` (analyzed as `polarity`) and `other` can match
/// the same message envelope.
///
/// Returns `false` when the calls are a complementary send/receive pair or
/// are provably disjoint on communicator, peer rank, or tag.
pub fn are_calls_conflicting(
    module: &Module,
    table: &LibraryFunctionTable,
    sink: &dyn DiagnosticSink,
    origin: InstRef,
    other: InstRef,
    polarity: Polarity,
) -> Result<bool, AnalysisError> {
    // A send and a receive are the two halves of one transfer, not rivals.
    // A combined send-receive counterpart is compared on the half matching
    // the origin's polarity.
    let other_polarity = transfer_polarity(module, table, other).unwrap_or(polarity);
    if other_polarity != polarity {
        return Ok(false);
    }

    if origin == other {
        sink.report(Warning::SelfConflict {
            call: format_inst_ref(module, origin),
        });
        return Ok(true);
    }

    let comm_a = args::communicator(module, table, origin)?;
    let comm_b = args::communicator(module, table, other)?;
    if provably_different(module, comm_a, comm_b) {
        return Ok(false);
    }

    let peer_a = args::peer(module, table, origin, polarity)?;
    let peer_b = args::peer(module, table, other, polarity)?;
    if provably_different(module, peer_a, peer_b) {
        return Ok(false);
    }

    let tag_a = args::tag(module, table, origin, polarity)?;
    let tag_b = args::tag(module, table, other, polarity)?;
    if provably_different(module, tag_a, tag_b) {
        return Ok(false);
    }

    // cannot disprove the conflict; assume the program relies on ordering
    Ok(true)
}

/// The fixed polarity of a transfer call's callee, or `None` for the
/// combined send-receive.
fn transfer_polarity(
    module: &Module,
    table: &LibraryFunctionTable,
    call: InstRef,
) -> Option<Polarity> {
    let callee = callee_of(module, call);
    if table.is_send_function(callee) {
        Some(Polarity::Send)
    } else if table.is_recv_function(callee) {
        Some(Polarity::Recv)
    } else {
        None
    }
}

fn callee_of(module: &Module, call: InstRef) -> Handle<Function> {
    match module.inst(call) {
        Instruction::Call { callee, .. } => *callee,
        _ => panic!("disjointness proof on a non-call instruction"),
    }
}

/// `true` when both values are constants known to be unequal.
///
/// Interned constants make this an identity test: equal constant payloads
/// always share one handle. Anything non-constant could be equal at run
/// time and proves nothing.
pub fn provably_different(module: &Module, a: Value, b: Value) -> bool {
    assert!(
        module.value_type(a) == module.value_type(b),
        "comparing values of different types"
    );
    match (a, b) {
        (Value::Constant(ca), Value::Constant(cb)) => ca != cb,
        _ => false,
    }
}
