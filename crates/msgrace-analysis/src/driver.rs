//! The conflict driver: which calls originate an exploration, and with
//! what polarity and scope.

use msgrace_ir::Module;

use crate::args::Polarity;
use crate::diag::{DiagnosticSink, Warning};
use crate::error::AnalysisError;
use crate::explore;
use crate::library::{LibraryFunc, LibraryFunctionTable};
use crate::metadata::FunctionMetadata;
use crate::scope;
use crate::ConflictPair;

/// Everything the analysis needs, injected by the host pass.
pub struct AnalysisContext<'a> {
    /// The module under analysis; read-only throughout.
    pub module: &'a Module,
    /// The resolved library entry points.
    pub library: &'a LibraryFunctionTable,
    /// The non-library function oracle.
    pub metadata: &'a dyn FunctionMetadata,
    /// Where warnings go.
    pub sink: &'a dyn DiagnosticSink,
}

/// Runs the message-race analysis over the whole module.
///
/// The result lists every pair the analysis could not prove disjoint; an
/// empty list means the module is safe to run with relaxed message
/// ordering, under the analyzer's assumptions. Pairs may repeat when two
/// explorations discover each other's origins. False positives are
/// expected; a missed race is a bug.
pub fn detect_message_races(
    ctx: &AnalysisContext<'_>,
) -> Result<Vec<ConflictPair>, AnalysisError> {
    // The non-blocking buffered/synchronous/ready sends have no modeled
    // completion semantics; give up loudly rather than report an unsound
    // "no conflicts".
    for entry in [
        LibraryFunc::Ibsend,
        LibraryFunc::Issend,
        LibraryFunc::Irsend,
    ] {
        if let Some(f) = ctx.library.resolve(entry) {
            if !ctx.module.call_sites_of(f).is_empty() {
                ctx.sink.report(Warning::UnsupportedVariant {
                    name: entry.symbol().to_owned(),
                });
                return Ok(Vec::new());
            }
        }
    }

    // A returned synchronous or ready send implies its receiver has already
    // matched, so nothing issued later can overtake it; a race against an
    // earlier send surfaces when that send is analyzed. Neither originates
    // an exploration.
    let mut result = Vec::new();
    result.extend(check_origins(ctx, LibraryFunc::Send, Polarity::Send)?);
    result.extend(check_origins(ctx, LibraryFunc::Bsend, Polarity::Send)?);
    result.extend(check_origins(ctx, LibraryFunc::Isend, Polarity::Send)?);
    result.extend(check_origins(ctx, LibraryFunc::Sendrecv, Polarity::Send)?);
    result.extend(check_origins(ctx, LibraryFunc::Recv, Polarity::Recv)?);
    result.extend(check_origins(ctx, LibraryFunc::Irecv, Polarity::Recv)?);
    result.extend(check_origins(ctx, LibraryFunc::Sendrecv, Polarity::Recv)?);
    Ok(result)
}

/// Explores every call site of one originating entry point.
fn check_origins(
    ctx: &AnalysisContext<'_>,
    entry: LibraryFunc,
    polarity: Polarity,
) -> Result<Vec<ConflictPair>, AnalysisError> {
    let function = match ctx.library.resolve(entry) {
        Some(function) => function,
        // entry absent from the module: no messages, no conflicts
        None => return Ok(Vec::new()),
    };
    let mut result = Vec::new();
    for call in ctx.module.call_sites_of(function) {
        let endings = scope::scope_endings(ctx.module, ctx.library, ctx.sink, call)?;
        result.extend(explore::check_call_for_conflict(
            ctx, call, &endings, polarity,
        )?);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::MemorySink;
    use crate::metadata::ModuleMetadata;
    use msgrace_ir::{
        BasicBlock, ConstPayload, Function, Handle, InstRef, Instruction, Type, Value,
    };

    struct Fixture {
        module: Module,
        f: Handle<Function>,
        bb: Handle<BasicBlock>,
    }

    fn fixture() -> Fixture {
        let mut module = Module::new();
        for entry in LibraryFunc::ALL {
            module.functions.append(Function::new(entry.symbol()));
        }
        let f = module.functions.append(Function::new("main"));
        let bb = module.functions[f].blocks.append(BasicBlock::new("entry"));
        Fixture { module, f, bb }
    }

    fn envelope(fx: &mut Fixture, peer: i32, tag: i32) -> Vec<Value> {
        let undef = fx.module.constant(Type::Ptr, ConstPayload::Undef);
        let count = fx.module.const_i32(1);
        let dtype = fx.module.const_i32(0);
        let peer = fx.module.const_i32(peer);
        let tag = fx.module.const_i32(tag);
        let world = fx
            .module
            .constant(Type::Comm, ConstPayload::Named("MPI_COMM_WORLD".into()));
        vec![undef, count, dtype, peer, tag, world]
    }

    fn lib_call(fx: &mut Fixture, entry: LibraryFunc, args: Vec<Value>) -> InstRef {
        let table = LibraryFunctionTable::scan(&fx.module);
        let callee = table.resolve(entry).unwrap();
        fx.module
            .push(fx.f, fx.bb, Instruction::Call { callee, args })
    }

    fn run(fx: &Fixture) -> (Vec<ConflictPair>, Vec<Warning>) {
        let table = LibraryFunctionTable::scan(&fx.module);
        let metadata = ModuleMetadata::compute(&fx.module, &table);
        let sink = MemorySink::new();
        let ctx = AnalysisContext {
            module: &fx.module,
            library: &table,
            metadata: &metadata,
            sink: &sink,
        };
        let conflicts = detect_message_races(&ctx).unwrap();
        (conflicts, sink.take())
    }

    #[test]
    fn module_without_library_calls_is_clean() {
        let mut fx = fixture();
        fx.module
            .push(fx.f, fx.bb, Instruction::Return { value: None });
        let (conflicts, warnings) = run(&fx);
        assert!(conflicts.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn synchronous_and_ready_sends_are_not_origins() {
        let mut fx = fixture();
        let args = envelope(&mut fx, 0, 123);
        lib_call(&mut fx, LibraryFunc::Ssend, args);
        let args = envelope(&mut fx, 0, 123);
        lib_call(&mut fx, LibraryFunc::Ssend, args);
        let args = envelope(&mut fx, 0, 123);
        lib_call(&mut fx, LibraryFunc::Rsend, args);
        fx.module
            .push(fx.f, fx.bb, Instruction::Return { value: None });
        let (conflicts, _) = run(&fx);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn unsupported_variant_bails_out_with_a_diagnostic() {
        let mut fx = fixture();
        let req = fx.module.push(
            fx.f,
            fx.bb,
            Instruction::Alloca {
                name: Some("req".into()),
                ty: Type::Ptr,
            },
        );
        let mut args = envelope(&mut fx, 0, 123);
        args.push(Value::Inst(req));
        lib_call(&mut fx, LibraryFunc::Ibsend, args);
        // a blatant race that would otherwise be reported
        let args = envelope(&mut fx, 0, 123);
        lib_call(&mut fx, LibraryFunc::Send, args);
        let args = envelope(&mut fx, 0, 123);
        lib_call(&mut fx, LibraryFunc::Send, args);
        fx.module
            .push(fx.f, fx.bb, Instruction::Return { value: None });

        let (conflicts, warnings) = run(&fx);
        assert!(conflicts.is_empty());
        assert!(matches!(
            warnings.as_slice(),
            [Warning::UnsupportedVariant { name }] if name == "MPI_Ibsend"
        ));
    }

    #[test]
    fn declared_but_uncalled_variant_does_not_bail() {
        // the Issend symbol exists in every fixture; with no call sites the
        // analysis must still run
        let mut fx = fixture();
        let args = envelope(&mut fx, 0, 123);
        lib_call(&mut fx, LibraryFunc::Send, args);
        let args = envelope(&mut fx, 0, 123);
        lib_call(&mut fx, LibraryFunc::Send, args);
        fx.module
            .push(fx.f, fx.bb, Instruction::Return { value: None });
        let (conflicts, _) = run(&fx);
        assert_eq!(conflicts.len(), 1);
    }

    #[test]
    fn sendrecv_runs_once_per_polarity() {
        let mut fx = fixture();
        let undef = fx.module.constant(Type::Ptr, ConstPayload::Undef);
        let count = fx.module.const_i32(1);
        let dtype = fx.module.const_i32(0);
        let dest = fx.module.const_i32(1);
        let stag = fx.module.const_i32(10);
        let src = fx.module.const_i32(2);
        let rtag = fx.module.const_i32(20);
        let world = fx
            .module
            .constant(Type::Comm, ConstPayload::Named("MPI_COMM_WORLD".into()));
        let status = fx
            .module
            .constant(Type::Ptr, ConstPayload::Named("MPI_STATUS_IGNORE".into()));
        let sr = lib_call(
            &mut fx,
            LibraryFunc::Sendrecv,
            vec![
                undef, count, dtype, dest, stag, undef, count, dtype, src, rtag, world, status,
            ],
        );
        // races with the send half (dest 1, tag 10)
        let args = envelope(&mut fx, 1, 10);
        let racing_send = lib_call(&mut fx, LibraryFunc::Send, args);
        // races with the receive half (src 2, tag 20)
        let undef2 = fx.module.constant(Type::Ptr, ConstPayload::Undef);
        let count2 = fx.module.const_i32(1);
        let dtype2 = fx.module.const_i32(0);
        let src2 = fx.module.const_i32(2);
        let rtag2 = fx.module.const_i32(20);
        let racing_recv = lib_call(
            &mut fx,
            LibraryFunc::Recv,
            vec![undef2, count2, dtype2, src2, rtag2, world, status],
        );
        fx.module
            .push(fx.f, fx.bb, Instruction::Return { value: None });

        let (conflicts, _) = run(&fx);
        assert!(conflicts
            .iter()
            .any(|c| c.origin == sr && c.counterpart == racing_send));
        assert!(conflicts
            .iter()
            .any(|c| c.origin == sr && c.counterpart == racing_recv));
        // the send half must not be paired with the racing receive
        assert!(!conflicts
            .iter()
            .any(|c| c.origin == racing_send && c.counterpart == racing_recv));
    }

    #[test]
    fn results_accumulate_across_origin_kinds() {
        let mut fx = fixture();
        let req = fx.module.push(
            fx.f,
            fx.bb,
            Instruction::Alloca {
                name: Some("req".into()),
                ty: Type::Ptr,
            },
        );
        let mut args = envelope(&mut fx, 0, 123);
        args.push(Value::Inst(req));
        let first = lib_call(&mut fx, LibraryFunc::Isend, args);
        let args = envelope(&mut fx, 0, 123);
        let second = lib_call(&mut fx, LibraryFunc::Send, args);
        let status = fx
            .module
            .constant(Type::Ptr, ConstPayload::Named("MPI_STATUS_IGNORE".into()));
        lib_call(&mut fx, LibraryFunc::Wait, vec![Value::Inst(req), status]);
        fx.module
            .push(fx.f, fx.bb, Instruction::Return { value: None });

        let (conflicts, _) = run(&fx);
        // the isend sees the blocking send downstream; the blocking send
        // sees nothing after itself but the wait
        assert!(conflicts
            .iter()
            .any(|c| c.origin == first && c.counterpart == second));
    }
}
