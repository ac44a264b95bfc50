//! The per-origin forward path exploration.
//!
//! Starting right after one originating transfer call, every feasible
//! continuation is walked until a synchronization point closes the race
//! window, and every transfer encountered on the way is a potential race
//! partner. A path only ends at a synchronization point once the origin's
//! asynchronous scope has closed; before that, even a barrier cannot stop
//! the origin's message from being overtaken.

use std::collections::{BTreeSet, HashSet};

use msgrace_ir::{BasicBlock, Function, Handle, InstRef, Instruction};

use crate::args::{self, Polarity};
use crate::classify::{classify_callee, CallClass};
use crate::diag::Warning;
use crate::disjoint;
use crate::driver::AnalysisContext;
use crate::error::AnalysisError;
use crate::library::LibraryFunc;
use crate::scope;
use crate::ConflictPair;

/// One worklist frontier: the next instruction to visit plus the state
/// accumulated on the way there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Frontier {
    next: InstRef,
    scope_ended: bool,
    in_trailing_barrier: bool,
}

/// Explores every feasible continuation of `origin` and returns the pairs
/// it could race with.
///
/// `scope_endings` are the call sites that close the origin's asynchronous
/// scope (see [`crate::scope`]); an empty set means the scope is already
/// closed when the call returns. The worklist is keyed on
/// `(instruction, scope_ended, in_trailing_barrier)` but the visited set
/// is keyed on the basic block alone: blocks are marked when queued, so
/// each block is entered at most once per origin and loops terminate. The
/// block holding the origin itself stays unmarked, so a loop back into it
/// is re-entered and a self-race is seen.
pub fn check_call_for_conflict(
    ctx: &AnalysisContext<'_>,
    origin: InstRef,
    scope_endings: &[InstRef],
    polarity: Polarity,
) -> Result<Vec<ConflictPair>, AnalysisError> {
    let module = ctx.module;
    let origin_comm = args::communicator(module, ctx.library, origin)?;

    let mut conflicts: Vec<ConflictPair> = Vec::new();
    let mut potential: BTreeSet<InstRef> = BTreeSet::new();
    let mut worklist: BTreeSet<Frontier> = BTreeSet::new();
    let mut entered: HashSet<(Handle<Function>, Handle<BasicBlock>)> = HashSet::new();

    // only the first pending non-blocking barrier is tracked; its wait set
    // is shared by every path that crosses it
    let mut trailing_scope_end: Vec<InstRef> = Vec::new();

    if let Some(seed) = module.next_in_block(origin) {
        worklist.insert(Frontier {
            next: seed,
            scope_ended: scope_endings.is_empty(),
            in_trailing_barrier: false,
        });
    }

    while let Some(frontier) = worklist.pop_first() {
        let mut scope_ended = frontier.scope_ended;
        let mut in_trailing_barrier = frontier.in_trailing_barrier;
        let mut cursor = Some(frontier.next);

        while let Some(at) = cursor {
            let mut stop = false;

            if let Instruction::Call { callee, .. } = module.inst(at) {
                let callee = *callee;
                match classify_callee(module, ctx.library, callee) {
                    CallClass::Sync if scope_ended => {
                        match ctx
                            .library
                            .entry_of(callee)
                            .expect("sync class implies a table entry")
                        {
                            LibraryFunc::Ibarrier | LibraryFunc::Iallreduce => {
                                if in_trailing_barrier {
                                    ctx.sink.report(Warning::InterleavedBarriers);
                                } else if args::communicator(module, ctx.library, at)?
                                    == origin_comm
                                {
                                    if !trailing_scope_end.is_empty() {
                                        ctx.sink.report(Warning::ExtraTrailingBarrier);
                                    } else {
                                        in_trailing_barrier = true;
                                        trailing_scope_end = scope::corresponding_waits(
                                            module,
                                            ctx.library,
                                            ctx.sink,
                                            at,
                                        )?;
                                    }
                                }
                                // an unprovable communicator match: the
                                // barrier is ignored for this origin
                            }
                            LibraryFunc::Barrier | LibraryFunc::Allreduce => {
                                if args::communicator(module, ctx.library, at)? == origin_comm {
                                    stop = true;
                                }
                            }
                            LibraryFunc::Finalize => stop = true,
                            other => unreachable!("{other} is not a synchronizing entry"),
                        }
                    }
                    // a sync point reached while the scope is still open
                    // cannot stop the origin from being overtaken
                    CallClass::Sync => {}
                    CallClass::Conflicting => {
                        potential.insert(at);
                    }
                    CallClass::ScopeEnder | CallClass::OtherLibrary => {
                        if in_trailing_barrier && trailing_scope_end.contains(&at) {
                            debug_assert!(scope_ended);
                            // the trailing barrier has completed
                            stop = true;
                        }
                        if !scope_ended && scope_endings.contains(&at) {
                            scope_ended = true;
                        }
                    }
                    CallClass::NonLibrary => {
                        if ctx.metadata.may_conflict(callee) {
                            conflicts.push(ConflictPair {
                                origin,
                                counterpart: at,
                            });
                        } else if ctx.metadata.will_sync(callee) {
                            stop = true;
                        } else if ctx.metadata.is_unknown(callee) {
                            ctx.sink.report(Warning::UnknownCallee {
                                name: module.functions[callee].name.clone(),
                            });
                            conflicts.push(ConflictPair {
                                origin,
                                counterpart: at,
                            });
                        }
                        // the unknown verdict must have been consumed above
                        if ctx.metadata.is_unknown(callee) {
                            return Err(AnalysisError::AssumptionViolated {
                                name: module.functions[callee].name.clone(),
                            });
                        }
                    }
                }
            }

            if stop {
                break;
            }

            let inst = module.inst(at);
            if inst.is_terminator() {
                for &succ in inst.successors() {
                    if entered.insert((at.function, succ)) {
                        if let Some(first) = module.first_non_phi(at.function, succ) {
                            worklist.insert(Frontier {
                                next: first,
                                scope_ended,
                                in_trailing_barrier,
                            });
                        }
                    }
                }
                if matches!(inst, Instruction::Return { .. }) {
                    // the exploration continues behind every caller of the
                    // returning function
                    for site in module.call_sites_of(at.function) {
                        if let Some(after) = module.next_in_block(site) {
                            if entered.insert((after.function, after.block)) {
                                worklist.insert(Frontier {
                                    next: after,
                                    scope_ended,
                                    in_trailing_barrier,
                                });
                            }
                        }
                    }
                }
            }
            cursor = module.next_in_block(at);
        }
    }

    // the potential set becomes real conflicts only where disjointness
    // cannot be proven
    for candidate in potential {
        if disjoint::are_calls_conflicting(
            module,
            ctx.library,
            ctx.sink,
            origin,
            candidate,
            polarity,
        )? {
            conflicts.push(ConflictPair {
                origin,
                counterpart: candidate,
            });
        }
    }
    Ok(conflicts)
}
