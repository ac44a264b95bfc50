//! Classification of non-library functions.
//!
//! The path explorer cannot look inside every callee; instead it consults
//! an oracle that says whether a function's body can transitively issue a
//! transfer (may conflict), is guaranteed to synchronize, or is a black
//! box. The oracle is read-only during exploration, with one deliberate
//! exception documented on [`FunctionMetadata::is_unknown`].

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use msgrace_ir::{Function, Handle, Instruction, Module};

use crate::library::LibraryFunctionTable;

/// Verdicts about what a non-library function's body can do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The body transitively reaches a send or receive.
    MayConflict,
    /// The body transitively reaches a synchronization point.
    WillSync,
    /// Nothing is known about the body.
    Unknown,
}

/// Oracle answering what a non-library callee may do.
///
/// Implementations must be stable for the duration of one analysis, except
/// that once [`is_unknown`](Self::is_unknown) has returned `true` for a
/// function, the function counts as assumed-conflicting: later `is_unknown`
/// queries return `false` and `may_conflict` returns `true`. The explorer
/// verifies this transition and aborts if it does not happen.
pub trait FunctionMetadata {
    /// The function can transitively issue a transfer.
    fn may_conflict(&self, function: Handle<Function>) -> bool;
    /// The function transitively synchronizes.
    fn will_sync(&self, function: Handle<Function>) -> bool;
    /// Neither of the above could be decided.
    fn is_unknown(&self, function: Handle<Function>) -> bool;
}

/// Metadata computed from the module's own call graph.
///
/// Defined functions are classified transitively; external non-library
/// declarations are unknown. Functions that provably do none of the above
/// get no verdict at all, and the explorer walks straight past calls to
/// them.
#[derive(Debug)]
pub struct ModuleMetadata {
    verdicts: HashMap<Handle<Function>, Verdict>,
    names: HashMap<Handle<Function>, String>,
    assumed: RefCell<HashSet<Handle<Function>>>,
}

impl ModuleMetadata {
    /// Classifies every non-library function in the module.
    pub fn compute(module: &Module, table: &LibraryFunctionTable) -> Self {
        let mut verdicts = HashMap::new();
        let mut names = HashMap::new();
        let mut visiting = HashSet::new();
        for (handle, func) in module.functions.iter() {
            if LibraryFunctionTable::is_library_name(&func.name) {
                continue;
            }
            names.insert(handle, func.name.clone());
            classify(module, table, handle, &mut verdicts, &mut visiting);
        }
        Self {
            verdicts,
            names,
            assumed: RefCell::new(HashSet::new()),
        }
    }

    /// The current verdict for a function, if it has one.
    pub fn verdict(&self, function: Handle<Function>) -> Option<Verdict> {
        if self.assumed.borrow().contains(&function) {
            return Some(Verdict::MayConflict);
        }
        self.verdicts.get(&function).copied()
    }

    /// The name of a classified function, for diagnostics.
    pub fn name_of(&self, function: Handle<Function>) -> Option<&str> {
        self.names.get(&function).map(String::as_str)
    }
}

/// One step of the transitive classification.
///
/// Returns the verdict (or `None` for functions with no messaging
/// behavior); `visiting` cuts recursion cycles, which contribute nothing to
/// their own classification.
fn classify(
    module: &Module,
    table: &LibraryFunctionTable,
    function: Handle<Function>,
    verdicts: &mut HashMap<Handle<Function>, Verdict>,
    visiting: &mut HashSet<Handle<Function>>,
) -> Option<Verdict> {
    if let Some(v) = verdicts.get(&function) {
        return Some(*v);
    }
    if !visiting.insert(function) {
        return None;
    }

    let func = &module.functions[function];
    let verdict = if func.is_declaration() {
        Some(Verdict::Unknown)
    } else {
        let mut conflicts = false;
        let mut syncs = false;
        let mut unknown = false;
        for (_, block) in func.blocks.iter() {
            for inst in &block.instructions {
                let callee = match inst {
                    Instruction::Call { callee, .. } => *callee,
                    _ => continue,
                };
                if let Some(entry) = table.entry_of(callee) {
                    conflicts |= entry.is_conflicting();
                    syncs |= entry.is_sync();
                } else if LibraryFunctionTable::is_library_name(&module.functions[callee].name) {
                    // unrecognized library symbol: irrelevant
                } else {
                    match classify(module, table, callee, verdicts, visiting) {
                        Some(Verdict::MayConflict) => conflicts = true,
                        Some(Verdict::WillSync) => syncs = true,
                        Some(Verdict::Unknown) => unknown = true,
                        None => {}
                    }
                }
            }
        }
        if conflicts {
            Some(Verdict::MayConflict)
        } else if syncs {
            Some(Verdict::WillSync)
        } else if unknown {
            Some(Verdict::Unknown)
        } else {
            None
        }
    };

    visiting.remove(&function);
    if let Some(v) = verdict {
        verdicts.insert(function, v);
    }
    verdict
}

impl FunctionMetadata for ModuleMetadata {
    fn may_conflict(&self, function: Handle<Function>) -> bool {
        self.assumed.borrow().contains(&function)
            || matches!(self.verdicts.get(&function), Some(Verdict::MayConflict))
    }

    fn will_sync(&self, function: Handle<Function>) -> bool {
        matches!(self.verdicts.get(&function), Some(Verdict::WillSync))
    }

    fn is_unknown(&self, function: Handle<Function>) -> bool {
        if !matches!(self.verdicts.get(&function), Some(Verdict::Unknown)) {
            return false;
        }
        // the first query consumes the unknown verdict; from here on the
        // function counts as assumed-conflicting
        self.assumed.borrow_mut().insert(function)
    }
}
