//! Human-readable dumps of IR modules.

use std::fmt::Write;

use crate::inst::{InstRef, Instruction};
use crate::value::{ConstPayload, Value};
use crate::Module;

/// Formats one instruction reference as `function:block:index (mnemonic)`.
///
/// Used by diagnostics to point at call sites.
pub fn format_inst_ref(module: &Module, r: InstRef) -> String {
    let func = &module.functions[r.function];
    let block = &func.blocks[r.block];
    let label = block
        .name
        .clone()
        .unwrap_or_else(|| format!("bb{}", r.block.index()));
    format!(
        "{}:{}:{} ({})",
        func.name,
        label,
        r.index,
        mnemonic(module, module.inst(r))
    )
}

fn mnemonic(module: &Module, inst: &Instruction) -> String {
    match inst {
        Instruction::Alloca { name, .. } => match name {
            Some(n) => format!("alloca {n}"),
            None => "alloca".into(),
        },
        Instruction::Load { .. } => "load".into(),
        Instruction::Store { .. } => "store".into(),
        Instruction::Phi { .. } => "phi".into(),
        Instruction::Call { callee, .. } => format!("call {}", module.functions[*callee].name),
        Instruction::PtrOffset { .. } => "ptroffset".into(),
        Instruction::Branch { .. } => "br".into(),
        Instruction::Return { .. } => "ret".into(),
        Instruction::Unreachable => "unreachable".into(),
    }
}

fn format_value(module: &Module, value: Value) -> String {
    match value {
        Value::Constant(h) => match &module.constants[h].payload {
            ConstPayload::Int(v) => v.to_string(),
            ConstPayload::Named(n) => n.clone(),
            ConstPayload::Undef => "undef".into(),
        },
        Value::Inst(r) => format!("%{}.{}.{}", r.function.index(), r.block.index(), r.index),
        Value::Argument { index, .. } => format!("%arg{index}"),
    }
}

/// Renders the whole module as text, one instruction per line.
pub fn dump_module(module: &Module) -> String {
    let mut out = String::new();
    for (_, func) in module.functions.iter() {
        if func.is_declaration() {
            let _ = writeln!(out, "declare {}", func.name);
            continue;
        }
        let _ = writeln!(out, "define {} {{", func.name);
        for (bh, block) in func.blocks.iter() {
            let label = block
                .name
                .clone()
                .unwrap_or_else(|| format!("bb{}", bh.index()));
            let _ = writeln!(out, "{label}:");
            for (i, inst) in block.instructions.iter().enumerate() {
                let operands = inst
                    .operands()
                    .into_iter()
                    .map(|v| format_value(module, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = match inst {
                    Instruction::Branch { targets } => {
                        let labels = targets
                            .iter()
                            .map(|t| {
                                func.blocks[*t]
                                    .name
                                    .clone()
                                    .unwrap_or_else(|| format!("bb{}", t.index()))
                            })
                            .collect::<Vec<_>>()
                            .join(", ");
                        writeln!(out, "  #{i} br {labels}")
                    }
                    _ => writeln!(out, "  #{i} {} {operands}", mnemonic(module, inst)),
                };
            }
        }
        let _ = writeln!(out, "}}");
    }
    out
}
