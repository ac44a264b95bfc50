//! Structural validation of IR modules.
//!
//! Checks the invariants the analyses rely on: blocks end in exactly one
//! terminator, PHI nodes lead their block, and handles stay in bounds.
//! Validation never modifies the module.

use crate::error::IrError;
use crate::inst::Instruction;
use crate::value::Value;
use crate::Module;

/// Validates every defined function in the module.
///
/// Returns the first defect found.
pub fn validate_module(module: &Module) -> Result<(), IrError> {
    for (_, func) in module.functions.iter() {
        for (bh, block) in func.blocks.iter() {
            let last = match block.instructions.len().checked_sub(1) {
                Some(last) => last,
                None => {
                    return Err(IrError::MissingTerminator {
                        function: func.name.clone(),
                        block: bh.index(),
                    })
                }
            };
            if !block.instructions[last].is_terminator() {
                return Err(IrError::MissingTerminator {
                    function: func.name.clone(),
                    block: bh.index(),
                });
            }

            let mut seen_non_phi = false;
            for (index, inst) in block.instructions.iter().enumerate() {
                if inst.is_terminator() && index != last {
                    return Err(IrError::TerminatorNotLast {
                        function: func.name.clone(),
                        block: bh.index(),
                        index,
                    });
                }
                match inst {
                    Instruction::Phi { .. } => {
                        if seen_non_phi {
                            return Err(IrError::MisplacedPhi {
                                function: func.name.clone(),
                                block: bh.index(),
                                index,
                            });
                        }
                    }
                    _ => seen_non_phi = true,
                }

                for &target in inst.successors() {
                    if func.blocks.try_get(target).is_none() {
                        return Err(IrError::BadBranchTarget {
                            function: func.name.clone(),
                            block: bh.index(),
                            target: target.index(),
                        });
                    }
                }
                if let Instruction::Call { callee, .. } = inst {
                    if module.functions.try_get(*callee).is_none() {
                        return Err(IrError::BadCallee {
                            function: func.name.clone(),
                            block: bh.index(),
                            callee: callee.index(),
                        });
                    }
                }
                for operand in inst.operands() {
                    if let Value::Inst(r) = operand {
                        if module.try_inst(r).is_none() {
                            return Err(IrError::BadOperand {
                                function: func.name.clone(),
                                block: bh.index(),
                            });
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
