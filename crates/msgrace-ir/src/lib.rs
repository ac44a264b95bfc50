//! msgrace intermediate representation.
//!
//! An arena-based IR for compiled message-passing programs: a [`Module`]
//! holds functions, each a control-flow graph of basic blocks of
//! instructions. Instructions are addressed by [`InstRef`] and operands are
//! [`Value`]s; constants are interned so that constant equality is handle
//! equality.

pub mod arena;
mod display;
mod error;
mod func;
mod inst;
mod validate;
mod value;

pub use arena::{Arena, Handle, UniqueArena};
pub use display::{dump_module, format_inst_ref};
pub use error::IrError;
pub use func::{BasicBlock, Function, Parameter};
pub use inst::{InstRef, Instruction};
pub use validate::validate_module;
pub use value::{ConstPayload, Constant, Type, Value};

/// A compiled IR module.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// Defined and declared functions.
    pub functions: Arena<Function>,
    /// Interned constants; equal constants share a handle.
    pub constants: UniqueArena<Constant>,
}

impl Module {
    /// Creates an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a constant and returns it as an operand.
    pub fn constant(&mut self, ty: Type, payload: ConstPayload) -> Value {
        Value::Constant(self.constants.insert(Constant { ty, payload }))
    }

    /// Interns a 32-bit integer constant.
    pub fn const_i32(&mut self, value: i32) -> Value {
        self.constant(Type::I32, ConstPayload::Int(value as i64))
    }

    /// Appends an instruction to a block and returns its reference.
    pub fn push(
        &mut self,
        function: Handle<Function>,
        block: Handle<BasicBlock>,
        inst: Instruction,
    ) -> InstRef {
        let bb = &mut self.functions[function].blocks[block];
        bb.instructions.push(inst);
        InstRef {
            function,
            block,
            index: (bb.instructions.len() - 1) as u32,
        }
    }

    /// Looks up an instruction.
    ///
    /// # Panics
    ///
    /// Panics if the reference does not point into this module.
    pub fn inst(&self, r: InstRef) -> &Instruction {
        &self.functions[r.function].blocks[r.block].instructions[r.index as usize]
    }

    /// Looks up an instruction, returning `None` for a stale reference.
    pub fn try_inst(&self, r: InstRef) -> Option<&Instruction> {
        self.functions
            .try_get(r.function)?
            .blocks
            .try_get(r.block)?
            .instructions
            .get(r.index as usize)
    }

    /// The instruction following `r` inside the same block, if any.
    pub fn next_in_block(&self, r: InstRef) -> Option<InstRef> {
        let block = &self.functions[r.function].blocks[r.block];
        let next = r.index as usize + 1;
        if next < block.instructions.len() {
            Some(InstRef {
                index: next as u32,
                ..r
            })
        } else {
            None
        }
    }

    /// The first instruction of `block` that is not a PHI node.
    pub fn first_non_phi(
        &self,
        function: Handle<Function>,
        block: Handle<BasicBlock>,
    ) -> Option<InstRef> {
        let bb = &self.functions[function].blocks[block];
        bb.instructions
            .iter()
            .position(|i| !matches!(i, Instruction::Phi { .. }))
            .map(|index| InstRef {
                function,
                block,
                index: index as u32,
            })
    }

    /// Iterates every instruction in the module.
    pub fn all_insts(&self) -> impl Iterator<Item = InstRef> + '_ {
        self.functions.iter().flat_map(|(function, func)| {
            func.blocks.iter().flat_map(move |(block, bb)| {
                (0..bb.instructions.len()).map(move |index| InstRef {
                    function,
                    block,
                    index: index as u32,
                })
            })
        })
    }

    /// All direct call sites of `callee` — the function's user list.
    pub fn call_sites_of(&self, callee: Handle<Function>) -> Vec<InstRef> {
        self.all_insts()
            .filter(|&r| matches!(self.inst(r), Instruction::Call { callee: c, .. } if *c == callee))
            .collect()
    }

    /// All instructions using `value` as an operand — the value's user list.
    pub fn users_of(&self, value: Value) -> Vec<InstRef> {
        self.all_insts()
            .filter(|&r| self.inst(r).operands().contains(&value))
            .collect()
    }

    /// The IR type of a value.
    pub fn value_type(&self, value: Value) -> Type {
        match value {
            Value::Constant(h) => self.constants[h].ty,
            Value::Argument { function, index } => self.functions[function]
                .params
                .get(index as usize)
                .map(|p| p.ty)
                .unwrap_or(Type::Void),
            Value::Inst(r) => match self.inst(r) {
                Instruction::Alloca { .. } | Instruction::PtrOffset { .. } => Type::Ptr,
                Instruction::Load { ty, .. } | Instruction::Phi { ty, .. } => *ty,
                Instruction::Call { callee, .. } => self.functions[*callee].return_ty,
                _ => Type::Void,
            },
        }
    }

    /// Looks up a function by name.
    pub fn function_by_name(&self, name: &str) -> Option<Handle<Function>> {
        self.functions
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(h, _)| h)
    }
}
