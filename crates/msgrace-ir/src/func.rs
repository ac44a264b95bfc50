//! Functions and basic blocks.

use crate::arena::{Arena, Handle};
use crate::inst::Instruction;
use crate::value::Type;

/// A formal function parameter.
#[derive(Clone, Debug)]
pub struct Parameter {
    /// Optional parameter name.
    pub name: Option<String>,
    /// The type of this parameter.
    pub ty: Type,
}

/// A basic block: a straight-line run of instructions ending in a terminator.
#[derive(Clone, Debug, Default)]
pub struct BasicBlock {
    /// Optional block label.
    pub name: Option<String>,
    /// The instructions, in execution order. In a well-formed block the
    /// last instruction is the only terminator.
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// Creates an empty labeled block.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            instructions: Vec::new(),
        }
    }

    /// The block terminator, if the block is complete.
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.is_terminator())
    }
}

/// An IR function.
///
/// A function without blocks is an external declaration.
#[derive(Clone, Debug)]
pub struct Function {
    /// The linker-visible name.
    pub name: String,
    /// Formal parameters.
    pub params: Vec<Parameter>,
    /// The return type.
    pub return_ty: Type,
    /// The function body; the first block is the entry block.
    pub blocks: Arena<BasicBlock>,
}

impl Function {
    /// Creates an empty function (an external declaration until blocks
    /// are added).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_ty: Type::Void,
            blocks: Arena::new(),
        }
    }

    /// Returns `true` if the function has no body.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The entry block, if the function has a body.
    pub fn entry(&self) -> Option<Handle<BasicBlock>> {
        self.blocks.iter().next().map(|(h, _)| h)
    }
}
