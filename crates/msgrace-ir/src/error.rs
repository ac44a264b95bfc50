//! Error types for the msgrace IR.

/// Structural defects found while validating a module.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// A basic block does not end in a terminator.
    #[error("function `{function}`, block {block}: no terminator at end of block")]
    MissingTerminator { function: String, block: usize },

    /// A terminator appears before the end of its block.
    #[error("function `{function}`, block {block}: terminator at position {index} is not last")]
    TerminatorNotLast {
        function: String,
        block: usize,
        index: usize,
    },

    /// A PHI node appears after a non-PHI instruction.
    #[error("function `{function}`, block {block}: PHI at position {index} after non-PHI")]
    MisplacedPhi {
        function: String,
        block: usize,
        index: usize,
    },

    /// A branch targets a block handle outside the function.
    #[error("function `{function}`, block {block}: branch target {target} out of bounds")]
    BadBranchTarget {
        function: String,
        block: usize,
        target: usize,
    },

    /// A call references a function handle outside the module.
    #[error("function `{function}`, block {block}: callee handle {callee} out of bounds")]
    BadCallee {
        function: String,
        block: usize,
        callee: usize,
    },

    /// An operand references an instruction that does not exist.
    #[error("function `{function}`, block {block}: operand references a missing instruction")]
    BadOperand { function: String, block: usize },
}
