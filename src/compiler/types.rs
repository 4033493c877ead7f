use crate::node::types::ValueType;

/// Index of a statement list in the compilation context's block arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

impl BlockId {
    pub fn new(index: usize) -> Self {
        BlockId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// One emitted statement. Expression text is already rendered for the target.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Immutable binding of a hoisted term: `let name: ty = value;`.
    Let {
        name: String,
        ty: ValueType,
        value: String,
    },
    /// Uninitialised temporary that both branches of a lowered conditional assign.
    Declare { name: String, ty: ValueType },
    Assign { target: String, value: String },
    If {
        condition: String,
        then_block: BlockId,
        else_block: BlockId,
    },
}
