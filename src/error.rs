//! Structured errors for node construction, compilation and emission.

use std::fmt;

use thiserror::Error;

use crate::emit::Target;
use crate::node::types::ValueType;
use crate::node::{Node, NodeId};

/// Identifies the node an error is about: its id plus a short kind description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub id: NodeId,
    pub kind: String,
}

impl From<&Node> for NodeRef {
    fn from(node: &Node) -> Self {
        NodeRef {
            id: node.id(),
            kind: node.kind().describe(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {} ({})", self.id, self.kind)
    }
}

/// Raised by the `Session` builders when operands do not fit an operator's signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("{op} expects {expected} operand(s), got {found}")]
    Arity {
        op: String,
        expected: String,
        found: usize,
    },

    #[error("{op} operand {position} must be {expected}, got {found}")]
    OperandType {
        op: String,
        position: usize,
        expected: String,
        found: ValueType,
    },

    #[error("{op} operands have incompatible types {left} and {right}")]
    Mismatch {
        op: String,
        left: ValueType,
        right: ValueType,
    },

    #[error("{target} constructor needs {expected} components, got {found}")]
    ComponentCount {
        target: ValueType,
        expected: usize,
        found: usize,
    },

    #[error("swizzle .{pattern} is not valid on {ty}")]
    InvalidSwizzle { pattern: String, ty: ValueType },

    #[error("invalid {role} name {name:?} (expected [A-Za-z][A-Za-z0-9_]* without \"__\")")]
    InvalidIdentifier { role: &'static str, name: String },

    #[error("{ty} cannot be used as {role}")]
    UnsupportedType { role: &'static str, ty: ValueType },
}

/// Raised while walking, scheduling or lowering a graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("no output bindings to compile")]
    NoOutputs,

    #[error("cyclic reference detected at {node}")]
    Cycle { node: NodeRef },

    #[error("{first} and {second} share one id; nodes from different sessions cannot be mixed")]
    IdentityCollision { first: NodeRef, second: NodeRef },

    #[error("output slot {slot:?} expects {expected}, but {node} has type {found}")]
    OutputTypeMismatch {
        slot: String,
        expected: ValueType,
        found: ValueType,
        node: NodeRef,
    },

    #[error("output slot {slot:?} is invalid: {reason}")]
    InvalidOutputSlot { slot: String, reason: String },

    #[error("output slots {first:?} and {second:?} both use location {location}")]
    DuplicateLocation {
        first: String,
        second: String,
        location: u32,
    },

    #[error("{role} {name:?} is used with conflicting types {first} and {second} (at {node})")]
    ConflictingVariable {
        role: &'static str,
        name: String,
        first: ValueType,
        second: ValueType,
        node: NodeRef,
    },

    #[error("entry point {0:?} is not a valid identifier")]
    InvalidEntryPoint(String),

    #[error("{node} was referenced before its binding was scheduled")]
    Unscheduled { node: NodeRef },
}

/// Why a literal-only subexpression has no value of its result type.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantFault {
    #[error("integer division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("non-finite float result")]
    NonFinite,
}

/// Raised while rendering text for a specific target.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmissionError {
    #[error("{node} holds {value}, which has no {target} literal form")]
    NonFiniteLiteral {
        node: NodeRef,
        value: f32,
        target: Target,
    },

    /// The target folds literal-only expressions while parsing and rejects the module when
    /// folding fails.
    #[error("{node} is a constant expression that {target} rejects: {fault}")]
    UnrepresentableConstant {
        node: NodeRef,
        fault: ConstantFault,
        target: Target,
    },
}

/// Any failure of the library surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Emission(#[from] EmissionError),
}
