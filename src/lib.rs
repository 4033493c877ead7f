//! Compile DAGs of typed shader nodes into WGSL or GLSL fragment shaders.
//!
//! This crate is organized into several modules:
//! - `node`: Immutable nodes, the `Session` id source and the builder functions
//! - `graph`: Iterative walker computing in-degrees and children-first order
//! - `compiler`: Scheduling, control-flow lowering and the `compile` entry points
//! - `emit`: Target syntaxes and the statement printer
//! - `validation`: naga-based checks of generated source
//! - `dsl`: JSON graph descriptions
//!
//! The main entry points are:
//! - `Session` builders to construct nodes
//! - `compile` / `compile_with` / `compile_program` to produce source text

pub mod compiler;
pub mod dsl;
pub mod emit;
pub mod error;
pub mod graph;
pub mod node;
pub mod utils;
pub mod validation;

pub use compiler::interface::{OutputBindings, OutputSlot, ShaderInterface, SlotTarget};
pub use compiler::{CompileOptions, CompileStats, CompiledProgram, compile, compile_program, compile_with};
pub use emit::Target;
pub use error::{CompileError, ConstantFault, ConstructionError, EmissionError, Error, NodeRef};
pub use node::ops::{BinaryOp, Func, Op, Swizzle, UnaryOp};
pub use node::types::{BuiltinInput, Literal, ValueType, Variable};
pub use node::{Node, NodeId, NodeKind, Session};
