//! Builder functions for every node kind.
//!
//! Each builder validates arity and operand types before allocating an id, so a failed call
//! consumes nothing from the session and returns a [`ConstructionError`].

use crate::error::ConstructionError;
use crate::utils::is_valid_identifier;

use super::ops::{BinaryOp, Func, Op, Swizzle, UnaryOp};
use super::types::{BuiltinInput, Literal, ValueType, Variable};
use super::{Node, NodeKind, Session};

type Built = Result<Node, ConstructionError>;

impl Session {
    pub fn literal(&self, value: Literal) -> Node {
        self.make(NodeKind::Literal(value), value.ty(), Vec::new())
    }

    pub fn float(&self, value: f32) -> Node {
        self.literal(Literal::Float(value))
    }

    pub fn int(&self, value: i32) -> Node {
        self.literal(Literal::Int(value))
    }

    pub fn uint(&self, value: u32) -> Node {
        self.literal(Literal::UInt(value))
    }

    pub fn boolean(&self, value: bool) -> Node {
        self.literal(Literal::Bool(value))
    }

    /// Interpolated fragment input. Integer inputs are declared flat.
    pub fn input(&self, name: &str, ty: ValueType) -> Built {
        check_name("input", name)?;
        if !ty.is_stage_io() {
            return Err(ConstructionError::UnsupportedType {
                role: "a stage input",
                ty,
            });
        }
        Ok(self.variable(Variable::Input(name.to_string()), ty))
    }

    /// Member of the uniform block.
    pub fn uniform(&self, name: &str, ty: ValueType) -> Built {
        check_name("uniform", name)?;
        if !ty.is_uniform_member() {
            return Err(ConstructionError::UnsupportedType {
                role: "a uniform member",
                ty,
            });
        }
        Ok(self.variable(Variable::Uniform(name.to_string()), ty))
    }

    /// 2D float texture with its sampler.
    pub fn sampler(&self, name: &str) -> Built {
        check_name("sampler", name)?;
        Ok(self.variable(Variable::Sampler(name.to_string()), ValueType::Sampler2D))
    }

    pub fn frag_coord(&self) -> Node {
        self.builtin(BuiltinInput::FragCoord)
    }

    pub fn front_facing(&self) -> Node {
        self.builtin(BuiltinInput::FrontFacing)
    }

    fn builtin(&self, input: BuiltinInput) -> Node {
        self.variable(Variable::Builtin(input), input.ty())
    }

    fn variable(&self, var: Variable, ty: ValueType) -> Node {
        self.make(NodeKind::Variable(var), ty, Vec::new())
    }

    /// Generic operator term; the typed helpers below all funnel through here.
    pub fn term(&self, op: Op, operands: &[&Node]) -> Built {
        let types: Vec<ValueType> = operands.iter().map(|n| n.ty()).collect();
        let ty = op.infer(&types)?;
        let operands = operands.iter().map(|&n| n.clone()).collect();
        Ok(self.make(NodeKind::Term(op), ty, operands))
    }

    pub fn add(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Add, a, b)
    }

    pub fn sub(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Sub, a, b)
    }

    pub fn mul(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Mul, a, b)
    }

    pub fn div(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Div, a, b)
    }

    pub fn rem(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Rem, a, b)
    }

    pub fn lt(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Lt, a, b)
    }

    pub fn le(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Le, a, b)
    }

    pub fn gt(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Gt, a, b)
    }

    pub fn ge(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Ge, a, b)
    }

    pub fn eq(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Eq, a, b)
    }

    pub fn ne(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Ne, a, b)
    }

    pub fn and(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::And, a, b)
    }

    pub fn or(&self, a: &Node, b: &Node) -> Built {
        self.binary(BinaryOp::Or, a, b)
    }

    pub fn not(&self, a: &Node) -> Built {
        self.term(Op::Unary(UnaryOp::Not), &[a])
    }

    pub fn neg(&self, a: &Node) -> Built {
        self.term(Op::Unary(UnaryOp::Neg), &[a])
    }

    pub fn call(&self, func: Func, args: &[&Node]) -> Built {
        self.term(Op::Call(func), args)
    }

    /// Vector or matrix constructor.
    pub fn construct(&self, ty: ValueType, parts: &[&Node]) -> Built {
        self.term(Op::Construct(ty), parts)
    }

    pub fn swizzle(&self, a: &Node, pattern: &str) -> Built {
        let swizzle = Swizzle::parse(pattern).ok_or_else(|| ConstructionError::InvalidSwizzle {
            pattern: pattern.to_string(),
            ty: a.ty(),
        })?;
        self.term(Op::Swizzle(swizzle), &[a])
    }

    pub fn cast(&self, ty: ValueType, a: &Node) -> Built {
        self.term(Op::Cast(ty), &[a])
    }

    pub fn sample(&self, sampler: &Node, uv: &Node) -> Built {
        self.term(Op::Sample, &[sampler, uv])
    }

    /// `condition ? then : otherwise`, lowered to an if/else block at compile time.
    pub fn conditional(&self, condition: &Node, then: &Node, otherwise: &Node) -> Built {
        if condition.ty() != ValueType::Bool {
            return Err(ConstructionError::OperandType {
                op: "Conditional".to_string(),
                position: 0,
                expected: "bool".to_string(),
                found: condition.ty(),
            });
        }
        if then.ty() != otherwise.ty() {
            return Err(ConstructionError::Mismatch {
                op: "Conditional".to_string(),
                left: then.ty(),
                right: otherwise.ty(),
            });
        }
        if then.ty() == ValueType::Sampler2D {
            return Err(ConstructionError::UnsupportedType {
                role: "a conditional result",
                ty: then.ty(),
            });
        }
        let operands = vec![condition.clone(), then.clone(), otherwise.clone()];
        Ok(self.make(NodeKind::Conditional, then.ty(), operands))
    }

    fn binary(&self, op: BinaryOp, a: &Node, b: &Node) -> Built {
        self.term(Op::Binary(op), &[a, b])
    }
}

fn check_name(role: &'static str, name: &str) -> Result<(), ConstructionError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(ConstructionError::InvalidIdentifier {
            role,
            name: name.to_string(),
        })
    }
}
