//! Operator set and per-operator type inference.
//!
//! Every operator is a variant of the closed [`Op`] enum. Type inference, scheduling and
//! both target emitters match on it exhaustively, so adding an operator is a compile-time
//! checked change across all stages.

use std::fmt;

use crate::error::ConstructionError;

use super::types::ValueType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Integer remainder.
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "Add",
            BinaryOp::Sub => "Sub",
            BinaryOp::Mul => "Mul",
            BinaryOp::Div => "Div",
            BinaryOp::Rem => "Rem",
            BinaryOp::Lt => "LessThan",
            BinaryOp::Le => "LessEqual",
            BinaryOp::Gt => "GreaterThan",
            BinaryOp::Ge => "GreaterEqual",
            BinaryOp::Eq => "Equal",
            BinaryOp::Ne => "NotEqual",
            BinaryOp::And => "And",
            BinaryOp::Or => "Or",
        }
    }

    /// Infix token; identical in WGSL and GLSL.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    const ALL: [BinaryOp; 13] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::And,
        BinaryOp::Or,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "Neg",
            UnaryOp::Not => "Not",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// Builtin math functions rendered as calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Pow,
    Exp,
    Log,
    Exp2,
    Log2,
    Sqrt,
    InverseSqrt,
    Abs,
    Sign,
    Floor,
    Ceil,
    Fract,
    Min,
    Max,
    Clamp,
    Mix,
    Step,
    SmoothStep,
    Length,
    Distance,
    Dot,
    Cross,
    Normalize,
    Reflect,
}

impl Func {
    const ALL: [Func; 31] = [
        Func::Sin,
        Func::Cos,
        Func::Tan,
        Func::Asin,
        Func::Acos,
        Func::Atan,
        Func::Atan2,
        Func::Pow,
        Func::Exp,
        Func::Log,
        Func::Exp2,
        Func::Log2,
        Func::Sqrt,
        Func::InverseSqrt,
        Func::Abs,
        Func::Sign,
        Func::Floor,
        Func::Ceil,
        Func::Fract,
        Func::Min,
        Func::Max,
        Func::Clamp,
        Func::Mix,
        Func::Step,
        Func::SmoothStep,
        Func::Length,
        Func::Distance,
        Func::Dot,
        Func::Cross,
        Func::Normalize,
        Func::Reflect,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "Sin",
            Func::Cos => "Cos",
            Func::Tan => "Tan",
            Func::Asin => "Asin",
            Func::Acos => "Acos",
            Func::Atan => "Atan",
            Func::Atan2 => "Atan2",
            Func::Pow => "Pow",
            Func::Exp => "Exp",
            Func::Log => "Log",
            Func::Exp2 => "Exp2",
            Func::Log2 => "Log2",
            Func::Sqrt => "Sqrt",
            Func::InverseSqrt => "InverseSqrt",
            Func::Abs => "Abs",
            Func::Sign => "Sign",
            Func::Floor => "Floor",
            Func::Ceil => "Ceil",
            Func::Fract => "Fract",
            Func::Min => "Min",
            Func::Max => "Max",
            Func::Clamp => "Clamp",
            Func::Mix => "Mix",
            Func::Step => "Step",
            Func::SmoothStep => "SmoothStep",
            Func::Length => "Length",
            Func::Distance => "Distance",
            Func::Dot => "Dot",
            Func::Cross => "Cross",
            Func::Normalize => "Normalize",
            Func::Reflect => "Reflect",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Func::Atan2
            | Func::Pow
            | Func::Min
            | Func::Max
            | Func::Step
            | Func::Distance
            | Func::Dot
            | Func::Cross
            | Func::Reflect => 2,
            Func::Clamp | Func::Mix | Func::SmoothStep => 3,
            _ => 1,
        }
    }
}

/// Component selection on a vector, e.g. `.xzy`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle {
    components: [u8; 4],
    len: u8,
}

impl Swizzle {
    /// Parse a pattern in either `xyzw` or `rgba` notation (not mixed).
    pub fn parse(pattern: &str) -> Option<Swizzle> {
        let sets = ["xyzw", "rgba"];
        let set = sets
            .iter()
            .find(|set| pattern.chars().all(|ch| set.contains(ch)))?;
        if pattern.is_empty() || pattern.len() > 4 {
            return None;
        }
        let mut components = [0u8; 4];
        for (i, ch) in pattern.chars().enumerate() {
            components[i] = set.find(ch)? as u8;
        }
        Some(Swizzle {
            components,
            len: pattern.len() as u8,
        })
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn components(&self) -> &[u8] {
        &self.components[..self.len()]
    }

    /// Pattern in `xyzw` notation, valid for both targets.
    pub fn pattern(&self) -> String {
        self.components()
            .iter()
            .map(|&c| ['x', 'y', 'z', 'w'][c as usize])
            .collect()
    }
}

impl fmt::Debug for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Swizzle(.{})", self.pattern())
    }
}

/// Operator carried by a term node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Binary(BinaryOp),
    Unary(UnaryOp),
    Call(Func),
    /// Vector or matrix constructor producing the given type.
    Construct(ValueType),
    Swizzle(Swizzle),
    /// Scalar conversion to the given type.
    Cast(ValueType),
    /// Sample a texture at a vec2 coordinate (explicit level 0).
    Sample,
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Binary(op) => op.name(),
            Op::Unary(op) => op.name(),
            Op::Call(func) => func.name(),
            Op::Construct(_) => "Construct",
            Op::Swizzle(_) => "Swizzle",
            Op::Cast(_) => "Cast",
            Op::Sample => "Sample",
        }
    }

    /// Look up an operator that takes no parameters by its graph JSON name.
    pub fn from_name(name: &str) -> Option<Op> {
        if let Some(op) = BinaryOp::ALL.iter().find(|op| op.name() == name) {
            return Some(Op::Binary(*op));
        }
        if let Some(func) = Func::ALL.iter().find(|f| f.name() == name) {
            return Some(Op::Call(*func));
        }
        match name {
            "Neg" => Some(Op::Unary(UnaryOp::Neg)),
            "Not" => Some(Op::Unary(UnaryOp::Not)),
            "Sample" => Some(Op::Sample),
            _ => None,
        }
    }

    /// Validate operand types against this operator's signature and infer the result type.
    pub fn infer(&self, operands: &[ValueType]) -> Result<ValueType, ConstructionError> {
        let sig = Signature {
            op: self.name(),
            operands,
        };
        match *self {
            Op::Binary(op) => {
                sig.arity(2)?;
                infer_binary(&sig, op, operands[0], operands[1])
            }
            Op::Unary(op) => {
                sig.arity(1)?;
                let a = operands[0];
                match op {
                    UnaryOp::Neg if a == ValueType::Float || a == ValueType::Int || a.is_vector() => {
                        Ok(a)
                    }
                    UnaryOp::Neg => Err(sig.operand(0, "float, int or vector")),
                    UnaryOp::Not if a == ValueType::Bool => Ok(a),
                    UnaryOp::Not => Err(sig.operand(0, "bool")),
                }
            }
            Op::Call(func) => {
                sig.arity(func.arity())?;
                infer_call(&sig, func)
            }
            Op::Construct(target) => infer_construct(&sig, target),
            Op::Swizzle(swizzle) => {
                sig.arity(1)?;
                let a = operands[0];
                if !a.is_vector() {
                    return Err(sig.operand(0, "vector"));
                }
                if swizzle.components().iter().any(|&c| c as usize >= a.components()) {
                    return Err(ConstructionError::InvalidSwizzle {
                        pattern: swizzle.pattern(),
                        ty: a,
                    });
                }
                ValueType::float_vector(swizzle.len()).ok_or(ConstructionError::InvalidSwizzle {
                    pattern: swizzle.pattern(),
                    ty: a,
                })
            }
            Op::Cast(target) => {
                sig.arity(1)?;
                if !target.is_scalar() {
                    return Err(ConstructionError::UnsupportedType {
                        role: "cast target",
                        ty: target,
                    });
                }
                if !operands[0].is_scalar() {
                    return Err(sig.operand(0, "scalar"));
                }
                Ok(target)
            }
            Op::Sample => {
                sig.arity(2)?;
                if operands[0] != ValueType::Sampler2D {
                    return Err(sig.operand(0, "sampler2D"));
                }
                if operands[1] != ValueType::Vec2 {
                    return Err(sig.operand(1, "vec2"));
                }
                Ok(ValueType::Vec4)
            }
        }
    }
}

struct Signature<'a> {
    op: &'static str,
    operands: &'a [ValueType],
}

impl Signature<'_> {
    fn arity(&self, expected: usize) -> Result<(), ConstructionError> {
        if self.operands.len() != expected {
            return Err(ConstructionError::Arity {
                op: self.op.to_string(),
                expected: expected.to_string(),
                found: self.operands.len(),
            });
        }
        Ok(())
    }

    fn operand(&self, position: usize, expected: &str) -> ConstructionError {
        ConstructionError::OperandType {
            op: self.op.to_string(),
            position,
            expected: expected.to_string(),
            found: self.operands[position],
        }
    }

    fn mismatch(&self, left: ValueType, right: ValueType) -> ConstructionError {
        ConstructionError::Mismatch {
            op: self.op.to_string(),
            left,
            right,
        }
    }

    /// All operands share one type accepted by `accept`.
    fn uniform(
        &self,
        accept: fn(ValueType) -> bool,
        expected: &str,
    ) -> Result<ValueType, ConstructionError> {
        let first = self.operands[0];
        for (i, &ty) in self.operands.iter().enumerate() {
            if !accept(ty) {
                return Err(self.operand(i, expected));
            }
            if ty != first {
                return Err(self.mismatch(first, ty));
            }
        }
        Ok(first)
    }
}

fn infer_binary(
    sig: &Signature<'_>,
    op: BinaryOp,
    a: ValueType,
    b: ValueType,
) -> Result<ValueType, ConstructionError> {
    use ValueType::Float;

    match op {
        BinaryOp::Add | BinaryOp::Sub => match (a, b) {
            _ if a == b && (a.is_numeric_scalar() || a.is_vector() || a.is_matrix()) => Ok(a),
            (Float, v) | (v, Float) if v.is_vector() => Ok(v),
            _ if !a.is_uniform_member() => Err(sig.operand(0, "numeric")),
            _ if !b.is_uniform_member() => Err(sig.operand(1, "numeric")),
            _ => Err(sig.mismatch(a, b)),
        },
        BinaryOp::Mul => match (a, b) {
            _ if a == b && (a.is_numeric_scalar() || a.is_vector() || a.is_matrix()) => Ok(a),
            (Float, v) | (v, Float) if v.is_vector() || v.is_matrix() => Ok(v),
            (m, v) if m.is_matrix() && m.column_type() == Some(v) => Ok(v),
            (v, m) if m.is_matrix() && m.column_type() == Some(v) => Ok(v),
            _ if !a.is_uniform_member() => Err(sig.operand(0, "numeric")),
            _ if !b.is_uniform_member() => Err(sig.operand(1, "numeric")),
            _ => Err(sig.mismatch(a, b)),
        },
        BinaryOp::Div => match (a, b) {
            _ if a == b && (a.is_numeric_scalar() || a.is_vector()) => Ok(a),
            (Float, v) | (v, Float) if v.is_vector() => Ok(v),
            _ if !(a.is_numeric_scalar() || a.is_vector()) => {
                Err(sig.operand(0, "numeric scalar or vector"))
            }
            _ if !(b.is_numeric_scalar() || b.is_vector()) => {
                Err(sig.operand(1, "numeric scalar or vector"))
            }
            _ => Err(sig.mismatch(a, b)),
        },
        BinaryOp::Rem => sig.uniform(ValueType::is_integer, "int or uint"),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            sig.uniform(ValueType::is_numeric_scalar, "numeric scalar")?;
            Ok(ValueType::Bool)
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            sig.uniform(ValueType::is_scalar, "scalar")?;
            Ok(ValueType::Bool)
        }
        BinaryOp::And | BinaryOp::Or => sig.uniform(|t| t == ValueType::Bool, "bool"),
    }
}

fn infer_call(sig: &Signature<'_>, func: Func) -> Result<ValueType, ConstructionError> {
    let ops = sig.operands;
    match func {
        Func::Sin
        | Func::Cos
        | Func::Tan
        | Func::Asin
        | Func::Acos
        | Func::Atan
        | Func::Exp
        | Func::Log
        | Func::Exp2
        | Func::Log2
        | Func::Sqrt
        | Func::InverseSqrt
        | Func::Sign
        | Func::Floor
        | Func::Ceil
        | Func::Fract
        | Func::Atan2
        | Func::Pow
        | Func::Step
        | Func::SmoothStep => sig.uniform(ValueType::is_float_generic, "float or vector"),
        Func::Abs => sig.uniform(
            |t| t.is_float_generic() || t == ValueType::Int,
            "float, int or vector",
        ),
        Func::Min | Func::Max | Func::Clamp => sig.uniform(
            |t| t.is_float_generic() || t.is_integer(),
            "numeric scalar or vector",
        ),
        Func::Normalize | Func::Reflect => sig.uniform(ValueType::is_vector, "vector"),
        Func::Length | Func::Distance => {
            sig.uniform(ValueType::is_float_generic, "float or vector")?;
            Ok(ValueType::Float)
        }
        Func::Dot => {
            sig.uniform(ValueType::is_vector, "vector")?;
            Ok(ValueType::Float)
        }
        Func::Cross => sig.uniform(|t| t == ValueType::Vec3, "vec3"),
        Func::Mix => {
            let (a, b, t) = (ops[0], ops[1], ops[2]);
            if !a.is_float_generic() {
                return Err(sig.operand(0, "float or vector"));
            }
            if a != b {
                return Err(sig.mismatch(a, b));
            }
            if t != a && t != ValueType::Float {
                return Err(sig.operand(2, "float or the type of the mixed values"));
            }
            Ok(a)
        }
    }
}

fn infer_construct(sig: &Signature<'_>, target: ValueType) -> Result<ValueType, ConstructionError> {
    let ops = sig.operands;
    if ops.is_empty() {
        return Err(ConstructionError::Arity {
            op: sig.op.to_string(),
            expected: "at least 1".to_string(),
            found: 0,
        });
    }

    if target.is_vector() {
        for (i, &ty) in ops.iter().enumerate() {
            if !ty.is_float_generic() {
                return Err(sig.operand(i, "float or vector"));
            }
        }
        // A single scalar splats across every component.
        if ops.len() == 1 && ops[0] == ValueType::Float {
            return Ok(target);
        }
        let found: usize = ops.iter().map(|t| t.components()).sum();
        if found != target.components() {
            return Err(ConstructionError::ComponentCount {
                target,
                expected: target.components(),
                found,
            });
        }
        return Ok(target);
    }

    if let (Some(dim), Some(column)) = (target.matrix_dim(), target.column_type()) {
        if ops.iter().all(|&t| t == column) && ops.len() == dim {
            return Ok(target);
        }
        if ops.iter().all(|&t| t == ValueType::Float) && ops.len() == dim * dim {
            return Ok(target);
        }
        if let Some(i) = ops.iter().position(|&t| t != column && t != ValueType::Float) {
            return Err(sig.operand(i, "float or column vector"));
        }
        let found: usize = ops.iter().map(|t| t.components()).sum();
        return Err(ConstructionError::ComponentCount {
            target,
            expected: target.components(),
            found,
        });
    }

    Err(ConstructionError::UnsupportedType {
        role: "constructor target",
        ty: target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ValueType::*;

    #[test]
    fn test_mixed_scalar_vector_arithmetic() {
        let add = Op::Binary(BinaryOp::Add);
        assert_eq!(add.infer(&[Float, Vec3]).unwrap(), Vec3);
        assert_eq!(add.infer(&[Vec2, Float]).unwrap(), Vec2);
        assert!(matches!(
            add.infer(&[Vec2, Vec3]),
            Err(ConstructionError::Mismatch { .. })
        ));
        assert!(matches!(
            add.infer(&[Int, Float]),
            Err(ConstructionError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_matrix_vector_multiply() {
        let mul = Op::Binary(BinaryOp::Mul);
        assert_eq!(mul.infer(&[Mat3, Vec3]).unwrap(), Vec3);
        assert_eq!(mul.infer(&[Vec4, Mat4]).unwrap(), Vec4);
        assert_eq!(mul.infer(&[Mat2, Mat2]).unwrap(), Mat2);
        assert!(mul.infer(&[Mat3, Vec4]).is_err());
    }

    #[test]
    fn test_arity_is_checked_before_types() {
        let err = Op::Call(Func::Clamp).infer(&[Float, Float]).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::Arity {
                op: "Clamp".to_string(),
                expected: "3".to_string(),
                found: 2
            }
        );
    }

    #[test]
    fn test_comparisons_yield_bool() {
        assert_eq!(Op::Binary(BinaryOp::Lt).infer(&[Float, Float]).unwrap(), Bool);
        assert_eq!(Op::Binary(BinaryOp::Eq).infer(&[Bool, Bool]).unwrap(), Bool);
        assert!(Op::Binary(BinaryOp::Lt).infer(&[Vec2, Vec2]).is_err());
    }

    #[test]
    fn test_vector_constructor_component_count() {
        let ctor = Op::Construct(Vec4);
        assert_eq!(ctor.infer(&[Vec3, Float]).unwrap(), Vec4);
        assert_eq!(ctor.infer(&[Float]).unwrap(), Vec4);
        assert_eq!(
            ctor.infer(&[Vec2, Float]).unwrap_err(),
            ConstructionError::ComponentCount {
                target: Vec4,
                expected: 4,
                found: 3
            }
        );
        assert!(matches!(
            ctor.infer(&[Vec2, Bool]),
            Err(ConstructionError::OperandType { position: 1, .. })
        ));
    }

    #[test]
    fn test_matrix_constructor_forms() {
        let ctor = Op::Construct(Mat2);
        assert_eq!(ctor.infer(&[Vec2, Vec2]).unwrap(), Mat2);
        assert_eq!(ctor.infer(&[Float, Float, Float, Float]).unwrap(), Mat2);
        assert!(ctor.infer(&[Float]).is_err());
        assert!(Op::Construct(Float).infer(&[Float]).is_err());
    }

    #[test]
    fn test_swizzle_parse_and_bounds() {
        let sw = Swizzle::parse("zyx").unwrap();
        assert_eq!(sw.pattern(), "zyx");
        assert_eq!(Swizzle::parse("rg").unwrap().pattern(), "xy");
        assert!(Swizzle::parse("xr").is_none());
        assert!(Swizzle::parse("xyzwx").is_none());
        assert!(Swizzle::parse("").is_none());

        assert_eq!(Op::Swizzle(sw).infer(&[Vec3]).unwrap(), Vec3);
        assert!(matches!(
            Op::Swizzle(sw).infer(&[Vec2]),
            Err(ConstructionError::InvalidSwizzle { .. })
        ));
        assert!(Op::Swizzle(sw).infer(&[Float]).is_err());
    }

    #[test]
    fn test_mix_accepts_scalar_weight() {
        let mix = Op::Call(Func::Mix);
        assert_eq!(mix.infer(&[Vec3, Vec3, Float]).unwrap(), Vec3);
        assert_eq!(mix.infer(&[Vec3, Vec3, Vec3]).unwrap(), Vec3);
        assert!(mix.infer(&[Vec3, Vec3, Vec2]).is_err());
    }

    #[test]
    fn test_from_name_round_trips_names() {
        for op in BinaryOp::ALL {
            assert_eq!(Op::from_name(op.name()), Some(Op::Binary(op)));
        }
        for func in Func::ALL {
            assert_eq!(Op::from_name(func.name()), Some(Op::Call(func)));
        }
        assert_eq!(Op::from_name("Frobnicate"), None);
    }

    #[test]
    fn test_sample_signature() {
        assert_eq!(Op::Sample.infer(&[Sampler2D, Vec2]).unwrap(), Vec4);
        assert!(Op::Sample.infer(&[Vec2, Vec2]).is_err());
    }
}
