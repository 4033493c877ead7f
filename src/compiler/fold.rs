//! Compile-time evaluation of literal-only subexpressions.
//!
//! WGSL and GLSL front ends fold constant expressions while parsing and reject the whole
//! module when a folded value does not fit its type. Every term whose operands are all
//! constant is evaluated here first, so such graphs fail with an [`EmissionError`] naming
//! the term instead of producing text the target refuses.
//!
//! Values are tracked through hoisted bindings as well: a WGSL `let` names its initializer
//! rather than breaking constness. Conditionals, variables and texture samples are never
//! constant. Floats are evaluated in `f32`.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::debug;

use crate::emit::Target;
use crate::error::{ConstantFault, EmissionError, NodeRef};
use crate::graph::GraphWalk;
use crate::node::ops::{BinaryOp, Func, Op, UnaryOp};
use crate::node::types::{Literal, ValueType};
use crate::node::{NodeId, NodeKind};

/// A compile-time value.
#[derive(Clone, Debug, PartialEq)]
pub enum Const {
    Bool(bool),
    Int(i32),
    UInt(u32),
    /// Float scalar, vector or column-major matrix of the given type.
    Floats(ValueType, Vec<f32>),
}

impl From<Literal> for Const {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Float(v) => Const::float(v),
            Literal::Int(v) => Const::Int(v),
            Literal::UInt(v) => Const::UInt(v),
            Literal::Bool(v) => Const::Bool(v),
        }
    }
}

impl Const {
    fn float(v: f32) -> Const {
        Const::Floats(ValueType::Float, vec![v])
    }

    fn floats(&self) -> Option<&[f32]> {
        match self {
            Const::Floats(_, v) => Some(v),
            _ => None,
        }
    }
}

/// Evaluate every constant term reachable in `walk`.
///
/// # Returns
/// The number of constant terms, or the first term (in children-first order) whose value
/// does not fit its type.
pub fn check_constants(walk: &GraphWalk, target: Target) -> Result<usize, EmissionError> {
    let mut values: HashMap<NodeId, Const> = HashMap::new();
    let mut folded = 0usize;

    for node in walk.order() {
        let value = match node.kind() {
            NodeKind::Literal(Literal::Float(v)) if !v.is_finite() => {
                return Err(EmissionError::NonFiniteLiteral {
                    node: NodeRef::from(node),
                    value: *v,
                    target,
                });
            }
            NodeKind::Literal(lit) => Const::from(*lit),
            NodeKind::Term(op) => {
                let args: Option<Vec<Const>> = node
                    .operands()
                    .iter()
                    .map(|o| values.get(&o.id()).cloned())
                    .collect();
                let Some(args) = args else { continue };
                let value = evaluate(op, node.ty(), &args).map_err(|fault| {
                    EmissionError::UnrepresentableConstant {
                        node: NodeRef::from(node),
                        fault,
                        target,
                    }
                })?;
                let Some(value) = value else { continue };
                folded += 1;
                value
            }
            NodeKind::Variable(_) | NodeKind::Conditional => continue,
        };
        values.insert(node.id(), value);
    }

    debug!("[fold] {folded} constant term(s) evaluated");
    Ok(folded)
}

/// Evaluate `op` over constant operands, producing a value of type `ty`.
///
/// `Ok(None)` means the operator has no compile-time value.
pub fn evaluate(op: &Op, ty: ValueType, args: &[Const]) -> Result<Option<Const>, ConstantFault> {
    let value = match (*op, args) {
        (Op::Binary(op), [a, b]) => binary(op, ty, a, b)?,
        (Op::Unary(op), [a]) => unary(op, a)?,
        (Op::Call(func), _) => call(func, ty, args),
        (Op::Construct(target), _) => construct(target, args),
        (Op::Swizzle(swizzle), [Const::Floats(_, xs)]) => swizzle
            .components()
            .iter()
            .map(|&c| xs.get(c as usize).copied())
            .collect::<Option<Vec<f32>>>()
            .map(|v| Const::Floats(ty, v)),
        (Op::Cast(target), [a]) => cast(target, a)?,
        _ => None,
    };

    match value {
        Some(Const::Floats(_, ref v)) if v.iter().any(|x| !x.is_finite()) => {
            Err(ConstantFault::NonFinite)
        }
        value => Ok(value),
    }
}

fn binary(op: BinaryOp, ty: ValueType, a: &Const, b: &Const) -> Result<Option<Const>, ConstantFault> {
    match (a, b) {
        (Const::Int(x), Const::Int(y)) => integer(op, i128::from(*x), i128::from(*y), |v| {
            i32::try_from(v).ok().map(Const::Int)
        }),
        (Const::UInt(x), Const::UInt(y)) => integer(op, i128::from(*x), i128::from(*y), |v| {
            u32::try_from(v).ok().map(Const::UInt)
        }),
        (Const::Bool(x), Const::Bool(y)) => Ok(match op {
            BinaryOp::And => Some(Const::Bool(*x && *y)),
            BinaryOp::Or => Some(Const::Bool(*x || *y)),
            _ => compare(op, x.cmp(y)).map(Const::Bool),
        }),
        (Const::Floats(ta, xs), Const::Floats(tb, ys)) => Ok(float_binary(op, ty, *ta, xs, *tb, ys)),
        _ => Ok(None),
    }
}

/// Integer arithmetic on widened operands; `narrow` maps the exact result back into the
/// operand type.
fn integer(
    op: BinaryOp,
    x: i128,
    y: i128,
    narrow: fn(i128) -> Option<Const>,
) -> Result<Option<Const>, ConstantFault> {
    let exact = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div | BinaryOp::Rem => {
            if y == 0 {
                return Err(ConstantFault::DivisionByZero);
            }
            // MIN / -1 overflows for the remainder too.
            narrow(x / y).ok_or(ConstantFault::Overflow)?;
            if op == BinaryOp::Div { x / y } else { x % y }
        }
        _ => return Ok(compare(op, x.cmp(&y)).map(Const::Bool)),
    };
    narrow(exact).ok_or(ConstantFault::Overflow).map(Some)
}

fn compare(op: BinaryOp, ordering: Ordering) -> Option<bool> {
    Some(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        BinaryOp::Eq => ordering.is_eq(),
        BinaryOp::Ne => ordering.is_ne(),
        _ => return None,
    })
}

fn float_binary(
    op: BinaryOp,
    ty: ValueType,
    ta: ValueType,
    xs: &[f32],
    tb: ValueType,
    ys: &[f32],
) -> Option<Const> {
    let linear = ta.is_matrix() || tb.is_matrix();
    let values = match op {
        BinaryOp::Mul if linear && xs.len() > 1 && ys.len() > 1 => product(ta, xs, tb, ys)?,
        BinaryOp::Add => zip(xs, ys, |a, b| a + b)?,
        BinaryOp::Sub => zip(xs, ys, |a, b| a - b)?,
        BinaryOp::Mul => zip(xs, ys, |a, b| a * b)?,
        BinaryOp::Div => zip(xs, ys, |a, b| a / b)?,
        _ => {
            let (x, y) = (xs.first()?, ys.first()?);
            return compare(op, x.partial_cmp(y)?).map(Const::Bool);
        }
    };
    Some(Const::Floats(ty, values))
}

/// Rows and columns of a product operand. A vector is a row on the left, a column on the
/// right.
fn shape(ty: ValueType, left: bool) -> (usize, usize) {
    match ty.matrix_dim() {
        Some(n) => (n, n),
        None if left => (1, ty.components()),
        None => (ty.components(), 1),
    }
}

/// Column-major matrix product covering matrix-matrix, matrix-vector and vector-matrix.
fn product(ta: ValueType, xs: &[f32], tb: ValueType, ys: &[f32]) -> Option<Vec<f32>> {
    let (rows, inner) = shape(ta, true);
    let (inner_b, cols) = shape(tb, false);
    if inner != inner_b || xs.len() != rows * inner || ys.len() != inner * cols {
        return None;
    }
    let mut out = Vec::with_capacity(rows * cols);
    for j in 0..cols {
        for i in 0..rows {
            out.push((0..inner).map(|k| xs[k * rows + i] * ys[j * inner + k]).sum());
        }
    }
    Some(out)
}

/// Component `i`, with single-component values broadcast.
fn component(v: &[f32], i: usize) -> Option<f32> {
    if v.len() == 1 { v.first().copied() } else { v.get(i).copied() }
}

fn zip(xs: &[f32], ys: &[f32], f: impl Fn(f32, f32) -> f32) -> Option<Vec<f32>> {
    (0..xs.len().max(ys.len()))
        .map(|i| Some(f(component(xs, i)?, component(ys, i)?)))
        .collect()
}

fn zip3(xs: &[f32], ys: &[f32], zs: &[f32], f: impl Fn(f32, f32, f32) -> f32) -> Option<Vec<f32>> {
    let n = xs.len().max(ys.len()).max(zs.len());
    (0..n)
        .map(|i| Some(f(component(xs, i)?, component(ys, i)?, component(zs, i)?)))
        .collect()
}

fn dot(xs: &[f32], ys: &[f32]) -> f32 {
    xs.iter().zip(ys).map(|(a, b)| a * b).sum()
}

fn length(xs: &[f32]) -> f32 {
    dot(xs, xs).sqrt()
}

fn unary(op: UnaryOp, a: &Const) -> Result<Option<Const>, ConstantFault> {
    Ok(match (op, a) {
        (UnaryOp::Neg, Const::Int(x)) => Some(Const::Int(x.checked_neg().ok_or(ConstantFault::Overflow)?)),
        (UnaryOp::Neg, Const::Floats(ty, xs)) => Some(Const::Floats(*ty, xs.iter().map(|x| -x).collect())),
        (UnaryOp::Not, Const::Bool(x)) => Some(Const::Bool(!x)),
        _ => None,
    })
}

fn call(func: Func, ty: ValueType, args: &[Const]) -> Option<Const> {
    match (func, args) {
        (Func::Abs, [Const::Int(x)]) => return Some(Const::Int(x.wrapping_abs())),
        (Func::Min, [Const::Int(x), Const::Int(y)]) => return Some(Const::Int(*x.min(y))),
        (Func::Max, [Const::Int(x), Const::Int(y)]) => return Some(Const::Int(*x.max(y))),
        (Func::Clamp, [Const::Int(x), Const::Int(lo), Const::Int(hi)]) => {
            return Some(Const::Int(*x.max(lo).min(hi)));
        }
        (Func::Min, [Const::UInt(x), Const::UInt(y)]) => return Some(Const::UInt(*x.min(y))),
        (Func::Max, [Const::UInt(x), Const::UInt(y)]) => return Some(Const::UInt(*x.max(y))),
        (Func::Clamp, [Const::UInt(x), Const::UInt(lo), Const::UInt(hi)]) => {
            return Some(Const::UInt(*x.max(lo).min(hi)));
        }
        _ => {}
    }

    let fs: Vec<&[f32]> = args.iter().map(Const::floats).collect::<Option<_>>()?;
    let values = match (func, fs.as_slice()) {
        (Func::Length, [x]) => vec![length(x)],
        (Func::Distance, [x, y]) => vec![length(&zip(x, y, |a, b| a - b)?)],
        (Func::Dot, [x, y]) => vec![dot(x, y)],
        (Func::Cross, [[x0, x1, x2], [y0, y1, y2]]) => vec![
            x1 * y2 - x2 * y1,
            x2 * y0 - x0 * y2,
            x0 * y1 - x1 * y0,
        ],
        (Func::Normalize, [x]) => {
            let len = length(x);
            x.iter().map(|v| v / len).collect()
        }
        (Func::Reflect, [i, n]) => {
            let d = dot(n, i);
            zip(i, n, |a, b| a - 2.0 * d * b)?
        }
        (Func::Atan2, [y, x]) => zip(y, x, f32::atan2)?,
        (Func::Pow, [x, y]) => zip(x, y, f32::powf)?,
        (Func::Min, [x, y]) => zip(x, y, f32::min)?,
        (Func::Max, [x, y]) => zip(x, y, f32::max)?,
        (Func::Step, [edge, x]) => zip(edge, x, |e, v| if v < e { 0.0 } else { 1.0 })?,
        (Func::Clamp, [x, lo, hi]) => zip3(x, lo, hi, |v, l, h| v.max(l).min(h))?,
        (Func::Mix, [a, b, t]) => zip3(a, b, t, |a, b, t| a * (1.0 - t) + b * t)?,
        (Func::SmoothStep, [e0, e1, x]) => zip3(e0, e1, x, |e0, e1, v| {
            let t = ((v - e0) / (e1 - e0)).max(0.0).min(1.0);
            t * t * (3.0 - 2.0 * t)
        })?,
        (_, [x]) => x
            .iter()
            .map(|&v| elementwise(func, v))
            .collect::<Option<_>>()?,
        _ => return None,
    };
    Some(Const::Floats(ty, values))
}

fn elementwise(func: Func, v: f32) -> Option<f32> {
    Some(match func {
        Func::Sin => v.sin(),
        Func::Cos => v.cos(),
        Func::Tan => v.tan(),
        Func::Asin => v.asin(),
        Func::Acos => v.acos(),
        Func::Atan => v.atan(),
        Func::Exp => v.exp(),
        Func::Log => v.ln(),
        Func::Exp2 => v.exp2(),
        Func::Log2 => v.log2(),
        Func::Sqrt => v.sqrt(),
        Func::InverseSqrt => 1.0 / v.sqrt(),
        Func::Abs => v.abs(),
        Func::Sign if v > 0.0 => 1.0,
        Func::Sign if v < 0.0 => -1.0,
        Func::Sign => 0.0,
        Func::Floor => v.floor(),
        Func::Ceil => v.ceil(),
        Func::Fract => v - v.floor(),
        _ => return None,
    })
}

fn construct(target: ValueType, args: &[Const]) -> Option<Const> {
    let parts: Vec<&[f32]> = args.iter().map(Const::floats).collect::<Option<_>>()?;
    let mut values = parts.concat();
    if let [splat] = values[..] {
        values = vec![splat; target.components()];
    }
    Some(Const::Floats(target, values))
}

fn cast(target: ValueType, value: &Const) -> Result<Option<Const>, ConstantFault> {
    let wide = match value {
        Const::Bool(b) => f64::from(u8::from(*b)),
        Const::Int(v) => f64::from(*v),
        Const::UInt(v) => f64::from(*v),
        Const::Floats(ValueType::Float, v) => match v.first() {
            Some(x) => f64::from(*x),
            None => return Ok(None),
        },
        Const::Floats(..) => return Ok(None),
    };
    let in_range = |min: f64, max: f64| {
        let t = wide.trunc();
        if t < min || t > max { Err(ConstantFault::Overflow) } else { Ok(t) }
    };
    Ok(Some(match (target, value) {
        (ValueType::Bool, _) => Const::Bool(wide != 0.0),
        (ValueType::Float, _) => Const::float(wide as f32),
        // Integer to integer conversions reinterpret the bits.
        (ValueType::Int, Const::UInt(v)) => Const::Int(*v as i32),
        (ValueType::UInt, Const::Int(v)) => Const::UInt(*v as u32),
        (ValueType::Int, _) => Const::Int(in_range(f64::from(i32::MIN), f64::from(i32::MAX))? as i32),
        (ValueType::UInt, _) => Const::UInt(in_range(0.0, f64::from(u32::MAX))? as u32),
        _ => return Ok(None),
    }))
}
