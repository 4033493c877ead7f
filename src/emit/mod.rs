//! Target grammars and the statement-tree printer.
//!
//! A [`Syntax`] owns every target-specific spelling: type keywords, literals, variable
//! access, per-operator templates, statement forms and the module layout around the entry
//! point. The printer in this module is target independent.

pub mod glsl;
pub mod wgsl;

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compiler::interface::{OutputSlot, ShaderInterface};
use crate::compiler::types::{BlockId, Statement};
use crate::node::ops::{Func, Op};
use crate::node::types::{Literal, ValueType, Variable};
use crate::utils::indent_line;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Wgsl,
    Glsl,
}

impl Target {
    pub fn parse(s: &str) -> Option<Target> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wgsl" => Some(Target::Wgsl),
            "glsl" | "glsl450" => Some(Target::Glsl),
            _ => None,
        }
    }

    pub fn syntax(self) -> &'static dyn Syntax {
        match self {
            Target::Wgsl => &wgsl::WgslSyntax,
            Target::Glsl => &glsl::GlslSyntax,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::Wgsl => "WGSL",
            Target::Glsl => "GLSL",
        })
    }
}

/// One piece of an operator's rendering template.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Text(Cow<'static, str>),
    /// Rendered text of the operand at this index.
    Operand(usize),
}

impl Piece {
    fn text(s: impl Into<Cow<'static, str>>) -> Piece {
        Piece::Text(s.into())
    }
}

pub trait Syntax: Sync {
    fn target(&self) -> Target;

    fn type_name(&self, ty: ValueType) -> &'static str;

    /// Literal text, or `None` if the value has no literal form (NaN, infinities).
    fn literal(&self, value: Literal) -> Option<String>;

    /// Expression that reads a special variable inside the entry point.
    fn variable(&self, var: &Variable) -> String;

    fn func_name(&self, func: Func) -> &'static str;

    /// Name of the texture sampling call taking `(texture-and-sampler, uv, level)`.
    fn sample_func(&self) -> &'static str;

    /// Assignable expression for an output slot.
    fn output(&self, slot: &OutputSlot) -> String;

    fn let_binding(&self, name: &str, ty: ValueType, value: &str) -> String;

    fn declaration(&self, name: &str, ty: ValueType) -> String;

    /// Wrap the printed body in declarations and the entry point.
    fn write_module(&self, interface: &ShaderInterface, entry_point: &str, body: &str) -> String;

    /// Rendering template for a term node with `arity` operands.
    ///
    /// Infix and prefix forms are fully parenthesised so operand text can be spliced in
    /// without precedence analysis.
    fn template(&self, op: &Op, arity: usize) -> Vec<Piece> {
        match op {
            Op::Binary(op) => vec![
                Piece::text("("),
                Piece::Operand(0),
                Piece::text(format!(" {} ", op.symbol())),
                Piece::Operand(1),
                Piece::text(")"),
            ],
            Op::Unary(op) => vec![
                Piece::text(format!("({}", op.symbol())),
                Piece::Operand(0),
                Piece::text(")"),
            ],
            Op::Call(func) => call_template(self.func_name(*func), arity, ")"),
            Op::Construct(ty) | Op::Cast(ty) => call_template(self.type_name(*ty), arity, ")"),
            Op::Swizzle(swizzle) => vec![
                Piece::Operand(0),
                Piece::text(format!(".{}", swizzle.pattern())),
            ],
            Op::Sample => call_template(self.sample_func(), arity, ", 0.0)"),
        }
    }
}

fn call_template(name: &'static str, arity: usize, close: &'static str) -> Vec<Piece> {
    let mut pieces = Vec::with_capacity(arity * 2 + 1);
    pieces.push(Piece::text(format!("{name}(")));
    for i in 0..arity {
        if i > 0 {
            pieces.push(Piece::text(", "));
        }
        pieces.push(Piece::Operand(i));
    }
    pieces.push(Piece::text(close));
    pieces
}

enum Frame {
    Block { id: BlockId, next: usize, depth: usize },
    Line { text: &'static str, depth: usize },
}

/// Print a statement tree with four-space indentation starting at `depth`.
///
/// Nested blocks are walked with an explicit stack; every `if` opens exactly one brace pair
/// per branch and closes it after the branch's last statement.
pub fn write_body(
    syntax: &dyn Syntax,
    blocks: &[Vec<Statement>],
    root: BlockId,
    depth: usize,
) -> String {
    let mut out = String::new();
    let mut stack = vec![Frame::Block {
        id: root,
        next: 0,
        depth,
    }];

    while let Some(frame) = stack.pop() {
        let (id, next, depth) = match frame {
            Frame::Line { text, depth } => {
                indent_line(&mut out, depth, text);
                continue;
            }
            Frame::Block { id, next, depth } => (id, next, depth),
        };
        let Some(statement) = blocks[id.index()].get(next) else {
            continue;
        };
        stack.push(Frame::Block {
            id,
            next: next + 1,
            depth,
        });

        match statement {
            Statement::Let { name, ty, value } => {
                indent_line(&mut out, depth, &syntax.let_binding(name, *ty, value));
            }
            Statement::Declare { name, ty } => {
                indent_line(&mut out, depth, &syntax.declaration(name, *ty));
            }
            Statement::Assign { target, value } => {
                indent_line(&mut out, depth, &format!("{target} = {value};"));
            }
            Statement::If {
                condition,
                then_block,
                else_block,
            } => {
                indent_line(&mut out, depth, &format!("if ({condition}) {{"));
                stack.push(Frame::Line { text: "}", depth });
                stack.push(Frame::Block {
                    id: *else_block,
                    next: 0,
                    depth: depth + 1,
                });
                stack.push(Frame::Line {
                    text: "} else {",
                    depth,
                });
                stack.push(Frame::Block {
                    id: *then_block,
                    next: 0,
                    depth: depth + 1,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ops::BinaryOp;

    #[test]
    fn test_binary_template_is_parenthesised() {
        let pieces = Target::Wgsl
            .syntax()
            .template(&Op::Binary(BinaryOp::Mul), 2);
        assert_eq!(
            pieces,
            vec![
                Piece::text("("),
                Piece::Operand(0),
                Piece::text(" * "),
                Piece::Operand(1),
                Piece::text(")"),
            ]
        );
    }

    #[test]
    fn test_constructor_template_lists_every_operand() {
        let pieces = Target::Glsl
            .syntax()
            .template(&Op::Construct(ValueType::Vec3), 3);
        assert_eq!(pieces.len(), 7);
        assert_eq!(pieces[0], Piece::text("vec3("));
        assert_eq!(pieces[6], Piece::text(")"));
    }

    #[test]
    fn test_nested_blocks_are_balanced() {
        let blocks = vec![
            vec![
                Statement::Declare {
                    name: "_t0".into(),
                    ty: ValueType::Float,
                },
                Statement::If {
                    condition: "c".into(),
                    then_block: BlockId::new(1),
                    else_block: BlockId::new(2),
                },
            ],
            vec![Statement::Assign {
                target: "_t0".into(),
                value: "1.0".into(),
            }],
            vec![Statement::Assign {
                target: "_t0".into(),
                value: "2.0".into(),
            }],
        ];
        let text = write_body(Target::Glsl.syntax(), &blocks, BlockId::new(0), 1);
        assert_eq!(
            text,
            "    float _t0;\n    if (c) {\n        _t0 = 1.0;\n    } else {\n        _t0 = 2.0;\n    }\n"
        );
    }

    #[test]
    fn test_target_parse() {
        assert_eq!(Target::parse("WGSL"), Some(Target::Wgsl));
        assert_eq!(Target::parse("glsl"), Some(Target::Glsl));
        assert_eq!(Target::parse("hlsl"), None);
        assert_eq!(Target::default(), Target::Wgsl);
    }
}
