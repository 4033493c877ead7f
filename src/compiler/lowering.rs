//! Turns a schedule into a statement tree, expanding conditionals into if/else blocks.

use log::debug;

use crate::compiler::context::CompilationContext;
use crate::compiler::scheduler::{Schedule, ScopeId};
use crate::compiler::types::{BlockId, Statement};
use crate::error::{CompileError, Error, NodeRef};
use crate::node::{Node, NodeKind};

/// What closes a scope once its hoisted statements are emitted.
enum Finish<'a> {
    /// Assign every root to its output target.
    Outputs,
    /// Assign the branch value to the conditional's temporary.
    Branch { temp: String, value: &'a Node },
}

struct Frame<'a> {
    scope: ScopeId,
    block: BlockId,
    next: usize,
    finish: Finish<'a>,
}

/// Lower `schedule` into `ctx`'s block arena and return the root block.
///
/// `outputs` pairs each output target expression with its root node, in emission order.
/// Scopes are expanded depth-first with an explicit frame stack; a conditional pushes its
/// else frame below its then frame, so temporaries are numbered in text order.
pub fn lower<'a>(
    ctx: &mut CompilationContext<'_>,
    schedule: &'a Schedule,
    outputs: &[(String, &'a Node)],
) -> Result<BlockId, Error> {
    let root = ctx.root();
    let mut stack = vec![Frame {
        scope: ScopeId::ROOT,
        block: root,
        next: 0,
        finish: Finish::Outputs,
    }];
    let mut lowered = 0usize;

    while let Some(frame) = stack.last_mut() {
        let block = frame.block;
        let Some(node) = schedule.statements(frame.scope).get(frame.next) else {
            if let Some(done) = stack.pop() {
                finish_scope(ctx, done, outputs)?;
            }
            continue;
        };
        frame.next += 1;

        if !matches!(node.kind(), NodeKind::Conditional) {
            let value = ctx.render_statement(node)?;
            let name = ctx.fresh_temp();
            ctx.push(
                block,
                Statement::Let {
                    name: name.clone(),
                    ty: node.ty(),
                    value,
                },
            );
            ctx.bind(node.id(), name);
            continue;
        }

        let [condition, then_value, else_value] = node.operands() else {
            return Err(CompileError::Unscheduled {
                node: NodeRef::from(node),
            }
            .into());
        };
        let [then_scope, else_scope] =
            schedule
                .branches(node.id())
                .ok_or_else(|| CompileError::Unscheduled {
                    node: NodeRef::from(node),
                })?;

        let temp = ctx.fresh_temp();
        ctx.push(
            block,
            Statement::Declare {
                name: temp.clone(),
                ty: node.ty(),
            },
        );
        let condition = ctx.render_statement(condition)?;
        let then_block = ctx.new_block();
        let else_block = ctx.new_block();
        ctx.push(
            block,
            Statement::If {
                condition,
                then_block,
                else_block,
            },
        );
        ctx.bind(node.id(), temp.clone());
        lowered += 1;

        stack.push(Frame {
            scope: else_scope,
            block: else_block,
            next: 0,
            finish: Finish::Branch {
                temp: temp.clone(),
                value: else_value,
            },
        });
        stack.push(Frame {
            scope: then_scope,
            block: then_block,
            next: 0,
            finish: Finish::Branch {
                temp,
                value: then_value,
            },
        });
    }

    debug!(
        "[lower] {} conditional(s) lowered, {} temporaries",
        lowered,
        ctx.temp_count()
    );
    Ok(root)
}

fn finish_scope(
    ctx: &mut CompilationContext<'_>,
    frame: Frame<'_>,
    outputs: &[(String, &Node)],
) -> Result<(), Error> {
    match frame.finish {
        Finish::Outputs => {
            for (target, root) in outputs {
                let value = ctx.render_statement(root)?;
                ctx.push(
                    frame.block,
                    Statement::Assign {
                        target: target.clone(),
                        value,
                    },
                );
            }
        }
        Finish::Branch { temp, value } => {
            let value = ctx.render_statement(value)?;
            ctx.push(frame.block, Statement::Assign { target: temp, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::scheduler::schedule;
    use crate::emit::Target;
    use crate::graph::walk;
    use crate::node::Session;
    use crate::node::types::ValueType;

    #[test]
    fn test_conditional_lowers_to_declare_if_assign() {
        let s = Session::new();
        let a = s.uniform("a", ValueType::Float).unwrap();
        let b = s.uniform("b", ValueType::Float).unwrap();
        let cond = s.lt(&a, &b).unwrap();
        let sel = s.conditional(&cond, &a, &b).unwrap();

        let walk = walk(&[&sel]).unwrap();
        let schedule = schedule(&walk, &[&sel]).unwrap();
        let mut ctx = CompilationContext::new(Target::Glsl.syntax());
        let outputs = vec![("o_value".to_string(), &sel)];
        let root = lower(&mut ctx, &schedule, &outputs).unwrap();

        let blocks = ctx.blocks();
        assert_eq!(
            blocks[root.index()],
            vec![
                Statement::Declare {
                    name: "_t0".into(),
                    ty: ValueType::Float
                },
                Statement::If {
                    condition: "u_a < u_b".into(),
                    then_block: BlockId::new(1),
                    else_block: BlockId::new(2),
                },
                Statement::Assign {
                    target: "o_value".into(),
                    value: "_t0".into()
                },
            ]
        );
        assert_eq!(
            blocks[1],
            vec![Statement::Assign {
                target: "_t0".into(),
                value: "u_a".into()
            }]
        );
        assert_eq!(
            blocks[2],
            vec![Statement::Assign {
                target: "_t0".into(),
                value: "u_b".into()
            }]
        );
    }

    #[test]
    fn test_then_branch_temporaries_are_numbered_first() {
        let s = Session::new();
        let x = s.input("x", ValueType::Float).unwrap();
        let flag = s.front_facing();
        let t_shared = s.call(crate::node::ops::Func::Sin, &[&x]).unwrap();
        let t = s.mul(&t_shared, &t_shared).unwrap();
        let e_shared = s.call(crate::node::ops::Func::Cos, &[&x]).unwrap();
        let e = s.mul(&e_shared, &e_shared).unwrap();
        let sel = s.conditional(&flag, &t, &e).unwrap();

        let walk = walk(&[&sel]).unwrap();
        let schedule = schedule(&walk, &[&sel]).unwrap();
        let mut ctx = CompilationContext::new(Target::Glsl.syntax());
        let outputs = vec![("o_value".to_string(), &sel)];
        lower(&mut ctx, &schedule, &outputs).unwrap();

        let blocks = ctx.blocks();
        assert_eq!(
            blocks[1][0],
            Statement::Let {
                name: "_t1".into(),
                ty: ValueType::Float,
                value: "sin(v_x)".into()
            }
        );
        assert_eq!(
            blocks[2][0],
            Statement::Let {
                name: "_t2".into(),
                ty: ValueType::Float,
                value: "cos(v_x)".into()
            }
        );
        assert_eq!(
            blocks[2][1],
            Statement::Assign {
                target: "_t0".into(),
                value: "_t2 * _t2".into()
            }
        );
    }
}
