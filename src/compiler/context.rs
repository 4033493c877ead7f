use std::borrow::Cow;
use std::collections::HashMap;

use crate::compiler::types::{BlockId, Statement};
use crate::emit::{Piece, Syntax};
use crate::error::{CompileError, EmissionError, Error, NodeRef};
use crate::node::types::Literal;
use crate::node::{Node, NodeId, NodeKind};
use crate::utils::strip_outer_parens;

/// Per-call mutable state: temporary names, hoisted-node bindings and the statement arena.
///
/// Created fresh by every compile call and dropped with it.
pub struct CompilationContext<'s> {
    syntax: &'s dyn Syntax,
    next_temp: usize,
    names: HashMap<NodeId, String>,
    blocks: Vec<Vec<Statement>>,
}

impl<'s> CompilationContext<'s> {
    pub fn new(syntax: &'s dyn Syntax) -> Self {
        Self {
            syntax,
            next_temp: 0,
            names: HashMap::new(),
            blocks: vec![Vec::new()],
        }
    }

    pub fn syntax(&self) -> &'s dyn Syntax {
        self.syntax
    }

    /// The function-body block every other block nests under.
    pub fn root(&self) -> BlockId {
        BlockId::new(0)
    }

    /// Next temporary name. The `_t` prefix never collides with emitted variable names,
    /// which always start with a letter.
    pub fn fresh_temp(&mut self) -> String {
        let name = format!("_t{}", self.next_temp);
        self.next_temp += 1;
        name
    }

    pub fn temp_count(&self) -> usize {
        self.next_temp
    }

    /// Record that `id` is evaluated once into `name`; later renders use the name.
    pub fn bind(&mut self, id: NodeId, name: String) {
        self.names.insert(id, name);
    }

    #[cfg(test)]
    fn name_of(&self, id: NodeId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn new_block(&mut self) -> BlockId {
        self.blocks.push(Vec::new());
        BlockId::new(self.blocks.len() - 1)
    }

    pub fn push(&mut self, block: BlockId, statement: Statement) {
        self.blocks[block.index()].push(statement);
    }

    pub fn blocks(&self) -> &[Vec<Statement>] {
        &self.blocks
    }

    /// Render a node as expression text.
    ///
    /// Bound nodes become their name; atoms render in place; other terms expand their
    /// operator template. Operands are expanded from an explicit stack, so the cost is linear
    /// in the produced text and independent of nesting depth.
    pub fn render(&self, node: &Node) -> Result<String, Error> {
        enum Work<'n> {
            Node(&'n Node),
            Text(Cow<'static, str>),
        }

        let mut out = String::new();
        let mut stack = vec![Work::Node(node)];
        while let Some(work) = stack.pop() {
            let node = match work {
                Work::Text(text) => {
                    out.push_str(&text);
                    continue;
                }
                Work::Node(node) => node,
            };
            if let Some(name) = self.names.get(&node.id()) {
                out.push_str(name);
                continue;
            }
            match node.kind() {
                NodeKind::Literal(lit) => out.push_str(&self.literal(node, *lit)?),
                NodeKind::Variable(var) => out.push_str(&self.syntax.variable(var)),
                NodeKind::Term(op) => {
                    let operands = node.operands();
                    let pieces = self.syntax.template(op, operands.len());
                    for piece in pieces.into_iter().rev() {
                        stack.push(match piece {
                            Piece::Text(text) => Work::Text(text),
                            Piece::Operand(i) => Work::Node(&operands[i]),
                        });
                    }
                }
                NodeKind::Conditional => {
                    return Err(CompileError::Unscheduled {
                        node: NodeRef::from(node),
                    }
                    .into());
                }
            }
        }
        Ok(out)
    }

    /// Render for use as a whole statement operand, without redundant outer parentheses.
    pub fn render_statement(&self, node: &Node) -> Result<String, Error> {
        let text = self.render(node)?;
        Ok(strip_outer_parens(&text).to_string())
    }

    fn literal(&self, node: &Node, lit: Literal) -> Result<String, EmissionError> {
        self.syntax
            .literal(lit)
            .ok_or_else(|| EmissionError::NonFiniteLiteral {
                node: NodeRef::from(node),
                value: match lit {
                    Literal::Float(v) => v,
                    _ => f32::NAN,
                },
                target: self.syntax.target(),
            })
    }
}
