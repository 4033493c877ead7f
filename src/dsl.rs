//! JSON graph description: loading, tree-shaking, ordering and construction.
//!
//! ```json
//! {
//!   "version": "1",
//!   "metadata": { "name": "tint" },
//!   "nodes": [
//!     { "id": "t", "type": "Uniform", "params": { "name": "time", "valueType": "float" } },
//!     { "id": "s", "type": "Sin", "operands": ["t"] }
//!   ],
//!   "outputs": [ { "slot": "value", "node": "s", "location": 0 } ],
//!   "options": { "target": "wgsl" }
//! }
//! ```
//!
//! Node ids are file-local strings; construction goes through [`Session`], so every node is
//! type checked exactly as if it had been built in code.

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{Context, Result, anyhow, bail};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::compiler::CompileOptions;
use crate::compiler::interface::{OutputBindings, OutputSlot};
use crate::node::ops::Op;
use crate::node::types::ValueType;
use crate::node::{Node, Session};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GraphDSL {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub nodes: Vec<GraphNode>,
    pub outputs: Vec<GraphOutput>,
    #[serde(default)]
    pub options: Option<CompileOptions>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    pub created: Option<String>,
    pub modified: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub operands: Vec<String>,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GraphOutput {
    pub slot: String,
    pub node: String,
    #[serde(default)]
    pub location: Option<u32>,
    /// Expected slot type. Defaults to the bound node's type.
    #[serde(default, rename = "valueType")]
    pub value_type: Option<String>,
    /// `"fragDepth"` binds the depth builtin instead of a location.
    #[serde(default)]
    pub builtin: Option<String>,
}

pub fn parse_graph(text: &str) -> Result<GraphDSL> {
    serde_json::from_str(text).context("failed to parse graph json")
}

pub fn load_graph_from_path(path: impl AsRef<std::path::Path>) -> Result<GraphDSL> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graph json at {}", path.display()))?;
    parse_graph(&text).with_context(|| format!("in {}", path.display()))
}

/// Drops nodes that no output reaches, so editor leftovers never get type checked.
pub fn treeshake_unreachable_nodes(graph: &GraphDSL) -> GraphDSL {
    let by_id: HashMap<&str, &GraphNode> =
        graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut keep: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = graph.outputs.iter().map(|o| o.node.as_str()).collect();
    while let Some(id) = stack.pop() {
        if !keep.insert(id) {
            continue;
        }
        if let Some(node) = by_id.get(id) {
            stack.extend(node.operands.iter().map(String::as_str));
        }
    }

    GraphDSL {
        nodes: graph
            .nodes
            .iter()
            .filter(|n| keep.contains(n.id.as_str()))
            .cloned()
            .collect(),
        ..graph.clone()
    }
}

/// Order node ids so every operand comes before its users, breaking ties by file order.
pub fn topo_sort(graph: &GraphDSL) -> Result<Vec<String>> {
    let mut indeg: HashMap<&str, usize> = HashMap::new();
    for n in &graph.nodes {
        if indeg.insert(n.id.as_str(), 0).is_some() {
            bail!("duplicate node id: {}", n.id);
        }
    }

    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for n in &graph.nodes {
        for operand in &n.operands {
            if !indeg.contains_key(operand.as_str()) {
                bail!("node {} references missing node: {}", n.id, operand);
            }
            outgoing.entry(operand.as_str()).or_default().push(n.id.as_str());
        }
        if let Some(d) = indeg.get_mut(n.id.as_str()) {
            *d += n.operands.len();
        }
    }

    let mut q: VecDeque<&str> = graph
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| indeg.get(id) == Some(&0))
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(graph.nodes.len());

    while let Some(n) = q.pop_front() {
        order.push(n.to_string());
        if let Some(nexts) = outgoing.get(n) {
            for &m in nexts {
                if let Some(entry) = indeg.get_mut(m) {
                    *entry -= 1;
                    if *entry == 0 {
                        q.push_back(m);
                    }
                }
            }
        }
    }

    if order.len() != graph.nodes.len() {
        bail!("cycle detected in graph (cannot topologically sort)");
    }
    Ok(order)
}

/// Options embedded in the graph, or the defaults.
pub fn compile_options(graph: &GraphDSL) -> CompileOptions {
    graph.options.clone().unwrap_or_default()
}

/// Construct every reachable node through `session` and bind the outputs.
pub fn build_bindings(graph: &GraphDSL, session: &Session) -> Result<OutputBindings> {
    let graph = treeshake_unreachable_nodes(graph);
    let order = topo_sort(&graph)?;
    let by_id: HashMap<&str, &GraphNode> =
        graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut built: HashMap<String, Node> = HashMap::new();
    for id in &order {
        let node = find_node(&by_id, id)?;
        let operands: Vec<&Node> = node
            .operands
            .iter()
            .map(|o| built.get(o).ok_or_else(|| anyhow!("operand {o} of {id} not built")))
            .collect::<Result<_>>()?;
        let value = build_node(session, node, &operands)
            .with_context(|| format!("node {} ({})", node.id, node.node_type))?;
        built.insert(id.clone(), value);
    }
    debug!(
        "[dsl] built {} node(s) for graph {:?}",
        built.len(),
        graph.metadata.name
    );

    let mut bindings = OutputBindings::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for output in &graph.outputs {
        let root = built
            .get(&output.node)
            .ok_or_else(|| anyhow!("output {} references missing node: {}", output.slot, output.node))?;
        let slot = output_slot(output, root)?;
        if !seen.insert(slot_key(&slot, output)) {
            bail!("output slot {} is bound twice", output.slot);
        }
        bindings.bind(slot, root.clone());
    }
    Ok(bindings)
}

fn slot_key<'a>(slot: &OutputSlot, output: &'a GraphOutput) -> &'a str {
    match slot.location_index() {
        Some(_) => output.slot.as_str(),
        None => "frag_depth",
    }
}

fn output_slot(output: &GraphOutput, root: &Node) -> Result<OutputSlot> {
    if let Some(builtin) = output.builtin.as_deref() {
        return match builtin {
            "fragDepth" | "frag_depth" => Ok(OutputSlot::frag_depth()),
            other => bail!("output {}: unknown builtin {other}", output.slot),
        };
    }
    let location = output
        .location
        .ok_or_else(|| anyhow!("output {}: missing location", output.slot))?;
    let ty = match output.value_type.as_deref() {
        Some(t) => parse_value_type(t)?,
        None => root.ty(),
    };
    Ok(OutputSlot::location(output.slot.clone(), location, ty))
}

fn build_node(session: &Session, node: &GraphNode, operands: &[&Node]) -> Result<Node> {
    let leaf = |n: Node| -> Result<Node> {
        if !operands.is_empty() {
            bail!("{} takes no operands", node.node_type);
        }
        Ok(n)
    };

    let built = match node.node_type.as_str() {
        "Float" => leaf(session.float(required(parse_f32(&node.params, "value"), "value")?))?,
        "Int" => {
            let v = required(parse_i64(&node.params, "value"), "value")?;
            leaf(session.int(i32::try_from(v).context("value out of range for int")?))?
        }
        "UInt" => leaf(session.uint(required(parse_u32(&node.params, "value"), "value")?))?,
        "Bool" => leaf(session.boolean(required(parse_bool(&node.params, "value"), "value")?))?,
        "Input" => leaf(session.input(name_param(node)?, type_param(node)?)?)?,
        "Uniform" => leaf(session.uniform(name_param(node)?, type_param(node)?)?)?,
        "Sampler" => leaf(session.sampler(name_param(node)?)?)?,
        "FragCoord" => leaf(session.frag_coord())?,
        "FrontFacing" => leaf(session.front_facing())?,
        "Conditional" => {
            let [condition, then, otherwise] = operands else {
                bail!("Conditional expects 3 operands, got {}", operands.len());
            };
            session.conditional(condition, then, otherwise)?
        }
        "Construct" => session.construct(type_param(node)?, operands)?,
        "Cast" => {
            let [value] = operands else {
                bail!("Cast expects 1 operand, got {}", operands.len());
            };
            session.cast(type_param(node)?, value)?
        }
        "Swizzle" => {
            let [value] = operands else {
                bail!("Swizzle expects 1 operand, got {}", operands.len());
            };
            let pattern = required(parse_str(&node.params, "pattern"), "pattern")?;
            session.swizzle(value, pattern)?
        }
        other => {
            let op = Op::from_name(other).ok_or_else(|| anyhow!("unknown node type: {other}"))?;
            session.term(op, operands)?
        }
    };
    Ok(built)
}

pub fn find_node<'a>(by_id: &HashMap<&str, &'a GraphNode>, node_id: &str) -> Result<&'a GraphNode> {
    by_id
        .get(node_id)
        .copied()
        .ok_or_else(|| anyhow!("node not found: {node_id}"))
}

fn required<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("missing or invalid param: {key}"))
}

fn name_param(node: &GraphNode) -> Result<&str> {
    required(parse_str(&node.params, "name"), "name")
}

fn type_param(node: &GraphNode) -> Result<ValueType> {
    parse_value_type(required(parse_str(&node.params, "valueType"), "valueType")?)
}

fn parse_value_type(s: &str) -> Result<ValueType> {
    ValueType::parse(s).ok_or_else(|| anyhow!("unknown value type: {s}"))
}

pub fn parse_f32(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<f32> {
    match params.get(key) {
        Some(v) => v
            .as_f64()
            .map(|x| x as f32)
            .or_else(|| v.as_u64().map(|x| x as f32))
            .or_else(|| v.as_i64().map(|x| x as f32)),
        None => None,
    }
}

pub fn parse_i64(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<i64> {
    params.get(key).and_then(|v| v.as_i64())
}

pub fn parse_u32(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<u32> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
}

pub fn parse_bool(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<bool> {
    params.get(key).and_then(|v| v.as_bool())
}

pub fn parse_str<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}
