//! Output slots, root bindings and the special-variable interface of a compiled program.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::error::{CompileError, NodeRef};
use crate::graph::GraphWalk;
use crate::node::types::{BuiltinInput, ValueType, Variable};
use crate::node::{Node, NodeKind};
use crate::utils::is_valid_identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotTarget {
    /// User-declared output at a framebuffer location.
    Location(u32),
    /// The fragment depth builtin.
    FragDepth,
}

/// A named, typed output of the fragment stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSlot {
    name: String,
    ty: ValueType,
    target: SlotTarget,
}

impl OutputSlot {
    pub fn location(name: impl Into<String>, location: u32, ty: ValueType) -> Self {
        OutputSlot {
            name: name.into(),
            ty,
            target: SlotTarget::Location(location),
        }
    }

    /// Shorthand for a vec4 color attachment.
    pub fn color(name: impl Into<String>, location: u32) -> Self {
        Self::location(name, location, ValueType::Vec4)
    }

    pub fn frag_depth() -> Self {
        OutputSlot {
            name: "frag_depth".to_string(),
            ty: ValueType::Float,
            target: SlotTarget::FragDepth,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> ValueType {
        self.ty
    }

    pub fn target(&self) -> SlotTarget {
        self.target
    }

    pub fn location_index(&self) -> Option<u32> {
        match self.target {
            SlotTarget::Location(l) => Some(l),
            SlotTarget::FragDepth => None,
        }
    }

    fn check(&self) -> Result<(), CompileError> {
        let invalid = |reason: String| CompileError::InvalidOutputSlot {
            slot: self.name.clone(),
            reason,
        };
        if !is_valid_identifier(&self.name) {
            return Err(invalid("name must match [A-Za-z][A-Za-z0-9_]* without \"__\"".into()));
        }
        match self.target {
            SlotTarget::Location(_) if !self.ty.is_stage_io() => {
                Err(invalid(format!("{} cannot be written to a color location", self.ty)))
            }
            SlotTarget::FragDepth if self.ty != ValueType::Float => {
                Err(invalid(format!("frag depth is float, not {}", self.ty)))
            }
            _ => Ok(()),
        }
    }
}

/// Mapping from output slot to the root node computing it, ordered by slot name.
#[derive(Debug, Clone, Default)]
pub struct OutputBindings {
    slots: BTreeMap<String, (OutputSlot, Node)>,
}

impl OutputBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `root` to `slot`, replacing any previous binding of a slot with the same name.
    pub fn bind(&mut self, slot: OutputSlot, root: Node) -> &mut Self {
        self.slots.insert(slot.name.clone(), (slot, root));
        self
    }

    pub fn with(mut self, slot: OutputSlot, root: Node) -> Self {
        self.bind(slot, root);
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutputSlot, &Node)> {
        self.slots.values().map(|(slot, node)| (slot, node))
    }

    pub fn roots(&self) -> Vec<&Node> {
        self.slots.values().map(|(_, node)| node).collect()
    }

    /// Check slot names and types, root types and location uniqueness.
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.slots.is_empty() {
            return Err(CompileError::NoOutputs);
        }
        let mut locations: HashMap<u32, &str> = HashMap::new();
        for (slot, root) in self.iter() {
            slot.check()?;
            if root.ty() != slot.ty {
                return Err(CompileError::OutputTypeMismatch {
                    slot: slot.name.clone(),
                    expected: slot.ty,
                    found: root.ty(),
                    node: NodeRef::from(root),
                });
            }
            if let Some(location) = slot.location_index() {
                if let Some(first) = locations.insert(location, &slot.name) {
                    return Err(CompileError::DuplicateLocation {
                        first: first.to_string(),
                        second: slot.name.clone(),
                        location,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBinding {
    pub name: String,
    pub ty: ValueType,
    pub location: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniformMember {
    pub name: String,
    pub ty: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerBinding {
    pub name: String,
    pub texture_binding: u32,
    pub sampler_binding: u32,
}

/// Every special variable a program reads or writes, in declaration order.
///
/// Inputs get locations and samplers get binding pairs in name order, so the layout depends
/// only on which variables are reachable, not on graph shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShaderInterface {
    pub inputs: Vec<InputBinding>,
    pub uniforms: Vec<UniformMember>,
    pub samplers: Vec<SamplerBinding>,
    pub builtins: Vec<BuiltinInput>,
    pub outputs: Vec<OutputSlot>,
}

impl ShaderInterface {
    pub fn collect(walk: &GraphWalk, bindings: &OutputBindings) -> Result<Self, CompileError> {
        let mut registry = VariableRegistry::default();
        for node in walk.order() {
            if let NodeKind::Variable(var) = node.kind() {
                registry.register(var, node)?;
            }
        }
        Ok(registry.into_interface(bindings))
    }

    pub fn uses(&self, builtin: BuiltinInput) -> bool {
        self.builtins.contains(&builtin)
    }

    /// True if the entry point takes a stage-input parameter.
    pub fn has_stage_inputs(&self) -> bool {
        !self.inputs.is_empty() || !self.builtins.is_empty()
    }
}

#[derive(Default)]
struct VariableRegistry {
    inputs: BTreeMap<String, ValueType>,
    uniforms: BTreeMap<String, ValueType>,
    samplers: BTreeSet<String>,
    builtins: Vec<BuiltinInput>,
}

impl VariableRegistry {
    fn register(&mut self, var: &Variable, node: &Node) -> Result<(), CompileError> {
        match var {
            Variable::Input(name) => register_typed(&mut self.inputs, "input", name, node),
            Variable::Uniform(name) => register_typed(&mut self.uniforms, "uniform", name, node),
            Variable::Sampler(name) => {
                self.samplers.insert(name.clone());
                Ok(())
            }
            Variable::Builtin(builtin) => {
                if !self.builtins.contains(builtin) {
                    self.builtins.push(*builtin);
                }
                Ok(())
            }
        }
    }

    fn into_interface(mut self, bindings: &OutputBindings) -> ShaderInterface {
        self.builtins.sort_by_key(|b| match b {
            BuiltinInput::FragCoord => 0,
            BuiltinInput::FrontFacing => 1,
        });
        ShaderInterface {
            inputs: self
                .inputs
                .into_iter()
                .enumerate()
                .map(|(i, (name, ty))| InputBinding {
                    name,
                    ty,
                    location: i as u32,
                })
                .collect(),
            uniforms: self
                .uniforms
                .into_iter()
                .map(|(name, ty)| UniformMember { name, ty })
                .collect(),
            samplers: self
                .samplers
                .into_iter()
                .enumerate()
                .map(|(i, name)| SamplerBinding {
                    name,
                    texture_binding: 2 * i as u32,
                    sampler_binding: 2 * i as u32 + 1,
                })
                .collect(),
            builtins: self.builtins,
            outputs: bindings.iter().map(|(slot, _)| slot.clone()).collect(),
        }
    }
}

fn register_typed(
    registry: &mut BTreeMap<String, ValueType>,
    role: &'static str,
    name: &str,
    node: &Node,
) -> Result<(), CompileError> {
    match registry.get(name) {
        Some(&ty) if ty != node.ty() => Err(CompileError::ConflictingVariable {
            role,
            name: name.to_string(),
            first: ty,
            second: node.ty(),
            node: NodeRef::from(node),
        }),
        Some(_) => Ok(()),
        None => {
            registry.insert(name.to_string(), node.ty());
            Ok(())
        }
    }
}
