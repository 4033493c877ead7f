use crate::compiler::interface::{OutputSlot, ShaderInterface, SlotTarget};
use crate::node::ops::Func;
use crate::node::types::{BuiltinInput, Literal, ValueType, Variable};
use crate::utils::fmt_float;

use super::{Syntax, Target};

/// GLSL 450 (Vulkan flavour) fragment shader.
///
/// Uniforms live in one anonymous std140 block at set 0 binding 0 and are read by bare
/// member name. Textures and samplers are separate objects at set 1, combined at the call
/// site with `sampler2D(t, s)`. The entry point is always `main`.
pub struct GlslSyntax;

impl Syntax for GlslSyntax {
    fn target(&self) -> Target {
        Target::Glsl
    }

    fn type_name(&self, ty: ValueType) -> &'static str {
        ty.glsl()
    }

    fn literal(&self, value: Literal) -> Option<String> {
        let text = match value {
            Literal::Float(v) => fmt_float(v)?,
            Literal::Int(i32::MIN) => return Some("(-2147483647 - 1)".to_string()),
            Literal::Int(v) => v.to_string(),
            Literal::UInt(v) => format!("{v}u"),
            Literal::Bool(v) => v.to_string(),
        };
        if text.starts_with('-') {
            Some(format!("({text})"))
        } else {
            Some(text)
        }
    }

    fn variable(&self, var: &Variable) -> String {
        match var {
            Variable::Input(name) => format!("v_{name}"),
            Variable::Uniform(name) => format!("u_{name}"),
            Variable::Sampler(name) => format!("sampler2D(t_{name}, s_{name})"),
            Variable::Builtin(BuiltinInput::FragCoord) => "gl_FragCoord".to_string(),
            Variable::Builtin(BuiltinInput::FrontFacing) => "gl_FrontFacing".to_string(),
        }
    }

    fn func_name(&self, func: Func) -> &'static str {
        match func {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan | Func::Atan2 => "atan",
            Func::Pow => "pow",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Exp2 => "exp2",
            Func::Log2 => "log2",
            Func::Sqrt => "sqrt",
            Func::InverseSqrt => "inversesqrt",
            Func::Abs => "abs",
            Func::Sign => "sign",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Fract => "fract",
            Func::Min => "min",
            Func::Max => "max",
            Func::Clamp => "clamp",
            Func::Mix => "mix",
            Func::Step => "step",
            Func::SmoothStep => "smoothstep",
            Func::Length => "length",
            Func::Distance => "distance",
            Func::Dot => "dot",
            Func::Cross => "cross",
            Func::Normalize => "normalize",
            Func::Reflect => "reflect",
        }
    }

    fn sample_func(&self) -> &'static str {
        "textureLod"
    }

    fn output(&self, slot: &OutputSlot) -> String {
        match slot.target() {
            SlotTarget::Location(_) => format!("o_{}", slot.name()),
            SlotTarget::FragDepth => "gl_FragDepth".to_string(),
        }
    }

    fn let_binding(&self, name: &str, ty: ValueType, value: &str) -> String {
        format!("{} {name} = {value};", ty.glsl())
    }

    fn declaration(&self, name: &str, ty: ValueType) -> String {
        format!("{} {name};", ty.glsl())
    }

    fn write_module(&self, interface: &ShaderInterface, _entry_point: &str, body: &str) -> String {
        let mut sections: Vec<String> = vec!["#version 450\n".to_string()];

        if !interface.inputs.is_empty() {
            let mut s = String::new();
            for input in &interface.inputs {
                let flat = if input.ty.is_integer() { "flat " } else { "" };
                s.push_str(&format!(
                    "layout(location = {}) {flat}in {} v_{};\n",
                    input.location,
                    input.ty.glsl(),
                    input.name
                ));
            }
            sections.push(s);
        }

        if !interface.uniforms.is_empty() {
            let mut s = String::from("layout(std140, set = 0, binding = 0) uniform Uniforms {\n");
            for member in &interface.uniforms {
                s.push_str(&format!("    {} u_{};\n", member.ty.glsl(), member.name));
            }
            s.push_str("};\n");
            sections.push(s);
        }

        if !interface.samplers.is_empty() {
            let mut s = String::new();
            for sampler in &interface.samplers {
                s.push_str(&format!(
                    "layout(set = 1, binding = {}) uniform texture2D t_{};\n",
                    sampler.texture_binding, sampler.name
                ));
                s.push_str(&format!(
                    "layout(set = 1, binding = {}) uniform sampler s_{};\n",
                    sampler.sampler_binding, sampler.name
                ));
            }
            sections.push(s);
        }

        let mut s = String::new();
        for slot in &interface.outputs {
            if let SlotTarget::Location(location) = slot.target() {
                s.push_str(&format!(
                    "layout(location = {location}) out {} o_{};\n",
                    slot.ty().glsl(),
                    slot.name()
                ));
            }
        }
        if !s.is_empty() {
            sections.push(s);
        }

        sections.push(format!("void main() {{\n{body}}}\n"));
        sections.join("\n")
    }
}
