use crate::compiler::interface::{OutputSlot, ShaderInterface, SlotTarget};
use crate::node::ops::Func;
use crate::node::types::{BuiltinInput, Literal, ValueType, Variable};
use crate::utils::fmt_float;

use super::{Syntax, Target};

/// WGSL fragment module layout.
///
/// ```text
/// struct Uniforms { u_<name>: T, ... };            @group(0) @binding(0)
/// t_<name>: texture_2d<f32>, s_<name>: sampler      @group(1) @binding(2i), @binding(2i + 1)
/// struct FragmentInput { builtins, @location(n) v_<name>: T, ... };
/// struct FragmentOutput { @location(n) o_<name>: T, @builtin(frag_depth) frag_depth: f32 };
/// ```
pub struct WgslSyntax;

impl Syntax for WgslSyntax {
    fn target(&self) -> Target {
        Target::Wgsl
    }

    fn type_name(&self, ty: ValueType) -> &'static str {
        ty.wgsl()
    }

    fn literal(&self, value: Literal) -> Option<String> {
        let text = match value {
            Literal::Float(v) => fmt_float(v)?,
            // `-2147483648i` would negate an out-of-range i32 literal.
            Literal::Int(i32::MIN) => return Some("i32(-2147483648)".to_string()),
            Literal::Int(v) => format!("{v}i"),
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
            Variable::Input(name) => format!("in.v_{name}"),
            Variable::Uniform(name) => format!("uniforms.u_{name}"),
            Variable::Sampler(name) => format!("t_{name}, s_{name}"),
            Variable::Builtin(builtin) => format!("in.{}", builtin.name()),
        }
    }

    fn func_name(&self, func: Func) -> &'static str {
        match func {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Atan2 => "atan2",
            Func::Pow => "pow",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Exp2 => "exp2",
            Func::Log2 => "log2",
            Func::Sqrt => "sqrt",
            Func::InverseSqrt => "inverseSqrt",
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
        "textureSampleLevel"
    }

    fn output(&self, slot: &OutputSlot) -> String {
        match slot.target() {
            SlotTarget::Location(_) => format!("out.o_{}", slot.name()),
            SlotTarget::FragDepth => "out.frag_depth".to_string(),
        }
    }

    fn let_binding(&self, name: &str, ty: ValueType, value: &str) -> String {
        format!("let {name}: {} = {value};", ty.wgsl())
    }

    fn declaration(&self, name: &str, ty: ValueType) -> String {
        format!("var {name}: {};", ty.wgsl())
    }

    fn write_module(&self, interface: &ShaderInterface, entry_point: &str, body: &str) -> String {
        let mut sections: Vec<String> = Vec::new();

        if !interface.uniforms.is_empty() {
            let mut s = String::from("struct Uniforms {\n");
            for member in &interface.uniforms {
                s.push_str(&format!("    u_{}: {},\n", member.name, member.ty.wgsl()));
            }
            s.push_str("};\n\n@group(0) @binding(0)\nvar<uniform> uniforms: Uniforms;\n");
            sections.push(s);
        }

        if !interface.samplers.is_empty() {
            let mut s = String::new();
            for sampler in &interface.samplers {
                s.push_str(&format!(
                    "@group(1) @binding({})\nvar t_{}: texture_2d<f32>;\n",
                    sampler.texture_binding, sampler.name
                ));
                s.push_str(&format!(
                    "@group(1) @binding({})\nvar s_{}: sampler;\n",
                    sampler.sampler_binding, sampler.name
                ));
            }
            sections.push(s);
        }

        if interface.has_stage_inputs() {
            let mut s = String::from("struct FragmentInput {\n");
            if interface.uses(BuiltinInput::FragCoord) {
                s.push_str("    @builtin(position) frag_coord: vec4f,\n");
            }
            if interface.uses(BuiltinInput::FrontFacing) {
                s.push_str("    @builtin(front_facing) front_facing: bool,\n");
            }
            for input in &interface.inputs {
                let interpolate = if input.ty.is_integer() {
                    " @interpolate(flat)"
                } else {
                    ""
                };
                s.push_str(&format!(
                    "    @location({}){interpolate} v_{}: {},\n",
                    input.location,
                    input.name,
                    input.ty.wgsl()
                ));
            }
            s.push_str("};\n");
            sections.push(s);
        }

        let mut s = String::from("struct FragmentOutput {\n");
        for slot in &interface.outputs {
            match slot.target() {
                SlotTarget::Location(location) => s.push_str(&format!(
                    "    @location({location}) o_{}: {},\n",
                    slot.name(),
                    slot.ty().wgsl()
                )),
                SlotTarget::FragDepth => s.push_str("    @builtin(frag_depth) frag_depth: f32,\n"),
            }
        }
        s.push_str("};\n");
        sections.push(s);

        let params = if interface.has_stage_inputs() {
            "in: FragmentInput"
        } else {
            ""
        };
        sections.push(format!(
            "@fragment\nfn {entry_point}({params}) -> FragmentOutput {{\n    var out: FragmentOutput;\n{body}    return out;\n}}\n"
        ));

        sections.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        let w = WgslSyntax;
        assert_eq!(w.literal(Literal::Float(1.0)).unwrap(), "1.0");
        assert_eq!(w.literal(Literal::Float(-0.5)).unwrap(), "(-0.5)");
        assert_eq!(w.literal(Literal::Int(3)).unwrap(), "3i");
        assert_eq!(w.literal(Literal::Int(-3)).unwrap(), "(-3i)");
        assert_eq!(w.literal(Literal::Int(i32::MIN)).unwrap(), "i32(-2147483648)");
        assert_eq!(w.literal(Literal::UInt(7)).unwrap(), "7u");
        assert_eq!(w.literal(Literal::Bool(false)).unwrap(), "false");
        assert_eq!(w.literal(Literal::Float(f32::NAN)), None);
    }

    #[test]
    fn test_variable_access() {
        let w = WgslSyntax;
        assert_eq!(w.variable(&Variable::Input("uv".into())), "in.v_uv");
        assert_eq!(w.variable(&Variable::Uniform("time".into())), "uniforms.u_time");
        assert_eq!(
            w.variable(&Variable::Builtin(BuiltinInput::FragCoord)),
            "in.frag_coord"
        );
        assert_eq!(w.output(&OutputSlot::frag_depth()), "out.frag_depth");
        assert_eq!(w.output(&OutputSlot::color("color", 0)), "out.o_color");
    }
}
