use node_forge_shader_dag::validation;
use node_forge_shader_dag::{
    CompileOptions, Func, Node, OutputBindings, OutputSlot, Session, Target, ValueType,
    compile_with,
};

fn assert_valid(bindings: &OutputBindings, target: Target) {
    let source = compile_with(bindings, &CompileOptions::for_target(target)).unwrap();
    if let Err(e) = validation::validate(&source, target) {
        panic!("{e:#}");
    }
}

fn assert_valid_everywhere(bindings: &OutputBindings) {
    assert_valid(bindings, Target::Wgsl);
    assert_valid(bindings, Target::Glsl);
}

fn float_out(root: Node) -> OutputBindings {
    OutputBindings::new().with(OutputSlot::location("value", 0, ValueType::Float), root)
}

#[test]
fn shared_arithmetic_is_valid() {
    let s = Session::new();
    let t = s.add(&s.float(2.0), &s.float(3.0)).unwrap();
    let left = s.add(&s.float(1.0), &t).unwrap();
    let right = s.add(&t, &t).unwrap();
    assert_valid_everywhere(&float_out(s.add(&left, &right).unwrap()));
}

#[test]
fn nested_conditionals_are_valid() {
    let s = Session::new();
    let a = s.uniform("a", ValueType::Float).unwrap();
    let b = s.uniform("b", ValueType::Float).unwrap();
    let x = s.input("x", ValueType::Float).unwrap();
    let shared = s.mul(&x, &a).unwrap();
    let inner_cond = s.gt(&shared, &b).unwrap();
    let inner = s
        .conditional(&inner_cond, &s.add(&shared, &shared).unwrap(), &b)
        .unwrap();
    let outer_cond = s.lt(&a, &b).unwrap();
    let root = s
        .conditional(&outer_cond, &inner, &s.neg(&shared).unwrap())
        .unwrap();
    assert_valid_everywhere(&float_out(root));
}

#[test]
fn vector_color_pipeline_is_valid() {
    let s = Session::new();
    let uv = s.input("uv", ValueType::Vec2).unwrap();
    let time = s.uniform("time", ValueType::Float).unwrap();
    let tint = s.uniform("tint", ValueType::Vec4).unwrap();
    let phase = s.add(&s.swizzle(&uv, "x").unwrap(), &time).unwrap();
    let wave = s.call(Func::Sin, &[&phase]).unwrap();
    let rgb = s
        .construct(
            ValueType::Vec3,
            &[&wave, &s.call(Func::Cos, &[&phase]).unwrap(), &s.float(0.5)],
        )
        .unwrap();
    let lit = s
        .call(Func::Normalize, &[&s.mul(&rgb, &wave).unwrap()])
        .unwrap();
    let bright = s.ge(&wave, &s.float(0.0)).unwrap();
    let pick = s.conditional(&bright, &lit, &rgb).unwrap();
    let color = s
        .mul(
            &s.construct(ValueType::Vec4, &[&pick, &s.float(1.0)]).unwrap(),
            &tint,
        )
        .unwrap();
    let bindings = OutputBindings::new().with(OutputSlot::color("color", 0), color);
    assert_valid_everywhere(&bindings);
}

#[test]
fn integer_inputs_and_casts_are_valid() {
    let s = Session::new();
    let id = s.input("id", ValueType::Int).unwrap();
    let bucket = s.rem(&id, &s.int(4)).unwrap();
    let is_even = s.eq(&s.rem(&id, &s.int(2)).unwrap(), &s.int(0)).unwrap();
    let scaled = s
        .div(&s.cast(ValueType::Float, &bucket).unwrap(), &s.float(-4.0))
        .unwrap();
    let root = s.conditional(&is_even, &scaled, &s.float(1.0)).unwrap();
    assert_valid_everywhere(&float_out(root));
}

#[test]
fn texture_sampling_is_valid() {
    let s = Session::new();
    let albedo = s.sampler("albedo").unwrap();
    let mask = s.sampler("mask").unwrap();
    let uv = s.input("uv", ValueType::Vec2).unwrap();
    let base = s.sample(&albedo, &uv).unwrap();
    let weight = s.swizzle(&s.sample(&mask, &uv).unwrap(), "r").unwrap();
    let color = s.mul(&base, &weight).unwrap();
    let bindings = OutputBindings::new().with(OutputSlot::color("color", 0), color);
    assert_valid_everywhere(&bindings);
}

#[test]
fn multiple_color_outputs_are_valid() {
    let s = Session::new();
    let tint = s.uniform("tint", ValueType::Vec4).unwrap();
    let inverted = s.sub(&s.float(1.0), &tint).unwrap();
    let bindings = OutputBindings::new()
        .with(OutputSlot::color("color", 0), tint)
        .with(OutputSlot::color("inverse", 1), inverted);
    assert_valid_everywhere(&bindings);
}

#[test]
fn fragment_builtins_are_valid_wgsl() {
    let s = Session::new();
    let coord = s.frag_coord();
    let facing = s.front_facing();
    let shade = s
        .conditional(&facing, &s.swizzle(&coord, "x").unwrap(), &s.float(0.0))
        .unwrap();
    let color = s
        .construct(ValueType::Vec4, &[&shade, &shade, &shade, &s.float(1.0)])
        .unwrap();
    let bindings = OutputBindings::new()
        .with(OutputSlot::color("color", 0), color)
        .with(OutputSlot::frag_depth(), s.swizzle(&coord, "z").unwrap());
    assert_valid(&bindings, Target::Wgsl);
}

#[test]
fn frag_coord_is_valid_glsl() {
    let s = Session::new();
    let coord = s.frag_coord();
    let uv = s.div(&s.swizzle(&coord, "xy").unwrap(), &s.float(512.0)).unwrap();
    let color = s
        .construct(ValueType::Vec4, &[&uv, &s.float(0.0), &s.float(1.0)])
        .unwrap();
    let bindings = OutputBindings::new().with(OutputSlot::color("color", 0), color);
    assert_valid(&bindings, Target::Glsl);
}

#[test]
fn literal_only_arithmetic_is_valid() {
    let s = Session::new();
    let half = s
        .cast(ValueType::Float, &s.div(&s.int(7), &s.int(2)).unwrap())
        .unwrap();
    let rest = s
        .cast(ValueType::Float, &s.rem(&s.uint(10), &s.uint(3)).unwrap())
        .unwrap();
    let root = s
        .add(&s.add(&half, &rest).unwrap(), &s.call(Func::Sqrt, &[&s.float(16.0)]).unwrap())
        .unwrap();
    assert_valid_everywhere(&float_out(root));
}
