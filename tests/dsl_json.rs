use std::path::PathBuf;

use node_forge_shader_dag::{Session, Target, compile_program, dsl, validation};

fn case_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("cases")
}

fn compile_case(case_name: &str) -> node_forge_shader_dag::CompiledProgram {
    let path = case_dir().join(format!("{case_name}.json"));
    let graph = dsl::load_graph_from_path(&path).unwrap();
    let session = Session::new();
    let bindings = dsl::build_bindings(&graph, &session).unwrap();
    compile_program(&bindings, &dsl::compile_options(&graph)).unwrap()
}

fn golden(file_name: &str) -> String {
    let path = case_dir().join(file_name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read golden {}: {e}", path.display()))
}

#[test]
fn shared_sum_matches_golden() {
    let program = compile_case("shared_sum");
    assert_eq!(program.target, Target::Wgsl);
    assert_eq!(program.source, golden("shared_sum.module.wgsl"));
    assert_eq!(program.stats.hoisted_bindings, 1);
}

#[test]
fn select_uses_embedded_glsl_options() {
    let program = compile_case("select");
    assert_eq!(program.target, Target::Glsl);
    assert_eq!(program.entry_point, "main");
    assert_eq!(program.source, golden("select.module.glsl"));
    assert_eq!(program.stats.conditionals, 1);
    let names: Vec<&str> = program
        .interface
        .uniforms
        .iter()
        .map(|u| u.name.as_str())
        .collect();
    assert_eq!(names, vec!["a", "b", "x", "y"]);
}

#[test]
fn textured_tint_is_valid_for_both_targets() {
    let path = case_dir().join("textured_tint.json");
    let graph = dsl::load_graph_from_path(&path).unwrap();
    let session = Session::new();
    let bindings = dsl::build_bindings(&graph, &session).unwrap();

    for target in [Target::Wgsl, Target::Glsl] {
        let mut options = dsl::compile_options(&graph);
        options.target = target;
        let program = compile_program(&bindings, &options).unwrap();
        if let Err(e) = validation::validate_with_context(&program.source, target, "textured_tint")
        {
            panic!("{e:#}");
        }
        assert_eq!(program.interface.samplers.len(), 1);
        assert_eq!(program.interface.inputs.len(), 1);
        assert_eq!(program.stats.hoisted_bindings, 2);
    }
}

#[test]
fn reflection_serializes_to_json() {
    let program = compile_case("textured_tint");
    let json = serde_json::to_value(&program).unwrap();
    assert_eq!(json["target"], "wgsl");
    assert_eq!(json["entryPoint"], "fs_main");
    assert_eq!(json["interface"]["samplers"][0]["name"], "albedo");
    assert_eq!(json["interface"]["samplers"][0]["samplerBinding"], 1);
    assert_eq!(json["interface"]["inputs"][0]["location"], 0);
    assert!(json["source"].as_str().unwrap().contains("textureSampleLevel"));
}

#[test]
fn construction_errors_name_the_graph_node() {
    let path = case_dir().join("mismatched_operands.json");
    let graph = dsl::load_graph_from_path(&path).unwrap();
    let session = Session::new();
    let err = dsl::build_bindings(&graph, &session).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("node bad (Add)"), "{msg}");
}

#[test]
fn inline_graph_with_cycle_is_rejected() {
    let graph = dsl::parse_graph(
        r#"{
            "nodes": [
                { "id": "a", "type": "Sin", "operands": ["b"] },
                { "id": "b", "type": "Cos", "operands": ["a"] }
            ],
            "outputs": [ { "slot": "value", "node": "a", "location": 0 } ]
        }"#,
    )
    .unwrap();
    let session = Session::new();
    let err = dsl::build_bindings(&graph, &session).unwrap_err();
    assert!(format!("{err:#}").contains("cycle"));
}
