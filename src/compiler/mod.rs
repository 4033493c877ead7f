//! DAG-to-source compilation.
//!
//! Pipeline per call: validate bindings -> walk the graph -> evaluate literal-only terms
//! -> collect the variable interface -> schedule hoisted statements per scope -> lower into
//! a statement tree -> print the module for the selected target. All state lives in values created by the call.

pub mod context;
pub mod fold;
pub mod interface;
pub mod lowering;
pub mod scheduler;
pub mod types;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::emit::{self, Target};
use crate::error::{CompileError, Error};
use crate::graph;
use crate::node::Node;
use crate::utils::is_valid_identifier;

use context::CompilationContext;
use interface::{OutputBindings, ShaderInterface};

/// Compilation settings. Deserializable so graph JSON files and the CLI can supply them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    pub target: Target,
    /// WGSL entry point name. GLSL always uses `main`.
    pub entry_point: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            target: Target::Wgsl,
            entry_point: "fs_main".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn for_target(target: Target) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileStats {
    pub reachable_nodes: usize,
    pub hoisted_bindings: usize,
    pub conditionals: usize,
    pub temporaries: usize,
}

/// Source text plus reflection data for the generated fragment stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledProgram {
    pub target: Target,
    pub entry_point: String,
    pub source: String,
    pub interface: ShaderInterface,
    pub stats: CompileStats,
}

/// Compile to WGSL with default options.
pub fn compile(bindings: &OutputBindings) -> Result<String, Error> {
    compile_with(bindings, &CompileOptions::default())
}

pub fn compile_with(bindings: &OutputBindings, options: &CompileOptions) -> Result<String, Error> {
    compile_program(bindings, options).map(|program| program.source)
}

/// Compile a set of root bindings. Either the full module is produced or an error naming the
/// offending node; no partial text is ever returned.
pub fn compile_program(
    bindings: &OutputBindings,
    options: &CompileOptions,
) -> Result<CompiledProgram, Error> {
    let entry_point = match options.target {
        Target::Wgsl => options.entry_point.clone(),
        Target::Glsl => "main".to_string(),
    };
    if !is_valid_identifier(&entry_point) {
        return Err(CompileError::InvalidEntryPoint(entry_point).into());
    }
    bindings.validate()?;

    let roots = bindings.roots();
    let walk = graph::walk(&roots)?;
    fold::check_constants(&walk, options.target)?;
    let interface = ShaderInterface::collect(&walk, bindings)?;
    let schedule = scheduler::schedule(&walk, &roots)?;

    let syntax = options.target.syntax();
    let mut ctx = CompilationContext::new(syntax);
    let outputs: Vec<(String, &Node)> = bindings
        .iter()
        .map(|(slot, root)| (syntax.output(slot), root))
        .collect();
    let root = lowering::lower(&mut ctx, &schedule, &outputs)?;

    let body = emit::write_body(syntax, ctx.blocks(), root, 1);
    let source = syntax.write_module(&interface, &entry_point, &body);

    let stats = CompileStats {
        reachable_nodes: walk.len(),
        hoisted_bindings: schedule.hoisted_count(),
        conditionals: schedule.conditional_count(),
        temporaries: ctx.temp_count(),
    };
    debug!(
        "[compile] {} module: {} bytes, {:?}",
        options.target,
        source.len(),
        stats
    );

    Ok(CompiledProgram {
        target: options.target,
        entry_point,
        source,
        interface,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::interface::OutputSlot;
    use crate::node::Session;
    use crate::node::types::ValueType;

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: CompileOptions = serde_json::from_str(r#"{"target":"glsl"}"#).unwrap();
        assert_eq!(opts.target, Target::Glsl);
        assert_eq!(opts.entry_point, "fs_main");
        let opts: CompileOptions = serde_json::from_str(r#"{"entryPoint":"shade"}"#).unwrap();
        assert_eq!(opts.target, Target::Wgsl);
        assert_eq!(opts.entry_point, "shade");
    }

    #[test]
    fn test_invalid_entry_point_is_rejected() {
        let s = Session::new();
        let bindings =
            OutputBindings::new().with(OutputSlot::location("v", 0, ValueType::Float), s.float(1.0));
        let options = CompileOptions {
            target: Target::Wgsl,
            entry_point: "fs main".into(),
        };
        assert!(matches!(
            compile_with(&bindings, &options),
            Err(Error::Compile(CompileError::InvalidEntryPoint(_)))
        ));
    }

    #[test]
    fn test_stats_and_interface_are_reported() {
        let s = Session::new();
        let x = s.uniform("x", ValueType::Float).unwrap();
        let y = s.input("y", ValueType::Float).unwrap();
        let shared = s.mul(&x, &y).unwrap();
        let sum = s.add(&shared, &shared).unwrap();
        let bindings =
            OutputBindings::new().with(OutputSlot::location("v", 0, ValueType::Float), sum);
        let program = compile_program(&bindings, &CompileOptions::for_target(Target::Glsl)).unwrap();
        assert_eq!(program.entry_point, "main");
        assert_eq!(program.stats.reachable_nodes, 4);
        assert_eq!(program.stats.hoisted_bindings, 1);
        assert_eq!(program.stats.temporaries, 1);
        assert_eq!(program.interface.uniforms.len(), 1);
        assert_eq!(program.interface.inputs.len(), 1);
        assert!(program.source.contains("float _t0 = u_x * v_y;"));
        assert!(program.source.contains("o_v = _t0 + _t0;"));
    }
}
