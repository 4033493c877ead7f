use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use log::info;
use node_forge_shader_dag::{Session, Target, compile_program, dsl, validation};

#[derive(Debug, Default, Clone)]
struct Cli {
    graph_json: Option<PathBuf>,
    target: Option<Target>,
    entry_point: Option<String>,
    output: Option<PathBuf>,
    reflect: bool,
    validate: bool,
}

const USAGE: &str = "supported: --graph-json <graph.json>, --target <wgsl|glsl>, --entry <name>, --output <file>, --reflect, --validate";

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--graph-json" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --graph-json"));
                };
                cli.graph_json = Some(PathBuf::from(v));
                i += 2;
            }
            "--target" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --target"));
                };
                let target = Target::parse(v)
                    .ok_or_else(|| anyhow!("unknown target: {v} (expected wgsl or glsl)"))?;
                cli.target = Some(target);
                i += 2;
            }
            "--entry" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --entry"));
                };
                cli.entry_point = Some(v.clone());
                i += 2;
            }
            "--output" | "-o" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --output"));
                };
                cli.output = Some(PathBuf::from(v));
                i += 2;
            }
            "--reflect" => {
                cli.reflect = true;
                i += 1;
            }
            "--validate" => {
                cli.validate = true;
                i += 1;
            }
            other => {
                return Err(anyhow!("unknown argument: {other} ({USAGE})"));
            }
        }
    }
    Ok(cli)
}

fn run(cli: &Cli) -> Result<()> {
    let path: &Path = cli
        .graph_json
        .as_deref()
        .ok_or_else(|| anyhow!("missing --graph-json ({USAGE})"))?;

    let graph = dsl::load_graph_from_path(path)?;
    let mut options = dsl::compile_options(&graph);
    if let Some(target) = cli.target {
        options.target = target;
    }
    if let Some(entry) = &cli.entry_point {
        options.entry_point = entry.clone();
    }

    let session = Session::new();
    let bindings = dsl::build_bindings(&graph, &session)
        .with_context(|| format!("failed to build graph {}", path.display()))?;
    let program = compile_program(&bindings, &options)
        .with_context(|| format!("failed to compile graph {}", path.display()))?;
    info!(
        "compiled {} node(s) into {} ({} hoisted, {} conditionals)",
        program.stats.reachable_nodes,
        program.target,
        program.stats.hoisted_bindings,
        program.stats.conditionals
    );

    if cli.validate {
        validation::validate_with_context(
            &program.source,
            program.target,
            &format!("graph {}", path.display()),
        )?;
        eprintln!("[shader-dag] {} module is valid", program.target);
    }

    let text = if cli.reflect {
        serde_json::to_string_pretty(&program).context("failed to serialize program")?
    } else {
        program.source
    };

    match &cli.output {
        Some(out) => {
            std::fs::write(out, text)
                .with_context(|| format!("failed to write {}", out.display()))?;
            eprintln!("[shader-dag] wrote {}", out.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let result = parse_cli(&argv).and_then(|cli| run(&cli));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[shader-dag] {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_cli_graph_target_output() {
        let cli = parse_cli(&args(&[
            "--graph-json",
            "graph.json",
            "--target",
            "glsl",
            "--output",
            "out.frag",
            "--validate",
        ]))
        .unwrap();
        assert_eq!(cli.graph_json.as_ref().unwrap(), &PathBuf::from("graph.json"));
        assert_eq!(cli.target, Some(Target::Glsl));
        assert_eq!(cli.output.as_ref().unwrap(), &PathBuf::from("out.frag"));
        assert!(cli.validate);
        assert!(!cli.reflect);
    }

    #[test]
    fn parse_cli_rejects_unknown_flags_and_targets() {
        assert!(parse_cli(&args(&["--headless"])).is_err());
        assert!(parse_cli(&args(&["--target", "hlsl"])).is_err());
        assert!(parse_cli(&args(&["--graph-json"])).is_err());
    }
}
