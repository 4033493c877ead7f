//! Parse and validate generated shader text with naga.

use anyhow::{Context, Result, anyhow};

use crate::emit::Target;

/// Parse WGSL and run naga's module validator over it.
///
/// # Returns
/// The parsed module on success, or an error quoting the numbered source on failure.
pub fn validate_wgsl(source: &str) -> Result<naga::Module> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| {
        anyhow!(
            "WGSL parse failed:\n{}",
            format_naga_error(source, &e.emit_to_string(source))
        )
    })?;
    run_validator(source, &module, Target::Wgsl)?;
    Ok(module)
}

/// Parse a GLSL 450 fragment shader and run naga's module validator over it.
pub fn validate_glsl(source: &str) -> Result<naga::Module> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options {
        stage: naga::ShaderStage::Fragment,
        defines: Default::default(),
    };
    let module = frontend.parse(&options, source).map_err(|e| {
        anyhow!(
            "GLSL parse failed:\n{}",
            format_naga_error(source, &format!("{e:?}"))
        )
    })?;
    run_validator(source, &module, Target::Glsl)?;
    Ok(module)
}

pub fn validate(source: &str, target: Target) -> Result<naga::Module> {
    match target {
        Target::Wgsl => validate_wgsl(source),
        Target::Glsl => validate_glsl(source),
    }
}

/// Validate and name what produced the source (e.g. a graph file) in the error chain.
pub fn validate_with_context(source: &str, target: Target, context: &str) -> Result<naga::Module> {
    validate(source, target).with_context(|| format!("{context} generated invalid {target}"))
}

fn run_validator(source: &str, module: &naga::Module, target: Target) -> Result<()> {
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(module)
    .map_err(|e| {
        anyhow!(
            "{target} validation failed:\n{}",
            format_naga_error(source, &format!("{e:?}"))
        )
    })?;
    Ok(())
}

/// Error message followed by the line-numbered source.
fn format_naga_error(source: &str, message: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("  {message}\n"));
    output.push_str("\nGenerated source:\n---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_wgsl() {
        let source = r#"
struct FragmentOutput {
    @location(0) o_color: vec4f,
};

@fragment
fn fs_main() -> FragmentOutput {
    var out: FragmentOutput;
    out.o_color = vec4f(1.0, 0.0, 0.0, 1.0);
    return out;
}
"#;
        assert!(validate_wgsl(source).is_ok());
    }

    #[test]
    fn test_invalid_wgsl_type_error() {
        let source = r#"
@fragment
fn fs_main() -> @location(0) vec4f {
    let x: vec4f = 1.0;
    return x;
}
"#;
        assert!(validate_wgsl(source).is_err());
    }

    #[test]
    fn test_valid_glsl() {
        let source = r#"#version 450

layout(location = 0) out vec4 o_color;

void main() {
    o_color = vec4(1.0, 0.0, 0.0, 1.0);
}
"#;
        assert!(validate_glsl(source).is_ok());
    }

    #[test]
    fn test_validate_with_context_names_the_producer() {
        let result = validate_with_context("invalid wgsl", Target::Wgsl, "graph demo.json");
        let err_msg = format!("{:#}", result.unwrap_err());
        assert!(err_msg.contains("graph demo.json"));
        assert!(err_msg.contains("WGSL"));
    }
}
