//! Small text helpers shared by the builders and the emitters.

/// Format a finite float so both WGSL and GLSL read it as a floating-point literal.
///
/// Uses the shortest round-trip representation and always keeps a fractional marker
/// (`1` becomes `1.0`). Returns `None` for NaN and infinities, which have no literal form.
pub fn fmt_float(v: f32) -> Option<String> {
    if !v.is_finite() {
        return None;
    }
    let mut s = format!("{v:?}");
    if !s.contains(['.', 'e', 'E']) {
        s.push_str(".0");
    } else if s.contains(['e', 'E']) && !s.contains('.') {
        // `1e20` -> `1.0e20`
        if let Some(pos) = s.find(['e', 'E']) {
            s.insert_str(pos, ".0");
        }
    }
    Some(s)
}

/// `[A-Za-z][A-Za-z0-9_]*` without a double underscore (reserved in both targets).
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.contains("__")
}

/// Drop one pair of parentheses that encloses the whole expression, if present.
///
/// `(a + b)` becomes `a + b`; `(a) + (b)` is left alone.
pub fn strip_outer_parens(expr: &str) -> &str {
    let bytes = expr.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'(' || bytes[bytes.len() - 1] != b')' {
        return expr;
    }
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != bytes.len() - 1 {
                    return expr;
                }
            }
            _ => {}
        }
    }
    &expr[1..expr.len() - 1]
}

/// Append `line` at `depth` levels of four-space indentation.
pub fn indent_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str("    ");
    }
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_float_keeps_fraction() {
        assert_eq!(fmt_float(1.0).as_deref(), Some("1.0"));
        assert_eq!(fmt_float(0.25).as_deref(), Some("0.25"));
        assert_eq!(fmt_float(-3.0).as_deref(), Some("-3.0"));
        assert_eq!(fmt_float(0.1).as_deref(), Some("0.1"));
        assert_eq!(fmt_float(1e20).as_deref(), Some("1.0e20"));
        assert_eq!(fmt_float(f32::NAN), None);
        assert_eq!(fmt_float(f32::INFINITY), None);
    }

    #[test]
    fn test_identifiers() {
        assert!(is_valid_identifier("uv"));
        assert!(is_valid_identifier("base_color2"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("_private"));
        assert!(!is_valid_identifier("2d"));
        assert!(!is_valid_identifier("a__b"));
        assert!(!is_valid_identifier("a-b"));
    }

    #[test]
    fn test_strip_outer_parens() {
        assert_eq!(strip_outer_parens("(a + b)"), "a + b");
        assert_eq!(strip_outer_parens("(a) + (b)"), "(a) + (b)");
        assert_eq!(strip_outer_parens("((a + b) * c)"), "(a + b) * c");
        assert_eq!(strip_outer_parens("sin(x)"), "sin(x)");
        assert_eq!(strip_outer_parens("x"), "x");
    }
}
