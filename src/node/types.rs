//! Value types, literal constants and special variables carried by nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type of a node's result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int,
    UInt,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2D,
}

impl ValueType {
    /// Parse a type name as written in graph JSON. Accepts both GLSL and WGSL spellings.
    pub fn parse(s: &str) -> Option<ValueType> {
        let t = s.trim().to_ascii_lowercase();
        let ty = match t.as_str() {
            "bool" | "boolean" => ValueType::Bool,
            "int" | "i32" => ValueType::Int,
            "uint" | "u32" => ValueType::UInt,
            "float" | "f32" | "number" => ValueType::Float,
            "vec2" | "vec2f" | "vector2" => ValueType::Vec2,
            "vec3" | "vec3f" | "vector3" => ValueType::Vec3,
            "vec4" | "vec4f" | "vector4" | "color" => ValueType::Vec4,
            "mat2" | "mat2x2f" => ValueType::Mat2,
            "mat3" | "mat3x3f" => ValueType::Mat3,
            "mat4" | "mat4x4f" => ValueType::Mat4,
            "sampler2d" | "sampler" | "texture" => ValueType::Sampler2D,
            _ => return None,
        };
        Some(ty)
    }

    /// Float vector with `n` components (`n == 1` is the scalar float).
    pub fn float_vector(n: usize) -> Option<ValueType> {
        match n {
            1 => Some(ValueType::Float),
            2 => Some(ValueType::Vec2),
            3 => Some(ValueType::Vec3),
            4 => Some(ValueType::Vec4),
            _ => None,
        }
    }

    /// Number of scalar components; matrices count every element, samplers have none.
    pub fn components(self) -> usize {
        match self {
            ValueType::Bool | ValueType::Int | ValueType::UInt | ValueType::Float => 1,
            ValueType::Vec2 => 2,
            ValueType::Vec3 => 3,
            ValueType::Vec4 | ValueType::Mat2 => 4,
            ValueType::Mat3 => 9,
            ValueType::Mat4 => 16,
            ValueType::Sampler2D => 0,
        }
    }

    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            ValueType::Bool | ValueType::Int | ValueType::UInt | ValueType::Float
        )
    }

    pub fn is_numeric_scalar(self) -> bool {
        matches!(self, ValueType::Int | ValueType::UInt | ValueType::Float)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, ValueType::Int | ValueType::UInt)
    }

    pub fn is_vector(self) -> bool {
        matches!(self, ValueType::Vec2 | ValueType::Vec3 | ValueType::Vec4)
    }

    pub fn is_matrix(self) -> bool {
        matches!(self, ValueType::Mat2 | ValueType::Mat3 | ValueType::Mat4)
    }

    /// Float scalar or float vector: the domain of most builtin math functions.
    pub fn is_float_generic(self) -> bool {
        self == ValueType::Float || self.is_vector()
    }

    /// Column count (and row count) of a square matrix.
    pub fn matrix_dim(self) -> Option<usize> {
        match self {
            ValueType::Mat2 => Some(2),
            ValueType::Mat3 => Some(3),
            ValueType::Mat4 => Some(4),
            _ => None,
        }
    }

    /// Column vector type of a matrix.
    pub fn column_type(self) -> Option<ValueType> {
        self.matrix_dim().and_then(ValueType::float_vector)
    }

    /// Types that can cross the fragment stage interface (inputs and location outputs).
    pub fn is_stage_io(self) -> bool {
        self.is_numeric_scalar() || self.is_vector()
    }

    /// Types that can live in the uniform block.
    pub fn is_uniform_member(self) -> bool {
        self.is_numeric_scalar() || self.is_vector() || self.is_matrix()
    }

    /// WGSL type name for this value type.
    pub fn wgsl(self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "i32",
            ValueType::UInt => "u32",
            ValueType::Float => "f32",
            ValueType::Vec2 => "vec2f",
            ValueType::Vec3 => "vec3f",
            ValueType::Vec4 => "vec4f",
            ValueType::Mat2 => "mat2x2f",
            ValueType::Mat3 => "mat3x3f",
            ValueType::Mat4 => "mat4x4f",
            ValueType::Sampler2D => "texture_2d<f32>",
        }
    }

    /// GLSL type name for this value type.
    pub fn glsl(self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::UInt => "uint",
            ValueType::Float => "float",
            ValueType::Vec2 => "vec2",
            ValueType::Vec3 => "vec3",
            ValueType::Vec4 => "vec4",
            ValueType::Mat2 => "mat2",
            ValueType::Mat3 => "mat3",
            ValueType::Mat4 => "mat4",
            ValueType::Sampler2D => "texture2D",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::UInt => "uint",
            ValueType::Float => "float",
            ValueType::Vec2 => "vec2",
            ValueType::Vec3 => "vec3",
            ValueType::Vec4 => "vec4",
            ValueType::Mat2 => "mat2",
            ValueType::Mat3 => "mat3",
            ValueType::Mat4 => "mat4",
            ValueType::Sampler2D => "sampler2D",
        };
        f.write_str(name)
    }
}

/// A constant scalar value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Literal {
    Float(f32),
    Int(i32),
    UInt(u32),
    Bool(bool),
}

impl Literal {
    pub fn ty(self) -> ValueType {
        match self {
            Literal::Float(_) => ValueType::Float,
            Literal::Int(_) => ValueType::Int,
            Literal::UInt(_) => ValueType::UInt,
            Literal::Bool(_) => ValueType::Bool,
        }
    }
}

/// Fragment-stage builtin inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BuiltinInput {
    /// Window-space position of the fragment (vec4).
    FragCoord,
    /// Whether the primitive faces the viewer (bool).
    FrontFacing,
}

impl BuiltinInput {
    pub fn ty(self) -> ValueType {
        match self {
            BuiltinInput::FragCoord => ValueType::Vec4,
            BuiltinInput::FrontFacing => ValueType::Bool,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinInput::FragCoord => "frag_coord",
            BuiltinInput::FrontFacing => "front_facing",
        }
    }
}

/// A special variable: a value supplied to the program from outside.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Variable {
    /// Interpolated stage input.
    Input(String),
    /// Member of the uniform block.
    Uniform(String),
    /// Texture + sampler pair, usable only as the first operand of `Sample`.
    Sampler(String),
    Builtin(BuiltinInput),
}

impl Variable {
    pub fn role(&self) -> &'static str {
        match self {
            Variable::Input(_) => "input",
            Variable::Uniform(_) => "uniform",
            Variable::Sampler(_) => "sampler",
            Variable::Builtin(_) => "builtin",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Variable::Input(name) | Variable::Uniform(name) | Variable::Sampler(name) => name,
            Variable::Builtin(b) => b.name(),
        }
    }
}
