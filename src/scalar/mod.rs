//! Element types and the runtime type catalog
//!
//! The engine identifies element types at runtime through [`TypeCode`]: a
//! closed enumeration of the built-in numeric types plus one opaque tag for
//! user-defined types. The [`Scalar`] trait connects a Rust type to its code;
//! [`NumericScalar`] adds the arithmetic surface the built-in operator
//! catalog needs. User types only implement `Scalar` and participate through
//! custom operators.

mod element;

pub use element::{NumericScalar, Scalar};

/// Runtime identity of an element type
///
/// Built-in codes carry a known byte size; `Custom` is the opaque tag for
/// user-defined element types, which are always handled by the generic
/// kernel path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// Boolean
    Bool,
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Opaque user-defined type
    Custom,
}

impl TypeCode {
    /// Byte size of the type, if it is a built-in code
    pub fn size_in_bytes(&self) -> Option<usize> {
        match self {
            TypeCode::Bool | TypeCode::I8 | TypeCode::U8 => Some(1),
            TypeCode::I16 | TypeCode::U16 => Some(2),
            TypeCode::I32 | TypeCode::U32 | TypeCode::F32 => Some(4),
            TypeCode::I64 | TypeCode::U64 | TypeCode::F64 => Some(8),
            TypeCode::Custom => None,
        }
    }

    /// Returns true for the built-in codes covered by the specialized
    /// kernel catalog
    #[inline]
    pub fn is_builtin(&self) -> bool {
        !matches!(self, TypeCode::Custom)
    }

    /// Returns true for floating-point codes
    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, TypeCode::F32 | TypeCode::F64)
    }

    /// Returns the code name as a string
    pub fn name(&self) -> &'static str {
        match self {
            TypeCode::Bool => "bool",
            TypeCode::I8 => "i8",
            TypeCode::I16 => "i16",
            TypeCode::I32 => "i32",
            TypeCode::I64 => "i64",
            TypeCode::U8 => "u8",
            TypeCode::U16 => "u16",
            TypeCode::U32 => "u32",
            TypeCode::U64 => "u64",
            TypeCode::F32 => "f32",
            TypeCode::F64 => "f64",
            TypeCode::Custom => "custom",
        }
    }
}

impl std::fmt::Display for TypeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
