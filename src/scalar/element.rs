//! Scalar traits mapping Rust types to the runtime type catalog

use super::TypeCode;
use std::ops::{Add, Div, Mul, Sub};

/// Trait for types that can be elements of a sparse matrix or vector
///
/// This trait connects Rust's type system to sparr's runtime type catalog.
/// It is implemented for all built-in numeric types; user-defined element
/// types implement it with `CODE = TypeCode::Custom` and are handled by
/// the generic kernel path with custom operators.
pub trait Scalar: Copy + Clone + Send + Sync + PartialEq + std::fmt::Debug + 'static {
    /// The corresponding TypeCode for this Rust type
    const CODE: TypeCode;

    /// Size of one element in bytes
    #[inline]
    fn byte_size() -> usize {
        std::mem::size_of::<Self>()
    }
}

/// Scalar with the arithmetic surface required by the built-in operator
/// catalog
///
/// Note: `Neg` is NOT required since unsigned types don't support it.
/// Negation is handled via to_f64/from_f64 conversion in the built-in
/// unary operators.
pub trait NumericScalar:
    Scalar
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + PartialOrd
{
    /// Zero value (additive identity)
    fn zero() -> Self;

    /// One value (multiplicative identity)
    fn one() -> Self;

    /// Convert to f64 for generic numeric operations
    fn to_f64(self) -> f64;

    /// Convert from f64 to this type
    fn from_f64(v: f64) -> Self;

    /// Smallest representable value (negative infinity for floats)
    fn min_value() -> Self;

    /// Largest representable value (positive infinity for floats)
    fn max_value() -> Self;
}

impl Scalar for bool {
    const CODE: TypeCode = TypeCode::Bool;
}

macro_rules! impl_numeric_scalar {
    ($t:ty, $code:expr, $zero:expr, $one:expr, $min:expr, $max:expr) => {
        impl Scalar for $t {
            const CODE: TypeCode = $code;
        }

        impl NumericScalar for $t {
            #[inline]
            fn zero() -> Self {
                $zero
            }

            #[inline]
            fn one() -> Self {
                $one
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $t
            }

            #[inline]
            fn min_value() -> Self {
                $min
            }

            #[inline]
            fn max_value() -> Self {
                $max
            }
        }
    };
}

impl_numeric_scalar!(i8, TypeCode::I8, 0, 1, i8::MIN, i8::MAX);
impl_numeric_scalar!(i16, TypeCode::I16, 0, 1, i16::MIN, i16::MAX);
impl_numeric_scalar!(i32, TypeCode::I32, 0, 1, i32::MIN, i32::MAX);
impl_numeric_scalar!(i64, TypeCode::I64, 0, 1, i64::MIN, i64::MAX);
impl_numeric_scalar!(u8, TypeCode::U8, 0, 1, u8::MIN, u8::MAX);
impl_numeric_scalar!(u16, TypeCode::U16, 0, 1, u16::MIN, u16::MAX);
impl_numeric_scalar!(u32, TypeCode::U32, 0, 1, u32::MIN, u32::MAX);
impl_numeric_scalar!(u64, TypeCode::U64, 0, 1, u64::MIN, u64::MAX);
impl_numeric_scalar!(
    f32,
    TypeCode::F32,
    0.0,
    1.0,
    f32::NEG_INFINITY,
    f32::INFINITY
);
impl_numeric_scalar!(
    f64,
    TypeCode::F64,
    0.0,
    1.0,
    f64::NEG_INFINITY,
    f64::INFINITY
);
