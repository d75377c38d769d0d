//! Binary operators: built-in catalog plus user-defined callables

use crate::scalar::{NumericScalar, Scalar, TypeCode};
use std::sync::Arc;

/// The closed enumeration of built-in binary operators
///
/// Logical operators (`Lor`, `Land`, `Lxor`) treat any nonzero value as
/// true and produce zero/one, so they are meaningful over the small
/// integer types; `supports` restricts them accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinBinary {
    /// z = x
    First,
    /// z = y
    Second,
    /// z = x + y
    Plus,
    /// z = x - y
    Minus,
    /// z = x * y
    Times,
    /// z = x / y; integer division by zero saturates (0/0 = 0)
    Div,
    /// z = min(x, y)
    Min,
    /// z = max(x, y)
    Max,
    /// z = x || y (nonzero = true)
    Lor,
    /// z = x && y (nonzero = true)
    Land,
    /// z = x != y (as zero/one)
    Lxor,
}

impl BuiltinBinary {
    /// Apply the operator to two values of a numeric type
    #[inline]
    pub fn apply<T: NumericScalar>(self, x: T, y: T) -> T {
        match self {
            BuiltinBinary::First => x,
            BuiltinBinary::Second => y,
            BuiltinBinary::Plus => x + y,
            BuiltinBinary::Minus => x - y,
            BuiltinBinary::Times => x * y,
            BuiltinBinary::Div => {
                // total over the integers: x/0 saturates toward x's sign,
                // 0/0 is 0; floats keep IEEE semantics
                if T::CODE.is_float() || y != T::zero() {
                    x / y
                } else if x == T::zero() {
                    T::zero()
                } else if x < T::zero() {
                    T::min_value()
                } else {
                    T::max_value()
                }
            }
            BuiltinBinary::Min => {
                if y < x {
                    y
                } else {
                    x
                }
            }
            BuiltinBinary::Max => {
                if y > x {
                    y
                } else {
                    x
                }
            }
            BuiltinBinary::Lor => {
                if x.to_f64() != 0.0 || y.to_f64() != 0.0 {
                    T::one()
                } else {
                    T::zero()
                }
            }
            BuiltinBinary::Land => {
                if x.to_f64() != 0.0 && y.to_f64() != 0.0 {
                    T::one()
                } else {
                    T::zero()
                }
            }
            BuiltinBinary::Lxor => {
                if (x.to_f64() != 0.0) != (y.to_f64() != 0.0) {
                    T::one()
                } else {
                    T::zero()
                }
            }
        }
    }

    /// Whether this operator is defined for a given type code
    pub fn supports(self, code: TypeCode) -> bool {
        match self {
            BuiltinBinary::Lor | BuiltinBinary::Land | BuiltinBinary::Lxor => {
                matches!(code, TypeCode::Bool | TypeCode::U8 | TypeCode::I8)
            }
            BuiltinBinary::Div => !matches!(code, TypeCode::Bool | TypeCode::Custom),
            _ => code.is_builtin(),
        }
    }

    /// Operator name for display/debug
    pub fn name(self) -> &'static str {
        match self {
            BuiltinBinary::First => "first",
            BuiltinBinary::Second => "second",
            BuiltinBinary::Plus => "plus",
            BuiltinBinary::Minus => "minus",
            BuiltinBinary::Times => "times",
            BuiltinBinary::Div => "div",
            BuiltinBinary::Min => "min",
            BuiltinBinary::Max => "max",
            BuiltinBinary::Lor => "lor",
            BuiltinBinary::Land => "land",
            BuiltinBinary::Lxor => "lxor",
        }
    }
}

/// How an operator was defined: from the built-in catalog, or by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// One of the built-in catalog operators
    Builtin(BuiltinBinary),
    /// User-defined callable
    Custom,
}

enum BinFn<T> {
    // Monomorphized function pointer: the specialized call path.
    Ptr(fn(T, T) -> T),
    // Boxed callable: the generic call path (always valid).
    Boxed(Arc<dyn Fn(T, T) -> T + Send + Sync>),
}

impl<T> Clone for BinFn<T> {
    fn clone(&self) -> Self {
        match self {
            BinFn::Ptr(p) => BinFn::Ptr(*p),
            BinFn::Boxed(f) => BinFn::Boxed(f.clone()),
        }
    }
}

/// A binary operator `T x T -> T`
///
/// Built-in constructors (`plus`, `times`, ...) exist for numeric element
/// types and record their catalog kind so kernels can specialize; `custom`
/// accepts any callable over any [`Scalar`] type and always runs through
/// the generic path. Cloning is cheap.
pub struct BinaryOp<T: Scalar> {
    kind: OpKind,
    f: BinFn<T>,
}

impl<T: Scalar> Clone for BinaryOp<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            f: self.f.clone(),
        }
    }
}

impl<T: Scalar> std::fmt::Debug for BinaryOp<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            OpKind::Builtin(b) => write!(f, "BinaryOp({})", b.name()),
            OpKind::Custom => write!(f, "BinaryOp(custom)"),
        }
    }
}

impl<T: Scalar> BinaryOp<T> {
    /// Create an operator from a user-defined callable
    pub fn custom(f: impl Fn(T, T) -> T + Send + Sync + 'static) -> Self {
        Self {
            kind: OpKind::Custom,
            f: BinFn::Boxed(Arc::new(f)),
        }
    }

    /// The catalog kind of this operator
    #[inline]
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    /// Apply the operator
    #[inline]
    pub fn call(&self, x: T, y: T) -> T {
        match &self.f {
            BinFn::Ptr(p) => p(x, y),
            BinFn::Boxed(f) => f(x, y),
        }
    }

    /// A copy of this operator forced onto the generic (indirect) call
    /// path; observable output is identical. Used when kernel
    /// specialization is disabled.
    pub(crate) fn degraded(&self) -> Self {
        match &self.f {
            BinFn::Ptr(p) => {
                let p = *p;
                Self {
                    kind: self.kind,
                    f: BinFn::Boxed(Arc::new(move |x, y| p(x, y))),
                }
            }
            BinFn::Boxed(_) => self.clone(),
        }
    }

    /// Whether this operator is valid over the given type code
    pub fn supports(&self, code: TypeCode) -> bool {
        match self.kind {
            OpKind::Builtin(b) => b.supports(code),
            OpKind::Custom => true,
        }
    }
}

fn builtin_fn<T: NumericScalar>(op: BuiltinBinary) -> fn(T, T) -> T {
    // One monomorphized fn per (type, operator) pair; the enum match is
    // resolved before the hot loop runs.
    match op {
        BuiltinBinary::First => |x, _| x,
        BuiltinBinary::Second => |_, y| y,
        BuiltinBinary::Plus => |x, y| BuiltinBinary::Plus.apply(x, y),
        BuiltinBinary::Minus => |x, y| BuiltinBinary::Minus.apply(x, y),
        BuiltinBinary::Times => |x, y| BuiltinBinary::Times.apply(x, y),
        BuiltinBinary::Div => |x, y| BuiltinBinary::Div.apply(x, y),
        BuiltinBinary::Min => |x, y| BuiltinBinary::Min.apply(x, y),
        BuiltinBinary::Max => |x, y| BuiltinBinary::Max.apply(x, y),
        BuiltinBinary::Lor => |x, y| BuiltinBinary::Lor.apply(x, y),
        BuiltinBinary::Land => |x, y| BuiltinBinary::Land.apply(x, y),
        BuiltinBinary::Lxor => |x, y| BuiltinBinary::Lxor.apply(x, y),
    }
}

impl<T: NumericScalar> BinaryOp<T> {
    /// Create a built-in catalog operator
    pub fn builtin(op: BuiltinBinary) -> Self {
        Self {
            kind: OpKind::Builtin(op),
            f: BinFn::Ptr(builtin_fn::<T>(op)),
        }
    }

    /// z = x
    pub fn first() -> Self {
        Self::builtin(BuiltinBinary::First)
    }

    /// z = y
    pub fn second() -> Self {
        Self::builtin(BuiltinBinary::Second)
    }

    /// z = x + y
    pub fn plus() -> Self {
        Self::builtin(BuiltinBinary::Plus)
    }

    /// z = x - y
    pub fn minus() -> Self {
        Self::builtin(BuiltinBinary::Minus)
    }

    /// z = x * y
    pub fn times() -> Self {
        Self::builtin(BuiltinBinary::Times)
    }

    /// z = x / y
    pub fn div() -> Self {
        Self::builtin(BuiltinBinary::Div)
    }

    /// z = min(x, y)
    pub fn min() -> Self {
        Self::builtin(BuiltinBinary::Min)
    }

    /// z = max(x, y)
    pub fn max() -> Self {
        Self::builtin(BuiltinBinary::Max)
    }

    /// z = x || y
    pub fn lor() -> Self {
        Self::builtin(BuiltinBinary::Lor)
    }

    /// z = x && y
    pub fn land() -> Self {
        Self::builtin(BuiltinBinary::Land)
    }
}
