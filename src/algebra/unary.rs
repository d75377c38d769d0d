//! Unary operators: built-in catalog plus user-defined callables

use crate::scalar::{NumericScalar, Scalar, TypeCode};
use std::sync::Arc;

/// The closed enumeration of built-in unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinUnary {
    /// z = x
    Identity,
    /// z = 1
    One,
    /// z = |x|
    Abs,
    /// z = -x (via f64 for unsigned types)
    Negate,
    /// z = 1/x; integer 1/0 saturates to the type maximum
    Recip,
}

impl BuiltinUnary {
    /// Apply the operator to a value of a numeric type
    #[inline]
    pub fn apply<T: NumericScalar>(self, x: T) -> T {
        match self {
            BuiltinUnary::Identity => x,
            BuiltinUnary::One => T::one(),
            BuiltinUnary::Abs => {
                if x < T::zero() {
                    T::from_f64(-x.to_f64())
                } else {
                    x
                }
            }
            BuiltinUnary::Negate => T::from_f64(-x.to_f64()),
            BuiltinUnary::Recip => {
                if T::CODE.is_float() || x != T::zero() {
                    T::one() / x
                } else {
                    T::max_value()
                }
            }
        }
    }

    /// Whether this operator is defined for a given type code
    pub fn supports(self, code: TypeCode) -> bool {
        match self {
            BuiltinUnary::Recip => !matches!(code, TypeCode::Bool | TypeCode::Custom),
            _ => code.is_builtin(),
        }
    }

    /// Operator name for display/debug
    pub fn name(self) -> &'static str {
        match self {
            BuiltinUnary::Identity => "identity",
            BuiltinUnary::One => "one",
            BuiltinUnary::Abs => "abs",
            BuiltinUnary::Negate => "negate",
            BuiltinUnary::Recip => "recip",
        }
    }
}

/// Kind tag for unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryKind {
    /// One of the built-in catalog operators
    Builtin(BuiltinUnary),
    /// User-defined callable
    Custom,
}

enum UnFn<T> {
    Ptr(fn(T) -> T),
    Boxed(Arc<dyn Fn(T) -> T + Send + Sync>),
}

impl<T> Clone for UnFn<T> {
    fn clone(&self) -> Self {
        match self {
            UnFn::Ptr(p) => UnFn::Ptr(*p),
            UnFn::Boxed(f) => UnFn::Boxed(f.clone()),
        }
    }
}

/// A unary operator `T -> T`
///
/// Same dispatch model as [`super::BinaryOp`]: built-in constructors store
/// a monomorphized function pointer keyed by catalog kind, `custom` stores
/// a boxed callable for the generic path.
pub struct UnaryOp<T: Scalar> {
    kind: UnaryKind,
    f: UnFn<T>,
}

impl<T: Scalar> Clone for UnaryOp<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            f: self.f.clone(),
        }
    }
}

impl<T: Scalar> std::fmt::Debug for UnaryOp<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            UnaryKind::Builtin(b) => write!(f, "UnaryOp({})", b.name()),
            UnaryKind::Custom => write!(f, "UnaryOp(custom)"),
        }
    }
}

impl<T: Scalar> UnaryOp<T> {
    /// Create an operator from a user-defined callable
    pub fn custom(f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        Self {
            kind: UnaryKind::Custom,
            f: UnFn::Boxed(Arc::new(f)),
        }
    }

    /// The catalog kind of this operator
    #[inline]
    pub fn kind(&self) -> UnaryKind {
        self.kind
    }

    /// Whether this operator takes the specialized call path
    #[inline]
    pub(crate) fn is_specialized(&self) -> bool {
        matches!(self.f, UnFn::Ptr(_))
    }

    /// Apply the operator
    #[inline]
    pub fn call(&self, x: T) -> T {
        match &self.f {
            UnFn::Ptr(p) => p(x),
            UnFn::Boxed(f) => f(x),
        }
    }

    /// A copy forced onto the generic (indirect) call path
    pub(crate) fn degraded(&self) -> Self {
        match &self.f {
            UnFn::Ptr(p) => {
                let p = *p;
                Self {
                    kind: self.kind,
                    f: UnFn::Boxed(Arc::new(move |x| p(x))),
                }
            }
            UnFn::Boxed(_) => self.clone(),
        }
    }
}

fn builtin_fn<T: NumericScalar>(op: BuiltinUnary) -> fn(T) -> T {
    match op {
        BuiltinUnary::Identity => |x| x,
        BuiltinUnary::One => |_| T::one(),
        BuiltinUnary::Abs => |x| BuiltinUnary::Abs.apply(x),
        BuiltinUnary::Negate => |x| BuiltinUnary::Negate.apply(x),
        BuiltinUnary::Recip => |x| BuiltinUnary::Recip.apply(x),
    }
}

impl<T: NumericScalar> UnaryOp<T> {
    /// Create a built-in catalog operator
    pub fn builtin(op: BuiltinUnary) -> Self {
        Self {
            kind: UnaryKind::Builtin(op),
            f: UnFn::Ptr(builtin_fn::<T>(op)),
        }
    }

    /// z = x
    pub fn identity() -> Self {
        Self::builtin(BuiltinUnary::Identity)
    }

    /// z = 1
    pub fn one() -> Self {
        Self::builtin(BuiltinUnary::One)
    }

    /// z = |x|
    pub fn abs() -> Self {
        Self::builtin(BuiltinUnary::Abs)
    }

    /// z = -x
    pub fn negate() -> Self {
        Self::builtin(BuiltinUnary::Negate)
    }

    /// z = 1/x
    pub fn recip() -> Self {
        Self::builtin(BuiltinUnary::Recip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_apply() {
        assert_eq!(BuiltinUnary::Identity.apply(5i32), 5);
        assert_eq!(BuiltinUnary::One.apply(5i32), 1);
        assert_eq!(BuiltinUnary::Abs.apply(-5i32), 5);
        assert_eq!(BuiltinUnary::Negate.apply(5.0f64), -5.0);
        assert_eq!(BuiltinUnary::Recip.apply(4.0f64), 0.25);
        assert_eq!(BuiltinUnary::Recip.apply(0i32), i32::MAX);
    }

    #[test]
    fn test_negate_unsigned() {
        // negation of unsigned saturates through the f64 path
        assert_eq!(BuiltinUnary::Negate.apply(3u32), 0);
    }

    #[test]
    fn test_custom_and_degraded() {
        let scale = UnaryOp::<f64>::custom(|x| x * 10.0);
        assert_eq!(scale.call(4.2), 42.0);

        let abs = UnaryOp::<f64>::abs();
        assert!(abs.is_specialized());
        let slow = abs.degraded();
        assert!(!slow.is_specialized());
        assert_eq!(abs.call(-3.0), slow.call(-3.0));
    }
}
