//! Semirings for generalized matrix multiplication
//!
//! Standard matmul uses the (+, *) semiring. Alternative semirings express
//! graph algorithms as products: (min, +) for shortest paths, (||, &&) for
//! reachability and transitive closure, (max, min) for bottleneck paths,
//! and so on. A semiring is an addition-like [`Monoid`] paired with a
//! multiplication-like [`BinaryOp`]; `C[i,j] = add_k (A[i,k] mul B[k,j])`.

use crate::error::{Error, Result};
use crate::scalar::{NumericScalar, Scalar};

use super::binary::{BinaryOp, OpKind};
use super::monoid::Monoid;

/// An add monoid paired with a multiply operator over one element type
///
/// Equality of the multiply output type and the monoid type is enforced by
/// the type system; [`Semiring::validate`] performs the remaining runtime
/// check that the built-in operators involved are defined for the element
/// type's code.
#[derive(Clone, Debug)]
pub struct Semiring<T: Scalar> {
    add: Monoid<T>,
    multiply: BinaryOp<T>,
}

impl<T: Scalar> Semiring<T> {
    /// Pair an add monoid with a multiply operator
    pub fn new(add: Monoid<T>, multiply: BinaryOp<T>) -> Self {
        Self { add, multiply }
    }

    /// The addition-like monoid
    #[inline]
    pub fn add(&self) -> &Monoid<T> {
        &self.add
    }

    /// The multiplication-like operator
    #[inline]
    pub fn multiply(&self) -> &BinaryOp<T> {
        &self.multiply
    }

    /// Check that both operators are defined for the element type
    ///
    /// Fails with [`Error::DomainMismatch`] when a built-in operator is
    /// outside its supported type family (e.g. logical-or over f64).
    /// Custom operators are never restricted.
    pub fn validate(&self) -> Result<()> {
        if !self.multiply.supports(T::CODE) {
            return Err(Error::domain_mismatch(T::CODE, self.multiply_name()));
        }
        if !self.add.op().supports(T::CODE) {
            return Err(Error::domain_mismatch(T::CODE, self.add_name()));
        }
        Ok(())
    }

    /// Name of the add operator for display/debug
    pub fn add_name(&self) -> &'static str {
        match self.add.op().kind() {
            OpKind::Builtin(b) => b.name(),
            OpKind::Custom => "custom",
        }
    }

    /// Name of the multiply operator for display/debug
    pub fn multiply_name(&self) -> &'static str {
        match self.multiply.kind() {
            OpKind::Builtin(b) => b.name(),
            OpKind::Custom => "custom",
        }
    }

    /// A copy with both operators forced onto the generic call path
    pub(crate) fn degraded(&self) -> Self {
        Self {
            add: self.add.degraded(),
            multiply: self.multiply.degraded(),
        }
    }
}

impl<T: NumericScalar> Semiring<T> {
    /// (+, *) — standard arithmetic matmul
    pub fn plus_times() -> Self {
        Self::new(Monoid::plus(), BinaryOp::times())
    }

    /// (min, +) — shortest path distances
    pub fn min_plus() -> Self {
        Self::new(Monoid::min(), BinaryOp::plus())
    }

    /// (max, +) — longest path distances
    pub fn max_plus() -> Self {
        Self::new(Monoid::max(), BinaryOp::plus())
    }

    /// (max, min) — bottleneck / max-capacity paths
    pub fn max_min() -> Self {
        Self::new(Monoid::max(), BinaryOp::min())
    }

    /// (min, max) — fuzzy relations
    pub fn min_max() -> Self {
        Self::new(Monoid::min(), BinaryOp::max())
    }

    /// (||, &&) — reachability / transitive closure (small integer types)
    pub fn lor_land() -> Self {
        Self::new(Monoid::lor(), BinaryOp::land())
    }

    /// (+, max) — certain dynamic-programming formulations
    pub fn plus_max() -> Self {
        Self::new(Monoid::plus(), BinaryOp::max())
    }

    /// (+, first) — row-pattern counting, B values ignored
    pub fn plus_first() -> Self {
        Self::new(Monoid::plus(), BinaryOp::first())
    }

    /// (+, second) — column-pattern counting, A values ignored
    pub fn plus_second() -> Self {
        Self::new(Monoid::plus(), BinaryOp::second())
    }
}

impl<T: Scalar> std::fmt::Display for Semiring<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.add_name(), self.multiply_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::TypeCode;

    #[test]
    fn test_plus_times() {
        let s = Semiring::<f64>::plus_times();
        assert_eq!(s.multiply().call(3.0, 4.0), 12.0);
        assert_eq!(s.add().fold(5.0, 12.0), 17.0);
        assert_eq!(s.add().identity(), 0.0);
    }

    #[test]
    fn test_min_plus() {
        let s = Semiring::<f64>::min_plus();
        assert_eq!(s.multiply().call(3.0, 4.0), 7.0);
        assert_eq!(s.add().fold(5.0, 7.0), 5.0);
        assert_eq!(s.add().identity(), f64::INFINITY);
    }

    #[test]
    fn test_display() {
        assert_eq!(Semiring::<f64>::min_plus().to_string(), "(min, plus)");
        assert_eq!(Semiring::<u8>::lor_land().to_string(), "(lor, land)");
    }

    #[test]
    fn test_validate() {
        assert!(Semiring::<f64>::plus_times().validate().is_ok());
        assert!(Semiring::<u8>::lor_land().validate().is_ok());
        // logical ops are not defined over floats
        let err = Semiring::<f64>::lor_land().validate().unwrap_err();
        match err {
            Error::DomainMismatch { code, .. } => assert_eq!(code, TypeCode::F64),
            other => panic!("unexpected error: {other}"),
        }
    }
}
