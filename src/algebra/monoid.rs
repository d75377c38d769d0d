//! Monoids: an associative binary operator with an identity value
//!
//! A monoid optionally carries a *terminal* value: once a reduction
//! reaches it, no further input can change the result and the reduction
//! may stop early (e.g. `true` for logical-or, the type minimum for min).

use crate::scalar::{NumericScalar, Scalar};

use super::binary::BinaryOp;

/// A binary operator over a single type, with an identity value and an
/// optional terminal (annihilator) value
///
/// The operator's input and output types are forced equal by construction;
/// associativity is a documented caller obligation, not runtime-checked.
#[derive(Clone, Debug)]
pub struct Monoid<T: Scalar> {
    op: BinaryOp<T>,
    identity: T,
    terminal: Option<T>,
}

impl<T: Scalar> Monoid<T> {
    /// Create a monoid from an operator and its identity value
    pub fn new(op: BinaryOp<T>, identity: T) -> Self {
        Self {
            op,
            identity,
            terminal: None,
        }
    }

    /// Attach a terminal value enabling early exit in reductions
    pub fn with_terminal(mut self, terminal: T) -> Self {
        self.terminal = Some(terminal);
        self
    }

    /// The underlying binary operator
    #[inline]
    pub fn op(&self) -> &BinaryOp<T> {
        &self.op
    }

    /// The identity (reduction seed)
    #[inline]
    pub fn identity(&self) -> T {
        self.identity
    }

    /// The terminal value, if any
    #[inline]
    pub fn terminal(&self) -> Option<T> {
        self.terminal
    }

    /// Accumulate `v` into `acc`
    #[inline]
    pub fn fold(&self, acc: T, v: T) -> T {
        self.op.call(acc, v)
    }

    /// True once a reduction can stop
    #[inline]
    pub fn is_terminal(&self, acc: T) -> bool {
        self.terminal.map(|t| t == acc).unwrap_or(false)
    }

    /// A copy with its operator forced onto the generic call path
    pub(crate) fn degraded(&self) -> Self {
        Self {
            op: self.op.degraded(),
            identity: self.identity,
            terminal: self.terminal,
        }
    }
}

impl<T: NumericScalar> Monoid<T> {
    /// (+, 0)
    pub fn plus() -> Self {
        Self::new(BinaryOp::plus(), T::zero())
    }

    /// (*, 1)
    pub fn times() -> Self {
        Self::new(BinaryOp::times(), T::one())
    }

    /// (min, +inf), terminal -inf
    pub fn min() -> Self {
        Self::new(BinaryOp::min(), T::max_value()).with_terminal(T::min_value())
    }

    /// (max, -inf), terminal +inf
    pub fn max() -> Self {
        Self::new(BinaryOp::max(), T::min_value()).with_terminal(T::max_value())
    }

    /// (||, 0), terminal 1
    pub fn lor() -> Self {
        Self::new(BinaryOp::lor(), T::zero()).with_terminal(T::one())
    }

    /// (&&, 1), terminal 0
    pub fn land() -> Self {
        Self::new(BinaryOp::land(), T::one()).with_terminal(T::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_monoid() {
        let m = Monoid::<i64>::plus();
        assert_eq!(m.identity(), 0);
        assert_eq!(m.terminal(), None);
        assert_eq!(m.fold(40, 2), 42);
    }

    #[test]
    fn test_min_monoid_terminal() {
        let m = Monoid::<i32>::min();
        assert_eq!(m.identity(), i32::MAX);
        assert_eq!(m.terminal(), Some(i32::MIN));
        assert!(m.is_terminal(i32::MIN));
        assert!(!m.is_terminal(0));
    }

    #[test]
    fn test_float_min_identity() {
        let m = Monoid::<f64>::min();
        assert_eq!(m.identity(), f64::INFINITY);
        assert_eq!(m.fold(m.identity(), 3.5), 3.5);
    }

    #[test]
    fn test_custom_monoid() {
        let m = Monoid::new(BinaryOp::<u32>::custom(|x, y| x ^ y), 0);
        assert_eq!(m.fold(m.identity(), 0b1010), 0b1010);
        assert_eq!(m.fold(0b1010, 0b0110), 0b1100);
    }
}
