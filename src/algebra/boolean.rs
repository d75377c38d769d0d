//! Boolean algebra over the `bool` element type
//!
//! `bool` has no arithmetic surface, so its operators are built as custom
//! callables and run through the generic kernel path. Results are
//! identical to the logical built-ins over small integer types.

use super::binary::BinaryOp;
use super::monoid::Monoid;
use super::semiring::Semiring;

/// z = x || y
pub fn lor() -> BinaryOp<bool> {
    BinaryOp::custom(|x, y| x || y)
}

/// z = x && y
pub fn land() -> BinaryOp<bool> {
    BinaryOp::custom(|x, y| x && y)
}

/// z = x != y
pub fn lxor() -> BinaryOp<bool> {
    BinaryOp::custom(|x, y| x != y)
}

/// (||, false), terminal true
pub fn lor_monoid() -> Monoid<bool> {
    Monoid::new(lor(), false).with_terminal(true)
}

/// (&&, true), terminal false
pub fn land_monoid() -> Monoid<bool> {
    Monoid::new(land(), true).with_terminal(false)
}

/// (||, &&) — boolean matmul / reachability
pub fn lor_land() -> Semiring<bool> {
    Semiring::new(lor_monoid(), land())
}

/// (&&, ||) — dual of the reachability semiring
pub fn land_lor() -> Semiring<bool> {
    Semiring::new(land_monoid(), lor())
}
