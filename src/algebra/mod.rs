//! Runtime-composable operators, monoids, and semirings
//!
//! The algebra objects are plain owned values built by the caller and
//! passed to the engine by reference. Each binary/unary operator is either
//! one of a closed built-in enumeration — resolved into a monomorphized
//! function pointer at construction, with specialized kernels keyed off its
//! kind — or a boxed user callable handled by the generic kernel path.

pub mod boolean;

mod binary;
mod monoid;
mod semiring;
mod unary;

pub use binary::{BinaryOp, BuiltinBinary, OpKind};
pub use unary::UnaryKind;
pub use monoid::Monoid;
pub use semiring::Semiring;
pub use unary::{BuiltinUnary, UnaryOp};
