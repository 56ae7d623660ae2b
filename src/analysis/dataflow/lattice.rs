//! Lattice trait for data flow analysis.
//!
//! A lattice element is the fact attached to one program point. At control flow merge
//! points the facts of all incoming paths are combined with `meet`. For the set-based
//! analyses in this crate, "more information" means "bigger set" and meet is set union;
//! constant propagation uses a three-level lattice per variable.
//!
//! The solver only terminates if the meet is well-behaved and transfer functions are
//! monotone. These laws are not checked at runtime; the property tests in `tests/`
//! exercise them for every lattice shipped here.

use std::fmt::Debug;

use crate::utils::BitSet;

/// A meet semi-lattice.
///
/// The meet operation combines information from multiple control flow paths. It must
/// satisfy:
///
/// - **Idempotent**: `x.meet(x) = x`
/// - **Commutative**: `x.meet(y) = y.meet(x)`
/// - **Associative**: `x.meet(y.meet(z)) = (x.meet(y)).meet(z)`
///
/// `PartialEq` is used by the solver to detect that a fixpoint has been reached.
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::dataflow::MeetSemiLattice;
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum Parity { Unknown, Even, Odd, Either }
///
/// impl MeetSemiLattice for Parity {
///     fn meet(&self, other: &Self) -> Self {
///         match (self, other) {
///             (Parity::Unknown, x) | (x, Parity::Unknown) => x.clone(),
///             (a, b) if a == b => a.clone(),
///             _ => Parity::Either,
///         }
///     }
/// }
///
/// assert_eq!(Parity::Even.meet(&Parity::Odd), Parity::Either);
/// ```
pub trait MeetSemiLattice: Clone + Debug + PartialEq {
    /// Combines the facts of two merging paths.
    #[must_use]
    fn meet(&self, other: &Self) -> Self;
}

impl MeetSemiLattice for BitSet {
    fn meet(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.union_with(other);
        result
    }
}
