#![deny(missing_docs)]
//! # algebra-core
//!
//! Algebraic structure behind differentiation.
//!
//! The differentiation engine manipulates three kinds of data that all
//! carry a small algebra:
//!
//! - **Variable sets** (which leaves an expression depends on) combine
//!   by union: a [`JoinSemilattice`] with the empty set as bottom.
//! - **Numbers and elementwise values** combine by addition: an
//!   [`AbelianGroup`] with zero as identity and negation as inverse.
//! - **Sparse partial-derivative maps** (variable → value, absent keys
//!   meaning zero) combine pointwise: [`SparseSum`] is an abelian group
//!   whenever its values are.
//!
//! The difference rule for partial maps:
//!
//! ```rust
//! use algebra_core::{Group, Semigroup, SparseSum};
//!
//! // ∂(u - v) where u depends on x, v on x and y
//! let du: SparseSum<&str, f64> = [("x", 2.0)].into_iter().collect();
//! let dv: SparseSum<&str, f64> = [("x", 0.5), ("y", 3.0)].into_iter().collect();
//!
//! let d = du.combine(&dv.inverse());
//! assert_eq!(d.get_or_empty(&"x"), 1.5);
//! assert_eq!(d.get_or_empty(&"y"), -3.0);
//! assert_eq!(d.get_or_empty(&"z"), 0.0); // never mentioned: zero
//! ```

pub mod sparse;

pub use sparse::SparseSum;

use std::collections::BTreeSet;

/// A **semigroup**: a type with an associative binary operation.
///
/// Laws (not enforced by type system):
///
/// - **Associative**:
///   `a.combine(b).combine(c) == a.combine(b.combine(c))`
pub trait Semigroup: Sized {
    /// Combine two elements associatively.
    fn combine(&self, other: &Self) -> Self;

    /// In-place combine.
    fn combine_assign(&mut self, other: &Self) {
        *self = self.combine(other);
    }
}

/// A **monoid**: a semigroup with an identity element.
///
/// For the additive structures in this workspace the identity is
/// zero, which is also what a missing entry of a [`SparseSum`] reads
/// as.
///
/// ```rust
/// use algebra_core::{Monoid, Semigroup};
///
/// assert_eq!(f64::empty(), 0.0);
/// assert_eq!(f64::concat([1.0, 2.0, 3.5]), 6.5);
/// ```
pub trait Monoid: Semigroup {
    /// The identity element.
    fn empty() -> Self;

    /// Fold an iterator using combine, starting from empty.
    fn concat<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        iter.into_iter()
            .fold(Self::empty(), |acc, x| acc.combine(&x))
    }
}

/// A **commutative monoid**: a monoid where combine is commutative.
///
/// Laws (not enforced by type system):
///
/// - **Commutative**: `a.combine(b) == b.combine(a)`
pub trait CommutativeMonoid: Monoid {}

/// A **group**: a monoid where every element has an inverse.
///
/// Laws (not enforced by type system):
///
/// - **Inverse**: `a.combine(a.inverse()) == empty() == a.inverse().combine(a)`
pub trait Group: Monoid {
    /// Return the inverse of this element.
    fn inverse(&self) -> Self;
}

/// An **abelian group**: a group where combine is commutative.
pub trait AbelianGroup: Group + CommutativeMonoid {}

/// A **join-semilattice**: a type with an associative, commutative,
/// idempotent binary operation.
///
/// Dependency sets of expression nodes are joined when an operator
/// node is built: `deps(a ⊕ b) = deps(a) ∨ deps(b)`.
///
/// ```rust
/// use algebra_core::JoinSemilattice;
/// use std::collections::BTreeSet;
///
/// let a: BTreeSet<u32> = [1, 2].into_iter().collect();
/// let b: BTreeSet<u32> = [2, 3].into_iter().collect();
/// assert_eq!(a.join(&b), [1, 2, 3].into_iter().collect());
/// assert_eq!(a.join(&a), a);
/// ```
pub trait JoinSemilattice: Sized {
    /// The join (least upper bound).
    fn join(&self, other: &Self) -> Self;

    /// Derived partial order: x ≤ y iff x ∨ y = y.
    fn leq(&self, other: &Self) -> bool
    where
        Self: PartialEq,
    {
        self.join(other) == *other
    }
}

/// A **bounded join-semilattice**: a join-semilattice with a bottom
/// element.
///
/// The bottom of a dependency set is the empty set, which is what a
/// constant depends on.
pub trait BoundedJoinSemilattice: JoinSemilattice {
    /// The bottom element of the lattice (⊥).
    fn bottom() -> Self;
}

// BTreeSet: join = union

impl<T: Ord + Clone> JoinSemilattice for BTreeSet<T> {
    fn join(&self, other: &Self) -> Self {
        self.union(other).cloned().collect()
    }
}

impl<T: Ord + Clone> BoundedJoinSemilattice for BTreeSet<T> {
    fn bottom() -> Self {
        BTreeSet::new()
    }
}

// f64 under addition

impl Semigroup for f64 {
    fn combine(&self, other: &Self) -> Self {
        self + other
    }
}

impl Monoid for f64 {
    fn empty() -> Self {
        0.0
    }
}

impl CommutativeMonoid for f64 {}

impl Group for f64 {
    fn inverse(&self) -> Self {
        -self
    }
}

impl AbelianGroup for f64 {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_forms_an_additive_group() {
        let x = 2.5_f64;
        assert_eq!(x.combine(&x.inverse()), f64::empty());
        assert_eq!(x.combine(&4.0), 4.0_f64.combine(&x));
        assert_eq!(f64::concat(vec![]), 0.0);
    }

    #[test]
    fn btreeset_join_is_union() {
        let a: BTreeSet<u32> = [1, 4].into_iter().collect();
        let b: BTreeSet<u32> = [4, 9].into_iter().collect();
        let j = a.join(&b);
        assert_eq!(j.into_iter().collect::<Vec<_>>(), vec![1, 4, 9]);
    }

    #[test]
    fn btreeset_bottom_is_identity() {
        let a: BTreeSet<u32> = [7].into_iter().collect();
        assert_eq!(BTreeSet::bottom().join(&a), a);
        assert!(BTreeSet::<u32>::bottom().leq(&a));
    }
}
