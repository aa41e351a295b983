//! Integer domains and guess bookkeeping for the approximation mode.
//!
//! A domain is an interval with holes: optional bounds plus a set of
//! excluded values. Guessing the outcome of a comparison against a literal
//! intersects the operand's domain with the region where the guessed
//! outcome holds; an empty intersection prunes the branch.

use std::collections::{BTreeSet, HashMap};
use ziria_ir::{BinOp, Exp};

/// Possible values of an integer-valued expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntDomain {
    /// Lower bound, inclusive. `None` is unbounded.
    pub lower: Option<i64>,
    /// Upper bound, inclusive. `None` is unbounded.
    pub upper: Option<i64>,
    /// Specific excluded values.
    pub holes: BTreeSet<i64>,
}

impl IntDomain {
    /// The unconstrained domain.
    pub fn full() -> Self {
        Self::default()
    }

    pub fn singleton(n: i64) -> Self {
        Self {
            lower: Some(n),
            upper: Some(n),
            holes: BTreeSet::new(),
        }
    }

    /// The region where `e ⊙ k` holds, for a comparison operator.
    pub fn from_comparison(op: BinOp, k: i64) -> Option<Self> {
        let mut dom = Self::full();
        match op {
            BinOp::Eq => {
                dom.lower = Some(k);
                dom.upper = Some(k);
            }
            BinOp::Neq => {
                dom.holes.insert(k);
            }
            BinOp::Lt => dom.upper = Some(k.saturating_sub(1)),
            BinOp::Leq => dom.upper = Some(k),
            BinOp::Gt => dom.lower = Some(k.saturating_add(1)),
            BinOp::Geq => dom.lower = Some(k),
            _ => return None,
        }
        Some(dom)
    }

    /// Pointwise max of lower bounds, min of upper bounds, union of holes.
    pub fn intersect(&self, other: &Self) -> Self {
        let lower = match (self.lower, other.lower) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let upper = match (self.upper, other.upper) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let holes = self.holes.union(&other.holes).copied().collect();
        Self {
            lower,
            upper,
            holes,
        }
    }

    /// Cheap emptiness test: crossed bounds, or a single point that is a
    /// hole. A bounded interval whose every point is a hole is also caught.
    pub fn is_empty(&self) -> bool {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) => {
                lo > hi || (lo..=hi).take(self.holes.len() + 1).all(|n| self.holes.contains(&n))
            }
            _ => false,
        }
    }

    /// The single value this domain permits, if it permits exactly one.
    pub fn as_singleton(&self) -> Option<i64> {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) if lo == hi && !self.holes.contains(&lo) => Some(lo),
            _ => None,
        }
    }

    pub fn contains(&self, n: i64) -> bool {
        self.lower.map_or(true, |lo| n >= lo)
            && self.upper.map_or(true, |hi| n <= hi)
            && !self.holes.contains(&n)
    }

    /// Smallest in-domain value at or above `from`, stepping over holes.
    fn next_in_domain(&self, from: i64) -> Option<i64> {
        let mut n = from;
        loop {
            if let Some(hi) = self.upper {
                if n > hi {
                    return None;
                }
            }
            if !self.holes.contains(&n) {
                return Some(n);
            }
            n = n.checked_add(1)?;
        }
    }

    /// Largest in-domain value at or below `from`, stepping over holes.
    fn prev_in_domain(&self, from: i64) -> Option<i64> {
        let mut n = from;
        loop {
            if let Some(lo) = self.lower {
                if n < lo {
                    return None;
                }
            }
            if !self.holes.contains(&n) {
                return Some(n);
            }
            n = n.checked_sub(1)?;
        }
    }

    /// Sample values used when a stuck integer term is guessed: the extreme
    /// in-domain points of a bounded or half-bounded domain, and small
    /// values around zero for an unconstrained one. Every returned value is
    /// in the domain; the result is empty iff no sample exists.
    pub fn representatives(&self) -> Vec<i64> {
        let mut out = Vec::new();
        let mut push = |n: Option<i64>| {
            if let Some(n) = n {
                if !out.contains(&n) {
                    out.push(n);
                }
            }
        };
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) => {
                push(self.next_in_domain(lo));
                push(self.prev_in_domain(hi));
            }
            (Some(lo), None) => {
                let first = self.next_in_domain(lo);
                push(first);
                push(first.and_then(|n| self.next_in_domain(n.saturating_add(1))));
            }
            (None, Some(hi)) => {
                let first = self.prev_in_domain(hi);
                push(first);
                push(first.and_then(|n| self.prev_in_domain(n.saturating_sub(1))));
            }
            (None, None) => {
                push(self.prev_in_domain(-1));
                push(self.next_in_domain(0));
                push(self.next_in_domain(1));
            }
        }
        out
    }
}

/// Assumptions recorded by the guesser along one branch.
///
/// Both maps key on span-stripped expressions, so structurally equal
/// subterms at different source positions share one guess.
#[derive(Debug, Clone, Default)]
pub struct Guesses {
    /// Fixed outcomes of non-ground boolean subterms.
    pub bools: HashMap<Exp, bool>,
    /// Narrowed domains of integer subterms.
    pub ints: HashMap<Exp, IntDomain>,
}

impl Guesses {
    /// Current domain of a (span-stripped) integer term.
    pub fn int_domain(&self, key: &Exp) -> IntDomain {
        self.ints.get(key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_domains() {
        let lt = IntDomain::from_comparison(BinOp::Lt, 0).unwrap();
        assert_eq!(lt.upper, Some(-1));
        assert_eq!(lt.lower, None);
        let geq = IntDomain::from_comparison(BinOp::Geq, 0).unwrap();
        assert_eq!(geq.lower, Some(0));
        let neq = IntDomain::from_comparison(BinOp::Neq, 5).unwrap();
        assert!(!neq.contains(5));
        assert!(neq.contains(4));
    }

    #[test]
    fn test_intersection_and_emptiness() {
        let a = IntDomain::from_comparison(BinOp::Geq, 0).unwrap();
        let b = IntDomain::from_comparison(BinOp::Lt, 0).unwrap();
        assert!(a.intersect(&b).is_empty());

        let c = IntDomain::from_comparison(BinOp::Geq, 5).unwrap();
        let d = IntDomain::from_comparison(BinOp::Neq, 5).unwrap();
        let cd = c.intersect(&d);
        assert!(!cd.is_empty());
        assert!(!cd.contains(5));
        assert!(cd.contains(6));

        // A single point that is a hole is empty.
        let point = IntDomain::singleton(3).intersect(&IntDomain::from_comparison(BinOp::Neq, 3).unwrap());
        assert!(point.is_empty());
    }

    #[test]
    fn test_representatives_unbounded() {
        assert_eq!(IntDomain::full().representatives(), vec![-1, 0, 1]);
    }

    #[test]
    fn test_representatives_bounded() {
        let d = IntDomain {
            lower: Some(2),
            upper: Some(9),
            holes: [2i64, 9].into_iter().collect(),
        };
        assert_eq!(d.representatives(), vec![3, 8]);
        assert_eq!(IntDomain::singleton(4).representatives(), vec![4]);
    }

    #[test]
    fn test_representatives_half_bounded() {
        let d = IntDomain::from_comparison(BinOp::Geq, 10).unwrap();
        assert_eq!(d.representatives(), vec![10, 11]);
        let d = IntDomain::from_comparison(BinOp::Leq, -3).unwrap();
        assert_eq!(d.representatives(), vec![-3, -4]);
    }

    #[test]
    fn test_representatives_are_in_domain() {
        let mut d = IntDomain::from_comparison(BinOp::Geq, 0).unwrap();
        d.holes.insert(0);
        assert_eq!(d.representatives(), vec![1, 2]);
        for n in d.representatives() {
            assert!(d.contains(n));
        }
    }
}
