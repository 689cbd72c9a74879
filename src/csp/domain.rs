#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

use crate::csp::board::{Board, Value};
use crate::csp::cell::Cell;
use crate::csp::graph::ConstraintGraph;
use rustc_hash::FxHashMap;

/// Map from each unassigned variable to its current candidate set.
pub type DomainMap = FxHashMap<Cell, Domain>;

const FULL: u16 = 0b1_1111_1111;

/// A candidate set over the values `1..=9`, packed into the low nine bits
/// of a `u16` (bit `v - 1` set means `v` is a candidate).
///
/// The packing makes the two domain invariants structural: a value cannot
/// appear twice, and [`Domain::iter`] always yields ascending order, so a
/// restore never needs a dedup or a sort.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Domain(u16);

impl Domain {
    /// The domain containing every value `1..=9`.
    #[must_use]
    pub const fn full() -> Self {
        Self(FULL)
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    const fn bit(value: Value) -> u16 {
        debug_assert!(value >= 1 && value <= 9);
        1 << (value - 1)
    }

    #[must_use]
    pub const fn contains(self, value: Value) -> bool {
        self.0 & Self::bit(value) != 0
    }

    pub fn insert(&mut self, value: Value) {
        self.0 |= Self::bit(value);
    }

    /// Removes `value`, returning whether it was present.
    pub fn remove(&mut self, value: Value) -> bool {
        let present = self.contains(value);
        self.0 &= !Self::bit(value);
        present
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The candidate values in ascending order.
    pub fn iter(self) -> impl Iterator<Item = Value> {
        (1..=9).filter(move |&value| self.contains(value))
    }

    /// Removes every value for which `prune` returns true and hands back
    /// the removed subset, for the caller's undo log.
    pub fn remove_where(&mut self, prune: impl Fn(Value) -> bool) -> Self {
        let mut removed = Self::empty();
        for value in self.iter() {
            if prune(value) {
                removed.insert(value);
            }
        }
        self.0 &= !removed.0;
        removed
    }

    /// Re-inserts a subset previously returned by [`Domain::remove_where`].
    ///
    /// The subset must be disjoint from the current contents; overlap would
    /// mean the undo log replayed a frame twice.
    pub fn restore(&mut self, removed: Self) {
        debug_assert_eq!(self.0 & removed.0, 0, "restore of values already present");
        self.0 |= removed.0;
    }
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Value> for Domain {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        let mut domain = Self::empty();
        for value in iter {
            domain.insert(value);
        }
        domain
    }
}

/// Computes the initial domain of every variable: the subset of `1..=9`
/// consistent with all currently assigned neighbors under the variable's
/// recorded constraints. Other unassigned cells contribute nothing here.
///
/// An empty domain is left in the map; the caller treats it as proof the
/// instance is unsolvable before search begins.
#[must_use]
pub fn init_domains(board: &Board, variables: &[Cell], graph: &ConstraintGraph) -> DomainMap {
    let mut domains = DomainMap::default();
    for &var in variables {
        let domain = (1..=9)
            .filter(|&value| {
                graph
                    .neighbors(var)
                    .iter()
                    .all(|&(neighbor, kind)| kind.satisfied_by(value, board[neighbor]))
            })
            .collect();
        domains.insert(var, domain);
    }
    domains
}
