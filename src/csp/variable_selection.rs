#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

use crate::csp::board::Board;
use crate::csp::cell::Cell;
use crate::csp::domain::DomainMap;
use crate::csp::graph::ConstraintGraph;
use crate::csp::solver::Assignment;

/// Read-only view of the search state offered to a selection strategy.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub board: &'a Board,
    pub variables: &'a [Cell],
    pub domains: &'a DomainMap,
    pub graph: &'a ConstraintGraph,
    pub assignment: &'a Assignment,
}

impl SelectionContext<'_> {
    /// Number of recorded neighbors of `var` still unassigned on the board.
    #[must_use]
    pub fn degree(&self, var: Cell) -> usize {
        self.graph
            .neighbors(var)
            .iter()
            .filter(|&&(neighbor, _)| self.board[neighbor] == 0)
            .count()
    }

    fn unassigned(&self) -> impl Iterator<Item = Cell> + Clone + '_ {
        self.variables
            .iter()
            .copied()
            .filter(|&var| !self.assignment.contains(var))
    }
}

/// Chooses the next variable to branch on.
///
/// Strategies only affect search performance, never completeness: the
/// engine is exhaustive for any pick order.
pub trait VariableSelection {
    /// Picks an unassigned variable, or `None` when every variable is
    /// assigned.
    fn pick(&mut self, ctx: &SelectionContext<'_>) -> Option<Cell>;
}

/// Minimum-remaining-values selection with the degree heuristic as the
/// tie-break.
///
/// Variables are scanned in their creation (row-major) order: the first
/// variable with the smallest current domain wins, and among several such
/// the first with the most unassigned neighbors. This fixed scan order is
/// the documented deterministic tie-break.
#[derive(Debug, Clone, Copy, Default)]
pub struct MrvDegree;

impl VariableSelection for MrvDegree {
    fn pick(&mut self, ctx: &SelectionContext<'_>) -> Option<Cell> {
        let min_len = ctx
            .unassigned()
            .map(|var| ctx.domains[&var].len())
            .min()?;

        let mut best: Option<(Cell, usize)> = None;
        for var in ctx.unassigned() {
            if ctx.domains[&var].len() != min_len {
                continue;
            }
            let degree = ctx.degree(var);
            match best {
                Some((_, best_degree)) if degree <= best_degree => {}
                _ => best = Some((var, degree)),
            }
        }
        best.map(|(var, _)| var)
    }
}

/// Picks the first unassigned variable in creation order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstUnassigned;

impl VariableSelection for FirstUnassigned {
    fn pick(&mut self, ctx: &SelectionContext<'_>) -> Option<Cell> {
        ctx.unassigned().next()
    }
}

const DEFAULT_SEED: u64 = 0x5EED_CAFE;

/// Picks a uniformly random unassigned variable.
///
/// Seeded, so repeated solves with the same seed stay reproducible. Only
/// useful for comparing heuristics; expect far more backtracking than with
/// [`MrvDegree`].
#[derive(Debug, Clone)]
pub struct RandomOrder {
    rng: fastrand::Rng,
}

impl RandomOrder {
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for RandomOrder {
    fn default() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }
}

impl VariableSelection for RandomOrder {
    fn pick(&mut self, ctx: &SelectionContext<'_>) -> Option<Cell> {
        let candidates: Vec<_> = ctx.unassigned().collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[self.rng.usize(..candidates.len())])
    }
}
