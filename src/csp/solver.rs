//! The backtracking search engine with forward checking.
//!
//! This module provides the [`Backtracker`] struct, which solves a Kropki
//! Sudoku instance by depth-first search over the unassigned cells. The
//! engine is generic over a [`VariableSelection`] strategy; the default is
//! MRV with the degree heuristic as the tie-break.
//!
//! The core loop per recursion frame:
//! 1.  **Selection:** pick an unassigned variable via the strategy.
//! 2.  **Consistency check:** a candidate value must satisfy the
//!     consistency predicate against every already-assigned neighbor in
//!     the constraint graph.
//! 3.  **Forward checking:** after tentatively assigning the value, prune
//!     every still-unassigned neighbor's domain of values incompatible
//!     with it. Pruned values are recorded in a frame-local undo log. An
//!     emptied neighbor domain fails the inference immediately.
//! 4.  **Recursion / backtrack:** on successful inference, recurse; the
//!     first full assignment propagates straight up. Otherwise the undo
//!     log is replayed in reverse (domains restored before the board cell
//!     is cleared) and the next candidate value is tried.
//!
//! Search terminates with a fully assigned board, or with candidate
//! exhaustion at the recursion root, which proves the instance unsolvable.
//! Forward checking and the selection heuristics are pruning strategies
//! only; correctness does not depend on them.

use crate::csp::board::{Board, Markers, Value};
use crate::csp::cell::{Cell, GRID_SIZE};
use crate::csp::constraint::ConstraintKind;
use crate::csp::domain::{init_domains, Domain, DomainMap};
use crate::csp::graph::ConstraintGraph;
use crate::csp::variable_selection::{MrvDegree, SelectionContext, VariableSelection};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// The mapping from variables to their values chosen so far.
///
/// Grows and shrinks with recursion depth; the search is complete exactly
/// when it covers the whole variable set. Cells pre-filled in the input
/// never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment(FxHashMap<Cell, Value>);

impl Assignment {
    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        self.0.contains_key(&cell)
    }

    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<Value> {
        self.0.get(&cell).copied()
    }

    pub fn insert(&mut self, cell: Cell, value: Value) {
        self.0.insert(cell, value);
    }

    pub fn remove(&mut self, cell: Cell) {
        self.0.remove(&cell);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Counters describing one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolveStats {
    /// Tentative assignments made (including ones later undone).
    pub decisions: usize,
    /// Assignments undone after a failed inference or failed subtree.
    pub backtracks: usize,
    /// Candidate values removed from neighbor domains by forward checking.
    pub pruned: usize,
}

/// A solver for one puzzle instance.
pub trait Solver {
    /// Creates a solver for the given board and marker grids.
    fn new(board: Board, markers: Markers) -> Self;

    /// Runs the search.
    ///
    /// Returns the solved board, or `None` if the instance has no
    /// solution. A `None` is a normal outcome, not an error; no partial
    /// board is ever returned.
    fn solve(&mut self) -> Option<Board>;

    /// Counters from the most recent [`Solver::solve`] call.
    fn stats(&self) -> SolveStats;
}

/// Frame-local record of forward-checking prunes, replayed in reverse on
/// backtrack. One entry per pruned neighbor.
type UndoLog = SmallVec<[(Cell, Domain); 20]>;

/// Backtracking search with forward checking, generic over the variable
/// selection strategy.
#[derive(Debug, Clone)]
pub struct Backtracker<S: VariableSelection = MrvDegree> {
    board: Board,
    markers: Markers,
    variables: Vec<Cell>,
    graph: ConstraintGraph,
    domains: DomainMap,
    assignment: Assignment,
    selector: S,
    stats: SolveStats,
}

impl<S: VariableSelection + Default> Solver for Backtracker<S> {
    fn new(board: Board, markers: Markers) -> Self {
        Self::with_selector(board, markers, S::default())
    }

    fn solve(&mut self) -> Option<Board> {
        self.stats = SolveStats::default();

        // A contradiction among the givens is decided here, before any
        // search state is touched: a fully pre-filled invalid board has no
        // variables at all, so the recursion alone could not reject it.
        if !givens_consistent(&self.board, &self.markers) {
            return None;
        }

        // An empty initial domain proves unsolvability without searching.
        if self.domains.values().any(|domain| domain.is_empty()) {
            return None;
        }

        self.backtrack().then(|| self.board.clone())
    }

    fn stats(&self) -> SolveStats {
        self.stats
    }
}

impl<S: VariableSelection> Backtracker<S> {
    /// Creates a solver with an explicit selection strategy.
    pub fn with_selector(board: Board, markers: Markers, selector: S) -> Self {
        let variables = board.unassigned_cells();
        let graph = ConstraintGraph::build(&variables, &markers);
        let domains = init_domains(&board, &variables, &graph);
        Self {
            board,
            markers,
            variables,
            graph,
            domains,
            assignment: Assignment::default(),
            selector,
            stats: SolveStats::default(),
        }
    }

    fn backtrack(&mut self) -> bool {
        if self.assignment.len() == self.variables.len() {
            return true;
        }

        let ctx = SelectionContext {
            board: &self.board,
            variables: &self.variables,
            domains: &self.domains,
            graph: &self.graph,
            assignment: &self.assignment,
        };
        let Some(var) = self.selector.pick(&ctx) else {
            return false;
        };

        // The domain is a copy: recursion below mutates the map freely.
        let domain = self.domains[&var];
        for value in domain.iter() {
            if !self.is_consistent(var, value) {
                continue;
            }

            self.assignment.insert(var, value);
            self.board[var] = value;
            self.stats.decisions += 1;

            let (inferred, log) = self.forward_check(var, value);
            if inferred && self.backtrack() {
                return true;
            }

            // Undo order matters: domains are restored (in reverse order
            // of pruning) before the board cell is cleared.
            self.undo(log);
            self.board[var] = 0;
            self.assignment.remove(var);
            self.stats.backtracks += 1;
        }

        false
    }

    /// Whether `value` at `var` satisfies every constraint against the
    /// neighbors' current board values. Unassigned neighbors pass.
    fn is_consistent(&self, var: Cell, value: Value) -> bool {
        self.graph
            .neighbors(var)
            .iter()
            .all(|&(neighbor, kind)| kind.satisfied_by(value, self.board[neighbor]))
    }

    /// Prunes the domains of `var`'s still-unassigned neighbors against
    /// the tentative `value`. Returns whether inference succeeded and the
    /// undo log of everything it removed.
    fn forward_check(&mut self, var: Cell, value: Value) -> (bool, UndoLog) {
        let mut log = UndoLog::new();

        for &(neighbor, kind) in self.graph.neighbors(var) {
            if self.board[neighbor] != 0 {
                continue;
            }
            let domain = self
                .domains
                .get_mut(&neighbor)
                .expect("unassigned neighbor must have a domain entry");

            let removed = domain.remove_where(|candidate| !kind.satisfied_by(candidate, value));
            if !removed.is_empty() {
                self.stats.pruned += removed.len();
                log.push((neighbor, removed));
            }

            if domain.is_empty() {
                return (false, log);
            }
        }

        (true, log)
    }

    fn undo(&mut self, log: UndoLog) {
        for (cell, removed) in log.into_iter().rev() {
            self.domains
                .get_mut(&cell)
                .expect("pruned cell must have a domain entry")
                .restore(removed);
        }
    }
}

/// Checks the pre-filled cells against each other: row/column/box
/// distinctness plus every dot marker whose two endpoints are both given.
fn givens_consistent(board: &Board, markers: &Markers) -> bool {
    fn unit_ok(board: &Board, cells: impl Iterator<Item = Cell>) -> bool {
        let mut seen = Domain::empty();
        for cell in cells {
            let value = board[cell];
            if value == 0 {
                continue;
            }
            if seen.contains(value) {
                return false;
            }
            seen.insert(value);
        }
        true
    }

    for i in 0..GRID_SIZE {
        if !unit_ok(board, Cell::row_cells(i)) || !unit_ok(board, Cell::col_cells(i)) {
            return false;
        }
    }
    for row in (0..GRID_SIZE).step_by(3) {
        for col in (0..GRID_SIZE).step_by(3) {
            if !unit_ok(board, Cell::box_cells(Cell::new(row, col))) {
                return false;
            }
        }
    }

    let dot_ok = |kind: Option<ConstraintKind>, a: Cell, b: Cell| {
        kind.is_none_or(|kind| {
            board[a] == 0 || board[b] == 0 || kind.satisfied_by(board[a], board[b])
        })
    };
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE - 1 {
            if !dot_ok(
                markers.horizontal(row, col),
                Cell::new(row, col),
                Cell::new(row, col + 1),
            ) {
                return false;
            }
        }
    }
    for row in 0..GRID_SIZE - 1 {
        for col in 0..GRID_SIZE {
            if !dot_ok(
                markers.vertical(row, col),
                Cell::new(row, col),
                Cell::new(row + 1, col),
            ) {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::constraint::ConstraintKind::{BlackDot, WhiteDot};
    use crate::csp::variable_selection::{FirstUnassigned, RandomOrder};
    use crate::kropki::puzzle::{Puzzle, EXAMPLE_NINE, EXAMPLE_NINE_SOLUTION};

    fn assert_valid_sudoku(board: &Board) {
        let full: Domain = (1..=9).collect();
        for i in 0..GRID_SIZE {
            let row: Domain = Cell::row_cells(i).map(|c| board[c]).collect();
            let col: Domain = Cell::col_cells(i).map(|c| board[c]).collect();
            assert_eq!(row, full, "row {i} is not a permutation");
            assert_eq!(col, full, "column {i} is not a permutation");
        }
        for r in (0..GRID_SIZE).step_by(3) {
            for c in (0..GRID_SIZE).step_by(3) {
                let boxed: Domain = Cell::box_cells(Cell::new(r, c)).map(|c| board[c]).collect();
                assert_eq!(boxed, full, "box at ({r}, {c}) is not a permutation");
            }
        }
    }

    #[test]
    fn empty_board_without_markers_solves_to_a_valid_grid() {
        let mut solver: Backtracker = Solver::new(Board::empty(), Markers::none());
        let solution = solver.solve().expect("empty board must be solvable");
        assert_valid_sudoku(&solution);
        assert!(solver.stats().decisions >= 81);
    }

    #[test]
    fn classic_givens_reach_the_known_solution() {
        let mut solver: Backtracker = Solver::new(Board::new(EXAMPLE_NINE), Markers::none());
        let solution = solver.solve().expect("example must be solvable");
        assert_eq!(solution, Board::new(EXAMPLE_NINE_SOLUTION));
    }

    #[test]
    fn white_dot_next_to_a_given_nine_forces_eight() {
        let mut board = Board::empty();
        board[Cell::new(0, 0)] = 9;
        let mut markers = Markers::none();
        markers.set_horizontal(0, 0, Some(WhiteDot));

        let mut solver: Backtracker = Solver::new(board, markers);
        let solution = solver.solve().expect("instance must be solvable");
        assert_eq!(solution[Cell::new(0, 1)], 8);
        assert_valid_sudoku(&solution);
    }

    #[test]
    fn solutions_satisfy_derived_dot_markers() {
        // Dots derived from the known solution grid, givens mostly blanked:
        // any solution the engine finds must satisfy every dot.
        let solved = Board::new(EXAMPLE_NINE_SOLUTION);
        let mut markers = Markers::none();
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE - 1 {
                let (a, b) = (solved[Cell::new(row, col)], solved[Cell::new(row, col + 1)]);
                if a == 2 * b || b == 2 * a {
                    markers.set_horizontal(row, col, Some(BlackDot));
                } else if a.abs_diff(b) == 1 {
                    markers.set_horizontal(row, col, Some(WhiteDot));
                }
            }
        }
        for row in 0..GRID_SIZE - 1 {
            for col in 0..GRID_SIZE {
                let (a, b) = (solved[Cell::new(row, col)], solved[Cell::new(row + 1, col)]);
                if a == 2 * b || b == 2 * a {
                    markers.set_vertical(row, col, Some(BlackDot));
                } else if a.abs_diff(b) == 1 {
                    markers.set_vertical(row, col, Some(WhiteDot));
                }
            }
        }

        let mut board = Board::empty();
        for cell in Cell::all() {
            // Keep one given per band as an anchor.
            if cell.row % 4 == 0 && cell.col == 0 {
                board[cell] = solved[cell];
            }
        }

        let puzzle = Puzzle::new(board, markers.clone());
        let mut solver: Backtracker = Solver::new(puzzle.board.clone(), markers);
        let solution = solver.solve().expect("derived instance must be solvable");
        assert_valid_sudoku(&solution);
        assert!(puzzle.verify(&solution));
    }

    #[test]
    fn contradictory_givens_are_unsolvable_without_mutation() {
        let mut board = Board::empty();
        board[Cell::new(3, 2)] = 5;
        board[Cell::new(3, 6)] = 5;
        let before = board.clone();

        let mut solver: Backtracker = Solver::new(board, Markers::none());
        assert_eq!(solver.solve(), None);
        assert_eq!(solver.board, before);
    }

    #[test]
    fn complete_valid_board_is_returned_untouched() {
        let board = Board::new(EXAMPLE_NINE_SOLUTION);
        let mut solver: Backtracker = Solver::new(board.clone(), Markers::none());
        assert_eq!(solver.solve(), Some(board));
        assert_eq!(solver.stats().decisions, 0);
    }

    #[test]
    fn complete_board_violating_a_black_dot_is_rejected() {
        let board = Board::new(EXAMPLE_NINE_SOLUTION);
        // (0, 0) = 5 and (0, 1) = 3: not a doubling pair.
        let mut markers = Markers::none();
        markers.set_horizontal(0, 0, Some(BlackDot));
        let mut solver: Backtracker = Solver::new(board.clone(), markers);
        assert_eq!(solver.solve(), None);
        assert_eq!(solver.board, board);
    }

    #[test]
    fn black_dot_between_compatible_givens_is_accepted() {
        let board = Board::new(EXAMPLE_NINE_SOLUTION);
        let (row, col) = (0..GRID_SIZE)
            .flat_map(|r| (0..GRID_SIZE - 1).map(move |c| (r, c)))
            .find(|&(r, c)| {
                let a = board[Cell::new(r, c)];
                let b = board[Cell::new(r, c + 1)];
                a == 2 * b || b == 2 * a
            })
            .expect("solution grid contains a horizontal doubling pair");
        let mut markers = Markers::none();
        markers.set_horizontal(row, col, Some(BlackDot));

        let mut solver: Backtracker = Solver::new(board.clone(), markers);
        assert_eq!(solver.solve(), Some(board));
    }

    #[test]
    fn black_dot_on_a_given_nine_empties_the_neighbor_domain() {
        // 9 has no doubling partner in 1..=9, so the marked neighbor's
        // initial domain is empty and the engine rejects before searching.
        let mut board = Board::empty();
        board[Cell::new(4, 4)] = 9;
        let mut markers = Markers::none();
        markers.set_horizontal(4, 4, Some(BlackDot));

        let mut solver: Backtracker = Solver::new(board, markers);
        assert_eq!(solver.solve(), None);
    }

    #[test]
    fn repeated_solves_are_deterministic() {
        let mut first: Backtracker = Solver::new(Board::empty(), Markers::none());
        let mut second: Backtracker = Solver::new(Board::empty(), Markers::none());
        assert_eq!(first.solve(), second.solve());
        assert_eq!(first.stats(), second.stats());
    }

    #[test]
    fn failed_search_restores_every_domain_exactly() {
        // The classic example has a unique solution with 4 at (0, 2);
        // pinning that cell to 2 keeps the givens locally consistent but
        // makes the instance unsolvable, forcing a full search that must
        // unwind every forward-checking prune it made.
        let mut board = Board::new(EXAMPLE_NINE);
        board[Cell::new(0, 2)] = 2;
        let before = board.clone();
        let mut solver = Backtracker::with_selector(board, Markers::none(), MrvDegree);
        let initial = solver.domains.clone();

        assert_eq!(solver.solve(), None);
        assert_eq!(solver.domains, initial);
        assert_eq!(solver.board, before);
        assert!(solver.stats().backtracks > 0);
    }

    #[test]
    fn strategies_agree_on_solvability() {
        let board = Board::new(EXAMPLE_NINE);
        let mut mrv: Backtracker = Solver::new(board.clone(), Markers::none());
        let mut fixed: Backtracker<FirstUnassigned> = Solver::new(board.clone(), Markers::none());
        let mut random: Backtracker<RandomOrder> = Solver::new(board, Markers::none());
        let expected = Some(Board::new(EXAMPLE_NINE_SOLUTION));
        assert_eq!(mrv.solve(), expected);
        assert_eq!(fixed.solve(), expected);
        assert_eq!(random.solve(), expected);
    }
}
