#![warn(missing_docs)]
//! This crate provides a constraint-satisfaction solver for Kropki Sudoku
//! puzzles: standard Sudoku distinctness rules plus white-dot (difference
//! of exactly 1) and black-dot (exact doubling) adjacency markers.

/// The `csp` module implements the constraint-satisfaction engine:
/// constraint graph derivation, domain initialization and backtracking
/// search with forward checking.
pub mod csp;

/// The `kropki` module implements the puzzle file format, solution
/// output and verification.
pub mod kropki;
