//! # kropki-solver
//!
//! `kropki-solver` is a command-line solver for Kropki Sudoku puzzles:
//! standard 9x9 Sudoku augmented with white dots (adjacent values differ
//! by exactly 1) and black dots (one adjacent value exactly doubles the
//! other) between orthogonally adjacent cells.
//!
//! The engine is a backtracking constraint-satisfaction search with
//! forward checking and MRV + degree variable ordering; see the `csp`
//! module of the library crate.
//!
//! ## Usage
//!
//! ```sh
//! # Solve a puzzle file and print the grid plus statistics
//! kropki-solver puzzle.kropki
//!
//! # Solve explicitly, writing the solved grid to a file
//! kropki-solver solve --path puzzle.kropki --output solution.txt
//!
//! # Solve every .kropki file under a directory
//! kropki-solver dir --path puzzles/
//!
//! # Solve a puzzle passed inline and compare selection strategies
//! kropki-solver text --input "$(cat puzzle.kropki)" --selection random
//!
//! # Generate shell completions
//! kropki-solver completions bash
//! ```
//!
//! The puzzle file format is three blank-line separated sections: nine
//! rows of cell values (`0` = empty), nine rows of horizontal dot markers
//! and eight rows of vertical dot markers (`0` = none, `1` = white,
//! `2` = black).

use clap::Parser;

mod command_line;

/// Global allocator using `tikv-jemallocator`, matching the memory usage
/// figures reported in the statistics table.
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() {
    let cli = command_line::cli::Cli::parse();

    if let Err(e) = command_line::cli::run(cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
