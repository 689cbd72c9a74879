//! The Kropki puzzle text format and its surrounding helpers.
//!
//! A puzzle file holds three blank-line separated sections: nine rows of
//! nine cell values (`0` = unassigned), nine rows of horizontal markers
//! (eight meaningful columns; a trailing ninth column is accepted and
//! ignored), and eight rows of nine vertical markers. Marker digits are
//! `0` (none), `1` (white dot) or `2` (black dot); anything else is
//! rejected with a [`ParseError`] naming the offending line.

use crate::csp::board::{Board, Markers, Value};
use crate::csp::cell::{Cell, GRID_SIZE};
use crate::csp::constraint::ConstraintKind;
use crate::csp::domain::Domain;
use crate::csp::solver::{Backtracker, Solver};
use itertools::Itertools;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// The classic 9x9 givens grid, dot-free. Its solution is unique.
pub const EXAMPLE_NINE: [[Value; 9]; 9] = [
    [5, 3, 0, 0, 7, 0, 0, 0, 0],
    [6, 0, 0, 1, 9, 5, 0, 0, 0],
    [0, 9, 8, 0, 0, 0, 0, 6, 0],
    [8, 0, 0, 0, 6, 0, 0, 0, 3],
    [4, 0, 0, 8, 0, 3, 0, 0, 1],
    [7, 0, 0, 0, 2, 0, 0, 0, 6],
    [0, 6, 0, 0, 0, 0, 2, 8, 0],
    [0, 0, 0, 4, 1, 9, 0, 0, 5],
    [0, 0, 0, 0, 8, 0, 0, 7, 9],
];

/// The unique solution of [`EXAMPLE_NINE`].
pub const EXAMPLE_NINE_SOLUTION: [[Value; 9]; 9] = [
    [5, 3, 4, 6, 7, 8, 9, 1, 2],
    [6, 7, 2, 1, 9, 5, 3, 4, 8],
    [1, 9, 8, 3, 4, 2, 5, 6, 7],
    [8, 5, 9, 7, 6, 1, 4, 2, 3],
    [4, 2, 6, 8, 5, 3, 7, 9, 1],
    [7, 1, 3, 9, 2, 4, 8, 5, 6],
    [9, 6, 1, 5, 3, 7, 2, 8, 4],
    [2, 8, 7, 4, 1, 9, 6, 3, 5],
    [3, 4, 5, 2, 8, 6, 1, 7, 9],
];

/// [`EXAMPLE_NINE`] in file form, with the first horizontal marker row
/// carrying dots consistent with the solution grid.
pub const EXAMPLE_FILE: &str = "\
5 3 0 0 7 0 0 0 0
6 0 0 1 9 5 0 0 0
0 9 8 0 0 0 0 6 0
8 0 0 0 6 0 0 0 3
4 0 0 8 0 3 0 0 1
7 0 0 0 2 0 0 0 6
0 6 0 0 0 0 2 8 0
0 0 0 4 1 9 0 0 5
0 0 0 0 8 0 0 7 9

0 1 0 1 1 1 0 2
0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0

0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0
";

const N: usize = GRID_SIZE as usize;

/// A parsed Kropki instance: the givens grid plus the two marker grids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Puzzle {
    pub board: Board,
    pub markers: Markers,
}

impl Puzzle {
    #[must_use]
    pub const fn new(board: Board, markers: Markers) -> Self {
        Self { board, markers }
    }

    /// Solves the instance with the default MRV + degree strategy.
    #[must_use]
    pub fn solve(&self) -> Option<Board> {
        let mut solver: Backtracker = Solver::new(self.board.clone(), self.markers.clone());
        solver.solve()
    }

    /// Independently checks a candidate solution: the grid must be fully
    /// assigned, agree with the givens, hold each of 1..=9 exactly once
    /// per row, column and box, and satisfy every dot marker.
    #[must_use]
    pub fn verify(&self, candidate: &Board) -> bool {
        if !candidate.is_complete() {
            return false;
        }
        if Cell::all().any(|cell| self.board[cell] != 0 && self.board[cell] != candidate[cell]) {
            return false;
        }

        let full: Domain = (1..=9).collect();
        let unit_ok = |cells: Vec<Cell>| -> bool {
            cells.into_iter().map(|c| candidate[c]).collect::<Domain>() == full
        };
        for i in 0..GRID_SIZE {
            if !unit_ok(Cell::row_cells(i).collect()) || !unit_ok(Cell::col_cells(i).collect()) {
                return false;
            }
        }
        for row in (0..GRID_SIZE).step_by(3) {
            for col in (0..GRID_SIZE).step_by(3) {
                if !unit_ok(Cell::box_cells(Cell::new(row, col)).collect()) {
                    return false;
                }
            }
        }

        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE - 1 {
                if let Some(kind) = self.markers.horizontal(row, col) {
                    let (a, b) = (candidate[Cell::new(row, col)], candidate[Cell::new(row, col + 1)]);
                    if !kind.satisfied_by(a, b) {
                        return false;
                    }
                }
            }
        }
        for row in 0..GRID_SIZE - 1 {
            for col in 0..GRID_SIZE {
                if let Some(kind) = self.markers.vertical(row, col) {
                    let (a, b) = (candidate[Cell::new(row, col)], candidate[Cell::new(row + 1, col)]);
                    if !kind.satisfied_by(a, b) {
                        return false;
                    }
                }
            }
        }

        true
    }
}

/// Errors produced while reading a puzzle file.
#[derive(Debug)]
pub enum ParseError {
    /// The file could not be read.
    Io(std::io::Error),
    /// The input does not split into board / horizontal / vertical
    /// sections separated by blank lines.
    Sections { found: usize },
    /// A section has the wrong number of rows.
    RowCount {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    /// A row has the wrong number of values.
    RowWidth {
        line: usize,
        expected: usize,
        found: usize,
    },
    /// A token is not a small integer.
    Token { line: usize, token: String },
    /// A cell value is outside `0..=9`.
    CellRange { line: usize, value: u8 },
    /// A marker value is outside `0..=2`.
    MarkerRange { line: usize, value: u8 },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read the puzzle file: {e}"),
            Self::Sections { found } => write!(
                f,
                "expected 3 blank-line separated sections (board, horizontal markers, vertical markers), found {found}"
            ),
            Self::RowCount {
                section,
                expected,
                found,
            } => write!(f, "expected {expected} {section} rows, found {found}"),
            Self::RowWidth {
                line,
                expected,
                found,
            } => write!(f, "line {line}: expected {expected} values, found {found}"),
            Self::Token { line, token } => {
                write!(f, "line {line}: invalid token {token:?}")
            }
            Self::CellRange { line, value } => {
                write!(f, "line {line}: cell value {value} is outside 0..=9")
            }
            Self::MarkerRange { line, value } => {
                write!(f, "line {line}: marker value {value} is outside 0..=2")
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Reads and parses a puzzle file.
pub fn parse_puzzle_file(path: &Path) -> Result<Puzzle, ParseError> {
    parse_puzzle(&fs::read_to_string(path)?)
}

/// Parses a puzzle from its text form.
pub fn parse_puzzle(input: &str) -> Result<Puzzle, ParseError> {
    let mut sections: Vec<Vec<(usize, &str)>> = vec![Vec::new()];
    for (idx, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            if !sections.last().is_some_and(Vec::is_empty) {
                sections.push(Vec::new());
            }
        } else {
            sections.last_mut().expect("sections is never empty").push((idx + 1, line));
        }
    }
    if sections.last().is_some_and(Vec::is_empty) {
        sections.pop();
    }

    let [board_rows, horizontal_rows, vertical_rows]: [Vec<(usize, &str)>; 3] = sections
        .try_into()
        .map_err(|sections: Vec<_>| ParseError::Sections {
            found: sections.len(),
        })?;

    if board_rows.len() != N {
        return Err(ParseError::RowCount {
            section: "board",
            expected: N,
            found: board_rows.len(),
        });
    }
    if horizontal_rows.len() != N {
        return Err(ParseError::RowCount {
            section: "horizontal marker",
            expected: N,
            found: horizontal_rows.len(),
        });
    }
    if vertical_rows.len() != N - 1 {
        return Err(ParseError::RowCount {
            section: "vertical marker",
            expected: N - 1,
            found: vertical_rows.len(),
        });
    }

    let mut board = Board::empty();
    for (row, &(line, text)) in board_rows.iter().enumerate() {
        let values = parse_row(line, text, N)?;
        for (col, &value) in values.iter().enumerate() {
            if value > 9 {
                return Err(ParseError::CellRange { line, value });
            }
            board[Cell::new(row as u8, col as u8)] = value;
        }
    }

    let mut markers = Markers::none();
    for (row, &(line, text)) in horizontal_rows.iter().enumerate() {
        // A trailing ninth column is tolerated and ignored.
        let values = parse_marker_row(line, text, N - 1)?;
        for (col, &value) in values.iter().take(N - 1).enumerate() {
            markers.set_horizontal(row as u8, col as u8, marker_kind(line, value)?);
        }
    }
    for (row, &(line, text)) in vertical_rows.iter().enumerate() {
        let values = parse_row(line, text, N)?;
        for (col, &value) in values.iter().enumerate() {
            markers.set_vertical(row as u8, col as u8, marker_kind(line, value)?);
        }
    }

    Ok(Puzzle::new(board, markers))
}

fn parse_row(line: usize, text: &str, expected: usize) -> Result<Vec<u8>, ParseError> {
    let values = tokenize(line, text)?;
    if values.len() == expected {
        Ok(values)
    } else {
        Err(ParseError::RowWidth {
            line,
            expected,
            found: values.len(),
        })
    }
}

fn parse_marker_row(line: usize, text: &str, expected: usize) -> Result<Vec<u8>, ParseError> {
    let values = tokenize(line, text)?;
    if values.len() == expected || values.len() == expected + 1 {
        Ok(values)
    } else {
        Err(ParseError::RowWidth {
            line,
            expected,
            found: values.len(),
        })
    }
}

fn tokenize(line: usize, text: &str) -> Result<Vec<u8>, ParseError> {
    text.split_whitespace()
        .map(|token| {
            token.parse::<u8>().map_err(|_| ParseError::Token {
                line,
                token: token.to_owned(),
            })
        })
        .try_collect()
}

fn marker_kind(line: usize, value: u8) -> Result<Option<ConstraintKind>, ParseError> {
    match value {
        0 => Ok(None),
        1 => Ok(Some(ConstraintKind::WhiteDot)),
        2 => Ok(Some(ConstraintKind::BlackDot)),
        value => Err(ParseError::MarkerRange { line, value }),
    }
}

const fn marker_digit(kind: Option<ConstraintKind>) -> u8 {
    match kind {
        None => 0,
        Some(ConstraintKind::WhiteDot) => 1,
        Some(ConstraintKind::BlackDot) => 2,
        Some(ConstraintKind::MustDiffer) => 3,
    }
}

impl FromStr for Puzzle {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_puzzle(s)
    }
}

impl Display for Puzzle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.board)?;
        writeln!(f)?;
        for row in 0..GRID_SIZE {
            let digits = (0..GRID_SIZE - 1)
                .map(|col| marker_digit(self.markers.horizontal(row, col)))
                .join(" ");
            writeln!(f, "{digits}")?;
        }
        writeln!(f)?;
        for row in 0..GRID_SIZE - 1 {
            let digits = (0..GRID_SIZE)
                .map(|col| marker_digit(self.markers.vertical(row, col)))
                .join(" ");
            writeln!(f, "{digits}")?;
        }
        Ok(())
    }
}

/// Writes a solved board to `path` as nine lines of space-separated
/// digits, the format the original tooling consumes.
pub fn write_solution(path: &Path, board: &Board) -> std::io::Result<()> {
    fs::write(path, board.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_file_parses_and_solves_to_the_known_solution() {
        let puzzle = parse_puzzle(EXAMPLE_FILE).unwrap();
        assert_eq!(puzzle.board, Board::new(EXAMPLE_NINE));
        assert_eq!(
            puzzle.markers.horizontal(0, 1),
            Some(ConstraintKind::WhiteDot)
        );
        assert_eq!(
            puzzle.markers.horizontal(0, 7),
            Some(ConstraintKind::BlackDot)
        );

        let solution = puzzle.solve().expect("example must be solvable");
        assert_eq!(solution, Board::new(EXAMPLE_NINE_SOLUTION));
        assert!(puzzle.verify(&solution));
    }

    #[test]
    fn display_round_trips() {
        let puzzle = parse_puzzle(EXAMPLE_FILE).unwrap();
        let reparsed: Puzzle = puzzle.to_string().parse().unwrap();
        assert_eq!(puzzle, reparsed);
    }

    #[test]
    fn ninth_horizontal_column_is_ignored() {
        let padded = EXAMPLE_FILE.replace("0 1 0 1 1 1 0 2", "0 1 0 1 1 1 0 2 0");
        let puzzle = parse_puzzle(&padded).unwrap();
        assert_eq!(puzzle, parse_puzzle(EXAMPLE_FILE).unwrap());
    }

    #[test]
    fn out_of_range_marker_is_rejected() {
        let bad = EXAMPLE_FILE.replace("0 1 0 1 1 1 0 2", "0 1 0 1 1 1 0 7");
        assert!(matches!(
            parse_puzzle(&bad),
            Err(ParseError::MarkerRange { value: 7, .. })
        ));
    }

    #[test]
    fn out_of_range_cell_is_rejected() {
        let bad = EXAMPLE_FILE.replacen("5 3 0", "5 13 0", 1);
        assert!(matches!(
            parse_puzzle(&bad),
            Err(ParseError::CellRange { value: 13, line: 1 })
        ));
    }

    #[test]
    fn non_numeric_token_is_rejected() {
        let bad = EXAMPLE_FILE.replacen('5', "x", 1);
        assert!(matches!(parse_puzzle(&bad), Err(ParseError::Token { .. })));
    }

    #[test]
    fn missing_section_is_rejected() {
        let truncated: String = EXAMPLE_FILE
            .lines()
            .take(9)
            .map(|l| format!("{l}\n"))
            .collect();
        assert!(matches!(
            parse_puzzle(&truncated),
            Err(ParseError::Sections { found: 1 })
        ));
    }

    #[test]
    fn short_row_is_rejected() {
        let bad = EXAMPLE_FILE.replacen("5 3 0 0 7 0 0 0 0", "5 3 0 0 7 0 0 0", 1);
        assert!(matches!(
            parse_puzzle(&bad),
            Err(ParseError::RowWidth {
                line: 1,
                expected: 9,
                found: 8,
            })
        ));
    }

    #[test]
    fn verify_rejects_tampered_solutions() {
        let puzzle = parse_puzzle(EXAMPLE_FILE).unwrap();
        let mut tampered = Board::new(EXAMPLE_NINE_SOLUTION);
        // Swapping two cells keeps the multiset but breaks a unit.
        let (a, b) = (Cell::new(8, 0), Cell::new(8, 1));
        let (va, vb) = (tampered[a], tampered[b]);
        tampered[a] = vb;
        tampered[b] = va;
        assert!(!puzzle.verify(&tampered));

        let incomplete = Board::new(EXAMPLE_NINE);
        assert!(!puzzle.verify(&incomplete));
    }
}
