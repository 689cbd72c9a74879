#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Derives the constraint graph of a puzzle from its marker grids.
//!
//! For every unassigned cell the graph records the full set of cells it
//! must stay consistent with and the kind of each constraint. Dot markers
//! on a direct adjacency take precedence: a neighbor recorded with a dot
//! kind is never downgraded to plain distinctness, even though it also
//! shares a row or column.

use crate::csp::board::Markers;
use crate::csp::cell::{Cell, GRID_SIZE};
use crate::csp::constraint::ConstraintKind;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Per-variable neighbor list. Every cell has exactly 20 distinct peers
/// (8 in its row, 8 in its column, 4 more in its box), so the list always
/// fits inline.
pub type Neighbors = SmallVec<[(Cell, ConstraintKind); 20]>;

/// The derived, read-only constraint map of one puzzle instance.
#[derive(Debug, Clone, Default)]
pub struct ConstraintGraph {
    map: FxHashMap<Cell, Neighbors>,
}

impl ConstraintGraph {
    /// Builds the graph for the given variable set.
    ///
    /// Recording order per variable: the four dot-marked orthogonal
    /// adjacencies first, then row peers, column peers and box peers with
    /// [`ConstraintKind::MustDiffer`]. Insertion is idempotent, so a peer
    /// reached twice keeps its first (dot) kind.
    #[must_use]
    pub fn build(variables: &[Cell], markers: &Markers) -> Self {
        let mut map = FxHashMap::default();
        for &var in variables {
            map.insert(var, Self::neighbors_of(var, markers));
        }
        Self { map }
    }

    fn neighbors_of(var: Cell, markers: &Markers) -> Neighbors {
        let mut neighbors = Neighbors::new();
        let Cell { row, col } = var;

        if col > 0 {
            if let Some(kind) = markers.horizontal(row, col - 1) {
                record(&mut neighbors, Cell::new(row, col - 1), kind);
            }
        }
        if col + 1 < GRID_SIZE {
            if let Some(kind) = markers.horizontal(row, col) {
                record(&mut neighbors, Cell::new(row, col + 1), kind);
            }
        }
        if row > 0 {
            if let Some(kind) = markers.vertical(row - 1, col) {
                record(&mut neighbors, Cell::new(row - 1, col), kind);
            }
        }
        if row + 1 < GRID_SIZE {
            if let Some(kind) = markers.vertical(row, col) {
                record(&mut neighbors, Cell::new(row + 1, col), kind);
            }
        }

        for peer in Cell::row_cells(row) {
            if peer.col != col {
                record(&mut neighbors, peer, ConstraintKind::MustDiffer);
            }
        }
        for peer in Cell::col_cells(col) {
            if peer.row != row {
                record(&mut neighbors, peer, ConstraintKind::MustDiffer);
            }
        }
        // Box peers sharing the variable's row or column are already
        // covered by the scans above.
        for peer in Cell::box_cells(var) {
            if peer.row != row && peer.col != col {
                record(&mut neighbors, peer, ConstraintKind::MustDiffer);
            }
        }

        neighbors
    }

    /// The recorded neighbors of `cell`, in recording order.
    ///
    /// Cells that are not variables of this instance have no entry.
    #[must_use]
    pub fn neighbors(&self, cell: Cell) -> &[(Cell, ConstraintKind)] {
        self.map.get(&cell).map_or(&[], SmallVec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn record(neighbors: &mut Neighbors, cell: Cell, kind: ConstraintKind) {
    if !neighbors.iter().any(|&(existing, _)| existing == cell) {
        neighbors.push((cell, kind));
    }
}
