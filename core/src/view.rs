use crate::{cell_at_index, cell_index, in_arena_bounds, Cell, Edge, Side, Unit};

/// Read-only view over the arena's dense occupancy grid.
///
/// The view borrows the world's storage, so systems can query it freely
/// without cloning units. It carries the turn number and layout version
/// that scope every cached computation.
#[derive(Clone, Copy, Debug)]
pub struct SpatialMap<'a> {
    cells: &'a [Vec<Unit>],
    turn: u32,
    layout_version: u64,
}

impl<'a> SpatialMap<'a> {
    /// Wraps a row-major grid of unit lists.
    #[must_use]
    pub const fn new(cells: &'a [Vec<Unit>], turn: u32, layout_version: u64) -> Self {
        Self {
            cells,
            turn,
            layout_version,
        }
    }

    /// Turn number the view was captured on.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Counter that changes whenever stationary placement changes.
    #[must_use]
    pub const fn layout_version(&self) -> u64 {
        self.layout_version
    }

    /// Reports whether the cell lies inside the diamond.
    #[must_use]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        in_arena_bounds(cell)
    }

    /// Units occupying the cell, in the order they were recorded.
    #[must_use]
    pub fn occupants_at(&self, cell: Cell) -> &'a [Unit] {
        match cell_index(cell).and_then(|index| self.cells.get(index)) {
            Some(units) => units.as_slice(),
            None => &[],
        }
    }

    /// The stationary unit on the cell, if any.
    #[must_use]
    pub fn stationary_at(&self, cell: Cell) -> Option<&'a Unit> {
        self.occupants_at(cell)
            .iter()
            .find(|unit| unit.is_stationary())
    }

    /// Reports whether a structure occupies the cell.
    ///
    /// Blocked cells can neither be walked through nor spawned on.
    #[must_use]
    pub fn is_blocked_for_spawn(&self, cell: Cell) -> bool {
        self.stationary_at(cell).is_some()
    }

    /// In-bounds cells within `range` of `origin`, scanned column by column.
    #[must_use]
    pub fn cells_within_range(&self, origin: Cell, range: f32) -> Vec<Cell> {
        let radius = range.max(0.0).ceil() as i32;
        let mut found = Vec::new();
        for x in origin.x() - radius..=origin.x() + radius {
            for y in origin.y() - radius..=origin.y() + radius {
                let cell = Cell::new(x, y);
                if in_arena_bounds(cell) && origin.within_range(cell, range) {
                    found.push(cell);
                }
            }
        }
        found
    }

    /// Cells of one of the four diagonals in engine order, blocked or not.
    #[must_use]
    pub fn edge_cells(&self, edge: Edge) -> Vec<Cell> {
        edge.cells()
    }

    /// Friendly deploy cells enumerated left to right across both bottom edges.
    ///
    /// This is the candidate order the edge evaluator uses for tie-breaks.
    #[must_use]
    pub fn deploy_cells(&self) -> Vec<Cell> {
        let mut cells = self.edge_cells(Edge::BottomLeft);
        cells.reverse();
        cells.extend(self.edge_cells(Edge::BottomRight));
        cells
    }

    /// Deploy cells no structure stands on, in [`SpatialMap::deploy_cells`] order.
    #[must_use]
    pub fn open_deploy_cells(&self) -> Vec<Cell> {
        self.deploy_cells()
            .into_iter()
            .filter(|cell| !self.is_blocked_for_spawn(*cell))
            .collect()
    }

    /// Every stationary unit with its location, scanned in row-major order.
    pub fn stationary_units(&self) -> impl Iterator<Item = (Cell, &'a Unit)> + 'a {
        let cells = self.cells;
        cells.iter().enumerate().flat_map(|(index, units)| {
            let cell = cell_at_index(index);
            units
                .iter()
                .filter(|unit| unit.is_stationary())
                .map(move |unit| (cell, unit))
        })
    }

    /// Counts stationary units owned by `owner` on cells accepted by `predicate`.
    #[must_use]
    pub fn count_stationary<F>(&self, owner: Side, predicate: F) -> usize
    where
        F: Fn(Cell) -> bool,
    {
        self.stationary_units()
            .filter(|(cell, unit)| unit.owner() == owner && predicate(*cell))
            .count()
    }
}
