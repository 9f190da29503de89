#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic path resolver that reproduces the engine's movement rule.
//!
//! A mobile unit walks toward the diagonal opposite its starting quadrant.
//! The walk is computed in three passes over the stationary layout: an
//! idealness search finds the reachable cell closest to the target edge, a
//! validation sweep assigns breadth-first path lengths from that cell, and a
//! greedy descent walks the path lengths down while alternating axes the way
//! the engine does.

use std::collections::VecDeque;

use breach_core::{
    cell_index, in_arena_bounds, Cell, Edge, Path, SpatialMap, TurnCache, ARENA_SIZE, CELL_COUNT,
    HALF_ARENA,
};

/// Unvisited marker for the path length field.
const UNREACHED: i32 = -1;

/// Offsets tried around every cell, in the engine's order.
pub const ENGINE_NEIGHBOR_ORDER: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Tunable rules the resolver follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathingRules {
    neighbor_order: [(i32, i32); 4],
    require_exit: bool,
}

impl PathingRules {
    /// Rules matching the engine: engine neighbour order, exits required.
    pub const ENGINE: Self = Self::new(ENGINE_NEIGHBOR_ORDER, true);

    /// Creates a rule set.
    ///
    /// With `require_exit` disabled the resolver returns the walk to the most
    /// ideal reachable cell even when the target edge is sealed off, which is
    /// where the engine makes a stranded unit self-destruct.
    #[must_use]
    pub const fn new(neighbor_order: [(i32, i32); 4], require_exit: bool) -> Self {
        Self {
            neighbor_order,
            require_exit,
        }
    }

    /// Neighbour offsets in the order they are tried.
    #[must_use]
    pub const fn neighbor_order(&self) -> [(i32, i32); 4] {
        self.neighbor_order
    }

    /// Whether paths that never reach the target edge are discarded.
    #[must_use]
    pub const fn require_exit(&self) -> bool {
        self.require_exit
    }
}

impl Default for PathingRules {
    fn default() -> Self {
        Self::ENGINE
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Heading {
    Unmoved,
    Horizontal,
    Vertical,
}

/// Resolves mobile-unit paths against a spatial map.
#[derive(Debug)]
pub struct PathResolver {
    rules: PathingRules,
    workspace: Workspace,
}

impl PathResolver {
    /// Creates a resolver following the provided rules.
    #[must_use]
    pub fn new(rules: PathingRules) -> Self {
        Self {
            rules,
            workspace: Workspace::default(),
        }
    }

    /// Path a unit spawned on `origin` would take, memoised in `cache`.
    ///
    /// Returns `None` when the origin is outside the arena, sits under a
    /// structure, or (when exits are required) cannot reach its target edge.
    pub fn resolve(
        &mut self,
        map: &SpatialMap<'_>,
        origin: Cell,
        cache: &mut TurnCache,
    ) -> Option<Path> {
        if cache.sync(map) {
            log::debug!(
                "path cache invalidated for turn {} layout {}",
                map.turn(),
                map.layout_version()
            );
        }

        if let Some(known) = cache.path(origin) {
            return known.cloned();
        }

        let path = self.trace(map, origin);
        cache.path_or_insert_with(origin, || path).cloned()
    }

    /// Computes a path without consulting any cache.
    pub fn trace(&mut self, map: &SpatialMap<'_>, origin: Cell) -> Option<Path> {
        if !in_arena_bounds(origin) || map.is_blocked_for_spawn(origin) {
            return None;
        }

        let target = Edge::target_for(origin);
        let end_points = target.cells();
        let toward = Toward::edge(&end_points);
        self.workspace.prepare(map);

        let ideal = self.idealness_search(origin, target, toward);
        if self.rules.require_exit() && !target.contains(ideal) {
            log::debug!("no exit from {origin:?}: best reachable cell {ideal:?}");
            return None;
        }

        if target.contains(ideal) {
            self.validate(&end_points);
        } else {
            self.validate(&[ideal]);
        }
        self.descend(origin, toward)
            .and_then(|cells| Path::new(target, cells))
    }

    fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        self.rules
            .neighbor_order()
            .into_iter()
            .map(move |(dx, dy)| cell.offset(dx, dy))
            .filter(move |neighbor| self.workspace.is_open(*neighbor))
    }

    fn idealness_search(&mut self, origin: Cell, target: Edge, toward: Toward) -> Cell {
        let mut best = origin;
        let mut best_idealness = toward.idealness(origin, target);
        let _ = self.workspace.mark_seen(origin);
        self.workspace.queue.push_back(origin);

        while let Some(current) = self.workspace.queue.pop_front() {
            let neighbors: Vec<Cell> = self.neighbors(current).collect();
            for neighbor in neighbors {
                let idealness = toward.idealness(neighbor, target);
                if idealness > best_idealness {
                    best_idealness = idealness;
                    best = neighbor;
                }
                if self.workspace.mark_seen(neighbor) {
                    self.workspace.queue.push_back(neighbor);
                }
            }
        }

        best
    }

    fn validate(&mut self, seeds: &[Cell]) {
        self.workspace.queue.clear();
        for seed in seeds {
            self.workspace.set_length(*seed, 0);
            self.workspace.queue.push_back(*seed);
        }

        while let Some(current) = self.workspace.queue.pop_front() {
            if !self.workspace.is_open(current) {
                continue;
            }
            let length = self.workspace.length(current);
            let neighbors: Vec<Cell> = self.neighbors(current).collect();
            for neighbor in neighbors {
                if self.workspace.length(neighbor) == UNREACHED {
                    self.workspace.set_length(neighbor, length + 1);
                    self.workspace.queue.push_back(neighbor);
                }
            }
        }
    }

    fn descend(&self, origin: Cell, toward: Toward) -> Option<Vec<Cell>> {
        let mut cells = vec![origin];
        let mut current = origin;
        let mut heading = Heading::Unmoved;

        while self.workspace.length(current) != 0 {
            if cells.len() > CELL_COUNT {
                log::warn!("path from {origin:?} failed to converge");
                return None;
            }

            let next = self.next_move(current, heading, toward);
            if next == current {
                return None;
            }
            heading = if next.x() == current.x() {
                Heading::Vertical
            } else {
                Heading::Horizontal
            };
            cells.push(next);
            current = next;
        }

        Some(cells)
    }

    fn next_move(&self, current: Cell, heading: Heading, toward: Toward) -> Cell {
        let mut chosen = current;
        let mut best_length = self.workspace.length(current);

        for neighbor in self.neighbors(current) {
            let length = self.workspace.length(neighbor);
            if length > best_length {
                continue;
            }
            let shorter = length < best_length;
            if !shorter && !prefers(current, neighbor, chosen, heading, toward) {
                continue;
            }
            chosen = neighbor;
            best_length = length;
        }

        chosen
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(PathingRules::default())
    }
}

/// Tie-break between two neighbours with equal path length.
///
/// After a move the walk prefers switching axis; before the first move it
/// prefers vertical steps. Otherwise it prefers progress toward the target.
fn prefers(current: Cell, candidate: Cell, chosen: Cell, heading: Heading, toward: Toward) -> bool {
    match heading {
        Heading::Horizontal if candidate.x() != chosen.x() => return current.y() != candidate.y(),
        Heading::Vertical if candidate.y() != chosen.y() => return current.x() != candidate.x(),
        Heading::Unmoved => return current.y() != candidate.y(),
        _ => {}
    }

    if candidate.y() == chosen.y() {
        return (toward.dx == 1 && candidate.x() > chosen.x())
            || (toward.dx == -1 && candidate.x() < chosen.x());
    }
    if candidate.x() == chosen.x() {
        return (toward.dy == 1 && candidate.y() > chosen.y())
            || (toward.dy == -1 && candidate.y() < chosen.y());
    }
    true
}

/// Unit direction pointing at the target edge.
#[derive(Clone, Copy, Debug)]
struct Toward {
    dx: i32,
    dy: i32,
}

impl Toward {
    fn edge(end_points: &[Cell]) -> Self {
        let anchor = end_points.first().copied().unwrap_or(Cell::new(0, 0));
        Self {
            dx: if anchor.x() < HALF_ARENA { -1 } else { 1 },
            dy: if anchor.y() < HALF_ARENA { -1 } else { 1 },
        }
    }

    fn idealness(self, cell: Cell, target: Edge) -> u64 {
        if target.contains(cell) {
            return u64::MAX;
        }

        let rows = if self.dy == 1 { cell.y() } else { ARENA_SIZE - 1 - cell.y() };
        let columns = if self.dx == 1 { cell.x() } else { ARENA_SIZE - 1 - cell.x() };
        let progress = i64::from(ARENA_SIZE) * i64::from(rows) + i64::from(columns);
        u64::try_from(progress).unwrap_or(0)
    }
}

/// Scratch buffers reused across traces.
#[derive(Debug, Default)]
struct Workspace {
    blocked: Vec<bool>,
    seen: Vec<bool>,
    lengths: Vec<i32>,
    queue: VecDeque<Cell>,
}

impl Workspace {
    fn prepare(&mut self, map: &SpatialMap<'_>) {
        self.blocked.clear();
        self.blocked.resize(CELL_COUNT, false);
        for (cell, _) in map.stationary_units() {
            if let Some(index) = cell_index(cell) {
                self.blocked[index] = true;
            }
        }
        self.seen.clear();
        self.seen.resize(CELL_COUNT, false);
        self.lengths.clear();
        self.lengths.resize(CELL_COUNT, UNREACHED);
        self.queue.clear();
    }

    fn is_open(&self, cell: Cell) -> bool {
        in_arena_bounds(cell)
            && cell_index(cell)
                .and_then(|index| self.blocked.get(index))
                .is_some_and(|blocked| !blocked)
    }

    /// Marks the cell visited by the idealness search; false if already seen.
    fn mark_seen(&mut self, cell: Cell) -> bool {
        match cell_index(cell).and_then(|index| self.seen.get_mut(index)) {
            Some(seen) if !*seen => {
                *seen = true;
                true
            }
            _ => false,
        }
    }

    fn length(&self, cell: Cell) -> i32 {
        cell_index(cell)
            .and_then(|index| self.lengths.get(index))
            .copied()
            .unwrap_or(UNREACHED)
    }

    fn set_length(&mut self, cell: Cell, length: i32) {
        if let Some(slot) = cell_index(cell).and_then(|index| self.lengths.get_mut(index)) {
            *slot = length;
        }
    }
}
