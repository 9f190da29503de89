use std::collections::HashMap;

use crate::{Cell, Path, Side, SpatialMap};

/// One unit's contribution to a cell: damage for attackers, shield for supports.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contribution {
    /// Cell the contributing structure stands on.
    pub source: Cell,
    /// Damage or shield granted.
    pub amount: f32,
}

/// Memoised per-turn derivations.
///
/// Entries are scoped to one `(turn, layout_version)` pair. Calling
/// [`TurnCache::sync`] with a map from another turn or layout drops every
/// entry, so stale paths or coverage never leak across placements.
#[derive(Debug, Default)]
pub struct TurnCache {
    turn: u32,
    layout_version: u64,
    paths: HashMap<Cell, Option<Path>>,
    attackers: HashMap<(Cell, Side), Vec<Contribution>>,
    shielders: HashMap<(Cell, Side), Vec<Contribution>>,
}

impl TurnCache {
    /// Creates an empty cache scoped to the map's turn and layout.
    #[must_use]
    pub fn for_map(map: &SpatialMap<'_>) -> Self {
        Self {
            turn: map.turn(),
            layout_version: map.layout_version(),
            ..Self::default()
        }
    }

    /// Drops every entry if the map belongs to another turn or layout.
    ///
    /// Returns `true` when entries were invalidated.
    pub fn sync(&mut self, map: &SpatialMap<'_>) -> bool {
        if self.turn == map.turn() && self.layout_version == map.layout_version() {
            return false;
        }

        self.turn = map.turn();
        self.layout_version = map.layout_version();
        self.paths.clear();
        self.attackers.clear();
        self.shielders.clear();
        true
    }

    /// Layout version the entries were computed against.
    #[must_use]
    pub const fn layout_version(&self) -> u64 {
        self.layout_version
    }

    /// Number of memoised path lookups, including unreachable origins.
    #[must_use]
    pub fn cached_paths(&self) -> usize {
        self.paths.len()
    }

    /// Previously resolved path for the origin; the outer `None` means unknown.
    #[must_use]
    pub fn path(&self, origin: Cell) -> Option<Option<&Path>> {
        self.paths.get(&origin).map(Option::as_ref)
    }

    /// Returns the memoised path, resolving it on first use.
    pub fn path_or_insert_with<F>(&mut self, origin: Cell, resolve: F) -> Option<&Path>
    where
        F: FnOnce() -> Option<Path>,
    {
        self.paths.entry(origin).or_insert_with(resolve).as_ref()
    }

    /// Returns the attackers covering a cell for units owned by `side`.
    pub fn attackers_or_insert_with<F>(&mut self, cell: Cell, side: Side, scan: F) -> &[Contribution]
    where
        F: FnOnce() -> Vec<Contribution>,
    {
        self.attackers.entry((cell, side)).or_insert_with(scan)
    }

    /// Returns the supports shielding a cell for units owned by `side`.
    pub fn shielders_or_insert_with<F>(&mut self, cell: Cell, side: Side, scan: F) -> &[Contribution]
    where
        F: FnOnce() -> Vec<Contribution>,
    {
        self.shielders.entry((cell, side)).or_insert_with(scan)
    }
}
