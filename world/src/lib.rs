#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Local mirror of the arena for a single decision turn.
//!
//! The engine owns the real game state. The arena rebuilt here from each
//! snapshot lets the decision systems see their own commands take effect
//! immediately: a wall placed by an early stage blocks the paths evaluated
//! by a later one, and currency spent on it is no longer available.

use breach_core::{
    cell_index, in_arena_bounds, Cell, Command, Edge, Event, PlayerStats, RemovalError, Side,
    SpawnError, Unit, UnitCatalog, UnitKind, UpgradeError, CELL_COUNT, HALF_ARENA,
};

/// Unit placement reported by the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedUnit {
    /// Cell the unit occupies.
    pub cell: Cell,
    /// Kind of unit.
    pub kind: UnitKind,
    /// Player controlling the unit.
    pub owner: Side,
    /// Reported health; the catalog maximum when absent.
    pub health: Option<f32>,
    /// Whether the engine reported an upgrade on the unit.
    pub upgraded: bool,
    /// Whether the engine reported a pending removal on the unit.
    pub pending_removal: bool,
}

impl PlacedUnit {
    /// Describes a full-health, unmodified unit.
    #[must_use]
    pub const fn new(cell: Cell, kind: UnitKind, owner: Side) -> Self {
        Self {
            cell,
            kind,
            owner,
            health: None,
            upgraded: false,
            pending_removal: false,
        }
    }

    /// Sets the reported health.
    #[must_use]
    pub fn with_health(mut self, health: f32) -> Self {
        self.health = Some(health);
        self
    }

    /// Marks the unit as upgraded.
    #[must_use]
    pub fn upgraded(mut self) -> Self {
        self.upgraded = true;
        self
    }
}

/// Everything the engine reports at the start of a turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArenaSnapshot {
    /// Turn number, starting at zero.
    pub turn: u32,
    /// Stats of the friendly player.
    pub friendly: PlayerStats,
    /// Stats of the enemy player.
    pub enemy: PlayerStats,
    /// Every unit on the board.
    pub units: Vec<PlacedUnit>,
}

/// Dense arena state owned by the orchestrator for one turn.
#[derive(Debug)]
pub struct Arena {
    catalog: UnitCatalog,
    cells: Vec<Vec<Unit>>,
    stats: [PlayerStats; 2],
    turn: u32,
    layout_version: u64,
}

impl Arena {
    /// Creates an empty arena on turn zero with no currency.
    #[must_use]
    pub fn new(catalog: UnitCatalog) -> Self {
        Self {
            catalog,
            cells: vec![Vec::new(); CELL_COUNT],
            stats: [PlayerStats::default(); 2],
            turn: 0,
            layout_version: 0,
        }
    }

    /// Rebuilds the arena from an engine snapshot.
    ///
    /// Units reported outside the grid are dropped with a warning.
    #[must_use]
    pub fn from_snapshot(catalog: UnitCatalog, snapshot: ArenaSnapshot) -> Self {
        let mut arena = Self::new(catalog);
        arena.turn = snapshot.turn;
        arena.stats = [snapshot.friendly, snapshot.enemy];

        for placed in snapshot.units {
            let Some(index) = cell_index(placed.cell) else {
                log::warn!("dropping {:?} reported outside the grid at {:?}", placed.kind, placed.cell);
                continue;
            };

            let mut unit = Unit::new(placed.kind, placed.owner, &arena.catalog);
            if placed.upgraded {
                unit.upgrade(&arena.catalog);
            }
            if let Some(health) = placed.health {
                unit = unit.with_health(health);
            }
            if placed.pending_removal {
                unit.mark_pending_removal();
            }
            arena.cells[index].push(unit);
        }

        arena
    }

    fn friendly_mut(&mut self) -> &mut PlayerStats {
        &mut self.stats[Side::Friendly.player_index()]
    }

    fn bump_layout(&mut self, out_events: &mut Vec<Event>) {
        self.layout_version = self.layout_version.wrapping_add(1);
        out_events.push(Event::LayoutChanged {
            version: self.layout_version,
        });
    }

    fn spawn(&mut self, kind: UnitKind, cell: Cell, count: u32) -> Result<u32, SpawnError> {
        if count == 0 {
            return Err(SpawnError::ZeroCount);
        }
        if !in_arena_bounds(cell) {
            return Err(SpawnError::OutOfBounds);
        }

        let index = cell_index(cell).ok_or(SpawnError::OutOfBounds)?;
        let occupants = &self.cells[index];
        let requested = if kind.is_stationary() {
            if cell.y() >= HALF_ARENA {
                return Err(SpawnError::WrongTerritory);
            }
            if !occupants.is_empty() {
                return Err(SpawnError::Occupied);
            }
            1
        } else {
            if !Edge::BottomLeft.contains(cell) && !Edge::BottomRight.contains(cell) {
                return Err(SpawnError::NotOnEdge);
            }
            if occupants.iter().any(Unit::is_stationary) {
                return Err(SpawnError::Occupied);
            }
            count
        };

        let cost = self.catalog.cost(kind);
        let spawned = self
            .friendly_mut()
            .resources
            .affordable_count(cost)
            .min(requested);
        if spawned == 0 {
            return Err(SpawnError::InsufficientResources);
        }

        self.friendly_mut().resources.spend(cost.times(spawned));
        let unit = Unit::new(kind, Side::Friendly, &self.catalog);
        self.cells[index].extend(std::iter::repeat(unit).take(spawned as usize));
        Ok(spawned)
    }

    fn upgrade(&mut self, cell: Cell) -> Result<UnitKind, UpgradeError> {
        let index = cell_index(cell).ok_or(UpgradeError::Empty)?;
        let stats = &mut self.stats[Side::Friendly.player_index()];
        let unit = self.cells[index]
            .iter_mut()
            .find(|unit| unit.is_stationary())
            .ok_or(UpgradeError::Empty)?;
        if unit.owner() != Side::Friendly {
            return Err(UpgradeError::NotOwned);
        }
        if unit.is_upgraded() {
            return Err(UpgradeError::AlreadyUpgraded);
        }

        let kind = unit.kind();
        let cost = self
            .catalog
            .upgrade_cost(kind)
            .ok_or(UpgradeError::NotUpgradable)?;
        if !stats.resources.can_afford(cost) {
            return Err(UpgradeError::InsufficientResources);
        }

        unit.upgrade(&self.catalog);
        stats.resources.spend(cost);
        Ok(kind)
    }

    fn schedule_removal(&mut self, cell: Cell) -> Result<UnitKind, RemovalError> {
        let index = cell_index(cell).ok_or(RemovalError::Empty)?;
        let unit = self.cells[index]
            .iter_mut()
            .find(|unit| unit.is_stationary())
            .ok_or(RemovalError::Empty)?;
        if unit.owner() != Side::Friendly {
            return Err(RemovalError::NotOwned);
        }
        unit.mark_pending_removal();
        Ok(unit.kind())
    }
}

/// Applies a friendly command locally, mirroring the engine's validation.
///
/// Rejections are reported as events and leave the arena untouched. Any
/// change to stationary units bumps the layout version so cached paths and
/// coverage are recomputed.
pub fn apply(arena: &mut Arena, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Spawn { kind, cell, count } => match arena.spawn(kind, cell, count) {
            Ok(spawned) => {
                out_events.push(Event::UnitsSpawned {
                    kind,
                    cell,
                    count: spawned,
                });
                if kind.is_stationary() {
                    arena.bump_layout(out_events);
                }
            }
            Err(reason) => out_events.push(Event::SpawnRejected { kind, cell, reason }),
        },
        Command::Upgrade { cell } => match arena.upgrade(cell) {
            Ok(kind) => {
                out_events.push(Event::UnitUpgraded { kind, cell });
                arena.bump_layout(out_events);
            }
            Err(reason) => out_events.push(Event::UpgradeRejected { cell, reason }),
        },
        Command::Remove { cell } => match arena.schedule_removal(cell) {
            Ok(kind) => out_events.push(Event::RemovalScheduled { kind, cell }),
            Err(reason) => out_events.push(Event::RemovalRejected { cell, reason }),
        },
    }
}

/// Query functions that provide read-only access to the arena.
pub mod query {
    use super::Arena;
    use breach_core::{PlayerStats, Resources, Side, SpatialMap, UnitCatalog};

    /// Captures a read-only spatial view of the arena.
    #[must_use]
    pub fn spatial_map(arena: &Arena) -> SpatialMap<'_> {
        SpatialMap::new(&arena.cells, arena.turn, arena.layout_version)
    }

    /// Catalog the arena resolves unit stats against.
    #[must_use]
    pub fn catalog(arena: &Arena) -> &UnitCatalog {
        &arena.catalog
    }

    /// Stats currently held by a player.
    #[must_use]
    pub fn player_stats(arena: &Arena, side: Side) -> PlayerStats {
        arena.stats[side.player_index()]
    }

    /// Currencies currently held by a player.
    #[must_use]
    pub fn resources(arena: &Arena, side: Side) -> Resources {
        arena.stats[side.player_index()].resources
    }

    /// Turn the arena was captured on.
    #[must_use]
    pub fn turn(arena: &Arena) -> u32 {
        arena.turn
    }
}
