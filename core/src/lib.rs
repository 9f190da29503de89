#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Breach decision layer.
//!
//! This crate defines the message surface that connects the engine adapters,
//! the local arena mirror, and the pure decision systems. Systems read the
//! arena through a [`SpatialMap`] view, emit [`Command`] values describing
//! the moves they want, and the world applies those commands locally before
//! broadcasting [`Event`] values describing what was accepted or rejected.
//! The engine stays authoritative: every command is a request, never a fact.

mod cache;
mod catalog;
mod view;

use serde::{Deserialize, Serialize};

pub use cache::{Contribution, TurnCache};
pub use catalog::{Cost, UnitCatalog, UnitProfile, UnitStats};
pub use view::SpatialMap;

/// Width and height of the square that bounds the diamond arena.
pub const ARENA_SIZE: i32 = 28;

/// Half of [`ARENA_SIZE`]; rows below it belong to the friendly side.
pub const HALF_ARENA: i32 = 14;

/// Number of cells in the dense square grid that bounds the arena.
pub const CELL_COUNT: usize = (ARENA_SIZE * ARENA_SIZE) as usize;

/// Slack the engine adds to every range comparison.
///
/// A target is in range when `distance < range + RANGE_TOLERANCE`.
pub const RANGE_TOLERANCE: f32 = 0.51;

/// Integer location of a single arena cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Cell {
    x: i32,
    y: i32,
}

impl Cell {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the cell, growing to the right.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the cell, growing toward the enemy side.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the cell displaced by the provided deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Squared Euclidean distance, exact in integer arithmetic.
    #[must_use]
    pub const fn distance_squared(self, other: Cell) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance, the metric the engine uses for every range check.
    #[must_use]
    pub fn distance(self, other: Cell) -> f32 {
        (self.distance_squared(other) as f32).sqrt()
    }

    /// Reports whether `other` lies within `range` of this cell under the engine's rules.
    #[must_use]
    pub fn within_range(self, other: Cell, range: f32) -> bool {
        self.distance(other) < range + RANGE_TOLERANCE
    }
}

impl From<[i32; 2]> for Cell {
    fn from(value: [i32; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<Cell> for [i32; 2] {
    fn from(cell: Cell) -> Self {
        [cell.x, cell.y]
    }
}

/// Reports whether the cell lies inside the diamond-shaped arena.
#[must_use]
pub fn in_arena_bounds(cell: Cell) -> bool {
    let (x, y) = (cell.x(), cell.y());
    if !(0..ARENA_SIZE).contains(&y) {
        return false;
    }

    let row_size = if y < HALF_ARENA { y + 1 } else { ARENA_SIZE - y };
    let start = HALF_ARENA - row_size;
    let end = start + 2 * row_size - 1;
    (start..=end).contains(&x)
}

/// Row-major offset of the cell inside the dense square grid.
#[must_use]
pub fn cell_index(cell: Cell) -> Option<usize> {
    if !(0..ARENA_SIZE).contains(&cell.x()) || !(0..ARENA_SIZE).contains(&cell.y()) {
        return None;
    }

    let x = usize::try_from(cell.x()).ok()?;
    let y = usize::try_from(cell.y()).ok()?;
    let width = usize::try_from(ARENA_SIZE).ok()?;
    Some(y * width + x)
}

/// Inverse of [`cell_index`].
#[must_use]
pub fn cell_at_index(index: usize) -> Cell {
    let width = ARENA_SIZE as usize;
    Cell::new((index % width) as i32, (index / width) as i32)
}

/// One of the four diagonal boundaries of the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    /// Upper right diagonal, the enemy's right flank.
    TopRight,
    /// Upper left diagonal, the enemy's left flank.
    TopLeft,
    /// Lower left diagonal, part of the friendly deploy zone.
    BottomLeft,
    /// Lower right diagonal, part of the friendly deploy zone.
    BottomRight,
}

impl Edge {
    /// Every edge in the engine's enumeration order.
    pub const ALL: [Edge; 4] = [
        Edge::TopRight,
        Edge::TopLeft,
        Edge::BottomLeft,
        Edge::BottomRight,
    ];

    /// Cells on the edge, in the order the engine enumerates them.
    ///
    /// Each edge starts next to the vertical centre line and walks outward.
    #[must_use]
    pub fn cells(self) -> Vec<Cell> {
        (0..HALF_ARENA)
            .map(|step| match self {
                Self::TopRight => Cell::new(HALF_ARENA + step, ARENA_SIZE - 1 - step),
                Self::TopLeft => Cell::new(HALF_ARENA - 1 - step, ARENA_SIZE - 1 - step),
                Self::BottomLeft => Cell::new(HALF_ARENA - 1 - step, step),
                Self::BottomRight => Cell::new(HALF_ARENA + step, step),
            })
            .collect()
    }

    /// Reports whether the cell lies on this edge.
    #[must_use]
    pub fn contains(self, cell: Cell) -> bool {
        let (x, y) = (cell.x(), cell.y());
        match self {
            Self::TopRight => y >= HALF_ARENA && x >= HALF_ARENA && x + y == 41,
            Self::TopLeft => y >= HALF_ARENA && x < HALF_ARENA && y - x == HALF_ARENA,
            Self::BottomLeft => y < HALF_ARENA && x < HALF_ARENA && x + y == HALF_ARENA - 1,
            Self::BottomRight => y < HALF_ARENA && x >= HALF_ARENA && x - y == HALF_ARENA,
        }
    }

    /// Edge a unit starting from `origin` will walk toward.
    ///
    /// Units head for the diagonal opposite the quadrant they start in.
    #[must_use]
    pub fn target_for(origin: Cell) -> Edge {
        let left = origin.x() < HALF_ARENA;
        let bottom = origin.y() < HALF_ARENA;
        match (left, bottom) {
            (true, true) => Self::TopRight,
            (true, false) => Self::BottomRight,
            (false, true) => Self::TopLeft,
            (false, false) => Self::BottomLeft,
        }
    }
}

/// Which player controls a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Units controlled by this decision layer.
    Friendly,
    /// Units controlled by the opponent.
    Enemy,
}

impl Side {
    /// Converts the engine's zero-based player index.
    ///
    /// # Panics
    ///
    /// Panics when `index` is neither `0` nor `1`. Callers always hold a
    /// valid index, so anything else is a programming error.
    #[must_use]
    pub fn from_player_index(index: usize) -> Self {
        match index {
            0 => Self::Friendly,
            1 => Self::Enemy,
            other => panic!("invalid player index {other}; expected 0 or 1"),
        }
    }

    /// Zero-based player index understood by the engine.
    #[must_use]
    pub const fn player_index(self) -> usize {
        match self {
            Self::Friendly => 0,
            Self::Enemy => 1,
        }
    }
}

/// Closed set of unit types understood by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Cheap blocking structure.
    Wall,
    /// Structure that shields friendly mobile units passing nearby.
    Support,
    /// Structure that attacks enemy units in range.
    Turret,
    /// Fast, fragile mobile unit.
    Scout,
    /// Long-range mobile unit that targets structures.
    Demolisher,
    /// Sturdy mobile unit that hunts enemy mobile units.
    Interceptor,
}

impl UnitKind {
    /// Every unit kind in the engine's configuration order.
    pub const ALL: [UnitKind; 6] = [
        UnitKind::Wall,
        UnitKind::Support,
        UnitKind::Turret,
        UnitKind::Scout,
        UnitKind::Demolisher,
        UnitKind::Interceptor,
    ];

    /// Reports whether the kind is a stationary structure.
    #[must_use]
    pub const fn is_stationary(self) -> bool {
        matches!(self, Self::Wall | Self::Support | Self::Turret)
    }

    /// Reports whether the kind moves along a path.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        !self.is_stationary()
    }

    /// Position of the kind in the engine's unit tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Wall => 0,
            Self::Support => 1,
            Self::Turret => 2,
            Self::Scout => 3,
            Self::Demolisher => 4,
            Self::Interceptor => 5,
        }
    }

    /// Resolves a position in the engine's unit tables.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Wall),
            1 => Some(Self::Support),
            2 => Some(Self::Turret),
            3 => Some(Self::Scout),
            4 => Some(Self::Demolisher),
            5 => Some(Self::Interceptor),
            _ => None,
        }
    }
}

/// A single unit as reported by the engine or placed locally this turn.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    kind: UnitKind,
    owner: Side,
    health: f32,
    upgraded: bool,
    pending_removal: bool,
    stats: UnitStats,
}

impl Unit {
    /// Creates a fresh, full-health unit using the catalog's base stats.
    #[must_use]
    pub fn new(kind: UnitKind, owner: Side, catalog: &UnitCatalog) -> Self {
        let stats = catalog.stats(kind, false);
        Self {
            kind,
            owner,
            health: stats.health,
            upgraded: false,
            pending_removal: false,
            stats,
        }
    }

    /// Overrides the unit's current health.
    #[must_use]
    pub fn with_health(mut self, health: f32) -> Self {
        self.health = health;
        self
    }

    /// Kind of the unit.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Player that controls the unit.
    #[must_use]
    pub const fn owner(&self) -> Side {
        self.owner
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Health of the unit when undamaged at its current level.
    #[must_use]
    pub const fn max_health(&self) -> f32 {
        self.stats.health
    }

    /// Current health as a fraction of maximum health.
    #[must_use]
    pub fn health_ratio(&self) -> f32 {
        if self.stats.health <= 0.0 {
            return 0.0;
        }
        self.health / self.stats.health
    }

    /// Indicates whether the unit has been upgraded.
    #[must_use]
    pub const fn is_upgraded(&self) -> bool {
        self.upgraded
    }

    /// Indicates whether removal was requested for the unit.
    #[must_use]
    pub const fn is_pending_removal(&self) -> bool {
        self.pending_removal
    }

    /// Stats resolved for the unit's current level.
    #[must_use]
    pub const fn stats(&self) -> &UnitStats {
        &self.stats
    }

    /// Reports whether the unit is a stationary structure.
    #[must_use]
    pub const fn is_stationary(&self) -> bool {
        self.kind.is_stationary()
    }

    /// Promotes the unit to its upgraded stats.
    ///
    /// Health grows by the difference between the two maximums, mirroring how
    /// the engine applies upgrades to damaged structures.
    pub fn upgrade(&mut self, catalog: &UnitCatalog) {
        if self.upgraded {
            return;
        }

        let upgraded = catalog.stats(self.kind, true);
        let bonus = (upgraded.health - self.stats.health).max(0.0);
        self.health = (self.health + bonus).min(upgraded.health);
        self.stats = upgraded;
        self.upgraded = true;
    }

    /// Flags the unit for removal at the end of the turn.
    pub fn mark_pending_removal(&mut self) {
        self.pending_removal = true;
    }
}

/// The two independent currencies held by a player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// Currency spent on stationary structures and upgrades.
    pub structure: f32,
    /// Currency spent on mobile units.
    pub mobile: f32,
}

impl Resources {
    const EPSILON: f32 = 1e-4;

    /// Creates a resource pool.
    #[must_use]
    pub const fn new(structure: f32, mobile: f32) -> Self {
        Self { structure, mobile }
    }

    /// Reports whether both currencies cover the cost.
    #[must_use]
    pub fn can_afford(&self, cost: Cost) -> bool {
        self.structure + Self::EPSILON >= cost.structure && self.mobile + Self::EPSILON >= cost.mobile
    }

    /// Number of units of the given cost the pool can pay for.
    ///
    /// A zero cost is treated as unaffordable so callers never loop forever.
    #[must_use]
    pub fn affordable_count(&self, cost: Cost) -> u32 {
        if cost.structure <= 0.0 && cost.mobile <= 0.0 {
            return 0;
        }

        let by_structure = if cost.structure > 0.0 {
            ((self.structure + Self::EPSILON) / cost.structure).floor()
        } else {
            f32::INFINITY
        };
        let by_mobile = if cost.mobile > 0.0 {
            ((self.mobile + Self::EPSILON) / cost.mobile).floor()
        } else {
            f32::INFINITY
        };
        by_structure.min(by_mobile).max(0.0) as u32
    }

    /// Deducts the cost, clamping each currency at zero.
    pub fn spend(&mut self, cost: Cost) {
        self.structure = (self.structure - cost.structure).max(0.0);
        self.mobile = (self.mobile - cost.mobile).max(0.0);
    }
}

/// Per-player totals reported by the engine each turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Remaining health of the player.
    pub health: f32,
    /// Currencies available this turn.
    pub resources: Resources,
}

/// Commands that express every mutation the decision layer may request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Requests one or more units of a kind at a cell.
    Spawn {
        /// Kind of unit to create.
        kind: UnitKind,
        /// Cell the units appear on.
        cell: Cell,
        /// Number of copies requested; mobile units may stack.
        count: u32,
    },
    /// Requests an upgrade of the friendly structure at a cell.
    Upgrade {
        /// Cell holding the structure.
        cell: Cell,
    },
    /// Requests removal of the friendly structure at a cell at end of turn.
    Remove {
        /// Cell holding the structure.
        cell: Cell,
    },
}

/// Events broadcast after commands are applied or engine frames are parsed.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that units were created locally.
    UnitsSpawned {
        /// Kind of unit created.
        kind: UnitKind,
        /// Cell the units occupy.
        cell: Cell,
        /// Number of units actually created, possibly fewer than requested.
        count: u32,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Kind requested.
        kind: UnitKind,
        /// Cell requested.
        cell: Cell,
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that a structure was upgraded.
    UnitUpgraded {
        /// Kind of the upgraded structure.
        kind: UnitKind,
        /// Cell holding the structure.
        cell: Cell,
    },
    /// Reports that an upgrade request was rejected.
    UpgradeRejected {
        /// Cell requested.
        cell: Cell,
        /// Specific reason the upgrade failed.
        reason: UpgradeError,
    },
    /// Confirms that a structure will be removed when the turn resolves.
    RemovalScheduled {
        /// Kind of the structure.
        kind: UnitKind,
        /// Cell holding the structure.
        cell: Cell,
    },
    /// Reports that a removal request was rejected.
    RemovalRejected {
        /// Cell requested.
        cell: Cell,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Announces that stationary placement changed and paths are stale.
    LayoutChanged {
        /// New layout version.
        version: u64,
    },
    /// A mobile unit crossed into a player's home edge.
    Breach(BreachEvent),
}

/// Engine-reported breach of a home edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreachEvent {
    /// Cell where the breach happened.
    pub cell: Cell,
    /// Kind of the breaching unit.
    pub kind: UnitKind,
    /// Health damage dealt to the defending player.
    pub damage: f32,
    /// Engine identifier of the breaching unit.
    pub unit_id: String,
    /// Owner of the breaching unit.
    pub owner: Side,
}

impl BreachEvent {
    /// Reports whether the opponent scored against us.
    #[must_use]
    pub fn scored_against_us(&self) -> bool {
        self.owner == Side::Enemy
    }
}

/// Reasons a spawn request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnError {
    /// The cell is outside the diamond.
    OutOfBounds,
    /// The cell belongs to the enemy half of the arena.
    WrongTerritory,
    /// Mobile units may only be deployed on the friendly edges.
    NotOnEdge,
    /// A structure already occupies the cell, or a structure was requested on top of units.
    Occupied,
    /// The player cannot afford a single unit.
    InsufficientResources,
    /// The request asked for zero units.
    ZeroCount,
}

/// Reasons an upgrade request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeError {
    /// No structure occupies the cell.
    Empty,
    /// The structure belongs to the opponent.
    NotOwned,
    /// The structure is already upgraded.
    AlreadyUpgraded,
    /// The catalog defines no upgrade for the structure.
    NotUpgradable,
    /// The player cannot afford the upgrade.
    InsufficientResources,
}

/// Reasons a removal request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalError {
    /// No structure occupies the cell.
    Empty,
    /// The structure belongs to the opponent.
    NotOwned,
}

/// Ordered walk a mobile unit takes from its origin to its exit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    target: Edge,
    cells: Vec<Cell>,
}

impl Path {
    /// Wraps a non-empty cell sequence; the first cell is the origin.
    #[must_use]
    pub fn new(target: Edge, cells: Vec<Cell>) -> Option<Self> {
        if cells.is_empty() {
            return None;
        }
        Some(Self { target, cells })
    }

    /// Cell the walk starts from.
    #[must_use]
    pub fn origin(&self) -> Cell {
        self.cells[0]
    }

    /// Cell the walk ends on.
    #[must_use]
    pub fn exit(&self) -> Cell {
        self.cells[self.cells.len() - 1]
    }

    /// Edge the unit walks toward.
    #[must_use]
    pub const fn target_edge(&self) -> Edge {
        self.target
    }

    /// Every cell on the walk, origin first.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of cells on the walk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; paths hold at least their origin.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reports whether the walk visits the cell.
    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }
}

/// Aggregate risk and support a mobile unit meets along one path.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ThreatProfile {
    /// Total damage the unit is expected to absorb.
    pub expected_damage: f32,
    /// Total shielding credited to the unit.
    pub shielding: f32,
    /// Number of distinct enemy attackers that cover the path.
    pub attackers: usize,
    /// Number of distinct friendly supports credited.
    pub shielders: usize,
}
