use std::collections::HashMap;

use breach_core::{
    in_arena_bounds, Cell, Command, Resources, Side, SpatialMap, UnitCatalog, UnitKind, HALF_ARENA,
};

/// Result of asking the ledger for one structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// The cell already holds what was asked for.
    Satisfied,
    /// A command was issued and paid for.
    Issued,
    /// The request can never succeed this turn.
    Obstructed,
    /// The budget does not cover the request.
    Unaffordable,
}

#[derive(Clone, Copy, Debug)]
struct Structure {
    kind: UnitKind,
    owner: Side,
    upgraded: bool,
    pending_removal: bool,
}

/// Structures requested this turn, layered over the arena snapshot.
///
/// Commands are applied by the world only after systems have run, so the
/// ledger keeps later requests consistent with earlier ones in the same turn.
#[derive(Debug, Default)]
pub struct BuildLedger {
    overlay: HashMap<Cell, Structure>,
}

impl BuildLedger {
    /// Creates an empty ledger for a new turn.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells touched this turn.
    #[must_use]
    pub fn touched(&self) -> usize {
        self.overlay.len()
    }

    fn structure_at(&self, map: &SpatialMap<'_>, cell: Cell) -> Option<Structure> {
        if let Some(structure) = self.overlay.get(&cell) {
            return Some(*structure);
        }
        map.stationary_at(cell).map(|unit| Structure {
            kind: unit.kind(),
            owner: unit.owner(),
            upgraded: unit.is_upgraded(),
            pending_removal: unit.is_pending_removal(),
        })
    }

    /// Requests a friendly `kind` on `cell`.
    pub fn deploy(
        &mut self,
        map: &SpatialMap<'_>,
        catalog: &UnitCatalog,
        budget: &mut Resources,
        kind: UnitKind,
        cell: Cell,
        out: &mut Vec<Command>,
    ) -> Attempt {
        match self.structure_at(map, cell) {
            Some(existing) if existing.owner == Side::Friendly && existing.kind == kind => {
                return Attempt::Satisfied;
            }
            Some(_) => return Attempt::Obstructed,
            None => {}
        }
        if !kind.is_stationary()
            || !in_arena_bounds(cell)
            || cell.y() >= HALF_ARENA
            || !map.occupants_at(cell).is_empty()
        {
            return Attempt::Obstructed;
        }

        let cost = catalog.cost(kind);
        if !budget.can_afford(cost) {
            return Attempt::Unaffordable;
        }

        budget.spend(cost);
        out.push(Command::Spawn {
            kind,
            cell,
            count: 1,
        });
        let _ = self.overlay.insert(
            cell,
            Structure {
                kind,
                owner: Side::Friendly,
                upgraded: false,
                pending_removal: false,
            },
        );
        Attempt::Issued
    }

    /// Requests an upgrade of the friendly `kind` standing on `cell`.
    pub fn upgrade(
        &mut self,
        map: &SpatialMap<'_>,
        catalog: &UnitCatalog,
        budget: &mut Resources,
        kind: UnitKind,
        cell: Cell,
        out: &mut Vec<Command>,
    ) -> Attempt {
        let Some(mut existing) = self.structure_at(map, cell) else {
            return Attempt::Obstructed;
        };
        if existing.owner != Side::Friendly || existing.kind != kind {
            return Attempt::Obstructed;
        }
        if existing.upgraded {
            return Attempt::Satisfied;
        }
        if existing.pending_removal {
            return Attempt::Obstructed;
        }
        let Some(cost) = catalog.upgrade_cost(kind) else {
            return Attempt::Obstructed;
        };
        if !budget.can_afford(cost) {
            return Attempt::Unaffordable;
        }

        budget.spend(cost);
        out.push(Command::Upgrade { cell });
        existing.upgraded = true;
        let _ = self.overlay.insert(cell, existing);
        Attempt::Issued
    }
}
