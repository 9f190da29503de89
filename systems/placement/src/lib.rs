#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Staged, budget-aware construction of stationary defenses.
//!
//! A placement plan is an ordered list of stages. Each stage names one unit
//! kind, the cells it should occupy, and whether those units are deployed,
//! upgraded, or both. Stages are gated strictly: stage N+1 is not touched
//! until every earlier stage is complete. Within a stage, targets are tried
//! in enumeration order and satisfied targets are skipped, so a stage that
//! runs out of currency resumes on the next unsatisfied target next turn.

mod ledger;

use breach_core::{Cell, Command, Resources, Side, SpatialMap, UnitCatalog, UnitKind};
use serde::{Deserialize, Serialize};

pub use ledger::{Attempt, BuildLedger};

/// What a stage does to each of its targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageAction {
    /// Place the unit.
    Deploy,
    /// Upgrade an already placed unit.
    Upgrade,
    /// Place the unit, then upgrade it before moving to the next target.
    DeployUpgraded,
}

/// One named step of a placement plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Label used in logs.
    pub name: String,
    /// Unit kind the stage builds.
    pub kind: UnitKind,
    /// Cells in the order they are attempted.
    pub targets: Vec<Cell>,
    /// Action applied to each target.
    pub action: StageAction,
    /// Whether damaged units on the targets are removed for rebuilding.
    #[serde(default)]
    pub repair: bool,
}

impl Stage {
    /// Creates a stage.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: UnitKind, action: StageAction, targets: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            kind,
            targets,
            action,
            repair: false,
        }
    }

    /// Enables repair by demolition for the stage's targets.
    #[must_use]
    pub fn with_repair(mut self) -> Self {
        self.repair = true;
        self
    }
}

/// Progress of a stage as of the latest planning pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StageStatus {
    /// Not started: no target satisfied and nothing affordable.
    #[default]
    Pending,
    /// Progress was made this turn but targets remain.
    InProgress,
    /// Every target is satisfied.
    Complete,
    /// Started earlier but nothing could be done this turn.
    Blocked,
}

/// Ordered stages together with their latest statuses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementPlan {
    stages: Vec<Stage>,
    statuses: Vec<StageStatus>,
}

impl PlacementPlan {
    /// Creates a plan in which every stage is pending.
    #[must_use]
    pub fn new(stages: Vec<Stage>) -> Self {
        let statuses = vec![StageStatus::Pending; stages.len()];
        Self { stages, statuses }
    }

    /// Stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Status of the stage at `index`.
    #[must_use]
    pub fn status(&self, index: usize) -> Option<StageStatus> {
        self.statuses.get(index).copied()
    }

    /// Reports whether every stage was complete after the latest pass.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.statuses
            .iter()
            .all(|status| *status == StageStatus::Complete)
    }

    /// Adds `cell` to the targets of the stage at `index`.
    ///
    /// Returns false when the stage does not exist or already targets the cell.
    /// A stage that gains a target can no longer be complete.
    pub fn add_target(&mut self, index: usize, cell: Cell) -> bool {
        let Some(stage) = self.stages.get_mut(index) else {
            return false;
        };
        if stage.targets.contains(&cell) {
            return false;
        }
        stage.targets.push(cell);
        if self.statuses[index] == StageStatus::Complete {
            self.statuses[index] = StageStatus::Pending;
        }
        true
    }
}

/// Health thresholds that trigger repair by demolition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairPolicy {
    /// Remove un-upgraded units at or below this fraction of maximum health.
    pub threshold: f32,
    /// Remove upgraded units below this fraction of maximum health.
    pub upgraded_threshold: f32,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            upgraded_threshold: 0.9,
        }
    }
}

impl RepairPolicy {
    /// Reports whether a unit with the given health ratio should be rebuilt.
    #[must_use]
    pub fn needs_repair(&self, ratio: f32, upgraded: bool) -> bool {
        if upgraded {
            ratio < self.upgraded_threshold
        } else {
            ratio <= self.threshold
        }
    }
}

/// Runs a placement plan against the arena each turn.
#[derive(Debug, Default)]
pub struct PlacementPlanner {
    plan: PlacementPlan,
    repair: RepairPolicy,
}

impl PlacementPlanner {
    /// Creates a planner for the provided plan.
    #[must_use]
    pub fn new(plan: PlacementPlan, repair: RepairPolicy) -> Self {
        Self { plan, repair }
    }

    /// Plan with the statuses of the latest pass.
    #[must_use]
    pub fn plan(&self) -> &PlacementPlan {
        &self.plan
    }

    /// Mutable access for strategies that extend the plan mid-game.
    pub fn plan_mut(&mut self) -> &mut PlacementPlan {
        &mut self.plan
    }

    /// Schedules removal of damaged units standing on repair-enabled targets.
    ///
    /// A cell listed by several stages is removed once.
    pub fn repair(&self, map: &SpatialMap<'_>, out: &mut Vec<Command>) {
        let mut removed = Vec::new();
        for stage in self.plan.stages.iter().filter(|stage| stage.repair) {
            for cell in &stage.targets {
                let Some(unit) = map.stationary_at(*cell) else {
                    continue;
                };
                if unit.owner() != Side::Friendly || unit.is_pending_removal() || removed.contains(cell) {
                    continue;
                }
                if self.repair.needs_repair(unit.health_ratio(), unit.is_upgraded()) {
                    log::debug!(
                        "stage {} removes damaged {:?} at {cell:?} ({:.0}% health)",
                        stage.name,
                        unit.kind(),
                        unit.health_ratio() * 100.0
                    );
                    out.push(Command::Remove { cell: *cell });
                    removed.push(*cell);
                }
            }
        }
    }

    /// Advances the plan within the structure budget.
    ///
    /// Commands are pushed to `out` and their cost is deducted from
    /// `budget`. Processing stops at the first stage that is not complete.
    pub fn handle(
        &mut self,
        map: &SpatialMap<'_>,
        catalog: &UnitCatalog,
        budget: &mut Resources,
        ledger: &mut BuildLedger,
        out: &mut Vec<Command>,
    ) {
        let end = self.plan.stages.len();
        let _ = self.handle_before(end, map, catalog, budget, ledger, out);
    }

    /// Advances only the stages before `end`.
    ///
    /// Returns whether all of them are complete. Stages at or after `end`
    /// keep their previous status.
    pub fn handle_before(
        &mut self,
        end: usize,
        map: &SpatialMap<'_>,
        catalog: &UnitCatalog,
        budget: &mut Resources,
        ledger: &mut BuildLedger,
        out: &mut Vec<Command>,
    ) -> bool {
        let stages = self.plan.stages.iter().zip(self.plan.statuses.iter_mut());
        for (stage, status) in stages.take(end) {
            *status = run_stage(stage, map, catalog, budget, ledger, out);
            log::debug!("stage {} is {:?}", stage.name, status);
            if *status != StageStatus::Complete {
                return false;
            }
        }
        true
    }
}

fn run_stage(
    stage: &Stage,
    map: &SpatialMap<'_>,
    catalog: &UnitCatalog,
    budget: &mut Resources,
    ledger: &mut BuildLedger,
    out: &mut Vec<Command>,
) -> StageStatus {
    let mut progressed = false;
    let mut started = false;
    let mut complete = true;

    for cell in &stage.targets {
        let attempt = match stage.action {
            StageAction::Deploy => ledger.deploy(map, catalog, budget, stage.kind, *cell, out),
            StageAction::Upgrade => ledger.upgrade(map, catalog, budget, stage.kind, *cell, out),
            StageAction::DeployUpgraded => {
                match ledger.deploy(map, catalog, budget, stage.kind, *cell, out) {
                    Attempt::Satisfied => {
                        started = true;
                        ledger.upgrade(map, catalog, budget, stage.kind, *cell, out)
                    }
                    Attempt::Issued => {
                        progressed = true;
                        ledger.upgrade(map, catalog, budget, stage.kind, *cell, out)
                    }
                    other => other,
                }
            }
        };

        match attempt {
            Attempt::Satisfied => started = true,
            Attempt::Issued => progressed = true,
            Attempt::Obstructed => complete = false,
            Attempt::Unaffordable => {
                complete = false;
                break;
            }
        }
    }

    if complete {
        StageStatus::Complete
    } else if progressed {
        StageStatus::InProgress
    } else if started {
        StageStatus::Blocked
    } else {
        StageStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repair_thresholds_differ_by_upgrade() {
        let policy = RepairPolicy::default();
        assert!(policy.needs_repair(0.8, false));
        assert!(!policy.needs_repair(0.81, false));
        assert!(policy.needs_repair(0.89, true));
        assert!(!policy.needs_repair(0.9, true));
    }

    #[test]
    fn added_targets_reopen_a_stage() {
        let mut plan = PlacementPlan::new(vec![Stage::new(
            "adaptive",
            UnitKind::Turret,
            StageAction::DeployUpgraded,
            Vec::new(),
        )]);
        plan.statuses[0] = StageStatus::Complete;
        assert!(plan.is_complete());

        assert!(plan.add_target(0, Cell::new(13, 11)));
        assert!(!plan.add_target(0, Cell::new(13, 11)), "targets are not duplicated");
        assert!(!plan.add_target(3, Cell::new(13, 11)));
        assert_eq!(plan.status(0), Some(StageStatus::Pending));
        assert_eq!(plan.stages()[0].targets, vec![Cell::new(13, 11)]);
    }
}
