#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn orchestration.
//!
//! The orchestrator owns everything that outlives a single turn: the
//! placement plan and its progress, remembered breach and repair cells, and
//! the random stream used for stalling. Each turn it runs the systems in a
//! fixed order against the arena, applies every command locally through
//! [`breach_world::apply`], and reports the commands the world accepted.

mod profile;

use breach_core::{
    BreachEvent, Cell, Command, Event, Side, SpatialMap, TurnCache, UnitCatalog, UnitKind,
};
use breach_system_lanes::{AttackBudget, AttackPlan, EdgeEvaluator, LaneAllocation, RankedEdges};
use breach_system_pathing::PathResolver;
use breach_system_placement::{BuildLedger, PlacementPlan, PlacementPlanner};
use breach_system_threat::ThreatEstimator;
use breach_world::{apply, query, Arena};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use profile::{
    AdaptiveDefense, Allowance, AttackSchedule, AttackTier, BlockedSwitch, DemolisherSwitch,
    InterceptorStall, ProfileError, StrategyProfile, BUILTIN_PROFILES,
};

/// Commands the world accepted during one turn, with the attack that was chosen.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnReport {
    /// Turn the report belongs to.
    pub turn: u32,
    /// Accepted commands in submission order, with spawn counts as granted.
    pub commands: Vec<Command>,
    /// Rejection events produced while applying commands.
    pub rejections: Vec<Event>,
    /// Attack launched this turn.
    pub attack: AttackPlan,
}

impl TurnReport {
    fn new(turn: u32) -> Self {
        Self {
            turn,
            commands: Vec::new(),
            rejections: Vec::new(),
            attack: AttackPlan::Hold,
        }
    }
}

/// Drives a strategy profile through the game, one turn at a time.
#[derive(Debug)]
pub struct TurnOrchestrator {
    profile: StrategyProfile,
    planner: PlacementPlanner,
    evaluator: EdgeEvaluator,
    rng: ChaCha8Rng,
    breaches: Vec<Cell>,
    weak_cells: Vec<Cell>,
    last_enemy_health: Option<f32>,
    attacked_last_turn: bool,
    consecutive_blocked: u32,
}

impl TurnOrchestrator {
    /// Creates an orchestrator for `profile` with a seeded random stream.
    #[must_use]
    pub fn new(profile: StrategyProfile, seed: u64) -> Self {
        let planner = PlacementPlanner::new(PlacementPlan::new(profile.stages.clone()), profile.repair);
        let evaluator = EdgeEvaluator::new(
            profile.lanes,
            PathResolver::default(),
            ThreatEstimator::new(profile.threat),
        );
        Self {
            profile,
            planner,
            evaluator,
            rng: ChaCha8Rng::seed_from_u64(seed),
            breaches: Vec::new(),
            weak_cells: Vec::new(),
            last_enemy_health: None,
            attacked_last_turn: false,
            consecutive_blocked: 0,
        }
    }

    /// Profile the orchestrator follows.
    #[must_use]
    pub fn profile(&self) -> &StrategyProfile {
        &self.profile
    }

    /// Placement planner with the statuses of the latest turn.
    #[must_use]
    pub fn planner(&self) -> &PlacementPlanner {
        &self.planner
    }

    /// Cells the enemy scored on so far.
    #[must_use]
    pub fn breaches(&self) -> &[Cell] {
        &self.breaches
    }

    /// Cells removed for repair that adaptive defense has not consumed yet.
    #[must_use]
    pub fn weak_cells(&self) -> &[Cell] {
        &self.weak_cells
    }

    /// Regular attacks in a row that left enemy health untouched.
    #[must_use]
    pub const fn consecutive_blocked(&self) -> u32 {
        self.consecutive_blocked
    }

    /// Remembers where the enemy scored; our own breaches are ignored.
    pub fn record_breach(&mut self, breach: &BreachEvent) {
        if breach.scored_against_us() && !self.breaches.contains(&breach.cell) {
            log::debug!("enemy {:?} scored {:.0} at {:?}", breach.kind, breach.damage, breach.cell);
            self.breaches.push(breach.cell);
        }
    }

    /// Plays one turn against the arena and reports the accepted commands.
    pub fn play_turn(&mut self, arena: &mut Arena) -> TurnReport {
        let turn = query::turn(arena);
        let mut report = TurnReport::new(turn);
        let mut cache = TurnCache::for_map(&query::spatial_map(arena));
        let mut commands = Vec::new();
        self.track_blocked_attacks(query::player_stats(arena, Side::Enemy).health);

        self.planner.repair(&query::spatial_map(arena), &mut commands);
        let first_removal = report.commands.len();
        submit(arena, &mut commands, &mut report);
        for cell in removed_cells(&report.commands[first_removal..]) {
            if !self.weak_cells.contains(&cell) {
                self.weak_cells.push(cell);
            }
        }

        let stalling = self.profile.stall.is_some_and(|stall| turn < stall.before_turn);
        let switching = !stalling && self.demolisher_switch_fires(&query::spatial_map(arena));
        self.build(arena, switching, &mut commands);
        submit(arena, &mut commands, &mut report);

        let plan = {
            let map = query::spatial_map(arena);
            let catalog = query::catalog(arena);
            let health = query::player_stats(arena, Side::Friendly).health;
            if stalling {
                self.stall(&map, catalog, arena)
            } else if self
                .profile
                .all_in_below_health
                .is_some_and(|threshold| health < threshold)
            {
                self.all_in(&map, catalog, arena, &mut cache)
            } else if switching {
                self.demolishers(catalog, arena)
            } else if self.profile.attacks_on(turn) {
                self.scheduled_attack(&map, catalog, arena, &mut cache)
            } else {
                AttackPlan::Hold
            }
        };
        if let AttackPlan::Attack { kind, allocations } = &plan {
            commands.extend(allocations.iter().map(|lane| Command::Spawn {
                kind: *kind,
                cell: lane.origin,
                count: lane.count,
            }));
        }
        self.attacked_last_turn = plan.unit_count() > 0;
        report.attack = plan;
        submit(arena, &mut commands, &mut report);

        log::info!(
            "turn {turn} ({}): {} commands accepted, {} rejected, {} attackers sent",
            self.profile.name,
            report.commands.len(),
            report.rejections.len(),
            report.attack.unit_count()
        );
        report
    }

    /// Counts attacks the enemy absorbed without losing health. Turns
    /// without an attack leave the count alone.
    fn track_blocked_attacks(&mut self, enemy_health: f32) {
        if self.attacked_last_turn {
            match self.last_enemy_health {
                Some(previous) if enemy_health >= previous => self.consecutive_blocked += 1,
                Some(_) => self.consecutive_blocked = 0,
                None => {}
            }
        }
        self.last_enemy_health = Some(enemy_health);
    }

    fn attack_unit(&self) -> UnitKind {
        match self.profile.blocked_switch {
            Some(switch) if self.consecutive_blocked >= switch.after => {
                log::debug!("{} attacks blocked in a row, sending {:?}", self.consecutive_blocked, switch.unit);
                switch.unit
            }
            _ => self.profile.attack_unit,
        }
    }

    fn build(&mut self, arena: &Arena, switching: bool, out: &mut Vec<Command>) {
        let map = query::spatial_map(arena);
        let catalog = query::catalog(arena);
        let mut budget = query::resources(arena, Side::Friendly);
        let mut ledger = BuildLedger::new();

        match self.profile.adaptive_defense {
            Some(adaptive) => {
                let ready = self
                    .planner
                    .handle_before(adaptive.stage, &map, catalog, &mut budget, &mut ledger, out);
                if ready && budget.structure > 0.0 {
                    if let Some(x) = median_x(&self.weak_cells) {
                        let target = Cell::new(x, adaptive.row);
                        self.weak_cells.clear();
                        if self.planner.plan_mut().add_target(adaptive.stage, target) {
                            log::debug!("adaptive defense targets {target:?}");
                        }
                    }
                }
                if ready {
                    self.planner.handle(&map, catalog, &mut budget, &mut ledger, out);
                }
            }
            None => self.planner.handle(&map, catalog, &mut budget, &mut ledger, out),
        }

        if self.profile.reactive_defense {
            for breach in &self.breaches {
                let _ = ledger.deploy(&map, catalog, &mut budget, UnitKind::Turret, breach.offset(0, 1), out);
            }
        }

        if switching {
            if let Some(switch) = &self.profile.demolisher_switch {
                let kind = cheapest_structure(catalog);
                for cell in &switch.line {
                    let _ = ledger.deploy(&map, catalog, &mut budget, kind, *cell, out);
                }
            }
        }

        log::debug!("{} cells touched by construction", ledger.touched());
    }

    fn demolisher_switch_fires(&self, map: &SpatialMap<'_>) -> bool {
        let Some(switch) = &self.profile.demolisher_switch else {
            return false;
        };
        let front = map.count_stationary(Side::Enemy, |cell| switch.front_rows.contains(&cell.y()));
        front > switch.threshold
    }

    fn stall(&mut self, map: &SpatialMap<'_>, catalog: &UnitCatalog, arena: &Arena) -> AttackPlan {
        let open = map.open_deploy_cells();
        if open.is_empty() {
            return AttackPlan::Hold;
        }

        let resources = query::resources(arena, Side::Friendly);
        let count = resources.affordable_count(catalog.cost(UnitKind::Interceptor));
        let mut allocations: Vec<LaneAllocation> = Vec::new();
        for _ in 0..count {
            let origin = open[self.rng.gen_range(0..open.len())];
            match allocations.iter_mut().find(|lane| lane.origin == origin) {
                Some(lane) => lane.count += 1,
                None => allocations.push(LaneAllocation { origin, count: 1 }),
            }
        }

        if allocations.is_empty() {
            AttackPlan::Hold
        } else {
            AttackPlan::Attack {
                kind: UnitKind::Interceptor,
                allocations,
            }
        }
    }

    fn all_in(
        &mut self,
        map: &SpatialMap<'_>,
        catalog: &UnitCatalog,
        arena: &Arena,
        cache: &mut TurnCache,
    ) -> AttackPlan {
        let budget = AttackBudget::from_catalog(
            catalog,
            UnitKind::Scout,
            query::resources(arena, Side::Friendly),
        );
        let candidates = self.candidates(map);
        let ranked = self.evaluator.evaluate(map, &candidates, &budget, cache);
        log::info!("health is low, sending everything");
        commit_all(&ranked, &budget)
    }

    fn demolishers(&self, catalog: &UnitCatalog, arena: &Arena) -> AttackPlan {
        let Some(switch) = &self.profile.demolisher_switch else {
            return AttackPlan::Hold;
        };
        let budget = AttackBudget::from_catalog(
            catalog,
            UnitKind::Demolisher,
            query::resources(arena, Side::Friendly),
        );
        match budget.affordable() {
            0 => AttackPlan::Hold,
            count => AttackPlan::Attack {
                kind: UnitKind::Demolisher,
                allocations: vec![LaneAllocation {
                    origin: switch.origin,
                    count,
                }],
            },
        }
    }

    fn scheduled_attack(
        &mut self,
        map: &SpatialMap<'_>,
        catalog: &UnitCatalog,
        arena: &Arena,
        cache: &mut TurnCache,
    ) -> AttackPlan {
        let Some(schedule) = &self.profile.schedule else {
            return AttackPlan::Hold;
        };
        let resources = query::resources(arena, Side::Friendly);
        let budget = AttackBudget::from_catalog(catalog, self.attack_unit(), resources);
        let budget = match schedule.allowance(map.turn(), resources.mobile) {
            Allowance::Unlimited => budget,
            Allowance::Units(units) => budget.capped(units),
            Allowance::Hold => return AttackPlan::Hold,
        };

        let candidates = self.candidates(map);
        let ranked = self.evaluator.evaluate(map, &candidates, &budget, cache);
        for (origin, reason) in ranked.excluded() {
            log::debug!("candidate {origin:?} excluded: {reason:?}");
        }
        self.evaluator.decide(&ranked, &budget)
    }

    fn candidates(&self, map: &SpatialMap<'_>) -> Vec<Cell> {
        self.profile
            .candidates
            .clone()
            .unwrap_or_else(|| map.deploy_cells())
    }
}

fn commit_all(ranked: &RankedEdges, budget: &AttackBudget) -> AttackPlan {
    match (ranked.best(), budget.affordable()) {
        (Some(best), count) if count > 0 => AttackPlan::Attack {
            kind: budget.kind,
            allocations: vec![LaneAllocation {
                origin: best.origin,
                count,
            }],
        },
        _ => AttackPlan::Hold,
    }
}

fn cheapest_structure(catalog: &UnitCatalog) -> UnitKind {
    UnitKind::ALL
        .into_iter()
        .filter(|kind| kind.is_stationary())
        .min_by(|a, b| {
            catalog
                .cost(*a)
                .structure
                .total_cmp(&catalog.cost(*b).structure)
        })
        .unwrap_or(UnitKind::Wall)
}

/// Median column of `cells`, averaging and truncating the middle pair.
#[must_use]
pub fn median_x(cells: &[Cell]) -> Option<i32> {
    if cells.is_empty() {
        return None;
    }
    let mut xs: Vec<i32> = cells.iter().map(Cell::x).collect();
    xs.sort_unstable();
    let mid = xs.len() / 2;
    if xs.len() % 2 == 1 {
        Some(xs[mid])
    } else {
        Some((xs[mid - 1] + xs[mid]) / 2)
    }
}

fn removed_cells(accepted: &[Command]) -> Vec<Cell> {
    accepted
        .iter()
        .filter_map(|command| match command {
            Command::Remove { cell } => Some(*cell),
            _ => None,
        })
        .collect()
}

fn submit(arena: &mut Arena, commands: &mut Vec<Command>, report: &mut TurnReport) {
    let mut events = Vec::new();
    for command in commands.drain(..) {
        apply(arena, command, &mut events);
    }

    for event in events {
        match event {
            Event::UnitsSpawned { kind, cell, count } => {
                report.commands.push(Command::Spawn { kind, cell, count });
            }
            Event::UnitUpgraded { cell, .. } => report.commands.push(Command::Upgrade { cell }),
            Event::RemovalScheduled { cell, .. } => report.commands.push(Command::Remove { cell }),
            Event::SpawnRejected { .. } | Event::UpgradeRejected { .. } | Event::RemovalRejected { .. } => {
                log::debug!("world rejected command: {event:?}");
                report.rejections.push(event);
            }
            Event::LayoutChanged { .. } | Event::Breach(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breach_world::{ArenaSnapshot, PlacedUnit};

    #[test]
    fn median_truncates_the_middle_pair() {
        let cells = |xs: &[i32]| xs.iter().map(|x| Cell::new(*x, 13)).collect::<Vec<_>>();
        assert_eq!(median_x(&[]), None);
        assert_eq!(median_x(&cells(&[20, 3, 9])), Some(9));
        assert_eq!(median_x(&cells(&[4, 9])), Some(6));
        assert_eq!(median_x(&cells(&[27, 0, 1, 26])), Some(13));
    }

    #[test]
    fn only_accepted_removals_become_weak_cells() {
        let mut arena = Arena::from_snapshot(
            UnitCatalog::default(),
            ArenaSnapshot {
                turn: 3,
                units: vec![PlacedUnit::new(Cell::new(5, 13), UnitKind::Wall, Side::Friendly)],
                ..ArenaSnapshot::default()
            },
        );
        let mut report = TurnReport::new(3);
        let mut commands = vec![
            Command::Remove { cell: Cell::new(5, 13) },
            Command::Remove { cell: Cell::new(9, 13) },
        ];

        submit(&mut arena, &mut commands, &mut report);

        assert_eq!(removed_cells(&report.commands), vec![Cell::new(5, 13)]);
        assert_eq!(report.rejections.len(), 1, "nothing stands on [9, 13]");
    }

    #[test]
    fn walls_are_the_cheapest_structure() {
        assert_eq!(cheapest_structure(&UnitCatalog::default()), UnitKind::Wall);
    }
}
