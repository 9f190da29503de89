use breach_core::{Cell, Command, PlayerStats, Resources, Side, UnitCatalog, UnitKind};
use breach_system_placement::{
    BuildLedger, PlacementPlan, PlacementPlanner, RepairPolicy, Stage, StageAction, StageStatus,
};
use breach_world::{apply, query, Arena, ArenaSnapshot, PlacedUnit};

fn arena(units: Vec<PlacedUnit>) -> Arena {
    Arena::from_snapshot(
        UnitCatalog::default(),
        ArenaSnapshot {
            turn: 0,
            friendly: PlayerStats {
                health: 30.0,
                resources: Resources::new(100.0, 0.0),
            },
            enemy: PlayerStats::default(),
            units,
        },
    )
}

fn row(xs: &[i32], y: i32) -> Vec<Cell> {
    xs.iter().map(|x| Cell::new(*x, y)).collect()
}

fn run_turn(planner: &mut PlacementPlanner, arena: &mut Arena, structure: f32) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut budget = Resources::new(structure, 0.0);
    let mut ledger = BuildLedger::new();
    {
        let map = query::spatial_map(arena);
        let catalog = query::catalog(arena).clone();
        planner.handle(&map, &catalog, &mut budget, &mut ledger, &mut commands);
    }
    let mut events = Vec::new();
    for command in commands.iter().cloned() {
        apply(arena, command, &mut events);
    }
    commands
}

fn spawn(kind: UnitKind, cell: Cell) -> Command {
    Command::Spawn {
        kind,
        cell,
        count: 1,
    }
}

#[test]
fn partial_budget_leaves_stage_in_progress_and_resumes() {
    let targets = row(&[3, 4, 5, 6, 7], 12);
    let mut planner = PlacementPlanner::new(
        PlacementPlan::new(vec![Stage::new(
            "front turrets",
            UnitKind::Turret,
            StageAction::Deploy,
            targets.clone(),
        )]),
        RepairPolicy::default(),
    );
    let mut arena = arena(Vec::new());

    let first = run_turn(&mut planner, &mut arena, 4.0);
    assert_eq!(
        first,
        vec![spawn(UnitKind::Turret, targets[0]), spawn(UnitKind::Turret, targets[1])],
        "budget covers exactly two turrets"
    );
    assert_eq!(planner.plan().status(0), Some(StageStatus::InProgress));

    let second = run_turn(&mut planner, &mut arena, 2.0);
    assert_eq!(
        second,
        vec![spawn(UnitKind::Turret, targets[2])],
        "filling resumes at the third target"
    );

    let third = run_turn(&mut planner, &mut arena, 10.0);
    assert_eq!(
        third,
        vec![spawn(UnitKind::Turret, targets[3]), spawn(UnitKind::Turret, targets[4])]
    );
    assert_eq!(planner.plan().status(0), Some(StageStatus::Complete));
    assert!(planner.plan().is_complete());
}

#[test]
fn later_stages_wait_for_earlier_ones() {
    let mut planner = PlacementPlanner::new(
        PlacementPlan::new(vec![
            Stage::new("corners", UnitKind::Turret, StageAction::Deploy, row(&[3, 24], 12)),
            Stage::new("wall", UnitKind::Wall, StageAction::Deploy, row(&[10, 11], 13)),
        ]),
        RepairPolicy::default(),
    );
    let mut arena = arena(Vec::new());

    let commands = run_turn(&mut planner, &mut arena, 3.0);

    assert_eq!(commands, vec![spawn(UnitKind::Turret, Cell::new(3, 12))]);
    assert_eq!(planner.plan().status(0), Some(StageStatus::InProgress));
    assert_eq!(
        planner.plan().status(1),
        Some(StageStatus::Pending),
        "the wall stage must not spend the leftover currency"
    );
}

#[test]
fn started_stage_without_currency_is_blocked() {
    let mut planner = PlacementPlanner::new(
        PlacementPlan::new(vec![Stage::new(
            "walls",
            UnitKind::Wall,
            StageAction::Deploy,
            row(&[8, 9, 10], 13),
        )]),
        RepairPolicy::default(),
    );
    let mut arena = arena(Vec::new());

    let _ = run_turn(&mut planner, &mut arena, 0.0);
    assert_eq!(planner.plan().status(0), Some(StageStatus::Pending));

    let _ = run_turn(&mut planner, &mut arena, 1.0);
    assert_eq!(planner.plan().status(0), Some(StageStatus::InProgress));

    let commands = run_turn(&mut planner, &mut arena, 0.0);
    assert!(commands.is_empty());
    assert_eq!(planner.plan().status(0), Some(StageStatus::Blocked));
}

#[test]
fn deploy_upgraded_finishes_each_target_before_the_next() {
    let targets = row(&[12, 15], 11);
    let mut planner = PlacementPlanner::new(
        PlacementPlan::new(vec![Stage::new(
            "core",
            UnitKind::Turret,
            StageAction::DeployUpgraded,
            targets.clone(),
        )]),
        RepairPolicy::default(),
    );
    let mut arena = arena(Vec::new());

    let commands = run_turn(&mut planner, &mut arena, 7.0);

    assert_eq!(
        commands,
        vec![
            spawn(UnitKind::Turret, targets[0]),
            Command::Upgrade { cell: targets[0] },
        ],
        "one turret plus upgrade costs 6, the next turret needs 2 more"
    );
    assert_eq!(planner.plan().status(0), Some(StageStatus::InProgress));
    let map = query::spatial_map(&arena);
    assert!(map.stationary_at(targets[0]).is_some_and(|unit| unit.is_upgraded()));
}

#[test]
fn occupied_target_keeps_stage_open() {
    let mut planner = PlacementPlanner::new(
        PlacementPlan::new(vec![Stage::new(
            "walls",
            UnitKind::Wall,
            StageAction::Deploy,
            row(&[8, 9], 13),
        )]),
        RepairPolicy::default(),
    );
    let mut arena = arena(vec![PlacedUnit::new(Cell::new(8, 13), UnitKind::Turret, Side::Friendly)]);

    let commands = run_turn(&mut planner, &mut arena, 5.0);

    assert_eq!(commands, vec![spawn(UnitKind::Wall, Cell::new(9, 13))]);
    assert_eq!(planner.plan().status(0), Some(StageStatus::InProgress));
}

#[test]
fn deploy_upgraded_skips_an_obstructed_target() {
    let mut planner = PlacementPlanner::new(
        PlacementPlan::new(vec![Stage::new(
            "flank turrets",
            UnitKind::Turret,
            StageAction::DeployUpgraded,
            row(&[8, 9], 12),
        )]),
        RepairPolicy::default(),
    );
    let mut arena = arena(vec![PlacedUnit::new(Cell::new(8, 12), UnitKind::Wall, Side::Friendly)]);

    let commands = run_turn(&mut planner, &mut arena, 10.0);

    assert_eq!(
        commands,
        vec![
            spawn(UnitKind::Turret, Cell::new(9, 12)),
            Command::Upgrade { cell: Cell::new(9, 12) },
        ],
        "the wall on [8, 12] is left alone and the next target is built"
    );
    assert_eq!(planner.plan().status(0), Some(StageStatus::InProgress));
    let map = query::spatial_map(&arena);
    assert!(map
        .stationary_at(Cell::new(8, 12))
        .is_some_and(|unit| unit.kind() == UnitKind::Wall));
}

#[test]
fn repair_removes_only_sufficiently_damaged_units() {
    let planner = PlacementPlanner::new(
        PlacementPlan::new(vec![
            Stage::new("wall", UnitKind::Wall, StageAction::Deploy, row(&[5, 6, 7], 13)).with_repair(),
            Stage::new("spare", UnitKind::Wall, StageAction::Deploy, row(&[20], 13)),
        ]),
        RepairPolicy::default(),
    );
    let arena = arena(vec![
        PlacedUnit::new(Cell::new(5, 13), UnitKind::Wall, Side::Friendly).with_health(48.0),
        PlacedUnit::new(Cell::new(6, 13), UnitKind::Wall, Side::Friendly).with_health(49.0),
        PlacedUnit::new(Cell::new(7, 13), UnitKind::Wall, Side::Friendly)
            .upgraded()
            .with_health(107.0),
        PlacedUnit::new(Cell::new(20, 13), UnitKind::Wall, Side::Friendly).with_health(1.0),
    ]);
    let map = query::spatial_map(&arena);
    let mut commands = Vec::new();

    planner.repair(&map, &mut commands);

    assert_eq!(
        commands,
        vec![
            Command::Remove { cell: Cell::new(5, 13) },
            Command::Remove { cell: Cell::new(7, 13) },
        ]
    );
}
