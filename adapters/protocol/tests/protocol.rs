use breach_core::{BreachEvent, Cell, Resources, Side, UnitCatalog, UnitKind};
use breach_protocol::{decode_config, decode_frame, expects_orders, Frame, ProtocolError};
use breach_world::{query, Arena};

const TURN_FRAME: &str = r#"{
    "p2Units": [[[4, 14, 60.0, "20"]], [], [[13, 17, 75.0, "21"]], [], [], [], [], [[13, 17, 0.0, "21"]]],
    "turnInfo": [0, 3, -1, 18],
    "p1Stats": [28.0, 11.5, 7.0, 1021],
    "p1Units": [
        [[8, 12, 30.0, "3"], [19, 12, 120.0, "4"]],
        [],
        [[3, 12, 75.0, "5"]],
        [[13, 0, 15.0, "6"]],
        [],
        [],
        [[8, 12, 0.0, "3"]],
        [[19, 12, 0.0, "4"]]
    ],
    "p2Stats": [30.0, 5.0, 9.0, 880],
    "events": {"breach": [], "damage": []}
}"#;

fn decode_turn() -> breach_protocol::ArenaSnapshot {
    match decode_frame(TURN_FRAME, &UnitCatalog::default()).expect("turn frame decodes") {
        Frame::Turn(snapshot) => snapshot,
        other => panic!("expected a turn frame, got {other:?}"),
    }
}

#[test]
fn turn_frame_carries_stats_and_units() {
    let snapshot = decode_turn();

    assert_eq!(snapshot.turn, 3);
    assert_eq!(snapshot.friendly.health, 28.0);
    assert_eq!(snapshot.friendly.resources, Resources::new(11.5, 7.0));
    assert_eq!(snapshot.enemy.resources, Resources::new(5.0, 9.0));
    assert_eq!(snapshot.units.len(), 6, "removal and upgrade markers are flags, not units");

    let wall = snapshot
        .units
        .iter()
        .find(|unit| unit.cell == Cell::new(8, 12))
        .expect("wall reported");
    assert!(wall.pending_removal);
    assert!(!wall.upgraded);

    let enemy_turret = snapshot
        .units
        .iter()
        .find(|unit| unit.cell == Cell::new(13, 17))
        .expect("enemy turret reported");
    assert_eq!(enemy_turret.owner, Side::Enemy);
    assert_eq!(enemy_turret.kind, UnitKind::Turret);
    assert!(enemy_turret.upgraded);
}

#[test]
fn upgraded_units_keep_their_reported_health() {
    let arena = Arena::from_snapshot(UnitCatalog::default(), decode_turn());
    let map = query::spatial_map(&arena);

    let upgraded = map.stationary_at(Cell::new(19, 12)).expect("wall present");
    assert!(upgraded.is_upgraded());
    assert_eq!(upgraded.health(), 120.0);
    assert_eq!(upgraded.max_health(), 120.0);

    let damaged = map.stationary_at(Cell::new(8, 12)).expect("wall present");
    assert!(damaged.is_pending_removal());
    assert_eq!(damaged.health_ratio(), 0.5);

    assert_eq!(map.occupants_at(Cell::new(13, 0)).len(), 1, "scouts share cells");
}

#[test]
fn action_frame_reports_breaches_by_owner() {
    let frame = decode_frame(
        r#"{"turnInfo": [1, 3, 42], "events": {"breach": [
            [[3, 10], 3, 1.0, "77", 2],
            [[24, 17], "PI", 1, "78", 1]
        ]}}"#,
        &UnitCatalog::default(),
    )
    .expect("action frame decodes");

    assert_eq!(
        frame,
        Frame::Action {
            breaches: vec![
                BreachEvent {
                    cell: Cell::new(3, 10),
                    kind: UnitKind::Scout,
                    damage: 1.0,
                    unit_id: "77".to_owned(),
                    owner: Side::Enemy,
                },
                BreachEvent {
                    cell: Cell::new(24, 17),
                    kind: UnitKind::Scout,
                    damage: 1.0,
                    unit_id: "78".to_owned(),
                    owner: Side::Friendly,
                },
            ],
        }
    );
}

#[test]
fn breach_owner_outside_the_wire_range_is_rejected() {
    let error = decode_frame(
        r#"{"turnInfo": [1, 3, 42], "events": {"breach": [[[3, 10], 3, 1.0, "77", 0]]}}"#,
        &UnitCatalog::default(),
    )
    .expect_err("owner 0 does not exist on the wire");
    assert!(matches!(error, ProtocolError::InvalidBreachOwner(owner) if owner == "0"));
}

#[test]
fn end_of_game_and_bad_frames() {
    let catalog = UnitCatalog::default();
    assert_eq!(
        decode_frame(r#"{"turnInfo": [2, 40, 0]}"#, &catalog).expect("end frame decodes"),
        Frame::GameOver
    );
    assert!(matches!(
        decode_frame(r#"{"turnInfo": [5, 40, 0]}"#, &catalog),
        Err(ProtocolError::UnknownPhase(5))
    ));
    assert!(matches!(
        decode_frame(r#"{"turnInfo": [0, 4, -1], "p1Stats": [30.0], "p2Stats": [30.0, 1.0, 1.0]}"#, &catalog),
        Err(ProtocolError::ShortStats { player: 1, found: 1 })
    ));
    assert!(matches!(
        decode_frame("not json", &catalog),
        Err(ProtocolError::Json(_))
    ));
}

#[test]
fn only_turn_frames_expect_orders() {
    assert!(expects_orders(TURN_FRAME));
    assert!(expects_orders(r#"{"turnInfo": [0, 4, -1], "p1Stats": "garbage"}"#));
    assert!(!expects_orders(r#"{"turnInfo": [1, 4, 12]}"#));
    assert!(!expects_orders("{"));
}

#[test]
fn config_line_keeps_defaults_for_missing_units() {
    let catalog = decode_config(
        r#"{"unitInformation": [
            {"shorthand": "FF", "startHealth": 60, "cost1": 1},
            {"shorthand": "EF"},
            {"shorthand": "DF"},
            {"shorthand": "PI", "cost2": 1, "startHealth": 12},
            {"shorthand": "EI"},
            {"shorthand": "SI"},
            {"shorthand": "XR"},
            {"shorthand": "XU"}
        ], "resources": {"turnIntervalForBitCapSchedule": 10}}"#,
    )
    .expect("config decodes");

    assert_eq!(catalog.stats(UnitKind::Scout, false).health, 12.0);
    assert_eq!(catalog.remove_shorthand(), "XR");
    assert_eq!(catalog.upgrade_shorthand(), "XU");
    assert_eq!(
        catalog.profile(UnitKind::Turret),
        UnitCatalog::default().profile(UnitKind::Turret)
    );
}
