use breach_core::{Cell, Command, Edge, PlayerStats, Resources, Side, TurnCache, UnitCatalog, UnitKind};
use breach_system_pathing::{PathResolver, PathingRules, ENGINE_NEIGHBOR_ORDER};
use breach_world::{apply, query, Arena, ArenaSnapshot, PlacedUnit};

fn arena(units: Vec<PlacedUnit>) -> Arena {
    Arena::from_snapshot(
        UnitCatalog::default(),
        ArenaSnapshot {
            turn: 1,
            friendly: PlayerStats {
                health: 30.0,
                resources: Resources::new(40.0, 10.0),
            },
            enemy: PlayerStats::default(),
            units,
        },
    )
}

fn wall(x: i32, y: i32, owner: Side) -> PlacedUnit {
    PlacedUnit::new(Cell::new(x, y), UnitKind::Wall, owner)
}

#[test]
fn open_board_path_reaches_target_edge() {
    let arena = arena(Vec::new());
    let map = query::spatial_map(&arena);
    let mut cache = TurnCache::for_map(&map);
    let mut resolver = PathResolver::default();

    let path = resolver
        .resolve(&map, Cell::new(13, 0), &mut cache)
        .expect("open board always has an exit");

    assert_eq!(path.origin(), Cell::new(13, 0));
    assert_eq!(path.target_edge(), Edge::TopRight);
    assert!(Edge::TopRight.contains(path.exit()), "walk should end on the target edge");
    assert_eq!(path.len(), 29, "shortest walk crosses 28 cells");
    assert_eq!(path.cells()[1], Cell::new(13, 1), "first move prefers the vertical step");
    for step in path.cells().windows(2) {
        assert_eq!(step[0].distance_squared(step[1]), 1, "steps must be orthogonal");
    }
}

#[test]
fn repeated_resolution_is_deterministic() {
    let arena = arena(vec![
        wall(10, 12, Side::Friendly),
        wall(11, 12, Side::Friendly),
        wall(15, 16, Side::Enemy),
        wall(16, 17, Side::Enemy),
    ]);
    let map = query::spatial_map(&arena);

    for origin in [Cell::new(3, 10), Cell::new(24, 10), Cell::new(13, 0)] {
        let mut first_cache = TurnCache::for_map(&map);
        let mut second_cache = TurnCache::for_map(&map);
        let first = PathResolver::default().resolve(&map, origin, &mut first_cache);
        let second = PathResolver::default().resolve(&map, origin, &mut second_cache);
        assert_eq!(first, second, "paths from {origin:?} must be identical");
        assert!(first.is_some());
    }
}

#[test]
fn blocked_or_outside_origin_has_no_path() {
    let arena = arena(vec![wall(13, 0, Side::Friendly)]);
    let map = query::spatial_map(&arena);
    let mut cache = TurnCache::for_map(&map);
    let mut resolver = PathResolver::default();

    assert_eq!(resolver.resolve(&map, Cell::new(13, 0), &mut cache), None);
    assert_eq!(resolver.resolve(&map, Cell::new(0, 0), &mut cache), None);
}

#[test]
fn sealed_origin_has_no_exit() {
    let arena = arena(vec![wall(13, 1, Side::Friendly), wall(14, 0, Side::Friendly)]);
    let map = query::spatial_map(&arena);
    let mut cache = TurnCache::for_map(&map);

    let strict = PathResolver::default().resolve(&map, Cell::new(13, 0), &mut cache);
    assert_eq!(strict, None, "sealed origin must not report an exit");

    let lenient = PathResolver::new(PathingRules::new(ENGINE_NEIGHBOR_ORDER, false))
        .trace(&map, Cell::new(13, 0))
        .expect("lenient rules keep the stranded walk");
    assert_eq!(lenient.cells(), &[Cell::new(13, 0)]);
}

#[test]
fn placement_invalidates_cached_path() {
    let mut arena = arena(Vec::new());
    let mut resolver = PathResolver::default();
    let origin = Cell::new(13, 0);

    let map = query::spatial_map(&arena);
    let mut cache = TurnCache::for_map(&map);
    let before = resolver
        .resolve(&map, origin, &mut cache)
        .expect("open board path");
    assert_eq!(cache.cached_paths(), 1);

    let blocked = before.cells()[5];
    let mut events = Vec::new();
    apply(
        &mut arena,
        Command::Spawn {
            kind: UnitKind::Wall,
            cell: blocked,
            count: 1,
        },
        &mut events,
    );

    let map = query::spatial_map(&arena);
    let after = resolver
        .resolve(&map, origin, &mut cache)
        .expect("detour exists");
    assert_ne!(before, after, "cached path must not survive a layout change");
    assert!(!after.contains(blocked), "new path must avoid the wall at {blocked:?}");
}
