//! Convex decomposition through the public API.

use approx::assert_relative_eq;
use sector_caster::decompose::{ConvexDecomposer, DecomposeError, DecomposeFailure};
use sector_caster::geometry::Vec2;
use sector_caster::sector::{PortalPair, Sector};
use sector_caster::world::SectorWorld;

fn points(coords: &[(f64, f64)]) -> Vec<Vec2> {
    coords.iter().map(|&(x, y)| Vec2::new(x, y)).collect()
}

fn world_of(corners: &[(f64, f64)], portals: &[PortalPair]) -> SectorWorld {
    let mut world = SectorWorld::new();
    world.add_sector(points(corners), portals).unwrap();
    world
}

/// L room whose reflex corner cuts into the middle of the bottom wall
const L_ROOM: [(f64, f64); 6] = [
    (0.0, 0.0),
    (0.0, 3.0),
    (2.0, 3.0),
    (2.0, 1.0),
    (4.0, 1.0),
    (4.0, 0.0),
];

fn portal_edges(sector: &Sector) -> Vec<(Vec2, Vec2)> {
    sector
        .edges()
        .iter()
        .filter(|e| e.portal)
        .map(|e| (e.p0, e.p1))
        .collect()
}

fn same_segment(a: (Vec2, Vec2), b: (Vec2, Vec2)) -> bool {
    let close = |p: Vec2, q: Vec2| p.distance(q) < 1e-9;
    (close(a.0, b.0) && close(a.1, b.1)) || (close(a.0, b.1) && close(a.1, b.0))
}

// ============================================================================
// Convex input
// ============================================================================

#[test]
fn test_convex_world_is_unchanged() {
    let mut world = SectorWorld::new();
    world
        .add_sector(points(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0)]), &[(1, 2)])
        .unwrap();
    world
        .add_sector(points(&[(0.0, 2.0), (0.0, 4.0), (2.0, 4.0), (2.0, 2.0)]), &[(3, 0)])
        .unwrap();

    let result = ConvexDecomposer::new().decompose(&world).unwrap();
    assert_eq!(result.cuts, 0);
    assert!(result.failures.is_empty());
    assert_eq!(result.world, world);
}

#[test]
fn test_empty_world_decomposes_to_empty() {
    let result = ConvexDecomposer::new().decompose(&SectorWorld::new()).unwrap();
    assert!(result.world.is_empty());
    assert_eq!(result.cuts, 0);
}

// ============================================================================
// Single cut
// ============================================================================

#[test]
fn test_l_room_splits_into_two_convex_pieces() {
    let world = world_of(&L_ROOM, &[]);
    let decomposer = ConvexDecomposer::new();
    let result = decomposer.decompose(&world).unwrap();

    assert_eq!(result.cuts, 1);
    assert!(result.failures.is_empty());
    assert_eq!(result.world.len(), 2);
    assert!(result.world.sectors().iter().all(|s| decomposer.is_convex(s)));

    let areas: Vec<f64> = result.world.sectors().iter().map(Sector::area).collect();
    assert_relative_eq!(areas[0], 2.5, epsilon = 1e-9);
    assert_relative_eq!(areas[1], 5.5, epsilon = 1e-9);
    assert_relative_eq!(areas.iter().sum::<f64>(), world.sectors()[0].area(), epsilon = 1e-9);
}

#[test]
fn test_cut_is_a_portal_on_both_pieces() {
    let result = ConvexDecomposer::new()
        .decompose(&world_of(&L_ROOM, &[]))
        .unwrap();
    let cut = (Vec2::new(2.0, 1.0), Vec2::new(1.0, 0.0));

    for piece in result.world.sectors() {
        let portals = portal_edges(piece);
        assert_eq!(portals.len(), 1);
        assert!(same_segment(portals[0], cut));
    }
}

#[test]
fn test_split_portal_edge_stays_a_portal() {
    // bottom wall (4,0)-(0,0) is a portal and gets a new corner at (1,0)
    let world = world_of(&L_ROOM, &[(5, 0)]);
    let result = ConvexDecomposer::new().decompose(&world).unwrap();
    assert_eq!(result.world.len(), 2);

    let small = &result.world.sectors()[0];
    let large = &result.world.sectors()[1];
    assert_eq!(portal_edges(small).len(), 2);
    assert_eq!(portal_edges(large).len(), 2);

    let right_half = (Vec2::new(4.0, 0.0), Vec2::new(1.0, 0.0));
    let left_half = (Vec2::new(1.0, 0.0), Vec2::new(0.0, 0.0));
    assert!(portal_edges(small).into_iter().any(|e| same_segment(e, right_half)));
    assert!(portal_edges(large).into_iter().any(|e| same_segment(e, left_half)));
}

#[test]
fn test_pieces_inherit_attributes() {
    let mut world = world_of(&L_ROOM, &[]);
    let parent = world.get_mut(0).unwrap();
    parent.set_heights(0.25, 2.75);
    parent.set_light(0.5);

    let result = ConvexDecomposer::new().decompose(&world).unwrap();
    for piece in result.world.sectors() {
        assert_eq!(piece.floor, 0.25);
        assert_eq!(piece.ceiling, 2.75);
        assert_eq!(piece.light, 0.5);
        assert_eq!(piece.color(), world.sectors()[0].color());
    }
}

// ============================================================================
// Repeated cuts
// ============================================================================

const U_ROOM: [(f64, f64); 8] = [
    (0.0, 0.0),
    (0.0, 3.0),
    (1.0, 3.0),
    (1.0, 1.0),
    (2.0, 1.0),
    (2.0, 3.0),
    (3.0, 3.0),
    (3.0, 0.0),
];

#[test]
fn test_u_room_reaches_a_convex_fixed_point() {
    let world = world_of(&U_ROOM, &[]);
    let decomposer = ConvexDecomposer::new();
    let result = decomposer.decompose(&world).unwrap();

    assert_eq!(result.cuts, 2);
    assert!(result.failures.is_empty());
    assert_eq!(result.world.len(), 3);
    assert!(result.world.sectors().iter().all(|s| decomposer.is_convex(s)));

    let total: f64 = result.world.sectors().iter().map(Sector::area).sum();
    assert_relative_eq!(total, 7.0, epsilon = 1e-9);

    // every cut shows up as a portal on exactly two pieces
    let portal_count: usize = result
        .world
        .sectors()
        .iter()
        .map(|s| portal_edges(s).len())
        .sum();
    assert_eq!(portal_count, 2 * result.cuts);

    // a second pass has nothing left to do
    let again = decomposer.decompose(&result.world).unwrap();
    assert_eq!(again.cuts, 0);
    assert_eq!(again.world, result.world);
}

#[test]
fn test_split_limit_keeps_the_sector() {
    let world = world_of(&L_ROOM, &[]);
    let decomposer = ConvexDecomposer {
        max_splits: 0,
        ..ConvexDecomposer::new()
    };
    let result = decomposer.decompose(&world).unwrap();

    assert_eq!(result.cuts, 0);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].sector, 0);
    assert_eq!(result.world, world);
}

#[test]
fn test_failure_does_not_stop_other_sectors() {
    // the U room needs two cuts, the L room one; each sector gets one
    let mut world = world_of(&U_ROOM, &[]);
    let shifted = L_ROOM.iter().map(|&(x, y)| (x + 10.0, y)).collect::<Vec<_>>();
    world.add_sector(points(&shifted), &[]).unwrap();

    let decomposer = ConvexDecomposer {
        max_splits: 1,
        ..ConvexDecomposer::new()
    };
    let result = decomposer.decompose(&world).unwrap();

    assert_eq!(result.cuts, 2);
    assert_eq!(result.world.len(), 4);
    assert_eq!(
        result.failures,
        vec![DecomposeFailure {
            sector: 0,
            error: DecomposeError::SplitLimit { limit: 1 }
        }]
    );

    // the L room still came out convex
    assert!(decomposer.is_convex(&result.world.sectors()[2]));
    assert!(decomposer.is_convex(&result.world.sectors()[3]));
    let total: f64 = result.world.sectors().iter().map(Sector::area).sum();
    assert_relative_eq!(total, 7.0 + 8.0, epsilon = 1e-9);
}
