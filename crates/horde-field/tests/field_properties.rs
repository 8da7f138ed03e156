//! Structural properties of navigation and pressure fields.

use glam::Vec2;
use horde_field::{
    build_flow_field, build_wall_field, DirectionTable, GoalRegion, NavField, PressureConfig,
    PressureField, BLOCKED_PRESSURE, DIR_NONE, UNREACHABLE,
};
use horde_space::{GridSpec, WalkableGrid};
use horde_test_utils::{enclosed_cell, grid_from_ascii, open_grid};
use proptest::prelude::*;

fn random_grid(w: u32, h: u32, blocked: &[bool]) -> WalkableGrid {
    let spec = GridSpec::new(w, h, 1.0, Vec2::ZERO).unwrap();
    WalkableGrid::new(spec, blocked.iter().map(|b| !b).collect()).unwrap()
}

/// Follow stored directions from every reachable cell; each step must land
/// on a strictly closer cell and reach distance 0 within `distance` steps.
fn assert_descent(grid: &WalkableGrid, field: &NavField) {
    let table = DirectionTable::shared();
    let spec = grid.spec();
    for i in 0..spec.cell_count() {
        let d0 = field.distances()[i];
        if d0 == UNREACHABLE || d0 == 0 || !grid.is_walkable_index(i) {
            continue;
        }
        let (mut x, mut y) = spec.coords(i);
        let mut steps = 0;
        loop {
            let d = field.distance_at(x, y);
            if d == 0 {
                break;
            }
            let (dx, dy) = table
                .step(field.direction_index_at(x, y))
                .unwrap_or_else(|| panic!("reachable cell ({x}, {y}) has no direction"));
            let next = field.distance_at(x + dx, y + dy);
            assert!(next < d, "({x},{y}) d={d} -> ({},{}) d={next}", x + dx, y + dy);
            x += dx;
            y += dy;
            steps += 1;
            assert!(steps <= d0, "descent from {i} took more than {d0} steps");
        }
    }
}

fn assert_no_corner_cut(grid: &WalkableGrid, field: &NavField) {
    let table = DirectionTable::shared();
    let spec = grid.spec();
    for i in 0..spec.cell_count() {
        let Some((dx, dy)) = table.step(field.directions()[i]) else {
            continue;
        };
        let (x, y) = spec.coords(i);
        if dx != 0 && dy != 0 {
            assert!(
                !(grid.is_blocked(x + dx, y) && grid.is_blocked(x, y + dy)),
                "({x},{y}) cuts between two blocked cells"
            );
            assert!(
                !(grid.is_blocked(x + dx, y) || grid.is_blocked(x, y + dy)),
                "({x},{y}) clips a blocked corner"
            );
        }
    }
}

#[test]
fn open_grid_scenario_points_toward_goal() {
    let grid = open_grid(10, 10);
    let field = build_flow_field(&grid, &GoalRegion::new(Vec2::new(5.0, 5.0), 2.0)).unwrap();
    let idx = field.direction_index_at(0, 0);
    assert_ne!(idx, DIR_NONE);
    let dir = field.direction_at(0, 0);
    assert!(dir.x > 0.0 && dir.y > 0.0);
    assert_descent(&grid, &field);
}

#[test]
fn enclosed_cell_is_sentinel_with_blocked_pressure() {
    let grid = enclosed_cell(7, 7, 3, 3);
    let field = build_flow_field(&grid, &GoalRegion::new(Vec2::new(0.5, 0.5), 0.5)).unwrap();
    assert_eq!(field.distance_at(3, 3), UNREACHABLE);
    assert_eq!(field.direction_index_at(3, 3), DIR_NONE);

    let mut pressure = PressureField::new(*grid.spec());
    let crowd = vec![Vec2::new(3.5, 3.5); 12];
    pressure
        .rebuild(
            &grid,
            Some(&field),
            &crowd,
            &vec![true; crowd.len()],
            &PressureConfig::default(),
        )
        .unwrap();
    assert_eq!(pressure.pressure_at(3, 3), Some(BLOCKED_PRESSURE));
    assert_eq!(pressure.density()[3 + 3 * 7], 12);
}

#[test]
fn diagonal_gap_is_not_cut() {
    let grid = grid_from_ascii(&[
        "....", //
        ".#..", //
        "..#.", //
        "....",
    ]);
    let field = build_flow_field(&grid, &GoalRegion::new(Vec2::new(3.5, 0.5), 0.1)).unwrap();
    // (1,2) must not step diagonally to (2,1) between the two blocked cells.
    assert_ne!(
        DirectionTable::shared().step(field.direction_index_at(1, 2)),
        Some((1, -1))
    );
    assert_no_corner_cut(&grid, &field);
    assert_descent(&grid, &field);
}

#[test]
fn wall_field_points_away_from_walls() {
    let grid = grid_from_ascii(&[
        "#######", //
        "#.....#", //
        "#.....#", //
        "#.....#", //
        "#.....#", //
        "#.....#", //
        "#######",
    ]);
    let field = build_wall_field(&grid);
    assert_eq!(field.distance_at(1, 1), 1);
    assert_eq!(field.distance_at(3, 3), 3);
    let d = field.direction_at(1, 1);
    assert!(d.x > 0.0 && d.y > 0.0);
    // The room centre is a local maximum and has nowhere further to go.
    assert_eq!(field.direction_index_at(3, 3), DIR_NONE);
    assert_no_corner_cut(&grid, &field);
}

proptest! {
    #[test]
    fn flow_field_descends_without_corner_cuts(
        blocked in prop::collection::vec(prop::bool::weighted(0.3), 12 * 9),
        gx in 0.0f32..12.0,
        gy in 0.0f32..9.0,
        r in 0.0f32..3.0,
    ) {
        let grid = random_grid(12, 9, &blocked);
        let field = build_flow_field(&grid, &GoalRegion::new(Vec2::new(gx, gy), r)).unwrap();
        assert_descent(&grid, &field);
        assert_no_corner_cut(&grid, &field);
        for i in 0..grid.spec().cell_count() {
            let sentinel = field.directions()[i] == DIR_NONE;
            let closed = !grid.is_walkable_index(i)
                || field.distances()[i] == UNREACHABLE
                || field.distances()[i] == 0;
            prop_assert_eq!(sentinel, closed);
        }
    }

    #[test]
    fn rebuild_is_bit_identical(
        blocked in prop::collection::vec(prop::bool::weighted(0.25), 10 * 10),
        gx in 0.0f32..10.0,
        gy in 0.0f32..10.0,
    ) {
        let grid = random_grid(10, 10, &blocked);
        let goal = GoalRegion::new(Vec2::new(gx, gy), 1.5);
        let a = build_flow_field(&grid, &goal).unwrap();
        let b = build_flow_field(&grid, &goal).unwrap();
        prop_assert_eq!(a.distances(), b.distances());
        prop_assert_eq!(a.directions(), b.directions());
        let wa = build_wall_field(&grid);
        let wb = build_wall_field(&grid);
        prop_assert_eq!(wa, wb);
    }

    #[test]
    fn wall_field_never_cuts_corners(
        blocked in prop::collection::vec(prop::bool::weighted(0.3), 8 * 8),
    ) {
        let grid = random_grid(8, 8, &blocked);
        let field = build_wall_field(&grid);
        assert_no_corner_cut(&grid, &field);
    }
}
