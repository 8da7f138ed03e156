//! Grid edits, goal changes, failures and agent churn through the world API.

use glam::Vec2;
use horde_core::{Resource, StepError, TickId};
use horde_crowd::{ScheduleError, SteeringConfig, SteeringPass, Warning};
use horde_engine::{ConfigError, CrowdConfig, CrowdWorld};
use horde_field::{GoalRegion, PressureConfig, BLOCKED_PRESSURE};
use horde_test_utils::fixtures::{FailingPass, NudgePass};
use horde_test_utils::{bordered_room, open_grid, unit_spec};
use horde_space::WalkableGrid;

fn config(goal: GoalRegion) -> CrowdConfig {
    let mut config = CrowdConfig::default();
    config.schedule.workers = Some(2);
    config.goal = goal;
    config
}

fn room_world() -> CrowdWorld {
    let goal = GoalRegion::new(Vec2::new(6.5, 6.5), 1.0);
    CrowdWorld::new(bordered_room(10, 10), config(goal)).unwrap()
}

#[test]
fn failed_goal_rebuild_keeps_old_field_and_retries() {
    let mut w = room_world();
    w.step().unwrap();
    let published = w.flow_field().unwrap();

    w.set_goal(Vec2::new(f32::NAN, 2.0), 1.0);
    let m = w.step().unwrap();
    assert_eq!(m.rebuild_failures, 1);
    assert!(!m.fields_rebuilt);
    assert!(w.fields_dirty());
    assert!(published.ptr_eq(&w.flow_field().unwrap()));
    assert!(w.diagnostics().has_fired(Warning::RebuildFailed));

    assert_eq!(w.step().unwrap().rebuild_failures, 2);

    w.set_goal(Vec2::new(2.5, 2.5), 1.0);
    let m = w.step().unwrap();
    assert!(m.fields_rebuilt);
    assert_eq!(m.rebuild_failures, 2);
    assert!(!w.fields_dirty());
    assert_eq!(w.flow_field().unwrap().distance_at(2, 2), 0);
}

#[test]
fn wall_edit_reroutes_flow() {
    let mut w = room_world();
    w.step().unwrap();
    let before = w.flow_field().unwrap().distance_at(1, 1);
    // A wall across the room, leaving a gap at x = 8.
    for x in 1..8 {
        assert!(w.set_walkable(x, 4, false));
    }
    let m = w.step().unwrap();
    assert!(m.fields_rebuilt);
    let after = w.flow_field().unwrap().distance_at(1, 1);
    assert!(after > before, "{before} -> {after}");
    assert_eq!(w.wall_field().unwrap().distance_at(3, 4), 0);
}

#[test]
fn replaced_grid_resizes_pressure() {
    let mut w = room_world();
    w.spawn(Vec2::new(3.5, 3.5), 1.0);
    w.step().unwrap();
    assert_eq!(w.pressure().spec(), w.grid().spec());

    w.replace_grid(open_grid(20, 12));
    w.step().unwrap();
    assert_eq!(w.pressure().spec(), &unit_spec(20, 12));
    assert_eq!(w.pressure().values().len(), 240);
    assert_eq!(w.flow_field().unwrap().spec(), &unit_spec(20, 12));
}

#[test]
fn despawned_agents_freeze_and_slots_recycle() {
    let mut w = room_world();
    let a = w.spawn(Vec2::new(2.5, 2.5), 1.0).unwrap();
    let b = w.spawn(Vec2::new(3.5, 2.5), 1.0).unwrap();
    w.step().unwrap();
    assert!(w.despawn(a));
    assert!(!w.despawn(a));
    let frozen = w.positions()[a.index()];

    let m = w.step().unwrap();
    assert_eq!(m.active_agents, 1);
    assert_eq!(w.positions()[a.index()], frozen);
    assert!(w.agents().is_active(b));

    let c = w.spawn(Vec2::new(5.5, 5.5), 1.0).unwrap();
    assert_eq!(c, a);
    assert_eq!(w.step().unwrap().active_agents, 2);
}

#[test]
fn non_finite_spawn_is_refused_and_crowd_keeps_moving() {
    let mut w = room_world();
    let good = w.spawn(Vec2::new(1.5, 1.5), 1.0).unwrap();
    assert_eq!(w.spawn(Vec2::new(f32::NAN, 2.0), 1.0), None);
    assert!(w.diagnostics().has_fired(Warning::SpawnRejected));
    assert_eq!(w.agents().slot_count(), 1);

    for _ in 0..20 {
        let m = w.step().unwrap();
        assert_eq!(m.active_agents, 1);
    }
    assert_eq!(w.current_tick(), TickId(20));
    assert_ne!(w.agents().position(good), Some(Vec2::new(1.5, 1.5)));
}

#[test]
fn pressure_cadence_shows_in_metrics() {
    let goal = GoalRegion::new(Vec2::new(6.5, 6.5), 1.0);
    let mut cfg = config(goal);
    cfg.schedule.pressure_rebuild_every = 3;
    let mut w = CrowdWorld::new(bordered_room(10, 10), cfg).unwrap();
    w.spawn(Vec2::new(2.5, 2.5), 1.0);
    let pattern: Vec<bool> = (0..6).map(|_| w.step().unwrap().pressure_rebuilt).collect();
    assert_eq!(pattern, [true, false, false, true, false, false]);
    assert_eq!(w.pressure().rebuild_count(), 2);
}

#[test]
fn cell_edit_rebuilds_pressure_off_cadence() {
    let goal = GoalRegion::new(Vec2::new(6.5, 6.5), 1.0);
    let mut cfg = config(goal);
    cfg.schedule.pressure_rebuild_every = 5;
    let mut w = CrowdWorld::new(bordered_room(10, 10), cfg).unwrap();
    w.spawn(Vec2::new(2.5, 2.5), 1.0);
    assert!(w.step().unwrap().pressure_rebuilt);
    assert!(!w.step().unwrap().pressure_rebuilt);

    assert!(w.set_walkable(5, 5, false));
    assert!(w.step().unwrap().pressure_rebuilt);
    assert_eq!(w.pressure().pressure_at(5, 5), Some(BLOCKED_PRESSURE));
    assert!(!w.step().unwrap().pressure_rebuilt);
}

#[test]
fn replaced_grid_of_same_size_rebuilds_pressure() {
    let goal = GoalRegion::new(Vec2::new(6.5, 6.5), 1.0);
    let mut cfg = config(goal);
    cfg.schedule.pressure_rebuild_every = 5;
    let mut w = CrowdWorld::new(bordered_room(10, 10), cfg).unwrap();
    w.spawn(Vec2::new(2.5, 2.5), 1.0);
    w.step().unwrap();

    let mut walled = bordered_room(10, 10);
    walled.set_walkable(4, 4, false);
    w.replace_grid(walled);
    assert!(w.grid().version() > w.pressure().version());
    assert!(w.step().unwrap().pressure_rebuilt);
    assert_eq!(w.pressure().pressure_at(4, 4), Some(BLOCKED_PRESSURE));
}

#[test]
fn metrics_list_passes_in_order() {
    let mut w = room_world();
    let m = w.step().unwrap();
    let names: Vec<&str> = m.pass_us.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        [
            "pressure",
            "steering",
            "soft_separation",
            "hard_separation",
            "wall_repulsion"
        ]
    );
    assert_eq!(w.last_metrics(), &m);
    assert_eq!(w.current_tick(), TickId(1));
}

#[test]
fn schedule_without_pressure_writer_is_rejected() {
    let goal = GoalRegion::new(Vec2::new(6.5, 6.5), 1.0);
    let result = CrowdWorld::with_passes(
        bordered_room(10, 10),
        config(goal),
        vec![Box::new(SteeringPass::new(
            SteeringConfig::default(),
            PressureConfig::default(),
        ))],
    );
    match result {
        Err(ConfigError::Schedule(ScheduleError::UnsatisfiedRead { pass, resource })) => {
            assert_eq!(pass, "steering");
            assert_eq!(resource, Resource::Pressure);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("schedule should have been rejected"),
    }
}

#[test]
fn failing_pass_leaves_world_untouched() {
    let goal = GoalRegion::new(Vec2::new(6.5, 6.5), 1.0);
    let mut w = CrowdWorld::with_passes(
        bordered_room(10, 10),
        config(goal),
        vec![
            Box::new(NudgePass::new("nudge", Vec2::new(0.5, 0.0))),
            Box::new(FailingPass::new("broken", 0)),
        ],
    )
    .unwrap();
    let id = w.spawn(Vec2::new(2.5, 2.5), 1.0).unwrap();
    let err = w.step().unwrap_err();
    assert!(matches!(err, StepError::PassFailed { ref name, .. } if name == "broken"));
    assert_eq!(w.agents().position(id), Some(Vec2::new(2.5, 2.5)));
    assert_eq!(w.current_tick(), TickId(0));
}

#[test]
fn toml_config_drives_world() {
    let cfg = CrowdConfig::from_toml_str(
        r#"
        [schedule]
        workers = 1
        dt = 0.2

        [goal]
        center = [3.5, 3.5]
        radius = 1.0
        "#,
    )
    .unwrap();
    let w = CrowdWorld::new(WalkableGrid::open(unit_spec(8, 8)), cfg).unwrap();
    assert_eq!(w.goal(), GoalRegion::new(Vec2::splat(3.5), 1.0));
    assert_eq!(w.engine().dt(), 0.2);
    assert_eq!(w.engine().workers(), 1);
}
