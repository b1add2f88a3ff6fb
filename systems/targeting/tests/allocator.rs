use glam::Vec2;
use lanebound_core::{
    Archetype, Command, Event, Phase, Team, Tier, TierCounts, UnitId, UnitKind, UnitSnapshot,
    UnitState, UnitView, WaveConfig,
};
use lanebound_system_targeting::{find_best_target, LoadTable, TargetAllocator};
use lanebound_world::{self as world, config::MatchConfig, query, World};

fn unit(index: u32, team: Team, position: Vec2) -> UnitSnapshot {
    UnitSnapshot {
        id: UnitId::new(index, 0),
        team,
        archetype: Archetype::new(UnitKind::Viking, Tier::Base),
        state: UnitState::Engaging,
        position,
        facing: 0.0,
        health: 100,
        max_health: 100,
        target: None,
        attack_range: 1.5,
        wait_slot: position,
        invulnerable: false,
    }
}

fn line(team: Team, first_index: u32, count: u32, z: f32) -> Vec<UnitSnapshot> {
    (0..count)
        .map(|offset| unit(first_index + offset, team, Vec2::new(offset as f32, z)))
        .collect()
}

fn assignments(commands: &[Command]) -> Vec<(UnitId, UnitId)> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::AssignTarget { unit, target } => Some((*unit, *target)),
            _ => None,
        })
        .collect()
}

fn combat_started() -> Event {
    Event::PhaseChanged {
        from: Phase::Deployment,
        to: Phase::Combat,
    }
}

#[test]
fn combat_start_assigns_every_live_unit_friendly_side_first() {
    let mut snapshots = line(Team::Friendly, 0, 3, 0.0);
    snapshots.extend(line(Team::Enemy, 10, 3, 10.0));
    let view = UnitView::from_snapshots(snapshots);

    let mut allocator = TargetAllocator::new();
    let mut commands = Vec::new();
    allocator.handle(&[combat_started()], &view, &mut commands);

    let assigned = assignments(&commands);
    assert_eq!(assigned.len(), 6);
    assert!(assigned[..3]
        .iter()
        .all(|(unit, _)| view.get(*unit).map(|s| s.team) == Some(Team::Friendly)));
    assert_eq!(
        assigned,
        vec![
            (UnitId::new(0, 0), UnitId::new(10, 0)),
            (UnitId::new(1, 0), UnitId::new(11, 0)),
            (UnitId::new(2, 0), UnitId::new(12, 0)),
            (UnitId::new(10, 0), UnitId::new(0, 0)),
            (UnitId::new(11, 0), UnitId::new(1, 0)),
            (UnitId::new(12, 0), UnitId::new(2, 0)),
        ]
    );
}

#[test]
fn load_outweighs_distance_when_attackers_outnumber_targets() {
    let mut snapshots = line(Team::Friendly, 0, 4, 0.0);
    snapshots.push(unit(10, Team::Enemy, Vec2::new(0.0, 5.0)));
    snapshots.push(unit(11, Team::Enemy, Vec2::new(40.0, 5.0)));
    let view = UnitView::from_snapshots(snapshots);

    let mut allocator = TargetAllocator::new();
    let mut commands = Vec::new();
    allocator.assign_targets(&view, &mut commands);

    let enemy_loads = allocator.loads(Team::Enemy);
    assert_eq!(enemy_loads.load(UnitId::new(10, 0)), Some(2));
    assert_eq!(enemy_loads.load(UnitId::new(11, 0)), Some(2));
    assert_eq!(enemy_loads.total_load(), 4);
    assert_eq!(allocator.loads(Team::Friendly).total_load(), 2);
}

#[test]
fn reseek_purges_dead_candidates_and_prefers_the_nearest_equal_load() {
    let mut snapshots = line(Team::Friendly, 0, 3, 0.0);
    snapshots.extend(line(Team::Enemy, 10, 3, 10.0));
    let view = UnitView::from_snapshots(snapshots.clone());

    let mut allocator = TargetAllocator::new();
    let mut commands = Vec::new();
    allocator.assign_targets(&view, &mut commands);
    assert_eq!(allocator.loads(Team::Enemy).len(), 3);

    for snapshot in &mut snapshots {
        if snapshot.id == UnitId::new(10, 0) {
            snapshot.state = UnitState::Dead;
        }
    }
    let after_death = UnitView::from_snapshots(snapshots);
    let selector = after_death
        .get(UnitId::new(0, 0))
        .expect("selector present")
        .clone();

    let target = allocator.new_target(&selector, &after_death);

    assert_eq!(target, Some(UnitId::new(11, 0)));
    assert_eq!(allocator.loads(Team::Enemy).len(), 2);
    assert_eq!(allocator.loads(Team::Enemy).load(UnitId::new(10, 0)), None);
    assert_eq!(allocator.loads(Team::Enemy).load(UnitId::new(11, 0)), Some(2));
}

#[test]
fn loads_are_kept_across_reseeks_within_a_combat() {
    let mut snapshots = line(Team::Friendly, 0, 1, 0.0);
    snapshots.extend(line(Team::Enemy, 10, 2, 10.0));
    let view = UnitView::from_snapshots(snapshots);
    let selector = view.get(UnitId::new(0, 0)).expect("selector").clone();

    let mut allocator = TargetAllocator::new();
    let mut commands = Vec::new();
    allocator.assign_targets(&view, &mut commands);

    let picks: Vec<_> = (0..4)
        .filter_map(|_| allocator.new_target(&selector, &view))
        .collect();
    assert_eq!(
        picks,
        vec![
            UnitId::new(11, 0),
            UnitId::new(10, 0),
            UnitId::new(11, 0),
            UnitId::new(10, 0),
        ]
    );
    assert_eq!(allocator.loads(Team::Enemy).total_load(), 5);
}

#[test]
fn equal_scores_keep_the_first_candidate_in_table_order() {
    let selector = unit(0, Team::Friendly, Vec2::ZERO);
    let view = UnitView::from_snapshots(vec![
        selector.clone(),
        unit(3, Team::Enemy, Vec2::new(1.0, 5.0)),
        unit(4, Team::Enemy, Vec2::new(-1.0, 5.0)),
    ]);
    let mut allocator = TargetAllocator::new();
    let mut commands = Vec::new();
    allocator.assign_targets(&view, &mut commands);

    assert_eq!(assignments(&commands)[0], (UnitId::new(0, 0), UnitId::new(3, 0)));
}

#[test]
fn refused_assignment_gives_its_load_back() {
    let mut snapshots = line(Team::Friendly, 0, 2, 0.0);
    snapshots.extend(line(Team::Enemy, 10, 2, 10.0));
    let view = UnitView::from_snapshots(snapshots);
    let near = UnitId::new(10, 0);
    let far = UnitId::new(11, 0);

    let mut allocator = TargetAllocator::new();
    let mut commands = Vec::new();
    allocator.handle(&[combat_started()], &view, &mut commands);
    assert_eq!(allocator.loads(Team::Enemy).load(near), Some(1));
    assert_eq!(allocator.loads(Team::Enemy).load(far), Some(1));

    allocator.handle(
        &[
            Event::TargetRejected {
                unit: UnitId::new(0, 0),
                target: near,
            },
            Event::TargetRejected {
                unit: UnitId::new(0, 0),
                target: UnitId::new(42, 1),
            },
        ],
        &view,
        &mut commands,
    );
    assert_eq!(allocator.loads(Team::Enemy).load(near), Some(0));
    assert_eq!(allocator.loads(Team::Enemy).total_load(), 1);

    commands.clear();
    allocator.handle(
        &[Event::TargetNeeded {
            unit: UnitId::new(1, 0),
        }],
        &view,
        &mut commands,
    );
    assert_eq!(assignments(&commands), vec![(UnitId::new(1, 0), near)]);
}

#[test]
fn empty_tables_and_unknown_requesters_produce_nothing() {
    let selector = unit(0, Team::Friendly, Vec2::ZERO);
    let view = UnitView::from_snapshots(vec![selector.clone()]);

    assert_eq!(find_best_target(&selector, &LoadTable::default(), &view), None);

    let mut allocator = TargetAllocator::new();
    let mut commands = Vec::new();
    allocator.handle(
        &[
            Event::TargetNeeded { unit: selector.id },
            Event::TargetNeeded {
                unit: UnitId::new(7, 3),
            },
        ],
        &view,
        &mut commands,
    );
    assert!(commands.is_empty());
}

#[test]
fn allocator_drives_world_targets_when_combat_starts() {
    let config = MatchConfig {
        waves: vec![WaveConfig {
            giant: TierCounts::new(1, 0),
            max_placeable_units: 3,
            ..WaveConfig::default()
        }],
        ..MatchConfig::default()
    };
    let mut world = World::new(config);
    let mut allocator = TargetAllocator::new();
    let mut events = Vec::new();

    for x in [-1.0, 1.0] {
        world::apply(
            &mut world,
            Command::PurchaseUnit {
                archetype: Archetype::new(UnitKind::Viking, Tier::Base),
                position: Vec2::new(x, 0.0),
            },
            &mut events,
        );
    }
    world::apply(
        &mut world,
        Command::SetPhase {
            phase: Phase::Deployment,
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::SpawnUnit {
            archetype: Archetype::new(UnitKind::Giant, Tier::Base),
            team: Team::Enemy,
            position: Vec2::new(0.0, 8.0),
            facing: 0.0,
            designated: None,
            wait_slot: Vec2::new(0.0, 8.0),
        },
        &mut events,
    );

    events.clear();
    world::apply(
        &mut world,
        Command::SetPhase {
            phase: Phase::Combat,
        },
        &mut events,
    );
    let mut commands = Vec::new();
    allocator.handle(&events, &query::unit_view(&world), &mut commands);
    assert_eq!(assignments(&commands).len(), 3);

    let mut applied = Vec::new();
    for command in commands {
        world::apply(&mut world, command, &mut applied);
    }
    let confirmations = applied
        .iter()
        .filter(|event| matches!(event, Event::TargetAssigned { .. }))
        .count();
    assert_eq!(confirmations, 3);

    let view = query::unit_view(&world);
    let giant = view
        .live_team(Team::Enemy)
        .next()
        .map(|unit| unit.id)
        .expect("giant present");
    assert!(view
        .live_team(Team::Friendly)
        .all(|unit| unit.target == Some(giant)));
    assert_eq!(allocator.loads(Team::Enemy).load(giant), Some(2));
}
