//! End-to-end scheduler behavior over the sandbox world

use std::collections::HashSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use colony_mind::core::{EntityId, ResourceKind, SchedulerConfig, SchedulerError, Vec2};
use colony_mind::entity::{AgentProfile, NeedKind};
use colony_mind::sandbox::Sandbox;
use colony_mind::simulation::{AgentCycle, TaskOrchestrator};
use colony_mind::systems::SystemKind;
use colony_mind::tasks::{PriorityBand, TaskKind, TaskSource, TaskSpec, TaskStatus, TaskTarget};

const DT: u64 = 250;

fn scheduler() -> TaskOrchestrator {
    TaskOrchestrator::new(SchedulerConfig::default()).unwrap()
}

fn lone_agent(world: &mut Sandbox, scheduler: &mut TaskOrchestrator) -> EntityId {
    let agent = world.spawn_agent(Vec2::new(0.0, 0.0), AgentProfile::default());
    scheduler.register_agent(agent);
    agent
}

/// One scheduler pass followed by one world step
fn tick(world: &mut Sandbox, scheduler: &mut TaskOrchestrator) {
    scheduler.update(world, DT).unwrap();
    for fallen in world.advance(DT) {
        scheduler.clear_agent(fallen);
    }
}

#[test]
fn critical_hunger_targets_known_food() {
    let mut world = Sandbox::new();
    let mut scheduler = scheduler();
    let agent = lone_agent(&mut world, &mut scheduler);
    let food = world.spawn_resource(ResourceKind::Food, Vec2::new(10.0, 0.0), 10);
    world.set_need(agent, NeedKind::Hunger, 10.0);

    let cycle = scheduler.update_agent(&mut world, agent, 0).unwrap();
    assert!(cycle.ran().unwrap().proposed >= 1);

    let active = scheduler.active_task(agent).unwrap();
    assert_eq!(active.kind(), TaskKind::SatisfyNeed);
    assert_eq!(active.priority(), PriorityBand::CRITICAL);
    assert_eq!(active.target(), Some(&TaskTarget::Entity(food)));
    assert_eq!(active.params().get_str("need"), Some("hunger"));

    // Out of range, so the first step is a move request
    let requests = world.requests_by(agent);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].system, SystemKind::Movement);
}

#[test]
fn mild_thirst_produces_nothing() {
    let mut world = Sandbox::new();
    let mut scheduler = scheduler();
    let agent = lone_agent(&mut world, &mut scheduler);
    world.spawn_resource(ResourceKind::Water, Vec2::new(5.0, 0.0), 10);
    world.set_need(agent, NeedKind::Thirst, 40.0);

    scheduler.update_agent(&mut world, agent, 0).unwrap();

    let satisfy = |kind: TaskKind| kind == TaskKind::SatisfyNeed;
    assert!(!scheduler.active_task(agent).is_some_and(|t| satisfy(t.kind())));
    assert!(scheduler
        .pending_tasks(agent)
        .iter()
        .all(|t| !satisfy(t.kind())));
}

#[test]
fn badly_wounded_agent_flees_instead_of_fighting() {
    let mut world = Sandbox::new();
    let mut scheduler = scheduler();
    let victim = lone_agent(&mut world, &mut scheduler);
    let attacker = world.spawn_agent(Vec2::new(3.0, 0.0), AgentProfile::default());
    world.wound(victim, 85.0, Some(attacker));

    scheduler.update_agent(&mut world, victim, 0).unwrap();

    let active = scheduler.active_task(victim).unwrap();
    assert_eq!(active.kind(), TaskKind::Flee);
    assert_eq!(active.priority(), PriorityBand::CRITICAL);
    match active.target() {
        Some(TaskTarget::Position(dest)) => assert!(dest.x < 0.0),
        other => panic!("flee without a destination: {:?}", other),
    }
    assert!(scheduler
        .pending_tasks(victim)
        .iter()
        .all(|t| t.kind() != TaskKind::Attack));
    assert!(world.requests_by(victim)[0].action.starts_with("flee"));
}

#[test]
fn repeated_emission_accumulates() {
    let mut world = Sandbox::new();
    let mut scheduler = scheduler();
    let agent = lone_agent(&mut world, &mut scheduler);

    let gather = || TaskSpec::new(TaskKind::Gather, 0.4, TaskSource::external("foreman"));
    scheduler.emit_task(agent, gather(), 0).unwrap();
    scheduler.emit_task(agent, gather(), 0).unwrap();

    let pending = scheduler.pending_tasks(agent);
    assert_eq!(pending.len(), 1);
    assert!((pending[0].priority() - 0.5).abs() < 1e-6);
    assert_eq!(scheduler.stats().accumulated, 1);
}

#[test]
fn cleared_agent_is_never_dispatched_again() {
    let mut world = Sandbox::new();
    let mut scheduler = scheduler();
    let agent = lone_agent(&mut world, &mut scheduler);
    world.spawn_resource(ResourceKind::Food, Vec2::new(20.0, 0.0), 10);
    world.set_need(agent, NeedKind::Hunger, 10.0);

    tick(&mut world, &mut scheduler);
    tick(&mut world, &mut scheduler);
    assert_eq!(
        scheduler.active_task(agent).map(|t| t.kind()),
        Some(TaskKind::SatisfyNeed)
    );

    assert!(scheduler.clear_agent(agent));
    assert!(scheduler.active_task(agent).is_none());
    assert!(scheduler.pending_tasks(agent).is_empty());
    assert!(scheduler.memory(agent).is_none());

    let before = world.requests_by(agent).len();
    for _ in 0..5 {
        tick(&mut world, &mut scheduler);
    }
    assert_eq!(world.requests_by(agent).len(), before);
    assert!(matches!(
        scheduler.update_agent(&mut world, agent, DT),
        Err(SchedulerError::UnknownAgent(_))
    ));
}

#[test]
fn hungry_agent_walks_to_food_and_eats() {
    let mut world = Sandbox::new();
    let mut scheduler = scheduler();
    let agent = lone_agent(&mut world, &mut scheduler);
    let food = world.spawn_resource(ResourceKind::Food, Vec2::new(10.0, 0.0), 10);
    world.set_need(agent, NeedKind::Hunger, 10.0);

    for _ in 0..40 {
        tick(&mut world, &mut scheduler);
        if world.needs.get(agent).is_some_and(|n| n.hunger > 40.0) {
            break;
        }
    }

    assert!(world.needs.get(agent).unwrap().hunger > 40.0);
    let eaten = scheduler
        .recent_finished()
        .find(|f| f.task.kind() == TaskKind::SatisfyNeed)
        .unwrap();
    assert_eq!(eaten.task.status(), TaskStatus::Completed);
    assert_eq!(
        scheduler
            .memory(agent)
            .and_then(|m| m.known_resource(ResourceKind::Food))
            .map(|k| k.id),
        Some(food)
    );
}

#[test]
fn expired_task_is_never_promoted() {
    let mut world = Sandbox::new();
    let mut scheduler = scheduler();
    let agent = lone_agent(&mut world, &mut scheduler);

    let spec = TaskSpec::new(TaskKind::Rest, 0.9, TaskSource::external("bell")).with_ttl(100);
    scheduler.emit_task(agent, spec, 0).unwrap();
    world.advance(DT);

    scheduler.update_agent(&mut world, agent, DT).unwrap();
    assert_ne!(
        scheduler.active_task(agent).map(|t| t.kind()),
        Some(TaskKind::Rest)
    );
    assert!(scheduler
        .pending_tasks(agent)
        .iter()
        .all(|t| t.kind() != TaskKind::Rest));
    assert_eq!(scheduler.stats().expired, 1);
}

#[test]
fn single_active_task_and_terminal_exactly_once() {
    let mut world = Sandbox::generate(20, &mut ChaCha8Rng::seed_from_u64(11));
    let mut scheduler = scheduler();
    for agent in world.agents().to_vec() {
        scheduler.register_agent(agent);
    }

    let mut finished = HashSet::new();
    for _ in 0..120 {
        for agent in scheduler.agents().to_vec() {
            let AgentCycle::Ran(report) = scheduler.update_agent(&mut world, agent, DT).unwrap() else {
                continue;
            };
            if let Some(id) = report.preempted {
                assert!(finished.insert(id), "{} finished twice", id);
            }
            if let Some(id) = report.dispatched {
                assert!(!finished.contains(&id), "{} dispatched after finishing", id);
            }
            if let Some((id, status)) = report.resolved {
                assert!(status.is_terminal());
                assert!(finished.insert(id), "{} finished twice", id);
            }
        }

        for agent in scheduler.agents() {
            if let Some(task) = scheduler.active_task(*agent) {
                assert_eq!(task.status(), TaskStatus::Active);
                assert_eq!(task.agent(), *agent);
            }
            assert!(scheduler
                .pending_tasks(*agent)
                .iter()
                .all(|t| t.status() == TaskStatus::Pending));
        }

        for fallen in world.advance(DT) {
            scheduler.clear_agent(fallen);
        }
    }

    let stats = scheduler.stats();
    assert!(stats.completed > 0);
    assert!(stats.active <= stats.agents);
}

#[test]
fn runs_are_reproducible() {
    let run = |seed: u64| {
        let mut world = Sandbox::generate(16, &mut ChaCha8Rng::seed_from_u64(seed));
        let mut scheduler = scheduler();
        for agent in world.agents().to_vec() {
            scheduler.register_agent(agent);
        }
        for _ in 0..80 {
            tick(&mut world, &mut scheduler);
        }
        serde_json::to_string(&scheduler.stats()).unwrap()
    };

    assert_eq!(run(3), run(3));
}
