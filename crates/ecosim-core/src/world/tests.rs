use super::*;
use crate::agent::{AgentKind, PREDATOR_TRAITS};
use crate::environment::{FoodArea, Obstacle};

fn rng() -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(5)
}

fn still_prey(x: f64, y: f64) -> Agent {
    let mut agent = Agent::new_prey(Vec2::new(x, y), &mut rng());
    agent.velocity = Vec2::ZERO;
    agent
}

fn still_predator(x: f64, y: f64) -> Agent {
    let mut agent = Agent::new_predator(Vec2::new(x, y), &mut rng());
    agent.velocity = Vec2::ZERO;
    agent
}

fn bare_world(prey: Vec<Agent>, predators: Vec<Agent>) -> World {
    World::with_populations(SimConfig::default(), Environment::empty(), prey, predators)
        .expect("valid populations")
}

fn assert_invariants(world: &World) {
    let (w, h) = (world.config.world_width, world.config.world_height);
    assert!(world.prey.len() <= SimConfig::MAX_PREY);
    assert!(world.predators.len() <= SimConfig::MAX_PREDATORS);
    for agent in world.prey.iter().chain(world.predators.iter()) {
        let traits = agent.traits();
        assert!(
            agent.velocity.length_squared() <= traits.max_speed_sq + 1e-9,
            "speed {} above max {}",
            agent.velocity.length(),
            traits.max_speed
        );
        assert!((0.0..w).contains(&agent.position.x));
        assert!((0.0..h).contains(&agent.position.y));
        assert!(agent.energy > 0.0 && agent.energy <= traits.max_energy);
    }
}

#[test]
fn default_world_matches_config() {
    let world = World::new(SimConfig::default());
    assert_eq!(world.prey_count(), 100);
    assert_eq!(world.predator_count(), 3);
    assert_eq!(world.environment().feature_count(), 11);
    assert_eq!(world.tick_index(), 0);
    assert!(world.prey().iter().all(|a| a.species() == Species::Prey));
    assert!(world.predators().iter().all(|a| a.species() == Species::Predator));
}

#[test]
fn invariants_hold_over_many_ticks() {
    let mut world = World::new(SimConfig::default());
    for _ in 0..200 {
        world.step();
        assert_invariants(&world);
    }
    assert_eq!(world.tick_index(), 200);
}

#[test]
fn populations_stay_capped_under_aggressive_breeding() {
    let config = SimConfig {
        initial_prey: 120,
        initial_predators: 10,
        tunables: Tunables {
            prey_reproduction_interval: 1,
            prey_reproduction_energy_cost: 1.0,
            predator_reproduction_threshold: 1,
            predator_reproduction_energy_cost: 1.0,
            ..Tunables::default()
        },
        ..SimConfig::default()
    };
    let mut world = World::new(config);
    for _ in 0..60 {
        world.step();
        assert_invariants(&world);
    }
    let events = world.total_events();
    assert_eq!(
        world.prey_count() + events.predations + events.prey_starved,
        120 + events.prey_births
    );
}

#[test]
fn same_seed_gives_identical_runs() {
    let mut a = World::new(SimConfig::default());
    let mut b = World::new(SimConfig::default());
    for _ in 0..50 {
        a.step();
        b.step();
    }
    let (sa, sb) = (a.snapshot(), b.snapshot());
    assert_eq!(sa.prey, sb.prey);
    assert_eq!(sa.predators, sb.predators);
    assert_eq!(a.total_events(), b.total_events());
}

#[test]
fn starved_agents_are_removed_before_moving() {
    let mut doomed = still_prey(100.0, 100.0);
    doomed.energy = 0.005;
    let mut world = bare_world(vec![doomed, still_prey(300.0, 300.0)], vec![]);
    world.step();
    assert_eq!(world.prey_count(), 1);
    assert_eq!(world.events_last_tick().prey_starved, 1);
    assert!((world.prey()[0].energy - 149.99).abs() < 1e-9);
}

#[test]
fn prey_inside_food_area_gains_energy() {
    let mut prey = still_prey(200.0, 200.0);
    prey.energy = 100.0;
    let environment = Environment {
        food_areas: vec![FoodArea {
            position: Vec2::new(200.0, 200.0),
            radius: 50.0,
        }],
        ..Environment::default()
    };
    let mut world =
        World::with_populations(SimConfig::default(), environment, vec![prey], vec![]).unwrap();
    world.step();
    assert!((world.prey()[0].energy - (100.0 - 0.01 + 0.15)).abs() < 1e-9);
    assert_eq!(world.prey()[0].position, Vec2::new(200.0, 200.0));
}

#[test]
fn overlapping_food_areas_stack() {
    let mut prey = still_prey(200.0, 200.0);
    prey.energy = 100.0;
    let area = FoodArea {
        position: Vec2::new(200.0, 200.0),
        radius: 50.0,
    };
    let environment = Environment {
        food_areas: vec![area, area],
        ..Environment::default()
    };
    let mut world =
        World::with_populations(SimConfig::default(), environment, vec![prey], vec![]).unwrap();
    world.step();
    assert!((world.prey()[0].energy - (100.0 - 0.01 + 0.30)).abs() < 1e-9);
}

#[test]
fn prey_reproduce_once_the_interval_elapses() {
    let mut parent = still_prey(400.0, 300.0);
    parent.energy = 100.0;
    parent.kind = AgentKind::Prey {
        reproduction_timer: 399,
    };
    let mut world = bare_world(vec![parent], vec![]);
    world.step();

    assert_eq!(world.prey_count(), 2);
    assert_eq!(world.events_last_tick().prey_births, 1);
    let (parent, child) = (&world.prey()[0], &world.prey()[1]);
    assert!((parent.energy - 24.99).abs() < 1e-9);
    assert_eq!(parent.reproduction_timer(), Some(0));
    assert_eq!(child.energy, 37.5);
    assert_eq!(child.position, parent.position);
    assert_eq!(child.age, 0);
}

#[test]
fn prey_at_cap_reset_timers_without_breeding() {
    let prey = (0..SimConfig::MAX_PREY)
        .map(|i| {
            let mut agent = still_prey(10.0 + (i % 15) as f64 * 55.0, 20.0 + (i / 15) as f64 * 55.0);
            agent.energy = 100.0;
            agent.kind = AgentKind::Prey {
                reproduction_timer: 399,
            };
            agent
        })
        .collect();
    let mut world = bare_world(prey, vec![]);
    world.step();
    assert_eq!(world.prey_count(), SimConfig::MAX_PREY);
    assert_eq!(world.events_last_tick().prey_births, 0);
    for agent in world.prey() {
        assert_eq!(agent.reproduction_timer(), Some(0));
        assert!((agent.energy - 99.99).abs() < 1e-9);
    }
}

#[test]
fn predator_eats_prey_in_contact() {
    let mut world = bare_world(
        vec![still_prey(102.0, 100.0)],
        vec![still_predator(100.0, 100.0)],
    );
    world.step();

    assert_eq!(world.prey_count(), 0);
    assert_eq!(world.events_last_tick().predations, 1);
    let predator = &world.predators()[0];
    assert_eq!(predator.prey_eaten(), Some(1));
    assert!((predator.energy - (150.0 - 0.015 + 40.0)).abs() < 1e-9);
}

#[test]
fn eaten_prey_is_invisible_to_later_predators() {
    let mut world = bare_world(
        vec![still_prey(102.0, 100.0)],
        vec![still_predator(100.0, 100.0), still_predator(104.0, 100.0)],
    );
    world.step();

    assert_eq!(world.prey_count(), 0);
    assert_eq!(world.events_last_tick().predations, 1);
    assert_eq!(world.predators()[0].prey_eaten(), Some(1));
    assert_eq!(world.predators()[1].prey_eaten(), Some(0));
}

#[test]
fn predator_breeds_after_reaching_threshold() {
    let mut hunter = still_predator(100.0, 100.0);
    hunter.energy = 200.0;
    hunter.kind = AgentKind::Predator { prey_eaten: 5 };
    let mut world = bare_world(vec![still_prey(102.0, 100.0)], vec![hunter]);
    world.step();

    assert_eq!(world.predator_count(), 2);
    assert_eq!(world.events_last_tick().predator_births, 1);
    let (parent, child) = (&world.predators()[0], &world.predators()[1]);
    assert_eq!(parent.prey_eaten(), Some(0));
    assert!((parent.energy - (200.0 - 0.015 + 40.0 - 120.0)).abs() < 1e-9);
    assert_eq!(child.energy, 60.0);
    assert_eq!(child.traits().max_speed, PREDATOR_TRAITS.max_speed);
}

#[test]
fn tick_accepts_external_bounds_and_environment() {
    let mut agent = still_prey(99.0, 10.0);
    agent.velocity = Vec2::new(2.0, 0.0);
    let mut world = bare_world(vec![agent], vec![]);
    let environment = Environment {
        obstacles: vec![Obstacle {
            position: Vec2::new(50.0, 50.0),
            radius: 5.0,
        }],
        ..Environment::default()
    };
    world.tick(100.0, 100.0, &environment);
    let position = world.prey()[0].position;
    assert!(position.x < 5.0, "expected wrap to the left edge, got {position:?}");
    assert!(world.environment().obstacles.is_empty());
}

#[test]
fn with_populations_rejects_bad_input() {
    let err = World::with_populations(
        SimConfig::default(),
        Environment::empty(),
        vec![still_predator(1.0, 1.0)],
        vec![],
    )
    .err()
    .expect("predator in the prey list");
    assert!(matches!(
        err,
        WorldInitError::WrongSpecies {
            expected: Species::Prey,
            index: 0
        }
    ));

    let crowd = (0..SimConfig::MAX_PREDATORS + 1)
        .map(|i| still_predator(i as f64, 0.0))
        .collect();
    match World::with_populations(SimConfig::default(), Environment::empty(), vec![], crowd) {
        Err(WorldInitError::PopulationOverCap { max, actual, .. }) => {
            assert_eq!(max, SimConfig::MAX_PREDATORS);
            assert_eq!(actual, SimConfig::MAX_PREDATORS + 1);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("over-cap population accepted"),
    }
}

#[test]
fn with_populations_wraps_positions() {
    let world = bare_world(vec![still_prey(-10.0, 610.0)], vec![]);
    assert_eq!(world.prey()[0].position, Vec2::new(890.0, 10.0));
}

#[test]
fn try_new_rejects_invalid_config() {
    let config = SimConfig {
        initial_prey: SimConfig::MAX_PREY + 1,
        ..SimConfig::default()
    };
    assert!(matches!(
        World::try_new(config),
        Err(WorldInitError::Config(SimConfigError::TooManyPrey { .. }))
    ));
}

#[test]
fn reset_restores_a_fresh_world() {
    let config = SimConfig::default();
    let mut world = World::new(config.clone());
    for _ in 0..30 {
        world.step();
    }
    world.reset(config.clone()).unwrap();
    let fresh = World::new(config.clone());

    assert_eq!(world.tick_index(), 0);
    assert!(world.history().is_empty());
    assert!(world.total_events().is_quiet());
    assert_eq!(world.environment(), fresh.environment());
    assert_eq!(world.snapshot().prey, fresh.snapshot().prey);

    world.reset(config).unwrap();
    assert_eq!(world.snapshot().predators, fresh.snapshot().predators);
}

#[test]
fn failed_reset_keeps_current_state() {
    let mut world = World::new(SimConfig::default());
    world.step();
    let bad = SimConfig {
        world_width: -1.0,
        ..SimConfig::default()
    };
    assert!(world.reset(bad).is_err());
    assert_eq!(world.tick_index(), 1);
}

#[test]
fn new_tunables_apply_on_the_next_tick() {
    let mut world = World::new(SimConfig::default());
    let starving = Tunables {
        prey_energy_decay_rate: 1000.0,
        ..Tunables::default()
    };
    world.set_tunables(starving).unwrap();
    world.step();
    assert_eq!(world.prey_count(), 0);
    assert_eq!(world.events_last_tick().prey_starved, 100);
}

#[test]
fn invalid_tunables_are_rejected() {
    let mut world = World::new(SimConfig::default());
    let bad = Tunables {
        predator_energy_decay_rate: -0.1,
        ..Tunables::default()
    };
    assert!(world.set_tunables(bad).is_err());
    assert_eq!(world.tunables(), &Tunables::default());
}

#[test]
fn shrinking_the_world_rewraps_agents() {
    let mut world = World::new(SimConfig::default());
    let smaller = SimConfig {
        world_width: 200.0,
        world_height: 150.0,
        ..SimConfig::default()
    };
    world.set_config(smaller).unwrap();
    for agent in world.prey().iter().chain(world.predators()) {
        assert!(agent.position.x < 200.0 && agent.position.y < 150.0);
    }
}

#[test]
fn history_tracks_every_tick() {
    let mut world = World::new(SimConfig::default());
    for _ in 0..5 {
        world.step();
    }
    assert_eq!(world.history().len(), 5);
    assert_eq!(world.history().prey().last(), Some(world.prey_count()));
}

#[test]
fn population_stats_report_ratio_and_means() {
    let mut a = still_prey(10.0, 10.0);
    a.energy = 100.0;
    let mut b = still_prey(500.0, 500.0);
    b.energy = 50.0;
    let world = bare_world(vec![a, b], vec![]);
    let stats = world.population_stats();
    assert_eq!(stats.prey_count, 2);
    assert_eq!(stats.prey_predator_ratio, None);
    assert_eq!(stats.prey_energy_mean, 75.0);
    assert_eq!(stats.predator_energy_mean, 0.0);

    let world = bare_world(
        vec![still_prey(10.0, 10.0), still_prey(500.0, 500.0)],
        vec![still_predator(300.0, 300.0)],
    );
    assert_eq!(world.population_stats().prey_predator_ratio, Some(2.0));
}

#[test]
fn experiment_samples_on_schedule_and_at_the_end() {
    let mut world = World::new(SimConfig::default());
    let summary = world.try_run_experiment(10, 3).unwrap();
    let ticks: Vec<u64> = summary.samples.iter().map(|s| s.tick).collect();
    assert_eq!(ticks, vec![3, 6, 9, 10]);
    assert_eq!(summary.schema_version, 1);
    assert_eq!(summary.final_prey_count, world.prey_count());
    assert_eq!(&summary.events, world.total_events());
}

#[test]
fn experiment_rejects_bad_arguments() {
    let mut world = World::new(SimConfig::default());
    assert_eq!(
        world.try_run_experiment(10, 0).err(),
        Some(ExperimentError::InvalidSampleEvery)
    );
    assert!(matches!(
        world.try_run_experiment(World::MAX_EXPERIMENT_STEPS + 1, 1),
        Err(ExperimentError::TooManySteps { .. })
    ));
    assert!(matches!(
        world.try_run_experiment(World::MAX_EXPERIMENT_SAMPLES + 1, 1),
        Err(ExperimentError::TooManySamples { .. })
    ));
    assert_eq!(world.tick_index(), 0);
}

#[test]
fn predator_eats_at_most_one_prey_per_tick() {
    // Index 0 sits in the predator's own cell, index 1 in the column to the left,
    // which the neighbourhood scan visits first.
    let mut world = bare_world(
        vec![still_prey(101.0, 100.0), still_prey(99.0, 100.0)],
        vec![still_predator(100.0, 100.0)],
    );
    world.step();

    assert_eq!(world.prey_count(), 1);
    assert_eq!(world.events_last_tick().predations, 1);
    assert_eq!(world.predators()[0].prey_eaten(), Some(1));
    assert!(
        world.prey()[0].position.x > 100.0,
        "expected the right-hand prey to survive, got {:?}",
        world.prey()[0].position
    );
}

#[test]
fn predators_check_contact_against_moved_prey() {
    // 11.5 apart at the start of the tick, under 10 once the prey has moved.
    let mut runner = still_prey(111.5, 100.0);
    runner.velocity = Vec2::new(-2.0, 0.0);
    let mut world = bare_world(vec![runner], vec![still_predator(100.0, 100.0)]);
    world.step();

    assert_eq!(world.prey_count(), 0);
    assert_eq!(world.events_last_tick().predations, 1);
}

#[test]
fn prey_moving_out_of_contact_survives() {
    // 9 apart at the start of the tick, 11 once the prey has moved.
    let mut runner = still_prey(109.0, 100.0);
    runner.velocity = Vec2::new(2.0, 0.0);
    let mut world = bare_world(vec![runner], vec![still_predator(100.0, 100.0)]);
    world.step();

    assert_eq!(world.prey_count(), 1);
    assert_eq!(world.events_last_tick().predations, 0);
    assert_eq!(world.predators()[0].prey_eaten(), Some(0));
}

#[test]
fn with_populations_rejects_out_of_range_energy() {
    let mut drained = still_prey(10.0, 10.0);
    drained.energy = 0.0;
    match World::with_populations(
        SimConfig::default(),
        Environment::empty(),
        vec![still_prey(5.0, 5.0), drained],
        vec![],
    ) {
        Err(WorldInitError::InvalidEnergy {
            species, index, ..
        }) => {
            assert_eq!(species, Species::Prey);
            assert_eq!(index, 1);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("prey with no energy accepted"),
    }

    let mut bloated = still_predator(10.0, 10.0);
    bloated.energy = PREDATOR_TRAITS.max_energy + 1.0;
    assert!(matches!(
        World::with_populations(SimConfig::default(), Environment::empty(), vec![], vec![bloated]),
        Err(WorldInitError::InvalidEnergy {
            species: Species::Predator,
            index: 0,
            ..
        })
    ));

    let mut full = still_predator(10.0, 10.0);
    full.energy = PREDATOR_TRAITS.max_energy;
    assert!(
        World::with_populations(SimConfig::default(), Environment::empty(), vec![], vec![full])
            .is_ok()
    );
}

#[test]
fn cell_size_check_flags_cells_below_perception() {
    let small = SimConfig {
        cell_size: 50.0,
        ..SimConfig::default()
    };
    let covering = SimConfig {
        cell_size: 75.0,
        ..SimConfig::default()
    };
    assert!(!World::check_cell_size(&small));
    assert!(World::check_cell_size(&covering));
}

#[test]
fn set_config_applies_new_cell_size_to_grids() {
    let mut world = World::new(SimConfig {
        cell_size: 80.0,
        ..SimConfig::default()
    });
    world
        .set_config(SimConfig {
            cell_size: 40.0,
            ..SimConfig::default()
        })
        .unwrap();
    world.step();
    assert_eq!(world.prey_grid.cell_size(), 40.0);
    assert_eq!(world.predator_grid.cell_size(), 40.0);
}
