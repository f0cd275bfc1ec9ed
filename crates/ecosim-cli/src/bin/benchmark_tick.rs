use ecosim_core::{SimConfig, World};
use std::time::{Duration, Instant};

fn main() {
    let config = SimConfig {
        initial_prey: SimConfig::MAX_PREY,
        initial_predators: SimConfig::MAX_PREDATORS,
        seed: 42,
        ..SimConfig::default()
    };
    println!(
        "Benchmarking with {} prey and {} predators in a {}x{} world",
        config.initial_prey, config.initial_predators, config.world_width, config.world_height
    );

    let mut world1 = World::new(config.clone());
    let mut world2 = World::new(config);

    let steps = 500u32;

    // Plain ticks, summing the per-phase timings
    let mut spatial = Duration::ZERO;
    let mut prey = Duration::ZERO;
    let mut predators = Duration::ZERO;
    let start = Instant::now();
    for _ in 0..steps {
        let timings = world1.step();
        spatial += Duration::from_micros(timings.spatial_build_us);
        prey += Duration::from_micros(timings.prey_update_us);
        predators += Duration::from_micros(timings.predator_update_us);
    }
    let duration_plain = start.elapsed();
    println!("Time for {} steps: {:?}", steps, duration_plain);
    println!("Avg time per step: {:?}", duration_plain / steps);
    println!(
        "Avg phases per step: grid {:?}, prey {:?}, predators {:?}",
        spatial / steps,
        prey / steps,
        predators / steps
    );
    println!(
        "Final populations: {} prey, {} predators",
        world1.prey_count(),
        world1.predator_count()
    );

    // Same run through the experiment driver, sampling every step
    let start = Instant::now();
    world2.run_experiment(steps as usize, 1);
    let duration_sampled = start.elapsed();
    println!("Time for {} steps WITH sampling: {:?}", steps, duration_sampled);

    let diff = duration_sampled.saturating_sub(duration_plain);
    println!("Total sampling overhead: {:?}", diff);
    println!("Avg sampling overhead per step: {:?}", diff / steps);
}
