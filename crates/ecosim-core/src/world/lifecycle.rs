use super::metrics::StepTimings;
use super::World;
use crate::agent::Agent;
use crate::environment::Environment;
use crate::steering::{self, Body, PreySteering};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

impl World {
    /// Decay energy and drop every agent that starved. Runs before the grids are
    /// built, so the dead never steer, move or get indexed.
    fn step_starvation_phase(&mut self) {
        let tunables = &self.config.tunables;

        let prey_before = self.prey.len();
        self.prey.retain_mut(|agent| agent.decay_energy(tunables));
        self.events_last_tick.prey_starved = prey_before - self.prey.len();

        let predators_before = self.predators.len();
        self.predators
            .retain_mut(|agent| agent.decay_energy(tunables));
        self.events_last_tick.predators_starved = predators_before - self.predators.len();
    }

    fn step_grid_phase(&mut self) {
        let cell_size = self.config.cell_size;
        self.prey_grid
            .build(self.prey.iter().map(|a| a.position), cell_size);
        self.predator_grid
            .build(self.predators.iter().map(|a| a.position), cell_size);
    }

    /// Compute every prey's response against the frozen post-starvation state.
    ///
    /// Runs in parallel; random draws come from a ChaCha stream per prey index so the
    /// outcome does not depend on scheduling.
    fn step_prey_steering_phase(&mut self, environment: &Environment) -> Vec<PreySteering> {
        let tick_seed: u64 = self.rng.random();
        let prey = &self.prey;
        let predators = &self.predators;
        let prey_grid = &self.prey_grid;
        let predator_grid = &self.predator_grid;

        (0..prey.len())
            .into_par_iter()
            .map(|idx| {
                let agent = &prey[idx];
                let body = Body::from(agent);
                let flockmates = prey_grid
                    .query_neighborhood(agent.position)
                    .filter(|&other| other != idx)
                    .map(|other| &prey[other]);
                let threats: Vec<&Agent> = predator_grid
                    .query_neighborhood(agent.position)
                    .map(|other| &predators[other])
                    .collect();
                let mut rng = ChaCha12Rng::seed_from_u64(tick_seed);
                rng.set_stream(idx as u64);
                steering::prey_steering(&body, flockmates, &threats, environment, &mut rng)
            })
            .collect()
    }

    /// Apply prey responses in population order, then append this tick's offspring.
    fn step_prey_update_phase(&mut self, steering: Vec<PreySteering>, width: f64, height: f64) {
        let tunables = &self.config.tunables;
        let rng = &mut self.rng;
        let live = self.prey.len();
        let mut births = Vec::new();

        for (agent, response) in self.prey.iter_mut().zip(steering) {
            if response.food_areas_entered > 0 {
                agent.gain_energy(tunables.prey_energy_gain_rate * response.food_areas_entered as f64);
            }
            agent.velocity = response.velocity;
            agent.acceleration = response.acceleration;
            agent.integrate(width, height);

            agent.tick_reproduction_timer();
            if let Some(child) = agent.try_reproduce_prey(live + births.len(), tunables, rng) {
                births.push(child);
            }
        }

        self.events_last_tick.prey_births = births.len();
        self.prey.extend(births);
    }

    /// Hunt, move and feed each predator in order.
    ///
    /// Nearby prey come from the grid built at the start of the tick, but their
    /// positions are the ones prey just moved to. Prey eaten earlier in the phase are
    /// invisible to later predators; the eaten are compacted out at the end.
    fn step_predator_phase(&mut self, environment: &Environment, width: f64, height: f64) {
        let tunables = &self.config.tunables;
        let prey = &self.prey;
        let prey_grid = &self.prey_grid;
        let rng = &mut self.rng;
        let eaten = &mut self.eaten_buffer;
        let nearby = &mut self.neighbor_buffer;
        eaten.clear();
        eaten.resize(prey.len(), false);

        let live = self.predators.len();
        let mut births = Vec::new();
        let mut predations = 0;

        for predator in self.predators.iter_mut() {
            prey_grid.query_neighborhood_into(predator.position, nearby);
            nearby.retain(|&idx| !eaten[idx]);

            let body = Body::from(&*predator);
            let hunt = steering::predator_steering(
                &body,
                nearby.iter().map(|&idx| (idx, &prey[idx])),
                environment,
                rng,
            );
            predator.acceleration = hunt.force;
            predator.integrate(width, height);

            let position = predator.position;
            let reach = predator.traits().radius;
            let victim = nearby.iter().copied().find(|&idx| {
                let contact = reach + prey[idx].traits().radius;
                position.distance_squared(prey[idx].position) < contact * contact
            });
            let Some(victim) = victim else {
                continue;
            };

            eaten[victim] = true;
            predations += 1;
            predator.record_kill(tunables);
            if let Some(child) = predator.try_reproduce_predator(live + births.len(), tunables, rng) {
                births.push(child);
            }
        }

        self.events_last_tick.predations = predations;
        self.events_last_tick.predator_births = births.len();
        self.predators.extend(births);

        if predations > 0 {
            let eaten = &self.eaten_buffer;
            let mut idx = 0;
            self.prey.retain(|_| {
                let keep = !eaten[idx];
                idx += 1;
                keep
            });
        }
    }

    /// Advance one tick inside `width` x `height` using `environment`.
    ///
    /// Order: starvation, grid rebuild, prey (steer in parallel, then apply and
    /// breed), predators (hunt, move, eat, breed), bookkeeping.
    pub fn tick(&mut self, width: f64, height: f64, environment: &Environment) -> StepTimings {
        debug_assert!(
            width > 0.0 && height > 0.0,
            "world dimensions must be positive"
        );
        let total_start = Instant::now();
        self.tick_index = self.tick_index.saturating_add(1);
        self.events_last_tick = Default::default();

        self.step_starvation_phase();

        let t0 = Instant::now();
        self.step_grid_phase();
        let spatial_build_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        let steering = self.step_prey_steering_phase(environment);
        self.step_prey_update_phase(steering, width, height);
        let prey_update_us = t1.elapsed().as_micros() as u64;

        let t2 = Instant::now();
        self.step_predator_phase(environment, width, height);
        let predator_update_us = t2.elapsed().as_micros() as u64;

        self.total_events.accumulate(&self.events_last_tick);
        self.history
            .record(self.prey.len(), self.predators.len());
        if !self.events_last_tick.is_quiet() {
            debug!(
                tick = self.tick_index,
                prey = self.prey.len(),
                predators = self.predators.len(),
                events = ?self.events_last_tick,
                "population changed"
            );
        }

        StepTimings {
            spatial_build_us,
            prey_update_us,
            predator_update_us,
            total_us: total_start.elapsed().as_micros() as u64,
        }
    }

    /// Advance one tick using the world's own bounds and environment.
    pub fn step(&mut self) -> StepTimings {
        let environment = std::mem::take(&mut self.environment);
        let timings = self.tick(
            self.config.world_width,
            self.config.world_height,
            &environment,
        );
        self.environment = environment;
        timings
    }
}
