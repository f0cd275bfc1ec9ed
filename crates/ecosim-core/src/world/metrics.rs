use super::World;
use crate::agent::{Agent, Species};
use crate::environment::Environment;
use crate::vec2::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Debug)]
pub struct StepTimings {
    pub spatial_build_us: u64,
    pub prey_update_us: u64,
    pub predator_update_us: u64,
    pub total_us: u64,
}

/// Births, deaths and kills, either for one tick or accumulated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickEvents {
    pub prey_births: usize,
    pub predator_births: usize,
    pub prey_starved: usize,
    pub predators_starved: usize,
    pub predations: usize,
}

impl TickEvents {
    pub(crate) fn accumulate(&mut self, other: &TickEvents) {
        self.prey_births += other.prey_births;
        self.predator_births += other.predator_births;
        self.prey_starved += other.prey_starved;
        self.predators_starved += other.predators_starved;
        self.predations += other.predations;
    }

    /// Difference against an earlier cumulative reading.
    pub(crate) fn since(&self, earlier: &TickEvents) -> TickEvents {
        TickEvents {
            prey_births: self.prey_births - earlier.prey_births,
            predator_births: self.predator_births - earlier.predator_births,
            prey_starved: self.prey_starved - earlier.prey_starved,
            predators_starved: self.predators_starved - earlier.predators_starved,
            predations: self.predations - earlier.predations,
        }
    }

    pub fn is_quiet(&self) -> bool {
        *self == TickEvents::default()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub tick: u64,
    pub prey_count: usize,
    pub predator_count: usize,
    pub prey_energy_mean: f64,
    pub predator_energy_mean: f64,
    pub prey_age_mean: f64,
    pub predator_age_mean: f64,
    pub events: TickEvents,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub steps: usize,
    pub sample_every: usize,
    pub final_prey_count: usize,
    pub final_predator_count: usize,
    pub samples: Vec<StepMetrics>,
    /// Events over the whole run.
    #[serde(default)]
    pub events: TickEvents,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PopulationStats {
    pub prey_count: usize,
    pub predator_count: usize,
    /// `None` while there are no predators.
    pub prey_predator_ratio: Option<f64>,
    pub prey_energy_mean: f64,
    pub predator_energy_mean: f64,
    pub prey_age_mean: f64,
    pub predator_age_mean: f64,
    pub total_events: TickEvents,
}

/// Rolling window of per-tick population counts.
#[derive(Clone, Debug)]
pub struct PopulationHistory {
    capacity: usize,
    prey: VecDeque<usize>,
    predators: VecDeque<usize>,
}

impl PopulationHistory {
    pub const DEFAULT_CAPACITY: usize = 500;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            prey: VecDeque::with_capacity(capacity),
            predators: VecDeque::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, prey: usize, predators: usize) {
        if self.prey.len() == self.capacity {
            self.prey.pop_front();
            self.predators.pop_front();
        }
        self.prey.push_back(prey);
        self.predators.push_back(predators);
    }

    pub fn len(&self) -> usize {
        self.prey.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prey.is_empty()
    }

    pub fn prey(&self) -> impl Iterator<Item = usize> + '_ {
        self.prey.iter().copied()
    }

    pub fn predators(&self) -> impl Iterator<Item = usize> + '_ {
        self.predators.iter().copied()
    }

    /// `(prey, predator)` change from the oldest to the newest sample; zero with
    /// fewer than two samples.
    pub fn trend(&self) -> (i64, i64) {
        fn delta(samples: &VecDeque<usize>) -> i64 {
            match (samples.front(), samples.back()) {
                (Some(&first), Some(&last)) if samples.len() > 1 => last as i64 - first as i64,
                _ => 0,
            }
        }
        (delta(&self.prey), delta(&self.predators))
    }
}

/// Read-only view of one agent for renderers and statistics.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AgentSnapshot {
    pub species: Species,
    pub color: [u8; 3],
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f64,
    pub energy: f64,
    pub age: u64,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        let traits = agent.traits();
        Self {
            species: agent.species(),
            color: traits.color,
            position: agent.position,
            velocity: agent.velocity,
            radius: traits.radius,
            energy: agent.energy,
            age: agent.age,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub world_width: f64,
    pub world_height: f64,
    pub prey: Vec<AgentSnapshot>,
    pub predators: Vec<AgentSnapshot>,
    pub environment: Environment,
}

fn energy_and_age_means(agents: &[Agent]) -> (f64, f64) {
    if agents.is_empty() {
        return (0.0, 0.0);
    }
    let n = agents.len() as f64;
    let energy = agents.iter().map(|a| a.energy).sum::<f64>() / n;
    let age = agents.iter().map(|a| a.age as f64).sum::<f64>() / n;
    (energy, age)
}

impl World {
    pub(crate) fn collect_step_metrics(&self) -> StepMetrics {
        let (prey_energy_mean, prey_age_mean) = energy_and_age_means(&self.prey);
        let (predator_energy_mean, predator_age_mean) = energy_and_age_means(&self.predators);
        StepMetrics {
            tick: self.tick_index,
            prey_count: self.prey.len(),
            predator_count: self.predators.len(),
            prey_energy_mean,
            predator_energy_mean,
            prey_age_mean,
            predator_age_mean,
            events: self.events_last_tick.clone(),
        }
    }

    pub fn population_stats(&self) -> PopulationStats {
        let (prey_energy_mean, prey_age_mean) = energy_and_age_means(&self.prey);
        let (predator_energy_mean, predator_age_mean) = energy_and_age_means(&self.predators);
        PopulationStats {
            prey_count: self.prey.len(),
            predator_count: self.predators.len(),
            prey_predator_ratio: (!self.predators.is_empty())
                .then(|| self.prey.len() as f64 / self.predators.len() as f64),
            prey_energy_mean,
            predator_energy_mean,
            prey_age_mean,
            predator_age_mean,
            total_events: self.total_events.clone(),
        }
    }

    /// Copy of everything a renderer needs for the current tick.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick_index,
            world_width: self.config.world_width,
            world_height: self.config.world_height,
            prey: self.prey.iter().map(AgentSnapshot::from).collect(),
            predators: self.predators.iter().map(AgentSnapshot::from).collect(),
            environment: self.environment.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_only_the_newest_samples() {
        let mut history = PopulationHistory::new(3);
        for n in 0..5 {
            history.record(n * 10, n);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.prey().collect::<Vec<_>>(), vec![20, 30, 40]);
        assert_eq!(history.predators().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(history.trend(), (20, 2));
    }

    #[test]
    fn trend_needs_two_samples() {
        let mut history = PopulationHistory::new(10);
        assert_eq!(history.trend(), (0, 0));
        history.record(5, 1);
        assert_eq!(history.trend(), (0, 0));
        history.record(2, 3);
        assert_eq!(history.trend(), (-3, 2));
    }

    #[test]
    fn events_accumulate_and_diff() {
        let mut total = TickEvents::default();
        let tick = TickEvents {
            prey_births: 2,
            predations: 1,
            ..TickEvents::default()
        };
        total.accumulate(&tick);
        let checkpoint = total.clone();
        total.accumulate(&tick);
        assert_eq!(total.prey_births, 4);
        assert_eq!(total.since(&checkpoint), tick);
        assert!(!tick.is_quiet());
        assert!(TickEvents::default().is_quiet());
    }
}
