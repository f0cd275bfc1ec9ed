pub mod lifecycle;
pub mod metrics;
#[cfg(test)]
mod tests;

pub use metrics::*;

use crate::agent::{Agent, Species, PREDATOR_TRAITS, PREY_TRAITS};
use crate::config::{SimConfig, SimConfigError, Tunables};
use crate::environment::Environment;
use crate::spatial::SpatialGrid;
use crate::vec2::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::{error::Error, fmt};
use tracing::{info, warn};

/// Population manager: both populations, their grids and the static environment.
pub struct World {
    pub(crate) prey: Vec<Agent>,
    pub(crate) predators: Vec<Agent>,
    pub(crate) environment: Environment,
    pub(crate) config: SimConfig,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) prey_grid: SpatialGrid,
    pub(crate) predator_grid: SpatialGrid,
    pub(crate) tick_index: u64,
    pub(crate) events_last_tick: TickEvents,
    pub(crate) total_events: TickEvents,
    pub(crate) history: PopulationHistory,

    // Scratch buffers reused across ticks
    pub(crate) eaten_buffer: Vec<bool>,
    pub(crate) neighbor_buffer: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
    WrongSpecies {
        expected: Species,
        index: usize,
    },
    PopulationOverCap {
        species: Species,
        max: usize,
        actual: usize,
    },
    InvalidEnergy {
        species: Species,
        index: usize,
        energy: f64,
    },
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
            WorldInitError::WrongSpecies { expected, index } => write!(
                f,
                "agent {index} is not a {expected:?} but was placed in that population"
            ),
            WorldInitError::PopulationOverCap {
                species,
                max,
                actual,
            } => write!(
                f,
                "{species:?} population ({actual}) exceeds its cap ({max})"
            ),
            WorldInitError::InvalidEnergy {
                species,
                index,
                energy,
            } => write!(
                f,
                "{species:?} {index} has energy {energy}, expected (0, {}]",
                species.traits().max_energy
            ),
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
        }
    }
}

impl Error for ExperimentError {}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    /// Build a freshly seeded world. Panics on an invalid config; see [`World::try_new`].
    pub fn new(config: SimConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Build a world with randomly placed features and agents, all drawn from `config.seed`.
    pub fn try_new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let mut rng = ChaCha12Rng::seed_from_u64(config.seed);
        let environment = Environment::generate(&config, &mut rng);
        let prey = (0..config.initial_prey)
            .map(|_| {
                let position = Self::random_position(&config, &mut rng);
                Agent::new_prey(position, &mut rng)
            })
            .collect();
        let predators = (0..config.initial_predators)
            .map(|_| {
                let position = Self::random_position(&config, &mut rng);
                Agent::new_predator(position, &mut rng)
            })
            .collect();
        Ok(Self::assemble(config, environment, prey, predators, rng))
    }

    /// Build a world around caller-supplied agents and features.
    ///
    /// Positions are wrapped into the world bounds. Population sizes are checked
    /// against the hard caps rather than `initial_prey`/`initial_predators`.
    pub fn with_populations(
        config: SimConfig,
        environment: Environment,
        prey: Vec<Agent>,
        predators: Vec<Agent>,
    ) -> Result<Self, WorldInitError> {
        config.validate()?;
        Self::check_population(&prey, Species::Prey, SimConfig::MAX_PREY)?;
        Self::check_population(&predators, Species::Predator, SimConfig::MAX_PREDATORS)?;
        let rng = ChaCha12Rng::seed_from_u64(config.seed);
        let mut world = Self::assemble(config, environment, prey, predators, rng);
        world.wrap_positions();
        Ok(world)
    }

    fn check_population(
        agents: &[Agent],
        species: Species,
        max: usize,
    ) -> Result<(), WorldInitError> {
        if let Some(index) = agents.iter().position(|a| a.species() != species) {
            return Err(WorldInitError::WrongSpecies {
                expected: species,
                index,
            });
        }
        if agents.len() > max {
            return Err(WorldInitError::PopulationOverCap {
                species,
                max,
                actual: agents.len(),
            });
        }
        let max_energy = species.traits().max_energy;
        if let Some(index) = agents
            .iter()
            .position(|a| !(a.energy > 0.0 && a.energy <= max_energy))
        {
            return Err(WorldInitError::InvalidEnergy {
                species,
                index,
                energy: agents[index].energy,
            });
        }
        Ok(())
    }

    fn assemble(
        config: SimConfig,
        environment: Environment,
        prey: Vec<Agent>,
        predators: Vec<Agent>,
        rng: ChaCha12Rng,
    ) -> Self {
        Self::check_cell_size(&config);
        info!(
            seed = config.seed,
            prey = prey.len(),
            predators = predators.len(),
            features = environment.feature_count(),
            "world initialised"
        );
        let cell_size = config.cell_size;
        Self {
            prey,
            predators,
            environment,
            config,
            rng,
            prey_grid: SpatialGrid::new(cell_size),
            predator_grid: SpatialGrid::new(cell_size),
            tick_index: 0,
            events_last_tick: TickEvents::default(),
            total_events: TickEvents::default(),
            history: PopulationHistory::new(PopulationHistory::DEFAULT_CAPACITY),
            eaten_buffer: Vec::new(),
            neighbor_buffer: Vec::new(),
        }
    }

    /// Warn when the 3x3 neighbourhood can no longer cover the perception radius.
    /// Returns whether the cell size is large enough.
    fn check_cell_size(config: &SimConfig) -> bool {
        let perception_radius = PREY_TRAITS
            .perception_radius
            .max(PREDATOR_TRAITS.perception_radius);
        if config.cell_size < perception_radius {
            warn!(
                cell_size = config.cell_size,
                perception_radius,
                "grid cells smaller than the perception radius will miss neighbours"
            );
            return false;
        }
        true
    }

    fn random_position<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Vec2 {
        Vec2::new(
            rng.random_range(0.0..config.world_width),
            rng.random_range(0.0..config.world_height),
        )
    }

    fn wrap_positions(&mut self) {
        let (w, h) = (self.config.world_width, self.config.world_height);
        for agent in self.prey.iter_mut().chain(self.predators.iter_mut()) {
            agent.position = agent.position.wrap(w, h);
        }
    }

    /// Replace every agent, feature, counter and history sample with a fresh world
    /// built from `config`. On error the current state is left untouched.
    pub fn reset(&mut self, config: SimConfig) -> Result<(), WorldInitError> {
        let fresh = Self::try_new(config)?;
        *self = fresh;
        info!("world reset");
        Ok(())
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Swap in a new config for subsequent ticks. Populations and features are kept;
    /// positions are re-wrapped if the world shrank.
    pub fn set_config(&mut self, config: SimConfig) -> Result<(), WorldInitError> {
        config.validate()?;
        if config.cell_size != self.config.cell_size {
            Self::check_cell_size(&config);
        }
        let resized = config.world_width != self.config.world_width
            || config.world_height != self.config.world_height;
        self.config = config;
        if resized {
            self.wrap_positions();
        }
        Ok(())
    }

    pub fn tunables(&self) -> &Tunables {
        &self.config.tunables
    }

    /// Replace the tunable rates; the very next tick uses them.
    pub fn set_tunables(&mut self, tunables: Tunables) -> Result<(), SimConfigError> {
        tunables.validate()?;
        self.config.tunables = tunables;
        Ok(())
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn prey(&self) -> &[Agent] {
        &self.prey
    }

    pub fn predators(&self) -> &[Agent] {
        &self.predators
    }

    pub fn prey_count(&self) -> usize {
        self.prey.len()
    }

    pub fn predator_count(&self) -> usize {
        self.predators.len()
    }

    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    pub fn events_last_tick(&self) -> &TickEvents {
        &self.events_last_tick
    }

    pub fn total_events(&self) -> &TickEvents {
        &self.total_events
    }

    pub fn history(&self) -> &PopulationHistory {
        &self.history
    }

    pub fn run_experiment(&mut self, steps: usize, sample_every: usize) -> RunSummary {
        self.try_run_experiment(steps, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        let totals_before = self.total_events.clone();
        let mut samples = Vec::with_capacity(estimated_samples);
        for step in 1..=steps {
            self.step();
            if step % sample_every == 0 || step == steps {
                samples.push(self.collect_step_metrics());
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            steps,
            sample_every,
            final_prey_count: self.prey.len(),
            final_predator_count: self.predators.len(),
            samples,
            events: self.total_events.since(&totals_before),
        })
    }
}
