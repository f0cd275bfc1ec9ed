use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Runtime-tunable rates and thresholds. The control layer may swap these between
/// ticks; the next tick uses the new values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Energy lost by every prey each tick.
    pub prey_energy_decay_rate: f64,
    /// Energy gained per tick for each food area a prey stands in.
    pub prey_energy_gain_rate: f64,
    /// Ticks between prey reproduction attempts.
    pub prey_reproduction_interval: u32,
    /// Energy a prey parent pays; the child starts with half.
    pub prey_reproduction_energy_cost: f64,
    /// Energy lost by every predator each tick.
    pub predator_energy_decay_rate: f64,
    /// Energy gained per prey eaten.
    pub predator_energy_gain_from_prey: f64,
    /// Kills needed before a predator may reproduce.
    pub predator_reproduction_threshold: u32,
    /// Energy a predator parent pays; the child starts with half. Reproduction also
    /// requires energy above 1.2x this cost.
    pub predator_reproduction_energy_cost: f64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            prey_energy_decay_rate: 0.01,
            prey_energy_gain_rate: 0.15,
            prey_reproduction_interval: 400,
            prey_reproduction_energy_cost: 75.0,
            predator_energy_decay_rate: 0.015,
            predator_energy_gain_from_prey: 40.0,
            predator_reproduction_threshold: 6,
            predator_reproduction_energy_cost: 120.0,
        }
    }
}

impl Tunables {
    pub fn validate(&self) -> Result<(), SimConfigError> {
        let rates = [
            ("prey_energy_decay_rate", self.prey_energy_decay_rate),
            ("prey_energy_gain_rate", self.prey_energy_gain_rate),
            (
                "prey_reproduction_energy_cost",
                self.prey_reproduction_energy_cost,
            ),
            ("predator_energy_decay_rate", self.predator_energy_decay_rate),
            (
                "predator_energy_gain_from_prey",
                self.predator_energy_gain_from_prey,
            ),
            (
                "predator_reproduction_energy_cost",
                self.predator_reproduction_energy_cost,
            ),
        ];
        for (name, value) in rates {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimConfigError::InvalidRate { name, value });
            }
        }
        Ok(())
    }
}

/// Inclusive radius bounds for randomly placed environment features.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadiusRange {
    pub min: f64,
    pub max: f64,
}

impl RadiusRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Width of the toroidal world in world units.
    pub world_width: f64,
    /// Height of the toroidal world in world units.
    pub world_height: f64,
    /// Edge length of a spatial grid cell. Should be at least the perception radius.
    pub cell_size: f64,
    pub initial_prey: usize,
    pub initial_predators: usize,
    pub obstacle_count: usize,
    pub food_area_count: usize,
    pub hiding_spot_count: usize,
    /// Minimum distance between a feature centre and the world edge.
    pub feature_margin: f64,
    pub obstacle_radius: RadiusRange,
    pub food_area_radius: RadiusRange,
    pub hiding_spot_radius: RadiusRange,
    pub tunables: Tunables,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            world_width: 900.0,
            world_height: 600.0,
            cell_size: 50.0,
            initial_prey: 100,
            initial_predators: 3,
            obstacle_count: 5,
            food_area_count: 3,
            hiding_spot_count: 3,
            feature_margin: 50.0,
            obstacle_radius: RadiusRange::new(20.0, 40.0),
            food_area_radius: RadiusRange::new(50.0, 80.0),
            hiding_spot_radius: RadiusRange::new(30.0, 60.0),
            tunables: Tunables::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimConfigError {
    InvalidWorldSize { width: f64, height: f64 },
    InvalidCellSize(f64),
    InvalidFeatureMargin(f64),
    InvalidRadiusRange { feature: &'static str, range: RadiusRange },
    TooManyPrey { max: usize, actual: usize },
    TooManyPredators { max: usize, actual: usize },
    InvalidRate { name: &'static str, value: f64 },
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimConfigError::InvalidWorldSize { width, height } => write!(
                f,
                "world dimensions must be positive and finite (got {width} x {height})"
            ),
            SimConfigError::InvalidCellSize(size) => {
                write!(f, "cell_size must be positive and finite (got {size})")
            }
            SimConfigError::InvalidFeatureMargin(margin) => write!(
                f,
                "feature_margin ({margin}) must be non-negative and leave room inside the world"
            ),
            SimConfigError::InvalidRadiusRange { feature, range } => write!(
                f,
                "{feature} radius range [{}, {}] must satisfy 0 <= min <= max",
                range.min, range.max
            ),
            SimConfigError::TooManyPrey { max, actual } => {
                write!(f, "initial_prey ({actual}) exceeds population cap ({max})")
            }
            SimConfigError::TooManyPredators { max, actual } => {
                write!(
                    f,
                    "initial_predators ({actual}) exceeds population cap ({max})"
                )
            }
            SimConfigError::InvalidRate { name, value } => {
                write!(f, "{name} must be non-negative and finite (got {value})")
            }
        }
    }
}

impl Error for SimConfigError {}

impl SimConfig {
    /// Hard ceiling on the prey population; reproduction past it is a no-op.
    pub const MAX_PREY: usize = 150;
    /// Hard ceiling on the predator population.
    pub const MAX_PREDATORS: usize = 15;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        let dims_ok = self.world_width.is_finite()
            && self.world_height.is_finite()
            && self.world_width > 0.0
            && self.world_height > 0.0;
        if !dims_ok {
            return Err(SimConfigError::InvalidWorldSize {
                width: self.world_width,
                height: self.world_height,
            });
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(SimConfigError::InvalidCellSize(self.cell_size));
        }
        if !(self.feature_margin.is_finite()
            && self.feature_margin >= 0.0
            && self.feature_margin * 2.0 <= self.world_width
            && self.feature_margin * 2.0 <= self.world_height)
        {
            return Err(SimConfigError::InvalidFeatureMargin(self.feature_margin));
        }
        for (feature, range) in [
            ("obstacle", self.obstacle_radius),
            ("food area", self.food_area_radius),
            ("hiding spot", self.hiding_spot_radius),
        ] {
            if !range.is_valid() {
                return Err(SimConfigError::InvalidRadiusRange { feature, range });
            }
        }
        if self.initial_prey > Self::MAX_PREY {
            return Err(SimConfigError::TooManyPrey {
                max: Self::MAX_PREY,
                actual: self.initial_prey,
            });
        }
        if self.initial_predators > Self::MAX_PREDATORS {
            return Err(SimConfigError::TooManyPredators {
                max: Self::MAX_PREDATORS,
                actual: self.initial_predators,
            });
        }
        self.tunables.validate()
    }

    /// Parse a JSON config; missing fields fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
