use crate::config::{RadiusRange, SimConfig};
use crate::vec2::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Solid disc both kinds steer around.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub position: Vec2,
    pub radius: f64,
}

/// Disc that feeds prey standing inside it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoodArea {
    pub position: Vec2,
    pub radius: f64,
}

/// Disc prey retreat into when threatened; predators are pushed away from it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HidingSpot {
    pub position: Vec2,
    pub radius: f64,
}

impl FoodArea {
    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance_squared(point) < self.radius * self.radius
    }
}

impl HidingSpot {
    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance_squared(point) < self.radius * self.radius
    }
}

/// Static features for one run. Built at init/reset and only read during ticks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub obstacles: Vec<Obstacle>,
    pub food_areas: Vec<FoodArea>,
    pub hiding_spots: Vec<HidingSpot>,
}

impl Environment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scatter features uniformly, keeping centres `feature_margin` away from the edges.
    pub fn generate<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Self {
        let mut place = |range: RadiusRange| {
            let position = Vec2::new(
                sample_span(rng, config.feature_margin, config.world_width - config.feature_margin),
                sample_span(
                    rng,
                    config.feature_margin,
                    config.world_height - config.feature_margin,
                ),
            );
            (position, sample_span(rng, range.min, range.max))
        };

        let obstacles = (0..config.obstacle_count)
            .map(|_| {
                let (position, radius) = place(config.obstacle_radius);
                Obstacle { position, radius }
            })
            .collect();
        let food_areas = (0..config.food_area_count)
            .map(|_| {
                let (position, radius) = place(config.food_area_radius);
                FoodArea { position, radius }
            })
            .collect();
        let hiding_spots = (0..config.hiding_spot_count)
            .map(|_| {
                let (position, radius) = place(config.hiding_spot_radius);
                HidingSpot { position, radius }
            })
            .collect();

        Self {
            obstacles,
            food_areas,
            hiding_spots,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.obstacles.len() + self.food_areas.len() + self.hiding_spots.len()
    }
}

fn sample_span<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.random_range(lo..=hi)
    } else {
        lo
    }
}
