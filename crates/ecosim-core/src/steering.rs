//! Steering behaviours.
//!
//! Every function here is pure: it reads a [`Body`] plus whatever it reacts to and
//! returns a force. Individual behaviours clamp their own output to `max_force`;
//! the prey blend clamps the weighted sum a second time.

use crate::agent::{Agent, KindTraits};
use crate::environment::{Environment, FoodArea, HidingSpot, Obstacle};
use crate::vec2::Vec2;
use rand::Rng;

pub const FLOCK_WEIGHT: f64 = 0.3;
pub const EVADE_WEIGHT: f64 = 2.5;
pub const AVOID_WEIGHT: f64 = 1.2;
pub const FOOD_WEIGHT: f64 = 0.5;
pub const HIDING_WEIGHT: f64 = 0.7;

pub const ALIGNMENT_WEIGHT: f64 = 0.5;
pub const COHESION_WEIGHT: f64 = 0.3;
pub const SEPARATION_WEIGHT: f64 = 0.5;

/// Clearance added to obstacle + agent radius before avoidance kicks in.
pub const OBSTACLE_SAFETY_MARGIN: f64 = 10.0;
/// Velocity multiplier applied per (hiding spot, threat) pair.
pub const HIDING_VELOCITY_DAMPING: f64 = 0.8;

pub const HUNT_WEIGHT: f64 = 0.8;
/// Wander force as a fraction of `max_force`.
pub const WANDER_FORCE_FRACTION: f64 = 0.5;
/// Predators feel hiding spots out to this multiple of the spot radius.
pub const HIDING_REPULSION_RANGE: f64 = 1.5;
pub const HIDING_REPULSION_FORCE_FRACTION: f64 = 0.3;
/// Single-obstacle avoidance force as a multiple of `max_force`.
pub const OBSTACLE_FORCE_FACTOR: f64 = 2.0;

/// Kinematic view of an agent for force computation.
#[derive(Clone, Copy, Debug)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub traits: &'static KindTraits,
}

impl From<&Agent> for Body {
    fn from(agent: &Agent) -> Self {
        Self {
            position: agent.position,
            velocity: agent.velocity,
            traits: agent.traits(),
        }
    }
}

impl Body {
    pub fn limit_force(&self, force: Vec2) -> Vec2 {
        force.clamp_length(self.traits.max_force)
    }

    /// Desired velocity toward `target` at full speed, minus current velocity.
    pub fn seek(&self, target: Vec2) -> Vec2 {
        let desired = target - self.position;
        if desired.length_squared() > 0.0 {
            self.limit_force(desired.scale_to_length(self.traits.max_speed) - self.velocity)
        } else {
            Vec2::ZERO
        }
    }

    /// Steer so velocity points along `direction` at full speed. Zero direction
    /// yields a pure braking force.
    fn steer_along(&self, direction: Vec2) -> Vec2 {
        direction.scale_to_length(self.traits.max_speed) - self.velocity
    }

    fn perceives(&self, other: Vec2) -> bool {
        self.position.distance_squared(other) < self.traits.perception_radius_sq
    }
}

/// Alignment, cohesion and separation against flockmates within perception range.
///
/// `neighbors` must not contain the agent itself. Coincident neighbours count toward
/// the averages but not toward separation.
pub fn flock<'a, I>(body: &Body, neighbors: I) -> Vec2
where
    I: IntoIterator<Item = &'a Agent>,
{
    let mut velocity_sum = Vec2::ZERO;
    let mut position_sum = Vec2::ZERO;
    let mut separation_sum = Vec2::ZERO;
    let mut total = 0usize;

    for other in neighbors {
        let away = body.position - other.position;
        let dist_sq = away.length_squared();
        if dist_sq >= body.traits.perception_radius_sq {
            continue;
        }
        if dist_sq > 0.0 {
            // unit vector scaled by 1/d
            separation_sum += away / dist_sq;
        }
        velocity_sum += other.velocity;
        position_sum += other.position;
        total += 1;
    }

    if total == 0 {
        return Vec2::ZERO;
    }
    let n = total as f64;
    let alignment = body.steer_along(velocity_sum / n);
    let cohesion = body.steer_along(position_sum / n - body.position);
    let separation = body.steer_along(separation_sum / n);
    body.limit_force(
        alignment * ALIGNMENT_WEIGHT + cohesion * COHESION_WEIGHT + separation * SEPARATION_WEIGHT,
    )
}

/// Flee every predator inside perception range.
pub fn evade<'a, I, R>(body: &Body, predators: I, rng: &mut R) -> Vec2
where
    I: IntoIterator<Item = &'a Agent>,
    R: Rng + ?Sized,
{
    let mut force = Vec2::ZERO;
    for predator in predators {
        let away = body.position - predator.position;
        if away.length_squared() >= body.traits.perception_radius_sq {
            continue;
        }
        let direction = match away.try_normalize() {
            Some(direction) => direction,
            None => Vec2::random_unit(rng),
        };
        force += direction * body.traits.max_speed;
    }
    body.limit_force(force)
}

fn obstacle_clearance_sq(body: &Body, obstacle: &Obstacle) -> f64 {
    let reach = obstacle.radius + body.traits.radius + OBSTACLE_SAFETY_MARGIN;
    reach * reach
}

/// Aggregate obstacle avoidance for prey: speed-scaled push per nearby obstacle,
/// summed then clamped.
pub fn avoid_obstacles(body: &Body, obstacles: &[Obstacle]) -> Vec2 {
    let mut force = Vec2::ZERO;
    for obstacle in obstacles {
        let away = body.position - obstacle.position;
        if away.length_squared() < obstacle_clearance_sq(body, obstacle) {
            if let Some(direction) = away.try_normalize() {
                force += direction * body.traits.max_speed;
            }
        }
    }
    body.limit_force(force)
}

/// Single-obstacle avoidance used by predators: a fixed push of twice `max_force`,
/// not clamped.
pub fn avoid_obstacle(body: &Body, obstacle: &Obstacle) -> Vec2 {
    let away = body.position - obstacle.position;
    if away.length_squared() < obstacle_clearance_sq(body, obstacle) {
        away.scale_to_length(body.traits.max_force * OBSTACLE_FORCE_FACTOR)
    } else {
        Vec2::ZERO
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FoodSeeking {
    pub force: Vec2,
    /// Number of food areas the agent is inside; each grants one energy gain.
    pub areas_entered: usize,
}

pub fn seek_food(body: &Body, food_areas: &[FoodArea]) -> FoodSeeking {
    let mut force = Vec2::ZERO;
    let mut areas_entered = 0;
    for area in food_areas.iter().filter(|a| a.contains(body.position)) {
        force += body.seek(area.position);
        areas_entered += 1;
    }
    FoodSeeking {
        force: body.limit_force(force),
        areas_entered,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hiding {
    pub force: Vec2,
    /// Velocity after damping; equals the input velocity when nothing qualified.
    pub velocity: Vec2,
}

/// Seek cover while threatened.
///
/// Each (spot, predator) pair where the predator is perceived and the agent is inside
/// the spot adds a seek toward the spot and damps velocity. Later seeks see the
/// already-damped velocity.
pub fn use_hiding_spots(body: &Body, spots: &[HidingSpot], predators: &[&Agent]) -> Hiding {
    let mut local = *body;
    let mut force = Vec2::ZERO;
    for spot in spots {
        for predator in predators {
            if local.perceives(predator.position) && spot.contains(local.position) {
                force += local.seek(spot.position);
                local.velocity *= HIDING_VELOCITY_DAMPING;
            }
        }
    }
    Hiding {
        force: body.limit_force(force),
        velocity: local.velocity,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hunt {
    pub force: Vec2,
    /// Caller-supplied id of the chased prey, `None` when wandering.
    pub target: Option<usize>,
}

/// Chase the closest prey strictly inside perception range; ties go to the first seen.
/// With nothing in range, wander in a random direction at half `max_force`.
pub fn hunt<'a, I, R>(body: &Body, prey: I, rng: &mut R) -> Hunt
where
    I: IntoIterator<Item = (usize, &'a Agent)>,
    R: Rng + ?Sized,
{
    let mut closest: Option<(usize, Vec2)> = None;
    let mut closest_dist_sq = f64::INFINITY;
    for (id, candidate) in prey {
        let dist_sq = body.position.distance_squared(candidate.position);
        if dist_sq < closest_dist_sq && dist_sq < body.traits.perception_radius_sq {
            closest = Some((id, candidate.position));
            closest_dist_sq = dist_sq;
        }
    }
    match closest {
        Some((id, target)) => Hunt {
            force: body.seek(target) * HUNT_WEIGHT,
            target: Some(id),
        },
        None => Hunt {
            force: Vec2::random_unit(rng) * (body.traits.max_force * WANDER_FORCE_FRACTION),
            target: None,
        },
    }
}

/// Mild push away from hiding spots within 1.5x their radius.
pub fn repel_from_hiding_spots(body: &Body, spots: &[HidingSpot]) -> Vec2 {
    let mut force = Vec2::ZERO;
    for spot in spots {
        let away = body.position - spot.position;
        let range = spot.radius * HIDING_REPULSION_RANGE;
        if away.length_squared() < range * range {
            force += away.scale_to_length(body.traits.max_force * HIDING_REPULSION_FORCE_FRACTION);
        }
    }
    force
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreySteering {
    pub acceleration: Vec2,
    pub velocity: Vec2,
    pub food_areas_entered: usize,
}

/// Full prey response for one tick: the weighted blend, clamped once more.
pub fn prey_steering<'a, I, R>(
    body: &Body,
    flockmates: I,
    predators: &[&Agent],
    environment: &Environment,
    rng: &mut R,
) -> PreySteering
where
    I: IntoIterator<Item = &'a Agent>,
    R: Rng + ?Sized,
{
    let flocking = flock(body, flockmates);
    let evasion = evade(body, predators.iter().copied(), rng);
    let avoidance = avoid_obstacles(body, &environment.obstacles);
    let food = seek_food(body, &environment.food_areas);
    let hiding = use_hiding_spots(body, &environment.hiding_spots, predators);

    let blended = flocking * FLOCK_WEIGHT
        + evasion * EVADE_WEIGHT
        + avoidance * AVOID_WEIGHT
        + food.force * FOOD_WEIGHT
        + hiding.force * HIDING_WEIGHT;
    PreySteering {
        acceleration: body.limit_force(blended),
        velocity: hiding.velocity,
        food_areas_entered: food.areas_entered,
    }
}

/// Full predator response: hunt or wander, then obstacle and hiding-spot pushes.
/// The sum is not clamped.
pub fn predator_steering<'a, I, R>(
    body: &Body,
    prey: I,
    environment: &Environment,
    rng: &mut R,
) -> Hunt
where
    I: IntoIterator<Item = (usize, &'a Agent)>,
    R: Rng + ?Sized,
{
    let mut hunt = hunt(body, prey, rng);
    for obstacle in &environment.obstacles {
        hunt.force += avoid_obstacle(body, obstacle);
    }
    hunt.force += repel_from_hiding_spots(body, &environment.hiding_spots);
    hunt
}
