use crate::config::{SimConfig, Tunables};
use crate::vec2::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-kind physical constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KindTraits {
    pub max_speed: f64,
    pub max_speed_sq: f64,
    pub max_force: f64,
    pub perception_radius: f64,
    pub perception_radius_sq: f64,
    pub radius: f64,
    pub initial_energy: f64,
    pub max_energy: f64,
    /// RGB tag for renderers.
    pub color: [u8; 3],
}

pub const PREY_TRAITS: KindTraits = KindTraits {
    max_speed: 2.0,
    max_speed_sq: 4.0,
    max_force: 0.05,
    perception_radius: 75.0,
    perception_radius_sq: 5625.0,
    radius: 5.0,
    initial_energy: 150.0,
    max_energy: 300.0,
    color: [46, 139, 87],
};

pub const PREDATOR_TRAITS: KindTraits = KindTraits {
    max_speed: 1.8,
    max_speed_sq: 1.8 * 1.8,
    max_force: 0.05,
    perception_radius: 75.0,
    perception_radius_sq: 5625.0,
    radius: 5.0,
    initial_energy: 150.0,
    max_energy: 300.0,
    color: [178, 34, 34],
};

/// Predators need this multiple of their reproduction cost in reserve before breeding.
pub const PREDATOR_REPRODUCTION_RESERVE: f64 = 1.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Prey,
    Predator,
}

impl Species {
    pub const fn traits(self) -> &'static KindTraits {
        match self {
            Species::Prey => &PREY_TRAITS,
            Species::Predator => &PREDATOR_TRAITS,
        }
    }
}

/// Kind tag plus the state only that kind carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
    Prey { reproduction_timer: u32 },
    Predator { prey_eaten: u32 },
}

impl AgentKind {
    pub const fn species(&self) -> Species {
        match self {
            AgentKind::Prey { .. } => Species::Prey,
            AgentKind::Predator { .. } => Species::Predator,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Per-tick force accumulator, zeroed by [`Agent::integrate`].
    pub acceleration: Vec2,
    pub energy: f64,
    pub age: u64,
    pub kind: AgentKind,
}

impl Agent {
    fn spawn<R: Rng + ?Sized>(kind: AgentKind, position: Vec2, energy: f64, rng: &mut R) -> Self {
        Self {
            position,
            velocity: Vec2::random_unit(rng),
            acceleration: Vec2::ZERO,
            energy,
            age: 0,
            kind,
        }
    }

    pub fn new_prey<R: Rng + ?Sized>(position: Vec2, rng: &mut R) -> Self {
        Self::spawn(
            AgentKind::Prey {
                reproduction_timer: 0,
            },
            position,
            PREY_TRAITS.initial_energy,
            rng,
        )
    }

    pub fn new_predator<R: Rng + ?Sized>(position: Vec2, rng: &mut R) -> Self {
        Self::spawn(
            AgentKind::Predator { prey_eaten: 0 },
            position,
            PREDATOR_TRAITS.initial_energy,
            rng,
        )
    }

    pub fn species(&self) -> Species {
        self.kind.species()
    }

    pub fn traits(&self) -> &'static KindTraits {
        self.species().traits()
    }

    pub fn is_alive(&self) -> bool {
        self.energy > 0.0
    }

    pub fn reproduction_timer(&self) -> Option<u32> {
        match self.kind {
            AgentKind::Prey { reproduction_timer } => Some(reproduction_timer),
            AgentKind::Predator { .. } => None,
        }
    }

    pub fn prey_eaten(&self) -> Option<u32> {
        match self.kind {
            AgentKind::Predator { prey_eaten } => Some(prey_eaten),
            AgentKind::Prey { .. } => None,
        }
    }

    /// Subtract this kind's per-tick decay. Returns `false` once the agent has starved.
    pub fn decay_energy(&mut self, tunables: &Tunables) -> bool {
        let rate = match self.kind {
            AgentKind::Prey { .. } => tunables.prey_energy_decay_rate,
            AgentKind::Predator { .. } => tunables.predator_energy_decay_rate,
        };
        self.energy -= rate;
        if self.energy <= 0.0 {
            self.energy = 0.0;
            return false;
        }
        true
    }

    /// Add energy, saturating at this kind's maximum.
    pub fn gain_energy(&mut self, amount: f64) {
        self.energy = (self.energy + amount).min(self.traits().max_energy);
    }

    /// Integrate one tick: apply acceleration, clamp speed, move, wrap, age.
    pub fn integrate(&mut self, width: f64, height: f64) {
        let traits = self.traits();
        self.velocity += self.acceleration;
        let speed_sq = self.velocity.length_squared();
        if speed_sq > traits.max_speed_sq {
            self.velocity *= traits.max_speed / speed_sq.sqrt();
        }
        self.position = (self.position + self.velocity).wrap(width, height);
        self.acceleration = Vec2::ZERO;
        self.age += 1;
    }

    /// Advance the prey reproduction clock by one tick.
    pub fn tick_reproduction_timer(&mut self) {
        if let AgentKind::Prey { reproduction_timer } = &mut self.kind {
            *reproduction_timer = reproduction_timer.saturating_add(1);
        }
    }

    /// Prey breeding rule, evaluated after the timer tick.
    ///
    /// Once the interval has elapsed and energy exceeds the cost the timer resets,
    /// whether or not a child is produced. The parent only pays when `population`
    /// (live prey plus births already made this tick) is under the cap.
    pub fn try_reproduce_prey<R: Rng + ?Sized>(
        &mut self,
        population: usize,
        tunables: &Tunables,
        rng: &mut R,
    ) -> Option<Agent> {
        let AgentKind::Prey { reproduction_timer } = &mut self.kind else {
            return None;
        };
        let cost = tunables.prey_reproduction_energy_cost;
        if *reproduction_timer < tunables.prey_reproduction_interval || self.energy <= cost {
            return None;
        }
        *reproduction_timer = 0;
        if population >= SimConfig::MAX_PREY {
            return None;
        }
        self.energy -= cost;
        let mut child = Agent::new_prey(self.position, rng);
        child.energy = cost / 2.0;
        Some(child)
    }

    /// Record a kill: bump the counter and take the energy reward.
    pub fn record_kill(&mut self, tunables: &Tunables) {
        if let AgentKind::Predator { prey_eaten } = &mut self.kind {
            *prey_eaten = prey_eaten.saturating_add(1);
            self.gain_energy(tunables.predator_energy_gain_from_prey);
        }
    }

    /// Predator breeding rule, evaluated right after a kill.
    ///
    /// An attempt needs `prey_eaten >= threshold` and energy above the reserve. Every
    /// attempt clears `prey_eaten`; the parent only pays when under the cap.
    pub fn try_reproduce_predator<R: Rng + ?Sized>(
        &mut self,
        population: usize,
        tunables: &Tunables,
        rng: &mut R,
    ) -> Option<Agent> {
        let AgentKind::Predator { prey_eaten } = &mut self.kind else {
            return None;
        };
        let cost = tunables.predator_reproduction_energy_cost;
        if *prey_eaten < tunables.predator_reproduction_threshold
            || self.energy <= cost * PREDATOR_REPRODUCTION_RESERVE
        {
            return None;
        }
        *prey_eaten = 0;
        if population >= SimConfig::MAX_PREDATORS {
            return None;
        }
        self.energy -= cost;
        let mut child = Agent::new_predator(self.position, rng);
        child.energy = cost / 2.0;
        Some(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn rng() -> ChaCha12Rng {
        ChaCha12Rng::seed_from_u64(11)
    }

    fn prey_with(timer: u32, energy: f64) -> Agent {
        let mut prey = Agent::new_prey(Vec2::new(100.0, 100.0), &mut rng());
        prey.kind = AgentKind::Prey {
            reproduction_timer: timer,
        };
        prey.energy = energy;
        prey
    }

    fn predator_with(eaten: u32, energy: f64) -> Agent {
        let mut predator = Agent::new_predator(Vec2::new(10.0, 20.0), &mut rng());
        predator.kind = AgentKind::Predator { prey_eaten: eaten };
        predator.energy = energy;
        predator
    }

    #[test]
    fn spawned_agents_start_with_kind_defaults() {
        let mut r = rng();
        let prey = Agent::new_prey(Vec2::new(1.0, 2.0), &mut r);
        assert_eq!(prey.energy, 150.0);
        assert_eq!(prey.reproduction_timer(), Some(0));
        assert!((prey.velocity.length() - 1.0).abs() < 1e-12);

        let predator = Agent::new_predator(Vec2::new(1.0, 2.0), &mut r);
        assert_eq!(predator.species(), Species::Predator);
        assert_eq!(predator.prey_eaten(), Some(0));
        assert_eq!(predator.traits().max_speed, 1.8);
    }

    #[test]
    fn integrate_clamps_speed_and_wraps() {
        let mut agent = prey_with(0, 100.0);
        agent.position = Vec2::new(899.5, 0.5);
        agent.velocity = Vec2::new(2.0, -2.0);
        agent.acceleration = Vec2::new(1.0, -1.0);
        agent.integrate(900.0, 600.0);

        assert!(agent.velocity.length_squared() <= PREY_TRAITS.max_speed_sq + 1e-9);
        assert!(agent.position.x >= 0.0 && agent.position.x < 900.0);
        assert!(agent.position.y >= 0.0 && agent.position.y < 600.0);
        assert_eq!(agent.acceleration, Vec2::ZERO);
        assert_eq!(agent.age, 1);
    }

    #[test]
    fn integrate_leaves_slow_velocity_untouched() {
        let mut agent = predator_with(0, 100.0);
        agent.position = Vec2::new(50.0, 50.0);
        agent.velocity = Vec2::new(0.5, 0.0);
        agent.acceleration = Vec2::new(0.0, 0.25);
        agent.integrate(900.0, 600.0);
        assert_eq!(agent.velocity, Vec2::new(0.5, 0.25));
        assert_eq!(agent.position, Vec2::new(50.5, 50.25));
    }

    #[test]
    fn decay_reports_starvation() {
        let tunables = Tunables::default();
        let mut prey = prey_with(0, 0.015);
        assert!(prey.decay_energy(&tunables));
        assert!(!prey.decay_energy(&tunables));
        assert_eq!(prey.energy, 0.0);
        assert!(!prey.is_alive());
    }

    #[test]
    fn prey_reproduction_splits_energy() {
        let tunables = Tunables::default();
        let mut parent = prey_with(400, 100.0);
        let child = parent
            .try_reproduce_prey(10, &tunables, &mut rng())
            .expect("eligible prey should reproduce");
        assert_eq!(child.energy, 37.5);
        assert_eq!(child.position, parent.position);
        assert_eq!(child.reproduction_timer(), Some(0));
        assert_eq!(parent.energy, 25.0);
        assert_eq!(parent.reproduction_timer(), Some(0));
    }

    #[test]
    fn prey_at_cap_resets_timer_without_paying() {
        let tunables = Tunables::default();
        let mut parent = prey_with(400, 100.0);
        assert!(parent
            .try_reproduce_prey(SimConfig::MAX_PREY, &tunables, &mut rng())
            .is_none());
        assert_eq!(parent.energy, 100.0);
        assert_eq!(parent.reproduction_timer(), Some(0));
    }

    #[test]
    fn prey_below_threshold_keeps_its_timer() {
        let tunables = Tunables::default();
        let mut young = prey_with(399, 100.0);
        assert!(young.try_reproduce_prey(10, &tunables, &mut rng()).is_none());
        assert_eq!(young.reproduction_timer(), Some(399));

        let mut hungry = prey_with(400, 75.0);
        assert!(hungry.try_reproduce_prey(10, &tunables, &mut rng()).is_none());
        assert_eq!(hungry.reproduction_timer(), Some(400));
    }

    #[test]
    fn kill_reward_saturates_at_max_energy() {
        let tunables = Tunables::default();
        let mut predator = predator_with(0, 280.0);
        predator.record_kill(&tunables);
        assert_eq!(predator.energy, 300.0);
        assert_eq!(predator.prey_eaten(), Some(1));
    }

    #[test]
    fn predator_reproduction_clears_counter() {
        let tunables = Tunables::default();
        let mut parent = predator_with(6, 200.0);
        let child = parent
            .try_reproduce_predator(3, &tunables, &mut rng())
            .expect("eligible predator should reproduce");
        assert_eq!(child.energy, 60.0);
        assert_eq!(parent.energy, 80.0);
        assert_eq!(parent.prey_eaten(), Some(0));
    }

    #[test]
    fn predator_needs_energy_reserve() {
        let tunables = Tunables::default();
        let mut parent = predator_with(6, 144.0);
        assert!(parent
            .try_reproduce_predator(3, &tunables, &mut rng())
            .is_none());
        assert_eq!(parent.prey_eaten(), Some(6));
    }

    #[test]
    fn predator_at_cap_clears_counter_without_paying() {
        let tunables = Tunables::default();
        let mut parent = predator_with(7, 200.0);
        assert!(parent
            .try_reproduce_predator(SimConfig::MAX_PREDATORS, &tunables, &mut rng())
            .is_none());
        assert_eq!(parent.energy, 200.0);
        assert_eq!(parent.prey_eaten(), Some(0));
    }

    #[test]
    fn kind_specific_rules_ignore_the_other_kind() {
        let tunables = Tunables::default();
        let mut predator = predator_with(0, 200.0);
        predator.tick_reproduction_timer();
        assert!(predator
            .try_reproduce_prey(0, &tunables, &mut rng())
            .is_none());

        let mut prey = prey_with(0, 100.0);
        prey.record_kill(&tunables);
        assert_eq!(prey.energy, 100.0);
        assert!(prey
            .try_reproduce_predator(0, &tunables, &mut rng())
            .is_none());
    }
}
