pub mod agent;
pub mod config;
pub mod environment;
pub mod spatial;
pub mod steering;
pub mod vec2;
pub mod world;

pub use agent::{Agent, AgentKind, Species};
pub use config::{SimConfig, SimConfigError, Tunables};
pub use environment::{Environment, FoodArea, HidingSpot, Obstacle};
pub use vec2::Vec2;
pub use world::{World, WorldInitError};
