pub mod clock;
pub mod constants;
pub mod simulation;
pub mod state;
pub mod systems;

pub use simulation::{Simulation, TickReport};
