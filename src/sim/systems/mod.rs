pub mod effects;
pub mod eyes;
pub mod heartbeat;
pub mod motion;
