// Battleboard Application Layer

pub mod commands;
pub mod error;
pub mod in_flight;
pub mod metrics;
pub mod queries;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use error::AppError;
pub use in_flight::InFlight;
pub use metrics::Metrics;
pub use state::AppState;
