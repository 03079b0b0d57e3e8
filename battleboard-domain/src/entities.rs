// Domain entities

pub mod battle;
pub mod config;
pub mod kill_event;
pub mod queue;
pub mod query;
pub mod rollup;

pub use battle::*;
pub use config::*;
pub use kill_event::*;
pub use queue::*;
pub use query::*;
pub use rollup::*;
