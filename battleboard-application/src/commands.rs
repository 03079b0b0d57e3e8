pub mod discovery_commands;
pub mod kill_commands;
pub mod poll_commands;
pub mod worker_commands;
