pub mod battle_queries;
pub mod kill_queries;
pub mod queue_queries;
