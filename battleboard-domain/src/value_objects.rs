// Domain value objects
pub mod queue_status;
pub mod scope;

pub use queue_status::*;
pub use scope::*;
