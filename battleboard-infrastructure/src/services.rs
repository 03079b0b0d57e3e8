pub mod health_service;
pub mod notify_service;
pub mod schedule_service;
pub mod telemetry_service;

pub use health_service::*;
pub use notify_service::*;
pub use schedule_service::*;
pub use telemetry_service::*;
