pub mod job;
pub mod scheduler;

pub use job::{compose_message, run_once, BroadcastOutcome};
pub use scheduler::run_daily;
