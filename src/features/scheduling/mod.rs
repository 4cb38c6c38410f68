pub mod scheduler;
pub mod service;

pub use scheduler::{due_date_from, schedule, ScheduleOutcome, ScheduleState, Score};
pub use service::SchedulingService;
