pub mod schedule;
pub mod session;
pub mod template;

pub use schedule::{RecurrencePattern, ResolvedOccurrence, WorkoutSchedule};
pub use session::{SessionStatus, WorkoutSession};
pub use template::WorkoutTemplate;
