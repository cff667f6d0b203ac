pub mod absence;
pub mod allocation;
pub mod calendar;
pub mod error;
pub mod ids;
pub mod schedule;

pub use absence::{AbsenceEntry, AbsenceInterval, AbsenceKind, AbsenceSource, EventTiming, ExternalEvent};
pub use allocation::{Allocation, NewAllocation};
pub use calendar::DateRange;
pub use error::CoreError;
pub use ids::*;
pub use schedule::{WeekdayHours, WorkSchedule};
