mod planner;
mod roster;

pub use planner::{TestPlanner, date, init_tracing};
pub use roster::TestRoster;
