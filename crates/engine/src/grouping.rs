//! Reconstructs multi-day bars from day-granular records for display.

use serde::Serialize;

use crewplan_core::{
    Allocation, AllocationId, DateRange, PersonId, PhaseId, ProjectId,
    calendar::{is_working_day, next_working_day},
};

const HOURS_EPSILON: f64 = 1e-9;

/// A maximal run of records shown as one unit. Derived on every view build and never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationGroup {
    pub person_id: PersonId,
    pub project_id: ProjectId,
    pub phase_id: Option<PhaseId>,
    /// Hours per day shared by every member.
    pub hours: f64,
    pub range: DateRange,
    pub total_hours: f64,
    pub members: Vec<AllocationId>,
    /// Spans more than one calendar day.
    pub is_bar: bool,
}

struct OpenGroup {
    first: Allocation,
    end: chrono::NaiveDate,
    total_hours: f64,
    members: Vec<AllocationId>,
}

impl OpenGroup {
    fn seed(allocation: &Allocation) -> Self {
        Self {
            first: allocation.clone(),
            end: allocation.end(),
            total_hours: allocation.total_hours(),
            members: vec![allocation.id],
        }
    }

    /// Only runs of single working days grow. Stored multi-day records stay alone.
    fn accepts(&self, next: &Allocation) -> bool {
        self.first.is_single_day()
            && is_working_day(self.first.start())
            && next.is_single_day()
            && is_working_day(next.start())
            && next.person_id == self.first.person_id
            && next.project_id == self.first.project_id
            && (next.hours - self.first.hours).abs() < HOURS_EPSILON
            && next_working_day(self.end).is_ok_and(|d| d == next.start())
    }

    fn push(&mut self, next: &Allocation) {
        self.end = next.end();
        self.total_hours += next.total_hours();
        self.members.push(next.id);
    }

    fn close(self) -> AllocationGroup {
        let range = self.first.range.union(&DateRange::single(self.end));
        AllocationGroup {
            person_id: self.first.person_id,
            project_id: self.first.project_id,
            phase_id: self.first.phase_id,
            hours: self.first.hours,
            range,
            total_hours: self.total_hours,
            members: self.members,
            is_bar: !range.is_single_day(),
        }
    }
}

/// Group records into bars. Pure and independent of input order.
pub fn group(allocations: &[Allocation]) -> Vec<AllocationGroup> {
    let mut sorted: Vec<&Allocation> = allocations.iter().collect();
    sorted.sort_by(|a, b| {
        (a.person_id, a.project_id, a.start(), a.id).cmp(&(b.person_id, b.project_id, b.start(), b.id))
    });

    let mut groups = Vec::new();
    let mut open: Option<OpenGroup> = None;
    for allocation in sorted {
        if let Some(current) = open.as_mut() {
            if current.accepts(allocation) {
                current.push(allocation);
                continue;
            }
        }
        if let Some(done) = open.take() {
            groups.push(done.close());
        }
        open = Some(OpenGroup::seed(allocation));
    }
    if let Some(done) = open {
        groups.push(done.close());
    }
    groups
}
