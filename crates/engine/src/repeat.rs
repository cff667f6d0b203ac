//! Copy one week's plan forward.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::info;

use crewplan_core::{ActorId, Allocation, AllocationId, DateRange, PersonId, ProjectId};
use crewplan_storage::AllocationStore;

use crate::{EngineError, Planner};

/// New records for every (person, project) pair in `source` that has nothing in
/// `target_week`. Each spans Monday to Friday of the target week with the
/// earliest source record's hours, billable flag, phase and notes.
pub fn plan_repeat(
    source: &[Allocation],
    existing_in_target: &[Allocation],
    target_week: DateRange,
    actor_id: ActorId,
) -> Result<Vec<Allocation>, EngineError> {
    let taken: HashSet<(PersonId, ProjectId)> = existing_in_target
        .iter()
        .map(|a| (a.person_id, a.project_id))
        .collect();

    let mut earliest: BTreeMap<(PersonId, ProjectId), &Allocation> = BTreeMap::new();
    for allocation in source {
        let key = (allocation.person_id, allocation.project_id);
        if taken.contains(&key) {
            continue;
        }
        earliest
            .entry(key)
            .and_modify(|seen| {
                if (allocation.start(), allocation.id) < (seen.start(), seen.id) {
                    *seen = allocation;
                }
            })
            .or_insert(allocation);
    }

    let span = DateRange::work_week_of(target_week.start())?;
    Ok(earliest
        .into_values()
        .map(|template| Allocation {
            id: AllocationId::new(),
            person_id: template.person_id,
            project_id: template.project_id,
            phase_id: template.phase_id,
            range: span,
            hours: template.hours,
            billable: template.billable,
            notes: template.notes.clone(),
            created_by: Some(actor_id),
        })
        .collect())
}

impl<S: AllocationStore> Planner<S> {
    /// Copy the week containing `source_week_start` into the week containing
    /// `target_week_start`, skipping pairs already planned there. Returns the
    /// number of records created; on error nothing is written.
    pub fn repeat_period(
        &mut self,
        source_week_start: NaiveDate,
        target_week_start: NaiveDate,
        actor_id: ActorId,
    ) -> Result<usize, EngineError> {
        let source_week = DateRange::week_of(source_week_start)?;
        let target_week = DateRange::week_of(target_week_start)?;

        self.in_transaction(|p| {
            let source = p.storage.find_all_in_range(source_week)?;
            let existing = p.storage.find_all_in_range(target_week)?;
            let created = plan_repeat(&source, &existing, target_week, actor_id)?;
            for allocation in &created {
                p.storage.insert_allocation(allocation)?;
            }
            info!(
                source = %source_week,
                target = %target_week,
                created = created.len(),
                already_planned = existing.len(),
                "repeated period"
            );
            Ok(created.len())
        })
    }
}
