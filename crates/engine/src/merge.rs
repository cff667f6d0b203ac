//! Overlap-merge resolution on the write path.
//!
//! For any (person, project) pair no two stored records may cover the same
//! date. Writes that would break this fold the affected records into one,
//! conserving total hours: the survivor's per-day figure becomes the summed
//! totals spread over the counted days of the merged range.

use tracing::{debug, info, warn};

use crewplan_core::{
    Allocation, AllocationId, DateRange, NewAllocation, PersonId, ProjectId,
    calendar::is_working_day,
};
use crewplan_storage::AllocationStore;

use crate::request::{AllocationPatch, CreateAllocation};
use crate::{EngineError, Planner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeScope {
    /// Records overlapping the candidate. When none overlap, records touching it
    /// end to end that count their days the same way.
    Adjacent,
    /// Only records that cover one of the candidate's dates.
    Covering,
}

/// Fold `absorbed` into `base`. The result keeps `base`'s identity and
/// attributes, covers the union of all ranges, and carries the summed total.
pub fn merge_records<'a>(
    base: &Allocation,
    absorbed: impl IntoIterator<Item = &'a Allocation>,
) -> Allocation {
    let mut merged = base.clone();
    let mut total = base.total_hours();
    for other in absorbed {
        merged.range = merged.range.union(&other.range);
        total += other.total_hours();
    }
    merged.hours = total / f64::from(merged.range.counted_days());
    merged
}

/// Narrow an ad hoc search hit list to the records the candidate absorbs.
///
/// A candidate landing on existing coverage merges only with what it overlaps,
/// so neighbouring day records stay separate. A candidate in a gap joins its
/// calendar neighbours, unless joining would mix weekday and weekend-only
/// ranges, which would move hours between counted days.
fn absorbed_by(range: &DateRange, found: Vec<Allocation>) -> Vec<Allocation> {
    let (overlapping, touching): (Vec<Allocation>, Vec<Allocation>) =
        found.into_iter().partition(|a| a.range.overlaps(range));
    if !overlapping.is_empty() {
        return overlapping;
    }
    let weekend_only = range.working_days() == 0;
    touching
        .into_iter()
        .filter(|a| (a.range.working_days() == 0) == weekend_only)
        .collect()
}

/// Split records (sorted by start) into runs whose ranges chain by overlap.
fn overlap_clusters(records: Vec<Allocation>) -> Vec<Vec<Allocation>> {
    let mut clusters: Vec<Vec<Allocation>> = Vec::new();
    let mut reach = None;
    for record in records {
        match (clusters.last_mut(), reach) {
            (Some(cluster), Some(end)) if record.start() <= end => {
                reach = Some(record.end().max(end));
                cluster.push(record);
            }
            _ => {
                reach = Some(record.end());
                clusters.push(vec![record]);
            }
        }
    }
    clusters
}

impl<S: AllocationStore> Planner<S> {
    /// Ad hoc create-or-merge of one range.
    pub fn upsert_allocation(&mut self, candidate: NewAllocation) -> Result<Allocation, EngineError> {
        self.in_transaction(|p| p.merge_candidate(candidate, MergeScope::Adjacent))
    }

    /// Entry point for the create request. Returns every record written.
    pub fn create_allocation(
        &mut self,
        request: CreateAllocation,
    ) -> Result<Vec<Allocation>, EngineError> {
        let expand = request.expand_to_week;
        let candidate = request.into_candidate()?;
        if !expand {
            return Ok(vec![self.upsert_allocation(candidate)?]);
        }

        self.in_transaction(|p| {
            let mut written: Vec<Allocation> = Vec::new();
            for date in candidate.range.days().filter(|d| is_working_day(*d)) {
                let record = p.merge_candidate(candidate.on_day(date), MergeScope::Covering)?;
                match written.iter_mut().find(|w| w.id == record.id) {
                    Some(existing) => *existing = record,
                    None => written.push(record),
                }
            }
            info!(
                person = %candidate.person_id,
                project = %candidate.project_id,
                week = %candidate.range,
                records = written.len(),
                "expanded allocation over week"
            );
            Ok(written)
        })
    }

    /// Runs inside the caller's transaction.
    pub(crate) fn merge_candidate(
        &mut self,
        candidate: NewAllocation,
        scope: MergeScope,
    ) -> Result<Allocation, EngineError> {
        let search = match scope {
            MergeScope::Adjacent => candidate.range.widen(1)?,
            MergeScope::Covering => candidate.range,
        };
        let found =
            self.storage
                .find_overlapping(candidate.person_id, candidate.project_id, search)?;
        let matches = match scope {
            MergeScope::Adjacent => absorbed_by(&candidate.range, found),
            MergeScope::Covering => found,
        };

        let incoming = Allocation::from_candidate(AllocationId::new(), candidate);
        let Some((first, rest)) = matches.split_first() else {
            self.storage.insert_allocation(&incoming)?;
            debug!(id = %incoming.id, range = %incoming.range, "inserted allocation");
            return Ok(incoming);
        };

        let mut merged = merge_records(first, rest.iter().chain(std::iter::once(&incoming)));
        if incoming.notes.is_some() {
            merged.notes = incoming.notes.clone();
        }
        if incoming.phase_id.is_some() {
            merged.phase_id = incoming.phase_id;
        }
        self.storage.update_allocation(&merged)?;
        let removed: Vec<AllocationId> = rest.iter().map(|a| a.id).collect();
        self.storage.delete_allocations(&removed)?;

        debug!(
            id = %merged.id,
            range = %merged.range,
            hours = merged.hours,
            absorbed = removed.len(),
            "merged allocation into existing record"
        );
        Ok(merged)
    }

    /// Edit one record. A changed range or project that now overlaps another
    /// record of the same pair absorbs it.
    pub fn update_allocation(
        &mut self,
        id: AllocationId,
        patch: &AllocationPatch,
    ) -> Result<Allocation, EngineError> {
        self.in_transaction(|p| {
            let current = p.require_allocation(id)?;
            let mut next = patch.apply(&current)?;

            if patch.touches_coverage() {
                let others: Vec<Allocation> = p
                    .storage
                    .find_overlapping(next.person_id, next.project_id, next.range)?
                    .into_iter()
                    .filter(|a| a.id != id)
                    .collect();
                if !others.is_empty() {
                    next = merge_records(&next, &others);
                    let removed: Vec<AllocationId> = others.iter().map(|a| a.id).collect();
                    p.storage.delete_allocations(&removed)?;
                    debug!(%id, absorbed = removed.len(), "edit absorbed overlapping records");
                }
            }

            p.storage.update_allocation(&next)?;
            Ok(next)
        })
    }

    /// Merge any overlapping records left for a pair, e.g. by writers that
    /// bypassed this planner. Returns the number of records removed.
    pub fn heal_coverage(
        &mut self,
        person_id: PersonId,
        project_id: ProjectId,
    ) -> Result<usize, EngineError> {
        self.in_transaction(|p| {
            let records = p.storage.find_for_pair(person_id, project_id)?;
            let mut removed = 0;
            for cluster in overlap_clusters(records) {
                let Some((first, rest)) = cluster.split_first() else {
                    continue;
                };
                if rest.is_empty() {
                    continue;
                }
                let merged = merge_records(first, rest);
                p.storage.update_allocation(&merged)?;
                let ids: Vec<AllocationId> = rest.iter().map(|a| a.id).collect();
                removed += p.storage.delete_allocations(&ids)?;
            }
            if removed > 0 {
                info!(person = %person_id, project = %project_id, removed, "healed overlapping allocations");
            }
            Ok(removed)
        })
    }

    /// Fails with `CoverageConflict` when two stored records of the pair overlap.
    pub fn verify_coverage(
        &self,
        person_id: PersonId,
        project_id: ProjectId,
    ) -> Result<(), EngineError> {
        let records = self.storage.find_for_pair(person_id, project_id)?;
        if overlap_clusters(records).iter().any(|c| c.len() > 1) {
            warn!(person = %person_id, project = %project_id, "overlapping allocations detected");
            return Err(EngineError::CoverageConflict {
                person_id,
                project_id,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn record(start: &str, end: &str, hours: f64) -> Allocation {
        let candidate = NewAllocation::new(
            PersonId::new(),
            ProjectId::new(),
            DateRange::new(d(start), d(end)).unwrap(),
            hours,
        )
        .unwrap();
        Allocation::from_candidate(AllocationId::new(), candidate)
    }

    #[test]
    fn adjacent_days_keep_per_day_rate() {
        let monday = record("2025-03-03", "2025-03-03", 8.0);
        let tuesday = record("2025-03-04", "2025-03-04", 8.0);
        let merged = merge_records(&monday, [&tuesday]);
        assert_eq!(merged.id, monday.id);
        assert_eq!(merged.range, DateRange::new(d("2025-03-03"), d("2025-03-04")).unwrap());
        assert_eq!(merged.hours, 8.0);
        assert_eq!(merged.total_hours(), 16.0);
    }

    #[test]
    fn contained_candidate_raises_rate_only() {
        let week = record("2025-03-03", "2025-03-07", 8.0);
        let extra = record("2025-03-05", "2025-03-05", 4.0);
        let merged = merge_records(&week, [&extra]);
        assert_eq!(merged.range, week.range);
        assert_eq!(merged.total_hours(), 44.0);
    }

    #[test]
    fn overlap_hit_leaves_touching_days_alone() {
        let tuesday = record("2025-03-04", "2025-03-04", 6.0);
        let wednesday = record("2025-03-05", "2025-03-05", 6.0);
        let thursday = record("2025-03-06", "2025-03-06", 6.0);
        let candidate = DateRange::single(d("2025-03-05"));

        let absorbed = absorbed_by(&candidate, vec![tuesday, wednesday.clone(), thursday]);
        assert_eq!(absorbed, vec![wednesday]);
    }

    #[test]
    fn gap_candidate_joins_neighbours_of_the_same_kind() {
        let monday = record("2025-03-03", "2025-03-03", 8.0);
        let wednesday = record("2025-03-05", "2025-03-05", 8.0);
        let tuesday = DateRange::single(d("2025-03-04"));
        assert_eq!(absorbed_by(&tuesday, vec![monday, wednesday]).len(), 2);

        let friday = record("2025-03-07", "2025-03-07", 8.0);
        let saturday = DateRange::single(d("2025-03-08"));
        assert!(absorbed_by(&saturday, vec![friday]).is_empty());
    }

    #[test]
    fn clusters_chain_through_overlaps() {
        let records = vec![
            record("2025-03-03", "2025-03-05", 1.0),
            record("2025-03-05", "2025-03-06", 1.0),
            record("2025-03-06", "2025-03-06", 1.0),
            record("2025-03-10", "2025-03-11", 1.0),
        ];
        let clusters = overlap_clusters(records);
        assert_eq!(clusters.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 1]);
    }
}
