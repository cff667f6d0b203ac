use crewplan_core::{
    AbsenceEntry, AbsenceKind, AbsenceSource, Allocation, AllocationId, DateRange, EventTiming,
    ExternalEvent, NewAllocation, WeekdayHours, WorkSchedule,
};
use crewplan_engine::{PlannerConfig, Resolution};
use crewplan_harness::{TestPlanner, TestRoster, date};
use crewplan_storage::AllocationStore;

// ============================================================================
// Grouping (2 tests)
// ============================================================================

#[test]
fn working_week_renders_as_one_bar() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestPlanner::new()?;
    let roster = TestRoster::with_size(1, 1);
    let (p, a) = (roster.person(0), roster.project(0));

    t.allocate_week(p, a, "2025-03-03", 8.0)?;
    let view = t.planner.build_view(&[p], date("2025-03-05")?, Resolution::Week)?;

    let groups = &view.row(p).ok_or("missing row")?.groups;
    assert_eq!(groups.len(), 1);
    assert!(groups[0].is_bar);
    assert_eq!(groups[0].range, DateRange::work_week_of(date("2025-03-03")?)?);
    assert_eq!(groups[0].members.len(), 5);
    assert_eq!(groups[0].total_hours, 40.0);
    Ok(())
}

#[test]
fn saturday_record_does_not_extend_bar() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestPlanner::new()?;
    let roster = TestRoster::with_size(1, 1);
    let (p, a) = (roster.person(0), roster.project(0));

    t.allocate_week(p, a, "2025-03-03", 8.0)?;
    let saturday = NewAllocation::new(p, a, DateRange::single(date("2025-03-08")?), 8.0)?;
    t.planner
        .storage_mut()
        .insert_allocation(&Allocation::from_candidate(AllocationId::new(), saturday))?;

    let view = t.planner.build_view(&[p], date("2025-03-03")?, Resolution::Week)?;
    let groups = &view.row(p).ok_or("missing row")?.groups;
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].range.end(), date("2025-03-07")?);
    assert!(groups[0].is_bar);
    assert_eq!(groups[1].range, DateRange::single(date("2025-03-08")?));
    assert!(!groups[1].is_bar);
    Ok(())
}

// ============================================================================
// Cell Totals (6 tests)
// ============================================================================

#[test]
fn weekend_inside_working_range_gets_no_hours() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestPlanner::new()?;
    let roster = TestRoster::with_size(1, 1);
    let (p, a) = (roster.person(0), roster.project(0));

    let record = t.allocate(p, a, "2025-03-03", "2025-03-09", 8.0)?;
    assert_eq!(record.total_hours(), 40.0);

    let week = t.planner.build_view(&[p], date("2025-03-03")?, Resolution::Week)?;
    let cells = &week.row(p).ok_or("missing row")?.cells;
    let totals: Vec<f64> = cells.iter().map(|c| c.total_hours).collect();
    assert_eq!(totals, vec![8.0, 8.0, 8.0, 8.0, 8.0, 0.0, 0.0]);
    assert!(cells.iter().all(|c| !c.over_allocated));

    let month = t.planner.build_view(&[p], date("2025-03-03")?, Resolution::Month)?;
    let week_cell = month.cell(p, 2).ok_or("missing cell")?;
    assert_eq!(week_cell.total_hours, totals.iter().sum::<f64>());
    Ok(())
}

#[test]
fn friday_and_saturday_stay_separate_records() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestPlanner::new()?;
    let roster = TestRoster::with_size(1, 1);
    let (p, a) = (roster.person(0), roster.project(0));

    t.allocate(p, a, "2025-03-07", "2025-03-07", 8.0)?;
    t.allocate(p, a, "2025-03-08", "2025-03-08", 8.0)?;

    let records = t.pair_records(p, a)?;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.hours == 8.0 && r.is_single_day()));

    let view = t.planner.build_view(&[p], date("2025-03-03")?, Resolution::Week)?;
    let row = view.row(p).ok_or("missing row")?;
    let totals: Vec<f64> = row.cells.iter().map(|c| c.total_hours).collect();
    assert_eq!(totals, vec![0.0, 0.0, 0.0, 0.0, 8.0, 8.0, 0.0]);
    assert!(row.cells.iter().all(|c| !c.over_allocated));
    assert_eq!(row.groups.len(), 2);
    Ok(())
}

#[test]
fn day_cells_show_daily_rate_on_every_covered_date() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestPlanner::new()?;
    let roster = TestRoster::with_size(1, 1);
    let (p, a) = (roster.person(0), roster.project(0));

    t.allocate(p, a, "2025-03-04", "2025-03-06", 6.0)?;

    for day in ["2025-03-04", "2025-03-05", "2025-03-06"] {
        let view = t.planner.build_view(&[p], date(day)?, Resolution::Day)?;
        let cell = view.cell(p, 0).ok_or("missing cell")?;
        assert_eq!(cell.total_hours, 6.0, "{day}");
        assert_eq!(cell.entries.len(), 1);
    }

    let week = t.planner.build_view(&[p], date("2025-03-04")?, Resolution::Week)?;
    let totals: Vec<f64> = week.rows[0].cells.iter().map(|c| c.total_hours).collect();
    assert_eq!(totals, vec![0.0, 6.0, 6.0, 6.0, 0.0, 0.0, 0.0]);
    Ok(())
}

#[test]
fn month_cells_prorate_records_crossing_the_window() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestPlanner::new()?;
    let roster = TestRoster::with_size(1, 2);
    let p = roster.person(0);

    t.allocate(p, roster.project(0), "2025-03-03", "2025-03-07", 8.0)?;
    // Thursday to Wednesday; only Thursday and Friday fall inside the window
    t.allocate(p, roster.project(1), "2025-03-20", "2025-03-26", 8.0)?;

    let view = t.planner.build_view(&[p], date("2025-03-05")?, Resolution::Month)?;
    assert_eq!(view.columns.len(), 5);
    assert_eq!(view.window, DateRange::new(date("2025-02-17")?, date("2025-03-23")?)?);

    let row = view.row(p).ok_or("missing row")?;
    let totals: Vec<f64> = row.cells.iter().map(|c| c.total_hours).collect();
    assert_eq!(totals, vec![0.0, 0.0, 40.0, 0.0, 16.0]);
    assert!(row.cells.iter().all(|c| !c.over_allocated));
    Ok(())
}

#[test]
fn over_allocation_uses_configured_threshold() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestPlanner::new()?;
    let roster = TestRoster::with_size(1, 2);
    let p = roster.person(0);

    t.allocate(p, roster.project(0), "2025-03-03", "2025-03-03", 5.0)?;
    t.allocate(p, roster.project(1), "2025-03-03", "2025-03-03", 5.0)?;

    let view = t.planner.build_view(&[p], date("2025-03-03")?, Resolution::Day)?;
    let cell = view.cell(p, 0).ok_or("missing cell")?;
    assert_eq!(cell.total_hours, 10.0);
    assert!(cell.over_allocated);

    let config = PlannerConfig {
        daily_overallocation_threshold: 10.0,
        ..PlannerConfig::default()
    };
    let mut relaxed = TestPlanner::with_config(config)?;
    assert_eq!(relaxed.planner.config().daily_overallocation_threshold, 10.0);
    assert_eq!(t.planner.config(), &PlannerConfig::default());
    relaxed.allocate(p, roster.project(0), "2025-03-03", "2025-03-03", 10.0)?;
    let view = relaxed.planner.build_view(&[p], date("2025-03-03")?, Resolution::Day)?;
    assert!(!view.cell(p, 0).ok_or("missing cell")?.over_allocated);
    Ok(())
}

#[test]
fn rows_follow_requested_people() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestPlanner::new()?;
    let mut roster = TestRoster::new();
    let first = roster.add_person();
    roster.add_person();
    let third = roster.add_person();
    let a = roster.add_project();
    assert_eq!(roster.people(), &[first, roster.person(1), third]);

    t.allocate(first, a, "2025-03-03", "2025-03-03", 2.0)?;
    t.allocate(third, a, "2025-03-03", "2025-03-03", 3.0)?;

    let people = [third, roster.person(1)];
    let view = t.planner.build_view(&people, date("2025-03-03")?, Resolution::Day)?;
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.rows[0].person_id, roster.person(2));
    assert_eq!(view.rows[0].cells[0].total_hours, 3.0);
    assert_eq!(view.rows[1].cells[0].total_hours, 0.0);
    assert!(view.row(roster.person(0)).is_none());
    Ok(())
}

// ============================================================================
// Capacity (2 tests)
// ============================================================================

#[test]
fn weekly_capacity_fallback() -> Result<(), Box<dyn std::error::Error>> {
    let config = PlannerConfig {
        default_weekly_capacity: 20.0,
        ..PlannerConfig::default()
    };
    let mut t = TestPlanner::with_config(config)?;
    let roster = TestRoster::with_size(1, 1);
    let (p, a) = (roster.person(0), roster.project(0));

    let one_week = DateRange::new(date("2025-03-03")?, date("2025-03-07")?)?;
    let two_weeks = DateRange::new(date("2025-03-03")?, date("2025-03-14")?)?;
    assert_eq!(t.planner.max_capacity(p, one_week)?, 20.0);
    assert_eq!(t.planner.max_capacity(p, two_weeks)?, 40.0);

    t.allocate(p, a, "2025-03-03", "2025-03-07", 4.0)?;
    let usage = t.planner.utilization(p, one_week)?;
    assert_eq!(usage.allocated_hours, 20.0);
    assert_eq!(usage.percent, 100.0);
    assert!(!usage.is_over_capacity());
    Ok(())
}

#[test]
fn stored_schedule_drives_cell_capacity() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestPlanner::new()?;
    let roster = TestRoster::with_size(1, 1);
    let (p, a) = (roster.person(0), roster.project(0));

    let schedule = WorkSchedule::Daily(WeekdayHours {
        fri: 0.0,
        ..WeekdayHours::weekdays(8.0)
    });
    t.planner.set_schedule(p, &schedule)?;
    assert_eq!(t.planner.schedule_for(p)?, schedule);

    t.allocate(p, a, "2025-03-06", "2025-03-07", 4.0)?;
    let view = t.planner.build_view(&[p], date("2025-03-03")?, Resolution::Week)?;
    let row = view.row(p).ok_or("missing row")?;

    assert_eq!(row.cells[3].capacity_hours, 8.0);
    assert_eq!(row.cells[3].utilization, 50.0);
    assert_eq!(row.cells[4].capacity_hours, 0.0);
    assert_eq!(row.cells[4].utilization, 0.0);

    let bad = WorkSchedule::Weekly { weekly_hours: -1.0 };
    assert!(t.planner.set_schedule(p, &bad).is_err());
    Ok(())
}

// ============================================================================
// Absences (2 tests)
// ============================================================================

#[test]
fn absences_appear_beside_planned_work() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestPlanner::new()?;
    let roster = TestRoster::with_size(1, 1);
    let (p, a) = (roster.person(0), roster.project(0));

    t.allocate(p, a, "2025-03-03", "2025-03-07", 8.0)?;
    t.planner
        .record_absence(&AbsenceEntry::new(p, date("2025-03-05")?, 8.0, AbsenceKind::Holiday)?)?;
    t.planner.sync_external_event(&ExternalEvent {
        external_id: "cal-1".into(),
        person_id: p,
        title: "Vacation in Porto".into(),
        timing: EventTiming::AllDay {
            start: date("2025-03-06")?,
            end: date("2025-03-07")?,
        },
    })?;
    t.planner.sync_external_event(&ExternalEvent {
        external_id: "cal-2".into(),
        person_id: p,
        title: "Dentist (out of office)".into(),
        timing: EventTiming::Timed {
            start: "2025-03-04T14:00:00".parse()?,
            end: "2025-03-04T16:00:00".parse()?,
        },
    })?;
    t.planner.sync_external_event(&ExternalEvent {
        external_id: "cal-3".into(),
        person_id: p,
        title: "Sprint review".into(),
        timing: EventTiming::AllDay {
            start: date("2025-03-03")?,
            end: date("2025-03-03")?,
        },
    })?;

    let view = t.planner.build_view(&[p], date("2025-03-03")?, Resolution::Week)?;
    let cells = &view.row(p).ok_or("missing row")?.cells;

    assert_eq!(cells[0].absence_hours, 0.0);
    assert_eq!(cells[1].absence_hours, 2.0);
    assert_eq!(cells[1].absence_kind, Some(AbsenceKind::PartialDay));
    assert_eq!(cells[2].absence_kind, Some(AbsenceKind::Holiday));
    assert_eq!(cells[3].absence_kind, Some(AbsenceKind::PaidTimeOff));
    assert_eq!(cells[4].absence_hours, 8.0);
    // Absences never reduce planned work
    assert!(cells[..5].iter().all(|c| c.total_hours == 8.0));
    Ok(())
}

#[test]
fn manual_absence_overrides_synced_event() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestPlanner::new()?;
    let roster = TestRoster::with_size(1, 0);
    let p = roster.person(0);

    let event = ExternalEvent {
        external_id: "cal-9".into(),
        person_id: p,
        title: "Public holiday".into(),
        timing: EventTiming::AllDay {
            start: date("2025-03-10")?,
            end: date("2025-03-11")?,
        },
    };
    t.planner.sync_external_event(&event)?;
    // Re-syncing the same provider id replaces rather than duplicates
    t.planner.sync_external_event(&event)?;
    t.planner
        .record_absence(&AbsenceEntry::new(p, date("2025-03-10")?, 4.0, AbsenceKind::PartialDay)?)?;

    let week = DateRange::week_of(date("2025-03-10")?)?;
    let absences = t.planner.absences(&[p], week)?;
    assert_eq!(absences.len(), 2);
    assert_eq!(absences[0].source, AbsenceSource::Manual);
    assert_eq!(absences[0].hours, 4.0);
    assert_eq!(absences[1].source, AbsenceSource::Calendar);
    assert_eq!(absences[1].kind, AbsenceKind::Holiday);
    Ok(())
}
