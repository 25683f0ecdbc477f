use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::timesheet::{Attachment, Timesheet, TimesheetStatus};

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Number of distinct ISO weeks covered by the given dates.
pub fn distinct_weeks(dates: impl IntoIterator<Item = NaiveDate>) -> usize {
    dates
        .into_iter()
        .map(week_start)
        .collect::<BTreeSet<_>>()
        .len()
}

/// Daily records sharing project, task and week start, folded into one row.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRow {
    #[schema(value_type = String, format = "date")]
    pub week_start: NaiveDate,
    pub project: String,
    pub task: String,
    pub hourly_rate: f64,
    /// Monday..Sunday
    pub hours: [f64; 7],
    pub total_hours: f64,
    pub total_amount: f64,
    pub status: TimesheetStatus,
    pub timesheet_ids: Vec<u64>,
    pub attachments: Vec<Attachment>,
}

pub fn group_weekly(timesheets: &[Timesheet]) -> Vec<WeeklyRow> {
    let mut rows: Vec<WeeklyRow> = Vec::new();
    let mut index: HashMap<(String, String, NaiveDate), usize> = HashMap::new();
    let mut statuses: Vec<Vec<TimesheetStatus>> = Vec::new();

    for ts in timesheets {
        let start = week_start(ts.date);
        let key = (ts.project.clone(), ts.task.clone(), start);

        let slot = *index.entry(key).or_insert_with(|| {
            rows.push(WeeklyRow {
                week_start: start,
                project: ts.project.clone(),
                task: ts.task.clone(),
                hourly_rate: ts.hourly_rate.unwrap_or(0.0),
                hours: [0.0; 7],
                total_hours: 0.0,
                total_amount: 0.0,
                status: ts.status,
                timesheet_ids: Vec::new(),
                attachments: Vec::new(),
            });
            statuses.push(Vec::new());
            rows.len() - 1
        });

        let row = &mut rows[slot];
        let day = ts.date.weekday().num_days_from_monday() as usize;
        row.hours[day] += ts.hours;
        row.total_hours += ts.hours;
        row.timesheet_ids.push(ts.id);
        row.attachments.extend(ts.attachments.iter().cloned());
        statuses[slot].push(ts.status);
    }

    for (row, seen) in rows.iter_mut().zip(&statuses) {
        row.total_amount = row.total_hours * row.hourly_rate;
        row.status = combined_status(seen);
    }

    rows.sort_by(|a, b| {
        b.week_start
            .cmp(&a.week_start)
            .then_with(|| a.project.cmp(&b.project))
            .then_with(|| a.task.cmp(&b.task))
    });
    rows
}

/// Uniform rows keep their status; mixed rows surface the least advanced one.
fn combined_status(statuses: &[TimesheetStatus]) -> TimesheetStatus {
    let Some(first) = statuses.first() else {
        return TimesheetStatus::Pending;
    };
    if statuses.iter().all(|s| s == first) {
        return *first;
    }
    if statuses.contains(&TimesheetStatus::Rejected) {
        TimesheetStatus::Rejected
    } else if statuses.contains(&TimesheetStatus::Pending) {
        TimesheetStatus::Pending
    } else {
        TimesheetStatus::Submitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(id: u64, date: NaiveDate, hours: f64, task: &str, status: TimesheetStatus) -> Timesheet {
        Timesheet {
            id,
            user_id: Some(1),
            date,
            hours,
            project: "Spruce".into(),
            task: task.into(),
            hourly_rate: Some(65.0),
            status,
            week_start: None,
            week_number: None,
            attachments: Vec::new(),
            rejection_reason: None,
            submitted_at: None,
            approved_at: None,
            created_at: Utc::now(),
            extra: Default::default(),
        }
    }

    #[test]
    fn week_starts_on_monday() {
        assert_eq!(week_start(day(2025, 12, 1)), day(2025, 12, 1));
        assert_eq!(week_start(day(2025, 12, 7)), day(2025, 12, 1));
        assert_eq!(week_start(day(2025, 12, 8)), day(2025, 12, 8));
        assert_eq!(distinct_weeks([day(2025, 12, 1), day(2025, 12, 3), day(2025, 12, 9)]), 2);
    }

    #[test]
    fn groups_by_project_task_and_week() {
        use TimesheetStatus::*;
        let rows = group_weekly(&[
            ts(1, day(2025, 12, 1), 8.0, "Development", Approved),
            ts(2, day(2025, 12, 2), 6.0, "Development", Pending),
            ts(3, day(2025, 12, 2), 2.0, "Testing", Submitted),
            ts(4, day(2025, 12, 9), 4.0, "Development", Approved),
        ]);

        assert_eq!(rows.len(), 3);
        // newest week first
        assert_eq!(rows[0].week_start, day(2025, 12, 8));
        assert_eq!(rows[0].hours[1], 4.0);

        let dev = &rows[1];
        assert_eq!(dev.task, "Development");
        assert_eq!(dev.hours[0], 8.0);
        assert_eq!(dev.hours[1], 6.0);
        assert_eq!(dev.total_hours, 14.0);
        assert_eq!(dev.total_amount, 14.0 * 65.0);
        assert_eq!(dev.status, Pending);
        assert_eq!(dev.timesheet_ids, vec![1, 2]);

        assert_eq!(rows[2].task, "Testing");
        assert_eq!(rows[2].status, Submitted);
    }
}
