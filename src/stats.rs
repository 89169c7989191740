use crate::models::{DayEntry, DayStatus, HistoryView};
use chrono::{Datelike, Duration, Months, NaiveDate};
use std::collections::BTreeMap;

/// Completion summary for one day. Entries whose activity no longer exists
/// are left out of the total.
pub fn compute_day_status(date: NaiveDate, entries: &[DayEntry]) -> DayStatus {
    let mut total = 0u32;
    let mut done = 0u32;
    for entry in entries {
        let Some(activity) = &entry.activity else {
            continue;
        };
        total += 1;
        if activity.is_done(entry.checked) {
            done += 1;
        }
    }

    DayStatus {
        date,
        total,
        done,
        percent: percent(done, total),
    }
}

/// `round(100 * done / total)` with halves rounded up, 0 for an empty day.
pub fn percent(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = u64::from(done.min(total));
    let total = u64::from(total);
    ((200 * done + total) / (2 * total)) as u8
}

/// Days covered by `view` around `cursor`: the day itself, its Monday-based
/// week, or its calendar month.
pub fn range_dates(view: HistoryView, cursor: NaiveDate) -> Vec<NaiveDate> {
    match view {
        HistoryView::Day => vec![cursor],
        HistoryView::Week => {
            let start = week_start(cursor);
            (0..7).map(|offset| start + Duration::days(offset)).collect()
        }
        HistoryView::Month => {
            let start = month_start(cursor);
            start
                .iter_days()
                .take_while(|date| date.month() == start.month())
                .collect()
        }
    }
}

/// Moves the cursor one view-sized step forwards (`step > 0`) or backwards.
pub fn shift_cursor(view: HistoryView, cursor: NaiveDate, step: i32) -> NaiveDate {
    let forward = step >= 0;
    let count = step.unsigned_abs();
    let shifted = match view {
        HistoryView::Day => shift_days(cursor, i64::from(count), forward),
        HistoryView::Week => shift_days(cursor, 7 * i64::from(count), forward),
        HistoryView::Month => {
            let months = Months::new(count);
            if forward {
                cursor.checked_add_months(months)
            } else {
                cursor.checked_sub_months(months)
            }
        }
    };
    shifted.unwrap_or(cursor)
}

fn shift_days(cursor: NaiveDate, days: i64, forward: bool) -> Option<NaiveDate> {
    let delta = Duration::days(days);
    if forward {
        cursor.checked_add_signed(delta)
    } else {
        cursor.checked_sub_signed(delta)
    }
}

/// One status per day of the range. Days are independent of each other.
pub fn build_history(
    view: HistoryView,
    cursor: NaiveDate,
    entries_by_day: &BTreeMap<NaiveDate, Vec<DayEntry>>,
) -> Vec<DayStatus> {
    range_dates(view, cursor)
        .into_iter()
        .map(|date| {
            let entries = entries_by_day
                .get(&date)
                .map(Vec::as_slice)
                .unwrap_or_default();
            compute_day_status(date, entries)
        })
        .collect()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
