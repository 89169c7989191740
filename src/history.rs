use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::activities;
use crate::errors::TrackerError;
use crate::models::{DayEntry, HistoryItem, HistoryQuery, HistoryResponse, HistoryView, UserId};
use crate::stats::{build_history, range_dates, shift_cursor};
use crate::store::RecordStore;
use crate::tracking;

/// Tracking rows of the requested range joined with their activities and
/// grouped by day. Rows of deleted activities join to `None`.
async fn entries_by_day(
    store: &dyn RecordStore,
    user: UserId,
    start: NaiveDate,
    end: NaiveDate,
    locked_only: bool,
) -> Result<BTreeMap<NaiveDate, Vec<DayEntry>>, TrackerError> {
    let records = tracking::user_records(store, user, locked_only)
        .await
        .map_err(TrackerError::read("history"))?;
    let activities: HashMap<_, _> = activities::list_activities(store, user)
        .await?
        .into_iter()
        .map(|activity| (activity.id, activity))
        .collect();

    let mut grouped: BTreeMap<NaiveDate, Vec<DayEntry>> = BTreeMap::new();
    for record in records {
        if record.date < start || record.date > end {
            continue;
        }
        grouped.entry(record.date).or_default().push(DayEntry {
            activity: activities.get(&record.activity_id).cloned(),
            checked: record.checked,
        });
    }
    Ok(grouped)
}

pub async fn load_history(
    store: &dyn RecordStore,
    user: UserId,
    query: &HistoryQuery,
    today: NaiveDate,
) -> Result<HistoryResponse, TrackerError> {
    let cursor = query.date.unwrap_or(today);
    let dates = range_dates(query.view, cursor);
    let start = dates.first().copied().unwrap_or(cursor);
    let end = dates.last().copied().unwrap_or(cursor);

    let grouped = entries_by_day(store, user, start, end, !query.include_unlocked).await?;
    let days = build_history(query.view, cursor, &grouped);

    let items = match query.view {
        HistoryView::Day => grouped
            .get(&cursor)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let activity = entry.activity.as_ref()?;
                        Some(HistoryItem {
                            activity_id: activity.id,
                            name: activity.name.clone(),
                            kind: activity.kind,
                            done: activity.is_done(entry.checked),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
        HistoryView::Week | HistoryView::Month => Vec::new(),
    };

    Ok(HistoryResponse {
        view: query.view,
        start_date: start,
        end_date: end,
        previous: shift_cursor(query.view, cursor, -1),
        next: shift_cursor(query.view, cursor, 1),
        days,
        items,
    })
}
