use serde_json::json;
use uuid::Uuid;

use crate::models::{TrackingRecord, UserId};
use crate::store::{Collection, Filter, RecordStore, StoreError, from_row, from_rows, patch, to_row};
use crate::sync::DayScope;

fn scope_filters(scope: DayScope) -> [Filter; 2] {
    [
        Filter::eq("user_id", scope.user),
        Filter::eq("date", scope.date),
    ]
}

pub async fn find_record(
    store: &dyn RecordStore,
    scope: DayScope,
    activity_id: Uuid,
) -> Result<Option<TrackingRecord>, StoreError> {
    let [user, date] = scope_filters(scope);
    let rows = store
        .select(
            Collection::Tracking,
            &[user, date, Filter::eq("activity_id", activity_id)],
            None,
        )
        .await?;
    Ok(from_rows(rows)?.into_iter().next())
}

pub async fn day_records(
    store: &dyn RecordStore,
    scope: DayScope,
) -> Result<Vec<TrackingRecord>, StoreError> {
    let rows = store
        .select(Collection::Tracking, &scope_filters(scope), None)
        .await?;
    from_rows(rows)
}

pub async fn user_records(
    store: &dyn RecordStore,
    user: UserId,
    locked_only: bool,
) -> Result<Vec<TrackingRecord>, StoreError> {
    let mut filters = vec![Filter::eq("user_id", user)];
    if locked_only {
        filters.push(Filter::eq("locked", true));
    }
    let rows = store.select(Collection::Tracking, &filters, None).await?;
    from_rows(rows)
}

pub async fn insert_record(
    store: &dyn RecordStore,
    scope: DayScope,
    activity_id: Uuid,
    checked: bool,
) -> Result<TrackingRecord, StoreError> {
    let record = TrackingRecord {
        id: Uuid::new_v4(),
        user_id: scope.user,
        activity_id,
        date: scope.date,
        checked,
        locked: false,
    };
    let stored = store.insert(Collection::Tracking, to_row(&record)?).await?;
    from_row(stored)
}

pub async fn set_checked(
    store: &dyn RecordStore,
    record_id: Uuid,
    checked: bool,
) -> Result<(), StoreError> {
    store
        .update(
            Collection::Tracking,
            &[Filter::eq("id", record_id)],
            patch([("checked", json!(checked))]),
        )
        .await?;
    Ok(())
}

/// Sets `locked` on every record of the day. Returns how many were touched.
pub async fn set_day_locked(
    store: &dyn RecordStore,
    scope: DayScope,
    locked: bool,
) -> Result<usize, StoreError> {
    store
        .update(
            Collection::Tracking,
            &scope_filters(scope),
            patch([("locked", json!(locked))]),
        )
        .await
}

pub async fn delete_for_activity(
    store: &dyn RecordStore,
    user: UserId,
    activity_id: Uuid,
) -> Result<usize, StoreError> {
    store
        .delete(
            Collection::Tracking,
            &[
                Filter::eq("user_id", user),
                Filter::eq("activity_id", activity_id),
                Filter::eq("locked", false),
            ],
        )
        .await
}
