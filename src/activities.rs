use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::errors::TrackerError;
use crate::models::{Activity, ActivityPatch, NewActivity, UserId, validate_target};
use crate::store::{
    Collection, Filter, Order, RecordStore, StoreError, from_row, from_rows, patch, to_row,
};
use crate::tracking;

fn owned(user: UserId, activity_id: Uuid) -> [Filter; 2] {
    [Filter::eq("id", activity_id), Filter::eq("user_id", user)]
}

/// The user's activities, earliest scheduled first and unscheduled last.
pub async fn list_activities(
    store: &dyn RecordStore,
    user: UserId,
) -> Result<Vec<Activity>, TrackerError> {
    let rows = store
        .select(
            Collection::Activities,
            &[Filter::eq("user_id", user)],
            Some(Order::asc("scheduled_at")),
        )
        .await
        .map_err(TrackerError::read("activities"))?;
    from_rows(rows).map_err(TrackerError::read("activities"))
}

pub async fn create_activity(
    store: &dyn RecordStore,
    user: UserId,
    new: NewActivity,
) -> Result<Activity, TrackerError> {
    new.validate()?;
    let activity = new.into_activity(user);
    let row = to_row(&activity).map_err(TrackerError::write("activity"))?;
    let stored = store
        .insert(Collection::Activities, row)
        .await
        .map_err(TrackerError::write("activity"))?;
    info!(activity = %activity.id, "created activity '{}'", activity.name);
    from_row(stored).map_err(TrackerError::read("activity"))
}

async fn find_activity(
    store: &dyn RecordStore,
    user: UserId,
    activity_id: Uuid,
) -> Result<Activity, TrackerError> {
    let rows = store
        .select(Collection::Activities, &owned(user, activity_id), None)
        .await
        .map_err(TrackerError::read("activity"))?;
    from_rows::<Activity>(rows)
        .map_err(TrackerError::read("activity"))?
        .into_iter()
        .next()
        .ok_or(TrackerError::NotFound("activity"))
}

/// Applies `changes` on top of the stored activity. The merged kind and
/// target are checked together, and stored progress is clamped into the new
/// target in the same write.
pub async fn update_activity(
    store: &dyn RecordStore,
    user: UserId,
    activity_id: Uuid,
    changes: ActivityPatch,
) -> Result<Activity, TrackerError> {
    changes.validate()?;
    let current = find_activity(store, user, activity_id).await?;
    let changes = changes.normalized();
    let kind = changes.kind.unwrap_or(current.kind);
    let target = changes.target_minutes.unwrap_or(current.target_minutes);
    validate_target(kind, target)?;

    let mut row = to_row(&changes).map_err(TrackerError::write("activity"))?;
    let progress = current.progress.min(target);
    if progress != current.progress {
        row.insert("progress".into(), json!(progress));
    }
    let touched = store
        .update(Collection::Activities, &owned(user, activity_id), row)
        .await
        .map_err(TrackerError::write("activity"))?;
    if touched == 0 {
        return Err(TrackerError::NotFound("activity"));
    }
    find_activity(store, user, activity_id).await
}

/// Removes the activity and its unlocked tracking rows. Locked days keep
/// their rows so history stays as it was finalized.
pub async fn delete_activity(
    store: &dyn RecordStore,
    user: UserId,
    activity_id: Uuid,
) -> Result<(), TrackerError> {
    let removed = store
        .delete(Collection::Activities, &owned(user, activity_id))
        .await
        .map_err(TrackerError::write("activity"))?;
    if removed == 0 {
        return Err(TrackerError::NotFound("activity"));
    }
    tracking::delete_for_activity(store, user, activity_id)
        .await
        .map_err(TrackerError::write("tracking records"))?;
    info!(activity = %activity_id, "deleted activity");
    Ok(())
}

pub async fn set_progress(
    store: &dyn RecordStore,
    user: UserId,
    activity_id: Uuid,
    minutes: u32,
) -> Result<(), StoreError> {
    store
        .update(
            Collection::Activities,
            &owned(user, activity_id),
            patch([("progress", json!(minutes))]),
        )
        .await?;
    Ok(())
}
