//! Local-first day controller.
//!
//! A [`SyncController`] owns the in-memory view of one user's day and keeps
//! it in step with the record store. Checked flips and progress changes are
//! applied locally first and written afterwards; the day lock is only
//! applied locally once the store has confirmed it.
//!
//! Writes for one activity are serialized through a per-activity slot and
//! always send the *current* local intent, read after the existing-record
//! lookup, so a burst of toggles collapses into at most one write. Each
//! write runs on its own task: dropping the caller does not cancel it.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::activities;
use crate::errors::TrackerError;
use crate::models::{
    Activity, ActivityKind, ActivityView, DayEntry, DayView, ProgressInput, UserId,
};
use crate::stats::compute_day_status;
use crate::store::RecordStore;
use crate::tracking;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayScope {
    pub user: UserId,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Applied(ActivityView),
    /// The day is locked; nothing changed.
    Locked,
}

/// Clamps a slider value into `[0, target]`.
pub fn clamp_progress(minutes: i64, target: u32) -> u32 {
    minutes.clamp(0, i64::from(target)) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flush {
    Written,
    Unchanged,
    Locked,
}

/// Last values the store is known to hold for an activity.
#[derive(Debug, Clone, Copy, Default)]
struct Confirmed {
    checked: bool,
    progress: u32,
}

#[derive(Debug, Clone)]
struct LocalActivity {
    activity: Activity,
    checked: bool,
    tracking_id: Option<Uuid>,
}

impl LocalActivity {
    fn view(&self) -> ActivityView {
        ActivityView {
            activity: self.activity.clone(),
            checked: self.checked,
            tracking_id: self.tracking_id,
            done: self.activity.is_done(self.checked),
        }
    }

    fn require_kind(&self, kind: ActivityKind) -> Result<(), TrackerError> {
        if self.activity.kind == kind {
            return Ok(());
        }
        let message = match kind {
            ActivityKind::Boolean => "duration activities are tracked through progress",
            ActivityKind::Duration => "only duration activities have progress",
        };
        Err(TrackerError::Validation(message.into()))
    }
}

#[derive(Debug, Default)]
struct LocalDay {
    locked: bool,
    activities: Vec<LocalActivity>,
}

impl LocalDay {
    fn get(&self, activity_id: Uuid) -> Result<&LocalActivity, TrackerError> {
        self.activities
            .iter()
            .find(|entry| entry.activity.id == activity_id)
            .ok_or(TrackerError::NotFound("activity"))
    }

    fn get_mut(&mut self, activity_id: Uuid) -> Result<&mut LocalActivity, TrackerError> {
        self.activities
            .iter_mut()
            .find(|entry| entry.activity.id == activity_id)
            .ok_or(TrackerError::NotFound("activity"))
    }
}

struct Inner {
    scope: DayScope,
    store: Arc<dyn RecordStore>,
    local: StdMutex<LocalDay>,
    slots: HashMap<Uuid, Arc<Mutex<Confirmed>>>,
    /// Activity writes hold it shared, lock/unlock exclusively.
    writes: RwLock<()>,
    attached: AtomicBool,
}

#[derive(Clone)]
pub struct SyncController {
    inner: Arc<Inner>,
}

impl SyncController {
    pub async fn load(store: Arc<dyn RecordStore>, scope: DayScope) -> Result<Self, TrackerError> {
        let activities = activities::list_activities(store.as_ref(), scope.user).await?;
        let records = tracking::day_records(store.as_ref(), scope)
            .await
            .map_err(TrackerError::read("tracking records"))?;

        let locked = records.iter().any(|record| record.locked);
        let by_activity: HashMap<Uuid, _> = records
            .iter()
            .map(|record| (record.activity_id, record))
            .collect();

        let mut slots = HashMap::with_capacity(activities.len());
        let mut local = Vec::with_capacity(activities.len());
        for activity in activities {
            let record = by_activity.get(&activity.id);
            let checked = record.is_some_and(|record| record.checked);
            slots.insert(
                activity.id,
                Arc::new(Mutex::new(Confirmed {
                    checked,
                    progress: activity.progress,
                })),
            );
            local.push(LocalActivity {
                tracking_id: record.map(|record| record.id),
                checked,
                activity,
            });
        }
        debug!(
            user = %scope.user,
            date = %scope.date,
            "loaded day with {} activities (locked: {locked})",
            local.len()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                scope,
                store,
                local: StdMutex::new(LocalDay {
                    locked,
                    activities: local,
                }),
                slots,
                writes: RwLock::new(()),
                attached: AtomicBool::new(true),
            }),
        })
    }

    pub fn scope(&self) -> DayScope {
        self.inner.scope
    }

    pub fn is_locked(&self) -> bool {
        self.inner.local().locked
    }

    /// Stops applying write results to the local view. Writes already in
    /// flight still complete against the store.
    pub fn detach(&self) {
        self.inner.attached.store(false, Ordering::SeqCst);
    }

    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::SeqCst)
    }

    /// The day as currently seen locally, with its completion status.
    pub fn snapshot(&self) -> DayView {
        let local = self.inner.local();
        let activities: Vec<ActivityView> = local.activities.iter().map(LocalActivity::view).collect();
        let entries: Vec<DayEntry> = local
            .activities
            .iter()
            .map(|entry| DayEntry {
                activity: Some(entry.activity.clone()),
                checked: entry.checked,
            })
            .collect();
        DayView {
            date: self.inner.scope.date,
            locked: local.locked,
            status: compute_day_status(self.inner.scope.date, &entries),
            activities,
        }
    }

    pub async fn toggle(&self, activity_id: Uuid) -> Result<Mutation, TrackerError> {
        {
            let mut local = self.inner.local();
            if local.locked {
                debug!(activity = %activity_id, "day is locked, ignoring toggle");
                return Ok(Mutation::Locked);
            }
            let entry = local.get_mut(activity_id)?;
            entry.require_kind(ActivityKind::Boolean)?;
            entry.checked = !entry.checked;
        }

        let inner = Arc::clone(&self.inner);
        let flushed = tokio::spawn(async move { inner.flush_checked(activity_id).await }).await??;
        self.inner.outcome(activity_id, flushed)
    }

    /// Moves the slider locally without writing anything.
    pub fn propose_progress(
        &self,
        activity_id: Uuid,
        input: &ProgressInput,
    ) -> Result<Mutation, TrackerError> {
        let mut local = self.inner.local();
        if local.locked {
            debug!(activity = %activity_id, "day is locked, ignoring progress");
            return Ok(Mutation::Locked);
        }
        let entry = local.get_mut(activity_id)?;
        entry.require_kind(ActivityKind::Duration)?;
        entry.activity.progress = clamp_progress(input.minutes(), entry.activity.target_minutes);
        Ok(Mutation::Applied(entry.view()))
    }

    /// Applies the released slider value locally and writes it to the store.
    pub async fn commit_progress(
        &self,
        activity_id: Uuid,
        input: &ProgressInput,
    ) -> Result<Mutation, TrackerError> {
        if let Mutation::Locked = self.propose_progress(activity_id, input)? {
            return Ok(Mutation::Locked);
        }

        let inner = Arc::clone(&self.inner);
        let flushed = tokio::spawn(async move { inner.flush_progress(activity_id).await }).await??;
        self.inner.outcome(activity_id, flushed)
    }

    pub async fn lock_day(&self) -> Result<(), TrackerError> {
        self.set_locked(true).await
    }

    pub async fn unlock_day(&self) -> Result<(), TrackerError> {
        self.set_locked(false).await
    }

    async fn set_locked(&self, locked: bool) -> Result<(), TrackerError> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.write_lock(locked).await }).await?
    }
}

impl Inner {
    fn local(&self) -> MutexGuard<'_, LocalDay> {
        self.local.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Runs `change` against the local view unless the controller was detached.
    fn apply(&self, change: impl FnOnce(&mut LocalDay)) {
        if self.attached() {
            change(&mut self.local());
        }
    }

    fn slot(&self, activity_id: Uuid) -> Result<Arc<Mutex<Confirmed>>, TrackerError> {
        self.slots
            .get(&activity_id)
            .cloned()
            .ok_or(TrackerError::NotFound("activity"))
    }

    fn outcome(&self, activity_id: Uuid, flushed: Flush) -> Result<Mutation, TrackerError> {
        match flushed {
            Flush::Locked => Ok(Mutation::Locked),
            Flush::Written | Flush::Unchanged => {
                Ok(Mutation::Applied(self.local().get(activity_id)?.view()))
            }
        }
    }

    async fn flush_checked(&self, activity_id: Uuid) -> Result<Flush, TrackerError> {
        let slot = self.slot(activity_id)?;
        let mut confirmed = slot.lock().await;
        let _writes = self.writes.read().await;

        let result = self.write_checked(activity_id, &mut confirmed).await;
        let revert_to = confirmed.checked;
        let reverted = match &result {
            Ok(Flush::Locked) => {
                debug!(activity = %activity_id, "day locked before write, dropping toggle");
                true
            }
            Err(err) => {
                warn!(activity = %activity_id, "reverting toggle: {err}");
                true
            }
            Ok(_) => false,
        };
        if !reverted {
            return result;
        }
        self.apply(|local| {
            if let Ok(entry) = local.get_mut(activity_id) {
                entry.checked = revert_to;
            }
        });
        result
    }

    async fn write_checked(
        &self,
        activity_id: Uuid,
        confirmed: &mut Confirmed,
    ) -> Result<Flush, TrackerError> {
        let store = self.store.as_ref();
        let existing = tracking::find_record(store, self.scope, activity_id)
            .await
            .map_err(TrackerError::write("tracking record"))?;

        let intended = {
            let local = self.local();
            if local.locked {
                return Ok(Flush::Locked);
            }
            local.get(activity_id)?.checked
        };
        if intended == confirmed.checked {
            return Ok(Flush::Unchanged);
        }

        let record_id = match existing {
            Some(record) => {
                tracking::set_checked(store, record.id, intended)
                    .await
                    .map_err(TrackerError::write("tracking record"))?;
                record.id
            }
            None => {
                tracking::insert_record(store, self.scope, activity_id, intended)
                    .await
                    .map_err(TrackerError::write("tracking record"))?
                    .id
            }
        };
        confirmed.checked = intended;
        self.apply(|local| {
            if let Ok(entry) = local.get_mut(activity_id) {
                entry.tracking_id = Some(record_id);
            }
        });
        debug!(activity = %activity_id, "saved checked = {intended}");
        Ok(Flush::Written)
    }

    async fn flush_progress(&self, activity_id: Uuid) -> Result<Flush, TrackerError> {
        let slot = self.slot(activity_id)?;
        let mut confirmed = slot.lock().await;
        let _writes = self.writes.read().await;

        let result = self.write_progress(activity_id, &mut confirmed).await;
        let revert_to = confirmed.progress;
        let reverted = match &result {
            Ok(Flush::Locked) => {
                debug!(activity = %activity_id, "day locked before write, dropping progress");
                true
            }
            Err(err) => {
                warn!(activity = %activity_id, "reverting progress: {err}");
                true
            }
            Ok(_) => false,
        };
        if !reverted {
            return result;
        }
        self.apply(|local| {
            if let Ok(entry) = local.get_mut(activity_id) {
                entry.activity.progress = revert_to;
            }
        });
        result
    }

    async fn write_progress(
        &self,
        activity_id: Uuid,
        confirmed: &mut Confirmed,
    ) -> Result<Flush, TrackerError> {
        let intended = {
            let local = self.local();
            if local.locked {
                return Ok(Flush::Locked);
            }
            local.get(activity_id)?.activity.progress
        };
        if intended == confirmed.progress {
            return Ok(Flush::Unchanged);
        }

        activities::set_progress(self.store.as_ref(), self.scope.user, activity_id, intended)
            .await
            .map_err(TrackerError::write("progress"))?;
        confirmed.progress = intended;
        debug!(activity = %activity_id, "saved progress = {intended}");
        Ok(Flush::Written)
    }

    async fn write_lock(&self, locked: bool) -> Result<(), TrackerError> {
        let _writes = self.writes.write().await;
        let store = self.store.as_ref();

        // A locked day gets a row for every activity so that history sees
        // the whole day, not just the activities that were touched.
        let mut materialized = Vec::new();
        if locked {
            let existing: HashSet<Uuid> = tracking::day_records(store, self.scope)
                .await
                .map_err(TrackerError::write("day lock"))?
                .into_iter()
                .map(|record| record.activity_id)
                .collect();
            let missing: Vec<Uuid> = self
                .local()
                .activities
                .iter()
                .map(|entry| entry.activity.id)
                .filter(|id| !existing.contains(id))
                .collect();
            for activity_id in missing {
                let record = tracking::insert_record(store, self.scope, activity_id, false)
                    .await
                    .map_err(TrackerError::write("day lock"))?;
                materialized.push((activity_id, record.id));
            }
        }

        let touched = tracking::set_day_locked(store, self.scope, locked)
            .await
            .map_err(TrackerError::write("day lock"))?;
        // Lock state lives on the records, so a day without any cannot be locked.
        if locked && touched == 0 {
            return Err(TrackerError::Validation(
                "a day without activities cannot be locked".into(),
            ));
        }
        self.apply(|local| {
            local.locked = locked;
            for (activity_id, record_id) in materialized {
                if let Ok(entry) = local.get_mut(activity_id) {
                    entry.tracking_id.get_or_insert(record_id);
                }
            }
        });
        info!(
            user = %self.scope.user,
            date = %self.scope.date,
            "day {} ({touched} records)",
            if locked { "locked" } else { "unlocked" }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewActivity;
    use crate::storage::JsonStore;
    use crate::store::{Collection, Filter, Order, Row, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Wraps an in-memory store, counting writes and optionally failing them.
    struct CountingStore {
        inner: JsonStore,
        fail_writes: AtomicBool,
        inserts: AtomicUsize,
        updates: StdMutex<Vec<(Collection, Row)>>,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: JsonStore::in_memory(None),
                fail_writes: AtomicBool::new(false),
                inserts: AtomicUsize::new(0),
                updates: StdMutex::new(Vec::new()),
            }
        }

        fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        fn writes(&self) -> usize {
            self.inserts.load(Ordering::SeqCst) + self.updates.lock().unwrap().len()
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("injected failure".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RecordStore for CountingStore {
        async fn select(
            &self,
            collection: Collection,
            filters: &[Filter],
            order: Option<Order>,
        ) -> Result<Vec<Row>, StoreError> {
            self.inner.select(collection, filters, order).await
        }

        async fn insert(&self, collection: Collection, row: Row) -> Result<Row, StoreError> {
            self.check()?;
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.inner.insert(collection, row).await
        }

        async fn update(
            &self,
            collection: Collection,
            filters: &[Filter],
            patch: Row,
        ) -> Result<usize, StoreError> {
            self.check()?;
            self.updates.lock().unwrap().push((collection, patch.clone()));
            self.inner.update(collection, filters, patch).await
        }

        async fn delete(
            &self,
            collection: Collection,
            filters: &[Filter],
        ) -> Result<usize, StoreError> {
            self.check()?;
            self.inner.delete(collection, filters).await
        }

        fn current_user(&self) -> Option<UserId> {
            None
        }
    }

    struct Fixture {
        store: Arc<CountingStore>,
        scope: DayScope,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(CountingStore::new()),
                scope: DayScope {
                    user: UserId(Uuid::new_v4()),
                    date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                },
            }
        }

        async fn activity(&self, name: &str, kind: ActivityKind, target_minutes: u32) -> Uuid {
            let new = NewActivity {
                name: name.into(),
                scheduled_at: None,
                kind,
                target_minutes,
                description: None,
            };
            let created = activities::create_activity(self.store.as_ref(), self.scope.user, new)
                .await
                .unwrap();
            self.store.inserts.store(0, Ordering::SeqCst);
            created.id
        }

        async fn controller(&self) -> SyncController {
            let store: Arc<dyn RecordStore> = self.store.clone();
            SyncController::load(store, self.scope).await.unwrap()
        }

        async fn records(&self) -> Vec<crate::models::TrackingRecord> {
            tracking::day_records(self.store.as_ref(), self.scope)
                .await
                .unwrap()
        }

        fn view(&self, controller: &SyncController, id: Uuid) -> ActivityView {
            controller
                .snapshot()
                .activities
                .into_iter()
                .find(|view| view.activity.id == id)
                .unwrap()
        }
    }

    #[test]
    fn clamp_keeps_values_in_range() {
        assert_eq!(clamp_progress(-10, 60), 0);
        assert_eq!(clamp_progress(90, 60), 60);
        assert_eq!(clamp_progress(45, 60), 45);
        assert_eq!(clamp_progress(5, 0), 0);
        let once = clamp_progress(120, 60);
        assert_eq!(clamp_progress(i64::from(once), 60), once);
    }

    #[tokio::test]
    async fn toggle_inserts_then_updates_a_single_record() {
        let fx = Fixture::new();
        let id = fx.activity("Meditate", ActivityKind::Boolean, 0).await;
        let controller = fx.controller().await;

        let first = controller.toggle(id).await.unwrap();
        assert!(matches!(first, Mutation::Applied(ref view) if view.checked && view.done));
        let records = fx.records().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].checked);
        assert!(!records[0].locked);

        controller.toggle(id).await.unwrap();
        let records = fx.records().await;
        assert_eq!(records.len(), 1);
        assert!(!records[0].checked);
        assert_eq!(fx.store.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rapid_double_toggle_settles_without_writes() {
        let fx = Fixture::new();
        let id = fx.activity("Meditate", ActivityKind::Boolean, 0).await;
        let controller = fx.controller().await;

        let (first, second) = tokio::join!(controller.toggle(id), controller.toggle(id));
        first.unwrap();
        second.unwrap();

        assert!(!fx.view(&controller, id).checked);
        assert_eq!(fx.store.writes(), 0);
        assert!(fx.records().await.is_empty());
    }

    #[tokio::test]
    async fn triple_toggle_writes_final_state_once() {
        let fx = Fixture::new();
        let id = fx.activity("Meditate", ActivityKind::Boolean, 0).await;
        let controller = fx.controller().await;

        let (a, b, c) = tokio::join!(
            controller.toggle(id),
            controller.toggle(id),
            controller.toggle(id)
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert!(fx.view(&controller, id).checked);
        assert_eq!(fx.store.writes(), 1);
        let records = fx.records().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].checked);
    }

    #[tokio::test]
    async fn failed_toggle_reverts_local_state() {
        let fx = Fixture::new();
        let id = fx.activity("Meditate", ActivityKind::Boolean, 0).await;
        let controller = fx.controller().await;

        fx.store.fail_writes(true);
        let err = controller.toggle(id).await.unwrap_err();
        assert!(matches!(err, TrackerError::RemoteWrite { .. }));
        assert!(!fx.view(&controller, id).checked);

        fx.store.fail_writes(false);
        controller.toggle(id).await.unwrap();
        assert!(fx.view(&controller, id).checked);
        assert_eq!(fx.records().await.len(), 1);
    }

    #[tokio::test]
    async fn toggle_rejects_duration_activities() {
        let fx = Fixture::new();
        let id = fx.activity("Read", ActivityKind::Duration, 30).await;
        let controller = fx.controller().await;

        let err = controller.toggle(id).await.unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
        assert!(!fx.view(&controller, id).checked);
    }

    #[tokio::test]
    async fn unknown_activity_is_not_found() {
        let fx = Fixture::new();
        let controller = fx.controller().await;
        let err = controller.toggle(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
    }

    #[tokio::test]
    async fn dragging_commits_only_the_released_value() {
        let fx = Fixture::new();
        let id = fx.activity("Read", ActivityKind::Duration, 60).await;
        let controller = fx.controller().await;

        let proposed = controller.propose_progress(id, &ProgressInput::from(90)).unwrap();
        assert!(matches!(proposed, Mutation::Applied(ref view) if view.activity.progress == 60));
        assert_eq!(fx.store.writes(), 0);

        let committed = controller
            .commit_progress(id, &ProgressInput::from(45))
            .await
            .unwrap();
        assert!(matches!(committed, Mutation::Applied(ref view) if view.activity.progress == 45));

        let updates = fx.store.updates.lock().unwrap().clone();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, Collection::Activities);
        assert_eq!(updates[0].1.get("progress"), Some(&serde_json::json!(45)));

        let stored = activities::list_activities(fx.store.as_ref(), fx.scope.user)
            .await
            .unwrap();
        assert_eq!(stored[0].progress, 45);
    }

    #[tokio::test]
    async fn progress_input_is_clamped_and_idempotent() {
        let fx = Fixture::new();
        let id = fx.activity("Read", ActivityKind::Duration, 60).await;
        let controller = fx.controller().await;

        for raw in [
            ProgressInput::from(-3),
            ProgressInput(serde_json::json!("nope")),
            ProgressInput(serde_json::Value::Null),
        ] {
            let first = controller.propose_progress(id, &raw).unwrap();
            let again = controller.propose_progress(id, &raw).unwrap();
            assert_eq!(first, again);
            assert_eq!(fx.view(&controller, id).activity.progress, 0);
        }
        controller.propose_progress(id, &ProgressInput::from(600)).unwrap();
        controller.propose_progress(id, &ProgressInput::from(600)).unwrap();
        assert_eq!(fx.view(&controller, id).activity.progress, 60);
        assert!(fx.view(&controller, id).done);
    }

    #[tokio::test]
    async fn failed_commit_reverts_to_stored_progress() {
        let fx = Fixture::new();
        let id = fx.activity("Read", ActivityKind::Duration, 60).await;
        let controller = fx.controller().await;
        controller
            .commit_progress(id, &ProgressInput::from(20))
            .await
            .unwrap();

        fx.store.fail_writes(true);
        let err = controller
            .commit_progress(id, &ProgressInput::from(50))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::RemoteWrite { .. }));
        assert_eq!(fx.view(&controller, id).activity.progress, 20);
    }

    #[tokio::test]
    async fn locked_day_ignores_mutations() {
        let fx = Fixture::new();
        let walk = fx.activity("Walk", ActivityKind::Boolean, 0).await;
        let read = fx.activity("Read", ActivityKind::Duration, 60).await;
        let controller = fx.controller().await;

        controller.lock_day().await.unwrap();
        assert!(controller.is_locked());
        let writes_after_lock = fx.store.writes();

        assert_eq!(controller.toggle(walk).await.unwrap(), Mutation::Locked);
        assert_eq!(
            controller.propose_progress(read, &ProgressInput::from(10)).unwrap(),
            Mutation::Locked
        );
        assert_eq!(
            controller
                .commit_progress(read, &ProgressInput::from(10))
                .await
                .unwrap(),
            Mutation::Locked
        );

        assert_eq!(fx.store.writes(), writes_after_lock);
        assert!(!fx.view(&controller, walk).checked);
        assert_eq!(fx.view(&controller, read).activity.progress, 0);
    }

    #[tokio::test]
    async fn lock_then_unlock_allows_mutation_again() {
        let fx = Fixture::new();
        let walk = fx.activity("Walk", ActivityKind::Boolean, 0).await;
        let controller = fx.controller().await;

        controller.lock_day().await.unwrap();
        controller.unlock_day().await.unwrap();
        assert!(!controller.is_locked());

        let toggled = controller.toggle(walk).await.unwrap();
        assert!(matches!(toggled, Mutation::Applied(ref view) if view.checked));
        let records = fx.records().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].checked);
        assert!(!records[0].locked);
    }

    #[tokio::test]
    async fn lock_marks_every_activity_of_the_day() {
        let fx = Fixture::new();
        let walk = fx.activity("Walk", ActivityKind::Boolean, 0).await;
        fx.activity("Read", ActivityKind::Duration, 60).await;
        let controller = fx.controller().await;
        controller.toggle(walk).await.unwrap();

        controller.lock_day().await.unwrap();

        let records = fx.records().await;
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|record| record.locked));

        let reloaded = fx.controller().await;
        assert!(reloaded.is_locked());
        assert_eq!(reloaded.snapshot().status.done, 1);
    }

    #[tokio::test]
    async fn failed_lock_leaves_day_unlocked() {
        let fx = Fixture::new();
        fx.activity("Walk", ActivityKind::Boolean, 0).await;
        let controller = fx.controller().await;

        fx.store.fail_writes(true);
        assert!(controller.lock_day().await.is_err());
        assert!(!controller.is_locked());
    }

    #[tokio::test]
    async fn empty_day_refuses_to_lock() {
        let fx = Fixture::new();
        let controller = fx.controller().await;

        let err = controller.lock_day().await.unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
        assert!(!controller.is_locked());
        assert!(!fx.controller().await.is_locked());
    }

    #[tokio::test]
    async fn snapshot_reflects_local_changes() {
        let fx = Fixture::new();
        let a = fx.activity("A", ActivityKind::Boolean, 0).await;
        let b = fx.activity("B", ActivityKind::Boolean, 0).await;
        fx.activity("C", ActivityKind::Boolean, 0).await;
        let controller = fx.controller().await;

        controller.toggle(a).await.unwrap();
        controller.toggle(b).await.unwrap();

        let status = controller.snapshot().status;
        assert_eq!((status.total, status.done, status.percent), (3, 2, 67));
    }

    #[tokio::test]
    async fn detached_controller_keeps_writing_but_stops_updating() {
        let fx = Fixture::new();
        let id = fx.activity("Walk", ActivityKind::Boolean, 0).await;
        let controller = fx.controller().await;

        controller.detach();
        assert!(!controller.is_attached());
        fx.store.fail_writes(true);
        assert!(controller.toggle(id).await.is_err());
        assert!(fx.view(&controller, id).checked);

        fx.store.fail_writes(false);
        let fresh = fx.controller().await;
        fresh.detach();
        fresh.toggle(id).await.unwrap();
        let records = fx.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(fx.view(&fresh, id).tracking_id, None);
    }

    #[tokio::test]
    async fn dropping_the_caller_does_not_cancel_the_write() {
        let fx = Fixture::new();
        let id = fx.activity("Walk", ActivityKind::Boolean, 0).await;
        let controller = fx.controller().await;

        {
            let pending = controller.toggle(id);
            tokio::pin!(pending);
            tokio::select! {
                biased;
                _ = &mut pending => panic!("toggle finished before the write task ran"),
                _ = std::future::ready(()) => {}
            }
        }
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        let records = fx.records().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].checked);
    }
}
