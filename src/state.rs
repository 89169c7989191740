use chrono::NaiveDate;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::TrackerError;
use crate::models::UserId;
use crate::store::RecordStore;
use crate::sync::{DayScope, SyncController};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub sessions: DaySessions,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            sessions: DaySessions::default(),
        }
    }

    pub async fn day(&self, user: UserId, date: NaiveDate) -> Result<SyncController, TrackerError> {
        self.sessions
            .controller(&self.store, DayScope { user, date })
            .await
    }
}

/// Open day controllers, one per user and date.
#[derive(Clone, Default)]
pub struct DaySessions {
    open: Arc<Mutex<HashMap<DayScope, SyncController>>>,
}

impl DaySessions {
    /// Returns the controller for `scope`, loading it on first use. Opening
    /// a newer day detaches the user's controllers for older days.
    pub async fn controller(
        &self,
        store: &Arc<dyn RecordStore>,
        scope: DayScope,
    ) -> Result<SyncController, TrackerError> {
        if let Some(controller) = self.open.lock().await.get(&scope).cloned() {
            return Ok(controller);
        }

        // Loaded outside the map lock.
        let controller = SyncController::load(Arc::clone(store), scope).await?;
        let mut open = self.open.lock().await;
        if let Some(existing) = open.get(&scope) {
            return Ok(existing.clone());
        }
        open.retain(|other, stale| {
            let keep = other.user != scope.user || other.date > scope.date;
            if !keep {
                debug!(user = %other.user, date = %other.date, "closing day");
                stale.detach();
            }
            keep
        });
        open.insert(scope, controller.clone());
        Ok(controller)
    }

    /// Drops every controller of `user` so the next request reloads from the store.
    pub async fn invalidate(&self, user: UserId) {
        let mut open = self.open.lock().await;
        open.retain(|scope, controller| {
            let keep = scope.user != user;
            if !keep {
                controller.detach();
            }
            keep
        });
    }
}
