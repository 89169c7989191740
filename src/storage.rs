use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::{fs, sync::Mutex};
use tracing::{debug, error};
use uuid::Uuid;

use crate::models::UserId;
use crate::store::{Collection, Filter, Order, RecordStore, Row, StoreError, matches_all};

type Tables = BTreeMap<Collection, Vec<Row>>;

/// Fields that together identify a tracking row.
const TRACKING_KEY: [&str; 3] = ["user_id", "activity_id", "date"];

/// Record store kept in memory and written out as a JSON document after
/// every mutation. Without a path it never touches the disk.
pub struct JsonStore {
    path: Option<PathBuf>,
    user: Option<UserId>,
    tables: Mutex<Tables>,
}

impl JsonStore {
    pub async fn open(path: &Path, user: Option<UserId>) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            user,
            tables: Mutex::new(load_tables(path).await),
        }
    }

    pub fn in_memory(user: Option<UserId>) -> Self {
        Self {
            path: None,
            user,
            tables: Mutex::new(Tables::new()),
        }
    }

    async fn persist(&self, tables: &Tables) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let payload = serde_json::to_vec_pretty(tables)?;
        fs::write(path, payload).await.map_err(|err| {
            error!("failed to write data file {}: {err}", path.display());
            StoreError::Io(err)
        })
    }

    /// Swaps `rows` in for `collection` and writes the file. A failed write
    /// puts the previous rows back.
    async fn commit(
        &self,
        tables: &mut Tables,
        collection: Collection,
        rows: Vec<Row>,
    ) -> Result<(), StoreError> {
        let previous = tables.insert(collection, rows);
        if let Err(err) = self.persist(tables).await {
            match previous {
                Some(rows) => {
                    tables.insert(collection, rows);
                }
                None => {
                    tables.remove(&collection);
                }
            }
            return Err(err);
        }
        Ok(())
    }
}

async fn load_tables(path: &Path) -> Tables {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(tables) => tables,
            Err(err) => {
                error!("failed to parse data file: {err}");
                Tables::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Tables::new(),
        Err(err) => {
            error!("failed to read data file: {err}");
            Tables::new()
        }
    }
}

fn key_of(row: &Row) -> Vec<&Value> {
    TRACKING_KEY
        .iter()
        .map(|field| row.get(*field).unwrap_or(&Value::Null))
        .collect()
}

fn check_unique(
    collection: Collection,
    rows: &[Row],
    candidate: &Row,
    skip: Option<usize>,
) -> Result<(), StoreError> {
    if collection != Collection::Tracking {
        return Ok(());
    }
    let key = key_of(candidate);
    let clash = rows
        .iter()
        .enumerate()
        .any(|(idx, row)| Some(idx) != skip && key_of(row) == key);
    if clash {
        let key = key
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join("/");
        return Err(StoreError::Conflict {
            collection: collection.name(),
            key,
        });
    }
    Ok(())
}

#[async_trait]
impl RecordStore for JsonStore {
    async fn select(
        &self,
        collection: Collection,
        filters: &[Filter],
        order: Option<Order>,
    ) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Row> = tables
            .get(&collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(filters, row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(order) = order {
            rows.sort_by(|a, b| order.compare(a, b));
        }
        Ok(rows)
    }

    async fn insert(&self, collection: Collection, mut row: Row) -> Result<Row, StoreError> {
        let mut tables = self.tables.lock().await;
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at").or_insert_with(|| {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true))
        });

        let mut rows = tables.get(&collection).cloned().unwrap_or_default();
        check_unique(collection, &rows, &row, None)?;
        rows.push(row.clone());

        self.commit(&mut tables, collection, rows).await?;
        debug!("inserted row into {}", collection.name());
        Ok(row)
    }

    async fn update(
        &self,
        collection: Collection,
        filters: &[Filter],
        patch: Row,
    ) -> Result<usize, StoreError> {
        let mut tables = self.tables.lock().await;
        let mut rows = tables.get(&collection).cloned().unwrap_or_default();

        let targets: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches_all(filters, row))
            .map(|(idx, _)| idx)
            .collect();

        let mut staged = Vec::with_capacity(targets.len());
        for &idx in &targets {
            let mut updated = rows[idx].clone();
            updated.extend(patch.clone());
            check_unique(collection, &rows, &updated, Some(idx))?;
            staged.push((idx, updated));
        }
        for (idx, updated) in staged {
            rows[idx] = updated;
        }

        if !targets.is_empty() {
            self.commit(&mut tables, collection, rows).await?;
        }
        debug!("updated {} row(s) in {}", targets.len(), collection.name());
        Ok(targets.len())
    }

    async fn delete(&self, collection: Collection, filters: &[Filter]) -> Result<usize, StoreError> {
        let mut tables = self.tables.lock().await;
        let mut rows = tables.get(&collection).cloned().unwrap_or_default();
        let before = rows.len();
        rows.retain(|row| !matches_all(filters, row));
        let removed = before - rows.len();

        if removed > 0 {
            self.commit(&mut tables, collection, rows).await?;
        }
        debug!("deleted {removed} row(s) from {}", collection.name());
        Ok(removed)
    }

    fn current_user(&self) -> Option<UserId> {
        self.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::patch;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(row) => row,
            _ => unreachable!(),
        }
    }

    fn unique_data_path() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("habit_tracker_store_{}.json", Uuid::new_v4()));
        path
    }

    #[tokio::test]
    async fn insert_fills_id_and_created_at() {
        let store = JsonStore::in_memory(None);
        let stored = store
            .insert(Collection::Lists, row(json!({ "name": "Groceries" })))
            .await
            .unwrap();
        assert!(stored.get("id").and_then(Value::as_str).is_some());
        assert!(stored.get("created_at").and_then(Value::as_str).is_some());
    }

    #[tokio::test]
    async fn tracking_rows_are_unique_per_user_activity_and_date() {
        let store = JsonStore::in_memory(None);
        let record = json!({
            "user_id": "u", "activity_id": "a", "date": "2026-02-01", "checked": true
        });
        store
            .insert(Collection::Tracking, row(record.clone()))
            .await
            .unwrap();
        let err = store
            .insert(Collection::Tracking, row(record))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        let other_day = json!({
            "user_id": "u", "activity_id": "a", "date": "2026-02-02", "checked": true
        });
        assert!(store.insert(Collection::Tracking, row(other_day)).await.is_ok());
    }

    #[tokio::test]
    async fn update_and_delete_touch_only_matching_rows() {
        let store = JsonStore::in_memory(None);
        for (name, list) in [("milk", "a"), ("eggs", "a"), ("nails", "b")] {
            store
                .insert(
                    Collection::ListItems,
                    row(json!({ "name": name, "list_id": list, "checked": false })),
                )
                .await
                .unwrap();
        }

        let touched = store
            .update(
                Collection::ListItems,
                &[Filter::eq("list_id", "a")],
                patch([("checked", json!(true))]),
            )
            .await
            .unwrap();
        assert_eq!(touched, 2);

        let checked = store
            .select(Collection::ListItems, &[Filter::eq("checked", true)], None)
            .await
            .unwrap();
        assert_eq!(checked.len(), 2);

        let removed = store
            .delete(Collection::ListItems, &[Filter::eq("list_id", "b")])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        let left = store
            .select(Collection::ListItems, &[], Some(Order::asc("name")))
            .await
            .unwrap();
        let names: Vec<_> = left.iter().map(|row| row["name"].clone()).collect();
        assert_eq!(names, vec![json!("eggs"), json!("milk")]);
    }

    #[tokio::test]
    async fn reopening_reads_persisted_rows() {
        let path = unique_data_path();
        let store = JsonStore::open(&path, None).await;
        store
            .insert(Collection::Activities, row(json!({ "name": "Walk" })))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonStore::open(&path, None).await;
        let rows = reopened
            .select(Collection::Activities, &[], None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("Walk"));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn failed_write_leaves_rows_untouched() {
        let dir = std::env::temp_dir().join(format!("habit_tracker_dir_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = JsonStore::open(&dir, None).await;

        let err = store
            .insert(Collection::Activities, row(json!({ "name": "Walk" })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        let rows = store.select(Collection::Activities, &[], None).await.unwrap();
        assert!(rows.is_empty());

        store.tables.lock().await.insert(
            Collection::Tracking,
            vec![row(json!({ "id": "t", "checked": false }))],
        );
        assert!(
            store
                .update(
                    Collection::Tracking,
                    &[Filter::eq("id", "t")],
                    patch([("checked", json!(true))]),
                )
                .await
                .is_err()
        );
        assert!(
            store
                .delete(Collection::Tracking, &[Filter::eq("id", "t")])
                .await
                .is_err()
        );
        let rows = store.select(Collection::Tracking, &[], None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["checked"], json!(false));
        let _ = std::fs::remove_dir(dir);
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let path = unique_data_path();
        std::fs::write(&path, b"not json").unwrap();
        let store = JsonStore::open(&path, None).await;
        let rows = store.select(Collection::Tracking, &[], None).await.unwrap();
        assert!(rows.is_empty());
        let _ = std::fs::remove_file(path);
    }
}
