use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::errors::TrackerError;
use crate::models::{ChecklistView, ListItem, NewList, NewListItem, TodoList, UserId};
use crate::store::{Collection, Filter, Order, RecordStore, from_rows, patch, to_row};

fn owned(user: UserId, id: Uuid) -> [Filter; 2] {
    [Filter::eq("id", id), Filter::eq("user_id", user)]
}

pub async fn list_lists(store: &dyn RecordStore, user: UserId) -> Result<Vec<TodoList>, TrackerError> {
    let rows = store
        .select(
            Collection::Lists,
            &[Filter::eq("user_id", user)],
            Some(Order::asc("created_at")),
        )
        .await
        .map_err(TrackerError::read("lists"))?;
    from_rows(rows).map_err(TrackerError::read("lists"))
}

async fn find_list(
    store: &dyn RecordStore,
    user: UserId,
    list_id: Uuid,
) -> Result<TodoList, TrackerError> {
    let rows = store
        .select(Collection::Lists, &owned(user, list_id), None)
        .await
        .map_err(TrackerError::read("list"))?;
    from_rows::<TodoList>(rows)
        .map_err(TrackerError::read("list"))?
        .into_iter()
        .next()
        .ok_or(TrackerError::NotFound("list"))
}

/// Creates the list and one item per non-blank label.
pub async fn create_list(
    store: &dyn RecordStore,
    user: UserId,
    new: NewList,
) -> Result<ChecklistView, TrackerError> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation("list name is required".into()));
    }

    let list = TodoList {
        id: Uuid::new_v4(),
        user_id: user,
        name: name.to_string(),
        frequency: new.frequency,
    };
    let row = to_row(&list).map_err(TrackerError::write("list"))?;
    store
        .insert(Collection::Lists, row)
        .await
        .map_err(TrackerError::write("list"))?;

    let mut pending = Vec::new();
    for label in new.items.iter().map(|label| label.trim()).filter(|label| !label.is_empty()) {
        let item = ListItem {
            id: Uuid::new_v4(),
            user_id: user,
            list_id: list.id,
            name: label.to_string(),
            description: None,
            checked: false,
        };
        let row = to_row(&item).map_err(TrackerError::write("list item"))?;
        store
            .insert(Collection::ListItems, row)
            .await
            .map_err(TrackerError::write("list item"))?;
        pending.push(item);
    }
    info!(list = %list.id, "created list '{}' with {} items", list.name, pending.len());

    Ok(ChecklistView {
        list,
        pending,
        validated: Vec::new(),
    })
}

/// The list with its items split into pending and validated, oldest first.
pub async fn list_detail(
    store: &dyn RecordStore,
    user: UserId,
    list_id: Uuid,
) -> Result<ChecklistView, TrackerError> {
    let list = find_list(store, user, list_id).await?;
    let rows = store
        .select(
            Collection::ListItems,
            &[Filter::eq("user_id", user), Filter::eq("list_id", list_id)],
            Some(Order::asc("created_at")),
        )
        .await
        .map_err(TrackerError::read("list items"))?;
    let (validated, pending) = from_rows::<ListItem>(rows)
        .map_err(TrackerError::read("list items"))?
        .into_iter()
        .partition(|item| item.checked);

    Ok(ChecklistView {
        list,
        pending,
        validated,
    })
}

pub async fn delete_list(store: &dyn RecordStore, user: UserId, list_id: Uuid) -> Result<(), TrackerError> {
    let removed = store
        .delete(Collection::Lists, &owned(user, list_id))
        .await
        .map_err(TrackerError::write("list"))?;
    if removed == 0 {
        return Err(TrackerError::NotFound("list"));
    }
    store
        .delete(
            Collection::ListItems,
            &[Filter::eq("user_id", user), Filter::eq("list_id", list_id)],
        )
        .await
        .map_err(TrackerError::write("list items"))?;
    Ok(())
}

pub async fn add_item(
    store: &dyn RecordStore,
    user: UserId,
    list_id: Uuid,
    new: NewListItem,
) -> Result<ListItem, TrackerError> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation("item name is required".into()));
    }
    find_list(store, user, list_id).await?;

    let item = ListItem {
        id: Uuid::new_v4(),
        user_id: user,
        list_id,
        name: name.to_string(),
        description: new
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()),
        checked: false,
    };
    let row = to_row(&item).map_err(TrackerError::write("list item"))?;
    store
        .insert(Collection::ListItems, row)
        .await
        .map_err(TrackerError::write("list item"))?;
    Ok(item)
}

/// Marks the item validated. It stays in the list, in the validated group.
pub async fn validate_item(
    store: &dyn RecordStore,
    user: UserId,
    item_id: Uuid,
) -> Result<(), TrackerError> {
    let touched = store
        .update(
            Collection::ListItems,
            &owned(user, item_id),
            patch([("checked", json!(true))]),
        )
        .await
        .map_err(TrackerError::write("list item"))?;
    if touched == 0 {
        return Err(TrackerError::NotFound("list item"));
    }
    Ok(())
}

pub async fn delete_item(store: &dyn RecordStore, user: UserId, item_id: Uuid) -> Result<(), TrackerError> {
    let removed = store
        .delete(Collection::ListItems, &owned(user, item_id))
        .await
        .map_err(TrackerError::write("list item"))?;
    if removed == 0 {
        return Err(TrackerError::NotFound("list item"));
    }
    Ok(())
}
