use crate::errors::{AppError, TrackerError};
use crate::models::{
    Activity, ActivityPatch, ChecklistView, DayView, HistoryQuery, HistoryResponse, ListItem,
    NewActivity, NewList, NewListItem, ProgressInput, ProgressRequest, TodoList, UserId,
};
use crate::state::AppState;
use crate::sync::Mutation;
use crate::ui::render_index;
use crate::{activities, config, history, lists};
use axum::{
    Form, Json,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::{Html, Redirect},
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;

pub const USER_HEADER: &str = "x-user-id";

/// The signed-in user: the `x-user-id` header, or the store's current user.
pub struct Session(pub UserId);

#[axum::async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        if let Some(value) = parts.headers.get(USER_HEADER) {
            let value = value
                .to_str()
                .map_err(|_| AppError::bad_request("x-user-id is not valid text"))?;
            let user = config::parse_user(value).map_err(|err| AppError::bad_request(err.to_string()))?;
            return Ok(Session(user));
        }
        state
            .store
            .current_user()
            .map(Session)
            .ok_or_else(|| TrackerError::Auth.into())
    }
}

pub async fn index(
    State(state): State<AppState>,
    Session(user): Session,
) -> Result<Html<String>, AppError> {
    let day = state.day(user, today()).await?;
    Ok(Html(render_index(&day.snapshot())))
}

pub async fn get_today(
    State(state): State<AppState>,
    Session(user): Session,
) -> Result<Json<DayView>, AppError> {
    let day = state.day(user, today()).await?;
    Ok(Json(day.snapshot()))
}

pub async fn toggle(
    State(state): State<AppState>,
    Session(user): Session,
    Path(activity_id): Path<Uuid>,
) -> Result<Json<DayView>, AppError> {
    let day = state.day(user, today()).await?;
    reject_locked(day.toggle(activity_id).await?)?;
    Ok(Json(day.snapshot()))
}

pub async fn propose_progress(
    State(state): State<AppState>,
    Session(user): Session,
    Path(activity_id): Path<Uuid>,
    Json(payload): Json<ProgressRequest>,
) -> Result<Json<DayView>, AppError> {
    let day = state.day(user, today()).await?;
    reject_locked(day.propose_progress(activity_id, &payload.value)?)?;
    Ok(Json(day.snapshot()))
}

pub async fn commit_progress(
    State(state): State<AppState>,
    Session(user): Session,
    Path(activity_id): Path<Uuid>,
    Json(payload): Json<ProgressRequest>,
) -> Result<Json<DayView>, AppError> {
    let day = state.day(user, today()).await?;
    reject_locked(day.commit_progress(activity_id, &payload.value).await?)?;
    Ok(Json(day.snapshot()))
}

pub async fn lock_day(
    State(state): State<AppState>,
    Session(user): Session,
) -> Result<Json<DayView>, AppError> {
    let day = state.day(user, today()).await?;
    day.lock_day().await?;
    Ok(Json(day.snapshot()))
}

pub async fn unlock_day(
    State(state): State<AppState>,
    Session(user): Session,
) -> Result<Json<DayView>, AppError> {
    let day = state.day(user, today()).await?;
    day.unlock_day().await?;
    Ok(Json(day.snapshot()))
}

pub async fn list_activities(
    State(state): State<AppState>,
    Session(user): Session,
) -> Result<Json<Vec<Activity>>, AppError> {
    Ok(Json(activities::list_activities(state.store.as_ref(), user).await?))
}

pub async fn create_activity(
    State(state): State<AppState>,
    Session(user): Session,
    Json(payload): Json<NewActivity>,
) -> Result<(StatusCode, Json<Activity>), AppError> {
    let created = activities::create_activity(state.store.as_ref(), user, payload).await?;
    state.sessions.invalidate(user).await;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_activity(
    State(state): State<AppState>,
    Session(user): Session,
    Path(activity_id): Path<Uuid>,
    Json(payload): Json<ActivityPatch>,
) -> Result<Json<Activity>, AppError> {
    let updated = activities::update_activity(state.store.as_ref(), user, activity_id, payload).await?;
    state.sessions.invalidate(user).await;
    Ok(Json(updated))
}

pub async fn delete_activity(
    State(state): State<AppState>,
    Session(user): Session,
    Path(activity_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    activities::delete_activity(state.store.as_ref(), user, activity_id).await?;
    state.sessions.invalidate(user).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_history(
    State(state): State<AppState>,
    Session(user): Session,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let response = history::load_history(state.store.as_ref(), user, &query, today()).await?;
    Ok(Json(response))
}

pub async fn list_lists(
    State(state): State<AppState>,
    Session(user): Session,
) -> Result<Json<Vec<TodoList>>, AppError> {
    Ok(Json(lists::list_lists(state.store.as_ref(), user).await?))
}

pub async fn create_list(
    State(state): State<AppState>,
    Session(user): Session,
    Json(payload): Json<NewList>,
) -> Result<(StatusCode, Json<ChecklistView>), AppError> {
    let created = lists::create_list(state.store.as_ref(), user, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_list(
    State(state): State<AppState>,
    Session(user): Session,
    Path(list_id): Path<Uuid>,
) -> Result<Json<ChecklistView>, AppError> {
    Ok(Json(lists::list_detail(state.store.as_ref(), user, list_id).await?))
}

pub async fn delete_list(
    State(state): State<AppState>,
    Session(user): Session,
    Path(list_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    lists::delete_list(state.store.as_ref(), user, list_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_item(
    State(state): State<AppState>,
    Session(user): Session,
    Path(list_id): Path<Uuid>,
    Json(payload): Json<NewListItem>,
) -> Result<(StatusCode, Json<ListItem>), AppError> {
    let item = lists::add_item(state.store.as_ref(), user, list_id, payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn validate_item(
    State(state): State<AppState>,
    Session(user): Session,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    lists::validate_item(state.store.as_ref(), user, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_item(
    State(state): State<AppState>,
    Session(user): Session,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    lists::delete_item(state.store.as_ref(), user, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ProgressForm {
    #[serde(default)]
    value: String,
}

pub async fn toggle_form(
    State(state): State<AppState>,
    Session(user): Session,
    Path(activity_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    let day = state.day(user, today()).await?;
    day.toggle(activity_id).await?;
    Ok(Redirect::to("/"))
}

pub async fn progress_form(
    State(state): State<AppState>,
    Session(user): Session,
    Path(activity_id): Path<Uuid>,
    Form(form): Form<ProgressForm>,
) -> Result<Redirect, AppError> {
    let day = state.day(user, today()).await?;
    let input = ProgressInput(serde_json::Value::String(form.value));
    day.commit_progress(activity_id, &input).await?;
    Ok(Redirect::to("/"))
}

pub async fn lock_form(
    State(state): State<AppState>,
    Session(user): Session,
) -> Result<Redirect, AppError> {
    state.day(user, today()).await?.lock_day().await?;
    Ok(Redirect::to("/"))
}

pub async fn unlock_form(
    State(state): State<AppState>,
    Session(user): Session,
) -> Result<Redirect, AppError> {
    state.day(user, today()).await?.unlock_day().await?;
    Ok(Redirect::to("/"))
}

fn reject_locked(mutation: Mutation) -> Result<(), AppError> {
    match mutation {
        Mutation::Applied(_) => Ok(()),
        Mutation::Locked => Err(AppError {
            status: StatusCode::CONFLICT,
            message: "day is locked".into(),
        }),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
