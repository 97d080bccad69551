use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use validator::Validate;

use crate::auth::OptionalCaller;
use crate::db::Repository;
use crate::models::event::{
    validate_event_date, Event, EventChanges, EventId, EventInput, EventPatch, EventView,
    FavoriteStatus,
};
use crate::models::user::UserId;
use crate::policy::{authorize, require_caller, EventAction};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::{created, Created};

type EventPath = Result<Path<EventId>, PathRejection>;

fn views(events: Vec<Event>, caller: Option<UserId>) -> Vec<EventView> {
    events
        .into_iter()
        .map(|event| EventView::for_caller(event, caller))
        .collect()
}

async fn load_event(repo: &dyn Repository, id: EventId) -> AppResult<Event> {
    repo.find_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))
}

/// A client-supplied creator id must name an existing user.
async fn check_creator_reference(repo: &dyn Repository, creator: Option<UserId>) -> AppResult<()> {
    let Some(id) = creator else {
        return Ok(());
    };
    if repo.find_user(id).await?.is_none() {
        return Err(AppError::ValidationError(format!(
            "created_by_id: invalid pk \"{id}\", object does not exist"
        )));
    }
    Ok(())
}

pub async fn list_events(
    State(state): State<AppState>,
    caller: OptionalCaller,
) -> AppResult<Json<Vec<EventView>>> {
    authorize(EventAction::List, caller.0.as_ref())?;

    let events = state.repo.list_events().await?;
    Ok(Json(views(events, caller.user_id())))
}

pub async fn get_event(
    State(state): State<AppState>,
    caller: OptionalCaller,
    id: EventPath,
) -> AppResult<Json<EventView>> {
    authorize(EventAction::Retrieve, caller.0.as_ref())?;
    let Path(id) = id?;

    let event = load_event(state.repo.as_ref(), id).await?;
    Ok(Json(EventView::for_caller(event, caller.user_id())))
}

/// The creator is always the caller, whatever `created_by_id` says.
pub async fn create_event(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    body: Result<Json<EventInput>, JsonRejection>,
) -> AppResult<Created<EventView>> {
    let caller = require_caller(EventAction::Create, caller)?;
    let Json(input) = body?;

    input.validate()?;
    validate_event_date(input.date, Utc::now())?;
    check_creator_reference(state.repo.as_ref(), input.created_by_id).await?;

    let event = state
        .repo
        .create_event(input.into_new_event(caller.user_id))
        .await?;

    tracing::info!(event_id = event.id, user_id = caller.user_id, event = %event, "Event created");
    Ok(created(EventView::for_caller(event, Some(caller.user_id))))
}

async fn apply_event_changes(
    state: &AppState,
    caller: Option<UserId>,
    id: EventId,
    changes: EventChanges,
) -> AppResult<Json<EventView>> {
    if let Some(date) = changes.date {
        validate_event_date(date, Utc::now())?;
    }
    check_creator_reference(state.repo.as_ref(), changes.created_by).await?;

    let event = state.repo.update_event(id, changes).await?;

    tracing::info!(event_id = event.id, event = %event, "Event updated");
    Ok(Json(EventView::for_caller(event, caller)))
}

/// `PUT /events/{id}/`: every writable field is required.
pub async fn replace_event(
    State(state): State<AppState>,
    caller: OptionalCaller,
    id: EventPath,
    body: Result<Json<EventInput>, JsonRejection>,
) -> AppResult<Json<EventView>> {
    authorize(EventAction::Update, caller.0.as_ref())?;
    let Path(id) = id?;
    let Json(input) = body?;
    input.validate()?;

    apply_event_changes(&state, caller.user_id(), id, input.into()).await
}

/// `PATCH /events/{id}/`: only the fields present change.
pub async fn patch_event(
    State(state): State<AppState>,
    caller: OptionalCaller,
    id: EventPath,
    body: Result<Json<EventPatch>, JsonRejection>,
) -> AppResult<Json<EventView>> {
    authorize(EventAction::Update, caller.0.as_ref())?;
    let Path(id) = id?;
    let Json(patch) = body?;
    patch.validate()?;

    apply_event_changes(&state, caller.user_id(), id, patch.into()).await
}

pub async fn delete_event(
    State(state): State<AppState>,
    caller: OptionalCaller,
    id: EventPath,
) -> AppResult<StatusCode> {
    authorize(EventAction::Delete, caller.0.as_ref())?;
    let Path(id) = id?;

    state.repo.delete_event(id).await?;

    tracing::info!(event_id = id, "Event deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Adds the caller to the event's favorites, or removes them if present.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    id: EventPath,
) -> AppResult<Json<FavoriteStatus>> {
    let caller = require_caller(EventAction::ToggleFavorite, caller)?;
    let Path(id) = id?;

    let outcome = state.repo.toggle_favorite(id, caller.user_id).await?;

    tracing::info!(event_id = id, user_id = caller.user_id, ?outcome, "Favorite toggled");
    Ok(Json(FavoriteStatus::from(outcome)))
}

pub async fn my_favorites(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
) -> AppResult<Json<Vec<EventView>>> {
    let caller = require_caller(EventAction::ListFavorites, caller)?;

    let events = state.repo.list_favorites(caller.user_id).await?;
    Ok(Json(views(events, Some(caller.user_id))))
}
