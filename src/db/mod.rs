//! Data access.
//!
//! Handlers never touch a pool directly; they go through the [`Repository`]
//! handle carried in the application state. [`PgRepository`] backs production,
//! [`MemoryRepository`] backs tests and database-less development runs.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::event::{Event, EventChanges, EventId, FavoriteToggle, NewEvent};
use crate::models::user::{NewUser, User, UserChanges, UserId};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) fn event_not_found(id: EventId) -> StoreError {
    StoreError::NotFound(format!("Event {id}"))
}

pub(crate) fn user_not_found(id: UserId) -> StoreError {
    StoreError::NotFound(format!("User {id}"))
}

pub(crate) fn username_taken() -> StoreError {
    StoreError::Conflict("A user with that username already exists.".to_string())
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// All users, ascending by id.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn update_user(&self, id: UserId, changes: UserChanges) -> StoreResult<User>;

    /// Removes the user, the events they created, and their favorite marks.
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;

    /// All events, ascending by date.
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    async fn find_event(&self, id: EventId) -> StoreResult<Option<Event>>;

    async fn create_event(&self, event: NewEvent) -> StoreResult<Event>;

    async fn update_event(&self, id: EventId, changes: EventChanges) -> StoreResult<Event>;

    async fn delete_event(&self, id: EventId) -> StoreResult<()>;

    /// Flips `user_id`'s membership in the event's favorites as one unit.
    async fn toggle_favorite(&self, event_id: EventId, user_id: UserId)
        -> StoreResult<FavoriteToggle>;

    /// Events favorited by `user_id`, ascending by date.
    async fn list_favorites(&self, user_id: UserId) -> StoreResult<Vec<Event>>;
}

pub type SharedRepository = Arc<dyn Repository>;
