use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{event_not_found, user_not_found, username_taken, Repository, StoreResult};
use crate::models::event::{Event, EventChanges, EventId, FavoriteToggle, NewEvent, SportType};
use crate::models::user::{NewUser, User, UserChanges, UserId, UserView};

#[derive(Debug, Clone)]
struct EventRow {
    id: EventId,
    title: String,
    description: String,
    sport_type: SportType,
    date: DateTime<Utc>,
    location: String,
    address: String,
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    events: BTreeMap<EventId, EventRow>,
    /// `(event_id, user_id)` join rows; the set enforces uniqueness.
    favorites: BTreeSet<(EventId, UserId)>,
    last_user_id: UserId,
    last_event_id: EventId,
}

impl Tables {
    fn username_in_use(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn hydrate(&self, row: &EventRow) -> StoreResult<Event> {
        let creator = self
            .users
            .get(&row.created_by)
            .ok_or_else(|| user_not_found(row.created_by))?;

        let favorites = self
            .favorites
            .range((row.id, UserId::MIN)..=(row.id, UserId::MAX))
            .map(|&(_, user_id)| user_id)
            .collect();

        Ok(Event {
            id: row.id,
            title: row.title.clone(),
            description: row.description.clone(),
            sport_type: row.sport_type,
            date: row.date,
            location: row.location.clone(),
            address: row.address.clone(),
            created_by: UserView::from(creator),
            created_at: row.created_at,
            updated_at: row.updated_at,
            favorites,
        })
    }

    fn sorted_events<'a>(
        &self,
        rows: impl Iterator<Item = &'a EventRow>,
    ) -> StoreResult<Vec<Event>> {
        let mut rows: Vec<_> = rows.collect();
        rows.sort_by_key(|row| (row.date, row.id));
        rows.into_iter().map(|row| self.hydrate(row)).collect()
    }
}

/// Process-local repository with the same semantics as the PostgreSQL one.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.username_in_use(&user.username, None) {
            return Err(username_taken());
        }

        tables.last_user_id += 1;
        let record = User {
            id: tables.last_user_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
            date_joined: Utc::now(),
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn update_user(&self, id: UserId, changes: UserChanges) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if let Some(username) = &changes.username {
            if tables.username_in_use(username, Some(id)) {
                return Err(username_taken());
            }
        }

        let user = tables.users.get_mut(&id).ok_or_else(|| user_not_found(id))?;
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(user_not_found(id));
        }

        let owned: BTreeSet<EventId> = tables
            .events
            .values()
            .filter(|row| row.created_by == id)
            .map(|row| row.id)
            .collect();
        tables.events.retain(|event_id, _| !owned.contains(event_id));
        tables
            .favorites
            .retain(|(event_id, user_id)| *user_id != id && !owned.contains(event_id));
        Ok(())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let tables = self.tables.read().await;
        tables.sorted_events(tables.events.values())
    }

    async fn find_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        let tables = self.tables.read().await;
        tables.events.get(&id).map(|row| tables.hydrate(row)).transpose()
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&event.created_by) {
            return Err(user_not_found(event.created_by));
        }

        tables.last_event_id += 1;
        let now = Utc::now();
        let row = EventRow {
            id: tables.last_event_id,
            title: event.title,
            description: event.description,
            sport_type: event.sport_type,
            date: event.date,
            location: event.location,
            address: event.address,
            created_by: event.created_by,
            created_at: now,
            updated_at: now,
        };
        let created = tables.hydrate(&row)?;
        tables.events.insert(row.id, row);
        Ok(created)
    }

    async fn update_event(&self, id: EventId, changes: EventChanges) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        if let Some(creator) = changes.created_by {
            if !tables.users.contains_key(&creator) {
                return Err(user_not_found(creator));
            }
        }

        let row = tables.events.get_mut(&id).ok_or_else(|| event_not_found(id))?;
        if let Some(title) = changes.title {
            row.title = title;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        if let Some(sport_type) = changes.sport_type {
            row.sport_type = sport_type;
        }
        if let Some(date) = changes.date {
            row.date = date;
        }
        if let Some(location) = changes.location {
            row.location = location;
        }
        if let Some(address) = changes.address {
            row.address = address;
        }
        if let Some(creator) = changes.created_by {
            row.created_by = creator;
        }
        row.updated_at = Utc::now();

        let row = row.clone();
        tables.hydrate(&row)
    }

    async fn delete_event(&self, id: EventId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.events.remove(&id).ok_or_else(|| event_not_found(id))?;
        tables.favorites.retain(|(event_id, _)| *event_id != id);
        Ok(())
    }

    async fn toggle_favorite(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> StoreResult<FavoriteToggle> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&event_id) {
            return Err(event_not_found(event_id));
        }
        if !tables.users.contains_key(&user_id) {
            return Err(user_not_found(user_id));
        }

        if tables.favorites.remove(&(event_id, user_id)) {
            Ok(FavoriteToggle::Removed)
        } else {
            tables.favorites.insert((event_id, user_id));
            Ok(FavoriteToggle::Added)
        }
    }

    async fn list_favorites(&self, user_id: UserId) -> StoreResult<Vec<Event>> {
        let tables = self.tables.read().await;
        let favorited = tables
            .events
            .values()
            .filter(|row| tables.favorites.contains(&(row.id, user_id)));
        tables.sorted_events(favorited)
    }
}
