use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

use super::{event_not_found, user_not_found, username_taken, Repository, StoreError, StoreResult};
use crate::models::event::{Event, EventChanges, EventId, FavoriteToggle, NewEvent};
use crate::models::user::{NewUser, User, UserChanges, UserId, UserView};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, is_staff, date_joined";

/// Events joined with their creator and aggregated favorites. Callers append
/// an optional `WHERE` and the shared grouping/ordering tail.
const EVENT_SELECT: &str = r#"
SELECT e.id, e.title, e.description, e.sport_type, e.date, e.location, e.address,
       e.created_at, e.updated_at,
       u.id AS creator_id, u.username AS creator_username, u.email AS creator_email,
       u.first_name AS creator_first_name, u.last_name AS creator_last_name,
       COALESCE(
           ARRAY_AGG(f.user_id ORDER BY f.user_id) FILTER (WHERE f.user_id IS NOT NULL),
           '{}'
       ) AS favorites
FROM events e
JOIN users u ON u.id = e.created_by
LEFT JOIN event_favorites f ON f.event_id = e.id
"#;

const EVENT_GROUP_ORDER: &str = " GROUP BY e.id, u.id ORDER BY e.date ASC, e.id ASC";

#[derive(Debug, FromRow)]
struct EventRow {
    id: EventId,
    title: String,
    description: String,
    sport_type: String,
    date: DateTime<Utc>,
    location: String,
    address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    creator_id: UserId,
    creator_username: String,
    creator_email: String,
    creator_first_name: String,
    creator_last_name: String,
    favorites: Vec<UserId>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let sport_type = row
            .sport_type
            .parse()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;

        Ok(Event {
            id: row.id,
            title: row.title,
            description: row.description,
            sport_type,
            date: row.date,
            location: row.location,
            address: row.address,
            created_by: UserView {
                id: row.creator_id,
                username: row.creator_username,
                email: row.creator_email,
                first_name: row.creator_first_name,
                last_name: row.creator_last_name,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
            favorites: row.favorites,
        })
    }
}

fn into_events(rows: Vec<EventRow>) -> StoreResult<Vec<Event>> {
    rows.into_iter().map(Event::try_from).collect()
}

/// Unique violations on `users.username` become conflicts, foreign key
/// violations on a creator id become a missing user.
fn classify(err: sqlx::Error, creator: Option<UserId>) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return username_taken();
        }
        if let (true, Some(id)) = (db.is_foreign_key_violation(), creator) {
            return user_not_found(id);
        }
    }
    StoreError::Database(err)
}

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }

    async fn fetch_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        let sql = format!("{EVENT_SELECT} WHERE e.id = $1{EVENT_GROUP_ORDER}");
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Event::try_from)
            .transpose()
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, is_staff) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.is_staff)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, None))
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn update_user(&self, id: UserId, changes: UserChanges) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET \
                 username = COALESCE($2, username), \
                 email = COALESCE($3, email), \
                 first_name = COALESCE($4, first_name), \
                 last_name = COALESCE($5, last_name) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, None))?
            .ok_or_else(|| user_not_found(id))
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        // events and event_favorites follow through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }
        Ok(())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let sql = format!("{EVENT_SELECT}{EVENT_GROUP_ORDER}");
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        into_events(rows)
    }

    async fn find_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        self.fetch_event(id).await
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<Event> {
        let id: EventId = sqlx::query_scalar(
            "INSERT INTO events (title, description, sport_type, date, location, address, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.sport_type.code())
        .bind(event.date)
        .bind(&event.location)
        .bind(&event.address)
        .bind(event.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, Some(event.created_by)))?;

        self.fetch_event(id)
            .await?
            .ok_or_else(|| event_not_found(id))
    }

    async fn update_event(&self, id: EventId, changes: EventChanges) -> StoreResult<Event> {
        let updated: Option<EventId> = sqlx::query_scalar(
            "UPDATE events SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 sport_type = COALESCE($4, sport_type), \
                 date = COALESCE($5, date), \
                 location = COALESCE($6, location), \
                 address = COALESCE($7, address), \
                 created_by = COALESCE($8, created_by), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.sport_type.map(|s| s.code()))
        .bind(changes.date)
        .bind(changes.location)
        .bind(changes.address)
        .bind(changes.created_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, changes.created_by))?;

        if updated.is_none() {
            return Err(event_not_found(id));
        }
        self.fetch_event(id)
            .await?
            .ok_or_else(|| event_not_found(id))
    }

    async fn delete_event(&self, id: EventId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(event_not_found(id));
        }
        Ok(())
    }

    async fn toggle_favorite(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> StoreResult<FavoriteToggle> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent toggles on the same event.
        let exists: Option<EventId> =
            sqlx::query_scalar("SELECT id FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(event_not_found(event_id));
        }

        let removed = sqlx::query("DELETE FROM event_favorites WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let outcome = if removed > 0 {
            FavoriteToggle::Removed
        } else {
            sqlx::query(
                "INSERT INTO event_favorites (event_id, user_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(event_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify(e, Some(user_id)))?;
            FavoriteToggle::Added
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_favorites(&self, user_id: UserId) -> StoreResult<Vec<Event>> {
        let sql = format!(
            "{EVENT_SELECT} WHERE e.id IN \
             (SELECT event_id FROM event_favorites WHERE user_id = $1){EVENT_GROUP_ORDER}"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        into_events(rows)
    }
}
