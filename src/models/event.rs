use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::user::{UserId, UserView};
use crate::utils::error::{AppError, AppResult};

pub type EventId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SportType {
    #[serde(rename = "FOOT")]
    Football,
    #[serde(rename = "BASK")]
    Basketball,
    #[serde(rename = "TENN")]
    Tennis,
    #[serde(rename = "RUGB")]
    Rugby,
    #[serde(rename = "VOLL")]
    Volleyball,
    #[default]
    #[serde(rename = "AUTR")]
    Other,
}

impl SportType {
    pub const ALL: [SportType; 6] = [
        SportType::Football,
        SportType::Basketball,
        SportType::Tennis,
        SportType::Rugby,
        SportType::Volleyball,
        SportType::Other,
    ];

    /// Four-letter code used on the wire and in the `sport_type` column.
    pub fn code(self) -> &'static str {
        match self {
            SportType::Football => "FOOT",
            SportType::Basketball => "BASK",
            SportType::Tennis => "TENN",
            SportType::Rugby => "RUGB",
            SportType::Volleyball => "VOLL",
            SportType::Other => "AUTR",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown sport type code '{0}'")]
pub struct UnknownSportType(pub String);

impl FromStr for SportType {
    type Err = UnknownSportType;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        SportType::ALL
            .into_iter()
            .find(|sport| sport.code() == code)
            .ok_or_else(|| UnknownSportType(code.to_string()))
    }
}

/// An event as read back from storage, creator resolved and favorites listed.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub sport_type: SportType,
    pub date: DateTime<Utc>,
    pub location: String,
    pub address: String,
    pub created_by: UserView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ids of users who favorited the event, ascending.
    pub favorites: Vec<UserId>,
}

impl Event {
    pub fn is_favorited_by(&self, caller: Option<UserId>) -> bool {
        caller.is_some_and(|id| self.favorites.contains(&id))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.date.format("%d/%m/%Y %H:%M"))
    }
}

/// Response shape of an event, relative to the caller.
#[derive(Debug, Serialize)]
pub struct EventView {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub sport_type: SportType,
    pub date: DateTime<Utc>,
    pub location: String,
    pub address: String,
    pub created_by: UserView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub favorites: Vec<UserId>,
    pub is_favorited: bool,
}

impl EventView {
    pub fn for_caller(event: Event, caller: Option<UserId>) -> Self {
        let is_favorited = event.is_favorited_by(caller);
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            sport_type: event.sport_type,
            date: event.date,
            location: event.location,
            address: event.address,
            created_by: event.created_by,
            created_at: event.created_at,
            updated_at: event.updated_at,
            favorites: event.favorites,
            is_favorited,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub sport_type: SportType,
    pub date: DateTime<Utc>,
    pub location: String,
    pub address: String,
    pub created_by: UserId,
}

/// Field-wise update of an event. Favorites are deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub sport_type: Option<SportType>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub created_by: Option<UserId>,
}

/// Body of `POST /events/` and `PUT /events/{id}/`.
///
/// Unknown keys such as `favorites` are ignored, so clients cannot write the
/// favorites set through this payload.
#[derive(Debug, Deserialize, Validate)]
pub struct EventInput {
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    #[serde(default)]
    pub sport_type: SportType,
    pub date: DateTime<Utc>,
    #[validate(length(max = 255), custom(function = "not_blank"))]
    pub location: String,
    #[validate(custom(function = "not_blank"))]
    pub address: String,
    pub created_by_id: Option<UserId>,
}

impl EventInput {
    pub fn into_new_event(self, created_by: UserId) -> NewEvent {
        NewEvent {
            title: self.title,
            description: self.description,
            sport_type: self.sport_type,
            date: self.date,
            location: self.location,
            address: self.address,
            created_by,
        }
    }
}

impl From<EventInput> for EventChanges {
    fn from(input: EventInput) -> Self {
        Self {
            title: Some(input.title),
            description: Some(input.description),
            sport_type: Some(input.sport_type),
            date: Some(input.date),
            location: Some(input.location),
            address: Some(input.address),
            created_by: input.created_by_id,
        }
    }
}

/// Body of `PATCH /events/{id}/`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct EventPatch {
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub title: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub description: Option<String>,
    pub sport_type: Option<SportType>,
    pub date: Option<DateTime<Utc>>,
    #[validate(length(max = 255), custom(function = "not_blank"))]
    pub location: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub address: Option<String>,
    pub created_by_id: Option<UserId>,
}

impl From<EventPatch> for EventChanges {
    fn from(patch: EventPatch) -> Self {
        Self {
            title: patch.title,
            description: patch.description,
            sport_type: patch.sport_type,
            date: patch.date,
            location: patch.location,
            address: patch.address,
            created_by: patch.created_by_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteToggle {
    Added,
    Removed,
}

impl FavoriteToggle {
    pub fn is_member(self) -> bool {
        self == FavoriteToggle::Added
    }
}

#[derive(Debug, Serialize)]
pub struct FavoriteStatus {
    pub status: FavoriteToggle,
    pub is_favorited: bool,
}

impl From<FavoriteToggle> for FavoriteStatus {
    fn from(status: FavoriteToggle) -> Self {
        Self {
            status,
            is_favorited: status.is_member(),
        }
    }
}

/// Events may not be scheduled before `now`.
pub fn validate_event_date(date: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<()> {
    if date < now {
        return Err(AppError::ValidationError(
            "The event date cannot be in the past".to_string(),
        ));
    }
    Ok(())
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("This field may not be blank.".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_event(favorites: Vec<UserId>) -> Event {
        let date = Utc.with_ymd_and_hms(2031, 6, 14, 18, 30, 0).unwrap();
        Event {
            id: 1,
            title: "5v5".into(),
            description: "Friendly match".into(),
            sport_type: SportType::Football,
            date,
            location: "Park".into(),
            address: "1 Main St".into(),
            created_by: UserView {
                id: 10,
                username: "alice".into(),
                email: "alice@example.com".into(),
                first_name: String::new(),
                last_name: String::new(),
            },
            created_at: date,
            updated_at: date,
            favorites,
        }
    }

    #[test]
    fn sport_codes_round_trip_through_from_str() {
        for sport in SportType::ALL {
            assert_eq!(sport.code().parse::<SportType>().unwrap(), sport);
        }
        assert!("GOLF".parse::<SportType>().is_err());
    }

    #[test]
    fn sport_type_wire_format_uses_codes() {
        assert_eq!(serde_json::to_value(SportType::Rugby).unwrap(), "RUGB");
        assert_eq!(SportType::default(), SportType::Other);
    }

    #[test]
    fn past_dates_are_rejected() {
        let now = Utc::now();
        assert!(validate_event_date(now - Duration::minutes(1), now).is_err());
        assert!(validate_event_date(now, now).is_ok());
        assert!(validate_event_date(now + Duration::days(3), now).is_ok());
    }

    #[test]
    fn is_favorited_depends_on_caller() {
        let event = sample_event(vec![3, 10]);
        assert!(event.is_favorited_by(Some(10)));
        assert!(!event.is_favorited_by(Some(4)));
        assert!(!event.is_favorited_by(None));
    }

    #[test]
    fn display_shows_title_and_date() {
        assert_eq!(sample_event(vec![]).to_string(), "5v5 - 14/06/2031 18:30");
    }

    #[test]
    fn input_defaults_sport_and_ignores_favorites() {
        let input: EventInput = serde_json::from_value(serde_json::json!({
            "title": "Pickup",
            "description": "Casual",
            "date": "2031-01-01T10:00:00Z",
            "location": "Gym",
            "address": "2 High St",
            "favorites": [1, 2, 3]
        }))
        .unwrap();
        assert_eq!(input.sport_type, SportType::Other);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn blank_and_oversized_fields_fail_validation() {
        let patch = EventPatch {
            title: Some("x".repeat(201)),
            location: Some("   ".into()),
            ..Default::default()
        };
        let errors = patch.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert!(errors.field_errors().contains_key("location"));
    }
}
