//! Who may do what with events.
//!
//! Evaluated per request from the caller's identity alone; nothing here is
//! persisted. Admin rights come from the `is_admin` claim resolved at
//! authentication time, never from comparing usernames.

use crate::auth::extractor::missing_credentials;
use crate::auth::Caller;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
    ToggleFavorite,
    ListFavorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Anyone,
    Authenticated,
    Admin,
}

impl EventAction {
    pub fn requirement(self) -> Requirement {
        match self {
            EventAction::List | EventAction::Retrieve => Requirement::Anyone,
            EventAction::Create | EventAction::ToggleFavorite | EventAction::ListFavorites => {
                Requirement::Authenticated
            }
            EventAction::Update | EventAction::Delete => Requirement::Admin,
        }
    }
}

/// 401 for anonymous callers on protected actions, 403 for authenticated
/// callers lacking the admin claim.
pub fn authorize(action: EventAction, caller: Option<&Caller>) -> AppResult<()> {
    match (action.requirement(), caller) {
        (Requirement::Anyone, _) => Ok(()),
        (_, None) => Err(missing_credentials()),
        (Requirement::Authenticated, Some(_)) => Ok(()),
        (Requirement::Admin, Some(caller)) if caller.is_admin => Ok(()),
        (Requirement::Admin, Some(caller)) => {
            tracing::debug!(user_id = caller.user_id, ?action, "admin claim missing");
            Err(AppError::Forbidden(
                "You do not have permission to perform this action".into(),
            ))
        }
    }
}

/// [`authorize`] for actions that also need to know who the caller is.
pub fn require_caller(action: EventAction, caller: Option<Caller>) -> AppResult<Caller> {
    authorize(action, caller.as_ref())?;
    caller.ok_or_else(missing_credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    const ALL: [EventAction; 7] = [
        EventAction::List,
        EventAction::Retrieve,
        EventAction::Create,
        EventAction::Update,
        EventAction::Delete,
        EventAction::ToggleFavorite,
        EventAction::ListFavorites,
    ];

    fn caller(is_admin: bool) -> Caller {
        Caller {
            user_id: 1,
            username: "someone".into(),
            is_admin,
        }
    }

    fn status(action: EventAction, caller: Option<&Caller>) -> Option<StatusCode> {
        authorize(action, caller).err().map(|e| e.status_code())
    }

    #[test]
    fn anonymous_may_only_read() {
        for action in ALL {
            let expected = match action {
                EventAction::List | EventAction::Retrieve => None,
                _ => Some(StatusCode::UNAUTHORIZED),
            };
            assert_eq!(status(action, None), expected, "{action:?}");
        }
    }

    #[test]
    fn regular_user_cannot_modify_or_delete() {
        let user = caller(false);
        for action in ALL {
            let expected = match action {
                EventAction::Update | EventAction::Delete => Some(StatusCode::FORBIDDEN),
                _ => None,
            };
            assert_eq!(status(action, Some(&user)), expected, "{action:?}");
        }
    }

    #[test]
    fn admin_may_do_everything() {
        let admin = caller(true);
        for action in ALL {
            assert_eq!(status(action, Some(&admin)), None, "{action:?}");
        }
    }

    #[test]
    fn require_caller_hands_back_identity() {
        let resolved = require_caller(EventAction::Create, Some(caller(false))).unwrap();
        assert_eq!(resolved.user_id, 1);
        assert!(require_caller(EventAction::ToggleFavorite, None).is_err());
    }
}
