use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{accounts, events, health_check, route_not_found, token, users};
use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/register/", post(accounts::register))
        .route(
            "/accounts/me/",
            get(accounts::get_profile)
                .patch(accounts::patch_profile)
                .put(accounts::replace_profile),
        )
        .route("/token/", post(token::obtain_token))
        .route("/token/refresh/", post(token::refresh_token))
        .route(
            "/events/",
            get(events::list_events).post(events::create_event),
        )
        .route("/events/my_favorites/", get(events::my_favorites))
        .route(
            "/events/:id/",
            get(events::get_event)
                .put(events::replace_event)
                .patch(events::patch_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/favorite/", post(events::toggle_favorite))
        .route("/users/", get(users::list_users))
        .route("/users/:id/", get(users::get_user))
}

pub fn create_routes(state: AppState) -> Router {
    let cors = create_cors_layer(state.config.cors_allowed_origins.as_deref());
    let security = create_security_headers_layer(state.config.production);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(security)
        .layer(cors)
        .with_state(state)
}
