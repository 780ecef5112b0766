pub mod progress;
pub mod public;

use std::{sync::Arc, time::Duration};

use axum::{Router, http::StatusCode};
use jsonwebtoken::DecodingKey;
use tower::ServiceBuilder;
use tower_cookies::{CookieManagerLayer, Cookies};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::debug;
use utoipa::OpenApi;

use crate::{error::Error, service::ProgressService, student::StudentId};

/// Requests running longer than this are answered with 408
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Cookie holding the student's signed session token
pub const AUTH_COOKIE: &str = "auth-token";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProgressService>,
    auth_key: Arc<DecodingKey>,
}

impl AppState {
    pub fn new(service: ProgressService, jwt_secret: &[u8]) -> Self {
        Self {
            service: Arc::new(service),
            auth_key: Arc::new(DecodingKey::from_secret(jwt_secret)),
        }
    }
}

/// Student id from the `auth-token` cookie
pub fn authenticate(cookies: &Cookies, state: &AppState) -> Result<StudentId, Error> {
    let token = cookies.get(AUTH_COOKIE).ok_or(Error::Unauthorized)?;
    crate::student::verify_token(&state.auth_key, token.value()).map_err(|e| {
        debug!("rejected auth token: {e}");
        Error::Unauthorized
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        progress::validate,
        progress::summary,
        public::get_outline,
    ),
    tags((name = "progress", description = "Lesson and quiz completion tracking"))
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(progress::get_progress_scope())
                .merge(public::get_public_scope()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(timeout_layer(REQUEST_TIMEOUT))
                .layer(CookieManagerLayer::new()),
        )
        .with_state(state)
}
