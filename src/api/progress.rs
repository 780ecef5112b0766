use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection, rejection::QueryRejection},
    routing::{get, post},
};
use serde::Deserialize;
use tower_cookies::Cookies;
use utoipa::IntoParams;

use super::{AppState, authenticate};
use crate::{
    error::Error,
    outline::Module,
    progress::ProgressSummary,
    service::{ValidateRequest, ValidateResponse},
};

#[utoipa::path(
    path = "/api/progress/validate",
    method(post),
    tag = "progress",
    request_body = ValidateRequest,
    responses(
        (status = 200, description = "Progress updated", body = ValidateResponse),
        (status = 400, description = "Invalid type or unknown page/chapter"),
        (status = 401, description = "Missing or invalid auth-token cookie"),
        (status = 404, description = "Student not found"),
        (status = 500, description = "Progress could not be saved")
    )
)]
pub async fn validate(
    State(state): State<AppState>,
    cookies: Cookies,
    req: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, Error> {
    let student = authenticate(&cookies, &state)?;
    let Json(req) = req.map_err(|e| Error::InvalidRequest(e.body_text()))?;
    let response = state.service.validate(student, req).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ModuleQuery {
    /// Learning track, `A` when omitted
    #[serde(default)]
    pub module: Module,
}

#[utoipa::path(
    path = "/api/progress",
    method(get),
    tag = "progress",
    params(ModuleQuery),
    responses(
        (status = 200, description = "Progress of the current student", body = ProgressSummary),
        (status = 401, description = "Missing or invalid auth-token cookie"),
        (status = 404, description = "Student not found"),
        (status = 500, description = "Progress could not be loaded")
    )
)]
pub async fn summary(
    State(state): State<AppState>,
    cookies: Cookies,
    query: Result<Query<ModuleQuery>, QueryRejection>,
) -> Result<Json<ProgressSummary>, Error> {
    let student = authenticate(&cookies, &state)?;
    let Query(query) = query.map_err(|e| Error::InvalidRequest(e.body_text()))?;
    let summary = state.service.summary(student, query.module).await?;
    Ok(Json(summary))
}

pub fn get_progress_scope() -> Router<AppState> {
    Router::new()
        .route("/progress", get(summary))
        .route("/progress/validate", post(validate))
}
