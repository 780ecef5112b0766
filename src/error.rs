use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::{
    outline::{ChapterNumber, GlobalPage},
    store::StoreError,
    student::StudentId,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not authenticated")]
    Unauthorized,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown page {0}")]
    UnknownPage(GlobalPage),
    #[error("unknown chapter {0}")]
    UnknownChapter(ChapterNumber),
    #[error("chapter {0} has no quiz")]
    NoQuiz(ChapterNumber),
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("progress store failure: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::StudentNotFound(id) => Error::StudentNotFound(id),
            e => Error::Store(e),
        }
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::InvalidRequest(_)
            | Error::UnknownPage(_)
            | Error::UnknownChapter(_)
            | Error::NoQuiz(_) => StatusCode::BAD_REQUEST,
            Error::StudentNotFound(_) => StatusCode::NOT_FOUND,
            Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // storage details stay in the log
            Error::Store(e) => {
                error!("progress update failed: {e}");
                "internal server error".to_string()
            }
            e => e.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use super::*;

    async fn body(e: Error) -> (StatusCode, Value) {
        let response = e.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let (status, json) = body(Error::UnknownPage(42)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "unknown page 42"}));

        let (status, json) = body(Error::NoQuiz(2)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "chapter 2 has no quiz"}));
    }

    #[tokio::test]
    async fn store_failures_are_opaque() {
        let e = Error::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        let (status, json) = body(e).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "internal server error"}));
    }

    #[test]
    fn missing_student_maps_to_not_found() {
        let e = Error::from(StoreError::StudentNotFound(9));
        assert!(matches!(e, Error::StudentNotFound(9)));
        assert_eq!(e.status(), StatusCode::NOT_FOUND);
    }
}
