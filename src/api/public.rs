use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::AppState;
use crate::outline::{Chapter, ChapterNumber, CourseOutline, GlobalPage, LessonNumber, Module};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    pub number: LessonNumber,
    pub title: String,
    pub global_page: GlobalPage,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterView {
    pub number: ChapterNumber,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<Module>,
    pub quiz: bool,
    pub lessons: Vec<LessonView>,
}

impl ChapterView {
    fn new(outline: &CourseOutline, chapter: &Chapter) -> Self {
        Self {
            number: chapter.number,
            title: chapter.display_title(),
            module: chapter.module,
            quiz: chapter.has_quiz(),
            lessons: chapter
                .lessons
                .iter()
                .zip(outline.chapter_pages(chapter))
                .map(|(lesson, global_page)| LessonView {
                    number: lesson.number,
                    title: lesson.title.clone(),
                    global_page,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OutlineQuery {
    /// Only chapters visible in this track; all chapters when omitted
    pub module: Option<Module>,
}

#[utoipa::path(
    path = "/api/public/outline",
    method(get),
    tag = "progress",
    params(OutlineQuery),
    responses(
        (status = 200, description = "Course outline with global page numbers", body = Vec<ChapterView>)
    )
)]
pub async fn get_outline(
    State(state): State<AppState>,
    Query(query): Query<OutlineQuery>,
) -> Json<Vec<ChapterView>> {
    let outline = state.service.outline();
    let chapters = outline
        .chapters()
        .iter()
        .filter(|ch| query.module.is_none_or(|m| ch.visible_in(m)))
        .map(|ch| ChapterView::new(outline, ch))
        .collect();
    Json(chapters)
}

pub fn get_public_scope() -> Router<AppState> {
    Router::new().nest("/public", Router::new().route("/outline", get(get_outline)))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::api::tests::{json_body, test_app};

    #[tokio::test]
    async fn outline_is_public_and_lists_global_pages() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                Request::get("/api/public/outline?module=A")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body.as_array().unwrap().len(), 3);
        assert_eq!(
            body[1],
            json!({
                "number": 2,
                "title": "Chapter title 2",
                "quiz": true,
                "lessons": [
                    {"number": 1, "title": "Lesson 1", "globalPage": 4},
                    {"number": 2, "title": "Lesson 2", "globalPage": 5},
                    {"number": 3, "title": "Lesson 3", "globalPage": 6},
                ]
            })
        );
    }
}
