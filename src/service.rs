use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    error::Error,
    notify::{self, Notifier},
    outline::{ChapterNumber, CourseOutline, GlobalPage, Module},
    progress::{self, ProgressSummary, Toggle, ToggleOutcome},
    store::ProgressStore,
    student::StudentId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ValidateKind {
    Page,
    Quiz,
    RemovePage,
    RemoveQuiz,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    #[serde(rename = "type")]
    pub kind: ValidateKind,
    /// Global page, required for `page` and `remove-page`
    pub page_number: Option<GlobalPage>,
    /// Required for `quiz` and `remove-quiz`
    pub chapter_number: Option<ChapterNumber>,
    #[serde(default)]
    pub module: Module,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_pages: Option<Vec<GlobalPage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_quizzes: Option<Vec<ChapterNumber>>,
    /// Set when this request completed a chapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_completed: Option<ChapterNumber>,
}

/// Request-scoped shell around the completion engine: loads and stores
/// progress and fires completion notices.
pub struct ProgressService {
    outline: Arc<CourseOutline>,
    store: Arc<dyn ProgressStore>,
    notifier: Arc<dyn Notifier>,
}

impl ProgressService {
    pub fn new(
        outline: Arc<CourseOutline>,
        store: Arc<dyn ProgressStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            outline,
            store,
            notifier,
        }
    }

    pub fn outline(&self) -> &CourseOutline {
        &self.outline
    }

    /// Check the identifiers of a request against the outline of its module
    pub fn resolve(&self, req: &ValidateRequest) -> Result<Toggle, Error> {
        match req.kind {
            ValidateKind::Page | ValidateKind::RemovePage => {
                let page = req
                    .page_number
                    .ok_or_else(|| Error::InvalidRequest("pageNumber is required".to_string()))?;
                let in_module = self
                    .outline
                    .chapter_of_page(page)
                    .is_some_and(|ch| self.outline.find_chapter(ch, req.module).is_some());
                if !in_module {
                    return Err(Error::UnknownPage(page));
                }
                Ok(match req.kind {
                    ValidateKind::Page => Toggle::AddPage(page),
                    _ => Toggle::RemovePage(page),
                })
            }
            ValidateKind::Quiz | ValidateKind::RemoveQuiz => {
                let chapter = req.chapter_number.ok_or_else(|| {
                    Error::InvalidRequest("chapterNumber is required".to_string())
                })?;
                let ch = self
                    .outline
                    .find_chapter(chapter, req.module)
                    .ok_or(Error::UnknownChapter(chapter))?;
                if !ch.has_quiz() {
                    return Err(Error::NoQuiz(chapter));
                }
                Ok(match req.kind {
                    ValidateKind::Quiz => Toggle::AddQuiz(chapter),
                    _ => Toggle::RemoveQuiz(chapter),
                })
            }
        }
    }

    pub async fn validate(
        &self,
        student: StudentId,
        req: ValidateRequest,
    ) -> Result<ValidateResponse, Error> {
        let toggle = self.resolve(&req)?;
        let module = req.module;
        let outline = &self.outline;
        let mut outcome = ToggleOutcome::default();
        let state = self
            .store
            .update(student, module, &mut |state| {
                outcome = progress::apply(outline, state, toggle, module);
                outcome.changed
            })
            .await?;

        if let Some(transition) = outcome.transition {
            info!(
                "student {student} completed chapter {} in module {module}",
                transition.chapter_number
            );
            notify::dispatch(
                self.notifier.clone(),
                self.store.clone(),
                self.outline.clone(),
                student,
                transition.chapter_number,
            );
        }

        let message = match (toggle, outcome.changed) {
            (Toggle::AddPage(page), true) => format!("Page {page} validated"),
            (Toggle::AddPage(_), false) => "Page already validated".to_string(),
            (Toggle::AddQuiz(chapter), true) => format!("Quiz for chapter {chapter} validated"),
            (Toggle::AddQuiz(_), false) => "Quiz already validated".to_string(),
            (Toggle::RemovePage(page), _) => format!("Page {page} removed"),
            (Toggle::RemoveQuiz(chapter), _) => format!("Quiz for chapter {chapter} removed"),
        };
        let (completed_pages, completed_quizzes) = match toggle {
            Toggle::AddPage(_) | Toggle::RemovePage(_) => (Some(state.pages()), None),
            Toggle::AddQuiz(_) | Toggle::RemoveQuiz(_) => (None, Some(state.quizzes())),
        };
        Ok(ValidateResponse {
            success: true,
            message,
            completed_pages,
            completed_quizzes,
            chapter_completed: outcome.transition.map(|t| t.chapter_number),
        })
    }

    pub async fn summary(
        &self,
        student: StudentId,
        module: Module,
    ) -> Result<ProgressSummary, Error> {
        let state = self.store.load(student, module).await?;
        Ok(ProgressSummary::new(&self.outline, &state, module))
    }
}
