use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ChapterNumber, Module};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Lesson {
    pub number: u32,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Chapter {
    pub number: ChapterNumber,
    /// Display title, may be left empty in the course file
    #[serde(default)]
    pub title: String,
    /// Track the chapter belongs to; `None` means it is shared by every track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<Module>,
    /// Whether the chapter ends with a quiz
    #[serde(default)]
    pub quiz: bool,
    /// Homework text sent along with the completion notice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homework: Option<String>,
    #[serde(default, rename = "lesson")]
    pub lessons: Vec<Lesson>,
}

impl Chapter {
    pub fn visible_in(&self, module: Module) -> bool {
        self.module.is_none_or(|m| m == module)
    }

    pub fn has_quiz(&self) -> bool {
        self.quiz
    }

    /// The chapter title, or a generic `Chapter N` label when none is set
    pub fn display_title(&self) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            format!("Chapter {}", self.number)
        } else {
            title.to_string()
        }
    }
}
