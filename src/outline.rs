pub mod chapter;

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use chapter::{Chapter, Lesson};

pub type ChapterNumber = u32;
pub type LessonNumber = u32;
/// Outline-wide lesson index, the key persisted in a student's completed pages
pub type GlobalPage = u32;

/// Learning track. Each track keeps its own, fully independent progress.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
pub enum Module {
    #[default]
    A,
    B,
}

impl Module {
    pub const ALL: [Module; 2] = [Module::A, Module::B];
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Module::A => f.write_str("A"),
            Module::B => f.write_str("B"),
        }
    }
}

impl FromStr for Module {
    type Err = OutlineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Module::A),
            "B" | "b" => Ok(Module::B),
            other => Err(OutlineError::UnknownModule(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OutlineError {
    #[error("failed to read course outline {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse course outline: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("chapter numbers must be positive")]
    ZeroChapter,
    #[error("chapter {0} is declared more than once")]
    DuplicateChapter(ChapterNumber),
    #[error("chapter {chapter} has a lesson numbered 0")]
    ZeroLesson { chapter: ChapterNumber },
    #[error("chapter {chapter} declares lesson {lesson} more than once")]
    DuplicateLesson {
        chapter: ChapterNumber,
        lesson: LessonNumber,
    },
    #[error("unknown module {0:?}, expected A or B")]
    UnknownModule(String),
}

#[derive(Deserialize)]
struct OutlineFile {
    #[serde(default, rename = "chapter")]
    chapters: Vec<Chapter>,
}

/// The static course catalog.
///
/// Chapters are kept ordered by number and lessons by lesson number. Global
/// pages are assigned sequentially from 1 in that order, so a course whose
/// chapters all hold lessons `1..=n` gets `(chapter - 1) * n + lesson`.
/// Both directions of the mapping are tabulated once at construction.
#[derive(Debug, Clone)]
pub struct CourseOutline {
    chapters: Vec<Chapter>,
    index: HashMap<ChapterNumber, usize>,
    pages: HashMap<(ChapterNumber, LessonNumber), GlobalPage>,
    lessons: BTreeMap<GlobalPage, (ChapterNumber, LessonNumber)>,
    total_quizzes: usize,
}

impl CourseOutline {
    pub fn new(mut chapters: Vec<Chapter>) -> Result<Self, OutlineError> {
        chapters.sort_by_key(|ch| ch.number);
        let mut index = HashMap::new();
        let mut pages = HashMap::new();
        let mut lessons = BTreeMap::new();
        let mut next_page: GlobalPage = 1;
        for (i, chapter) in chapters.iter_mut().enumerate() {
            if chapter.number == 0 {
                return Err(OutlineError::ZeroChapter);
            }
            if index.insert(chapter.number, i).is_some() {
                return Err(OutlineError::DuplicateChapter(chapter.number));
            }
            chapter.lessons.sort_by_key(|l| l.number);
            let mut seen = HashSet::new();
            for lesson in &chapter.lessons {
                if lesson.number == 0 {
                    return Err(OutlineError::ZeroLesson {
                        chapter: chapter.number,
                    });
                }
                if !seen.insert(lesson.number) {
                    return Err(OutlineError::DuplicateLesson {
                        chapter: chapter.number,
                        lesson: lesson.number,
                    });
                }
                pages.insert((chapter.number, lesson.number), next_page);
                lessons.insert(next_page, (chapter.number, lesson.number));
                next_page += 1;
            }
        }
        let total_quizzes = chapters.iter().filter(|ch| ch.has_quiz()).count();
        Ok(Self {
            chapters,
            index,
            pages,
            lessons,
            total_quizzes,
        })
    }

    pub fn from_toml_str(s: &str) -> Result<Self, OutlineError> {
        let file: OutlineFile = toml::from_str(s)?;
        Self::new(file.chapters)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, OutlineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| OutlineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Chapters visible in a track: its own plus the shared ones
    pub fn chapters_in(&self, module: Module) -> impl Iterator<Item = &Chapter> {
        self.chapters.iter().filter(move |ch| ch.visible_in(module))
    }

    /// Chapter by number regardless of its track
    pub fn chapter(&self, number: ChapterNumber) -> Option<&Chapter> {
        self.index.get(&number).map(|&i| &self.chapters[i])
    }

    /// Chapter by number as seen from a track. `None` means the chapter is
    /// not part of that track.
    pub fn find_chapter(&self, number: ChapterNumber, module: Module) -> Option<&Chapter> {
        self.chapter(number).filter(|ch| ch.visible_in(module))
    }

    pub fn global_page(&self, chapter: ChapterNumber, lesson: LessonNumber) -> Option<GlobalPage> {
        self.pages.get(&(chapter, lesson)).copied()
    }

    pub fn lesson_at(&self, page: GlobalPage) -> Option<(ChapterNumber, LessonNumber)> {
        self.lessons.get(&page).copied()
    }

    pub fn chapter_of_page(&self, page: GlobalPage) -> Option<ChapterNumber> {
        self.lesson_at(page).map(|(chapter, _)| chapter)
    }

    pub fn contains_page(&self, page: GlobalPage) -> bool {
        self.lessons.contains_key(&page)
    }

    /// Global pages of a chapter's lessons, in lesson order
    pub fn chapter_pages<'a>(&'a self, chapter: &'a Chapter) -> impl Iterator<Item = GlobalPage> + 'a {
        chapter
            .lessons
            .iter()
            .filter_map(move |l| self.global_page(chapter.number, l.number))
    }

    pub fn total_lessons(&self) -> usize {
        self.lessons.len()
    }

    pub fn total_quizzes(&self) -> usize {
        self.total_quizzes
    }
}
