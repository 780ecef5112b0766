//! Completion engine: pure functions over a student's progress in one track.
//!
//! Nothing here performs I/O. Side effects a caller may need (sending the
//! homework notice) are reported as [`CompletionTransition`] values.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::outline::{ChapterNumber, CourseOutline, GlobalPage, Module};

/// Completed pages and quizzes of one student in one track
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub completed_pages: BTreeSet<GlobalPage>,
    pub completed_quizzes: BTreeSet<ChapterNumber>,
}

impl ProgressState {
    pub fn from_lists(
        pages: impl IntoIterator<Item = GlobalPage>,
        quizzes: impl IntoIterator<Item = ChapterNumber>,
    ) -> Self {
        Self {
            completed_pages: pages.into_iter().collect(),
            completed_quizzes: quizzes.into_iter().collect(),
        }
    }

    /// Returns true if the page was not already completed
    pub fn add_page(&mut self, page: GlobalPage) -> bool {
        self.completed_pages.insert(page)
    }

    /// Returns true if the page was completed before
    pub fn remove_page(&mut self, page: GlobalPage) -> bool {
        self.completed_pages.remove(&page)
    }

    pub fn add_quiz(&mut self, chapter: ChapterNumber) -> bool {
        self.completed_quizzes.insert(chapter)
    }

    pub fn remove_quiz(&mut self, chapter: ChapterNumber) -> bool {
        self.completed_quizzes.remove(&chapter)
    }

    pub fn pages(&self) -> Vec<GlobalPage> {
        self.completed_pages.iter().copied().collect()
    }

    pub fn quizzes(&self) -> Vec<ChapterNumber> {
        self.completed_quizzes.iter().copied().collect()
    }
}

/// A chapter went from incomplete to complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionTransition {
    pub chapter_number: ChapterNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterCompletion {
    pub chapter_number: ChapterNumber,
    pub is_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    AddPage(GlobalPage),
    RemovePage(GlobalPage),
    AddQuiz(ChapterNumber),
    RemoveQuiz(ChapterNumber),
}

impl Toggle {
    /// Chapter whose completion this toggle can affect
    pub fn chapter(&self, outline: &CourseOutline) -> Option<ChapterNumber> {
        match *self {
            Toggle::AddPage(page) | Toggle::RemovePage(page) => outline.chapter_of_page(page),
            Toggle::AddQuiz(chapter) | Toggle::RemoveQuiz(chapter) => Some(chapter),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// The state was modified
    pub changed: bool,
    pub transition: Option<CompletionTransition>,
}

/// A chapter is complete when every lesson page is completed and, if the
/// chapter has a quiz, the quiz is completed too. Chapters that are not part
/// of `module` are never complete.
pub fn is_chapter_complete(
    outline: &CourseOutline,
    chapter: ChapterNumber,
    state: &ProgressState,
    module: Module,
) -> bool {
    let Some(ch) = outline.find_chapter(chapter, module) else {
        return false;
    };
    let lessons_done = ch.lessons.iter().all(|lesson| {
        outline
            .global_page(ch.number, lesson.number)
            .is_some_and(|page| state.completed_pages.contains(&page))
    });
    let quiz_done = !ch.has_quiz() || state.completed_quizzes.contains(&ch.number);
    lessons_done && quiz_done
}

/// Called after `page` was newly inserted into `state`. `was_complete` is the
/// owning chapter's completion before the insertion.
pub fn on_page_added(
    outline: &CourseOutline,
    page: GlobalPage,
    state: &ProgressState,
    module: Module,
    was_complete: bool,
) -> Option<CompletionTransition> {
    let chapter = outline.chapter_of_page(page)?;
    transition(outline, chapter, state, module, was_complete)
}

/// Called after the quiz of `chapter` was newly inserted into `state`
pub fn on_quiz_added(
    outline: &CourseOutline,
    chapter: ChapterNumber,
    state: &ProgressState,
    module: Module,
    was_complete: bool,
) -> Option<CompletionTransition> {
    transition(outline, chapter, state, module, was_complete)
}

fn transition(
    outline: &CourseOutline,
    chapter: ChapterNumber,
    state: &ProgressState,
    module: Module,
    was_complete: bool,
) -> Option<CompletionTransition> {
    if was_complete || !is_chapter_complete(outline, chapter, state, module) {
        return None;
    }
    Some(CompletionTransition {
        chapter_number: chapter,
    })
}

/// Apply a toggle to `state` in place, reporting whether it changed anything
/// and whether it completed a chapter. Removals never produce a transition.
pub fn apply(
    outline: &CourseOutline,
    state: &mut ProgressState,
    toggle: Toggle,
    module: Module,
) -> ToggleOutcome {
    let was_complete = toggle
        .chapter(outline)
        .is_some_and(|chapter| is_chapter_complete(outline, chapter, state, module));
    match toggle {
        Toggle::AddPage(page) => {
            let changed = state.add_page(page);
            ToggleOutcome {
                changed,
                transition: changed
                    .then(|| on_page_added(outline, page, state, module, was_complete))
                    .flatten(),
            }
        }
        Toggle::AddQuiz(chapter) => {
            let changed = state.add_quiz(chapter);
            ToggleOutcome {
                changed,
                transition: changed
                    .then(|| on_quiz_added(outline, chapter, state, module, was_complete))
                    .flatten(),
            }
        }
        Toggle::RemovePage(page) => ToggleOutcome {
            changed: state.remove_page(page),
            transition: None,
        },
        Toggle::RemoveQuiz(chapter) => ToggleOutcome {
            changed: state.remove_quiz(chapter),
            transition: None,
        },
    }
}

/// Share of completed items over all lessons and quizzes of the outline,
/// rounded half up. Entries that do not exist in the outline are ignored.
pub fn progress_percentage(outline: &CourseOutline, state: &ProgressState) -> u8 {
    let total = outline.total_lessons() + outline.total_quizzes();
    if total == 0 {
        return 0;
    }
    let pages = state
        .completed_pages
        .iter()
        .filter(|&&page| outline.contains_page(page))
        .count();
    let quizzes = state
        .completed_quizzes
        .iter()
        .filter(|&&chapter| outline.chapter(chapter).is_some_and(|ch| ch.has_quiz()))
        .count();
    let done = pages + quizzes;
    ((200 * done + total) / (2 * total)).min(100) as u8
}

pub fn chapter_completions(
    outline: &CourseOutline,
    state: &ProgressState,
    module: Module,
) -> Vec<ChapterCompletion> {
    outline
        .chapters_in(module)
        .map(|ch| ChapterCompletion {
            chapter_number: ch.number,
            is_complete: is_chapter_complete(outline, ch.number, state, module),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub module: Module,
    pub percentage: u8,
    pub completed_pages: Vec<GlobalPage>,
    pub completed_quizzes: Vec<ChapterNumber>,
    pub chapters: Vec<ChapterCompletion>,
}

impl ProgressSummary {
    pub fn new(outline: &CourseOutline, state: &ProgressState, module: Module) -> Self {
        Self {
            module,
            percentage: progress_percentage(outline, state),
            completed_pages: state.pages(),
            completed_quizzes: state.quizzes(),
            chapters: chapter_completions(outline, state, module),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::outline::tests::{chapter, uniform_outline};

    fn scenario_outline() -> CourseOutline {
        CourseOutline::new(vec![chapter(1, 3, true), chapter(2, 2, false)]).unwrap()
    }

    #[test]
    fn chapter_one_scenario() {
        let outline = scenario_outline();
        let mut state = ProgressState::default();
        state.add_page(1);
        state.add_page(2);
        assert!(!is_chapter_complete(&outline, 1, &state, Module::A));
        state.add_page(3);
        assert!(!is_chapter_complete(&outline, 1, &state, Module::A));
        state.add_quiz(1);
        assert!(is_chapter_complete(&outline, 1, &state, Module::A));
        state.remove_page(2);
        assert!(!is_chapter_complete(&outline, 1, &state, Module::A));
    }

    #[test]
    fn quiz_is_ignored_for_chapters_without_one() {
        let outline = scenario_outline();
        let mut state = ProgressState::from_lists([4, 5], []);
        assert!(is_chapter_complete(&outline, 2, &state, Module::A));
        state.add_quiz(2);
        assert!(is_chapter_complete(&outline, 2, &state, Module::A));
    }

    #[test]
    fn unknown_or_foreign_chapter_is_never_complete() {
        let mut only_b = chapter(1, 1, false);
        only_b.module = Some(Module::B);
        let outline = CourseOutline::new(vec![only_b]).unwrap();
        let state = ProgressState::from_lists([1], []);
        assert!(!is_chapter_complete(&outline, 1, &state, Module::A));
        assert!(is_chapter_complete(&outline, 1, &state, Module::B));
        assert!(!is_chapter_complete(&outline, 7, &state, Module::B));
    }

    #[test]
    fn toggles_are_idempotent() {
        let mut state = ProgressState::default();
        assert!(state.add_page(3));
        let once = state.clone();
        assert!(!state.add_page(3));
        assert_eq!(state, once);

        assert!(state.remove_page(3));
        assert_eq!(state, ProgressState::default());
        assert!(!state.remove_page(3));
        assert!(!state.remove_quiz(1));
        assert_eq!(state, ProgressState::default());
    }

    #[test]
    fn completing_last_item_emits_one_transition() {
        let outline = scenario_outline();
        let mut state = ProgressState::default();
        for page in [1, 2, 3] {
            let outcome = apply(&outline, &mut state, Toggle::AddPage(page), Module::A);
            assert!(outcome.changed);
            assert_eq!(outcome.transition, None);
        }
        let outcome = apply(&outline, &mut state, Toggle::AddQuiz(1), Module::A);
        assert_eq!(
            outcome.transition,
            Some(CompletionTransition { chapter_number: 1 })
        );

        let again = apply(&outline, &mut state, Toggle::AddPage(3), Module::A);
        assert_eq!(again, ToggleOutcome::default());
        let again = apply(&outline, &mut state, Toggle::AddQuiz(1), Module::A);
        assert_eq!(again, ToggleOutcome::default());
    }

    #[test]
    fn removal_never_transitions_and_readding_completes_again() {
        let outline = scenario_outline();
        let mut state = ProgressState::from_lists([1, 2, 3], [1]);
        let removed = apply(&outline, &mut state, Toggle::RemovePage(2), Module::A);
        assert!(removed.changed);
        assert_eq!(removed.transition, None);
        let readded = apply(&outline, &mut state, Toggle::AddPage(2), Module::A);
        assert_eq!(
            readded.transition,
            Some(CompletionTransition { chapter_number: 1 })
        );
    }

    #[test]
    fn already_complete_chapter_is_not_reported() {
        let outline = scenario_outline();
        let state = ProgressState::from_lists([1, 2, 3], [1]);
        assert_eq!(on_page_added(&outline, 2, &state, Module::A, true), None);
        assert_eq!(
            on_page_added(&outline, 2, &state, Module::A, false),
            Some(CompletionTransition { chapter_number: 1 })
        );
        assert_eq!(on_quiz_added(&outline, 1, &state, Module::A, true), None);
    }

    #[test]
    fn page_outside_outline_yields_no_transition() {
        let outline = scenario_outline();
        let mut state = ProgressState::default();
        let outcome = apply(&outline, &mut state, Toggle::AddPage(42), Module::A);
        assert!(outcome.changed);
        assert_eq!(outcome.transition, None);
    }

    #[test]
    fn chapter_is_derived_from_the_outline_not_page_arithmetic() {
        let outline = CourseOutline::new(vec![chapter(1, 2, false), chapter(2, 4, false)]).unwrap();
        let mut state = ProgressState::default();
        apply(&outline, &mut state, Toggle::AddPage(1), Module::A);
        let outcome = apply(&outline, &mut state, Toggle::AddPage(2), Module::A);
        assert_eq!(
            outcome.transition,
            Some(CompletionTransition { chapter_number: 1 })
        );
        for page in [3, 4, 5] {
            apply(&outline, &mut state, Toggle::AddPage(page), Module::A);
        }
        let outcome = apply(&outline, &mut state, Toggle::AddPage(6), Module::A);
        assert_eq!(
            outcome.transition,
            Some(CompletionTransition { chapter_number: 2 })
        );
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        let outline = uniform_outline();
        let state = ProgressState::from_lists([1, 2, 3, 4, 5, 6], [1]);
        assert_eq!(progress_percentage(&outline, &state), 58);

        let full = ProgressState::from_lists(1..=9, [1, 2, 3]);
        assert_eq!(progress_percentage(&outline, &full), 100);
        assert_eq!(progress_percentage(&outline, &ProgressState::default()), 0);
    }

    #[test]
    fn percentage_rounds_half_up() {
        let outline = CourseOutline::new(vec![chapter(1, 8, false)]).unwrap();
        let state = ProgressState::from_lists([1], []);
        assert_eq!(progress_percentage(&outline, &state), 13);
    }

    #[test]
    fn percentage_of_empty_outline_is_zero() {
        let outline = CourseOutline::new(vec![]).unwrap();
        let state = ProgressState::from_lists([1, 2], [1]);
        assert_eq!(progress_percentage(&outline, &state), 0);
    }

    #[test]
    fn percentage_ignores_stale_entries() {
        let outline = uniform_outline();
        let state = ProgressState::from_lists(1..=20, [1, 2, 3, 8]);
        assert_eq!(progress_percentage(&outline, &state), 100);
    }

    #[test]
    fn summary_lists_chapters_of_the_track() {
        let mut b_only = chapter(3, 1, false);
        b_only.module = Some(Module::B);
        let outline =
            CourseOutline::new(vec![chapter(1, 3, true), chapter(2, 2, false), b_only]).unwrap();
        let state = ProgressState::from_lists([4, 5], []);
        let summary = ProgressSummary::new(&outline, &state, Module::A);
        assert_eq!(
            summary.chapters,
            vec![
                ChapterCompletion {
                    chapter_number: 1,
                    is_complete: false
                },
                ChapterCompletion {
                    chapter_number: 2,
                    is_complete: true
                },
            ]
        );
        assert_eq!(summary.completed_pages, vec![4, 5]);
        assert_eq!(summary.percentage, 29);
    }

    fn toggle_strategy() -> impl Strategy<Value = Toggle> {
        prop_oneof![
            (1u32..12).prop_map(Toggle::AddPage),
            (1u32..12).prop_map(Toggle::RemovePage),
            (1u32..5).prop_map(Toggle::AddQuiz),
            (1u32..5).prop_map(Toggle::RemoveQuiz),
        ]
    }

    proptest! {
        #[test]
        fn applying_a_toggle_twice_equals_applying_it_once(
            toggles in proptest::collection::vec(toggle_strategy(), 0..20),
            last in toggle_strategy(),
        ) {
            let outline = uniform_outline();
            let mut state = ProgressState::default();
            for toggle in toggles {
                apply(&outline, &mut state, toggle, Module::A);
            }
            apply(&outline, &mut state, last, Module::A);
            let once = state.clone();
            let second = apply(&outline, &mut state, last, Module::A);
            prop_assert!(!second.changed);
            prop_assert_eq!(second.transition, None);
            prop_assert_eq!(state, once);
        }

        #[test]
        fn add_then_remove_restores_state(
            pages in proptest::collection::btree_set(1u32..12, 0..8),
            page in 1u32..12,
        ) {
            prop_assume!(!pages.contains(&page));
            let original = ProgressState::from_lists(pages, []);
            let mut state = original.clone();
            state.add_page(page);
            state.remove_page(page);
            prop_assert_eq!(state, original);
        }

        #[test]
        fn percentage_is_monotone_and_bounded(
            adds in proptest::collection::vec(
                prop_oneof![
                    (1u32..15).prop_map(Toggle::AddPage),
                    (1u32..6).prop_map(Toggle::AddQuiz),
                ],
                0..30,
            )
        ) {
            let outline = uniform_outline();
            let mut state = ProgressState::default();
            let mut last = progress_percentage(&outline, &state);
            for toggle in adds {
                apply(&outline, &mut state, toggle, Module::A);
                let now = progress_percentage(&outline, &state);
                prop_assert!(now >= last);
                prop_assert!(now <= 100);
                last = now;
            }
        }

        #[test]
        fn incomplete_lesson_means_incomplete_chapter(
            missing in 1u32..=3,
            with_quiz in any::<bool>(),
        ) {
            let outline = uniform_outline();
            let pages = (1..=3).filter(|&p| p != missing);
            let quizzes = if with_quiz { vec![1] } else { vec![] };
            let state = ProgressState::from_lists(pages, quizzes);
            prop_assert!(!is_chapter_complete(&outline, 1, &state, Module::A));
        }
    }
}
