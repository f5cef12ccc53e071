//! Percentage and average calculations shared by the learner-facing UI and
//! the admin reporter. Everything here is a pure function over state slices,
//! and every displayed number goes through the same rounding rule, so the two
//! surfaces can never disagree.

use rustc_hash::FxHashMap;

use learner_utils::{Category, DeckId, Level, QuizId};

use crate::state::LearnerState;

/// The one rounding rule: half rounds up. 2/3 of 100 displays as 67.
pub fn round_half_up(value: f64) -> u32 {
    (value + 0.5).floor() as u32
}

pub fn deck_completion_percent(progress: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    round_half_up(100.0 * progress as f64 / total as f64)
}

/// Completion of a single deck, by id.
pub fn deck_completion(state: &LearnerState, deck: DeckId) -> Option<u32> {
    state
        .deck_stat(deck)
        .map(|row| deck_completion_percent(row.progress, row.total))
}

/// Completion across all of a learner's decks, weighted by card count.
pub fn overall_deck_completion(state: &LearnerState) -> u32 {
    let progress: u32 = state.deck_stats.iter().map(|row| row.progress).sum();
    let total: u32 = state.deck_stats.iter().map(|row| row.total).sum();
    deck_completion_percent(progress, total)
}

pub fn grammar_completion(state: &LearnerState) -> u32 {
    let total = state.grammar_lessons.len() as u32;
    if total == 0 {
        return 0;
    }
    let read = state
        .grammar_lessons
        .iter()
        .filter(|lesson| lesson.read)
        .count() as u32;
    round_half_up(100.0 * read as f64 / total as f64)
}

/// Which quizzes an average should range over. `None` fields match anything.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QuizScope {
    pub level: Option<Level>,
    pub category: Option<Category>,
}

impl QuizScope {
    pub fn level(level: Level) -> Self {
        Self {
            level: Some(level),
            category: None,
        }
    }

    pub fn level_and_category(level: Level, category: Category) -> Self {
        Self {
            level: Some(level),
            category: Some(category),
        }
    }
}

/// Question-weighted average accuracy over the scored quizzes in scope.
///
/// A quiz's highest score is a percentage; it is first converted back to a
/// correct-answer count against the quiz's question count, then the counts
/// are pooled. 0 when nothing in scope has been scored.
pub fn quiz_average(state: &LearnerState, scope: QuizScope) -> u32 {
    let scores: FxHashMap<QuizId, u8> = state
        .quiz_scores
        .iter()
        .map(|(id, score)| (*id, *score))
        .collect();

    let mut correct: u64 = 0;
    let mut questions: u64 = 0;
    for quiz in &state.quizzes {
        if scope.level.is_some_and(|level| quiz.level != level) {
            continue;
        }
        if scope.category.is_some_and(|category| quiz.category != category) {
            continue;
        }
        let Some(&score) = scores.get(&quiz.id) else {
            continue;
        };
        let count = quiz.questions.len() as u64;
        correct += round_half_up(score as f64 / 100.0 * count as f64) as u64;
        questions += count;
    }

    if questions == 0 {
        return 0;
    }
    round_half_up(100.0 * correct as f64 / questions as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use learner_utils::{DeckDraft, QuizDraft, QuizQuestion};

    fn questions(count: usize) -> Vec<QuizQuestion> {
        (0..count)
            .map(|index| QuizQuestion {
                prompt: format!("question {index}"),
                choices: vec!["a".to_string(), "b".to_string()],
                answer_index: 0,
            })
            .collect()
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(66.4), 66);
        assert_eq!(round_half_up(66.5), 67);
        assert_eq!(round_half_up(66.6667), 67);
        assert_eq!(round_half_up(0.0), 0);
    }

    #[test]
    fn test_two_of_three_cards_is_67_percent() {
        assert_eq!(deck_completion_percent(2, 3), 67);
        assert_eq!(deck_completion_percent(0, 0), 0);
        assert_eq!(deck_completion_percent(3, 3), 100);
    }

    #[test]
    fn test_grammar_completion_counts_read_lessons() {
        let mut state = LearnerState::default();
        assert_eq!(grammar_completion(&state), 0);

        let first = state.add_grammar_lesson(learner_utils::GrammarLessonDraft {
            title: "は and が".to_string(),
            level: Level::N5,
            explanation: "Topic and subject markers".to_string(),
            examples: Vec::new(),
        });
        state.add_grammar_lesson(learner_utils::GrammarLessonDraft {
            title: "て form".to_string(),
            level: Level::N4,
            explanation: "Connective form".to_string(),
            examples: Vec::new(),
        });
        state.set_lesson_read(first, true).unwrap();

        assert_eq!(grammar_completion(&state), 50);
    }

    #[test]
    fn test_quiz_average_pools_question_counts() {
        let mut state = LearnerState::default();
        let big = state.add_quiz(QuizDraft {
            title: "Vocabulary sweep".to_string(),
            category: Category::Vocabulary,
            level: Level::N5,
            questions: questions(10),
        });
        let small = state.add_quiz(QuizDraft {
            title: "Quick check".to_string(),
            category: Category::Vocabulary,
            level: Level::N5,
            questions: questions(2),
        });
        state.submit_quiz_score(big, 80).unwrap();
        state.submit_quiz_score(small, 50).unwrap();

        // 8 of 10 plus 1 of 2 = 9 of 12 = 75%
        assert_eq!(quiz_average(&state, QuizScope::default()), 75);
    }

    #[test]
    fn test_quiz_average_respects_scope() {
        let mut state = LearnerState::default();
        let vocab = state.add_quiz(QuizDraft {
            title: "N5 vocabulary".to_string(),
            category: Category::Vocabulary,
            level: Level::N5,
            questions: questions(4),
        });
        let grammar = state.add_quiz(QuizDraft {
            title: "N5 grammar".to_string(),
            category: Category::Grammar,
            level: Level::N5,
            questions: questions(4),
        });
        state.submit_quiz_score(vocab, 100).unwrap();
        state.submit_quiz_score(grammar, 50).unwrap();

        assert_eq!(
            quiz_average(&state, QuizScope::level_and_category(Level::N5, Category::Vocabulary)),
            100
        );
        assert_eq!(
            quiz_average(&state, QuizScope::level_and_category(Level::N5, Category::Grammar)),
            50
        );
        assert_eq!(
            quiz_average(&state, QuizScope::level(Level::N1)),
            0,
            "nothing scored at N1"
        );
    }

    #[test]
    fn test_unscored_quizzes_do_not_count() {
        let mut state = LearnerState::default();
        state.add_quiz(QuizDraft {
            title: "Untouched".to_string(),
            category: Category::Vocabulary,
            level: Level::N5,
            questions: questions(10),
        });
        assert_eq!(quiz_average(&state, QuizScope::default()), 0);
    }

    #[test]
    fn test_overall_deck_completion_weights_by_card_count() {
        let mut state = LearnerState::default();
        let noted = state.add_deck(DeckDraft {
            title: "Big deck".to_string(),
            category: Category::Vocabulary,
            level: Level::N5,
        });
        let empty = state.add_deck(DeckDraft {
            title: "Empty deck".to_string(),
            category: Category::Vocabulary,
            level: Level::N5,
        });
        for index in 0..4 {
            state
                .add_card(
                    noted,
                    learner_utils::CardDraft {
                        front: format!("front {index}"),
                        back: format!("back {index}"),
                        reading: None,
                        kind: learner_utils::CardKind::Recognition,
                        level: Level::N5,
                    },
                )
                .unwrap();
        }
        state.set_mastered_count(noted, 1).unwrap();

        assert_eq!(deck_completion(&state, noted), Some(25));
        assert_eq!(deck_completion(&state, empty), Some(0));
        assert_eq!(overall_deck_completion(&state), 25);
    }
}
