//! Starter content for a brand-new learner. Built through the normal
//! transitions so stats rows and the id counter come out consistent.

use learner_utils::{
    CardDraft, CardKind, Category, DeckDraft, GrammarLessonDraft, Level, QuizDraft, QuizQuestion,
};

use crate::state::LearnerState;

fn kana_card(front: &str, back: &str) -> CardDraft {
    CardDraft {
        front: front.to_string(),
        back: back.to_string(),
        reading: None,
        kind: CardKind::Recognition,
        level: Level::N5,
    }
}

fn vocab_card(front: &str, reading: &str, back: &str) -> CardDraft {
    CardDraft {
        front: front.to_string(),
        back: back.to_string(),
        reading: Some(reading.to_string()),
        kind: CardKind::Recognition,
        level: Level::N5,
    }
}

pub fn starter_state() -> LearnerState {
    let mut state = LearnerState::default();

    let kana = state.add_deck(DeckDraft {
        title: "Hiragana vowels".to_string(),
        category: Category::Kana,
        level: Level::N5,
    });
    for (front, back) in [("あ", "a"), ("い", "i"), ("う", "u"), ("え", "e"), ("お", "o")] {
        let _ = state.add_card(kana, kana_card(front, back));
    }

    let greetings = state.add_deck(DeckDraft {
        title: "Greetings".to_string(),
        category: Category::Vocabulary,
        level: Level::N5,
    });
    for (front, reading, back) in [
        ("こんにちは", "konnichiwa", "hello"),
        ("ありがとう", "arigatou", "thank you"),
        ("さようなら", "sayounara", "goodbye"),
    ] {
        let _ = state.add_card(greetings, vocab_card(front, reading, back));
    }

    state.add_grammar_lesson(GrammarLessonDraft {
        title: "The topic particle は".to_string(),
        level: Level::N5,
        explanation: "は marks the topic of the sentence. It is written ha but read wa."
            .to_string(),
        examples: vec![
            "わたしは がくせいです。".to_string(),
            "これは ほんです。".to_string(),
        ],
    });
    state.add_grammar_lesson(GrammarLessonDraft {
        title: "です at the end of a sentence".to_string(),
        level: Level::N5,
        explanation: "です closes a polite statement, roughly \"is/am/are\".".to_string(),
        examples: vec!["ねこです。".to_string()],
    });

    state.add_quiz(QuizDraft {
        title: "Vowel reading check".to_string(),
        category: Category::Kana,
        level: Level::N5,
        questions: vec![
            QuizQuestion {
                prompt: "How is あ read?".to_string(),
                choices: vec!["a".to_string(), "i".to_string(), "u".to_string()],
                answer_index: 0,
            },
            QuizQuestion {
                prompt: "How is お read?".to_string(),
                choices: vec!["e".to_string(), "o".to_string(), "a".to_string()],
                answer_index: 1,
            },
        ],
    });

    // enough to buy a first heart refill, not enough to skip earning
    state.add_diamonds(10);

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::MAX_HEARTS;

    #[test]
    fn test_starter_state_is_consistent() {
        let state = starter_state();

        assert_eq!(state.decks.len(), 2);
        assert_eq!(state.grammar_lessons.len(), 2);
        assert_eq!(state.quizzes.len(), 1);
        assert_eq!(state.diamonds, 10);
        assert_eq!(state.hearts, MAX_HEARTS);
        assert_eq!(state.last_heart_loss, None);

        for deck in &state.decks {
            let stat = state.deck_stat(deck.id).expect("every deck has a row");
            assert_eq!(stat.total, deck.cards.len() as u32);
            assert_eq!(stat.progress, 0);
        }
    }

    #[test]
    fn test_starter_ids_are_unique() {
        let state = starter_state();
        let mut seen = std::collections::BTreeSet::new();

        for deck in &state.decks {
            assert!(seen.insert(deck.id.0));
            for card in &deck.cards {
                assert!(seen.insert(card.id.0));
            }
        }
        for lesson in &state.grammar_lessons {
            assert!(seen.insert(lesson.id.0));
        }
        for quiz in &state.quizzes {
            assert!(seen.insert(quiz.id.0));
        }
    }
}
