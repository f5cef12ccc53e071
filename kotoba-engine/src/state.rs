//! The per-learner document and its content transitions. Collections are
//! `im` persistent structures, so cloning a state is an O(1) structurally
//! shared snapshot and the store can swap a mutated clone in as one step.

use chrono::{DateTime, Utc};
use im::{OrdMap, OrdSet, Vector};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use learner_utils::challenge_path;
use learner_utils::{
    Card, CardDraft, CardId, CardPatch, Deck, DeckDraft, DeckId, DeckPatch, GeneratedDeck,
    GeneratedGrammarLesson, GeneratedQuiz, GrammarLesson, GrammarLessonDraft, GrammarLessonPatch,
    LessonId, Level, Quiz, QuizDraft, QuizId, QuizPatch,
};

use crate::economy::MAX_HEARTS;
use crate::unlock::StageStatus;

/// Per-deck mastery counters, keyed by the owning deck's id. `topic` (the
/// deck title) exists only as a display join, see [`LearnerState::deck_stats_view`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeckStat {
    pub deck: DeckId,
    pub progress: u32,
    pub total: u32,
}

/// A stats row joined with the owning deck's current title for display.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DeckStatView {
    pub deck: DeckId,
    pub topic: String,
    pub progress: u32,
    pub total: u32,
}

/// Sparse per-stage challenge progress. Absence of an entry means "not yet
/// evaluated", which is distinct from an explicit stored status; display
/// statuses are derived in [`crate::unlock`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeProgress {
    levels: OrdMap<Level, OrdMap<String, OrdMap<String, StageStatus>>>,
}

impl ChallengeProgress {
    pub fn stored(&self, level: Level, unit_id: &str, stage_id: &str) -> Option<StageStatus> {
        self.levels.get(&level)?.get(unit_id)?.get(stage_id).copied()
    }

    pub(crate) fn mark_completed(&mut self, level: Level, unit_id: &str, stage_id: &str) {
        self.levels
            .entry(level)
            .or_default()
            .entry(unit_id.to_string())
            .or_default()
            .insert(stage_id.to_string(), StageStatus::Completed);
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LearnerState {
    pub decks: Vector<Deck>,
    pub deck_stats: Vector<DeckStat>,
    pub grammar_lessons: Vector<GrammarLesson>,
    pub quizzes: Vector<Quiz>,
    /// Highest recorded percentage per quiz; at most one row per quiz id.
    /// Stored as entry pairs because JSON object keys would stringify the ids.
    #[serde(with = "quiz_score_entries")]
    pub quiz_scores: OrdMap<QuizId, u8>,
    pub favorite_lessons: OrdSet<LessonId>,
    pub challenge_progress: ChallengeProgress,
    pub hearts: u8,
    pub diamonds: u32,
    /// `Some` exactly while `hearts < 5`; the regeneration cadence anchor.
    pub last_heart_loss: Option<DateTime<Utc>>,
    pub(crate) next_id: u64,
}

impl Default for LearnerState {
    fn default() -> Self {
        Self {
            decks: Vector::new(),
            deck_stats: Vector::new(),
            grammar_lessons: Vector::new(),
            quizzes: Vector::new(),
            quiz_scores: OrdMap::new(),
            favorite_lessons: OrdSet::new(),
            challenge_progress: ChallengeProgress::default(),
            hearts: MAX_HEARTS,
            diamonds: 0,
            last_heart_loss: None,
            next_id: 1,
        }
    }
}

/// Quiz scores as a list of `(quiz id, best percent)` pairs
mod quiz_score_entries {
    use im::OrdMap;
    use learner_utils::QuizId;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(scores: &OrdMap<QuizId, u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<(QuizId, u8)> = scores.iter().map(|(id, score)| (*id, *score)).collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OrdMap<QuizId, u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<(QuizId, u8)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProgressionError {
    #[error("deck {0} not found")]
    DeckNotFound(DeckId),

    #[error("card {1} not found in deck {0}")]
    CardNotFound(DeckId, CardId),

    #[error("grammar lesson {0} not found")]
    LessonNotFound(LessonId),

    #[error("quiz {0} not found")]
    QuizNotFound(QuizId),

    #[error("no deck titled {0:?}")]
    TopicNotFound(String),

    #[error("challenge stage {level}/{unit_id}/{stage_id} does not exist")]
    UnknownChallengeStage {
        level: Level,
        unit_id: String,
        stage_id: String,
    },

    #[error("challenge stage {level}/{unit_id}/{stage_id} is still locked")]
    StageLocked {
        level: Level,
        unit_id: String,
        stage_id: String,
    },
}

impl LearnerState {
    fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn deck_index(&self, id: DeckId) -> Option<usize> {
        self.decks.iter().position(|deck| deck.id == id)
    }

    fn stats_index(&self, deck: DeckId) -> Option<usize> {
        self.deck_stats.iter().position(|row| row.deck == deck)
    }

    pub fn deck(&self, id: DeckId) -> Option<&Deck> {
        self.decks.iter().find(|deck| deck.id == id)
    }

    fn deck_mut(&mut self, id: DeckId) -> Option<&mut Deck> {
        let index = self.deck_index(id)?;
        self.decks.get_mut(index)
    }

    pub fn deck_id_by_title(&self, title: &str) -> Option<DeckId> {
        self.decks
            .iter()
            .find(|deck| deck.title == title)
            .map(|deck| deck.id)
    }

    pub fn deck_stat(&self, deck: DeckId) -> Option<&DeckStat> {
        self.deck_stats.iter().find(|row| row.deck == deck)
    }

    /// Re-derives a deck's stats row from the live card list: `total` always
    /// equals the card count, `progress` never exceeds it. Creates the row if
    /// it went missing.
    fn sync_deck_total(&mut self, deck: DeckId) {
        let Some(total) = self.deck(deck).map(|deck| deck.cards.len() as u32) else {
            return;
        };
        match self.stats_index(deck) {
            Some(index) => {
                if let Some(row) = self.deck_stats.get_mut(index) {
                    row.total = total;
                    row.progress = row.progress.min(total);
                }
            }
            None => self.deck_stats.push_back(DeckStat {
                deck,
                progress: 0,
                total,
            }),
        }
    }

    pub(crate) fn add_deck(&mut self, draft: DeckDraft) -> DeckId {
        let id = DeckId(self.fresh_id());
        self.decks.push_back(Deck {
            id,
            title: draft.title,
            category: draft.category,
            level: draft.level,
            cards: Vec::new(),
        });
        self.deck_stats.push_back(DeckStat {
            deck: id,
            progress: 0,
            total: 0,
        });
        id
    }

    pub(crate) fn update_deck(&mut self, id: DeckId, patch: DeckPatch) -> Result<(), ProgressionError> {
        let deck = self
            .deck_mut(id)
            .ok_or(ProgressionError::DeckNotFound(id))?;
        if let Some(title) = patch.title {
            deck.title = title;
        }
        if let Some(category) = patch.category {
            deck.category = category;
        }
        if let Some(level) = patch.level {
            deck.level = level;
        }
        Ok(())
    }

    pub(crate) fn delete_deck(&mut self, id: DeckId) -> Result<(), ProgressionError> {
        let index = self
            .deck_index(id)
            .ok_or(ProgressionError::DeckNotFound(id))?;
        self.decks.remove(index);
        if let Some(stats) = self.stats_index(id) {
            self.deck_stats.remove(stats);
        }
        Ok(())
    }

    pub(crate) fn add_card(
        &mut self,
        deck_id: DeckId,
        draft: CardDraft,
    ) -> Result<CardId, ProgressionError> {
        if self.deck_index(deck_id).is_none() {
            return Err(ProgressionError::DeckNotFound(deck_id));
        }
        let id = CardId(self.fresh_id());
        if let Some(deck) = self.deck_mut(deck_id) {
            deck.cards.push(Card {
                id,
                front: draft.front,
                back: draft.back,
                reading: draft.reading,
                kind: draft.kind,
                level: draft.level,
            });
        }
        self.sync_deck_total(deck_id);
        Ok(id)
    }

    pub(crate) fn update_card(
        &mut self,
        deck_id: DeckId,
        card_id: CardId,
        patch: CardPatch,
    ) -> Result<(), ProgressionError> {
        let deck = self
            .deck_mut(deck_id)
            .ok_or(ProgressionError::DeckNotFound(deck_id))?;
        let card = deck
            .cards
            .iter_mut()
            .find(|card| card.id == card_id)
            .ok_or(ProgressionError::CardNotFound(deck_id, card_id))?;
        if let Some(front) = patch.front {
            card.front = front;
        }
        if let Some(back) = patch.back {
            card.back = back;
        }
        if let Some(reading) = patch.reading {
            card.reading = Some(reading);
        }
        if let Some(kind) = patch.kind {
            card.kind = kind;
        }
        if let Some(level) = patch.level {
            card.level = level;
        }
        Ok(())
    }

    pub(crate) fn delete_card(
        &mut self,
        deck_id: DeckId,
        card_id: CardId,
    ) -> Result<(), ProgressionError> {
        let deck = self
            .deck_mut(deck_id)
            .ok_or(ProgressionError::DeckNotFound(deck_id))?;
        let index = deck
            .cards
            .iter()
            .position(|card| card.id == card_id)
            .ok_or(ProgressionError::CardNotFound(deck_id, card_id))?;
        deck.cards.remove(index);
        self.sync_deck_total(deck_id);
        Ok(())
    }

    /// Sets mastered-card progress on a deck's stats row. `total` is always
    /// recomputed from the live deck rather than trusted from the caller, and
    /// `mastered` is clamped to it.
    pub(crate) fn set_mastered_count(
        &mut self,
        deck_id: DeckId,
        mastered: u32,
    ) -> Result<(), ProgressionError> {
        if self.deck_index(deck_id).is_none() {
            return Err(ProgressionError::DeckNotFound(deck_id));
        }
        self.sync_deck_total(deck_id);
        if let Some(index) = self.stats_index(deck_id)
            && let Some(row) = self.deck_stats.get_mut(index)
        {
            row.progress = mastered.min(row.total);
        }
        Ok(())
    }

    pub(crate) fn add_grammar_lesson(&mut self, draft: GrammarLessonDraft) -> LessonId {
        let id = LessonId(self.fresh_id());
        self.grammar_lessons.push_back(GrammarLesson {
            id,
            title: draft.title,
            level: draft.level,
            explanation: draft.explanation,
            examples: draft.examples,
            read: false,
        });
        id
    }

    fn lesson_mut(&mut self, id: LessonId) -> Option<&mut GrammarLesson> {
        let index = self
            .grammar_lessons
            .iter()
            .position(|lesson| lesson.id == id)?;
        self.grammar_lessons.get_mut(index)
    }

    pub(crate) fn update_grammar_lesson(
        &mut self,
        id: LessonId,
        patch: GrammarLessonPatch,
    ) -> Result<(), ProgressionError> {
        let lesson = self
            .lesson_mut(id)
            .ok_or(ProgressionError::LessonNotFound(id))?;
        if let Some(title) = patch.title {
            lesson.title = title;
        }
        if let Some(level) = patch.level {
            lesson.level = level;
        }
        if let Some(explanation) = patch.explanation {
            lesson.explanation = explanation;
        }
        if let Some(examples) = patch.examples {
            lesson.examples = examples;
        }
        Ok(())
    }

    pub(crate) fn delete_grammar_lesson(&mut self, id: LessonId) -> Result<(), ProgressionError> {
        let index = self
            .grammar_lessons
            .iter()
            .position(|lesson| lesson.id == id)
            .ok_or(ProgressionError::LessonNotFound(id))?;
        self.grammar_lessons.remove(index);
        self.favorite_lessons.remove(&id);
        Ok(())
    }

    /// Sets the lesson's read flag. The caller passes the desired value, so
    /// repeating a submission is harmless.
    pub(crate) fn set_lesson_read(&mut self, id: LessonId, read: bool) -> Result<(), ProgressionError> {
        let lesson = self
            .lesson_mut(id)
            .ok_or(ProgressionError::LessonNotFound(id))?;
        lesson.read = read;
        Ok(())
    }

    /// Toggles favorite membership, returning whether the lesson is now a
    /// favorite.
    pub(crate) fn toggle_favorite_lesson(&mut self, id: LessonId) -> Result<bool, ProgressionError> {
        if !self.grammar_lessons.iter().any(|lesson| lesson.id == id) {
            return Err(ProgressionError::LessonNotFound(id));
        }
        if self.favorite_lessons.contains(&id) {
            self.favorite_lessons.remove(&id);
            Ok(false)
        } else {
            self.favorite_lessons.insert(id);
            Ok(true)
        }
    }

    pub(crate) fn add_quiz(&mut self, draft: QuizDraft) -> QuizId {
        let id = QuizId(self.fresh_id());
        self.quizzes.push_back(Quiz {
            id,
            title: draft.title,
            category: draft.category,
            level: draft.level,
            questions: draft.questions,
        });
        id
    }

    pub(crate) fn update_quiz(&mut self, id: QuizId, patch: QuizPatch) -> Result<(), ProgressionError> {
        let index = self
            .quizzes
            .iter()
            .position(|quiz| quiz.id == id)
            .ok_or(ProgressionError::QuizNotFound(id))?;
        if let Some(quiz) = self.quizzes.get_mut(index) {
            if let Some(title) = patch.title {
                quiz.title = title;
            }
            if let Some(category) = patch.category {
                quiz.category = category;
            }
            if let Some(level) = patch.level {
                quiz.level = level;
            }
            if let Some(questions) = patch.questions {
                quiz.questions = questions;
            }
        }
        Ok(())
    }

    pub(crate) fn delete_quiz(&mut self, id: QuizId) -> Result<(), ProgressionError> {
        let index = self
            .quizzes
            .iter()
            .position(|quiz| quiz.id == id)
            .ok_or(ProgressionError::QuizNotFound(id))?;
        self.quizzes.remove(index);
        self.quiz_scores.remove(&id);
        Ok(())
    }

    /// Records a quiz score if it beats the stored one. Scores only ever go
    /// up; a lower or equal submission is a successful no-op. Returns whether
    /// the submission was recorded.
    pub(crate) fn submit_quiz_score(
        &mut self,
        id: QuizId,
        score: u8,
    ) -> Result<bool, ProgressionError> {
        if !self.quizzes.iter().any(|quiz| quiz.id == id) {
            return Err(ProgressionError::QuizNotFound(id));
        }
        let score = score.min(100);
        match self.quiz_scores.get(&id) {
            Some(&best) if score <= best => Ok(false),
            _ => {
                self.quiz_scores.insert(id, score);
                Ok(true)
            }
        }
    }

    /// Marks a challenge stage completed. The stage must exist in the static
    /// path and be reachable: its predecessor in the unit must already be
    /// completed (the first stage has none). Returns whether anything changed
    /// (re-completing is a no-op).
    pub(crate) fn complete_challenge_stage(
        &mut self,
        level: Level,
        unit_id: &str,
        stage_id: &str,
    ) -> Result<bool, ProgressionError> {
        let unknown = || ProgressionError::UnknownChallengeStage {
            level,
            unit_id: unit_id.to_string(),
            stage_id: stage_id.to_string(),
        };
        let unit = challenge_path::find_unit(level, unit_id).ok_or_else(unknown)?;
        let position = unit.stage_position(stage_id).ok_or_else(unknown)?;

        if self.challenge_progress.stored(level, unit_id, stage_id) == Some(StageStatus::Completed)
        {
            return Ok(false);
        }

        if position > 0 {
            let predecessor = unit.stages[position - 1].id;
            if self.challenge_progress.stored(level, unit_id, predecessor)
                != Some(StageStatus::Completed)
            {
                return Err(ProgressionError::StageLocked {
                    level,
                    unit_id: unit_id.to_string(),
                    stage_id: stage_id.to_string(),
                });
            }
        }

        self.challenge_progress
            .mark_completed(level, unit_id, stage_id);
        Ok(true)
    }

    pub(crate) fn import_generated_deck(&mut self, payload: GeneratedDeck) -> DeckId {
        let deck_id = self.add_deck(DeckDraft {
            title: payload.title,
            category: payload.category,
            level: payload.level,
        });
        for card in payload.cards {
            // the deck was created just above, so this cannot fail
            let _ = self.add_card(deck_id, card);
        }
        deck_id
    }

    pub(crate) fn import_generated_grammar_lesson(
        &mut self,
        payload: GeneratedGrammarLesson,
    ) -> LessonId {
        self.add_grammar_lesson(GrammarLessonDraft {
            title: payload.title,
            level: payload.level,
            explanation: payload.explanation,
            examples: payload.examples,
        })
    }

    pub(crate) fn import_generated_quiz(&mut self, payload: GeneratedQuiz) -> QuizId {
        self.add_quiz(QuizDraft {
            title: payload.title,
            category: payload.category,
            level: payload.level,
            questions: payload.questions,
        })
    }

    /// Stats rows joined with deck titles for display. Rows whose deck
    /// vanished (which the transitions never produce) join to an empty topic.
    pub fn deck_stats_view(&self) -> Vec<DeckStatView> {
        let titles: FxHashMap<DeckId, &str> = self
            .decks
            .iter()
            .map(|deck| (deck.id, deck.title.as_str()))
            .collect();
        self.deck_stats
            .iter()
            .map(|row| DeckStatView {
                deck: row.deck,
                topic: titles.get(&row.deck).copied().unwrap_or_default().to_string(),
                progress: row.progress,
                total: row.total,
            })
            .collect()
    }
}
