//! The per-learner store, the one place mutations enter. Every operation
//! clones the current document, applies the transition to the clone and swaps
//! it in as a single step, so a failed operation leaves no trace and readers
//! never see a half-applied one. Committed operations are saved through the
//! vault and announced to listeners; a save failure is logged and the store
//! keeps serving from memory.

use chrono::{DateTime, Utc};
use slotmap::SlotMap;
use std::sync::Arc;

use learner_utils::{
    CardDraft, CardId, CardPatch, DeckDraft, DeckId, DeckPatch, GeneratedDeck,
    GeneratedGrammarLesson, GeneratedQuiz, GrammarLessonDraft, GrammarLessonPatch, LessonId, Level,
    QuizDraft, QuizId, QuizPatch,
};

use crate::persistence::{LearnerVault, VaultError};
use crate::seed;
use crate::state::{LearnerState, ProgressionError};

slotmap::new_key_type! { pub struct ListenerKey; }

/// Which slice of the learner document a committed operation touched.
/// Listeners filter on this the way a UI panel only re-renders for its slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateChange {
    Decks,
    DeckStats,
    GrammarLessons,
    FavoriteLessons,
    Quizzes,
    QuizScores,
    ChallengeProgress,
    Economy,
}

pub type SharedProgressionStore = Arc<tokio::sync::Mutex<ProgressionStore>>;

pub struct ProgressionStore {
    learner_id: String,
    state: LearnerState,
    vault: Box<dyn LearnerVault + Send>,
    listeners: SlotMap<ListenerKey, Box<dyn FnMut(&StateChange) + Send>>,
}

impl ProgressionStore {
    /// Opens the learner's store: rehydrates the stored document, or seeds
    /// starter content for a brand-new learner. Hearts that came due while
    /// the store was closed are granted before the store is handed out.
    ///
    /// A load failure is fatal; seeding over a document that exists but
    /// cannot be read would silently erase the learner's history.
    pub fn open(
        learner_id: impl Into<String>,
        vault: impl LearnerVault + Send + 'static,
        now: DateTime<Utc>,
    ) -> Result<Self, VaultError> {
        let learner_id = learner_id.into();
        let state = match vault.load(&learner_id)? {
            Some(state) => state,
            None => {
                log::info!("No document for learner {learner_id}, seeding starter content");
                let state = seed::starter_state();
                if let Err(e) = vault.save(&learner_id, &state) {
                    log::warn!("Failed to persist seeded document for {learner_id}: {e:?}");
                }
                state
            }
        };
        let mut store = Self {
            learner_id,
            state,
            vault: Box::new(vault),
            listeners: SlotMap::with_key(),
        };
        let granted = store.grant_due_hearts(now);
        if granted > 0 {
            log::info!(
                "Granted {granted} heart(s) that regenerated while learner {} was away",
                store.learner_id
            );
        }
        Ok(store)
    }

    pub fn into_shared(self) -> SharedProgressionStore {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    /// The live document, for reads.
    pub fn state(&self) -> &LearnerState {
        &self.state
    }

    /// An owned snapshot detached from later mutations. O(1), the collections
    /// are structurally shared.
    pub fn snapshot(&self) -> LearnerState {
        self.state.clone()
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&StateChange) + Send + 'static,
    ) -> ListenerKey {
        self.listeners.insert(Box::new(callback))
    }

    pub fn unsubscribe(&mut self, key: ListenerKey) {
        self.listeners.remove(key);
    }

    fn after_commit(&mut self, changes: &[StateChange]) {
        if let Err(e) = self.vault.save(&self.learner_id, &self.state) {
            log::warn!("Failed to persist learner {}: {e:?}", self.learner_id);
        }
        for change in changes {
            for callback in self.listeners.values_mut() {
                callback(change);
            }
        }
    }

    fn commit<T>(
        &mut self,
        changes: &[StateChange],
        op: impl FnOnce(&mut LearnerState) -> Result<T, ProgressionError>,
    ) -> Result<T, ProgressionError> {
        let mut next = self.state.clone();
        let value = op(&mut next)?;
        self.state = next;
        self.after_commit(changes);
        Ok(value)
    }

    fn commit_infallible<T>(
        &mut self,
        changes: &[StateChange],
        op: impl FnOnce(&mut LearnerState) -> T,
    ) -> T {
        let mut next = self.state.clone();
        let value = op(&mut next);
        self.state = next;
        self.after_commit(changes);
        value
    }

    /// For transitions that report "did anything change" as a bool: a `false`
    /// discards the clone and skips persisting and notifying entirely.
    fn commit_changed(
        &mut self,
        changes: &[StateChange],
        op: impl FnOnce(&mut LearnerState) -> bool,
    ) -> bool {
        let mut next = self.state.clone();
        if !op(&mut next) {
            return false;
        }
        self.state = next;
        self.after_commit(changes);
        true
    }

    // ---- decks ----

    pub fn add_deck(&mut self, draft: DeckDraft) -> DeckId {
        self.commit_infallible(&[StateChange::Decks, StateChange::DeckStats], |state| {
            state.add_deck(draft)
        })
    }

    pub fn update_deck(&mut self, id: DeckId, patch: DeckPatch) -> Result<(), ProgressionError> {
        self.commit(&[StateChange::Decks], |state| state.update_deck(id, patch))
    }

    pub fn delete_deck(&mut self, id: DeckId) -> Result<(), ProgressionError> {
        self.commit(&[StateChange::Decks, StateChange::DeckStats], |state| {
            state.delete_deck(id)
        })
    }

    pub fn add_card(&mut self, deck: DeckId, draft: CardDraft) -> Result<CardId, ProgressionError> {
        self.commit(&[StateChange::Decks, StateChange::DeckStats], |state| {
            state.add_card(deck, draft)
        })
    }

    pub fn update_card(
        &mut self,
        deck: DeckId,
        card: CardId,
        patch: CardPatch,
    ) -> Result<(), ProgressionError> {
        self.commit(&[StateChange::Decks], |state| {
            state.update_card(deck, card, patch)
        })
    }

    pub fn delete_card(&mut self, deck: DeckId, card: CardId) -> Result<(), ProgressionError> {
        self.commit(&[StateChange::Decks, StateChange::DeckStats], |state| {
            state.delete_card(deck, card)
        })
    }

    pub fn set_mastered_count(
        &mut self,
        deck: DeckId,
        mastered: u32,
    ) -> Result<(), ProgressionError> {
        self.commit(&[StateChange::DeckStats], |state| {
            state.set_mastered_count(deck, mastered)
        })
    }

    /// Mastery update addressed by deck title. Titles are not unique; the
    /// earliest matching deck wins, matching how the stats panel lists them.
    pub fn set_mastered_count_by_topic(
        &mut self,
        topic: &str,
        mastered: u32,
    ) -> Result<(), ProgressionError> {
        let deck = self
            .state
            .deck_id_by_title(topic)
            .ok_or_else(|| ProgressionError::TopicNotFound(topic.to_string()))?;
        self.set_mastered_count(deck, mastered)
    }

    // ---- grammar lessons ----

    pub fn add_grammar_lesson(&mut self, draft: GrammarLessonDraft) -> LessonId {
        self.commit_infallible(&[StateChange::GrammarLessons], |state| {
            state.add_grammar_lesson(draft)
        })
    }

    pub fn update_grammar_lesson(
        &mut self,
        id: LessonId,
        patch: GrammarLessonPatch,
    ) -> Result<(), ProgressionError> {
        self.commit(&[StateChange::GrammarLessons], |state| {
            state.update_grammar_lesson(id, patch)
        })
    }

    pub fn delete_grammar_lesson(&mut self, id: LessonId) -> Result<(), ProgressionError> {
        self.commit(
            &[StateChange::GrammarLessons, StateChange::FavoriteLessons],
            |state| state.delete_grammar_lesson(id),
        )
    }

    pub fn set_lesson_read(&mut self, id: LessonId, read: bool) -> Result<(), ProgressionError> {
        self.commit(&[StateChange::GrammarLessons], |state| {
            state.set_lesson_read(id, read)
        })
    }

    /// Toggles favorite membership, returning whether the lesson is now a
    /// favorite.
    pub fn toggle_favorite_lesson(&mut self, id: LessonId) -> Result<bool, ProgressionError> {
        self.commit(&[StateChange::FavoriteLessons], |state| {
            state.toggle_favorite_lesson(id)
        })
    }

    // ---- quizzes ----

    pub fn add_quiz(&mut self, draft: QuizDraft) -> QuizId {
        self.commit_infallible(&[StateChange::Quizzes], |state| state.add_quiz(draft))
    }

    pub fn update_quiz(&mut self, id: QuizId, patch: QuizPatch) -> Result<(), ProgressionError> {
        self.commit(&[StateChange::Quizzes], |state| state.update_quiz(id, patch))
    }

    pub fn delete_quiz(&mut self, id: QuizId) -> Result<(), ProgressionError> {
        self.commit(&[StateChange::Quizzes, StateChange::QuizScores], |state| {
            state.delete_quiz(id)
        })
    }

    /// Records a quiz score if it beats the stored one. `Ok(false)` means the
    /// submission lost to an earlier score and nothing was written.
    pub fn submit_quiz_score(&mut self, id: QuizId, score: u8) -> Result<bool, ProgressionError> {
        let mut next = self.state.clone();
        if !next.submit_quiz_score(id, score)? {
            return Ok(false);
        }
        self.state = next;
        self.after_commit(&[StateChange::QuizScores]);
        Ok(true)
    }

    // ---- challenge path ----

    /// Marks a challenge stage completed. `Ok(false)` means it already was.
    pub fn complete_challenge_stage(
        &mut self,
        level: Level,
        unit_id: &str,
        stage_id: &str,
    ) -> Result<bool, ProgressionError> {
        let mut next = self.state.clone();
        if !next.complete_challenge_stage(level, unit_id, stage_id)? {
            return Ok(false);
        }
        self.state = next;
        self.after_commit(&[StateChange::ChallengeProgress]);
        Ok(true)
    }

    // ---- economy ----

    /// Spends a heart. `false` means the learner was already at zero.
    pub fn lose_heart(&mut self, now: DateTime<Utc>) -> bool {
        self.commit_changed(&[StateChange::Economy], |state| state.lose_heart(now))
    }

    /// Regenerates one heart. `false` means the learner was already full.
    pub fn gain_heart(&mut self, now: DateTime<Utc>) -> bool {
        self.commit_changed(&[StateChange::Economy], |state| state.gain_heart(now))
    }

    /// Grants every heart owed at `now`, one committed operation each, and
    /// returns how many were granted.
    pub fn grant_due_hearts(&mut self, now: DateTime<Utc>) -> u8 {
        let mut granted = 0;
        while self.state.heart_due(now) {
            if !self.gain_heart(now) {
                break;
            }
            granted += 1;
        }
        granted
    }

    /// Trades diamonds for hearts. `false` means the purchase was rejected
    /// and nothing was deducted.
    pub fn purchase_hearts(&mut self, count: u8, cost: u32) -> bool {
        self.commit_changed(&[StateChange::Economy], |state| {
            state.purchase_hearts(count, cost)
        })
    }

    pub fn add_diamonds(&mut self, amount: u32) {
        self.commit_infallible(&[StateChange::Economy], |state| state.add_diamonds(amount));
    }

    // ---- generated content ----

    pub fn import_generated_deck(&mut self, payload: GeneratedDeck) -> DeckId {
        self.commit_infallible(&[StateChange::Decks, StateChange::DeckStats], |state| {
            state.import_generated_deck(payload)
        })
    }

    pub fn import_generated_grammar_lesson(&mut self, payload: GeneratedGrammarLesson) -> LessonId {
        self.commit_infallible(&[StateChange::GrammarLessons], |state| {
            state.import_generated_grammar_lesson(payload)
        })
    }

    pub fn import_generated_quiz(&mut self, payload: GeneratedQuiz) -> QuizId {
        self.commit_infallible(&[StateChange::Quizzes], |state| {
            state.import_generated_quiz(payload)
        })
    }
}
