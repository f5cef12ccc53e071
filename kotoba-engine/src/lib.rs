//! Progression and economy engine for a language-learning app.
//! It was created for Kotoba, so it doesn't include much that was not needed for that project.
//!
//! How state flows:
//! 1. Each learner has one document ([`LearnerState`]): decks, lessons, quizzes, scores, challenge progress, hearts and diamonds.
//! 2. All mutations go through a [`ProgressionStore`], which applies each operation to a clone of the document and swaps it in as one step, so a failed operation leaves nothing behind.
//! 3. Committed operations are saved through a [`LearnerVault`] and announced to subscribed listeners with the slice of the document they touched.
//! 4. Derived numbers (completion percentages, quiz accuracy, stage unlock statuses) are never stored; they are computed from the document on demand.
//! 5. An [`EconomyClock`] polls a shared store once a second and grants hearts that have come due, one at a time.

pub mod economy;
pub mod persistence;
pub mod reporter;
pub mod seed;
pub mod state;
pub mod stats;
pub mod store;
pub mod unlock;

pub use economy::{EconomyClock, HEART_REGEN_MINUTES, MAX_HEARTS};
pub use persistence::{JsonFileVault, LearnerVault, MemoryVault, VaultError, VersionedLearnerState};
pub use reporter::LearnerRecord;
pub use state::{ChallengeProgress, DeckStat, DeckStatView, LearnerState, ProgressionError};
pub use stats::QuizScope;
pub use store::{ListenerKey, ProgressionStore, SharedProgressionStore, StateChange};
pub use unlock::StageStatus;
