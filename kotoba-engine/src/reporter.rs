//! Read-only aggregation across learners, for the admin dashboard. A report
//! works on owned snapshots handed to it, so it can never contend with or
//! mutate live stores.

use learner_utils::profile::{CohortAccuracy, LearnerOverviewRow, LearnerProfile};
use learner_utils::{Category, Level};

use crate::state::LearnerState;
use crate::stats::{self, QuizScope};

/// One learner's profile paired with a snapshot of their document.
#[derive(Clone, Debug)]
pub struct LearnerRecord {
    pub profile: LearnerProfile,
    pub state: LearnerState,
}

/// One row per learner, in the order the records were handed in.
pub fn learner_overview(records: &[LearnerRecord]) -> Vec<LearnerOverviewRow> {
    records
        .iter()
        .map(|record| LearnerOverviewRow {
            learner_id: record.profile.id.clone(),
            name: record.profile.name.clone(),
            email: record.profile.email.clone(),
            deck_completion_percent: stats::overall_deck_completion(&record.state),
            grammar_completion_percent: stats::grammar_completion(&record.state),
            quiz_average_percent: stats::quiz_average(&record.state, QuizScope::default()),
        })
        .collect()
}

fn mean_percent(records: &[LearnerRecord], scope: QuizScope) -> u32 {
    if records.is_empty() {
        return 0;
    }
    let sum: u64 = records
        .iter()
        .map(|record| stats::quiz_average(&record.state, scope) as u64)
        .sum();
    stats::round_half_up(sum as f64 / records.len() as f64)
}

/// Mean quiz accuracy across a cohort at one level, split into vocabulary
/// and grammar. Every learner counts: someone with no scored quizzes at the
/// level contributes a zero rather than shrinking the denominator.
pub fn cohort_accuracy(records: &[LearnerRecord], level: Level) -> CohortAccuracy {
    CohortAccuracy {
        level,
        vocabulary_accuracy_percent: mean_percent(
            records,
            QuizScope::level_and_category(level, Category::Vocabulary),
        ),
        grammar_accuracy_percent: mean_percent(
            records,
            QuizScope::level_and_category(level, Category::Grammar),
        ),
        learner_count: records.len(),
    }
}
