use crate::Level;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LearnerProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// One admin-dashboard row per learner. Percentages are already rounded.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LearnerOverviewRow {
    pub learner_id: String,
    pub name: String,
    pub email: String,
    pub deck_completion_percent: u32,
    pub grammar_completion_percent: u32,
    pub quiz_average_percent: u32,
}

/// Cohort-wide quiz accuracy at one level, split by category.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CohortAccuracy {
    pub level: Level,
    pub vocabulary_accuracy_percent: u32,
    pub grammar_accuracy_percent: u32,
    pub learner_count: usize,
}
