//! Derives what the challenge path should look like from the sparse stored
//! progress. Pure and deterministic, so hosts can call it on every render;
//! it never writes defaults back into the map.

use serde::{Deserialize, Serialize};

use learner_utils::Level;
use learner_utils::challenge_path::ChallengeUnit;

use crate::state::ChallengeProgress;

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum StageStatus {
    Locked,
    Active,
    Completed,
}

/// Display statuses for every stage of a unit, in play order.
///
/// Only stored `Completed` entries are authoritative; stored `Active` or
/// `Locked` markers left behind by older documents are ignored. A stage is
/// `Active` when it is the first stage of the unit or its predecessor is
/// completed, `Locked` otherwise.
pub fn unit_statuses(
    progress: &ChallengeProgress,
    level: Level,
    unit: &ChallengeUnit,
) -> Vec<(&'static str, StageStatus)> {
    let mut statuses = Vec::with_capacity(unit.stages.len());
    let mut predecessor_completed = true;
    for stage in unit.stages {
        let completed =
            progress.stored(level, unit.id, stage.id) == Some(StageStatus::Completed);
        let status = if completed {
            StageStatus::Completed
        } else if predecessor_completed {
            StageStatus::Active
        } else {
            StageStatus::Locked
        };
        statuses.push((stage.id, status));
        predecessor_completed = completed;
    }
    statuses
}

/// Display status of a single stage. `None` when the stage is not part of
/// the unit.
pub fn stage_status(
    progress: &ChallengeProgress,
    level: Level,
    unit: &ChallengeUnit,
    stage_id: &str,
) -> Option<StageStatus> {
    let position = unit.stage_position(stage_id)?;
    unit_statuses(progress, level, unit)
        .get(position)
        .map(|(_, status)| *status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use learner_utils::challenge_path::find_unit;

    #[test]
    fn test_fresh_unit_has_exactly_one_active_stage() {
        let progress = ChallengeProgress::default();
        let unit = find_unit(Level::N5, "unit-1").unwrap();

        let statuses = unit_statuses(&progress, Level::N5, unit);
        assert_eq!(statuses[0].1, StageStatus::Active);
        for (_, status) in &statuses[1..] {
            assert_eq!(*status, StageStatus::Locked);
        }
    }

    #[test]
    fn test_completion_advances_the_active_stage() {
        let mut progress = ChallengeProgress::default();
        progress.mark_completed(Level::N5, "unit-1", "stage-1");
        progress.mark_completed(Level::N5, "unit-1", "stage-2");
        let unit = find_unit(Level::N5, "unit-1").unwrap();

        let statuses = unit_statuses(&progress, Level::N5, unit);
        assert_eq!(statuses[0].1, StageStatus::Completed);
        assert_eq!(statuses[1].1, StageStatus::Completed);
        assert_eq!(statuses[2].1, StageStatus::Active);
        assert_eq!(statuses[3].1, StageStatus::Locked);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let mut progress = ChallengeProgress::default();
        progress.mark_completed(Level::N4, "unit-1", "stage-1");
        let unit = find_unit(Level::N4, "unit-1").unwrap();

        let first = unit_statuses(&progress, Level::N4, unit);
        let second = unit_statuses(&progress, Level::N4, unit);
        assert_eq!(first, second);
    }

    #[test]
    fn test_units_do_not_gate_each_other() {
        let progress = ChallengeProgress::default();
        let unit_two = find_unit(Level::N5, "unit-2").unwrap();

        // nothing completed in unit-1, yet unit-2's first stage is playable
        assert_eq!(
            stage_status(&progress, Level::N5, unit_two, "stage-1"),
            Some(StageStatus::Active)
        );
    }

    #[test]
    fn test_unknown_stage_yields_none() {
        let progress = ChallengeProgress::default();
        let unit = find_unit(Level::N5, "unit-1").unwrap();
        assert_eq!(stage_status(&progress, Level::N5, unit, "stage-99"), None);
    }

    #[test]
    fn test_stale_stored_markers_are_ignored() {
        // documents written by older builds may carry Active/Locked entries;
        // only Completed is authoritative
        let json = r#"{"levels":{"N5":{"unit-1":{"stage-2":"Active","stage-3":"Completed"}}}}"#;
        let progress: ChallengeProgress = serde_json::from_str(json).unwrap();
        let unit = find_unit(Level::N5, "unit-1").unwrap();

        let statuses = unit_statuses(&progress, Level::N5, unit);
        assert_eq!(statuses[0].1, StageStatus::Active);
        assert_eq!(statuses[1].1, StageStatus::Locked, "stored Active is not trusted");
        assert_eq!(statuses[2].1, StageStatus::Completed);
        assert_eq!(statuses[3].1, StageStatus::Active);
    }

    #[test]
    fn test_completed_stages_form_a_prefix() {
        let mut progress = ChallengeProgress::default();
        progress.mark_completed(Level::N5, "unit-1", "stage-1");
        progress.mark_completed(Level::N5, "unit-1", "stage-2");
        progress.mark_completed(Level::N5, "unit-1", "stage-3");
        let unit = find_unit(Level::N5, "unit-1").unwrap();

        let statuses = unit_statuses(&progress, Level::N5, unit);
        let first_incomplete = statuses
            .iter()
            .position(|(_, status)| *status != StageStatus::Completed)
            .unwrap_or(statuses.len());
        for (_, status) in &statuses[..first_incomplete] {
            assert_eq!(*status, StageStatus::Completed);
        }
        for (_, status) in &statuses[first_incomplete..] {
            assert_ne!(*status, StageStatus::Completed);
        }
    }
}
