//! The statically-defined challenge path: per level, an ordered list of units,
//! each an ordered list of stages. Learner progress against it is stored
//! separately (sparsely) by the engine; this module is pure content.

use crate::Level;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChallengeStage {
    pub id: &'static str,
    pub title: &'static str,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChallengeUnit {
    pub id: &'static str,
    pub title: &'static str,
    /// Declaration order is the play order. Stage ids carry a matching
    /// numeric suffix (`stage-1`, `stage-2`, ...).
    pub stages: &'static [ChallengeStage],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LevelChallenges {
    pub level: Level,
    pub units: &'static [ChallengeUnit],
}

pub const CHALLENGE_PATH: &[LevelChallenges] = &[
    LevelChallenges {
        level: Level::N5,
        units: &[
            ChallengeUnit {
                id: "unit-1",
                title: "Hiragana",
                stages: &[
                    ChallengeStage {
                        id: "stage-1",
                        title: "Vowels",
                    },
                    ChallengeStage {
                        id: "stage-2",
                        title: "K and S rows",
                    },
                    ChallengeStage {
                        id: "stage-3",
                        title: "T and N rows",
                    },
                    ChallengeStage {
                        id: "stage-4",
                        title: "H, M, Y rows",
                    },
                    ChallengeStage {
                        id: "stage-5",
                        title: "Hiragana review",
                    },
                ],
            },
            ChallengeUnit {
                id: "unit-2",
                title: "Katakana",
                stages: &[
                    ChallengeStage {
                        id: "stage-1",
                        title: "Vowels and K row",
                    },
                    ChallengeStage {
                        id: "stage-2",
                        title: "S through N rows",
                    },
                    ChallengeStage {
                        id: "stage-3",
                        title: "Loanword practice",
                    },
                    ChallengeStage {
                        id: "stage-4",
                        title: "Katakana review",
                    },
                ],
            },
            ChallengeUnit {
                id: "unit-3",
                title: "First words",
                stages: &[
                    ChallengeStage {
                        id: "stage-1",
                        title: "Greetings",
                    },
                    ChallengeStage {
                        id: "stage-2",
                        title: "Numbers",
                    },
                    ChallengeStage {
                        id: "stage-3",
                        title: "In the classroom",
                    },
                ],
            },
        ],
    },
    LevelChallenges {
        level: Level::N4,
        units: &[
            ChallengeUnit {
                id: "unit-1",
                title: "Particles",
                stages: &[
                    ChallengeStage {
                        id: "stage-1",
                        title: "は and が",
                    },
                    ChallengeStage {
                        id: "stage-2",
                        title: "を, に, で",
                    },
                    ChallengeStage {
                        id: "stage-3",
                        title: "から and まで",
                    },
                    ChallengeStage {
                        id: "stage-4",
                        title: "Particle review",
                    },
                ],
            },
            ChallengeUnit {
                id: "unit-2",
                title: "Verb forms",
                stages: &[
                    ChallengeStage {
                        id: "stage-1",
                        title: "て form",
                    },
                    ChallengeStage {
                        id: "stage-2",
                        title: "Potential form",
                    },
                    ChallengeStage {
                        id: "stage-3",
                        title: "Volitional form",
                    },
                ],
            },
        ],
    },
    LevelChallenges {
        level: Level::N3,
        units: &[ChallengeUnit {
            id: "unit-1",
            title: "Casual speech",
            stages: &[
                ChallengeStage {
                    id: "stage-1",
                    title: "Contractions",
                },
                ChallengeStage {
                    id: "stage-2",
                    title: "Sentence-final particles",
                },
                ChallengeStage {
                    id: "stage-3",
                    title: "Casual conversation",
                },
            ],
        }],
    },
    LevelChallenges {
        level: Level::N2,
        units: &[ChallengeUnit {
            id: "unit-1",
            title: "Formal writing",
            stages: &[
                ChallengeStage {
                    id: "stage-1",
                    title: "である style",
                },
                ChallengeStage {
                    id: "stage-2",
                    title: "Keigo foundations",
                },
                ChallengeStage {
                    id: "stage-3",
                    title: "Business email",
                },
            ],
        }],
    },
    LevelChallenges {
        level: Level::N1,
        units: &[ChallengeUnit {
            id: "unit-1",
            title: "Nuance and idiom",
            stages: &[
                ChallengeStage {
                    id: "stage-1",
                    title: "Four-character idioms",
                },
                ChallengeStage {
                    id: "stage-2",
                    title: "Literary grammar",
                },
                ChallengeStage {
                    id: "stage-3",
                    title: "Editorial reading",
                },
            ],
        }],
    },
];

pub fn units_for(level: Level) -> &'static [ChallengeUnit] {
    CHALLENGE_PATH
        .iter()
        .find(|entry| entry.level == level)
        .map(|entry| entry.units)
        .unwrap_or_default()
}

pub fn find_unit(level: Level, unit_id: &str) -> Option<&'static ChallengeUnit> {
    units_for(level).iter().find(|unit| unit.id == unit_id)
}

impl ChallengeUnit {
    /// Position of a stage within this unit's play order.
    pub fn stage_position(&self, stage_id: &str) -> Option<usize> {
        self.stages.iter().position(|stage| stage.id == stage_id)
    }
}
