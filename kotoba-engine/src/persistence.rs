//! Durable storage for learner documents.
//!
//! The store talks to a [`LearnerVault`] and nothing else, so the same engine
//! runs against an in-memory map in tests and a JSON file tree in production.
//! Documents are written through [`VersionedLearnerState`] so old files stay
//! readable when the schema grows a `V2`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::state::LearnerState;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage backend seam. Implementations only move bytes; all progression
/// rules live above this trait.
pub trait LearnerVault {
    /// Loads the learner's document. `Ok(None)` means no document exists yet,
    /// which the store treats as a brand-new learner.
    fn load(&self, learner_id: &str) -> Result<Option<LearnerState>, VaultError>;

    fn save(&self, learner_id: &str, state: &LearnerState) -> Result<(), VaultError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum VersionedLearnerState {
    V1(LearnerState),
}
impl From<LearnerState> for VersionedLearnerState {
    fn from(state: LearnerState) -> Self {
        VersionedLearnerState::V1(state)
    }
}
impl From<VersionedLearnerState> for LearnerState {
    fn from(state: VersionedLearnerState) -> Self {
        match state {
            VersionedLearnerState::V1(state) => state,
        }
    }
}

fn to_document(state: &LearnerState) -> Result<String, VaultError> {
    let versioned = VersionedLearnerState::from(state.clone());
    Ok(serde_json::to_string(&versioned)?)
}

fn from_document(document: &str) -> Result<LearnerState, VaultError> {
    let versioned: VersionedLearnerState = serde_json::from_str(document)?;
    Ok(versioned.into())
}

/// Vault backed by a shared map of serialized documents. Clones share the
/// map, so a test can reopen a store against "the same storage".
#[derive(Clone, Default)]
pub struct MemoryVault {
    documents: Arc<Mutex<BTreeMap<String, String>>>,
}

impl LearnerVault for MemoryVault {
    fn load(&self, learner_id: &str) -> Result<Option<LearnerState>, VaultError> {
        let documents = self
            .documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match documents.get(learner_id) {
            Some(document) => Ok(Some(from_document(document)?)),
            None => Ok(None),
        }
    }

    fn save(&self, learner_id: &str, state: &LearnerState) -> Result<(), VaultError> {
        let document = to_document(state)?;
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(learner_id.to_string(), document);
        Ok(())
    }
}

/// Vault that keeps one JSON file per learner under a directory.
pub struct JsonFileVault {
    directory: PathBuf,
}

impl JsonFileVault {
    /// Opens the vault, creating the directory if it does not exist yet.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    fn document_path(&self, learner_id: &str) -> PathBuf {
        self.directory.join(format!("learner__{learner_id}.json"))
    }
}

impl LearnerVault for JsonFileVault {
    fn load(&self, learner_id: &str) -> Result<Option<LearnerState>, VaultError> {
        match std::fs::read_to_string(self.document_path(learner_id)) {
            Ok(document) => Ok(Some(from_document(&document)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, learner_id: &str, state: &LearnerState) -> Result<(), VaultError> {
        let path = self.document_path(learner_id);
        // Write to a sibling then rename, so a crash mid-write can never
        // leave a truncated document behind.
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, to_document(state)?)?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }
}
