//! Persistence for the state the decision core hands back to its caller.
//!
//! The scheduler's history/suppression pair is stored as a single
//! [`InterventionRecord`] value so that one write updates both.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::calibration_history::CalibrationHistory;
use crate::errors::{GuardError, GuardResult};
use crate::intervention_scheduler::{InterventionHistory, InterventionKey, SuppressionState};
use crate::trust_calibrator::{AccuracyHistory, TaskType};

const INTERVENTIONS_TREE: &str = "interventions";
const CALIBRATION_TREE: &str = "calibration";
const ACCURACY_TREE: &str = "accuracy";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionRecord {
    pub history: InterventionHistory,
    pub suppression: SuppressionState,
}

impl InterventionRecord {
    pub fn new(history: InterventionHistory, suppression: SuppressionState) -> Self {
        Self { history, suppression }
    }
}

pub trait StateStore: Send + Sync {
    fn load_intervention(&self, key: &InterventionKey) -> GuardResult<Option<InterventionRecord>>;

    fn save_intervention(&mut self, key: &InterventionKey, record: &InterventionRecord) -> GuardResult<()>;

    fn load_calibration(&self, user_id: &str) -> GuardResult<Option<CalibrationHistory>>;

    fn save_calibration(&mut self, user_id: &str, history: &CalibrationHistory) -> GuardResult<()>;

    fn load_accuracy(&self, user_id: &str, task_type: TaskType) -> GuardResult<Option<AccuracyHistory>>;

    fn save_accuracy(&mut self, user_id: &str, task_type: TaskType, accuracy: &AccuracyHistory) -> GuardResult<()>;

    /// Write a user's calibration ring and one task's accuracy together; either both land or neither does.
    fn save_outcome(
        &mut self,
        user_id: &str,
        task_type: TaskType,
        history: &CalibrationHistory,
        accuracy: &AccuracyHistory,
    ) -> GuardResult<()>;
}

fn accuracy_key(user_id: &str, task_type: TaskType) -> String {
    format!("{user_id}/{task_type}")
}

/// In-process store, used by tests and by callers that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    interventions: HashMap<String, InterventionRecord>,
    calibration: HashMap<String, CalibrationHistory>,
    accuracy: HashMap<String, AccuracyHistory>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load_intervention(&self, key: &InterventionKey) -> GuardResult<Option<InterventionRecord>> {
        Ok(self.interventions.get(&key.storage_key()).cloned())
    }

    fn save_intervention(&mut self, key: &InterventionKey, record: &InterventionRecord) -> GuardResult<()> {
        self.interventions.insert(key.storage_key(), record.clone());
        Ok(())
    }

    fn load_calibration(&self, user_id: &str) -> GuardResult<Option<CalibrationHistory>> {
        Ok(self.calibration.get(user_id).cloned())
    }

    fn save_calibration(&mut self, user_id: &str, history: &CalibrationHistory) -> GuardResult<()> {
        self.calibration.insert(user_id.to_string(), history.clone());
        Ok(())
    }

    fn load_accuracy(&self, user_id: &str, task_type: TaskType) -> GuardResult<Option<AccuracyHistory>> {
        Ok(self.accuracy.get(&accuracy_key(user_id, task_type)).copied())
    }

    fn save_accuracy(&mut self, user_id: &str, task_type: TaskType, accuracy: &AccuracyHistory) -> GuardResult<()> {
        self.accuracy.insert(accuracy_key(user_id, task_type), *accuracy);
        Ok(())
    }

    fn save_outcome(
        &mut self,
        user_id: &str,
        task_type: TaskType,
        history: &CalibrationHistory,
        accuracy: &AccuracyHistory,
    ) -> GuardResult<()> {
        self.calibration.insert(user_id.to_string(), history.clone());
        self.accuracy.insert(accuracy_key(user_id, task_type), *accuracy);
        Ok(())
    }
}

/// A sled-backed store; values are JSON.
pub struct SledStateStore {
    db: Db,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> GuardResult<Self> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| GuardError::database(format!("open sled db at {}", path.display()), e))?;
        debug!(path = %path.display(), "opened state store");
        Ok(Self { db })
    }

    fn tree(&self, name: &str) -> GuardResult<sled::Tree> {
        self.db
            .open_tree(name)
            .map_err(|e| GuardError::database(format!("open tree {name}"), e))
    }

    fn get<T: DeserializeOwned>(&self, tree: &str, key: &str) -> GuardResult<Option<T>> {
        match self.tree(tree)?.get(key.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| GuardError::serialization(format!("decode {tree}/{key}"), e)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(&self, tree: &str, key: &str, value: &T) -> GuardResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| GuardError::serialization(format!("encode {tree}/{key}"), e))?;
        let tree = self.tree(tree)?;
        tree.insert(key.as_bytes(), bytes)?;
        tree.flush()?;
        Ok(())
    }
}

impl StateStore for SledStateStore {
    fn load_intervention(&self, key: &InterventionKey) -> GuardResult<Option<InterventionRecord>> {
        self.get(INTERVENTIONS_TREE, &key.storage_key())
    }

    fn save_intervention(&mut self, key: &InterventionKey, record: &InterventionRecord) -> GuardResult<()> {
        self.put(INTERVENTIONS_TREE, &key.storage_key(), record)
    }

    fn load_calibration(&self, user_id: &str) -> GuardResult<Option<CalibrationHistory>> {
        self.get(CALIBRATION_TREE, user_id)
    }

    fn save_calibration(&mut self, user_id: &str, history: &CalibrationHistory) -> GuardResult<()> {
        self.put(CALIBRATION_TREE, user_id, history)
    }

    fn load_accuracy(&self, user_id: &str, task_type: TaskType) -> GuardResult<Option<AccuracyHistory>> {
        self.get(ACCURACY_TREE, &accuracy_key(user_id, task_type))
    }

    fn save_accuracy(&mut self, user_id: &str, task_type: TaskType, accuracy: &AccuracyHistory) -> GuardResult<()> {
        self.put(ACCURACY_TREE, &accuracy_key(user_id, task_type), accuracy)
    }

    fn save_outcome(
        &mut self,
        user_id: &str,
        task_type: TaskType,
        history: &CalibrationHistory,
        accuracy: &AccuracyHistory,
    ) -> GuardResult<()> {
        let key = accuracy_key(user_id, task_type);
        let history_bytes = serde_json::to_vec(history)
            .map_err(|e| GuardError::serialization(format!("encode {CALIBRATION_TREE}/{user_id}"), e))?;
        let accuracy_bytes = serde_json::to_vec(accuracy)
            .map_err(|e| GuardError::serialization(format!("encode {ACCURACY_TREE}/{key}"), e))?;

        let calibration = self.tree(CALIBRATION_TREE)?;
        let accuracy_tree = self.tree(ACCURACY_TREE)?;
        (&calibration, &accuracy_tree)
            .transaction(|(calibration, accuracy_tree)| {
                calibration.insert(user_id.as_bytes(), history_bytes.as_slice())?;
                accuracy_tree.insert(key.as_bytes(), accuracy_bytes.as_slice())?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e| match e {
                TransactionError::Storage(e) => GuardError::database(format!("record outcome for {user_id}"), e),
                TransactionError::Abort(()) => GuardError::internal(format!("outcome transaction for {user_id} aborted")),
            })?;
        self.db.flush()?;
        Ok(())
    }
}
