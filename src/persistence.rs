use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::core::{CoinData, Prediction};
use crate::error::{ImportError, PersistenceError};

/// Logical name of the single slot the collection is stored under.
pub const STORAGE_KEY: &str = "predictions";

/// Durable home of the prediction collection.
///
/// `load` never fails: missing or unreadable data yields
/// [`default_predictions`]. `save` reports errors, but callers treat it as
/// fire-and-forget.
pub trait PredictionRepository {
    fn load(&self) -> Vec<Prediction>;
    fn save(&self, predictions: &[Prediction]) -> Result<(), PersistenceError>;
}

/// One zeroed prediction with a single base milestone.
pub fn default_predictions() -> Vec<Prediction> {
    vec![Prediction::new("1", "Prediction 1", CoinData::default())]
}

/// Parses and validates a serialized collection. Nothing is returned unless
/// every record is well formed and ids are unique.
pub fn parse_predictions(text: &str) -> Result<Vec<Prediction>, ImportError> {
    let predictions: Vec<Prediction> = serde_json::from_str(text)?;
    validate_collection(&predictions)?;
    Ok(predictions)
}

pub fn validate_collection(predictions: &[Prediction]) -> Result<(), ImportError> {
    if predictions.is_empty() {
        return Err(ImportError::Empty);
    }

    let mut seen = HashSet::new();
    for prediction in predictions {
        if !seen.insert(prediction.id()) {
            return Err(ImportError::DuplicateId(prediction.id().to_string()));
        }
    }
    Ok(())
}

/// Stores the collection as `<dir>/predictions.json`.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        JsonFileRepository {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PredictionRepository for JsonFileRepository {
    fn load(&self) -> Vec<Prediction> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored predictions, using default");
                return default_predictions();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read predictions");
                return default_predictions();
            }
        };

        match parse_predictions(&text) {
            Ok(predictions) => predictions,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "stored predictions rejected");
                default_predictions()
            }
        }
    }

    fn save(&self, predictions: &[Prediction]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(predictions)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process slot holding the serialized collection, for tests and
/// ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    slot: Mutex<Option<String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(text: impl Into<String>) -> Self {
        MemoryRepository {
            slot: Mutex::new(Some(text.into())),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl PredictionRepository for MemoryRepository {
    fn load(&self) -> Vec<Prediction> {
        match self.contents() {
            Some(text) => parse_predictions(&text).unwrap_or_else(|e| {
                warn!(error = %e, "stored predictions rejected");
                default_predictions()
            }),
            None => default_predictions(),
        }
    }

    fn save(&self, predictions: &[Prediction]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(predictions)?;
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(json);
        Ok(())
    }
}
