use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Labels used when no usable splits file exists.
pub const DEFAULT_LABELS: [&str; 14] = [
    "Flash", "Air", "Quick", "Metal", "Bubble", "Heat", "Wood", "Crash", "Wily 1", "Wily 2",
    "Wily 3", "Wily 4", "Wily 5", "Wily 6",
];

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot access splits file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed splits file {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("splits file {path:?} has no levels")]
    NoLevels { path: PathBuf },
}

/// One named segment and its most recently recorded time (empty = none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub label: String,
    pub time: String,
}

impl Segment {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            time: String::new(),
        }
    }
}

/// Labels paired with their recorded times, in run order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    pub segments: Vec<Segment>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            segments: DEFAULT_LABELS.iter().map(|l| Segment::new(*l)).collect(),
        }
    }
}

impl Ledger {
    #[cfg(test)]
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.label.as_str())
    }

    pub fn times(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.time.as_str())
    }

    /// Pair `levels[i]` with `splits[i]`. Missing times become empty, surplus
    /// times are dropped. Returns `None` when there are no levels at all.
    fn from_file(file: LedgerFile) -> Option<Self> {
        let levels = file.levels.unwrap_or_default();
        if levels.is_empty() {
            return None;
        }
        let mut splits = file.splits.unwrap_or_default();
        if splits.len() > levels.len() {
            tracing::warn!(
                levels = levels.len(),
                splits = splits.len(),
                "splits file has more times than levels, dropping the extra times"
            );
        }
        splits.resize(levels.len(), String::new());
        let segments = levels
            .into_iter()
            .zip(splits)
            .map(|(label, time)| Segment { label, time })
            .collect();
        Some(Self { segments })
    }
}

/// On-disk shape. Both fields are optional on read (absent or `null`).
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LedgerFile {
    #[serde(default)]
    splits: Option<Vec<String>>,
    #[serde(default)]
    levels: Option<Vec<String>>,
}

/// The single splits file of this installation.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn try_load(&self) -> Result<Ledger, LedgerError> {
        let content = fs::read_to_string(&self.path).map_err(|source| LedgerError::Io {
            path: self.path.clone(),
            source,
        })?;
        let file: LedgerFile =
            serde_json::from_str(&content).map_err(|source| LedgerError::Json {
                path: self.path.clone(),
                source,
            })?;
        Ledger::from_file(file).ok_or_else(|| LedgerError::NoLevels {
            path: self.path.clone(),
        })
    }

    /// Load the ledger, falling back to the built-in labels on any failure.
    pub fn load(&self) -> Ledger {
        match self.try_load() {
            Ok(ledger) => {
                tracing::info!(
                    path = %self.path.display(),
                    segments = ledger.segments.len(),
                    "loaded splits"
                );
                ledger
            }
            Err(e) => {
                tracing::warn!("couldn't read splits file, using default ones: {e}");
                Ledger::default()
            }
        }
    }

    /// Replace the stored ledger with `labels` and `times`. Missing times are
    /// written as empty strings; times past the last label are dropped.
    pub fn save<L, T>(&self, labels: &[L], times: &[T]) -> Result<(), LedgerError>
    where
        L: AsRef<str>,
        T: AsRef<str>,
    {
        let levels: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        let splits: Vec<String> = (0..levels.len())
            .map(|i| times.get(i).map_or_else(String::new, |t| t.as_ref().to_string()))
            .collect();
        let file = LedgerFile {
            splits: Some(splits),
            levels: Some(levels),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| LedgerError::Json {
            path: self.path.clone(),
            source,
        })?;
        self.write_atomic(json.as_bytes())?;
        tracing::info!(path = %self.path.display(), "saved splits");
        Ok(())
    }

    pub fn save_segments(&self, segments: &[Segment]) -> Result<(), LedgerError> {
        let labels: Vec<&str> = segments.iter().map(|s| s.label.as_str()).collect();
        let times: Vec<&str> = segments.iter().map(|s| s.time.as_str()).collect();
        self.save(&labels, &times)
    }

    fn write_atomic(&self, bytes: &[u8]) -> Result<(), LedgerError> {
        let io_err = |source| LedgerError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}
