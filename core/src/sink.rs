use crate::error::{ErrorCode, SpendgraphError};
use crate::model::FlaggedPurchase;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("flag sink lock poisoned")]
    LockPoisoned,
    #[error("flag sink io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("flag sink serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SpendgraphError for SinkError {
    fn error_code(&self) -> ErrorCode {
        match self {
            SinkError::LockPoisoned => ErrorCode::Internal,
            SinkError::Io(_) => ErrorCode::Io,
            SinkError::Serialization(_) => ErrorCode::Internal,
        }
    }
}

/// Destination for flagged purchases.
pub trait FlagSink: Send + Sync {
    fn emit(&self, flagged: FlaggedPurchase) -> Result<(), SinkError>;

    /// Number of records emitted so far.
    fn emitted(&self) -> u64;
}

#[derive(Default)]
pub struct InMemoryFlagSink {
    records: Mutex<Vec<FlaggedPurchase>>,
    count: AtomicU64,
}

impl InMemoryFlagSink {
    pub fn records(&self) -> Result<Vec<FlaggedPurchase>, SinkError> {
        let records = self.records.lock().map_err(|_| SinkError::LockPoisoned)?;
        Ok(records.clone())
    }
}

impl FlagSink for InMemoryFlagSink {
    fn emit(&self, flagged: FlaggedPurchase) -> Result<(), SinkError> {
        let mut records = self.records.lock().map_err(|_| SinkError::LockPoisoned)?;
        records.push(flagged);
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn emitted(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

/// Writes one JSON object per line, truncating any previous output.
pub struct JsonlFlagSink {
    writer: Mutex<File>,
    count: AtomicU64,
}

impl JsonlFlagSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path.as_ref())?;

        Ok(Self {
            writer: Mutex::new(writer),
            count: AtomicU64::new(0),
        })
    }
}

impl FlagSink for JsonlFlagSink {
    fn emit(&self, flagged: FlaggedPurchase) -> Result<(), SinkError> {
        let line = serde_json::to_string(&flagged)?;
        let mut writer = self.writer.lock().map_err(|_| SinkError::LockPoisoned)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn emitted(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}
