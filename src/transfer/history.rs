//! Transaction history with optional JSON persistence.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, TxHash};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

/// A submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: TxHash,
    pub status: TransactionStatus,
    pub recipient: Address,
    pub amount: String,
    pub token: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl TransactionRecord {
    pub fn new(
        hash: TxHash,
        status: TransactionStatus,
        recipient: Address,
        amount: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            hash,
            status,
            recipient,
            amount: amount.into(),
            token: token.into(),
            created_at: now_millis(),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Append-only history keyed by transaction hash, newest first.
#[derive(Clone, Default)]
pub struct TransactionHistory {
    /// hash -> (insertion sequence, record)
    inner: Arc<DashMap<TxHash, (u64, TransactionRecord)>>,
    next_seq: Arc<AtomicU64>,
    persistence_path: Option<PathBuf>,
}

impl TransactionHistory {
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            next_seq: Arc::new(AtomicU64::new(0)),
            persistence_path,
        }
    }

    /// Load from a file written by [`save_to_file`](Self::save_to_file).
    /// A missing file yields an empty history bound to that path.
    pub fn load_from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let history = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let records: Vec<TransactionRecord> = serde_json::from_reader(reader)?;
            // Stored newest first; replay oldest first to rebuild ordering.
            for record in records.into_iter().rev() {
                history.append(record);
            }
            tracing::info!(count = history.len(), path = %path.display(), "Loaded transaction history");
        }
        Ok(history)
    }

    /// Load `path`, never failing. An unreadable file is moved aside to
    /// `<path>.corrupt` so later saves cannot overwrite it; if that move
    /// fails too, the history stays in memory only.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load_from_file(path) {
            Ok(history) => history,
            Err(e) => {
                let mut aside = path.as_os_str().to_owned();
                aside.push(".corrupt");
                let aside = PathBuf::from(aside);
                match std::fs::rename(path, &aside) {
                    Ok(()) => {
                        tracing::warn!(
                            path = %path.display(),
                            moved_to = %aside.display(),
                            error = %e,
                            "Unreadable history moved aside, starting empty"
                        );
                        Self::new(Some(path.to_path_buf()))
                    }
                    Err(rename_err) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            rename_error = %rename_err,
                            "Unreadable history left in place, not persisting"
                        );
                        Self::new(None)
                    }
                }
            }
        }
    }

    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let writer = BufWriter::new(File::create(path)?);
            let records = self.records();
            serde_json::to_writer_pretty(writer, &records)?;
            tracing::debug!(count = records.len(), path = %path.display(), "Saved transaction history");
        }
        Ok(())
    }

    /// Add a record unless its hash is already present. Returns whether it
    /// was inserted.
    pub fn append(&self, record: TransactionRecord) -> bool {
        match self.inner.entry(record.hash) {
            Entry::Occupied(_) => {
                tracing::debug!(hash = %record.hash, "Duplicate transaction hash ignored");
                false
            }
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert((seq, record));
                true
            }
        }
    }

    /// Append and persist. Persistence failures are logged, not returned.
    pub fn record(&self, record: TransactionRecord) -> bool {
        let inserted = self.append(record);
        if inserted {
            if let Err(e) = self.save_to_file() {
                tracing::warn!(error = %e, "Failed to persist transaction history");
            }
        }
        inserted
    }

    pub fn get(&self, hash: &TxHash) -> Option<TransactionRecord> {
        self.inner.get(hash).map(|r| r.value().1.clone())
    }

    /// All records, newest first.
    pub fn records(&self) -> Vec<TransactionRecord> {
        let mut entries: Vec<(u64, TransactionRecord)> =
            self.inner.iter().map(|r| r.value().clone()).collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        entries.into_iter().map(|(_, record)| record).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for TransactionHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionHistory")
            .field("len", &self.len())
            .field("persistence_path", &self.persistence_path)
            .finish()
    }
}
