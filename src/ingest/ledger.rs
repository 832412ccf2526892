use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

/// Lifecycle of a single ingested file. A record is created `Pending` and
/// moves exactly once to `Done` or `Failed`; it never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Done,
    Failed,
}

/// One per-file outcome in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: Uuid,
    pub original_name: String,
    pub status: UploadStatus,
    pub original_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_size: Option<u64>,
    /// Local path of the spooled transcoded artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
    /// Derived content-addressed filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Remote view link, when the best-effort upload went through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_link: Option<String>,
}

/// Fields merged into a record on completion. `None` fields leave the
/// record's prior value untouched.
#[derive(Debug, Clone, Default)]
pub struct CompletionPayload {
    pub optimized_size: Option<u64>,
    pub artifact_path: Option<PathBuf>,
    pub filename: Option<String>,
    pub drive_link: Option<String>,
}

/// Append-only, session-lifetime record of per-file ingestion outcomes,
/// driving progressive UI feedback. Records are keyed by an opaque id so
/// out-of-order completions never touch each other's entries.
pub struct UploadResultLedger {
    records: Mutex<Vec<UploadRecord>>,
    notify: watch::Sender<u64>,
}

impl Default for UploadResultLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadResultLedger {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(0);
        UploadResultLedger {
            records: Mutex::new(Vec::new()),
            notify,
        }
    }

    /// Append a `Pending` record for an accepted file and return its id.
    pub fn add_pending(&self, original_name: &str, original_size: u64) -> Uuid {
        let id = Uuid::new_v4();
        {
            let mut records = self.lock();
            records.push(UploadRecord {
                id,
                original_name: original_name.to_string(),
                status: UploadStatus::Pending,
                original_size,
                optimized_size: None,
                artifact_path: None,
                filename: None,
                drive_link: None,
            });
        }
        self.bump();
        id
    }

    /// Transition the record matching `id` to `Done`, merging the non-empty
    /// payload fields. A no-op for absent ids and for records that already
    /// left `Pending`.
    pub fn mark_done(&self, id: Uuid, payload: CompletionPayload) {
        let changed = {
            let mut records = self.lock();
            match records
                .iter_mut()
                .find(|r| r.id == id && r.status == UploadStatus::Pending)
            {
                Some(record) => {
                    record.status = UploadStatus::Done;
                    if payload.optimized_size.is_some() {
                        record.optimized_size = payload.optimized_size;
                    }
                    if payload.artifact_path.is_some() {
                        record.artifact_path = payload.artifact_path;
                    }
                    if payload.filename.is_some() {
                        record.filename = payload.filename;
                    }
                    if payload.drive_link.is_some() {
                        record.drive_link = payload.drive_link;
                    }
                    true
                }
                None => false,
            }
        };
        if changed {
            self.bump();
        }
    }

    /// Transition the record matching `id` to `Failed`. A no-op for absent
    /// ids and for records that already left `Pending`.
    pub fn mark_failed(&self, id: Uuid) {
        let changed = {
            let mut records = self.lock();
            match records
                .iter_mut()
                .find(|r| r.id == id && r.status == UploadStatus::Pending)
            {
                Some(record) => {
                    record.status = UploadStatus::Failed;
                    true
                }
                None => false,
            }
        };
        if changed {
            self.bump();
        }
    }

    /// Drop every record. The only way entries leave the ledger.
    pub fn reset(&self) {
        self.lock().clear();
        self.bump();
    }

    pub fn records(&self) -> Vec<UploadRecord> {
        self.lock().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn bump(&self) {
        self.notify.send_modify(|rev| *rev += 1);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UploadRecord>> {
        self.records.lock().expect("Failed to lock upload records")
    }
}
