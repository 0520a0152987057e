#![forbid(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use beacon_kernel_contracts::campaign::{CampaignId, RecipientRecord, TrackingToken};
use beacon_kernel_contracts::event::{EngagementEvent, EngagementEventInput};

use crate::tracking::{StorageError, TrackingStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum JournalRecord {
    Binding(RecipientRecord),
    Event(EngagementEvent),
}

/// Durable backend: one JSON record per line, append-only. Opening replays
/// the journal to rebuild the in-memory image, so event ids and insertion
/// order survive a restart.
#[derive(Debug)]
pub struct JournalStore {
    path: PathBuf,
    writer: File,
    inner: TrackingStore,
}

impl JournalStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let mut inner = TrackingStore::new_in_memory();
        if path.exists() {
            let file = File::open(&path).map_err(|e| io_error(&path, e))?;
            for (idx, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|e| io_error(&path, e))?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: JournalRecord =
                    serde_json::from_str(&line).map_err(|e| StorageError::Corrupt {
                        line: idx + 1,
                        detail: e.to_string(),
                    })?;
                match record {
                    JournalRecord::Binding(binding) => {
                        inner.insert_recipient_binding(binding)?;
                    }
                    JournalRecord::Event(event) => {
                        inner.restore_engagement_event(event)?;
                    }
                }
            }
        }
        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        Ok(Self {
            path,
            writer,
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn insert_recipient_binding(
        &mut self,
        record: RecipientRecord,
    ) -> Result<(), StorageError> {
        self.inner.insert_recipient_binding(record.clone())?;
        self.append_line(&JournalRecord::Binding(record))
    }

    pub fn binding_for(&self, token: &TrackingToken) -> Option<&RecipientRecord> {
        self.inner.binding_for(token)
    }

    pub fn bindings_for_campaign(&self, campaign_id: &CampaignId) -> Vec<RecipientRecord> {
        self.inner.bindings_for_campaign(campaign_id)
    }

    pub fn append_engagement_event(
        &mut self,
        input: EngagementEventInput,
    ) -> Result<EngagementEvent, StorageError> {
        let event = self.inner.append_engagement_event(input)?;
        self.append_line(&JournalRecord::Event(event.clone()))?;
        Ok(event)
    }

    pub fn engagement_events_for(
        &self,
        token: &TrackingToken,
    ) -> Result<Vec<EngagementEvent>, StorageError> {
        self.inner.engagement_events_for(token)
    }

    fn append_line(&mut self, record: &JournalRecord) -> Result<(), StorageError> {
        let mut line = serde_json::to_string(record).map_err(|e| StorageError::Unavailable {
            detail: e.to_string(),
        })?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .map_err(|e| io_error(&self.path, e))?;
        self.writer.flush().map_err(|e| io_error(&self.path, e))?;
        Ok(())
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    }
}
