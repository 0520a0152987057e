#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use beacon_kernel_contracts::campaign::{CampaignId, RecipientRecord, TrackingToken};
use beacon_kernel_contracts::event::{EngagementEvent, EngagementEventInput, EventId};
use beacon_kernel_contracts::{ContractViolation, Validate};

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Event references a token no RecipientRecord was ever issued for.
    UnknownToken { token: String },
    /// Token already bound to a recipient; bindings are write-once.
    DuplicateToken { token: String },
    /// No RecipientRecord is bound to the campaign.
    UnknownCampaign { campaign_id: String },
    /// Backend cannot serve reads or writes right now.
    Unavailable { detail: String },
    Io { path: String, detail: String },
    Corrupt { line: usize, detail: String },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

/// In-memory image of the two durable collections: token -> RecipientRecord
/// and token -> event list. Event lists are append-only; the per-call append
/// is the atomicity unit (no read-modify-write across calls).
#[derive(Debug, Clone)]
pub struct TrackingStore {
    bindings: BTreeMap<TrackingToken, RecipientRecord>,
    events: BTreeMap<TrackingToken, Vec<EngagementEvent>>,
    next_event_id: u64,
}

impl TrackingStore {
    pub fn new_in_memory() -> Self {
        Self {
            bindings: BTreeMap::new(),
            events: BTreeMap::new(),
            next_event_id: 1,
        }
    }

    pub fn insert_recipient_binding(
        &mut self,
        record: RecipientRecord,
    ) -> Result<(), StorageError> {
        record.validate()?;
        if self.bindings.contains_key(&record.token) {
            return Err(StorageError::DuplicateToken {
                token: record.token.as_str().to_string(),
            });
        }
        self.bindings.insert(record.token.clone(), record);
        Ok(())
    }

    pub fn binding_for(&self, token: &TrackingToken) -> Option<&RecipientRecord> {
        self.bindings.get(token)
    }

    /// All bindings of a campaign, ordered by recipient_id ascending.
    pub fn bindings_for_campaign(&self, campaign_id: &CampaignId) -> Vec<RecipientRecord> {
        let mut rows: Vec<RecipientRecord> = self
            .bindings
            .values()
            .filter(|r| &r.campaign_id == campaign_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.recipient_id.cmp(&b.recipient_id));
        rows
    }

    pub fn append_engagement_event(
        &mut self,
        input: EngagementEventInput,
    ) -> Result<EngagementEvent, StorageError> {
        input.validate()?;
        if !self.bindings.contains_key(&input.token) {
            return Err(StorageError::UnknownToken {
                token: input.token.as_str().to_string(),
            });
        }
        let event_id = EventId(self.next_event_id);
        self.next_event_id = self.next_event_id.saturating_add(1);
        let event = EngagementEvent::from_input_v1(event_id, input)?;
        self.events
            .entry(event.token.clone())
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    /// Events for a token, observed_at ascending, ties broken by insertion
    /// order (EventId). A bound token with no events yields an empty list.
    pub fn engagement_events_for(
        &self,
        token: &TrackingToken,
    ) -> Result<Vec<EngagementEvent>, StorageError> {
        if !self.bindings.contains_key(token) {
            return Err(StorageError::UnknownToken {
                token: token.as_str().to_string(),
            });
        }
        let mut events = self.events.get(token).cloned().unwrap_or_default();
        events.sort_by_key(|e| (e.observed_at, e.event_id));
        Ok(events)
    }

    /// Journal replay path: reinstates an already-identified event and keeps
    /// the id sequence ahead of everything replayed.
    pub(crate) fn restore_engagement_event(
        &mut self,
        event: EngagementEvent,
    ) -> Result<(), StorageError> {
        event.validate()?;
        if !self.bindings.contains_key(&event.token) {
            return Err(StorageError::UnknownToken {
                token: event.token.as_str().to_string(),
            });
        }
        if event.event_id.0 >= self.next_event_id {
            self.next_event_id = event.event_id.0.saturating_add(1);
        }
        self.events
            .entry(event.token.clone())
            .or_default()
            .push(event);
        Ok(())
    }
}
