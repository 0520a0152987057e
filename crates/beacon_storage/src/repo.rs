#![forbid(unsafe_code)]

use beacon_kernel_contracts::campaign::{CampaignId, RecipientRecord, TrackingToken};
use beacon_kernel_contracts::event::{EngagementEvent, EngagementEventInput};

use crate::journal::JournalStore;
use crate::tracking::{StorageError, TrackingStore};

/// Write-once token -> RecipientRecord bindings, created at send time.
pub trait RecipientBindingRepo {
    fn insert_recipient_binding(&mut self, record: RecipientRecord) -> Result<(), StorageError>;
    fn binding_for(&self, token: &TrackingToken) -> Result<Option<RecipientRecord>, StorageError>;
    fn bindings_for_campaign(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Vec<RecipientRecord>, StorageError>;
}

/// Append-only token -> event-list collection.
pub trait EngagementEventRepo {
    fn append_engagement_event(
        &mut self,
        input: EngagementEventInput,
    ) -> Result<EngagementEvent, StorageError>;
    fn engagement_events_for(
        &self,
        token: &TrackingToken,
    ) -> Result<Vec<EngagementEvent>, StorageError>;
}

/// The full seam the ingestion service and report generator are injected
/// with; any backend satisfying append-atomicity-per-token conforms.
pub trait TrackingRepo: RecipientBindingRepo + EngagementEventRepo {}

impl<S: RecipientBindingRepo + EngagementEventRepo> TrackingRepo for S {}

impl<S: RecipientBindingRepo + ?Sized> RecipientBindingRepo for Box<S> {
    fn insert_recipient_binding(&mut self, record: RecipientRecord) -> Result<(), StorageError> {
        (**self).insert_recipient_binding(record)
    }

    fn binding_for(&self, token: &TrackingToken) -> Result<Option<RecipientRecord>, StorageError> {
        (**self).binding_for(token)
    }

    fn bindings_for_campaign(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Vec<RecipientRecord>, StorageError> {
        (**self).bindings_for_campaign(campaign_id)
    }
}

impl<S: EngagementEventRepo + ?Sized> EngagementEventRepo for Box<S> {
    fn append_engagement_event(
        &mut self,
        input: EngagementEventInput,
    ) -> Result<EngagementEvent, StorageError> {
        (**self).append_engagement_event(input)
    }

    fn engagement_events_for(
        &self,
        token: &TrackingToken,
    ) -> Result<Vec<EngagementEvent>, StorageError> {
        (**self).engagement_events_for(token)
    }
}

impl RecipientBindingRepo for TrackingStore {
    fn insert_recipient_binding(&mut self, record: RecipientRecord) -> Result<(), StorageError> {
        TrackingStore::insert_recipient_binding(self, record)
    }

    fn binding_for(&self, token: &TrackingToken) -> Result<Option<RecipientRecord>, StorageError> {
        Ok(TrackingStore::binding_for(self, token).cloned())
    }

    fn bindings_for_campaign(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Vec<RecipientRecord>, StorageError> {
        Ok(TrackingStore::bindings_for_campaign(self, campaign_id))
    }
}

impl EngagementEventRepo for TrackingStore {
    fn append_engagement_event(
        &mut self,
        input: EngagementEventInput,
    ) -> Result<EngagementEvent, StorageError> {
        TrackingStore::append_engagement_event(self, input)
    }

    fn engagement_events_for(
        &self,
        token: &TrackingToken,
    ) -> Result<Vec<EngagementEvent>, StorageError> {
        TrackingStore::engagement_events_for(self, token)
    }
}

impl RecipientBindingRepo for JournalStore {
    fn insert_recipient_binding(&mut self, record: RecipientRecord) -> Result<(), StorageError> {
        JournalStore::insert_recipient_binding(self, record)
    }

    fn binding_for(&self, token: &TrackingToken) -> Result<Option<RecipientRecord>, StorageError> {
        Ok(JournalStore::binding_for(self, token).cloned())
    }

    fn bindings_for_campaign(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Vec<RecipientRecord>, StorageError> {
        Ok(JournalStore::bindings_for_campaign(self, campaign_id))
    }
}

impl EngagementEventRepo for JournalStore {
    fn append_engagement_event(
        &mut self,
        input: EngagementEventInput,
    ) -> Result<EngagementEvent, StorageError> {
        JournalStore::append_engagement_event(self, input)
    }

    fn engagement_events_for(
        &self,
        token: &TrackingToken,
    ) -> Result<Vec<EngagementEvent>, StorageError> {
        JournalStore::engagement_events_for(self, token)
    }
}
