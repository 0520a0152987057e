#![forbid(unsafe_code)]

use std::fs;

use beacon_kernel_contracts::campaign::{CampaignId, RecipientId, RecipientRecord, TrackingToken};
use beacon_kernel_contracts::event::{EngagementEventInput, EventKind, LinkTarget};
use beacon_kernel_contracts::MonotonicTimeNs;
use beacon_storage::journal::JournalStore;
use beacon_storage::tracking::StorageError;

fn token() -> TrackingToken {
    TrackingToken::new("jrnl_token_000000000001").unwrap()
}

fn binding() -> RecipientRecord {
    RecipientRecord::v1(
        token(),
        CampaignId::new("jrnl_campaign").unwrap(),
        RecipientId::new("lead_001").unwrap(),
        MonotonicTimeNs(100),
    )
    .unwrap()
}

fn open_at(at: u64) -> EngagementEventInput {
    EngagementEventInput::v1(
        token(),
        EventKind::Open,
        MonotonicTimeNs(at),
        Some("198.51.100.4".to_string()),
        None,
        None,
    )
    .unwrap()
}

#[test]
fn at_jrnl_01_reopen_reproduces_bindings_and_event_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracking.jsonl");

    {
        let mut store = JournalStore::open(&path).unwrap();
        store.insert_recipient_binding(binding()).unwrap();
        store.append_engagement_event(open_at(10)).unwrap();
        store.append_engagement_event(open_at(10)).unwrap();
        store
            .append_engagement_event(
                EngagementEventInput::v1(
                    token(),
                    EventKind::Click,
                    MonotonicTimeNs(20),
                    None,
                    None,
                    Some(LinkTarget::new("https://example.com/a").unwrap()),
                )
                .unwrap(),
            )
            .unwrap();
    }

    let reopened = JournalStore::open(&path).unwrap();
    assert_eq!(reopened.binding_for(&token()), Some(&binding()));
    let events = reopened.engagement_events_for(&token()).unwrap();
    assert_eq!(events.len(), 3);
    let ids: Vec<u64> = events.iter().map(|e| e.event_id.0).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn at_jrnl_02_appends_after_reopen_continue_the_id_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracking.jsonl");

    {
        let mut store = JournalStore::open(&path).unwrap();
        store.insert_recipient_binding(binding()).unwrap();
        store.append_engagement_event(open_at(10)).unwrap();
    }

    let mut reopened = JournalStore::open(&path).unwrap();
    let event = reopened.append_engagement_event(open_at(11)).unwrap();
    assert_eq!(event.event_id.0, 2);
    assert_eq!(reopened.engagement_events_for(&token()).unwrap().len(), 2);
}

#[test]
fn at_jrnl_03_corrupt_line_is_a_hard_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracking.jsonl");
    fs::write(&path, "{\"record\":\"binding\",oops}\n").unwrap();

    let err = JournalStore::open(&path);
    assert!(matches!(err, Err(StorageError::Corrupt { line: 1, .. })));
}

#[test]
fn at_jrnl_04_open_on_missing_path_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.jsonl");
    let store = JournalStore::open(&path).unwrap();
    assert!(store
        .bindings_for_campaign(&CampaignId::new("jrnl_campaign").unwrap())
        .is_empty());
}
