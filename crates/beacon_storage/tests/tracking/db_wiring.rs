#![forbid(unsafe_code)]

use beacon_kernel_contracts::campaign::{CampaignId, RecipientId, RecipientRecord, TrackingToken};
use beacon_kernel_contracts::event::{EngagementEventInput, EventKind, LinkTarget};
use beacon_kernel_contracts::MonotonicTimeNs;
use beacon_storage::tracking::{StorageError, TrackingStore};

fn token(suffix: char) -> TrackingToken {
    TrackingToken::new(format!("dbw_trk_token_00000{suffix}")).unwrap()
}

fn store_with_binding(suffix: char, recipient: &str) -> TrackingStore {
    let mut s = TrackingStore::new_in_memory();
    s.insert_recipient_binding(
        RecipientRecord::v1(
            token(suffix),
            CampaignId::new("dbw_campaign_1").unwrap(),
            RecipientId::new(recipient).unwrap(),
            MonotonicTimeNs(1),
        )
        .unwrap(),
    )
    .unwrap();
    s
}

fn open_input(suffix: char, at: u64) -> EngagementEventInput {
    EngagementEventInput::v1(
        token(suffix),
        EventKind::Open,
        MonotonicTimeNs(at),
        Some("203.0.113.7".to_string()),
        Some("Mozilla/5.0".to_string()),
        None,
    )
    .unwrap()
}

fn click_input(suffix: char, at: u64) -> EngagementEventInput {
    EngagementEventInput::v1(
        token(suffix),
        EventKind::Click,
        MonotonicTimeNs(at),
        Some("203.0.113.7".to_string()),
        Some("Mozilla/5.0".to_string()),
        Some(LinkTarget::new("https://example.com/pricing").unwrap()),
    )
    .unwrap()
}

#[test]
fn at_trk_db_01_binding_is_write_once() {
    let mut s = store_with_binding('a', "lead_001");
    let err = s.insert_recipient_binding(
        RecipientRecord::v1(
            token('a'),
            CampaignId::new("dbw_campaign_2").unwrap(),
            RecipientId::new("lead_002").unwrap(),
            MonotonicTimeNs(2),
        )
        .unwrap(),
    );
    assert!(matches!(err, Err(StorageError::DuplicateToken { .. })));
}

#[test]
fn at_trk_db_02_append_requires_issued_token() {
    let mut s = TrackingStore::new_in_memory();
    let err = s.append_engagement_event(open_input('a', 10));
    assert!(matches!(err, Err(StorageError::UnknownToken { .. })));
    assert!(matches!(
        s.engagement_events_for(&token('a')),
        Err(StorageError::UnknownToken { .. })
    ));
}

#[test]
fn at_trk_db_03_every_hit_is_a_distinct_event() {
    let mut s = store_with_binding('a', "lead_001");
    for at in [10, 10, 10, 10] {
        s.append_engagement_event(open_input('a', at)).unwrap();
    }
    let events = s.engagement_events_for(&token('a')).unwrap();
    assert_eq!(events.len(), 4);
    // Insertion order is preserved under identical timestamps.
    assert!(events.windows(2).all(|w| w[0].event_id < w[1].event_id));
}

#[test]
fn at_trk_db_04_events_ordered_by_timestamp_then_insertion() {
    let mut s = store_with_binding('a', "lead_001");
    s.append_engagement_event(open_input('a', 30)).unwrap();
    s.append_engagement_event(click_input('a', 10)).unwrap();
    s.append_engagement_event(open_input('a', 20)).unwrap();
    let events = s.engagement_events_for(&token('a')).unwrap();
    let observed: Vec<u64> = events.iter().map(|e| e.observed_at.0).collect();
    assert_eq!(observed, vec![10, 20, 30]);
}

#[test]
fn at_trk_db_05_bound_token_without_events_reads_empty() {
    let s = store_with_binding('a', "lead_001");
    assert!(s.engagement_events_for(&token('a')).unwrap().is_empty());
}

#[test]
fn at_trk_db_06_campaign_bindings_sorted_by_recipient() {
    let mut s = store_with_binding('b', "lead_zulu");
    s.insert_recipient_binding(
        RecipientRecord::v1(
            token('a'),
            CampaignId::new("dbw_campaign_1").unwrap(),
            RecipientId::new("lead_alpha").unwrap(),
            MonotonicTimeNs(5),
        )
        .unwrap(),
    )
    .unwrap();
    s.insert_recipient_binding(
        RecipientRecord::v1(
            token('c'),
            CampaignId::new("dbw_campaign_other").unwrap(),
            RecipientId::new("lead_other").unwrap(),
            MonotonicTimeNs(5),
        )
        .unwrap(),
    )
    .unwrap();

    let rows = s.bindings_for_campaign(&CampaignId::new("dbw_campaign_1").unwrap());
    let ids: Vec<&str> = rows.iter().map(|r| r.recipient_id.as_str()).collect();
    assert_eq!(ids, vec!["lead_alpha", "lead_zulu"]);
}

#[test]
fn at_trk_db_07_event_ids_strictly_increase_across_tokens() {
    let mut s = store_with_binding('a', "lead_001");
    s.insert_recipient_binding(
        RecipientRecord::v1(
            token('b'),
            CampaignId::new("dbw_campaign_1").unwrap(),
            RecipientId::new("lead_002").unwrap(),
            MonotonicTimeNs(1),
        )
        .unwrap(),
    )
    .unwrap();
    let first = s.append_engagement_event(open_input('a', 10)).unwrap();
    let second = s.append_engagement_event(open_input('b', 10)).unwrap();
    let third = s.append_engagement_event(click_input('a', 11)).unwrap();
    assert!(first.event_id < second.event_id && second.event_id < third.event_id);
}
