#![forbid(unsafe_code)]

use beacon_kernel_contracts::event::{EngagementEvent, EventKind};
use beacon_kernel_contracts::report::EngagementTier;
use beacon_kernel_contracts::MonotonicTimeNs;

/// Strict priority chain over the event set: any click makes the lead hot,
/// else any open makes it warm, else cold. Order-independent and monotone:
/// adding events can only raise the tier.
pub fn classify(events: &[EngagementEvent]) -> EngagementTier {
    if events.iter().any(|e| e.kind == EventKind::Click) {
        return EngagementTier::Hot;
    }
    if events.iter().any(|e| e.kind == EventKind::Open) {
        return EngagementTier::Warm;
    }
    EngagementTier::Cold
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngagementSummary {
    pub open_count: u32,
    pub click_count: u32,
    pub first_event_at: Option<MonotonicTimeNs>,
    pub last_event_at: Option<MonotonicTimeNs>,
}

/// Raw counts plus the first/last observation window. First/last are taken
/// by min/max over (observed_at, event_id), so a caller handing over an
/// unordered or mis-sorted slice gets the same answer as a sorted one.
pub fn summarize(events: &[EngagementEvent]) -> EngagementSummary {
    let mut summary = EngagementSummary::default();
    for event in events {
        match event.kind {
            EventKind::Open => summary.open_count = summary.open_count.saturating_add(1),
            EventKind::Click => summary.click_count = summary.click_count.saturating_add(1),
        }
    }
    summary.first_event_at = events
        .iter()
        .min_by_key(|e| (e.observed_at, e.event_id))
        .map(|e| e.observed_at);
    summary.last_event_at = events
        .iter()
        .max_by_key(|e| (e.observed_at, e.event_id))
        .map(|e| e.observed_at);
    summary
}
