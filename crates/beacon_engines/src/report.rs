#![forbid(unsafe_code)]

use beacon_kernel_contracts::campaign::CampaignId;
use beacon_kernel_contracts::report::{CampaignReport, CampaignStats, ReportRow};
use beacon_kernel_contracts::MonotonicTimeNs;
use beacon_storage::repo::TrackingRepo;
use beacon_storage::tracking::StorageError;

use crate::classifier::{classify, summarize};

/// One row per RecipientRecord of the campaign, recipient_id ascending.
/// Zero-event recipients appear as cold rows. Storage failures are hard
/// errors here; a partial report is worse than a visible failure.
pub fn generate_campaign_report<S: TrackingRepo>(
    store: &S,
    campaign_id: &CampaignId,
    generated_at: MonotonicTimeNs,
) -> Result<CampaignReport, StorageError> {
    let bindings = store.bindings_for_campaign(campaign_id)?;
    if bindings.is_empty() {
        return Err(StorageError::UnknownCampaign {
            campaign_id: campaign_id.as_str().to_string(),
        });
    }

    let mut rows = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let events = store.engagement_events_for(&binding.token)?;
        let summary = summarize(&events);
        rows.push(ReportRow {
            recipient_id: binding.recipient_id,
            tier: classify(&events),
            open_count: summary.open_count,
            click_count: summary.click_count,
            first_event_at: summary.first_event_at,
            last_event_at: summary.last_event_at,
        });
    }
    rows.sort_by(|a, b| a.recipient_id.cmp(&b.recipient_id));

    Ok(CampaignReport {
        campaign_id: campaign_id.clone(),
        generated_at,
        rows,
    })
}

fn pct(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let raw = f64::from(numerator) / f64::from(denominator) * 100.0;
    (raw * 100.0).round() / 100.0
}

/// The rate summary the campaign dashboard consumes. Counts engaged
/// recipients (presence of at least one open/click), not raw hits, so
/// prefetch-duplicated events do not inflate the rates.
pub fn campaign_stats(report: &CampaignReport) -> CampaignStats {
    let total_recipients = report.rows.len() as u32;
    let recipients_opened = report.rows.iter().filter(|r| r.open_count > 0).count() as u32;
    let recipients_clicked = report.rows.iter().filter(|r| r.click_count > 0).count() as u32;
    CampaignStats {
        campaign_id: report.campaign_id.clone(),
        total_recipients,
        recipients_opened,
        recipients_clicked,
        open_rate_pct: pct(recipients_opened, total_recipients),
        click_rate_pct: pct(recipients_clicked, total_recipients),
        click_to_open_rate_pct: pct(recipients_clicked, recipients_opened),
    }
}
