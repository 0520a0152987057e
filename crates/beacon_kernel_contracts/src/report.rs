#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::campaign::{CampaignId, RecipientId};
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const REPORT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Derived classification. Never stored as independent truth; always
/// recomputed from the event history. Ordering is total: Cold < Warm < Hot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EngagementTier {
    Cold,
    Warm,
    Hot,
}

impl EngagementTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementTier::Cold => "cold",
            EngagementTier::Warm => "warm",
            EngagementTier::Hot => "hot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub recipient_id: RecipientId,
    pub tier: EngagementTier,
    pub open_count: u32,
    pub click_count: u32,
    pub first_event_at: Option<MonotonicTimeNs>,
    pub last_event_at: Option<MonotonicTimeNs>,
}

impl Validate for ReportRow {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.recipient_id.validate()?;
        match (self.first_event_at, self.last_event_at) {
            (Some(first), Some(last)) if first > last => {
                Err(ContractViolation::InvalidValue {
                    field: "report_row.first_event_at",
                    reason: "must be <= last_event_at",
                })
            }
            (Some(_), None) | (None, Some(_)) => Err(ContractViolation::InvalidValue {
                field: "report_row.last_event_at",
                reason: "first/last must be both present or both absent",
            }),
            _ => Ok(()),
        }
    }
}

/// Point-in-time snapshot: one row per RecipientRecord in the campaign,
/// rows ordered by recipient_id ascending so regeneration against an
/// unchanged store is byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub campaign_id: CampaignId,
    pub generated_at: MonotonicTimeNs,
    pub rows: Vec<ReportRow>,
}

impl Validate for CampaignReport {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.campaign_id.validate()?;
        for row in &self.rows {
            row.validate()?;
        }
        if !self
            .rows
            .windows(2)
            .all(|w| w[0].recipient_id < w[1].recipient_id)
        {
            return Err(ContractViolation::InvalidValue {
                field: "campaign_report.rows",
                reason: "must be strictly ordered by recipient_id",
            });
        }
        Ok(())
    }
}

/// Rate summary over a campaign's report rows. Opens/clicks count engaged
/// recipients, not raw hits; rates are percentages rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub campaign_id: CampaignId,
    pub total_recipients: u32,
    pub recipients_opened: u32,
    pub recipients_clicked: u32,
    pub open_rate_pct: f64,
    pub click_rate_pct: f64,
    pub click_to_open_rate_pct: f64,
}
