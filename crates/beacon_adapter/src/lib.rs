#![forbid(unsafe_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};
use url::Url;

use beacon_engines::issuer::{IssuerConfig, TokenIssuer};
use beacon_engines::report::{campaign_stats, generate_campaign_report};
use beacon_kernel_contracts::campaign::{CampaignId, RecipientId, TrackingToken};
use beacon_kernel_contracts::event::{
    EngagementEventInput, EventKind, LinkTarget, LINK_TARGET_MAX_LEN,
};
use beacon_kernel_contracts::report::{CampaignReport, CampaignStats};
use beacon_kernel_contracts::{MonotonicTimeNs, Validate};
use beacon_storage::repo::TrackingRepo;
use beacon_storage::tracking::StorageError;

pub mod reason_codes {
    use beacon_kernel_contracts::ReasonCodeId;

    pub const TRK_OPEN_RECORDED: ReasonCodeId = ReasonCodeId(0xBE0C_0001);
    pub const TRK_CLICK_RECORDED: ReasonCodeId = ReasonCodeId(0xBE0C_0002);
    pub const TRK_UNKNOWN_TOKEN: ReasonCodeId = ReasonCodeId(0xBE0C_00F1);
    pub const TRK_INVALID_TOKEN: ReasonCodeId = ReasonCodeId(0xBE0C_00F2);
    pub const TRK_INVALID_TARGET: ReasonCodeId = ReasonCodeId(0xBE0C_00F3);
    pub const TRK_STORE_FAILURE: ReasonCodeId = ReasonCodeId(0xBE0C_00F4);
}

/// 1x1 transparent GIF, byte-for-byte what every open beacon answers with.
pub const TRACKING_PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Destination used when a click carries no target or a target that is
    /// not an absolute http(s) URL.
    pub fallback_redirect: String,
}

impl TrackerConfig {
    pub fn mvp_v1() -> Self {
        Self {
            fallback_redirect: "https://www.example.com".to_string(),
        }
    }
}

/// Tracking failures never change what the recipient sees; they only move
/// these counters and emit log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct IngestCounters {
    pub opens_recorded: u64,
    pub clicks_recorded: u64,
    pub unknown_token_total: u64,
    pub invalid_token_total: u64,
    pub invalid_target_total: u64,
    pub store_failure_total: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TrackerHealthResponse {
    pub status: String,
    pub counters: IngestCounters,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IssueAdapterRequest {
    pub campaign_id: String,
    pub recipient_id: String,
    pub sent_at_ns: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IssueAdapterResponse {
    pub token: String,
}

/// Accept a click target only if it is an absolute http(s) URL with a host
/// and within the recordable length bound; anything else redirects to the
/// configured fallback.
pub fn resolve_redirect_target(raw: Option<&str>, fallback: &str) -> String {
    let Some(raw) = raw else {
        return fallback.to_string();
    };
    if raw.len() > LINK_TARGET_MAX_LEN {
        return fallback.to_string();
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            raw.to_string()
        }
        _ => fallback.to_string(),
    }
}

/// First `to` value of a raw query string, parsed leniently. A garbled or
/// duplicated query must never cost the recipient the redirect, so this
/// never fails; it just finds a target or does not.
pub fn click_target_from_raw_query(raw_query: Option<&str>) -> Option<String> {
    let raw = raw_query?;
    url::form_urlencoded::parse(raw.as_bytes())
        .find(|(key, _)| key == "to")
        .map(|(_, value)| value.into_owned())
}

pub fn now_ns() -> MonotonicTimeNs {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    MonotonicTimeNs(since_epoch.as_nanos() as u64)
}

/// The ingestion service core. Stateless per request; callers share it
/// behind a mutex and each handler call is one complete unit of work.
#[derive(Debug)]
pub struct TrackerRuntime<S: TrackingRepo> {
    store: S,
    issuer: TokenIssuer,
    config: TrackerConfig,
    counters: IngestCounters,
}

impl<S: TrackingRepo> TrackerRuntime<S> {
    pub fn new(store: S, config: TrackerConfig) -> Self {
        Self {
            store,
            issuer: TokenIssuer::new(IssuerConfig::mvp_v1()),
            config,
            counters: IngestCounters::default(),
        }
    }

    pub fn counters(&self) -> IngestCounters {
        self.counters
    }

    pub fn health(&self) -> TrackerHealthResponse {
        TrackerHealthResponse {
            status: "running".to_string(),
            counters: self.counters,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Campaign-sender surface: persists the binding, then hands the token
    /// out. The only failure mode is storage.
    pub fn issue_token(
        &mut self,
        campaign_id: &str,
        recipient_id: &str,
        sent_at: MonotonicTimeNs,
    ) -> Result<TrackingToken, StorageError> {
        let campaign_id = CampaignId::new(campaign_id)?;
        let recipient_id = RecipientId::new(recipient_id)?;
        let token = self
            .issuer
            .issue(&mut self.store, campaign_id, recipient_id, sent_at)?;
        info!(token = token.as_str(), "tracking token issued");
        Ok(token)
    }

    /// Open beacon: always returns the pixel; the write is best-effort and
    /// failures end up in counters/logs only.
    pub fn handle_open_beacon(
        &mut self,
        raw_token: &str,
        source_ip: Option<String>,
        user_agent: Option<String>,
        observed_at: MonotonicTimeNs,
    ) -> &'static [u8] {
        self.record_hit(raw_token, EventKind::Open, source_ip, user_agent, None, observed_at);
        TRACKING_PIXEL_GIF
    }

    /// Click redirect: resolves the destination first, records best-effort,
    /// and returns the destination unconditionally. Availability of the
    /// underlying link outranks tracking completeness.
    pub fn handle_click_redirect(
        &mut self,
        raw_token: &str,
        raw_target: Option<&str>,
        source_ip: Option<String>,
        user_agent: Option<String>,
        observed_at: MonotonicTimeNs,
    ) -> String {
        let target = resolve_redirect_target(raw_target, &self.config.fallback_redirect);
        if raw_target.is_some_and(|raw| raw != target) {
            self.counters.invalid_target_total += 1;
            warn!(
                reason_code = reason_codes::TRK_INVALID_TARGET.0,
                raw_target, "click target rejected, redirecting to fallback"
            );
        }
        let link_target = match LinkTarget::new(target.clone()) {
            Ok(link_target) => Some(link_target),
            Err(_) => None,
        };
        self.record_hit(
            raw_token,
            EventKind::Click,
            source_ip,
            user_agent,
            link_target,
            observed_at,
        );
        target
    }

    pub fn campaign_report(
        &self,
        campaign_id: &str,
        generated_at: MonotonicTimeNs,
    ) -> Result<CampaignReport, StorageError> {
        let campaign_id = CampaignId::new(campaign_id)?;
        generate_campaign_report(&self.store, &campaign_id, generated_at)
    }

    pub fn campaign_stats(
        &self,
        campaign_id: &str,
        generated_at: MonotonicTimeNs,
    ) -> Result<CampaignStats, StorageError> {
        Ok(campaign_stats(&self.campaign_report(campaign_id, generated_at)?))
    }

    fn record_hit(
        &mut self,
        raw_token: &str,
        kind: EventKind,
        source_ip: Option<String>,
        user_agent: Option<String>,
        link_target: Option<LinkTarget>,
        observed_at: MonotonicTimeNs,
    ) {
        let token = match TrackingToken::new(raw_token) {
            Ok(token) => token,
            Err(violation) => {
                self.counters.invalid_token_total += 1;
                warn!(
                    reason_code = reason_codes::TRK_INVALID_TOKEN.0,
                    raw_token,
                    violation = ?violation,
                    "dropping hit with malformed token"
                );
                return;
            }
        };
        let input = match EngagementEventInput::v1(
            token,
            kind,
            observed_at,
            source_ip,
            user_agent,
            link_target,
        ) {
            Ok(input) => input,
            Err(violation) => {
                self.counters.invalid_token_total += 1;
                warn!(
                    reason_code = reason_codes::TRK_INVALID_TOKEN.0,
                    violation = ?violation,
                    "dropping hit failing event contract"
                );
                return;
            }
        };
        debug_assert!(input.validate().is_ok());

        match self.store.append_engagement_event(input) {
            Ok(event) => {
                let reason_code = match kind {
                    EventKind::Open => {
                        self.counters.opens_recorded += 1;
                        reason_codes::TRK_OPEN_RECORDED
                    }
                    EventKind::Click => {
                        self.counters.clicks_recorded += 1;
                        reason_codes::TRK_CLICK_RECORDED
                    }
                };
                info!(
                    reason_code = reason_code.0,
                    token = event.token.as_str(),
                    kind = kind.as_str(),
                    event_id = event.event_id.0,
                    "engagement event recorded"
                );
            }
            Err(StorageError::UnknownToken { token }) => {
                self.counters.unknown_token_total += 1;
                warn!(
                    reason_code = reason_codes::TRK_UNKNOWN_TOKEN.0,
                    token = %token,
                    kind = kind.as_str(),
                    "hit references a token that was never issued"
                );
            }
            Err(err) => {
                self.counters.store_failure_total += 1;
                error!(
                    reason_code = reason_codes::TRK_STORE_FAILURE.0,
                    kind = kind.as_str(),
                    err = ?err,
                    "event write failed, response unaffected"
                );
            }
        }
    }
}
