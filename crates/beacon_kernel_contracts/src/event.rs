#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::campaign::TrackingToken;
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const EVENT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Upper bound on a recorded click destination. Ingestion rejects longer
/// targets before they reach the store, so the two checks must agree.
pub const LINK_TARGET_MAX_LEN: usize = 2048;

/// Store-assigned, strictly increasing per store. Used as the tie-break key
/// when two events carry the same observed_at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl Validate for EventId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "event_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Open,
    Click,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Click => "click",
        }
    }
}

/// Destination URL recorded with a click event, as redirected to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkTarget(String);

impl LinkTarget {
    pub fn new(url: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(url.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for LinkTarget {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "link_target",
                reason: "must not be empty",
            });
        }
        if self.0.len() > LINK_TARGET_MAX_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "link_target",
                reason: "must be <= 2048 chars",
            });
        }
        Ok(())
    }
}

fn validate_opt_field(
    field: &'static str,
    value: &Option<String>,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if let Some(v) = value {
        if v.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field,
                reason: "must not be empty when provided",
            });
        }
        if v.len() > max_len {
            return Err(ContractViolation::InvalidValue {
                field,
                reason: "exceeds max length",
            });
        }
    }
    Ok(())
}

/// One observed interaction before the store assigns it an EventId.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementEventInput {
    pub token: TrackingToken,
    pub kind: EventKind,
    pub observed_at: MonotonicTimeNs,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
    pub link_target: Option<LinkTarget>,
}

impl EngagementEventInput {
    pub fn v1(
        token: TrackingToken,
        kind: EventKind,
        observed_at: MonotonicTimeNs,
        source_ip: Option<String>,
        user_agent: Option<String>,
        link_target: Option<LinkTarget>,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            token,
            kind,
            observed_at,
            source_ip,
            user_agent,
            link_target,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for EngagementEventInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.token.validate()?;
        validate_opt_field("engagement_event.source_ip", &self.source_ip, 64)?;
        validate_opt_field("engagement_event.user_agent", &self.user_agent, 512)?;
        if let Some(target) = &self.link_target {
            target.validate()?;
        }
        match (self.kind, &self.link_target) {
            (EventKind::Click, None) => Err(ContractViolation::InvalidValue {
                field: "engagement_event.link_target",
                reason: "required for click events",
            }),
            (EventKind::Open, Some(_)) => Err(ContractViolation::InvalidValue {
                field: "engagement_event.link_target",
                reason: "must be absent for open events",
            }),
            _ => Ok(()),
        }
    }
}

/// An interaction as stored. Immutable once recorded; the store never
/// updates or deletes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub event_id: EventId,
    pub token: TrackingToken,
    pub kind: EventKind,
    pub observed_at: MonotonicTimeNs,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
    pub link_target: Option<LinkTarget>,
}

impl EngagementEvent {
    pub fn from_input_v1(
        event_id: EventId,
        input: EngagementEventInput,
    ) -> Result<Self, ContractViolation> {
        event_id.validate()?;
        input.validate()?;
        Ok(Self {
            event_id,
            token: input.token,
            kind: input.kind,
            observed_at: input.observed_at,
            source_ip: input.source_ip,
            user_agent: input.user_agent,
            link_target: input.link_target,
        })
    }
}

impl Validate for EngagementEvent {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.event_id.validate()?;
        self.token.validate()?;
        validate_opt_field("engagement_event.source_ip", &self.source_ip, 64)?;
        validate_opt_field("engagement_event.user_agent", &self.user_agent, 512)?;
        if let Some(target) = &self.link_target {
            target.validate()?;
        }
        Ok(())
    }
}
