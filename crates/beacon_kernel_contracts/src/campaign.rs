#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const TRACKING_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Maximum encoded token length accepted from the wire. Issued tokens are
/// 22 chars (16 random bytes, base64 url-safe, no padding); the ceiling
/// leaves room for longer encodings without accepting unbounded input.
pub const TRACKING_TOKEN_MAX_LEN: usize = 64;
pub const TRACKING_TOKEN_MIN_LEN: usize = 16;

fn is_url_safe_base64_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_'
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(String);

impl CampaignId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for CampaignId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "campaign_id",
                reason: "must not be empty",
            });
        }
        if self.0.len() > 64 {
            return Err(ContractViolation::InvalidValue {
                field: "campaign_id",
                reason: "must be <= 64 chars",
            });
        }
        if !self
            .0
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_')
        {
            return Err(ContractViolation::InvalidValue {
                field: "campaign_id",
                reason: "must be ASCII alphanumeric, '-' or '_'",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(String);

impl RecipientId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for RecipientId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "recipient_id",
                reason: "must not be empty",
            });
        }
        if self.0.len() > 128 {
            return Err(ContractViolation::InvalidValue {
                field: "recipient_id",
                reason: "must be <= 128 chars",
            });
        }
        if !self.0.is_ascii() {
            return Err(ContractViolation::InvalidValue {
                field: "recipient_id",
                reason: "must be ASCII",
            });
        }
        Ok(())
    }
}

/// Opaque per-(campaign, recipient) identifier embedded in pixel and
/// redirect URLs. Carries no recipient identity; resolving one requires the
/// stored binding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingToken(String);

impl TrackingToken {
    pub fn new(token: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(token.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for TrackingToken {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.len() < TRACKING_TOKEN_MIN_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "tracking_token",
                reason: "below minimum length",
            });
        }
        if self.0.len() > TRACKING_TOKEN_MAX_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "tracking_token",
                reason: "exceeds maximum length",
            });
        }
        if !self.0.bytes().all(is_url_safe_base64_char) {
            return Err(ContractViolation::InvalidValue {
                field: "tracking_token",
                reason: "must be URL-safe base64 charset",
            });
        }
        Ok(())
    }
}

/// Binding created when an email is dispatched. Owned by the campaign
/// sender; read-only to the tracking core once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRecord {
    pub token: TrackingToken,
    pub campaign_id: CampaignId,
    pub recipient_id: RecipientId,
    pub sent_at: MonotonicTimeNs,
}

impl RecipientRecord {
    pub fn v1(
        token: TrackingToken,
        campaign_id: CampaignId,
        recipient_id: RecipientId,
        sent_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            token,
            campaign_id,
            recipient_id,
            sent_at,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for RecipientRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.token.validate()?;
        self.campaign_id.validate()?;
        self.recipient_id.validate()?;
        Ok(())
    }
}
