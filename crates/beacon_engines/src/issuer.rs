#![forbid(unsafe_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use beacon_kernel_contracts::campaign::{CampaignId, RecipientId, RecipientRecord, TrackingToken};
use beacon_kernel_contracts::{ContractViolation, MonotonicTimeNs};
use beacon_storage::repo::RecipientBindingRepo;
use beacon_storage::tracking::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuerConfig {
    /// Random bytes per token. 16 bytes encodes to 22 url-safe chars and
    /// gives 128 bits of entropy.
    pub token_bytes: usize,
    pub max_collision_retries: u8,
}

impl IssuerConfig {
    pub fn mvp_v1() -> Self {
        Self {
            token_bytes: 16,
            max_collision_retries: 4,
        }
    }
}

/// Issues the tracking token for one (campaign, recipient) pair and persists
/// the RecipientRecord binding before the token is ever handed out.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    config: IssuerConfig,
}

impl TokenIssuer {
    pub fn new(config: IssuerConfig) -> Self {
        Self { config }
    }

    pub fn issue<S: RecipientBindingRepo>(
        &self,
        store: &mut S,
        campaign_id: CampaignId,
        recipient_id: RecipientId,
        sent_at: MonotonicTimeNs,
    ) -> Result<TrackingToken, StorageError> {
        // A collision would need two identical 128-bit draws; the retry
        // loop only exists so a duplicate never clobbers an older binding.
        let mut attempts = 0u8;
        loop {
            let token = self.generate_token()?;
            let record = RecipientRecord::v1(
                token.clone(),
                campaign_id.clone(),
                recipient_id.clone(),
                sent_at,
            )?;
            match store.insert_recipient_binding(record) {
                Ok(()) => return Ok(token),
                Err(StorageError::DuplicateToken { .. })
                    if attempts < self.config.max_collision_retries =>
                {
                    attempts += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn generate_token(&self) -> Result<TrackingToken, ContractViolation> {
        let mut raw = vec![0u8; self.config.token_bytes];
        OsRng.fill_bytes(&mut raw);
        TrackingToken::new(BASE64.encode(raw))
    }
}
