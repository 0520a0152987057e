#![forbid(unsafe_code)]

pub mod classifier;
pub mod issuer;
pub mod report;

pub use classifier::{classify, summarize, EngagementSummary};
pub use issuer::{IssuerConfig, TokenIssuer};
pub use report::{campaign_stats, generate_campaign_report};
