#![forbid(unsafe_code)]

pub mod journal;
pub mod repo;
pub mod tracking;

pub use repo::{EngagementEventRepo, RecipientBindingRepo, TrackingRepo};
pub use tracking::{StorageError, TrackingStore};
