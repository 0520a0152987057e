#![forbid(unsafe_code)]

pub mod campaign;
pub mod common;
pub mod event;
pub mod report;

pub use common::{ContractViolation, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate};
