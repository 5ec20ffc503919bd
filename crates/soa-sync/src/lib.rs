//! Sync layer: compliance API client and log-safe masking of credentials.

pub mod mask;

#[cfg(feature = "http")]
pub mod http;

pub use mask::{mask_body, mask_headers, mask_secret};

#[cfg(feature = "http")]
pub use http::{ApiConfig, ComplianceClient, SyncError};
