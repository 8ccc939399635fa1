//! # Legacy Capture Processing
//!
//! Offline conversion of line-delimited capture files (photos embedded as
//! base64 data URIs) into the artifact layout of the ingestion service.

pub mod error;
pub mod format;
pub mod legacy;

pub use error::DecodeError;
pub use format::{detect, DetectedImage};
pub use legacy::{DecodeSummary, LegacyDecoder};
