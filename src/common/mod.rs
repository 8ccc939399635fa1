//! # Common Components
//!
//! Shared utilities and data structures used by both the ingestion service
//! and the offline capture parser.
//!
//! ## Modules
//!
//! - [`measurements`]: Morphometric sample records (current and legacy schema)
//! - [`store`]: Artifact persistence with the `N_<kind>.<ext>` naming convention
//! - [`config`]: Configuration parsing utilities
//! - [`logging`]: Logger initialization shared by the binaries

pub mod config;
pub mod logging;
pub mod measurements;
pub mod store;
