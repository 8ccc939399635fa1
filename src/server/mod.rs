//! # Ingestion Service
//!
//! ## Core ([`ingest`])
//! Allocates a sample number and writes the file triple for one submission.
//!
//! ## Plumbing
//! - [`sequence`]: process-wide sample numbering
//! - [`form`]: buffered multi-part body
//! - [`routes`]: axum router, CORS and request logging

pub mod form;
pub mod ingest;
pub mod routes;
pub mod sequence;

pub use ingest::{IngestError, SampleIngestor};
pub use routes::build_router;
pub use sequence::SequenceAllocator;
