pub mod common;
pub mod processing;
pub mod server;

pub use common::measurements::{LegacyRecord, Measurements};
pub use common::store::ArtifactStore;
pub use processing::LegacyDecoder;
pub use server::{SampleIngestor, SequenceAllocator};
