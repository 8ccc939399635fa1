//! # Sample Ingestion
//!
//! The core of the ingestion service: turns one buffered submission into a
//! file triple in the run directory. HTTP concerns (routing, CORS, logging)
//! live in [`routes`](super::routes).
//!
//! ## Processing Order
//!
//! 1. Allocate sample number `N` (the form is already parsed)
//! 2. Write `originalImage` to `N_original.png`
//! 3. Write `maskedImage` to `N_masked.png`
//! 4. Parse the seven measurements as 32-bit floats
//! 5. Write measurements and tag to `N_data.json`
//!
//! A failure at any step stops processing. `N` stays consumed and files from
//! earlier steps stay on disk; there is no rollback.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::form::{FilePart, SubmissionForm, MASKED_IMAGE, ORIGINAL_IMAGE, TAG};
use super::sequence::SequenceAllocator;
use crate::common::measurements::Measurements;
use crate::common::store::{ArtifactKind, ArtifactStore, StoreError};

/// Uploaded images are always stored with this extension.
pub const UPLOAD_EXTENSION: &str = "png";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unable to parse form: {0}")]
    InvalidForm(String),

    #[error("missing file part '{0}'")]
    MissingPart(&'static str),

    #[error("field '{field}' is not a valid number: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("failed to buffer upload to a temporary file: {0}")]
    Spill(#[source] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::InvalidForm(_)
            | IngestError::MissingPart(_)
            | IngestError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            IngestError::Spill(_) | IngestError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("❌ {}", self);
        } else {
            warn!("⚠️  Rejected submission: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Parse a measurement the way the capture app sends it: a decimal string
/// representable as a finite 32-bit float.
fn parse_measurement(form: &SubmissionForm, field: &'static str) -> Result<f32, IngestError> {
    let raw = form.value(field);
    match raw.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(IngestError::InvalidField {
            field,
            value: raw.to_string(),
        }),
    }
}

impl Measurements {
    /// Build measurements from the submission's text fields.
    pub fn from_form(form: &SubmissionForm) -> Result<Self, IngestError> {
        Ok(Self {
            angle: parse_measurement(form, "angle")?,
            distance: parse_measurement(form, "distance")?,
            body_length: parse_measurement(form, "bodyLength")?,
            shoulder_height: parse_measurement(form, "shoulderHeight")?,
            rump_height: parse_measurement(form, "rumpHeight")?,
            body_height: parse_measurement(form, "bodyHeight")?,
            weight: parse_measurement(form, "weight")?,
            tag: form.value(TAG).to_string(),
        })
    }
}

/// Shared ingestion state: one allocator and one run directory per process.
///
/// Cloning is cheap; clones share the same allocator.
#[derive(Debug, Clone)]
pub struct SampleIngestor {
    allocator: Arc<SequenceAllocator>,
    store: ArtifactStore,
}

impl SampleIngestor {
    pub fn new(allocator: Arc<SequenceAllocator>, store: ArtifactStore) -> Self {
        Self { allocator, store }
    }

    /// Persist one submission and return its sample number.
    ///
    /// # Errors
    /// - [`IngestError::MissingPart`] / [`IngestError::InvalidField`]: client input
    /// - [`IngestError::Storage`]: a file could not be created or written
    pub async fn ingest(&self, mut form: SubmissionForm) -> Result<u64, IngestError> {
        let number = self.allocator.next();
        info!("📥 Handling submission #{}", number);

        let original = form.take_file(ORIGINAL_IMAGE)?;
        let original_len = self.store_part(number, ArtifactKind::Original, original).await?;

        let masked = form.take_file(MASKED_IMAGE)?;
        let masked_len = self.store_part(number, ArtifactKind::Masked, masked).await?;

        let measurements = Measurements::from_form(&form)?;
        self.store.write_json(number, &measurements).await?;

        info!(
            "✅ Stored submission #{} (tag '{}', original {} bytes, masked {} bytes)",
            number,
            measurements.tag,
            original_len,
            masked_len
        );

        Ok(number)
    }

    /// Write one uploaded image, from memory or from its spill file.
    async fn store_part(&self, number: u64, kind: ArtifactKind, part: FilePart) -> Result<u64, StoreError> {
        let size = part.size();
        match part {
            FilePart::Memory(bytes) => {
                self.store
                    .write_image(number, kind, UPLOAD_EXTENSION, &bytes)
                    .await?;
            }
            FilePart::Spilled { mut file, .. } => {
                self.store
                    .copy_image(number, kind, UPLOAD_EXTENSION, &mut file)
                    .await?;
            }
        }
        Ok(size)
    }
}
