//! # Submission Form
//!
//! Reads a complete multi-part body before anything else happens, so a
//! malformed upload is rejected without consuming a sample number.
//!
//! File parts are kept in memory while the request stays under its memory
//! budget. A part that would exceed the budget is streamed into an anonymous
//! temporary file instead, which is deleted when the form is dropped. The
//! total body size is capped separately by the router's body limit.

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use bytes::{Bytes, BytesMut};
use log::debug;
use std::collections::HashMap;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use super::ingest::IngestError;

/// File part carrying the unmodified photo.
pub const ORIGINAL_IMAGE: &str = "originalImage";
/// File part carrying the segmented photo.
pub const MASKED_IMAGE: &str = "maskedImage";
/// Text field carrying the sample tag.
pub const TAG: &str = "tag";

/// Contents of one uploaded file part.
#[derive(Debug)]
pub enum FilePart {
    /// Buffered within the request's memory budget
    Memory(Bytes),
    /// Spilled to a temporary file, positioned at its start
    Spilled { file: File, len: u64 },
}

impl FilePart {
    /// Size of the part in bytes.
    pub fn size(&self) -> u64 {
        match self {
            FilePart::Memory(bytes) => bytes.len() as u64,
            FilePart::Spilled { len, .. } => *len,
        }
    }
}

/// A fully read multi-part submission.
///
/// Parts with a filename are file parts; everything else is a text field.
/// When a name repeats, the first occurrence wins.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    files: HashMap<String, FilePart>,
    fields: HashMap<String, String>,
}

impl SubmissionForm {
    /// Read every part of `multipart`, keeping at most `memory_limit` bytes
    /// of file data in memory.
    ///
    /// # Errors
    /// - [`IngestError::InvalidForm`]: the body is not valid multi-part data,
    ///   exceeds the body limit, or a text field is not UTF-8
    /// - [`IngestError::Spill`]: a temporary file could not be written
    pub async fn read(mut multipart: Multipart, memory_limit: usize) -> Result<Self, IngestError> {
        let mut form = Self::default();
        let mut remaining = memory_limit;

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| IngestError::InvalidForm(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();

            if field.file_name().is_some() {
                let part = read_file_part(&mut field, &name, &mut remaining).await?;
                form.files.entry(name).or_insert(part);
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| IngestError::InvalidForm(format!("reading field '{}': {}", name, e)))?;
                form.fields.entry(name).or_insert(value);
            }
        }

        Ok(form)
    }

    pub fn with_file(mut self, name: &str, data: impl Into<Bytes>) -> Self {
        self.files
            .entry(name.to_string())
            .or_insert(FilePart::Memory(data.into()));
        self
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.entry(name.to_string()).or_insert(value.into());
        self
    }

    /// Take ownership of the file part `name`.
    ///
    /// # Errors
    /// [`IngestError::MissingPart`] if no file part with that name was sent.
    pub fn take_file(&mut self, name: &'static str) -> Result<FilePart, IngestError> {
        self.files.remove(name).ok_or(IngestError::MissingPart(name))
    }

    /// Value of the text field `name`, or `""` when it was not sent.
    pub fn value(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

async fn read_file_part(
    field: &mut Field<'_>,
    name: &str,
    remaining: &mut usize,
) -> Result<FilePart, IngestError> {
    let mut buffered = BytesMut::new();

    while let Some(chunk) = next_chunk(field, name).await? {
        if buffered.len() + chunk.len() > *remaining {
            return spill(field, name, &buffered, &chunk).await;
        }
        buffered.extend_from_slice(&chunk);
    }

    *remaining -= buffered.len();
    Ok(FilePart::Memory(buffered.freeze()))
}

/// Move a part that outgrew the memory budget into a temporary file.
async fn spill(
    field: &mut Field<'_>,
    name: &str,
    buffered: &[u8],
    chunk: &[u8],
) -> Result<FilePart, IngestError> {
    let mut file = File::from_std(tempfile::tempfile().map_err(IngestError::Spill)?);
    file.write_all(buffered).await.map_err(IngestError::Spill)?;
    file.write_all(chunk).await.map_err(IngestError::Spill)?;
    let mut len = (buffered.len() + chunk.len()) as u64;

    while let Some(chunk) = next_chunk(field, name).await? {
        file.write_all(&chunk).await.map_err(IngestError::Spill)?;
        len += chunk.len() as u64;
    }

    file.flush().await.map_err(IngestError::Spill)?;
    file.rewind().await.map_err(IngestError::Spill)?;
    debug!("📦 Part '{}' spilled to disk ({} bytes)", name, len);

    Ok(FilePart::Spilled { file, len })
}

async fn next_chunk(field: &mut Field<'_>, name: &str) -> Result<Option<Bytes>, IngestError> {
    field
        .chunk()
        .await
        .map_err(|e| IngestError::InvalidForm(format!("reading part '{}': {}", name, e)))
}
