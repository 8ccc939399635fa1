//! # Legacy Capture Decoder
//!
//! Re-materializes an old line-delimited capture file into the same artifact
//! layout the ingestion service produces. Each line is a JSON object whose
//! `Image` key embeds the photo as a base64 data URI.
//!
//! ## Per-line Pipeline
//!
//! 1. Parse the line as a [`LegacyRecord`]
//! 2. Split the data URI at `;base64,`
//! 3. Base64-decode the payload
//! 4. Detect the image format from its signature
//! 5. Write `K_image.<ext>`
//! 6. Write the six measurements to `K_data.json`
//!
//! `K` counts every line read, starting at 1, skipped lines included. A
//! failing line is logged and skipped; it never stops the run or affects
//! other lines. Only failing to open or read the input file is fatal.
//!
//! Lines are read in bounded chunks. Once a line outgrows the line limit its
//! remaining bytes are discarded up to the next newline, so an oversized or
//! unterminated line never has to fit in memory.

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use log::{error, info};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};

use super::error::DecodeError;
use super::format::{self, DetectedImage};
use crate::common::measurements::LegacyRecord;
use crate::common::store::{ArtifactKind, ArtifactStore};

/// Marker separating the data-URI prefix from the base64 payload.
pub const BASE64_MARKER: &str = ";base64,";

/// Longest line accepted by default (4 MiB). Lines embed whole photos.
pub const DEFAULT_MAX_LINE_BYTES: usize = 2048 * 2048;

const READ_BUFFER_BYTES: usize = 1024 * 1024;

/// Return the base64 payload of a data URI such as
/// `data:image/png;base64,iVBORw0...`.
pub fn data_uri_payload(uri: &str) -> Result<&str, DecodeError> {
    uri.find(BASE64_MARKER)
        .map(|idx| &uri[idx + BASE64_MARKER.len()..])
        .ok_or(DecodeError::InvalidDataUri)
}

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Lines read, including skipped ones
    pub lines: u64,
    /// Lines that produced both an image and a data file
    pub written: u64,
    /// Lines skipped because of a [`DecodeError`]
    pub skipped: u64,
}

/// Decodes a capture file into an [`ArtifactStore`].
pub struct LegacyDecoder {
    store: ArtifactStore,
    max_line_bytes: usize,
}

impl LegacyDecoder {
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Process every line of `infile`, sequentially.
    ///
    /// # Errors
    /// Only when `infile` cannot be opened or read; per-line failures are
    /// logged and counted in [`DecodeSummary::skipped`].
    pub async fn run(&self, infile: &Path) -> Result<DecodeSummary> {
        let file = File::open(infile)
            .await
            .with_context(|| format!("cannot open {}", infile.display()))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_BYTES, file);

        info!(
            "📂 Reading {}, writing to {}",
            infile.display(),
            self.store.dir().display()
        );

        let mut summary = DecodeSummary::default();
        let mut line = Vec::new();

        while let Some(read) = read_line_bounded(&mut reader, &mut line, self.max_line_bytes)
            .await
            .with_context(|| format!("error reading {}", infile.display()))?
        {
            summary.lines += 1;
            let index = summary.lines;
            info!("parsing row number {}", index);

            let result = match read {
                LineRead::Line => self.decode_line(index, trim_line_ending(&line)).await,
                LineRead::Oversized { len } => Err(DecodeError::LineTooLong {
                    len,
                    max: self.max_line_bytes,
                }),
            };

            match result {
                Ok(detected) => {
                    summary.written += 1;
                    info!(
                        "✅ Row {}: {}x{} {} image",
                        index, detected.width, detected.height, detected.extension
                    );
                }
                Err(e) => {
                    summary.skipped += 1;
                    error!("❌ Skipping row {}: {}", index, e);
                }
            }
        }

        info!(
            "📊 Done: {} rows read, {} written, {} skipped",
            summary.lines, summary.written, summary.skipped
        );

        Ok(summary)
    }

    /// Decode one line and write its two artifacts under number `index`.
    pub async fn decode_line(&self, index: u64, line: &[u8]) -> Result<DetectedImage, DecodeError> {
        if line.len() > self.max_line_bytes {
            return Err(DecodeError::LineTooLong {
                len: line.len(),
                max: self.max_line_bytes,
            });
        }

        let record: LegacyRecord = serde_json::from_slice(line)?;
        let (image, measurements) = record.into_parts();

        let payload = data_uri_payload(&image)?;
        let bytes = general_purpose::STANDARD.decode(payload.trim_end())?;
        let detected = format::detect(&bytes)?;

        self.store
            .write_image(index, ArtifactKind::Image, detected.extension, &bytes)
            .await?;
        self.store.write_json(index, &measurements).await?;

        Ok(detected)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    /// The whole line, terminator included, is in the buffer
    Line,
    /// The line exceeded the limit and was discarded; `len` excludes the `\n`
    Oversized { len: usize },
}

/// Read the next line into `line`, storing at most `max` bytes plus a
/// `\r\n` terminator. Returns `None` at end of input.
async fn read_line_bounded<R>(reader: &mut R, line: &mut Vec<u8>, max: usize) -> io::Result<Option<LineRead>>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let keep = max.saturating_add(2);
    let mut total = 0usize;
    let mut oversized = false;
    let mut terminated = false;

    while !terminated {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }

        let used = match available.iter().position(|&b| b == b'\n') {
            Some(idx) => {
                terminated = true;
                idx + 1
            }
            None => available.len(),
        };
        total = total.saturating_add(used);

        if !oversized {
            if line.len() + used > keep {
                oversized = true;
                line.clear();
            } else {
                line.extend_from_slice(&available[..used]);
            }
        }
        reader.consume(used);
    }

    if total == 0 {
        return Ok(None);
    }
    if oversized {
        let len = total - usize::from(terminated);
        return Ok(Some(LineRead::Oversized { len }));
    }
    Ok(Some(LineRead::Line))
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_payload() {
        assert_eq!(data_uri_payload("data:image/png;base64,AAAA").unwrap(), "AAAA");
        assert_eq!(data_uri_payload(";base64,").unwrap(), "");
        assert!(matches!(
            data_uri_payload("data:image/png,AAAA"),
            Err(DecodeError::InvalidDataUri)
        ));
    }

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending(b"{}\r\n"), b"{}");
        assert_eq!(trim_line_ending(b"{}\n"), b"{}");
        assert_eq!(trim_line_ending(b"{}"), b"{}");
    }

    #[tokio::test]
    async fn test_line_over_limit_is_rejected_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = LegacyDecoder::new(ArtifactStore::new(dir.path())).with_max_line_bytes(8);

        let err = decoder.decode_line(1, b"{\"Angle\": 1.0}").await.unwrap_err();

        assert!(matches!(err, DecodeError::LineTooLong { len: 14, max: 8 }));
    }

    #[tokio::test]
    async fn test_bounded_reader_splits_lines() {
        let mut reader = BufReader::with_capacity(4, &b"{\"a\":1}\r\nlast"[..]);
        let mut line = Vec::new();

        let read = read_line_bounded(&mut reader, &mut line, 16).await.unwrap();
        assert_eq!(read, Some(LineRead::Line));
        assert_eq!(line, b"{\"a\":1}\r\n");

        let read = read_line_bounded(&mut reader, &mut line, 16).await.unwrap();
        assert_eq!(read, Some(LineRead::Line));
        assert_eq!(line, b"last");

        assert_eq!(read_line_bounded(&mut reader, &mut line, 16).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unterminated_oversized_line_is_not_buffered() {
        let data = vec![b'x'; 100_000];
        let mut reader = BufReader::with_capacity(64, &data[..]);
        let mut line = Vec::new();

        let read = read_line_bounded(&mut reader, &mut line, 32).await.unwrap();

        assert_eq!(read, Some(LineRead::Oversized { len: 100_000 }));
        assert!(line.len() <= 34);
        assert!(line.capacity() < 1024);
        assert_eq!(read_line_bounded(&mut reader, &mut line, 32).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reading_resumes_after_oversized_line() {
        let mut data = vec![b'y'; 5_000];
        data.extend_from_slice(b"\nshort\n");
        let mut reader = BufReader::with_capacity(16, &data[..]);
        let mut line = Vec::new();

        let read = read_line_bounded(&mut reader, &mut line, 8).await.unwrap();
        assert_eq!(read, Some(LineRead::Oversized { len: 5_000 }));

        let read = read_line_bounded(&mut reader, &mut line, 8).await.unwrap();
        assert_eq!(read, Some(LineRead::Line));
        assert_eq!(line, b"short\n");
    }

    #[tokio::test]
    async fn test_malformed_base64() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = LegacyDecoder::new(ArtifactStore::new(dir.path()));

        let err = decoder
            .decode_line(1, br#"{"Image":"data:image/png;base64,!!not base64!!"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, DecodeError::Base64(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
