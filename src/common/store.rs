//! # Artifact Store
//!
//! Persists the files belonging to one sample into a single directory using
//! the naming convention shared by the ingestion service and the capture
//! parser:
//!
//! ```text
//! <dir>/N_original.png    original photo            (ingestion service)
//! <dir>/N_masked.png      segmented photo           (ingestion service)
//! <dir>/K_image.<ext>     decoded legacy photo      (capture parser)
//! <dir>/N_data.json       measurements              (both)
//! ```
//!
//! Files are created with truncation. Creation and write failures are
//! reported as distinct [`StoreError`] variants; nothing is retried and files
//! already written for a sample are never rolled back.

use chrono::{DateTime, Local};
use log::debug;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::{self, AsyncRead, AsyncWriteExt};

/// `chrono` format of the per-run directory name (e.g. `2024-05-01_14-03-59`).
pub const RUN_DIR_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which image of a sample a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Unmodified photo uploaded by the client
    Original,
    /// Segmented/masked variant uploaded by the client
    Masked,
    /// Photo recovered from a legacy capture line
    Image,
}

impl ArtifactKind {
    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Original => "original",
            ArtifactKind::Masked => "masked",
            ArtifactKind::Image => "image",
        }
    }
}

/// File name of an image artifact, e.g. `7_masked.png`.
pub fn image_file_name(number: u64, kind: ArtifactKind, extension: &str) -> String {
    format!("{}_{}.{}", number, kind.suffix(), extension)
}

/// File name of a metadata artifact, e.g. `7_data.json`.
pub fn data_file_name(number: u64) -> String {
    format!("{}_data.json", number)
}

/// Name of the run directory for a service started at `started_at`.
pub fn run_dir_name(started_at: DateTime<Local>) -> String {
    started_at.format(RUN_DIR_FORMAT).to_string()
}

/// Writes sample artifacts into one directory.
///
/// The store holds no open handles; every write opens, fills and closes its
/// own file, so concurrent writers only need distinct sample numbers.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Use `dir` as-is. The directory is expected to exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create `dir` (and its parents) if needed and store artifacts there.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        Ok(Self { dir })
    }

    /// Create the timestamped directory for a service run under `root`.
    ///
    /// # Example
    /// ```ignore
    /// let store = ArtifactStore::create_run_dir(Path::new("."), Local::now()).await?;
    /// // ./2024-05-01_14-03-59/
    /// ```
    pub async fn create_run_dir(root: &Path, started_at: DateTime<Local>) -> Result<Self, StoreError> {
        Self::open(root.join(run_dir_name(started_at))).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an image artifact and return its path.
    pub async fn write_image(
        &self,
        number: u64,
        kind: ArtifactKind,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, StoreError> {
        self.write_file(&image_file_name(number, kind, extension), bytes)
            .await
    }

    /// Serialize `value` as compact JSON into `N_data.json` and return its path.
    pub async fn write_json<T: Serialize>(&self, number: u64, value: &T) -> Result<PathBuf, StoreError> {
        let data = serde_json::to_vec(value)?;
        self.write_file(&data_file_name(number), &data).await
    }

    /// Stream an image artifact from `reader` and return its path.
    pub async fn copy_image<R>(
        &self,
        number: u64,
        kind: ArtifactKind,
        extension: &str,
        reader: &mut R,
    ) -> Result<PathBuf, StoreError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.fill_file(&image_file_name(number, kind, extension), reader)
            .await
    }

    async fn write_file(&self, name: &str, mut bytes: &[u8]) -> Result<PathBuf, StoreError> {
        self.fill_file(name, &mut bytes).await
    }

    async fn fill_file<R>(&self, name: &str, reader: &mut R) -> Result<PathBuf, StoreError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = self.dir.join(name);

        let mut file = fs::File::create(&path)
            .await
            .map_err(|source| StoreError::Create {
                path: path.clone(),
                source,
            })?;

        let written = match io::copy(reader, &mut file).await {
            Ok(n) => file.flush().await.map(|()| n),
            Err(e) => Err(e),
        };
        let written = written.map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;

        debug!("💾 Wrote {} ({} bytes)", path.display(), written);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    #[test]
    fn test_file_names() {
        assert_eq!(image_file_name(1, ArtifactKind::Original, "png"), "1_original.png");
        assert_eq!(image_file_name(12, ArtifactKind::Masked, "png"), "12_masked.png");
        assert_eq!(image_file_name(3, ArtifactKind::Image, "jpeg"), "3_image.jpeg");
        assert_eq!(data_file_name(42), "42_data.json");
    }

    #[test]
    fn test_run_dir_name_format() {
        let started_at = Local.with_ymd_and_hms(2024, 5, 1, 14, 3, 9).unwrap();
        assert_eq!(run_dir_name(started_at), "2024-05-01_14-03-09");
        assert!(NaiveDateTime::parse_from_str(&run_dir_name(Local::now()), RUN_DIR_FORMAT).is_ok());
    }

    #[tokio::test]
    async fn test_create_run_dir_under_root() {
        let root = tempfile::tempdir().unwrap();
        let started_at = Local.with_ymd_and_hms(2023, 12, 31, 23, 59, 58).unwrap();

        let store = ArtifactStore::create_run_dir(root.path(), started_at).await.unwrap();

        assert_eq!(store.dir(), root.path().join("2023-12-31_23-59-58"));
        assert!(store.dir().is_dir());
    }

    #[tokio::test]
    async fn test_write_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        store
            .write_image(1, ArtifactKind::Original, "png", b"a much longer first payload")
            .await
            .unwrap();
        let path = store
            .write_image(1, ArtifactKind::Original, "png", b"short")
            .await
            .unwrap();

        assert_eq!(std::fs::read(path).unwrap(), b"short");
    }

    #[tokio::test]
    async fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let path = store
            .write_json(5, &serde_json::json!({ "Weight": 40.5 }))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("5_data.json"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), r#"{"Weight":40.5}"#);
    }

    #[tokio::test]
    async fn test_missing_directory_is_a_create_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("gone"));

        let err = store
            .write_image(1, ArtifactKind::Masked, "png", b"bytes")
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Create { .. }));
    }

    #[tokio::test]
    async fn test_copy_image_streams_reader() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let mut source = std::io::Cursor::new(vec![9u8; 70_000]);

        let path = store
            .copy_image(3, ArtifactKind::Masked, "png", &mut source)
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("3_masked.png"));
        assert_eq!(std::fs::read(path).unwrap(), vec![9u8; 70_000]);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_write_is_distinct_from_failed_create() {
        let dir = tempfile::tempdir().unwrap();
        // Opening succeeds, every write fails with ENOSPC
        std::os::unix::fs::symlink("/dev/full", dir.path().join("1_original.png")).unwrap();
        let store = ArtifactStore::new(dir.path());

        let err = store
            .write_image(1, ArtifactKind::Original, "png", b"bytes")
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Write { .. }), "got {:?}", err);
    }
}
