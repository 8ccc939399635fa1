use thiserror::Error;

use crate::common::store::StoreError;

/// Why a single legacy capture line was skipped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot parse record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("line is {len} bytes, limit is {max}")]
    LineTooLong { len: usize, max: usize },

    #[error("invalid string: image is not a base64 data URI")]
    InvalidDataUri,

    #[error("malformed base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("unrecognized image format")]
    UnknownFormat,

    #[error("corrupt {format} image: {source}")]
    CorruptImage {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),
}
