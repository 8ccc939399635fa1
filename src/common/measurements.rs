//! # Sample Records
//!
//! Morphometric measurements attached to each goat sample, in the two schemas
//! the dataset has used:
//!
//! - [`Measurements`]: the current schema, written as `N_data.json` by the
//!   ingestion service (seven numbers plus a tag).
//! - [`LegacyRecord`]: one line of the old line-delimited capture format,
//!   which embeds the photo as a data URI and has no `BodyHeight`/`Tag`.
//!
//! All numbers are kept at 32-bit precision. Keys are PascalCase on the wire.

use serde::{Deserialize, Serialize};

/// Measurements and tag of one accepted submission.
///
/// Serialized key order: `Angle, Distance, BodyLength, ShoulderHeight,
/// RumpHeight, BodyHeight, Weight, Tag`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Measurements {
    pub angle: f32,
    pub distance: f32,
    pub body_length: f32,
    pub shoulder_height: f32,
    pub rump_height: f32,
    pub body_height: f32,
    pub weight: f32,
    pub tag: String,
}

/// One line of a legacy capture file.
///
/// Keys missing from the line decode as `0` (numbers) or an empty string
/// (image), matching how the capture files were originally consumed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegacyRecord {
    pub angle: f32,
    pub distance: f32,
    /// Data URI of the form `data:image/png;base64,<payload>`
    pub image: String,
    pub body_length: f32,
    pub shoulder_height: f32,
    pub rump_height: f32,
    pub weight: f32,
}

/// The numeric part of a [`LegacyRecord`], written as `K_data.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyMeasurements {
    pub angle: f32,
    pub distance: f32,
    pub body_length: f32,
    pub shoulder_height: f32,
    pub rump_height: f32,
    pub weight: f32,
}

impl LegacyRecord {
    /// Split the record into its embedded image string and its measurements.
    pub fn into_parts(self) -> (String, LegacyMeasurements) {
        let measurements = LegacyMeasurements {
            angle: self.angle,
            distance: self.distance,
            body_length: self.body_length,
            shoulder_height: self.shoulder_height,
            rump_height: self.rump_height,
            weight: self.weight,
        };
        (self.image, measurements)
    }
}
