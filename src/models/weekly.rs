//! Weekly check-in and progress photo models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One weigh-in per ISO week.
///
/// Stored at: `artifacts/{app_id}/users/{uid}/weeklyEntries/{YYYY-Www}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyEntry {
    /// ISO week (`YYYY-Www`), also the document ID
    #[serde(alias = "_firestore_id", default)]
    pub id: String,
    /// Body weight
    pub weight: f64,
    /// When the check-in was saved (ISO 8601)
    #[serde(default)]
    pub timestamp: String,
}

/// Which angle a progress photo was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoType {
    Front,
    Side,
}

impl PhotoType {
    pub fn as_str(self) -> &'static str {
        match self {
            PhotoType::Front => "front",
            PhotoType::Side => "side",
        }
    }
}

impl fmt::Display for PhotoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uploaded progress photo record (append-only).
///
/// Stored at: `artifacts/{app_id}/users/{uid}/progressPhotos/{doc_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPhoto {
    /// Download URL returned by object storage
    pub url: String,
    /// Calendar date of the check-in (`YYYY-MM-DD`)
    pub date: String,
    /// Upload time (ISO 8601, used for ordering)
    pub timestamp: String,
    #[serde(rename = "type")]
    pub photo_type: PhotoType,
    /// Object name within the user's photo folder
    pub file_name: String,
}
