//! Remote file listing as served by the sensor.
//!
//! ```json
//! { "jobId": "campaign-7", "files": [{ "name": "a.ubx", "size": 1000, "hash": "..." }] }
//! ```
//!
//! Unknown fields are ignored. A missing `jobId`, `files`, or any per-file
//! field rejects the whole document.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::RemoteFileDescriptor;

/// Errors produced while decoding a listing body.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("malformed listing: {0}")]
    Json(#[from] serde_json::Error),
}

/// Listing document for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListing {
    /// Echo of the requested job identifier (string or integer on the wire).
    #[serde(deserialize_with = "job_id_from_wire")]
    pub job_id: String,
    pub files: Vec<ListedFile>,
}

/// One entry of [`FileListing::files`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedFile {
    pub name: String,
    pub size: u64,
    pub hash: String,
}

impl From<ListedFile> for RemoteFileDescriptor {
    fn from(file: ListedFile) -> Self {
        Self {
            name: file.name,
            size_bytes: file.size,
            content_hash: file.hash,
        }
    }
}

impl FileListing {
    /// Sum of all listed sizes, or `None` when it does not fit in a `u64`.
    pub fn total_bytes(&self) -> Option<u64> {
        self.files
            .iter()
            .try_fold(0u64, |total, f| total.checked_add(f.size))
    }
}

/// Decodes a listing body.
pub fn parse_listing(body: &[u8]) -> Result<FileListing, ListingError> {
    Ok(serde_json::from_slice(body)?)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireJobId {
    Text(String),
    Number(i64),
}

fn job_id_from_wire<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match WireJobId::deserialize(deserializer)? {
        WireJobId::Text(s) => s,
        WireJobId::Number(n) => n.to_string(),
    })
}
