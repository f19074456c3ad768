//! Snapshot exports: JSON download and the prefilled demo request link.

use urlencoding::encode;

use crate::error::Result;
use crate::estimator::SnapshotResult;

/// File name offered for the JSON download.
pub const SNAPSHOT_FILENAME: &str = "snapshot.json";

/// A file offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub content_type: String,
    pub body: String,
}

/// Serializes a snapshot into the downloadable `snapshot.json` document.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn snapshot_download(result: &SnapshotResult) -> Result<Download> {
    Ok(Download {
        filename: SNAPSHOT_FILENAME.to_string(),
        content_type: "application/json".to_string(),
        body: serde_json::to_string_pretty(result)?,
    })
}

/// Percent-encodes a URI component exactly like `encodeURIComponent`.
///
/// `urlencoding` also escapes `!*'()`, which `encodeURIComponent` keeps.
#[must_use]
pub fn encode_uri_component(raw: &str) -> String {
    encode(raw)
        .replace("%21", "!")
        .replace("%2A", "*")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
}

/// Builds the `mailto:` link for a demo request prefilled with the snapshot.
#[must_use]
pub fn contact_link(
    recipient: &str,
    subject: &str,
    result: &SnapshotResult,
    contact_email: &str,
) -> String {
    format!(
        "mailto:{recipient}?subject={}&body={}",
        encode_uri_component(subject),
        encode_uri_component(&result.contact_message(contact_email))
    )
}
