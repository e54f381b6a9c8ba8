//! Data models for search results and pipeline records.
//!
//! API models use `#[serde(default)]` for optional fields and
//! `#[serde(rename = "camelCase")]` to match API naming.

mod paper;
mod record;

pub use paper::{AuthorRef, BulkSearchResult, ExternalIds, Paper};
pub use record::{Record, RecordErrors};
