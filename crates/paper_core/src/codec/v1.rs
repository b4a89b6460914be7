//! crates/paper_core/src/codec/v1.rs
//!
//! The legacy format: plan placements and bookmarks only. Never written, but
//! links shared before schedules existed must keep opening.

use serde::Deserialize;

use super::{bookmarks_from_wire, parse_json, plan_from_wire};
use crate::error::DecodeError;
use crate::snapshot::Snapshot;

#[derive(Debug, Deserialize)]
struct SnapshotV1 {
    #[serde(rename = "y")]
    years: Vec<Vec<Vec<String>>>,
    #[serde(rename = "b", default)]
    bookmarks: Vec<String>,
}

/// Everything a v1 link does not carry takes its default.
pub(super) fn from_json(bytes: &[u8]) -> Result<Snapshot, DecodeError> {
    let wire: SnapshotV1 = parse_json(bytes)?;
    Ok(Snapshot {
        plan: plan_from_wire(wire.years)?,
        bookmarks: bookmarks_from_wire(wire.bookmarks)?,
        ..Snapshot::default()
    })
}
