//! crates/paper_core/src/codec/mod.rs
//!
//! Converts a [`Snapshot`] to and from a string that can be embedded directly
//! in a URL query component.
//!
//! The wire form is `<version>.<payload>`: a decimal format version, a dot,
//! and the unpadded URL-safe base64 of that version's compact JSON. Every
//! character is URL-unreserved. `encode` always writes [`CURRENT_VERSION`];
//! `decode` reads every version from 1 up to it.

mod v1;
mod v2;

use std::collections::BTreeSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use uuid::Uuid;

use crate::domain::{Mode, Switch, Switches, UserOptions};
use crate::error::{DecodeError, ModelError};
use crate::membership::Membership;
use crate::plan::Plan;
use crate::snapshot::Snapshot;

pub const CURRENT_VERSION: u32 = 2;
/// Inputs longer than this are rejected before any parsing.
pub const MAX_ENCODED_LEN: usize = 8192;
const SEPARATOR: char = '.';

/// Encodes `snapshot` with the current format version.
pub fn encode(snapshot: &Snapshot) -> String {
    let payload = v2::to_json(snapshot);
    format!(
        "{}{}{}",
        CURRENT_VERSION,
        SEPARATOR,
        URL_SAFE_NO_PAD.encode(payload)
    )
}

/// Decodes any supported format version into a snapshot.
pub fn decode(input: &str) -> Result<Snapshot, DecodeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DecodeError::MalformedInput("empty input".to_string()));
    }
    if input.len() > MAX_ENCODED_LEN {
        return Err(DecodeError::MalformedInput(format!(
            "input is {} characters, the limit is {}",
            input.len(),
            MAX_ENCODED_LEN
        )));
    }

    let (tag, payload) = input.split_once(SEPARATOR).ok_or_else(|| {
        DecodeError::MalformedInput("missing version separator".to_string())
    })?;
    let version = match tag.parse::<u32>() {
        Ok(0) | Err(_) => {
            return Err(DecodeError::MalformedInput(format!(
                "'{}' is not a format version",
                tag
            )))
        }
        Ok(v) if v > CURRENT_VERSION => return Err(DecodeError::UnsupportedVersion(v)),
        Ok(v) => v,
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| DecodeError::MalformedInput(format!("invalid payload: {}", e)))?;

    match version {
        1 => v1::from_json(&bytes),
        _ => v2::from_json(&bytes),
    }
}

/// Options in their longest encoded form: every switch on, both documents
/// active.
fn widest_options() -> UserOptions {
    UserOptions {
        mode: Mode::Schedule,
        active_plan_id: Some(Uuid::from_u128(u128::MAX)),
        active_schedule_id: Some(Uuid::from_u128(u128::MAX)),
        switches: Switch::ALL
            .iter()
            .fold(Switches::default(), |acc, switch| acc.set(*switch, true)),
    }
}

/// Fails when the content of `snapshot` could encode past [`MAX_ENCODED_LEN`]
/// under some choice of options. Content that passes always decodes again,
/// whatever switches or active documents are set later.
pub fn check_fits(snapshot: &Snapshot) -> Result<(), ModelError> {
    let widest = Snapshot {
        options: widest_options(),
        ..snapshot.clone()
    };
    let len = encode(&widest).len();
    if len > MAX_ENCODED_LEN {
        return Err(ModelError::InvalidState(format!(
            "the encoded snapshot would be {} characters, the limit is {}",
            len, MAX_ENCODED_LEN
        )));
    }
    Ok(())
}

/// Version tag of an encoded string without decoding the payload.
pub fn version_of(input: &str) -> Option<u32> {
    input.trim().split_once(SEPARATOR)?.0.parse().ok()
}

//=========================================================================================
// Validation shared by every version
//=========================================================================================

pub(crate) fn plan_from_wire(years: Vec<Vec<Vec<String>>>) -> Result<Plan, DecodeError> {
    Plan::from_placements(years).map_err(|e| DecodeError::SchemaViolation(e.to_string()))
}

pub(crate) fn bookmarks_from_wire(ids: Vec<String>) -> Result<Membership<String>, DecodeError> {
    let mut set = BTreeSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(DecodeError::SchemaViolation(
                "empty bookmarked course id".to_string(),
            ));
        }
        if !set.insert(id.clone()) {
            return Err(DecodeError::SchemaViolation(format!(
                "course {} is bookmarked twice",
                id
            )));
        }
    }
    Ok(Membership::Set(set))
}

pub(crate) fn parse_json<'a, T: serde::Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(bytes)
        .map_err(|e| DecodeError::MalformedInput(format!("invalid payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_separator() {
        assert!(matches!(decode("2abc"), Err(DecodeError::MalformedInput(_))));
    }

    #[test]
    fn rejects_bad_version_tags() {
        assert!(matches!(decode("x.abc"), Err(DecodeError::MalformedInput(_))));
        assert!(matches!(decode("0.abc"), Err(DecodeError::MalformedInput(_))));
        assert_eq!(decode("9.abc"), Err(DecodeError::UnsupportedVersion(9)));
    }

    #[test]
    fn rejects_characters_outside_the_alphabet() {
        assert!(matches!(decode("2.ab+c/=="), Err(DecodeError::MalformedInput(_))));
    }

    #[test]
    fn rejects_oversized_input() {
        let long = format!("2.{}", "A".repeat(MAX_ENCODED_LEN));
        assert!(matches!(decode(&long), Err(DecodeError::MalformedInput(_))));
    }

    #[test]
    fn default_snapshot_fits() {
        assert!(check_fits(&Snapshot::default()).is_ok());
        assert!(encode(&Snapshot::default()).len() < encode(&Snapshot {
            options: widest_options(),
            ..Snapshot::default()
        })
        .len());
    }

    #[test]
    fn encoded_default_is_url_safe() {
        let encoded = encode(&Snapshot::default());
        assert!(encoded.starts_with("2."));
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')));
        assert_eq!(version_of(&encoded), Some(2));
    }
}
