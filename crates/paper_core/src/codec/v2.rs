//! crates/paper_core/src/codec/v2.rs
//!
//! The current format. Short field names keep URLs compact; empty fields are
//! omitted and default on decode.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{bookmarks_from_wire, parse_json, plan_from_wire};
use crate::domain::{BookmarkedCourse, Mode, Switches, UserOptions};
use crate::error::DecodeError;
use crate::membership::{MatchBy, Membership};
use crate::schedule::ScheduleSelection;
use crate::snapshot::Snapshot;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotV2 {
    #[serde(rename = "y")]
    years: Vec<Vec<Vec<String>>>,
    #[serde(rename = "b", default, skip_serializing_if = "Vec::is_empty")]
    bookmarks: Vec<String>,
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    term: Option<String>,
    #[serde(rename = "s", default, skip_serializing_if = "Vec::is_empty")]
    sections: Vec<String>,
    /// `[course_id, subject, number, title]` tuples.
    #[serde(rename = "sb", default, skip_serializing_if = "Vec::is_empty")]
    schedule_bookmarks: Vec<(String, String, String, String)>,
    #[serde(rename = "o", default)]
    options: OptionsV2,
}

#[derive(Debug, Serialize, Deserialize)]
struct OptionsV2 {
    #[serde(rename = "m", default)]
    mode: u8,
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    active_plan: Option<Uuid>,
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    active_schedule: Option<Uuid>,
    #[serde(rename = "f", default = "default_switch_bits")]
    switches: u16,
}

impl Default for OptionsV2 {
    fn default() -> Self {
        OptionsV2 {
            mode: 0,
            active_plan: None,
            active_schedule: None,
            switches: default_switch_bits(),
        }
    }
}

fn default_switch_bits() -> u16 {
    Switches::default().bits()
}

fn mode_tag(mode: Mode) -> u8 {
    match mode {
        Mode::Plan => 0,
        Mode::Schedule => 1,
    }
}

pub(super) fn to_json(snapshot: &Snapshot) -> Vec<u8> {
    let wire = SnapshotV2 {
        years: snapshot.plan.placements(),
        bookmarks: snapshot.bookmarks.iter().cloned().collect(),
        term: snapshot.schedule.term.clone(),
        sections: snapshot.schedule.section_ids.clone(),
        schedule_bookmarks: snapshot
            .schedule_bookmarks
            .iter()
            .map(|b| {
                (
                    b.course_id.clone(),
                    b.subject.clone(),
                    b.number.clone(),
                    b.title.clone(),
                )
            })
            .collect(),
        options: OptionsV2 {
            mode: mode_tag(snapshot.options.mode),
            active_plan: snapshot.options.active_plan_id,
            active_schedule: snapshot.options.active_schedule_id,
            switches: snapshot.options.switches.bits(),
        },
    };
    // Strings, integers and sequences only; serialization cannot fail.
    serde_json::to_vec(&wire).unwrap_or_default()
}

pub(super) fn from_json(bytes: &[u8]) -> Result<Snapshot, DecodeError> {
    let wire: SnapshotV2 = parse_json(bytes)?;

    let mode = match wire.options.mode {
        0 => Mode::Plan,
        1 => Mode::Schedule,
        other => {
            return Err(DecodeError::SchemaViolation(format!(
                "unknown mode {}",
                other
            )))
        }
    };
    let switches = Switches::from_bits(wire.options.switches).ok_or_else(|| {
        DecodeError::SchemaViolation(format!(
            "unknown switch bits {:#x}",
            wire.options.switches
        ))
    })?;

    Ok(Snapshot {
        plan: plan_from_wire(wire.years)?,
        bookmarks: bookmarks_from_wire(wire.bookmarks)?,
        schedule: selection_from_wire(wire.term, wire.sections)?,
        schedule_bookmarks: schedule_bookmarks_from_wire(wire.schedule_bookmarks)?,
        options: UserOptions {
            mode,
            active_plan_id: wire.options.active_plan,
            active_schedule_id: wire.options.active_schedule,
            switches,
        },
    })
}

fn selection_from_wire(
    term: Option<String>,
    sections: Vec<String>,
) -> Result<ScheduleSelection, DecodeError> {
    let mut ids = BTreeSet::new();
    for id in sections {
        if id.trim().is_empty() {
            return Err(DecodeError::SchemaViolation("empty section id".to_string()));
        }
        if !ids.insert(id.clone()) {
            return Err(DecodeError::SchemaViolation(format!(
                "section {} appears twice",
                id
            )));
        }
    }
    Ok(ScheduleSelection {
        term,
        section_ids: ids.into_iter().collect(),
    })
}

fn schedule_bookmarks_from_wire(
    tuples: Vec<(String, String, String, String)>,
) -> Result<Membership<BookmarkedCourse>, DecodeError> {
    let mut seen = BTreeSet::new();
    let mut items = Vec::with_capacity(tuples.len());
    for (course_id, subject, number, title) in tuples {
        if course_id.trim().is_empty() {
            return Err(DecodeError::SchemaViolation(
                "schedule bookmark without a course id".to_string(),
            ));
        }
        if !seen.insert(course_id.clone()) {
            return Err(DecodeError::SchemaViolation(format!(
                "course {} is bookmarked twice in the schedule",
                course_id
            )));
        }
        items.push(BookmarkedCourse {
            course_id,
            subject,
            number,
            title,
        });
    }
    Ok(Membership::List {
        items,
        match_by: MatchBy::Key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_empty_fields() {
        let json = to_json(&Snapshot::default());
        let text = String::from_utf8(json).unwrap();
        assert!(!text.contains("\"b\""));
        assert!(!text.contains("\"s\""));
        assert!(!text.contains("\"p\""));
        assert!(text.contains("\"f\""));
    }

    #[test]
    fn missing_options_take_defaults() {
        let snapshot = from_json(br#"{"y":[[[],[],[]]]}"#).unwrap();
        assert_eq!(snapshot.options, UserOptions::default());
        assert!(snapshot.schedule_bookmarks.is_empty());
    }

    #[test]
    fn unknown_mode_is_a_schema_violation() {
        let err = from_json(br#"{"y":[[[],[],[]]],"o":{"m":7}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::SchemaViolation(_)));
    }

    #[test]
    fn unknown_switch_bits_are_a_schema_violation() {
        let err = from_json(br#"{"y":[[[],[],[]]],"o":{"f":4096}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::SchemaViolation(_)));
    }

    #[test]
    fn duplicate_sections_are_a_schema_violation() {
        let err = from_json(br#"{"y":[[[],[],[]]],"s":["1-1","1-1"]}"#).unwrap_err();
        assert!(matches!(err, DecodeError::SchemaViolation(_)));
    }

    #[test]
    fn wrong_json_types_are_malformed() {
        let err = from_json(br#"{"y":5}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedInput(_)));
    }
}
