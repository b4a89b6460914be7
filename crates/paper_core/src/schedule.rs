//! crates/paper_core/src/schedule.rs
//!
//! The term schedule: sections keyed by section id, plus the derived views
//! built from it (time conflicts, map location groups, export candidates).

use std::collections::BTreeMap;

use chrono::Weekday;

use crate::domain::{Coordinates, Section, Weekdays};
use crate::error::{ModelError, ModelResult};
use crate::ports::Catalog;

/// How `remove_section` treats an id that is not in the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Absent ids are a no-op.
    Lenient,
    /// Absent ids fail with `NotFound`.
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    sections: BTreeMap<String, Section>,
}

/// The persisted projection of a schedule: just which sections are in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSelection {
    pub term: Option<String>,
    /// Sorted, unique.
    pub section_ids: Vec<String>,
}

impl ScheduleSelection {
    pub fn is_empty(&self) -> bool {
        self.section_ids.is_empty()
    }
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, section_id: &str) -> Option<&Section> {
        self.sections.get(section_id)
    }

    pub fn contains(&self, section_id: &str) -> bool {
        self.sections.contains_key(section_id)
    }

    /// Sections ordered by id.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn add_section(&self, section: Section) -> ModelResult<Schedule> {
        if section.section_id.trim().is_empty() {
            return Err(ModelError::InvalidState("section id is empty".to_string()));
        }
        if self.sections.contains_key(&section.section_id) {
            return Err(ModelError::Duplicate(format!(
                "section {} is already in the schedule",
                section.section_id
            )));
        }
        let mut next = self.clone();
        next.sections.insert(section.section_id.clone(), section);
        Ok(next)
    }

    pub fn remove_section(&self, section_id: &str, removal: Removal) -> ModelResult<Schedule> {
        if !self.sections.contains_key(section_id) {
            return match removal {
                Removal::Lenient => Ok(self.clone()),
                Removal::Strict => Err(ModelError::NotFound(format!(
                    "section {} is not in the schedule",
                    section_id
                ))),
            };
        }
        let mut next = self.clone();
        next.sections.remove(section_id);
        Ok(next)
    }

    pub fn clear(&self) -> Schedule {
        Schedule::default()
    }

    pub fn selection(&self, term: Option<String>) -> ScheduleSelection {
        ScheduleSelection {
            term,
            section_ids: self.sections.keys().cloned().collect(),
        }
    }

    /// Sections a calendar file can be generated for: dated, with at least
    /// one fully timed meeting.
    pub fn exportable_sections(&self) -> Vec<Section> {
        self.sections
            .values()
            .filter(|s| s.start_date.is_some() && s.end_date.is_some())
            .filter(|s| s.meetings.iter().any(|m| m.interval().is_some()))
            .cloned()
            .collect()
    }
}

//=========================================================================================
// Conflicts
//=========================================================================================

/// Two sections meeting at overlapping times on `day`. `first < second`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub first: String,
    pub second: String,
    pub day: Weekday,
}

/// Days on which `a` and `b` overlap, using half-open `[start, end)`
/// intervals. Symmetric in its arguments.
pub fn conflict_days(a: &Section, b: &Section) -> Vec<Weekday> {
    let mut days = Weekdays::EMPTY;
    for ma in &a.meetings {
        let Some((a_start, a_end)) = ma.interval() else {
            continue;
        };
        for mb in &b.meetings {
            let Some((b_start, b_end)) = mb.interval() else {
                continue;
            };
            if a_start < b_end && b_start < a_end {
                days = days.union(ma.days.intersection(mb.days));
            }
        }
    }
    days.iter().collect()
}

/// Every overlapping pair of sections, one entry per shared day.
pub fn find_conflicts(schedule: &Schedule) -> Vec<Conflict> {
    let sections: Vec<&Section> = schedule.sections().collect();
    let mut conflicts = Vec::new();
    for (i, a) in sections.iter().enumerate() {
        for b in &sections[i + 1..] {
            for day in conflict_days(a, b) {
                conflicts.push(Conflict {
                    first: a.section_id.clone(),
                    second: b.section_id.clone(),
                    day,
                });
            }
        }
    }
    conflicts
}

//=========================================================================================
// Locations
//=========================================================================================

/// Sections meeting at one map point.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationGroup {
    pub coordinates: Coordinates,
    /// Section ids, each at most once.
    pub section_ids: Vec<String>,
    /// Color of the subject of the section that created the group.
    pub color: Option<String>,
}

/// Coalesces every resolvable room in the schedule into one group per exact
/// coordinate pair.
pub fn group_locations(schedule: &Schedule, catalog: &dyn Catalog) -> Vec<LocationGroup> {
    let mut groups: Vec<LocationGroup> = Vec::new();
    for section in schedule.sections() {
        for room in section.rooms() {
            let Some(location) = catalog.location(room) else {
                continue;
            };
            let point = location.coordinates;
            if !point.lat.is_finite() || !point.lon.is_finite() {
                continue;
            }
            match groups.iter_mut().find(|g| g.coordinates == point) {
                Some(group) => {
                    if !group.section_ids.contains(&section.section_id) {
                        group.section_ids.push(section.section_id.clone());
                    }
                }
                None => groups.push(LocationGroup {
                    coordinates: point,
                    section_ids: vec![section.section_id.clone()],
                    color: catalog.color(&section.subject),
                }),
            }
        }
    }
    groups
}

pub fn room_finder_link(catalog: &dyn Catalog, room: &str) -> Option<String> {
    catalog.location(room).and_then(|l| l.room_finder_url)
}

/// Human name of a component code; unknown codes are returned lowercased.
pub fn component_name(code: &str) -> String {
    match code {
        "LEC" => "lecture",
        "DIS" => "discussion",
        "LAB" => "lab",
        "SEM" => "seminar",
        "REC" => "recitation",
        "STU" => "studio",
        "IND" => "independent study",
        "CLN" => "clinic",
        "PRA" => "practicum",
        "FLD" => "field studies",
        "CON" => "conference",
        "TUT" => "tutorial",
        other => return other.to_lowercase(),
    }
    .to_string()
}
