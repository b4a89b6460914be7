//! crates/paper_core/src/domain.rs
//!
//! Defines the core value records shared by the plan, schedule and account
//! layers. Catalog records are immutable once fetched; the plan and schedule
//! models only ever hold them by value or by identifier.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::membership::Keyed;

//=========================================================================================
// Catalog Records
//=========================================================================================

/// A course as described by the catalog collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Subject plus number, e.g. `COMP_SCI 211-0`. Unique within a catalog snapshot.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prereqs: Option<String>,
    pub units: f32,
    #[serde(default)]
    pub distros: Option<String>,
}

/// The seven days of the week, Monday first.
const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn day_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mo",
        Weekday::Tue => "Tu",
        Weekday::Wed => "We",
        Weekday::Thu => "Th",
        Weekday::Fri => "Fr",
        Weekday::Sat => "Sa",
        Weekday::Sun => "Su",
    }
}

/// A set of weekdays stored as a bitset, bit 0 being Monday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weekdays(u8);

impl Weekdays {
    pub const EMPTY: Weekdays = Weekdays(0);

    pub fn from_bits(bits: u8) -> Self {
        Weekdays(bits & 0b0111_1111)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn of(days: &[Weekday]) -> Self {
        days.iter().fold(Weekdays::EMPTY, |set, day| set.with(*day))
    }

    pub fn with(self, day: Weekday) -> Self {
        Weekdays(self.0 | (1 << day.num_days_from_monday()))
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn intersection(self, other: Weekdays) -> Weekdays {
        Weekdays(self.0 & other.0)
    }

    pub fn union(self, other: Weekdays) -> Weekdays {
        Weekdays(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the contained days, Monday first.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        WEEK.into_iter().filter(move |day| self.contains(*day))
    }
}

impl fmt::Display for Weekdays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for day in self.iter() {
            f.write_str(day_code(day))?;
        }
        Ok(())
    }
}

impl FromStr for Weekdays {
    type Err = String;

    /// Parses the catalog's two-letter day codes, e.g. `MoWeFr`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() % 2 != 0 || !s.is_ascii() {
            return Err(format!("'{}' is not a list of two-letter day codes", s));
        }
        let mut days = Weekdays::EMPTY;
        for i in (0..s.len()).step_by(2) {
            let code = &s[i..i + 2];
            let day = WEEK
                .into_iter()
                .find(|day| day_code(*day) == code)
                .ok_or_else(|| format!("unknown day code '{}'", code))?;
            days = days.with(day);
        }
        Ok(days)
    }
}

/// One meeting pattern of a section. A missing room or time leaves only this
/// meeting unscheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub room: Option<String>,
    pub days: Weekdays,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl Meeting {
    /// The half-open `[start, end)` interval, if this meeting is fully timed.
    pub fn interval(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start < end && !self.days.is_empty() => {
                Some((start, end))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructor {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub campus_address: Option<String>,
    pub office_hours: Option<String>,
    pub bio: Option<String>,
    pub url: Option<String>,
}

/// One offered instance of a course component within a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Globally unique within a term, e.g. `4011-1-20`: course id plus suffix.
    pub section_id: String,
    pub subject: String,
    pub number: String,
    /// Section code, e.g. `20`.
    pub section: String,
    /// Component code, e.g. `LEC`, `DIS`, `LAB`.
    pub component: String,
    pub title: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub instructors: Vec<Instructor>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub enrollment_requirements: Option<String>,
    #[serde(default)]
    pub distros: Option<String>,
    /// Free-text blocks as `(heading, body)` pairs.
    #[serde(default)]
    pub descriptions: Vec<(String, String)>,
}

impl Section {
    /// The course portion of the section id (everything before the first `-`).
    pub fn course_id(&self) -> &str {
        self.section_id
            .split_once('-')
            .map_or(self.section_id.as_str(), |(course, _)| course)
    }

    /// Rooms of every meeting that has one, in meeting order.
    pub fn rooms(&self) -> impl Iterator<Item = &str> {
        self.meetings.iter().filter_map(|m| m.room.as_deref())
    }
}

/// Geographic coordinates of a room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// What the catalog knows about a room string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinates: Coordinates,
    #[serde(default)]
    pub room_finder_url: Option<String>,
}

/// A schedule bookmark: a course the user wants to revisit in schedule mode.
/// Two bookmarks are the same bookmark when their `course_id`s match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookmarkedCourse {
    pub course_id: String,
    pub subject: String,
    pub number: String,
    pub title: String,
}

impl Keyed for BookmarkedCourse {
    fn key(&self) -> &str {
        &self.course_id
    }
}

//=========================================================================================
// User Options
//=========================================================================================

/// Which of the two editors is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Plan,
    Schedule,
}

/// A boolean user preference. Each one has its own local-storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Switch {
    Dark,
    Compact,
    QuarterUnits,
    MoreInfo,
    Minimap,
    SaveToStorage,
}

impl Switch {
    pub const ALL: [Switch; 6] = [
        Switch::Dark,
        Switch::Compact,
        Switch::QuarterUnits,
        Switch::MoreInfo,
        Switch::Minimap,
        Switch::SaveToStorage,
    ];

    /// The local-storage key for this switch.
    pub fn key(self) -> &'static str {
        match self {
            Switch::Dark => "dark",
            Switch::Compact => "compact",
            Switch::QuarterUnits => "quarter_units",
            Switch::MoreInfo => "more_info",
            Switch::Minimap => "minimap",
            Switch::SaveToStorage => "save_to_storage",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// The set of enabled switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switches(u16);

impl Switches {
    pub const KNOWN_BITS: u16 = (1 << Switch::ALL.len()) - 1;

    pub fn get(self, switch: Switch) -> bool {
        self.0 & switch.bit() != 0
    }

    pub fn set(self, switch: Switch, enabled: bool) -> Self {
        if enabled {
            Switches(self.0 | switch.bit())
        } else {
            Switches(self.0 & !switch.bit())
        }
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    /// Returns `None` when `bits` names a switch this build does not know.
    pub fn from_bits(bits: u16) -> Option<Self> {
        (bits & !Self::KNOWN_BITS == 0).then_some(Switches(bits))
    }
}

impl Default for Switches {
    fn default() -> Self {
        Switches(0)
            .set(Switch::Minimap, true)
            .set(Switch::SaveToStorage, true)
    }
}

/// User options carried inside every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserOptions {
    pub mode: Mode,
    pub active_plan_id: Option<Uuid>,
    pub active_schedule_id: Option<Uuid>,
    pub switches: Switches,
}

impl UserOptions {
    pub fn active_id(&self, kind: DocumentKind) -> Option<Uuid> {
        match kind {
            DocumentKind::Plan => self.active_plan_id,
            DocumentKind::Schedule => self.active_schedule_id,
        }
    }

    pub fn set_active_id(&mut self, kind: DocumentKind, id: Option<Uuid>) {
        match kind {
            DocumentKind::Plan => self.active_plan_id = id,
            DocumentKind::Schedule => self.active_schedule_id = id,
        }
    }
}

//=========================================================================================
// Account Records
//=========================================================================================

/// The two kinds of document a user can save to their account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Plan,
    Schedule,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Plan => "plan",
            DocumentKind::Schedule => "schedule",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plan" => Ok(DocumentKind::Plan),
            "schedule" => Ok(DocumentKind::Schedule),
            other => Err(format!("unknown document kind '{}'", other)),
        }
    }
}

/// A saved plan or schedule. `content` is an encoded snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDocument {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub name: String,
    pub content: String,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AccountDocument {
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

// Represents a user of the account service
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
