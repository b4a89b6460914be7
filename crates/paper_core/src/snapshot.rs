//! crates/paper_core/src/snapshot.rs
//!
//! The serializable projection of everything the URL carries: the plan, its
//! bookmarks, which sections the schedule holds, schedule bookmarks, and the
//! user options.

use crate::domain::{BookmarkedCourse, UserOptions};
use crate::membership::{MatchBy, Membership};
use crate::plan::Plan;
use crate::schedule::ScheduleSelection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub plan: Plan,
    /// "My List": a set of course ids.
    pub bookmarks: Membership<String>,
    pub schedule: ScheduleSelection,
    /// Matched by `course_id`.
    pub schedule_bookmarks: Membership<BookmarkedCourse>,
    pub options: UserOptions,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            plan: Plan::default(),
            bookmarks: Membership::empty_set(),
            schedule: ScheduleSelection::default(),
            schedule_bookmarks: Membership::empty_list(MatchBy::Key),
            options: UserOptions::default(),
        }
    }
}

impl Snapshot {
    /// True when the snapshot holds no user content. Options alone do not
    /// count: a URL carrying only options does not shadow local storage.
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
            && self.bookmarks.is_empty()
            && self.schedule.is_empty()
            && self.schedule_bookmarks.is_empty()
    }

    /// A copy with plan content taken from `other` and everything else kept.
    pub fn with_plan_from(&self, other: &Snapshot) -> Snapshot {
        Snapshot {
            plan: other.plan.clone(),
            bookmarks: other.bookmarks.clone(),
            ..self.clone()
        }
    }

    /// A copy with schedule content taken from `other` and everything else kept.
    pub fn with_schedule_from(&self, other: &Snapshot) -> Snapshot {
        Snapshot {
            schedule: other.schedule.clone(),
            schedule_bookmarks: other.schedule_bookmarks.clone(),
            ..self.clone()
        }
    }
}
