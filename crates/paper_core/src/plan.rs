//! crates/paper_core/src/plan.rs
//!
//! The multi-year plan: years of three or four quarters, each quarter an
//! ordered list of course ids. Every mutation is pure and returns a new plan.

use serde::{Deserialize, Serialize};

use crate::domain::Course;
use crate::error::{ModelError, ModelResult};
use crate::ports::Catalog;

/// Fall, Winter and Spring are always present.
pub const REGULAR_QUARTERS: usize = 3;
/// Summer is the optional fourth quarter.
pub const MAX_QUARTERS: usize = 4;
pub const DEFAULT_YEARS: usize = 4;
pub const MAX_YEARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarterKind {
    Fall,
    Winter,
    Spring,
    Summer,
}

impl QuarterKind {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(QuarterKind::Fall),
            1 => Some(QuarterKind::Winter),
            2 => Some(QuarterKind::Spring),
            3 => Some(QuarterKind::Summer),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            QuarterKind::Fall => "Fall",
            QuarterKind::Winter => "Winter",
            QuarterKind::Spring => "Spring",
            QuarterKind::Summer => "Summer",
        }
    }
}

/// Display title for a zero-based year index.
pub fn year_title(year: usize) -> String {
    match year {
        0 => "Freshman Year".to_string(),
        1 => "Sophomore Year".to_string(),
        2 => "Junior Year".to_string(),
        3 => "Senior Year".to_string(),
        n => format!("Year {}", n + 1),
    }
}

/// One quarter's course placements, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quarter {
    courses: Vec<String>,
}

impl Quarter {
    pub fn courses(&self) -> &[String] {
        &self.courses
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

/// Three regular quarters plus an optional summer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Year {
    quarters: Vec<Quarter>,
}

impl Default for Year {
    fn default() -> Self {
        Year {
            quarters: vec![Quarter::default(); REGULAR_QUARTERS],
        }
    }
}

impl Year {
    pub fn quarters(&self) -> &[Quarter] {
        &self.quarters
    }

    pub fn has_summer(&self) -> bool {
        self.quarters.len() == MAX_QUARTERS
    }

    pub fn is_empty(&self) -> bool {
        self.quarters.iter().all(Quarter::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    years: Vec<Year>,
}

impl Default for Plan {
    fn default() -> Self {
        Plan::with_years(DEFAULT_YEARS)
    }
}

impl Plan {
    /// An empty plan with `years` three-quarter years (at least one).
    pub fn with_years(years: usize) -> Self {
        Plan {
            years: vec![Year::default(); years.clamp(1, MAX_YEARS)],
        }
    }

    /// Builds a plan from raw placements, checking every shape invariant.
    pub fn from_placements(years: Vec<Vec<Vec<String>>>) -> ModelResult<Self> {
        if years.is_empty() || years.len() > MAX_YEARS {
            return Err(ModelError::InvalidState(format!(
                "a plan needs between 1 and {} years, got {}",
                MAX_YEARS,
                years.len()
            )));
        }
        let mut built = Vec::with_capacity(years.len());
        for (y, quarters) in years.into_iter().enumerate() {
            if !(REGULAR_QUARTERS..=MAX_QUARTERS).contains(&quarters.len()) {
                return Err(ModelError::InvalidState(format!(
                    "year {} has {} quarters",
                    y,
                    quarters.len()
                )));
            }
            let mut year = Year { quarters: Vec::with_capacity(quarters.len()) };
            for courses in quarters {
                if courses.iter().any(|id| id.trim().is_empty()) {
                    return Err(ModelError::InvalidState(format!(
                        "year {} has an empty course id",
                        y
                    )));
                }
                year.quarters.push(Quarter { courses });
            }
            built.push(year);
        }
        Ok(Plan { years: built })
    }

    /// Raw placements, the inverse of [`Plan::from_placements`].
    pub fn placements(&self) -> Vec<Vec<Vec<String>>> {
        self.years
            .iter()
            .map(|year| year.quarters.iter().map(|q| q.courses.clone()).collect())
            .collect()
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn year(&self, year: usize) -> ModelResult<&Year> {
        self.years.get(year).ok_or(ModelError::OutOfRange {
            what: "year",
            index: year,
            len: self.years.len(),
        })
    }

    pub fn quarter(&self, year: usize, quarter: usize) -> ModelResult<&Quarter> {
        let y = self.year(year)?;
        y.quarters.get(quarter).ok_or(ModelError::OutOfRange {
            what: "quarter",
            index: quarter,
            len: y.quarters.len(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.years.iter().all(Year::is_empty)
    }

    pub fn course_count(&self) -> usize {
        self.years
            .iter()
            .flat_map(|y| y.quarters.iter())
            .map(|q| q.courses.len())
            .sum()
    }

    fn quarter_mut(&mut self, year: usize, quarter: usize) -> ModelResult<&mut Quarter> {
        let years = self.years.len();
        let y = self.years.get_mut(year).ok_or(ModelError::OutOfRange {
            what: "year",
            index: year,
            len: years,
        })?;
        let quarters = y.quarters.len();
        y.quarters.get_mut(quarter).ok_or(ModelError::OutOfRange {
            what: "quarter",
            index: quarter,
            len: quarters,
        })
    }

    /// Appends `course` to the end of the target quarter. The same course may
    /// appear in several quarters.
    pub fn add_course(&self, course: &Course, year: usize, quarter: usize) -> ModelResult<Plan> {
        if course.id.trim().is_empty() {
            return Err(ModelError::InvalidState("course id is empty".to_string()));
        }
        let mut next = self.clone();
        next.quarter_mut(year, quarter)?
            .courses
            .push(course.id.clone());
        Ok(next)
    }

    /// Removes the placement at `index`, shifting later placements down.
    pub fn remove_course(&self, year: usize, quarter: usize, index: usize) -> ModelResult<Plan> {
        let mut next = self.clone();
        let q = next.quarter_mut(year, quarter)?;
        if index >= q.courses.len() {
            return Err(ModelError::NotFound(format!(
                "no course at position {} of year {} quarter {}",
                index, year, quarter
            )));
        }
        q.courses.remove(index);
        Ok(next)
    }

    /// Moves a placement to the end of another (or the same) quarter.
    pub fn move_course(
        &self,
        from: (usize, usize),
        index: usize,
        to: (usize, usize),
    ) -> ModelResult<Plan> {
        // Validate the destination before touching anything.
        self.quarter(to.0, to.1)?;
        let id = self
            .quarter(from.0, from.1)?
            .courses
            .get(index)
            .cloned()
            .ok_or_else(|| {
                ModelError::NotFound(format!(
                    "no course at position {} of year {} quarter {}",
                    index, from.0, from.1
                ))
            })?;
        let mut next = self.remove_course(from.0, from.1, index)?;
        next.quarter_mut(to.0, to.1)?.courses.push(id);
        Ok(next)
    }

    pub fn add_summer_quarter(&self, year: usize) -> ModelResult<Plan> {
        if self.year(year)?.has_summer() {
            return Err(ModelError::InvalidState(format!(
                "year {} already has a summer quarter",
                year
            )));
        }
        let mut next = self.clone();
        next.years[year].quarters.push(Quarter::default());
        Ok(next)
    }

    /// Drops the summer quarter and every placement in it. Callers confirm
    /// with the user before discarding a non-empty summer.
    pub fn remove_summer_quarter(&self, year: usize) -> ModelResult<Plan> {
        if !self.year(year)?.has_summer() {
            return Err(ModelError::InvalidState(format!(
                "year {} has no summer quarter",
                year
            )));
        }
        let mut next = self.clone();
        next.years[year].quarters.truncate(REGULAR_QUARTERS);
        Ok(next)
    }

    /// Empties every quarter of `year`, keeping the quarter count.
    pub fn clear_year(&self, year: usize) -> ModelResult<Plan> {
        self.year(year)?;
        let mut next = self.clone();
        for q in &mut next.years[year].quarters {
            q.courses.clear();
        }
        Ok(next)
    }

    pub fn add_year(&self) -> ModelResult<Plan> {
        if self.years.len() >= MAX_YEARS {
            return Err(ModelError::InvalidState(format!(
                "a plan cannot have more than {} years",
                MAX_YEARS
            )));
        }
        let mut next = self.clone();
        next.years.push(Year::default());
        Ok(next)
    }

    /// Drops the last year and its placements.
    pub fn remove_year(&self) -> ModelResult<Plan> {
        if self.years.len() <= 1 {
            return Err(ModelError::InvalidState(
                "a plan needs at least one year".to_string(),
            ));
        }
        let mut next = self.clone();
        next.years.pop();
        Ok(next)
    }

    /// Same shape, no placements.
    pub fn clear(&self) -> Plan {
        let mut next = self.clone();
        for q in next.years.iter_mut().flat_map(|y| y.quarters.iter_mut()) {
            q.courses.clear();
        }
        next
    }

    /// Total units of the quarter's courses; courses the catalog does not
    /// know contribute nothing.
    pub fn quarter_units(
        &self,
        year: usize,
        quarter: usize,
        catalog: &dyn Catalog,
    ) -> ModelResult<f32> {
        Ok(self
            .quarter(year, quarter)?
            .courses
            .iter()
            .filter_map(|id| catalog.course(id))
            .map(|course| course.units)
            .sum())
    }
}
