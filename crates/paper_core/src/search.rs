//! crates/paper_core/src/search.rs
//!
//! Course search. Query expansion is a pure function of the query and the
//! catalog's shortcut table; no state survives between calls.

use std::collections::HashMap;

use crate::domain::Course;

pub const SEARCH_RESULT_LIMIT: usize = 100;
/// Terms shorter than this are not searched.
pub const MIN_TERM_LEN: usize = 3;

/// A shortcut expansion, shown to the user as "replacing X with Y".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub replacing: String,
    /// The replacement subjects, comma separated.
    pub with: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    pub terms: Vec<String>,
    pub substitution: Option<Substitution>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Nothing typed yet.
    Empty,
    TooShort,
    Results {
        courses: Vec<Course>,
        /// Matches left out by the limit.
        remaining: usize,
    },
}

fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['-', '_'], " ")
}

/// Lowercases the query and turns `-`/`_` into spaces. When the first word is
/// a shortcut (e.g. `cs`), one term is produced per replacement subject with
/// the rest of the query appended.
pub fn expand_search_terms(query: &str, shortcuts: &HashMap<String, Vec<String>>) -> SearchTerms {
    let search = normalize(query);
    let (first, rest) = search.split_once(' ').unwrap_or((search.as_str(), ""));

    match shortcuts.get(first).filter(|r| !r.is_empty()) {
        Some(replacements) => SearchTerms {
            terms: replacements
                .iter()
                .map(|r| format!("{} {}", normalize(r), rest).trim_end().to_string())
                .collect(),
            substitution: Some(Substitution {
                replacing: first.to_string(),
                with: replacements.join(", "),
            }),
        },
        None => SearchTerms {
            terms: vec![search.clone()],
            substitution: None,
        },
    }
}

/// Substring search over course ids and names, in catalog order.
pub fn search_courses(
    courses: &[Course],
    query: &str,
    shortcuts: &HashMap<String, Vec<String>>,
    limit: usize,
) -> SearchOutcome {
    if query.is_empty() {
        return SearchOutcome::Empty;
    }
    let expanded = expand_search_terms(query, shortcuts);
    if expanded.terms.iter().any(|t| t.chars().count() < MIN_TERM_LEN) {
        return SearchOutcome::TooShort;
    }

    let mut matched = courses.iter().filter(|course| {
        let id = normalize(&course.id);
        let name = course.name.to_lowercase();
        expanded
            .terms
            .iter()
            .any(|term| id.contains(term.as_str()) || name.contains(term.as_str()))
    });

    let found: Vec<Course> = matched.by_ref().take(limit).cloned().collect();
    SearchOutcome::Results {
        courses: found,
        remaining: matched.count(),
    }
}
