//! crates/paper_core/src/membership.rs
//!
//! Set-like membership over two backing representations: a true set, where
//! membership is presence, and a list, where membership is either whole-value
//! equality or equality of a designated key.
//!
//! Every operation is pure and never produces duplicate members, so toggling
//! the same target twice always returns a collection equal to the original.

use std::collections::BTreeSet;

/// A value with a designated key field used for keyed membership.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

/// How a list-backed collection decides that two elements are the same member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchBy {
    Value,
    Key,
}

/// A membership collection.
#[derive(Debug, Clone)]
pub enum Membership<T> {
    Set(BTreeSet<T>),
    List { items: Vec<T>, match_by: MatchBy },
}

impl<T: Ord + Clone + Keyed> Membership<T> {
    pub fn empty_set() -> Self {
        Membership::Set(BTreeSet::new())
    }

    pub fn empty_list(match_by: MatchBy) -> Self {
        Membership::List {
            items: Vec::new(),
            match_by,
        }
    }

    /// Builds a list-backed collection, dropping later duplicates.
    pub fn list_from(items: impl IntoIterator<Item = T>, match_by: MatchBy) -> Self {
        items
            .into_iter()
            .fold(Self::empty_list(match_by), |acc, item| acc.insert(&item))
    }

    pub fn is_member(&self, target: &T) -> bool {
        match self {
            Membership::Set(set) => set.contains(target),
            Membership::List { items, match_by } => {
                items.iter().any(|item| matches(*match_by, item, target))
            }
        }
    }

    /// Flips membership of `target`.
    ///
    /// In a keyed list the member sharing `target`'s key is removed even if
    /// its other fields differ, and toggling again inserts `target` itself.
    /// Toggling twice restores the original only when `target` equals the
    /// member; otherwise the member comes back with `target`'s fields.
    pub fn toggle(&self, target: &T) -> Self {
        if self.is_member(target) {
            self.remove(target)
        } else {
            self.insert(target)
        }
    }

    /// Adds `target` unless an equal member is already present.
    pub fn insert(&self, target: &T) -> Self {
        if self.is_member(target) {
            return self.clone();
        }
        match self {
            Membership::Set(set) => {
                let mut set = set.clone();
                set.insert(target.clone());
                Membership::Set(set)
            }
            Membership::List { items, match_by } => {
                let mut items = items.clone();
                items.push(target.clone());
                Membership::List {
                    items,
                    match_by: *match_by,
                }
            }
        }
    }

    /// Removes every member equal to `target`.
    pub fn remove(&self, target: &T) -> Self {
        match self {
            Membership::Set(set) => {
                let mut set = set.clone();
                set.remove(target);
                Membership::Set(set)
            }
            Membership::List { items, match_by } => Membership::List {
                items: items
                    .iter()
                    .filter(|item| !matches(*match_by, *item, target))
                    .cloned()
                    .collect(),
                match_by: *match_by,
            },
        }
    }

    /// Members in storage order (sorted for sets, insertion order for lists).
    pub fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        match self {
            Membership::Set(set) => Box::new(set.iter()),
            Membership::List { items, .. } => Box::new(items.iter()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Membership::Set(set) => set.len(),
            Membership::List { items, .. } => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An empty collection with the same representation.
    pub fn cleared(&self) -> Self {
        match self {
            Membership::Set(_) => Membership::Set(BTreeSet::new()),
            Membership::List { match_by, .. } => Self::empty_list(*match_by),
        }
    }

    fn sorted(&self) -> Vec<&T> {
        let mut members: Vec<&T> = self.iter().collect();
        members.sort();
        members
    }
}

fn matches<T: PartialEq + Keyed>(match_by: MatchBy, item: &T, target: &T) -> bool {
    match match_by {
        MatchBy::Value => item == target,
        MatchBy::Key => item.key() == target.key(),
    }
}

/// Equality is set-like: same representation, same members, any order.
impl<T: Ord + Clone + Keyed> PartialEq for Membership<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Membership::Set(a), Membership::Set(b)) => a == b,
            (
                Membership::List { match_by: a, .. },
                Membership::List { match_by: b, .. },
            ) => a == b && self.sorted() == other.sorted(),
            _ => false,
        }
    }
}

impl<T: Ord + Clone + Keyed> Eq for Membership<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BookmarkedCourse;

    fn bookmark(id: &str, title: &str) -> BookmarkedCourse {
        BookmarkedCourse {
            course_id: id.to_string(),
            subject: "COMP_SCI".to_string(),
            number: "211-0".to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn set_toggle_twice_restores_state() {
        let set = Membership::empty_set()
            .insert(&"COMP_SCI 111-0".to_string())
            .insert(&"MATH 220-1".to_string());
        let target = "PHYSICS 135-2".to_string();
        let toggled = set.toggle(&target);
        assert!(toggled.is_member(&target));
        assert_eq!(toggled.toggle(&target), set);
    }

    #[test]
    fn keyed_list_matches_on_key_only() {
        let list = Membership::empty_list(MatchBy::Key).insert(&bookmark("4011", "Old title"));
        // Same key, different title: already a member.
        assert!(list.is_member(&bookmark("4011", "New title")));
        let removed = list.toggle(&bookmark("4011", "New title"));
        assert!(removed.is_empty());
    }

    #[test]
    fn keyed_double_toggle_takes_the_target_fields() {
        let list = Membership::empty_list(MatchBy::Key).insert(&bookmark("4011", "Old title"));
        let fresh = bookmark("4011", "New title");
        let back = list.toggle(&fresh).toggle(&fresh);
        assert_eq!(back.len(), 1);
        assert_eq!(back.iter().next(), Some(&fresh));
        assert_ne!(back, list);
    }

    #[test]
    fn value_list_matches_whole_value() {
        let list = Membership::empty_list(MatchBy::Value).insert(&bookmark("4011", "A"));
        assert!(!list.is_member(&bookmark("4011", "B")));
        assert!(list.is_member(&bookmark("4011", "A")));
    }

    #[test]
    fn list_double_toggle_is_equal_but_reordered() {
        let list = Membership::list_from(
            vec![bookmark("1", "a"), bookmark("2", "b")],
            MatchBy::Key,
        );
        let target = bookmark("1", "a");
        let back = list.toggle(&target).toggle(&target);
        assert_eq!(back, list);
        let order: Vec<&str> = back.iter().map(|b| b.course_id.as_str()).collect();
        assert_eq!(order, vec!["2", "1"]);
    }

    #[test]
    fn insert_never_duplicates() {
        let target = bookmark("7", "x");
        let list = Membership::empty_list(MatchBy::Key)
            .insert(&target)
            .insert(&target);
        assert_eq!(list.len(), 1);
        let built = Membership::list_from(vec![target.clone(), target], MatchBy::Key);
        assert_eq!(built.len(), 1);
    }

    #[test]
    fn toggles_commute() {
        let a = "A 1".to_string();
        let b = "B 2".to_string();
        let start = Membership::empty_set().insert(&a);
        assert_eq!(start.toggle(&a).toggle(&b), start.toggle(&b).toggle(&a));
    }

    #[test]
    fn different_representations_are_not_equal() {
        let set: Membership<String> = Membership::empty_set();
        let list: Membership<String> = Membership::empty_list(MatchBy::Value);
        assert_ne!(set, list);
    }
}
