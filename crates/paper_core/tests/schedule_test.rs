//! Schedule model, conflict detection and location grouping.

mod common;

use chrono::Weekday;

use common::{meeting, section, FakeCatalog};
use paper_core::domain::Meeting;
use paper_core::error::ModelError;
use paper_core::schedule::{
    component_name, conflict_days, find_conflicts, group_locations, room_finder_link, Removal,
    Schedule,
};

fn schedule_of(sections: Vec<paper_core::domain::Section>) -> Schedule {
    sections
        .into_iter()
        .try_fold(Schedule::new(), |s, sec| s.add_section(sec))
        .expect("unique sections")
}

#[test]
fn adjacent_meetings_do_not_conflict() {
    let a = section("1-1-20", "MATH", vec![meeting(None, &[Weekday::Mon], (10, 0), (10, 50))]);
    let b = section("2-1-20", "MATH", vec![meeting(None, &[Weekday::Mon], (10, 50), (11, 40))]);
    assert!(find_conflicts(&schedule_of(vec![a, b])).is_empty());
}

#[test]
fn overlapping_meetings_conflict_once_on_the_shared_day() {
    let a = section("1-1-20", "MATH", vec![meeting(None, &[Weekday::Mon], (10, 0), (10, 50))]);
    let b = section("2-1-20", "MATH", vec![meeting(None, &[Weekday::Mon], (10, 30), (11, 0))]);
    let conflicts = find_conflicts(&schedule_of(vec![a, b]));
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].day, Weekday::Mon);
    assert_eq!(conflicts[0].first, "1-1-20");
    assert_eq!(conflicts[0].second, "2-1-20");
}

#[test]
fn conflicts_are_symmetric() {
    let a = section(
        "1-1-20",
        "MATH",
        vec![
            meeting(None, &[Weekday::Mon, Weekday::Wed], (9, 0), (9, 50)),
            meeting(None, &[Weekday::Fri], (14, 0), (15, 0)),
        ],
    );
    let b = section(
        "2-1-20",
        "CHEM",
        vec![meeting(None, &[Weekday::Wed, Weekday::Fri], (9, 30), (14, 30))],
    );
    let ab = conflict_days(&a, &b);
    let ba = conflict_days(&b, &a);
    assert_eq!(ab, ba);
    assert_eq!(ab, vec![Weekday::Wed, Weekday::Fri]);
}

#[test]
fn untimed_meetings_never_conflict() {
    let untimed = Meeting {
        room: None,
        days: paper_core::domain::Weekdays::of(&[Weekday::Mon]),
        start: None,
        end: None,
    };
    let a = section("1-1-20", "MATH", vec![untimed]);
    let b = section("2-1-20", "MATH", vec![meeting(None, &[Weekday::Mon], (0, 0), (23, 59))]);
    assert!(conflict_days(&a, &b).is_empty());
}

#[test]
fn add_and_remove_sections() {
    let a = section("1-1-20", "MATH", Vec::new());
    let schedule = Schedule::new().add_section(a.clone()).unwrap();
    assert!(matches!(
        schedule.add_section(a),
        Err(ModelError::Duplicate(_))
    ));

    assert_eq!(
        schedule.remove_section("9-9-99", Removal::Lenient).unwrap(),
        schedule
    );
    assert!(matches!(
        schedule.remove_section("9-9-99", Removal::Strict),
        Err(ModelError::NotFound(_))
    ));
    assert!(schedule
        .remove_section("1-1-20", Removal::Strict)
        .unwrap()
        .is_empty());
}

#[test]
fn blank_section_ids_are_rejected() {
    let blank = section("  ", "MATH", Vec::new());
    assert!(matches!(
        Schedule::new().add_section(blank),
        Err(ModelError::InvalidState(_))
    ));
}

#[test]
fn selection_lists_sorted_ids() {
    let schedule = schedule_of(vec![
        section("3-1-20", "MATH", Vec::new()),
        section("1-1-20", "MATH", Vec::new()),
    ]);
    let selection = schedule.selection(Some("4960".to_string()));
    assert_eq!(selection.section_ids, vec!["1-1-20", "3-1-20"]);
    assert_eq!(selection.term.as_deref(), Some("4960"));
}

#[test]
fn exportable_sections_need_dates_and_times() {
    let mut undated = section("1-1-20", "MATH", vec![meeting(None, &[Weekday::Tue], (9, 0), (10, 0))]);
    undated.start_date = None;
    let untimed = section("2-1-20", "MATH", Vec::new());
    let good = section("3-1-20", "MATH", vec![meeting(None, &[Weekday::Tue], (9, 0), (10, 0))]);
    let schedule = schedule_of(vec![undated, untimed, good]);
    let ids: Vec<String> = schedule
        .exportable_sections()
        .into_iter()
        .map(|s| s.section_id)
        .collect();
    assert_eq!(ids, vec!["3-1-20"]);
}

#[test]
fn location_groups_are_unique_per_coordinate() {
    let mut catalog = FakeCatalog::default();
    catalog.add_room("Tech LR2", 42.05, -87.67);
    catalog.add_room("Tech LR3", 42.05, -87.67);
    catalog.add_room("Annenberg G15", 42.06, -87.68);
    catalog.colors.insert("MATH".to_string(), "bg-blue-400".to_string());

    let a = section(
        "1-1-20",
        "MATH",
        vec![
            meeting(Some("Tech LR2"), &[Weekday::Mon], (9, 0), (9, 50)),
            meeting(Some("Tech LR3"), &[Weekday::Wed], (9, 0), (9, 50)),
        ],
    );
    let b = section(
        "2-1-20",
        "CHEM",
        vec![
            meeting(Some("Annenberg G15"), &[Weekday::Tue], (11, 0), (12, 0)),
            meeting(Some("Nowhere 101"), &[Weekday::Thu], (11, 0), (12, 0)),
        ],
    );
    let c = section(
        "3-1-20",
        "CHEM",
        vec![meeting(Some("Tech LR2"), &[Weekday::Fri], (13, 0), (14, 0))],
    );
    let schedule = schedule_of(vec![a, b, c]);
    let groups = group_locations(&schedule, &catalog);

    assert_eq!(groups.len(), 2);
    for (i, g) in groups.iter().enumerate() {
        assert!(groups[i + 1..].iter().all(|o| o.coordinates != g.coordinates));
    }
    let tech = &groups[0];
    assert_eq!(tech.section_ids, vec!["1-1-20", "3-1-20"]);
    assert_eq!(tech.color.as_deref(), Some("bg-blue-400"));

    // A section with two resolved rooms appears in at most two groups.
    for s in schedule.sections() {
        let appearances = groups
            .iter()
            .filter(|g| g.section_ids.contains(&s.section_id))
            .count();
        assert!(appearances <= s.rooms().count());
    }
}

#[test]
fn room_links_and_component_names() {
    let mut catalog = FakeCatalog::default();
    catalog.add_room("Tech LR2", 42.05, -87.67);
    assert_eq!(
        room_finder_link(&catalog, "Tech LR2").as_deref(),
        Some("https://rooms.example.edu/Tech LR2")
    );
    assert!(room_finder_link(&catalog, "Nowhere").is_none());
    assert_eq!(component_name("DIS"), "discussion");
    assert_eq!(component_name("XYZ"), "xyz");
}
