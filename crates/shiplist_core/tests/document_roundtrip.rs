use chrono::{TimeZone, Utc};
use shiplist_core::{parse_directory, render_directory_at, Directory, ProjectEntry};

fn entry(name: &str, url: &str, member: &str, description: &str, links: &str) -> ProjectEntry {
    ProjectEntry {
        name: name.to_string(),
        url: url.to_string(),
        member: member.to_string(),
        description: description.to_string(),
        links: links.to_string(),
    }
}

fn sample_directory() -> Directory {
    let mut directory = Directory::default();
    directory.products_and_tools = vec![
        entry(
            "Budget Buddy",
            "https://budget.example",
            "@carol",
            "Tracks family spending",
            "[Post](https://x/t/4/2)",
        ),
        entry("atlas", "", "@bob", "Map generator", ""),
    ];
    directory.active_experiments = vec![entry(
        "Recipe Bot",
        "",
        "@alice",
        "Suggests dinner from pantry photos",
        "[Post](https://x/t/7/1), [Post](https://x/t/7/9)",
    )];
    directory.explorations = vec![entry("Foo", "", "@alice", "A tool", "")];
    directory
}

#[test]
fn parse_of_render_reproduces_the_directory() {
    let rendered_at = Utc.with_ymd_and_hms(2026, 8, 23, 9, 30, 0).unwrap();
    let mut directory = sample_directory();
    // Render sorts per tier; start from sorted state so equality is exact.
    for tier in shiplist_core::Tier::ALL {
        directory
            .entries_mut(tier)
            .sort_by_key(|entry| entry.name.to_lowercase());
    }

    let text = render_directory_at(&directory, rendered_at);
    let reparsed = parse_directory(&text);
    assert_eq!(reparsed, directory);
}

#[test]
fn render_parse_render_is_byte_stable() {
    let rendered_at = Utc.with_ymd_and_hms(2026, 8, 23, 9, 30, 0).unwrap();
    let first = render_directory_at(&sample_directory(), rendered_at);
    let second = render_directory_at(&parse_directory(&first), rendered_at);
    assert_eq!(first, second);
}

#[test]
fn timestamp_trailer_is_not_part_of_parsed_state() {
    let directory = sample_directory();
    let early = render_directory_at(&directory, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let late = render_directory_at(&directory, Utc.with_ymd_and_hms(2026, 8, 23, 9, 30, 0).unwrap());
    assert_ne!(early, late);
    assert_eq!(parse_directory(&early), parse_directory(&late));
}

#[test]
fn human_edits_outside_the_grammar_survive_a_parse_without_errors() {
    let rendered_at = Utc.with_ymd_and_hms(2026, 8, 23, 9, 30, 0).unwrap();
    let mut text = render_directory_at(&sample_directory(), rendered_at);
    text.push_str("\n## Notes from the moderators\n\nPlease keep descriptions short.\n");
    text.push_str("| stray | row | outside | recognized | sections |\n");

    let reparsed = parse_directory(&text);
    assert_eq!(reparsed, parse_directory(&render_directory_at(&sample_directory(), rendered_at)));
}
