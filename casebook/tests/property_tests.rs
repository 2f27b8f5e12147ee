//! Property tests for parsing, validation and aggregation.

use std::collections::BTreeSet;

use casebook::{AddOutcome, Aggregator, Schema, parse_document, validate};
use proptest::prelude::*;

/// Unique section labels paired with multi-line prose that contains no markers.
fn arb_sections() -> impl Strategy<Value = Vec<(String, String)>> {
    let label = "[A-Z][a-z]{1,8}( [A-Z][a-z]{1,8})?";
    let paragraph = proptest::collection::vec("[a-z][a-z ,.]{0,40}[a-z.]", 1..4)
        .prop_map(|lines| lines.join("\n"));
    let body = proptest::collection::vec(paragraph, 1..3).prop_map(|ps| ps.join("\n\n"));

    proptest::collection::vec((label, body), 0..6).prop_map(|pairs| {
        let mut seen = BTreeSet::new();
        pairs.into_iter().filter(|(label, _)| seen.insert(label.clone())).collect()
    })
}

fn render(client: &str, title: &str, sections: &[(String, String)]) -> String {
    let mut text = format!("---\ntitle: {title}\nclient: {client}\nindustry: Retail\n---\n\n");
    for (label, content) in sections {
        text.push_str(&format!("## {label}\n\n[START OF SECTION]\n{content}\n[END OF SECTION]\n\n"));
    }
    text
}

/// Parsing keeps every section, in order, and the skeleton re-parses to the
/// same labels and contents.
mod prop_section_round_trip {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn sections_survive_parse_and_skeleton(sections in arb_sections()) {
            let doc = parse_document(&render("Acme", "Study", &sections)).unwrap();
            let parsed: Vec<(String, String)> = doc
                .sections()
                .iter()
                .map(|s| (s.label.clone(), s.content.clone()))
                .collect();
            prop_assert_eq!(&parsed, &sections);

            let again = parse_document(&doc.skeleton()).unwrap();
            let reparsed: Vec<(String, String)> = again
                .sections()
                .iter()
                .map(|s| (s.label.clone(), s.content.clone()))
                .collect();
            prop_assert_eq!(reparsed, parsed);
            prop_assert_eq!(again.frontmatter(), doc.frontmatter());
        }
    }
}

/// Validating the same document twice gives the same violations.
mod prop_validator_idempotent {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn repeat_validation_is_stable(
            title in "[A-Za-z ]{0,12}",
            status in prop_oneof![Just("Ongoing"), Just("Completed"), Just("Paused"), Just("")],
            value in prop_oneof![Just("12"), Just("4.5"), Just("many"), Just(""), Just(".nan")],
            unit in prop_oneof![Just("percent"), Just(""), Just("hours")],
        ) {
            let text = format!(
                "---\ntitle: '{title}'\nproject_status: '{status}'\nmetrics:\n  - {{type: t, value: '{value}', unit: '{unit}'}}\n---\n"
            );
            let doc = parse_document(&text).unwrap();
            let schema = Schema::case_study();
            let first = validate(&doc, &schema);
            prop_assert_eq!(&first, &validate(&doc, &schema));
            prop_assert!(first.iter().any(|v| v.field == "client"));
        }
    }
}

/// Adding identical input twice leaves one logical entry.
mod prop_add_idempotent {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn identical_adds_collapse(
            client in "[A-Z][a-z]{2,10}",
            title in "[A-Z][a-z]{2,10}",
            sections in arb_sections(),
        ) {
            let text = render(&client, &title, &sections);
            let aggregator = Aggregator::default();
            let first = parse_document(&text).unwrap();
            let second = parse_document(&text).unwrap();

            prop_assert_eq!(aggregator.add(&first).unwrap(), AddOutcome::Inserted);
            prop_assert_eq!(aggregator.add(&second).unwrap(), AddOutcome::Unchanged);
            prop_assert_eq!(aggregator.len(), 1);
        }
    }
}
