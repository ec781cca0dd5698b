//! Extraction and substitution over complete template packages

mod helpers;

use std::collections::HashMap;

use docfill::docfill_core::{
    analyze_template, extract_fields, substitute_fields, ContainerOptions, DocfillError,
    FieldKind, SubstitutionOptions,
};
use helpers::{document, document_text, field, paragraph, part, part_names, template};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn values(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn order_template() -> Vec<u8> {
    let body = [
        paragraph(&format!(
            "<w:r><w:t xml:space=\"preserve\">Dodavatel: </w:t></w:r>{}",
            field("MERGEFIELD", "DODAVATEL")
        )),
        format!(
            "<w:tbl><w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
            paragraph(&field("MERGEFIELD", "DODAVATEL")),
            paragraph(&field("DOCVARIABLE", "CENA")),
        ),
    ]
    .concat();
    template(&body)
}

#[test]
fn test_order_template_without_keep_empty() {
    let input = order_template();
    let map = values(&[("DODAVATEL", "ACME s.r.o."), ("CENA", "")]);

    let outcome = substitute_fields(&input, &map, SubstitutionOptions::default()).unwrap();
    assert_eq!(outcome.stats.replaced_count, 3);
    assert_eq!(outcome.stats.skipped_count, 0);
    assert_eq!(outcome.stats.total_fields, 2);

    let text = document_text(&outcome.output);
    assert_eq!(text.matches("ACME s.r.o.").count(), 2);
    assert!(!text.contains("MERGEFIELD"));
    assert!(!text.contains("DOCVARIABLE"));
    assert!(!text.contains("fldChar"));
}

#[test]
fn test_order_template_with_keep_empty() {
    let input = order_template();
    let map = values(&[("DODAVATEL", "ACME s.r.o."), ("CENA", "")]);

    let outcome = substitute_fields(
        &input,
        &map,
        SubstitutionOptions {
            keep_empty_fields: true,
        },
    )
    .unwrap();
    assert_eq!(outcome.stats.replaced_count, 2);
    assert_eq!(outcome.stats.skipped_count, 1);

    let text = document_text(&outcome.output);
    assert!(text.contains(&field("DOCVARIABLE", "CENA")));
    assert!(!text.contains("MERGEFIELD DODAVATEL"));
}

#[test]
fn test_field_missing_from_value_map_is_skipped_when_kept() {
    let input = order_template();
    let map = values(&[("DODAVATEL", "ACME s.r.o.")]);

    let outcome = substitute_fields(
        &input,
        &map,
        SubstitutionOptions {
            keep_empty_fields: true,
        },
    )
    .unwrap();
    assert_eq!(outcome.stats.replaced_count, 2);
    assert_eq!(outcome.stats.skipped_count, 1);
    assert_eq!(outcome.stats.total_fields, 1);

    let text = document_text(&outcome.output);
    assert!(text.contains(&field("DOCVARIABLE", "CENA")));

    let remaining = extract_fields(&outcome.output).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "CENA");
}

#[test]
fn test_full_value_map_leaves_no_fields() {
    let input = order_template();
    let before = extract_fields(&input).unwrap();
    assert_eq!(before.len(), 3);
    assert_eq!(before[2].kind, FieldKind::DocVariable);

    let map = values(&[("DODAVATEL", "ACME"), ("CENA", "1 210,00 Kč")]);
    let outcome = substitute_fields(&input, &map, SubstitutionOptions::default()).unwrap();
    assert!(extract_fields(&outcome.output).unwrap().is_empty());
}

#[test]
fn test_untouched_parts_survive() {
    let input = order_template();
    let map = values(&[("DODAVATEL", "ACME")]);
    let outcome = substitute_fields(&input, &map, SubstitutionOptions::default()).unwrap();

    assert_eq!(part_names(&outcome.output), part_names(&input));
    for name in ["[Content_Types].xml", "word/styles.xml", "word/media/logo.png"] {
        assert_eq!(part(&outcome.output, name), part(&input, name), "{name} changed");
    }
}

#[test]
fn test_values_are_escaped() {
    let input = template(&paragraph(&field("MERGEFIELD", "PREDMET")));
    let map = values(&[("PREDMET", "Toner <HP> & papír")]);
    let outcome = substitute_fields(&input, &map, SubstitutionOptions::default()).unwrap();

    let text = document_text(&outcome.output);
    assert!(text.contains("Toner &lt;HP&gt; &amp; papír"));
}

#[test]
fn test_broken_template_yields_no_output() {
    let input = template("<w:p><w:r></w:p>");
    let result = substitute_fields(&input, &values(&[("A", "b")]), SubstitutionOptions::default());
    assert!(matches!(result, Err(DocfillError::Xml { .. })));
}

#[test]
fn test_analysis_of_order_template() {
    let analysis = analyze_template(&order_template(), &ContainerOptions::default()).unwrap();
    assert_eq!(analysis.names, vec!["DODAVATEL".to_string(), "CENA".to_string()]);
    assert!(analysis.warnings.is_empty());
}

proptest! {
    #[test]
    fn prop_templates_without_fields_are_unchanged(
        texts in proptest::collection::vec("[A-Za-z0-9 .,]{0,24}", 0..6)
    ) {
        let body: String = texts
            .iter()
            .map(|t| paragraph(&format!("<w:r><w:t xml:space=\"preserve\">{t}</w:t></w:r>")))
            .collect();
        let input = template(&body);

        let outcome = substitute_fields(
            &input,
            &values(&[("X", "y")]),
            SubstitutionOptions::default(),
        )
        .unwrap();
        prop_assert_eq!(document_text(&outcome.output), document(&body));
        prop_assert_eq!(outcome.stats.replaced_count, 0);
    }
}
