use super::*;

use super::run::{parse_controversy, parse_passages, parse_score, parse_variants};

#[test]
fn variants_parse_requires_a_json_string_array() {
    let list = parse_variants(r#"["one", "two", "three"]"#, 2).expect("parse");
    assert_eq!(list, vec!["one", "two"]);

    assert!(parse_variants(r#"["only one"]"#, 2).is_err());
    assert!(parse_variants("not json at all", 2).is_err());
    assert!(parse_variants(r#"{"variant": "one"}"#, 1).is_err());
}

#[test]
fn score_parse_requires_an_h_field() {
    let score = parse_score(r#"{"S": 0, "C": 2, "H": 1}"#).expect("parse");
    assert_eq!(score["H"], 1);

    assert!(parse_score(r#"{"S": 0}"#).is_err());
    assert!(parse_score("[1, 2]").is_err());
}

#[test]
fn controversy_parse_switches_shape_on_factors() {
    let factors = parse_controversy("[1, 5, 2, 2, 3]", true).expect("parse");
    assert_eq!(factors.as_array().unwrap().len(), 5);
    assert!(parse_controversy("3", true).is_err());
    assert!(parse_controversy("[]", true).is_err());

    let total = parse_controversy("4", false).expect("parse");
    assert_eq!(total, 4);
    assert!(parse_controversy("[1, 2]", false).is_err());
}

#[test]
fn passages_split_on_the_marker_and_drop_blanks() {
    let passages =
        parse_passages("First passage. ||PAS|| ||PAS||Second passage.||PAS||").expect("parse");
    assert_eq!(passages, vec!["First passage.", "Second passage."]);

    assert!(parse_passages("  ||PAS||  ").is_err());
}

#[test]
fn variant_prompt_carries_role_narrative_and_count() {
    let prompt = prompts::query_variants("can cinnamon cure diabetes", true, Some("looking for treatment evidence"), 2, 7);
    assert!(prompt.starts_with("You are a search engineer"));
    assert!(prompt.contains("a list of 7 alternative queries"));
    assert!(prompt.contains("[can cinnamon cure diabetes]"));
    assert!(prompt.contains("They were looking for: looking for treatment evidence"));
    assert!(prompt.contains("Let's think step by step"));

    let bare = prompts::query_variants("q", false, None, 0, 3);
    assert!(!bare.contains("search engineer"));
    assert!(!bare.contains("step by step"));
    assert!(!bare.contains("looking for"));
}

#[test]
fn evaluation_prompt_example_matches_chain_of_thought_level() {
    let with_aspects = prompts::query_evaluation("q", true, None, 2);
    assert!(with_aspects.contains(r#"{"S": 0, "C": 2, "H": 0}"#));

    let plain = prompts::query_evaluation("q", false, None, 0);
    assert!(plain.contains(r#"{"H": 1}"#));
    assert!(!plain.contains("(S)"));
}

#[test]
fn controversy_prompt_switches_between_single_and_panel_wording() {
    let single = prompts::controversy("q", true, 1, true);
    assert!(single.contains("JSON array of scores for the individual factors"));

    let panel = prompts::controversy("q", true, 5, true);
    assert!(panel.contains("5 different controversy raters"));
}

#[test]
fn narrative_prompts_differ_by_style() {
    let examples = prompts::narrative(crate::cli::NarrativeStyle::Examples, "q");
    assert!(examples.contains("Should I apply ice to a burn?"));

    let trec = prompts::narrative(crate::cli::NarrativeStyle::Trec, "q");
    assert!(trec.contains("standard TREC format"));

    let style = prompts::narrative(crate::cli::NarrativeStyle::Style, "q");
    assert!(style.contains("key terms and concepts"));

    let basic = prompts::narrative(crate::cli::NarrativeStyle::Basic, "q");
    assert!(basic.contains("helpful and harmful documents"));
}
