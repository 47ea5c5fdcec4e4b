use std::fs;
use std::io::Write;

use super::*;

use super::views::CorrectLabel;

fn judgment(topic_id: u32, doc_id: &str, usefulness: i8, answer: i8, credibility: i8) -> Judgment {
    Judgment {
        topic_id,
        iteration: "0".to_string(),
        doc_id: doc_id.to_string(),
        usefulness,
        answer,
        credibility,
    }
}

fn topic(number: u32, label: &str, polarity: Polarity) -> Topic {
    Topic {
        number,
        title: format!("title {number}"),
        description: format!("question {number}"),
        narrative: String::new(),
        evidence: String::new(),
        disclaimer: None,
        stance: crate::model::Stance {
            label: label.to_string(),
            polarity,
        },
    }
}

fn assert_grid_2021(polarity: Polarity, expected: i32, us: &[i8], ss: &[i8], cs: &[i8]) {
    for &usefulness in us {
        for &supportiveness in ss {
            for &credibility in cs {
                let row = judgment(101, "doc", usefulness, supportiveness, credibility);
                let grade = grade(Track::Y2021, polarity, &row).expect("grade defined");
                assert_eq!(
                    grade, expected,
                    "usefulness {usefulness} supportiveness {supportiveness} credibility {credibility}"
                );
            }
        }
    }
}

#[test]
fn grading_2021_unhelpful_topic_full_grid() {
    let p = Polarity::Negative;
    assert_grid_2021(p, -3, &[1, 2], &[2], &[2]);
    assert_grid_2021(p, -2, &[1, 2], &[2], &[1]);
    assert_grid_2021(p, -1, &[1, 2], &[2], &[-2, 0]);
    assert_grid_2021(p, 0, &[0], &[0, 1, 2], &[-2, 0, 1, 2]);
    assert_grid_2021(p, 1, &[1], &[-2, 1], &[-2, 0]);
    assert_grid_2021(p, 2, &[2], &[-2, 1], &[-2, 0]);
    assert_grid_2021(p, 3, &[1], &[-2, 1], &[1]);
    assert_grid_2021(p, 4, &[2], &[-2, 1], &[1]);
    assert_grid_2021(p, 5, &[1], &[-2, 1], &[2]);
    assert_grid_2021(p, 6, &[2], &[-2, 1], &[2]);
    assert_grid_2021(p, 7, &[1], &[0], &[-2, 0]);
    assert_grid_2021(p, 8, &[2], &[0], &[-2, 0]);
    assert_grid_2021(p, 9, &[1], &[0], &[1]);
    assert_grid_2021(p, 10, &[2], &[0], &[1]);
    assert_grid_2021(p, 11, &[1], &[0], &[2]);
    assert_grid_2021(p, 12, &[2], &[0], &[2]);
}

#[test]
fn grading_2021_helpful_topic_full_grid() {
    let p = Polarity::Positive;
    assert_grid_2021(p, -3, &[1, 2], &[0], &[2]);
    assert_grid_2021(p, -2, &[1, 2], &[0], &[1]);
    assert_grid_2021(p, -1, &[1, 2], &[0], &[-2, 0]);
    assert_grid_2021(p, 0, &[0], &[0, 1, 2], &[-2, 0, 1, 2]);
    assert_grid_2021(p, 1, &[1], &[-2, 1], &[-2, 0]);
    assert_grid_2021(p, 2, &[2], &[-2, 1], &[-2, 0]);
    assert_grid_2021(p, 3, &[1], &[-2, 1], &[1]);
    assert_grid_2021(p, 4, &[2], &[-2, 1], &[1]);
    assert_grid_2021(p, 5, &[1], &[-2, 1], &[2]);
    assert_grid_2021(p, 6, &[2], &[-2, 1], &[2]);
    assert_grid_2021(p, 7, &[1], &[2], &[-2, 0]);
    assert_grid_2021(p, 8, &[2], &[2], &[-2, 0]);
    assert_grid_2021(p, 9, &[1], &[2], &[1]);
    assert_grid_2021(p, 10, &[2], &[2], &[1]);
    assert_grid_2021(p, 11, &[1], &[2], &[2]);
    assert_grid_2021(p, 12, &[2], &[2], &[2]);
}

#[test]
fn grading_2021_is_total_over_the_declared_domain() {
    for usefulness in [0, 1, 2] {
        for supportiveness in [-2, 0, 1, 2] {
            for credibility in [-2, 0, 1, 2] {
                let row = judgment(101, "doc", usefulness, supportiveness, credibility);
                grade(Track::Y2021, Polarity::Positive, &row).expect("grade defined");
                grade(Track::Y2021, Polarity::Negative, &row).expect("grade defined");
            }
        }
    }
}

#[test]
fn grading_2021_rejects_the_unjudged_sentinel_on_useful_rows() {
    let row = judgment(101, "doc", 1, -1, 2);
    assert!(grade(Track::Y2021, Polarity::Positive, &row).is_err());

    let row = judgment(101, "doc", 2, 2, -1);
    assert!(grade(Track::Y2021, Polarity::Positive, &row).is_err());
}

#[test]
fn grading_2021_is_monotone_in_credibility() {
    // Correct rows climb with credibility, incorrect rows sink.
    for usefulness in [1, 2] {
        let mut last_correct = i32::MIN;
        let mut last_incorrect = i32::MAX;
        for credibility in [0, 1, 2] {
            let correct = grade(
                Track::Y2021,
                Polarity::Positive,
                &judgment(101, "doc", usefulness, 2, credibility),
            )
            .unwrap();
            assert!(correct > 0 && correct >= last_correct);
            last_correct = correct;

            let incorrect = grade(
                Track::Y2021,
                Polarity::Positive,
                &judgment(101, "doc", usefulness, 0, credibility),
            )
            .unwrap();
            assert!(incorrect < 0 && incorrect <= last_incorrect);
            last_incorrect = incorrect;
        }
    }
}

#[test]
fn grading_2020_matches_the_published_gain_table() {
    let yes = Polarity::Positive;
    let no = Polarity::Negative;

    // Topic answers "yes": doc answer 1 agrees, 2 disagrees.
    assert_eq!(grade(Track::Y2020, yes, &judgment(1, "d", 1, 1, 1)).unwrap(), 4);
    assert_eq!(grade(Track::Y2020, yes, &judgment(1, "d", 1, 1, 0)).unwrap(), 3);
    assert_eq!(grade(Track::Y2020, yes, &judgment(1, "d", 1, 1, -1)).unwrap(), 3);
    assert_eq!(grade(Track::Y2020, yes, &judgment(1, "d", 1, 0, 1)).unwrap(), 2);
    assert_eq!(grade(Track::Y2020, yes, &judgment(1, "d", 1, -1, 1)).unwrap(), 2);
    assert_eq!(grade(Track::Y2020, yes, &judgment(1, "d", 1, 0, 0)).unwrap(), 1);
    assert_eq!(grade(Track::Y2020, yes, &judgment(1, "d", 1, 2, 0)).unwrap(), -1);
    assert_eq!(grade(Track::Y2020, yes, &judgment(1, "d", 1, 2, 1)).unwrap(), -2);

    // Topic answers "no": the same doc answers flip sign.
    assert_eq!(grade(Track::Y2020, no, &judgment(1, "d", 1, 2, 1)).unwrap(), 4);
    assert_eq!(grade(Track::Y2020, no, &judgment(1, "d", 1, 1, 1)).unwrap(), -2);
}

#[test]
fn grading_not_useful_rows_always_grade_zero() {
    // Stray values in the other columns must not matter.
    for track in [Track::Y2020, Track::Y2021, Track::Y2022] {
        let row = judgment(1, "d", 0, 7, 9);
        assert_eq!(grade(track, Polarity::Positive, &row).unwrap(), 0);
    }
}

#[test]
fn grading_2020_fails_loudly_outside_the_table() {
    // Credibility 2 exists in no 2020 rule.
    let err = grade(Track::Y2020, Polarity::Positive, &judgment(1, "d", 1, 1, 2)).unwrap_err();
    assert!(format!("{err:#}").contains("no 2020 grade defined"));

    assert!(grade(Track::Y2020, Polarity::Positive, &judgment(1, "d", 1, 3, 1)).is_err());
    assert!(grade(Track::Y2020, Polarity::Positive, &judgment(1, "d", 2, 1, 1)).is_err());
}

#[test]
fn grading_2022_table_and_sign_partition() {
    let yes = Polarity::Positive;

    assert_eq!(grade(Track::Y2022, yes, &judgment(1, "d", 2, 1, -1)).unwrap(), 4);
    assert_eq!(grade(Track::Y2022, yes, &judgment(1, "d", 1, 1, -1)).unwrap(), 3);
    assert_eq!(grade(Track::Y2022, yes, &judgment(1, "d", 2, 2, -1)).unwrap(), 2);
    assert_eq!(grade(Track::Y2022, yes, &judgment(1, "d", 1, 2, -1)).unwrap(), 1);
    assert_eq!(grade(Track::Y2022, yes, &judgment(1, "d", 2, -1, -1)).unwrap(), 2);
    assert_eq!(grade(Track::Y2022, yes, &judgment(1, "d", 1, -1, -1)).unwrap(), 1);
    assert_eq!(grade(Track::Y2022, yes, &judgment(1, "d", 0, -1, -1)).unwrap(), 0);
    assert_eq!(grade(Track::Y2022, yes, &judgment(1, "d", 1, 0, -1)).unwrap(), -1);
    assert_eq!(grade(Track::Y2022, yes, &judgment(1, "d", 2, 0, -1)).unwrap(), -2);
}

#[test]
fn preference_override_outranks_every_table_grade() {
    let mut topics = BTreeMap::new();
    topics.insert(151, topic(151, "yes", Polarity::Positive));

    let mut csv_file = tempfile::NamedTempFile::new().expect("temp csv");
    writeln!(csv_file, "Topic ID,Document UUID,Grade").unwrap();
    writeln!(csv_file, "question 151 (Answer is Yes),doc-best,1").unwrap();
    writeln!(csv_file, "question 151 (Answer is Yes),doc-worst,26").unwrap();
    writeln!(csv_file, "unknown topic (Answer is No),doc-x,3").unwrap();

    let prefs = prefs::load_preferences(csv_file.path(), &topics).expect("load prefs");
    assert_eq!(prefs.matched_rows, 2);
    assert_eq!(prefs.unmatched_rows, 1);

    // Rank 1 of 26 with max table grade 4: 26 - 1 + 5 = 30.
    assert_eq!(prefs.override_grade(151, "doc-best"), Some(30));
    assert_eq!(prefs.override_grade(151, "doc-worst"), Some(5));
    assert_eq!(prefs.override_grade(151, "doc-unranked"), None);

    let lowest_override = prefs.override_grade(151, "doc-worst").unwrap();
    assert!(lowest_override > grading::MAX_TABLE_GRADE_2022);
}

#[test]
fn facets_and_views_2020_project_consistently() {
    let mut topics = BTreeMap::new();
    topics.insert(1, topic(1, "yes", Polarity::Positive));

    let rows = vec![
        judgment(1, "doc-a", 1, 1, 1),  // correct, credible
        judgment(1, "doc-b", 1, 2, 0),  // incorrect, not credible
        judgment(1, "doc-c", 1, 0, 1),  // no answer, credible
        judgment(1, "doc-d", 0, -1, -1), // not useful
    ];
    let grades: Vec<i32> = rows
        .iter()
        .map(|row| grade(Track::Y2020, Polarity::Positive, row).unwrap())
        .collect();
    assert_eq!(grades, vec![4, -1, 2, 0]);

    let facets = views::build_facets(Track::Y2020, &topics, &rows, &grades).expect("facets");
    checks::check_row_invariants(Track::Y2020, &rows, &facets).expect("row invariants");

    assert_eq!(facets[0].correct_label, CorrectLabel::True);
    assert_eq!(facets[1].incorrect_bin, 1);
    assert_eq!(facets[2].correct_label, CorrectLabel::Na);
    assert_eq!(facets[3].useful_bin, 0);

    let counts = views::build_counts_2020(&rows, &facets);
    checks::check_counts_2020(&counts).expect("count conservation");
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].total, 4);
    assert_eq!(counts[0].useful, 3);
    assert_eq!(counts[0].correct, 1);
    assert_eq!(counts[0].not_correct, 1);

    let outputs = views::build_views_2020("misinfo-qrels", &rows, &facets, &counts);
    checks::check_projection_consistency("misinfo-qrels", &outputs).expect("projections");

    let find = |name: &str| {
        outputs
            .iter()
            .find(|output| output.name == name)
            .unwrap_or_else(|| panic!("missing output {name}"))
    };

    assert_eq!(
        find("misinfo-qrels-graded").lines,
        vec!["1 0 doc-a 4", "1 0 doc-b -1", "1 0 doc-c 2", "1 0 doc-d 0"]
    );
    assert_eq!(
        find("misinfo-qrels-graded.harmful-only").lines,
        vec!["1 0 doc-b 1"]
    );
    assert_eq!(
        find("misinfo-qrels-binary.useful-correct").lines,
        vec!["1 0 doc-a 1", "1 0 doc-b 0", "1 0 doc-c 0", "1 0 doc-d 0"]
    );
    assert_eq!(
        find("misinfo-qrels.3aspects").lines,
        vec![
            "1 0 doc-a 1 1 1",
            "1 0 doc-b 1 0 0",
            "1 0 doc-c 1 0 1",
            "1 0 doc-d 0 0 0"
        ]
    );
    assert_eq!(
        find("misinfo-qrels.2aspects.correct-credible").lines,
        vec!["1 0 doc-a 1 1", "1 0 doc-b 0 0", "1 0 doc-c 0 1", "1 0 doc-d 0 0"]
    );
}

#[test]
fn row_invariants_reject_judged_columns_on_not_useful_rows() {
    let mut topics = BTreeMap::new();
    topics.insert(1, topic(1, "yes", Polarity::Positive));

    // Not useful, yet judged credible: the source data would be broken.
    let rows = vec![judgment(1, "doc-a", 0, 0, 1)];
    let grades = vec![0];

    let facets = views::build_facets(Track::Y2020, &topics, &rows, &grades).expect("facets");
    let err = checks::check_row_invariants(Track::Y2020, &rows, &facets).unwrap_err();
    assert!(format!("{err:#}").contains("judged credibility"));
}

#[test]
fn derive_run_2021_writes_expected_views() {
    let dir = tempfile::tempdir().expect("tempdir");

    let topics_path = dir.path().join("topics.xml");
    fs::write(
        &topics_path,
        r#"<topics>
  <topic>
    <number>101</number>
    <query>q101</query>
    <description>d101</description>
    <narrative>n</narrative>
    <stance>helpful</stance>
    <evidence>e</evidence>
  </topic>
  <topic>
    <number>113</number>
    <query>q113</query>
    <description>d113</description>
    <narrative>n</narrative>
    <stance>unhelpful</stance>
    <evidence>e</evidence>
  </topic>
</topics>"#,
    )
    .expect("write topics");

    let qrels_path = dir.path().join("qrels.txt");
    fs::write(
        &qrels_path,
        "101 0 doc-a 2 2 2\n101 0 doc-b 1 0 1\n101 0 doc-c 0 -1 -1\n113 0 doc-z 1 0 2\n",
    )
    .expect("write qrels");

    let output = dir.path().join("derived");
    run(DeriveQrelsArgs {
        track: Track::Y2021,
        qrels: qrels_path,
        topics: topics_path,
        prefs: None,
        output: output.clone(),
        name: "misinfo-qrels".to_string(),
        exclude_topics: vec![113],
        manifest_path: Some(dir.path().join("manifest.json")),
    })
    .expect("derive run");

    let graded = fs::read_to_string(output.join("misinfo-qrels-graded")).expect("graded");
    assert_eq!(graded, "101 0 doc-a 12\n101 0 doc-b -2\n101 0 doc-c 0\n");

    let harmful =
        fs::read_to_string(output.join("misinfo-qrels-graded.harmful-only")).expect("harmful");
    assert_eq!(harmful, "101 0 doc-b 2\n");

    let counts = fs::read_to_string(output.join("misinfo-qrels.counts.txt")).expect("counts");
    let mut lines = counts.lines();
    assert!(lines.next().unwrap().starts_with("topic.id total"));
    assert_eq!(
        lines.next().unwrap(),
        "101 3 1 1 1 helpful 1 1 0 1 0 1 1 1 1 0 1 0"
    );

    let manifest = fs::read_to_string(dir.path().join("manifest.json")).expect("manifest");
    assert!(manifest.contains("\"rows_excluded\": 1"));
    assert!(manifest.contains("\"track\": \"2021\""));
}

#[test]
fn derive_run_2022_merges_preference_overrides() {
    let dir = tempfile::tempdir().expect("tempdir");

    let topics_path = dir.path().join("topics.xml");
    fs::write(
        &topics_path,
        r#"<topics>
  <topic>
    <number>151</number>
    <query>q151</query>
    <question>question 151</question>
    <background>b</background>
    <answer>yes</answer>
    <evidence>e</evidence>
  </topic>
</topics>"#,
    )
    .expect("write topics");

    let qrels_path = dir.path().join("qrels.txt");
    fs::write(
        &qrels_path,
        "151 doc-a 2 1\n151 doc-b 1 0\n151 doc-c 0 -1\n",
    )
    .expect("write qrels");

    let prefs_path = dir.path().join("prefs.csv");
    fs::write(
        &prefs_path,
        "Topic ID,Document UUID,Grade\nquestion 151 (Answer is Yes),doc-a,1\nquestion 151 (Answer is Yes),doc-c,2\n",
    )
    .expect("write prefs");

    let output = dir.path().join("derived");
    run(DeriveQrelsArgs {
        track: Track::Y2022,
        qrels: qrels_path,
        topics: topics_path,
        prefs: Some(prefs_path),
        output: output.clone(),
        name: "misinfo-qrels".to_string(),
        exclude_topics: Vec::new(),
        manifest_path: Some(dir.path().join("manifest.json")),
    })
    .expect("derive run");

    // doc-a: rank 1 of max rank 2 -> 2 - 1 + 5 = 6; doc-c: rank 2 -> 5.
    // doc-b keeps its table grade -1. Sorted topic-ascending, grade-descending.
    let graded = fs::read_to_string(output.join("misinfo-qrels.graded")).expect("graded");
    assert_eq!(graded, "151 0 doc-a 6\n151 0 doc-c 5\n151 0 doc-b -1\n");

    let helpful =
        fs::read_to_string(output.join("misinfo-qrels.graded-helpful-only")).expect("helpful");
    assert_eq!(helpful, "151 0 doc-a 6\n151 0 doc-c 5\n");

    let incorrect =
        fs::read_to_string(output.join("misinfo-qrels.binary-incorrect")).expect("incorrect");
    assert_eq!(incorrect, "151 0 doc-b 1\n");

    let manifest = fs::read_to_string(dir.path().join("manifest.json")).expect("manifest");
    assert!(manifest.contains("\"preference_overrides\": 2"));
}
