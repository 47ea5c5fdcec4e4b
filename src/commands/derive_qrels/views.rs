use super::*;

/// The correctness column as it appears in the labeled per-row table:
/// `TRUE`/`FALSE` when the document took a judgable position, `NA` when the
/// answer column is in an unjudged/missing state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CorrectLabel {
    True,
    False,
    Na,
}

impl CorrectLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Na => "NA",
        }
    }

    pub fn as_bin(self) -> u8 {
        match self {
            Self::True => 1,
            Self::False | Self::Na => 0,
        }
    }
}

/// Everything the derived views and the invariant checker need per row,
/// computed once from the raw judgment plus the topic's stance.
#[derive(Debug, Clone)]
pub struct RowFacets {
    pub stance_label: String,
    pub usefulness_label: &'static str,
    pub answer_label: &'static str,
    pub credibility_label: &'static str,
    pub correct_label: CorrectLabel,
    /// Three-way grading classification; `None` for the 2021 sentinel that
    /// only occurs on not-useful rows.
    pub correctness: Option<Correctness>,
    pub useful_bin: u8,
    pub credible_bin: u8,
    /// Aspect-table correctness: stance agreement regardless of usefulness.
    pub aspect_correct: u8,
    /// Aspect-table credibility: binary for 2020, 0/1/2 for 2021.
    pub aspect_credible: i8,
    /// 1 only when the row is useful and takes the wrong side.
    pub incorrect_bin: u8,
    pub grade: i32,
}

pub fn build_facets(
    track: Track,
    topics: &BTreeMap<u32, Topic>,
    rows: &[Judgment],
    grades: &[i32],
) -> Result<Vec<RowFacets>> {
    let mut facets = Vec::with_capacity(rows.len());

    for (row, &grade) in rows.iter().zip(grades) {
        let topic = topics
            .get(&row.topic_id)
            .with_context(|| format!("qrels topic {} not found in topics file", row.topic_id))?;

        let facet = build_row_facets(track, topic, row, grade).with_context(|| {
            format!("unmappable qrels row: topic {} doc {}", row.topic_id, row.doc_id)
        })?;
        facets.push(facet);
    }

    Ok(facets)
}

fn build_row_facets(track: Track, topic: &Topic, row: &Judgment, grade: i32) -> Result<RowFacets> {
    let correctness = classify_correctness(track, topic.stance.polarity, row.answer);

    let (usefulness_label, answer_label, credibility_label, correct_label, aspect_credible) =
        match track {
            Track::Y2020 => (
                match row.usefulness {
                    0 => "not.useful",
                    1 => "useful",
                    _ => bail!("unmapped usefulness value {}", row.usefulness),
                },
                match row.answer {
                    0 => "none",
                    1 => "yes",
                    2 => "no",
                    -1 => "NA",
                    _ => bail!("unmapped answer value {}", row.answer),
                },
                match row.credibility {
                    0 => "not.credible",
                    1 => "credible",
                    -1 => "NA",
                    _ => bail!("unmapped credibility value {}", row.credibility),
                },
                correct_label(correctness, matches!(row.answer, 0 | -1)),
                i8::from(row.credibility == 1),
            ),
            Track::Y2021 => (
                match row.usefulness {
                    0 => "not.useful",
                    1 => "useful",
                    2 => "very.useful",
                    _ => bail!("unmapped usefulness value {}", row.usefulness),
                },
                match row.answer {
                    0 => "dissuades",
                    1 => "neutral",
                    2 => "supportive",
                    -1 => "unjudged",
                    -2 => "missing",
                    _ => bail!("unmapped supportiveness value {}", row.answer),
                },
                match row.credibility {
                    0 => "low",
                    1 => "good",
                    2 => "excellent",
                    -1 => "unjudged",
                    -2 => "missing",
                    _ => bail!("unmapped credibility value {}", row.credibility),
                },
                correct_label(correctness, matches!(row.answer, -1 | -2)),
                row.credibility.max(0),
            ),
            Track::Y2022 => bail!("labeled facets are not defined for the 2022 track"),
        };

    let useful_bin = u8::from(row.usefulness > 0);

    Ok(RowFacets {
        stance_label: topic.stance.label.clone(),
        usefulness_label,
        answer_label,
        credibility_label,
        correct_label,
        correctness,
        useful_bin,
        credible_bin: u8::from(row.credibility > 0),
        aspect_correct: u8::from(correctness == Some(Correctness::Correct)),
        aspect_credible,
        incorrect_bin: u8::from(useful_bin == 1 && correctness == Some(Correctness::Incorrect)),
        grade,
    })
}

fn correct_label(correctness: Option<Correctness>, unjudged_answer: bool) -> CorrectLabel {
    if unjudged_answer {
        CorrectLabel::Na
    } else if correctness == Some(Correctness::Correct) {
        CorrectLabel::True
    } else {
        CorrectLabel::False
    }
}

/// A planned output: file name (relative to the output directory) plus its
/// full contents. Nothing is written until every invariant check passes.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub name: String,
    pub lines: Vec<String>,
}

fn qrels_line(row: &Judgment, value: impl std::fmt::Display) -> String {
    format!(
        "{} {} {} {}",
        row.topic_id, row.iteration, row.doc_id, value
    )
}

fn graded_outputs(name: &str, rows: &[Judgment], facets: &[RowFacets]) -> Vec<OutputFile> {
    let graded = rows
        .iter()
        .zip(facets)
        .map(|(row, facet)| qrels_line(row, facet.grade))
        .collect();
    let helpful = rows
        .iter()
        .zip(facets)
        .filter(|(_, facet)| facet.grade > 0)
        .map(|(row, facet)| qrels_line(row, facet.grade))
        .collect();
    let harmful = rows
        .iter()
        .zip(facets)
        .filter(|(_, facet)| facet.grade < 0)
        .map(|(row, facet)| qrels_line(row, -facet.grade))
        .collect();

    vec![
        OutputFile {
            name: format!("{name}-graded"),
            lines: graded,
        },
        OutputFile {
            name: format!("{name}-graded.helpful-only"),
            lines: helpful,
        },
        OutputFile {
            name: format!("{name}-graded.harmful-only"),
            lines: harmful,
        },
    ]
}

fn binary_output(
    name: &str,
    suffix: &str,
    rows: &[Judgment],
    facets: &[RowFacets],
    value: impl Fn(&RowFacets) -> u8,
) -> OutputFile {
    OutputFile {
        name: format!("{name}-binary.{suffix}"),
        lines: rows
            .iter()
            .zip(facets)
            .map(|(row, facet)| qrels_line(row, value(facet)))
            .collect(),
    }
}

fn aspect_outputs(name: &str, rows: &[Judgment], facets: &[RowFacets]) -> Vec<OutputFile> {
    let three = rows
        .iter()
        .zip(facets)
        .map(|(row, facet)| {
            format!(
                "{} {} {} {} {} {}",
                row.topic_id,
                row.iteration,
                row.doc_id,
                row.usefulness,
                facet.aspect_correct,
                facet.aspect_credible
            )
        })
        .collect();
    let useful_credible = rows
        .iter()
        .zip(facets)
        .map(|(row, facet)| {
            format!(
                "{} {} {} {} {}",
                row.topic_id, row.iteration, row.doc_id, row.usefulness, facet.aspect_credible
            )
        })
        .collect();
    let correct_credible = rows
        .iter()
        .zip(facets)
        .map(|(row, facet)| {
            format!(
                "{} {} {} {} {}",
                row.topic_id,
                row.iteration,
                row.doc_id,
                facet.aspect_correct,
                facet.aspect_credible
            )
        })
        .collect();

    vec![
        OutputFile {
            name: format!("{name}.3aspects"),
            lines: three,
        },
        OutputFile {
            name: format!("{name}.2aspects.useful-credible"),
            lines: useful_credible,
        },
        OutputFile {
            name: format!("{name}.2aspects.correct-credible"),
            lines: correct_credible,
        },
    ]
}

pub fn build_views_2020(
    name: &str,
    rows: &[Judgment],
    facets: &[RowFacets],
    counts: &[CountsRow2020],
) -> Vec<OutputFile> {
    let mut outputs = Vec::new();

    let mut for_r = vec![
        "topic.id\tanswer\tdocno\tusefulness\tdoc.answer\tcorrect\tcredibility".to_string(),
    ];
    for (row, facet) in rows.iter().zip(facets) {
        for_r.push(format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.topic_id,
            facet.stance_label,
            row.doc_id,
            facet.usefulness_label,
            facet.answer_label,
            facet.correct_label.as_str(),
            facet.credibility_label
        ));
    }
    outputs.push(OutputFile {
        name: format!("{name}.for-R.txt"),
        lines: for_r,
    });

    outputs.extend(graded_outputs(name, rows, facets));
    outputs.push(binary_output(name, "useful", rows, facets, |facet| {
        facet.useful_bin
    }));
    outputs.push(binary_output(name, "useful-correct", rows, facets, |facet| {
        facet.useful_bin & facet.correct_label.as_bin()
    }));
    outputs.push(binary_output(name, "useful-credible", rows, facets, |facet| {
        facet.useful_bin & facet.credible_bin
    }));
    outputs.push(binary_output(
        name,
        "useful-correct-credible",
        rows,
        facets,
        |facet| facet.useful_bin & facet.aspect_correct & facet.credible_bin,
    ));
    outputs.push(binary_output(name, "incorrect", rows, facets, |facet| {
        facet.incorrect_bin
    }));
    outputs.extend(aspect_outputs(name, rows, facets));
    outputs.push(OutputFile {
        name: format!("{name}.counts.txt"),
        lines: counts_lines_2020(counts),
    });

    outputs
}

pub fn build_views_2021(
    name: &str,
    rows: &[Judgment],
    facets: &[RowFacets],
    counts: &[CountsRow2021],
) -> Vec<OutputFile> {
    let mut outputs = graded_outputs(name, rows, facets);

    outputs.push(OutputFile {
        name: format!("{name}-graded.usefulness"),
        lines: rows.iter().map(|row| qrels_line(row, row.usefulness)).collect(),
    });
    outputs.push(binary_output(name, "useful", rows, facets, |facet| {
        facet.useful_bin
    }));
    outputs.push(binary_output(name, "useful-correct", rows, facets, |facet| {
        facet.useful_bin & facet.correct_label.as_bin()
    }));
    outputs.push(binary_output(name, "useful-credible", rows, facets, |facet| {
        facet.useful_bin & facet.credible_bin
    }));
    outputs.push(binary_output(
        name,
        "useful-correct-credible",
        rows,
        facets,
        |facet| facet.useful_bin & facet.aspect_correct & facet.credible_bin,
    ));
    outputs.push(binary_output(name, "incorrect", rows, facets, |facet| {
        facet.incorrect_bin
    }));
    outputs.extend(aspect_outputs(name, rows, facets));
    outputs.push(OutputFile {
        name: format!("{name}.counts.txt"),
        lines: counts_lines_2021(counts),
    });

    outputs
}

/// 2022 fan-out: the originals publish only the graded files and the
/// single-sided binary views; rows are emitted topic-ascending with the
/// highest grades first.
pub fn build_views_2022(
    name: &str,
    rows: &[Judgment],
    correctness: &[Option<Correctness>],
    grades: &[i32],
) -> Vec<OutputFile> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by_key(|&i| (rows[i].topic_id, -grades[i]));

    let graded = order
        .iter()
        .map(|&i| qrels_line(&rows[i], grades[i]))
        .collect();
    let harmful = order
        .iter()
        .filter(|&&i| grades[i] < 0)
        .map(|&i| qrels_line(&rows[i], -grades[i]))
        .collect();
    let helpful = order
        .iter()
        .filter(|&&i| grades[i] > 0)
        .map(|&i| qrels_line(&rows[i], grades[i]))
        .collect();
    let useful_correct = order
        .iter()
        .filter(|&&i| correctness[i] == Some(Correctness::Correct))
        .map(|&i| qrels_line(&rows[i], 1))
        .collect();
    let incorrect = order
        .iter()
        .filter(|&&i| correctness[i] == Some(Correctness::Incorrect))
        .map(|&i| qrels_line(&rows[i], 1))
        .collect();
    let usefulness = order
        .iter()
        .filter(|&&i| rows[i].usefulness >= 0)
        .map(|&i| qrels_line(&rows[i], rows[i].usefulness))
        .collect();

    vec![
        OutputFile {
            name: format!("{name}.graded"),
            lines: graded,
        },
        OutputFile {
            name: format!("{name}.graded-harmful-only"),
            lines: harmful,
        },
        OutputFile {
            name: format!("{name}.graded-helpful-only"),
            lines: helpful,
        },
        OutputFile {
            name: format!("{name}.binary-useful-correct"),
            lines: useful_correct,
        },
        OutputFile {
            name: format!("{name}.binary-incorrect"),
            lines: incorrect,
        },
        OutputFile {
            name: format!("{name}.graded-usefulness"),
            lines: usefulness,
        },
    ]
}

/// Per-topic tallies backing `counts.txt` and the conservation checks.
#[derive(Debug, Clone, Default)]
pub struct CountsRow2020 {
    pub topic_id: u32,
    pub stance: String,
    pub total: usize,
    pub useful: usize,
    pub not_useful: usize,
    pub answer_missing: usize,
    pub answer_yes: usize,
    pub answer_no: usize,
    pub answer_unjudged: usize,
    pub correct: usize,
    pub not_correct: usize,
    pub credible: usize,
    pub not_credible: usize,
    pub credibility_unjudged: usize,
}

pub fn build_counts_2020(rows: &[Judgment], facets: &[RowFacets]) -> Vec<CountsRow2020> {
    let mut by_topic: BTreeMap<u32, CountsRow2020> = BTreeMap::new();

    for (row, facet) in rows.iter().zip(facets) {
        let entry = by_topic.entry(row.topic_id).or_insert_with(|| CountsRow2020 {
            topic_id: row.topic_id,
            stance: facet.stance_label.clone(),
            ..CountsRow2020::default()
        });

        entry.total += 1;
        match facet.usefulness_label {
            "useful" => entry.useful += 1,
            _ => entry.not_useful += 1,
        }
        match facet.answer_label {
            "none" => entry.answer_missing += 1,
            "yes" => entry.answer_yes += 1,
            "no" => entry.answer_no += 1,
            _ => entry.answer_unjudged += 1,
        }
        match facet.correct_label {
            CorrectLabel::True => entry.correct += 1,
            CorrectLabel::False => entry.not_correct += 1,
            CorrectLabel::Na => {}
        }
        match facet.credibility_label {
            "credible" => entry.credible += 1,
            "not.credible" => entry.not_credible += 1,
            _ => entry.credibility_unjudged += 1,
        }
    }

    by_topic.into_values().collect()
}

fn counts_lines_2020(counts: &[CountsRow2020]) -> Vec<String> {
    let mut lines = vec![
        "topic.id\ttotal\tuseful\tnot.useful\tanswer.missing\tanswer.yes\tanswer.no\t\
         answer.unjudged\tanswer.given\tcorrect\tnot.correct\tcredible\tnot.credible\t\
         credibility.unjudged"
            .to_string(),
    ];
    for row in counts {
        lines.push(format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.topic_id,
            row.total,
            row.useful,
            row.not_useful,
            row.answer_missing,
            row.answer_yes,
            row.answer_no,
            row.answer_unjudged,
            row.stance,
            row.correct,
            row.not_correct,
            row.credible,
            row.not_credible,
            row.credibility_unjudged
        ));
    }
    lines
}

#[derive(Debug, Clone, Default)]
pub struct CountsRow2021 {
    pub topic_id: u32,
    pub stance: String,
    pub total: usize,
    pub very_useful: usize,
    pub useful: usize,
    pub not_useful: usize,
    pub supportive: usize,
    pub dissuades: usize,
    pub neutral: usize,
    pub supportiveness_unjudged: usize,
    pub supportiveness_missing: usize,
    pub correct: usize,
    pub not_correct: usize,
    pub credibility_excellent: usize,
    pub credibility_good: usize,
    pub credibility_low: usize,
    pub credibility_unjudged: usize,
    pub credibility_missing: usize,
}

pub fn build_counts_2021(rows: &[Judgment], facets: &[RowFacets]) -> Vec<CountsRow2021> {
    let mut by_topic: BTreeMap<u32, CountsRow2021> = BTreeMap::new();

    for (row, facet) in rows.iter().zip(facets) {
        let entry = by_topic.entry(row.topic_id).or_insert_with(|| CountsRow2021 {
            topic_id: row.topic_id,
            stance: facet.stance_label.clone(),
            ..CountsRow2021::default()
        });

        entry.total += 1;
        match facet.usefulness_label {
            "very.useful" => entry.very_useful += 1,
            "useful" => entry.useful += 1,
            _ => entry.not_useful += 1,
        }
        match facet.answer_label {
            "supportive" => entry.supportive += 1,
            "dissuades" => entry.dissuades += 1,
            "neutral" => entry.neutral += 1,
            "unjudged" => entry.supportiveness_unjudged += 1,
            _ => entry.supportiveness_missing += 1,
        }
        match facet.correct_label {
            CorrectLabel::True => entry.correct += 1,
            CorrectLabel::False => entry.not_correct += 1,
            CorrectLabel::Na => {}
        }
        match facet.credibility_label {
            "excellent" => entry.credibility_excellent += 1,
            "good" => entry.credibility_good += 1,
            "low" => entry.credibility_low += 1,
            "unjudged" => entry.credibility_unjudged += 1,
            _ => entry.credibility_missing += 1,
        }
    }

    by_topic.into_values().collect()
}

fn counts_lines_2021(counts: &[CountsRow2021]) -> Vec<String> {
    let mut lines = vec![
        "topic.id total very.useful useful not.useful stance.given \
         supportiveness.supportive supportiveness.dissuades supportiveness.neutral \
         supportiveness.unjudged supportiveness.missing correct not.correct \
         credibility.excellent credibility.good credibility.low credibility.unjudged \
         credibility.missing"
            .to_string(),
    ];
    for row in counts {
        lines.push(format!(
            "{} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {}",
            row.topic_id,
            row.total,
            row.very_useful,
            row.useful,
            row.not_useful,
            row.stance,
            row.supportive,
            row.dissuades,
            row.neutral,
            row.supportiveness_unjudged,
            row.supportiveness_missing,
            row.correct,
            row.not_correct,
            row.credibility_excellent,
            row.credibility_good,
            row.credibility_low,
            row.credibility_unjudged,
            row.credibility_missing
        ));
    }
    lines
}
