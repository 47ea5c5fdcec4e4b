use super::*;

use super::views::{CorrectLabel, CountsRow2020, CountsRow2021, OutputFile, RowFacets};

/// Row-level identities that must hold before any derived file is written.
///
/// A failure here means the qrels data or the derivation logic is broken;
/// the run stops rather than publishing inconsistent views.
pub fn check_row_invariants(track: Track, rows: &[Judgment], facets: &[RowFacets]) -> Result<()> {
    let (judged_answers, judged_credibility): (&[&str], &[&str]) = match track {
        Track::Y2020 => (&["yes", "no", "none"], &["credible", "not.credible"]),
        Track::Y2021 => (
            &["supportive", "dissuades", "neutral"],
            &["low", "good", "excellent"],
        ),
        Track::Y2022 => bail!("row invariants over labels are not defined for the 2022 track"),
    };

    for (row, facet) in rows.iter().zip(facets) {
        let at = |what: &str| {
            format!(
                "invariant violated for topic {} doc {}: {what}",
                row.topic_id, row.doc_id
            )
        };

        if facet.useful_bin == 0 {
            ensure!(
                facet.correct_label != CorrectLabel::True,
                at("not-useful row marked correct")
            );
            ensure!(
                !judged_answers.contains(&facet.answer_label),
                at("not-useful row carries a judged answer")
            );
            ensure!(
                !judged_credibility.contains(&facet.credibility_label),
                at("not-useful row carries a judged credibility")
            );
            ensure!(facet.grade == 0, at("not-useful row graded non-zero"));
        }

        ensure!(
            !(facet.incorrect_bin == 1 && facet.correct_label == CorrectLabel::True),
            at("row is both correct and incorrect")
        );

        // The three-way correctness partition must be total: every useful
        // row is correct, incorrect, or in an unjudged/neutral state.
        if facet.useful_bin == 1 {
            let unjudged = facet.correctness == Some(Correctness::NeutralOrUnjudged);
            ensure!(
                facet.incorrect_bin == 1 || facet.correct_label == CorrectLabel::True || unjudged,
                at("row escapes the correctness partition")
            );
        }

        ensure!(
            facet.useful_bin & facet.correct_label.as_bin()
                == facet.aspect_correct & facet.useful_bin,
            at("useful-correct view disagrees with the aspect table")
        );

        match facet.grade.signum() {
            1 => ensure!(
                facet.correct_label == CorrectLabel::True
                    || facet.correctness == Some(Correctness::NeutralOrUnjudged),
                at("positive grade on a non-correct, non-neutral row")
            ),
            -1 => ensure!(
                facet.correctness == Some(Correctness::Incorrect),
                at("negative grade on a row not judged incorrect")
            ),
            _ => {}
        }
    }

    Ok(())
}

pub fn check_counts_2020(counts: &[CountsRow2020]) -> Result<()> {
    for row in counts {
        let at = |what: &str| format!("count conservation failed for topic {}: {what}", row.topic_id);

        ensure!(
            row.useful + row.not_useful == row.total,
            at("usefulness partition")
        );
        ensure!(
            row.answer_missing + row.answer_yes + row.answer_no + row.answer_unjudged == row.total,
            at("answer partition")
        );
        ensure!(
            row.correct + row.not_correct + row.answer_missing + row.answer_unjudged == row.total,
            at("correctness partition")
        );
        ensure!(
            row.credible + row.not_credible + row.credibility_unjudged == row.total,
            at("credibility partition")
        );
    }

    Ok(())
}

pub fn check_counts_2021(counts: &[CountsRow2021]) -> Result<()> {
    for row in counts {
        let at = |what: &str| format!("count conservation failed for topic {}: {what}", row.topic_id);

        ensure!(
            row.very_useful + row.useful + row.not_useful == row.total,
            at("usefulness partition")
        );
        ensure!(
            row.supportive
                + row.dissuades
                + row.neutral
                + row.supportiveness_unjudged
                + row.supportiveness_missing
                == row.total,
            at("supportiveness partition")
        );
        ensure!(
            row.correct
                + row.not_correct
                + row.supportiveness_missing
                + row.supportiveness_unjudged
                == row.total,
            at("correctness partition")
        );
        ensure!(
            row.credibility_excellent
                + row.credibility_good
                + row.credibility_low
                + row.credibility_unjudged
                + row.credibility_missing
                == row.total,
            at("credibility partition")
        );
    }

    Ok(())
}

/// The two 2-aspect files must be exact column slices of the 3-aspect
/// file. Verified over the rendered lines so the check covers what is
/// actually written, not an intermediate representation.
pub fn check_projection_consistency(name: &str, outputs: &[OutputFile]) -> Result<()> {
    let lines = |suffix: &str| -> Result<&[String]> {
        outputs
            .iter()
            .find(|output| output.name == format!("{name}{suffix}"))
            .map(|output| output.lines.as_slice())
            .with_context(|| format!("missing projection {name}{suffix}"))
    };

    let three = lines(".3aspects")?;
    let useful_credible = lines(".2aspects.useful-credible")?;
    let correct_credible = lines(".2aspects.correct-credible")?;

    ensure!(
        three.len() == useful_credible.len() && three.len() == correct_credible.len(),
        "aspect projections have diverging row counts"
    );

    for ((full, uc), cc) in three.iter().zip(useful_credible).zip(correct_credible) {
        let columns: Vec<&str> = full.split(' ').collect();
        ensure!(columns.len() == 6, "malformed 3-aspect row: {full}");

        let expect_uc = format!(
            "{} {} {} {} {}",
            columns[0], columns[1], columns[2], columns[3], columns[5]
        );
        let expect_cc = format!(
            "{} {} {} {} {}",
            columns[0], columns[1], columns[2], columns[4], columns[5]
        );
        ensure!(
            uc == &expect_uc,
            "useful-credible slice diverges from the aspect table: {uc}"
        );
        ensure!(
            cc == &expect_cc,
            "correct-credible slice diverges from the aspect table: {cc}"
        );
    }

    Ok(())
}

/// 2022 identities: table grades respect not-useful dominance and the sign
/// partition, and every preference override lands strictly above the table
/// range.
pub fn check_2022(
    rows: &[Judgment],
    correctness: &[Option<Correctness>],
    table_grades: &[i32],
    final_grades: &[i32],
) -> Result<()> {
    for (index, row) in rows.iter().enumerate() {
        let at = |what: &str| {
            format!(
                "invariant violated for topic {} doc {}: {what}",
                row.topic_id, row.doc_id
            )
        };

        ensure!(
            correctness[index].is_some(),
            at("row escapes the correctness partition")
        );
        if row.usefulness == 0 {
            ensure!(table_grades[index] == 0, at("not-useful row graded non-zero"));
        }
        match table_grades[index].signum() {
            1 => ensure!(
                matches!(
                    correctness[index],
                    Some(Correctness::Correct | Correctness::NeutralOrUnjudged)
                ),
                at("positive grade on an incorrect row")
            ),
            -1 => ensure!(
                correctness[index] == Some(Correctness::Incorrect),
                at("negative grade on a row not judged incorrect")
            ),
            _ => {}
        }

        let overridden = final_grades[index] != table_grades[index];
        if overridden {
            ensure!(
                final_grades[index] > grading::MAX_TABLE_GRADE_2022,
                at("preference override does not outrank the grading table")
            );
        }
    }

    Ok(())
}
