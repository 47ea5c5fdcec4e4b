use super::*;

/// Highest grade any 2022 table rule can produce; preference-derived grades
/// start one above it so they always outrank heuristic ones.
pub const MAX_TABLE_GRADE_2022: i32 = 4;

/// Three-way classification of a row's raw answer column against the
/// topic's declared polarity.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Correctness {
    Correct,
    Incorrect,
    NeutralOrUnjudged,
}

/// Classifies correctness for a judged row.
///
/// Returns `None` for values that have no class at all (for example the
/// 2021 `-1` sentinel, which is only legal on not-useful rows); the grading
/// table treats that as an unmapped combination and fails.
pub fn classify_correctness(
    track: Track,
    polarity: Polarity,
    answer: i8,
) -> Option<Correctness> {
    match track {
        // Document answer: 1 = yes, 2 = no, 0 = no answer, -1 = unjudged.
        Track::Y2020 => match answer {
            1 => Some(agreement(polarity, Polarity::Positive)),
            2 => Some(agreement(polarity, Polarity::Negative)),
            0 | -1 => Some(Correctness::NeutralOrUnjudged),
            _ => None,
        },
        // Supportiveness: 2 = supportive, 0 = dissuades, 1 = neutral,
        // -2 = missing, -1 = sentinel for rows skipped as not useful.
        Track::Y2021 => match answer {
            2 => Some(agreement(polarity, Polarity::Positive)),
            0 => Some(agreement(polarity, Polarity::Negative)),
            1 | -2 => Some(Correctness::NeutralOrUnjudged),
            _ => None,
        },
        // Judged answer: 1 = yes, 0 = no, 2 = unclear, -1 = unjudged.
        Track::Y2022 => match answer {
            1 => Some(agreement(polarity, Polarity::Positive)),
            0 => Some(agreement(polarity, Polarity::Negative)),
            2 | -1 => Some(Correctness::NeutralOrUnjudged),
            _ => None,
        },
    }
}

fn agreement(topic: Polarity, document: Polarity) -> Correctness {
    if topic == document {
        Correctness::Correct
    } else {
        Correctness::Incorrect
    }
}

/// Applies the track's grading table to one judgment row.
///
/// A row judged not useful grades 0 before any other rule is consulted,
/// even when its other columns carry stray values. Every other combination
/// must be covered by the track table; anything unmapped is a fatal error,
/// never a silent default.
pub fn grade(track: Track, polarity: Polarity, row: &Judgment) -> Result<i32> {
    if row.usefulness == 0 {
        return Ok(0);
    }

    match track {
        Track::Y2020 => grade_2020(polarity, row),
        Track::Y2021 => grade_2021(polarity, row),
        Track::Y2022 => grade_2022(polarity, row),
    }
    .with_context(|| {
        format!(
            "no {} grade defined for topic {} doc {} (usefulness {}, answer {}, credibility {})",
            track.as_str(),
            row.topic_id,
            row.doc_id,
            row.usefulness,
            row.answer,
            row.credibility
        )
    })
}

fn grade_2020(polarity: Polarity, row: &Judgment) -> Result<i32> {
    ensure!(row.usefulness == 1, "usefulness out of range");

    let correctness =
        classify_correctness(Track::Y2020, polarity, row.answer).context("unmapped answer")?;
    let credible = match row.credibility {
        1 => true,
        0 | -1 => false,
        _ => bail!("unmapped credibility"),
    };

    Ok(match (correctness, credible) {
        (Correctness::Correct, true) => 4,
        (Correctness::Correct, false) => 3,
        (Correctness::NeutralOrUnjudged, true) => 2,
        (Correctness::NeutralOrUnjudged, false) => 1,
        (Correctness::Incorrect, false) => -1,
        (Correctness::Incorrect, true) => -2,
    })
}

/// 2021 credibility tiers; `-2` (missing) folds into the low band, while
/// the `-1` sentinel is only legal on not-useful rows and has no tier.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum CredibilityTier {
    Excellent,
    Good,
    LowOrUnjudged,
}

fn grade_2021(polarity: Polarity, row: &Judgment) -> Result<i32> {
    let very_useful = match row.usefulness {
        2 => true,
        1 => false,
        _ => bail!("usefulness out of range"),
    };

    let correctness =
        classify_correctness(Track::Y2021, polarity, row.answer).context("unmapped answer")?;
    let tier = match row.credibility {
        2 => CredibilityTier::Excellent,
        1 => CredibilityTier::Good,
        0 | -2 => CredibilityTier::LowOrUnjudged,
        _ => bail!("unmapped credibility"),
    };

    Ok(match (correctness, very_useful, tier) {
        (Correctness::Correct, true, CredibilityTier::Excellent) => 12,
        (Correctness::Correct, false, CredibilityTier::Excellent) => 11,
        (Correctness::Correct, true, CredibilityTier::Good) => 10,
        (Correctness::Correct, false, CredibilityTier::Good) => 9,
        (Correctness::Correct, true, CredibilityTier::LowOrUnjudged) => 8,
        (Correctness::Correct, false, CredibilityTier::LowOrUnjudged) => 7,
        (Correctness::NeutralOrUnjudged, true, CredibilityTier::Excellent) => 6,
        (Correctness::NeutralOrUnjudged, false, CredibilityTier::Excellent) => 5,
        (Correctness::NeutralOrUnjudged, true, CredibilityTier::Good) => 4,
        (Correctness::NeutralOrUnjudged, false, CredibilityTier::Good) => 3,
        (Correctness::NeutralOrUnjudged, true, CredibilityTier::LowOrUnjudged) => 2,
        (Correctness::NeutralOrUnjudged, false, CredibilityTier::LowOrUnjudged) => 1,
        (Correctness::Incorrect, _, CredibilityTier::Excellent) => -3,
        (Correctness::Incorrect, _, CredibilityTier::Good) => -2,
        (Correctness::Incorrect, _, CredibilityTier::LowOrUnjudged) => -1,
    })
}

fn grade_2022(polarity: Polarity, row: &Judgment) -> Result<i32> {
    let very_useful = match row.usefulness {
        2 => true,
        1 => false,
        _ => bail!("usefulness out of range"),
    };

    let correctness =
        classify_correctness(Track::Y2022, polarity, row.answer).context("unmapped answer")?;

    Ok(match (correctness, very_useful) {
        (Correctness::Correct, true) => 4,
        (Correctness::Correct, false) => 3,
        (Correctness::NeutralOrUnjudged, true) => 2,
        (Correctness::NeutralOrUnjudged, false) => 1,
        (Correctness::Incorrect, true) => -2,
        (Correctness::Incorrect, false) => -1,
    })
}
