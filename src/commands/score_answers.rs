use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use tracing::info;

use crate::cli::{ScoreAnswersArgs, Track};
use crate::model::Polarity;
use crate::topics;

/// One run-file row: a predicted yes/no answer with its yes-probability.
#[derive(Debug, Clone)]
struct Prediction {
    topic_id: u32,
    answer_yes: bool,
    yes_prob: f64,
}

pub fn run(args: ScoreAnswersArgs) -> Result<()> {
    let topics_map = topics::load_topics(&args.topics, Track::Y2022)?;
    let predictions = load_run(&args.run)?;

    info!(
        topics = topics_map.len(),
        predictions = predictions.len(),
        "scoring answer predictions"
    );

    // Predictions are joined on topic id; a prediction for an unknown
    // topic means the run file and topics file do not belong together.
    let mut samples = Vec::with_capacity(predictions.len());
    for prediction in &predictions {
        let topic = topics_map.get(&prediction.topic_id).with_context(|| {
            format!("run topic {} not found in topics file", prediction.topic_id)
        })?;
        let truth_yes = topic.stance.polarity == Polarity::Positive;
        samples.push((prediction.answer_yes, truth_yes, prediction.yes_prob));
    }

    let true_positive = samples.iter().filter(|&&(pred, truth, _)| pred && truth).count();
    let false_positive = samples.iter().filter(|&&(pred, truth, _)| pred && !truth).count();
    let false_negative = samples.iter().filter(|&&(pred, truth, _)| !pred && truth).count();
    let true_negative = samples.iter().filter(|&&(pred, truth, _)| !pred && !truth).count();

    // Rates are undefined when a ground-truth class is empty.
    ensure!(
        true_positive + false_negative > 0,
        "ground truth contains no yes topics"
    );
    ensure!(
        false_positive + true_negative > 0,
        "ground truth contains no no topics"
    );

    let tpr = true_positive as f64 / (true_positive + false_negative) as f64;
    let fpr = false_positive as f64 / (false_positive + true_negative) as f64;
    let accuracy = (true_positive + true_negative) as f64 / samples.len() as f64;

    let roc_samples: Vec<(f64, bool)> = samples
        .iter()
        .map(|&(_, truth, prob)| (prob, truth))
        .collect();
    let auc = roc_auc(&roc_samples)?;

    let run_id = args
        .run
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("run");

    println!("{run_id}\tTPR\t{tpr:.4}");
    println!("{run_id}\tFPR\t{fpr:.4}");
    println!("{run_id}\tAccuracy\t{accuracy:.4}");
    println!("{run_id}\tAUC\t{auc:.4}");

    Ok(())
}

/// Run file columns: topic, predicted answer (yes/no), yes-probability,
/// run name. Whitespace-separated, no header.
fn load_run(path: &Path) -> Result<Vec<Prediction>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let mut predictions = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let parsed = parse_run_line(&fields)
            .with_context(|| format!("{}:{}: malformed run row", path.display(), index + 1))?;
        predictions.push(parsed);
    }

    if predictions.is_empty() {
        bail!("no predictions found in {}", path.display());
    }

    Ok(predictions)
}

fn parse_run_line(fields: &[&str]) -> Result<Prediction> {
    ensure!(fields.len() == 4, "expected 4 columns, found {}", fields.len());

    let topic_id = fields[0]
        .parse::<u32>()
        .with_context(|| format!("invalid topic id: {}", fields[0]))?;
    let answer_yes = match fields[1] {
        "yes" => true,
        "no" => false,
        other => bail!("invalid predicted answer: {other}"),
    };
    let yes_prob = fields[2]
        .parse::<f64>()
        .with_context(|| format!("invalid yes-probability: {}", fields[2]))?;
    ensure!(yes_prob.is_finite(), "yes-probability is not finite");

    Ok(Prediction {
        topic_id,
        answer_yes,
        yes_prob,
    })
}

/// Area under the ROC curve via a threshold sweep over the scores, with
/// trapezoidal interpolation between distinct thresholds. Ties advance the
/// curve diagonally in one step.
fn roc_auc(samples: &[(f64, bool)]) -> Result<f64> {
    let positives = samples.iter().filter(|&&(_, truth)| truth).count();
    let negatives = samples.len() - positives;
    ensure!(positives > 0 && negatives > 0, "ROC is undefined with a single class");

    let mut sorted: Vec<(f64, bool)> = samples.to_vec();
    sorted.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut area = 0.0;
    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    let mut prev_tpr = 0.0;
    let mut prev_fpr = 0.0;

    let mut index = 0;
    while index < sorted.len() {
        let threshold = sorted[index].0;
        while index < sorted.len() && sorted[index].0 == threshold {
            if sorted[index].1 {
                true_positives += 1;
            } else {
                false_positives += 1;
            }
            index += 1;
        }

        let tpr = true_positives as f64 / positives as f64;
        let fpr = false_positives as f64 / negatives as f64;
        area += (fpr - prev_fpr) * (tpr + prev_tpr) / 2.0;
        prev_tpr = tpr;
        prev_fpr = fpr;
    }

    Ok(area)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-9
    }

    #[test]
    fn auc_is_one_for_perfect_separation() {
        let samples = vec![(0.9, true), (0.8, true), (0.3, false), (0.1, false)];
        assert!(close(roc_auc(&samples).unwrap(), 1.0));
    }

    #[test]
    fn auc_is_zero_for_inverted_scores() {
        let samples = vec![(0.9, false), (0.8, false), (0.3, true), (0.1, true)];
        assert!(close(roc_auc(&samples).unwrap(), 0.0));
    }

    #[test]
    fn auc_is_half_when_scores_carry_no_signal() {
        let samples = vec![(0.5, true), (0.5, false), (0.5, true), (0.5, false)];
        assert!(close(roc_auc(&samples).unwrap(), 0.5));
    }

    #[test]
    fn auc_handles_partial_orderings() {
        // One inversion among four samples: 7 of 8 pairs ranked correctly.
        let samples = vec![(0.9, true), (0.7, false), (0.6, true), (0.2, false)];
        // Pairs: (t1,f1) ok, (t1,f2) ok, (t2,f1) inverted, (t2,f2) ok -> 3/4.
        assert!(close(roc_auc(&samples).unwrap(), 0.75));
    }

    #[test]
    fn auc_requires_both_classes() {
        assert!(roc_auc(&[(0.9, true), (0.3, true)]).is_err());
    }

    #[test]
    fn run_lines_parse_and_validate() {
        let prediction = parse_run_line(&["151", "yes", "0.93", "my-run"]).expect("parse");
        assert_eq!(prediction.topic_id, 151);
        assert!(prediction.answer_yes);
        assert!(close(prediction.yes_prob, 0.93));

        assert!(parse_run_line(&["151", "maybe", "0.9", "r"]).is_err());
        assert!(parse_run_line(&["151", "yes", "NaN", "r"]).is_err());
        assert!(parse_run_line(&["151", "yes", "0.9"]).is_err());
    }
}
