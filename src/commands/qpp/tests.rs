use std::collections::HashMap;

use super::*;
use super::metrics::*;

struct FakeIndex {
    terms: HashMap<String, (u64, u64)>,
    postings: HashMap<String, Vec<u64>>,
}

impl FakeIndex {
    fn new(terms: &[(&str, u64, u64)]) -> Self {
        Self {
            terms: terms
                .iter()
                .map(|&(term, df, cf)| (term.to_string(), (df, cf)))
                .collect(),
            postings: HashMap::new(),
        }
    }

    fn with_postings(mut self, term: &str, tfs: &[u64]) -> Self {
        self.postings.insert(term.to_string(), tfs.to_vec());
        self
    }
}

impl TermStats for FakeIndex {
    fn document_count(&self) -> anyhow::Result<u64> {
        Ok(100)
    }

    fn term_counts(&self, term: &str) -> anyhow::Result<Option<(u64, u64)>> {
        Ok(self.terms.get(term).copied())
    }

    fn postings(&self, term: &str) -> anyhow::Result<Vec<u64>> {
        Ok(self.postings.get(term).cloned().unwrap_or_default())
    }
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-6
}

#[test]
fn idf_is_log_of_inverse_document_fraction() {
    let index = FakeIndex::new(&[("vinegar", 10, 25)]);

    let value = idf(&index, 100, "vinegar").unwrap();
    assert!(close(value, (100.0_f64 / 10.0).ln()));

    // Unseen terms contribute zero instead of failing.
    assert!(close(idf(&index, 100, "unknown").unwrap(), 0.0));
    // Punctuation-only tokens normalize away entirely.
    assert!(close(idf(&index, 100, "--").unwrap(), 0.0));
}

#[test]
fn averaged_metrics_divide_by_raw_token_count() {
    let index = FakeIndex::new(&[("vinegar", 10, 25)]);

    // Two tokens, one unseen: the denominator is still 2.
    let value = avg_idf(&index, 100, "vinegar unknown").unwrap();
    assert!(close(value, (100.0_f64 / 10.0).ln() / 2.0));
}

#[test]
fn scq_scales_idf_by_collection_frequency() {
    let index = FakeIndex::new(&[("ice", 4, 20)]);

    let expected = (1.0 + 20.0_f64.ln()) * (100.0_f64 / 4.0).ln();
    assert!(close(scq(&index, 100, "ice").unwrap(), expected));
    assert!(close(max_scq(&index, 100, "ice unknown").unwrap(), expected));
}

#[test]
fn scs_adds_query_length_penalty_to_avg_ictf() {
    let index = FakeIndex::new(&[("ice", 4, 20), ("burn", 2, 10)]);

    let avg = avg_ictf(&index, 100, "ice burn").unwrap();
    let expected = (1.0_f64 / 2.0).ln() + avg;
    assert!(close(scs(&index, 100, "ice burn").unwrap(), expected));
}

#[test]
fn empty_query_is_fatal_for_every_metric() {
    let index = FakeIndex::new(&[]);

    assert!(avg_idf(&index, 100, "   ").is_err());
    assert!(max_idf(&index, 100, "").is_err());
    assert!(scs(&index, 100, "").is_err());
    assert!(var(&index, 100, "").is_err());
}

#[test]
fn var_computes_weight_deviation_over_postings() {
    let index = FakeIndex::new(&[("ice", 2, 5)]).with_postings("ice", &[1, 4]);

    // Weights with N = 100, df = 2: w = 1 + ln(tf) * ln(1 + 50).
    let w1 = 1.0;
    let w2 = 1.0 + 4.0_f64.ln() * 51.0_f64.ln();
    let mean = (w1 + w2) / 2.0;
    let expected = (((w1 - mean).powi(2) + (w2 - mean).powi(2)) / 2.0).sqrt();

    let scores = var(&index, 100, "ice").unwrap();
    assert!(close(scores.sigma_1, expected));
    assert!(close(scores.sigma_2, expected));
    assert!(close(scores.sigma_3, expected));
    assert_eq!(scores.postings_lens, vec![2]);
}

#[test]
fn var_skips_terms_without_statistics() {
    let index = FakeIndex::new(&[("ice", 2, 5)]).with_postings("ice", &[2, 2]);

    let scores = var(&index, 100, "ice unknown").unwrap();
    assert_eq!(scores.postings_lens.len(), 1);
    // Equal term frequencies: zero deviation.
    assert!(close(scores.sigma_1, 0.0));

    assert!(var(&index, 100, "unknown also-unknown").is_err());
}
