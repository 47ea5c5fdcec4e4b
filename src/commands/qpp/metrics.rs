use std::collections::HashSet;

use anyhow::{Result, bail, ensure};
use tracing::warn;

use super::TermStats;
use crate::commands::index::{normalize_term, token_pattern};

/// Splits a query on whitespace. The raw token count is the denominator in
/// every averaged metric, even for tokens that normalize away.
fn query_tokens(query: &str) -> Result<Vec<String>> {
    let tokens: Vec<String> = query.split_whitespace().map(str::to_string).collect();
    if tokens.is_empty() {
        bail!("empty query");
    }
    Ok(tokens)
}

fn looked_up_counts(index: &dyn TermStats, token: &str) -> Result<Option<(u64, u64)>> {
    let Some(normalized) = normalize_term(token_pattern(), token) else {
        return Ok(None);
    };
    index.term_counts(&normalized)
}

/// Inverse document frequency: ln(N / df); 0 for unseen terms.
pub fn idf(index: &dyn TermStats, n: u64, token: &str) -> Result<f64> {
    match looked_up_counts(index, token)? {
        Some((df, _)) if df > 0 => Ok((n as f64 / df as f64).ln()),
        _ => Ok(0.0),
    }
}

/// Collection-query similarity: (1 + ln(cf)) * idf; 0 for unseen terms.
pub fn scq(index: &dyn TermStats, n: u64, token: &str) -> Result<f64> {
    match looked_up_counts(index, token)? {
        Some((df, cf)) if df > 0 => {
            let idf = (n as f64 / df as f64).ln();
            Ok((1.0 + (cf as f64).ln()) * idf)
        }
        _ => Ok(0.0),
    }
}

/// Inverse collection term frequency: ln(N / cf); 0 for unseen terms.
pub fn ictf(index: &dyn TermStats, n: u64, token: &str) -> Result<f64> {
    match looked_up_counts(index, token)? {
        Some((_, cf)) if cf > 0 => Ok((n as f64 / cf as f64).ln()),
        _ => Ok(0.0),
    }
}

fn averaged(
    index: &dyn TermStats,
    n: u64,
    query: &str,
    per_term: fn(&dyn TermStats, u64, &str) -> Result<f64>,
) -> Result<f64> {
    let tokens = query_tokens(query)?;
    let mut sum = 0.0;
    for token in &tokens {
        sum += per_term(index, n, token)?;
    }
    Ok(sum / tokens.len() as f64)
}

fn maximized(
    index: &dyn TermStats,
    n: u64,
    query: &str,
    per_term: fn(&dyn TermStats, u64, &str) -> Result<f64>,
) -> Result<f64> {
    let tokens = query_tokens(query)?;
    let mut max = f64::NEG_INFINITY;
    for token in &tokens {
        max = max.max(per_term(index, n, token)?);
    }
    Ok(max)
}

pub fn avg_idf(index: &dyn TermStats, n: u64, query: &str) -> Result<f64> {
    averaged(index, n, query, idf)
}

pub fn max_idf(index: &dyn TermStats, n: u64, query: &str) -> Result<f64> {
    maximized(index, n, query, idf)
}

pub fn avg_scq(index: &dyn TermStats, n: u64, query: &str) -> Result<f64> {
    averaged(index, n, query, scq)
}

pub fn max_scq(index: &dyn TermStats, n: u64, query: &str) -> Result<f64> {
    maximized(index, n, query, scq)
}

pub fn avg_ictf(index: &dyn TermStats, n: u64, query: &str) -> Result<f64> {
    averaged(index, n, query, ictf)
}

/// Simplified clarity score: ln(1 / |q|) + avgICTF.
pub fn scs(index: &dyn TermStats, n: u64, query: &str) -> Result<f64> {
    let tokens = query_tokens(query)?;
    let distinct: HashSet<&str> = tokens.iter().map(String::as_str).collect();
    if distinct.len() != tokens.len() {
        warn!(query, "repeated terms in query");
    }

    Ok((1.0 / tokens.len() as f64).ln() + avg_ictf(index, n, query)?)
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarScores {
    /// Sum of per-term weight deviations.
    pub sigma_1: f64,
    /// sigma_1 normalized by the number of terms that produced a value.
    pub sigma_2: f64,
    /// Largest single-term deviation.
    pub sigma_3: f64,
    pub postings_lens: Vec<usize>,
}

/// Weighting-model variance over the query terms.
///
/// Terms that normalize away or are absent from the index are dropped from
/// the aggregate; a term whose postings cannot be read is warned about and
/// skipped rather than failing the whole query.
pub fn var(index: &dyn TermStats, n: u64, query: &str) -> Result<VarScores> {
    let tokens = query_tokens(query)?;

    let mut sigmas = Vec::new();
    let mut postings_lens = Vec::new();
    let mut failures = Vec::new();

    for token in &tokens {
        let Some(normalized) = normalize_term(token_pattern(), token) else {
            continue;
        };
        let Some((df, _)) = index.term_counts(&normalized)? else {
            continue;
        };
        if df == 0 {
            continue;
        }

        match sigma_for_term(index, n, &normalized, df) {
            Ok((sigma, postings_len)) => {
                sigmas.push(sigma);
                postings_lens.push(postings_len);
            }
            Err(err) => {
                warn!(term = %token, error = %err, "failed to compute term deviation");
                failures.push(token.clone());
            }
        }
    }

    if !failures.is_empty() {
        warn!(count = failures.len(), terms = ?failures, "terms dropped from variance aggregate");
    }
    if sigmas.is_empty() {
        bail!("no query term has index statistics");
    }

    let sigma_1: f64 = sigmas.iter().sum();
    let sigma_2 = sigma_1 / sigmas.len() as f64;
    let sigma_3 = sigmas.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(VarScores {
        sigma_1,
        sigma_2,
        sigma_3,
        postings_lens,
    })
}

fn sigma_for_term(index: &dyn TermStats, n: u64, term: &str, df: u64) -> Result<(f64, usize)> {
    let postings = index.postings(term)?;
    ensure!(!postings.is_empty(), "term has df > 0 but no postings");

    let mut weights = Vec::with_capacity(postings.len());
    for tf in &postings {
        ensure!(*tf > 0, "posting with zero term frequency");
        let weight = 1.0 + (*tf as f64).ln() * (1.0 + n as f64 / df as f64).ln();
        weights.push(weight);
    }

    let mean = weights.iter().sum::<f64>() / weights.len() as f64;
    let deviation_sum: f64 = weights.iter().map(|w| (w - mean) * (w - mean)).sum();
    let sigma = (deviation_sum / df as f64).sqrt();

    Ok((sigma, postings.len()))
}
