use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::Utc;
use regex::Regex;
use rusqlite::{Connection, params};
use serde::Deserialize;
use tracing::{info, warn};

use crate::cli::IndexArgs;
use crate::model::{IndexCounts, IndexManifest, IndexPaths};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

const DB_SCHEMA_VERSION: &str = "0.1.0";

/// One corpus document in BEIR JSONL form.
#[derive(Debug, Deserialize)]
struct CorpusDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    text: String,
}

pub fn run(args: IndexArgs) -> Result<()> {
    let started_ts = Utc::now();
    let run_id = format!("index-{}", utc_compact_string(started_ts));

    ensure_directory(&args.cache_root)?;
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join("term_stats.sqlite"));
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        args.cache_root
            .join("manifests")
            .join(format!("term_index_{}.json", utc_compact_string(started_ts)))
    });

    info!(
        corpus = %args.corpus.display(),
        db = %db_path.display(),
        run_id = %run_id,
        "starting term-statistics index build"
    );

    let corpus_sha256 = sha256_file(&args.corpus)?;

    let mut connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    let counts = build_index(&mut connection, &args.corpus)?;

    let mut warnings = Vec::new();
    if counts.empty_documents > 0 {
        warnings.push(format!(
            "{} documents produced no tokens",
            counts.empty_documents
        ));
    }

    let manifest = IndexManifest {
        manifest_version: 1,
        run_id,
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        generated_at: now_utc_string(),
        corpus_sha256,
        paths: IndexPaths {
            cache_root: args.cache_root.display().to_string(),
            corpus_path: args.corpus.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        counts: counts.clone(),
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote index manifest");
    info!(
        documents = counts.documents,
        terms = counts.terms,
        postings = counts.postings,
        "index build completed"
    );

    Ok(())
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS meta (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS stats (
              key TEXT PRIMARY KEY,
              value INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS terms (
              term TEXT PRIMARY KEY,
              df INTEGER NOT NULL,
              cf INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS postings (
              term TEXT NOT NULL,
              doc_id TEXT NOT NULL,
              tf INTEGER NOT NULL,
              PRIMARY KEY (term, doc_id)
            );
            ",
        )
        .context("failed to create schema")?;

    connection
        .execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('db_schema_version', ?1)",
            params![DB_SCHEMA_VERSION],
        )
        .context("failed to record schema version")?;

    Ok(())
}

/// Rebuilds the statistics tables from the corpus inside one transaction;
/// a rerun over the same corpus reproduces the same database.
fn build_index(connection: &mut Connection, corpus_path: &Path) -> Result<IndexCounts> {
    let file = File::open(corpus_path)
        .with_context(|| format!("failed to open {}", corpus_path.display()))?;
    let reader = BufReader::new(file);

    let token_pattern = token_pattern();

    let tx = connection.transaction().context("failed to begin transaction")?;
    tx.execute_batch(
        "
        DELETE FROM stats;
        DELETE FROM terms;
        DELETE FROM postings;
        ",
    )
    .context("failed to clear previous index")?;

    let mut documents: u64 = 0;
    let mut empty_documents: u64 = 0;
    let mut postings: u64 = 0;
    let mut term_stats: BTreeMap<String, (u64, u64)> = BTreeMap::new();

    {
        let mut insert_posting = tx
            .prepare("INSERT OR REPLACE INTO postings (term, doc_id, tf) VALUES (?1, ?2, ?3)")
            .context("failed to prepare postings insert")?;

        for (index, line) in reader.lines().enumerate() {
            let line = line
                .with_context(|| format!("failed to read {}", corpus_path.display()))?;
            if line.trim().is_empty() {
                continue;
            }

            let doc: CorpusDoc = serde_json::from_str(&line).with_context(|| {
                format!("{}:{}: malformed corpus document", corpus_path.display(), index + 1)
            })?;

            documents += 1;
            let frequencies = term_frequencies(token_pattern, &doc.title, &doc.text);
            if frequencies.is_empty() {
                empty_documents += 1;
                warn!(doc_id = %doc.id, "document produced no tokens");
                continue;
            }

            for (term, tf) in &frequencies {
                let entry = term_stats.entry(term.clone()).or_insert((0, 0));
                entry.0 += 1;
                entry.1 += tf;

                insert_posting
                    .execute(params![term, doc.id, tf])
                    .with_context(|| format!("failed to insert posting for term {term}"))?;
                postings += 1;
            }
        }

        let mut insert_term = tx
            .prepare("INSERT OR REPLACE INTO terms (term, df, cf) VALUES (?1, ?2, ?3)")
            .context("failed to prepare terms insert")?;
        for (term, (df, cf)) in &term_stats {
            insert_term
                .execute(params![term, df, cf])
                .with_context(|| format!("failed to insert term {term}"))?;
        }
    }

    tx.execute(
        "INSERT OR REPLACE INTO stats (key, value) VALUES ('documents', ?1)",
        params![documents],
    )
    .context("failed to record document count")?;

    tx.commit().context("failed to commit index")?;

    Ok(IndexCounts {
        documents,
        terms: term_stats.len() as u64,
        postings,
        empty_documents,
    })
}

pub fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("valid token pattern"))
}

/// Index-time and query-time normalization must agree; both go through
/// this pair of helpers.
pub fn normalize_term(pattern: &Regex, term: &str) -> Option<String> {
    let lowered = term.to_lowercase();
    let parts: Vec<&str> = pattern.find_iter(&lowered).map(|m| m.as_str()).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.concat())
    }
}

fn term_frequencies(pattern: &Regex, title: &str, text: &str) -> BTreeMap<String, u64> {
    let mut frequencies = BTreeMap::new();

    for field in [title, text] {
        let lowered = field.to_lowercase();
        for token in pattern.find_iter(&lowered) {
            *frequencies.entry(token.as_str().to_string()).or_insert(0) += 1;
        }
    }

    frequencies
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        let pattern = token_pattern();
        assert_eq!(normalize_term(&pattern, "Vinegar,"), Some("vinegar".to_string()));
        assert_eq!(normalize_term(&pattern, "COVID-19"), Some("covid19".to_string()));
        assert_eq!(normalize_term(&pattern, "---"), None);
    }

    #[test]
    fn builds_term_statistics_from_jsonl_corpus() {
        let dir = tempfile::tempdir().expect("tempdir");
        let corpus = dir.path().join("corpus.jsonl");
        fs::write(
            &corpus,
            concat!(
                "{\"_id\": \"d1\", \"title\": \"Vinegar wounds\", \"text\": \"vinegar on wounds\"}\n",
                "{\"_id\": \"d2\", \"text\": \"ice for burns\"}\n",
                "{\"_id\": \"d3\", \"text\": \"\"}\n",
            ),
        )
        .expect("write corpus");

        run(IndexArgs {
            cache_root: dir.path().to_path_buf(),
            corpus,
            db_path: None,
            manifest_path: Some(dir.path().join("manifest.json")),
        })
        .expect("index run");

        let connection = Connection::open(dir.path().join("term_stats.sqlite")).expect("open db");
        let documents: u64 = connection
            .query_row("SELECT value FROM stats WHERE key = 'documents'", [], |row| {
                row.get(0)
            })
            .expect("documents stat");
        assert_eq!(documents, 3);

        let (df, cf): (u64, u64) = connection
            .query_row(
                "SELECT df, cf FROM terms WHERE term = 'vinegar'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("vinegar stats");
        assert_eq!(df, 1);
        assert_eq!(cf, 2);

        let tf: u64 = connection
            .query_row(
                "SELECT tf FROM postings WHERE term = 'vinegar' AND doc_id = 'd1'",
                [],
                |row| row.get(0),
            )
            .expect("vinegar posting");
        assert_eq!(tf, 2);

        let manifest = fs::read_to_string(dir.path().join("manifest.json")).expect("manifest");
        assert!(manifest.contains("\"documents\": 3"));
        assert!(manifest.contains("\"empty_documents\": 1"));
    }
}
