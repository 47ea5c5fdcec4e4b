use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OpenFlags};
use tracing::info;

use crate::cli::{Metric, QppArgs};
use crate::topics;

mod metrics;
#[cfg(test)]
mod tests;

pub use metrics::VarScores;

/// Term-statistics backend: document frequency and collection frequency per
/// term, plus per-document term frequencies for the variance metrics.
pub trait TermStats {
    fn document_count(&self) -> Result<u64>;
    fn term_counts(&self, term: &str) -> Result<Option<(u64, u64)>>;
    fn postings(&self, term: &str) -> Result<Vec<u64>>;
}

pub struct SqliteTermStats {
    connection: Connection,
}

impl SqliteTermStats {
    pub fn open(path: &Path) -> Result<Self> {
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open index read-only: {}", path.display()))?;

        Ok(Self { connection })
    }
}

impl TermStats for SqliteTermStats {
    fn document_count(&self) -> Result<u64> {
        self.connection
            .query_row("SELECT value FROM stats WHERE key = 'documents'", [], |row| {
                row.get(0)
            })
            .context("index has no document count; run `misinfo index` first")
    }

    fn term_counts(&self, term: &str) -> Result<Option<(u64, u64)>> {
        self.connection
            .query_row(
                "SELECT df, cf FROM terms WHERE term = ?1",
                [term],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })
            .with_context(|| format!("failed to look up term {term}"))
    }

    fn postings(&self, term: &str) -> Result<Vec<u64>> {
        let mut statement = self
            .connection
            .prepare("SELECT tf FROM postings WHERE term = ?1 ORDER BY doc_id")
            .context("failed to prepare postings query")?;

        let rows = statement
            .query_map([term], |row| row.get::<_, u64>(0))
            .with_context(|| format!("failed to read postings for term {term}"))?;

        let mut frequencies = Vec::new();
        for tf in rows {
            frequencies.push(tf.with_context(|| format!("bad posting row for term {term}"))?);
        }
        Ok(frequencies)
    }
}

pub fn run(args: QppArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join("term_stats.sqlite"));
    let output = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "qpp_{}_{}.csv",
            args.track.as_str(),
            args.metric.as_str()
        ))
    });

    let index = SqliteTermStats::open(&db_path)?;
    let document_count = index.document_count()?;
    if document_count == 0 {
        bail!("index at {} is empty", db_path.display());
    }

    let topics = topics::load_topics(&args.topics, args.track)?;

    info!(
        metric = args.metric.as_str(),
        documents = document_count,
        topics = topics.len(),
        "computing query performance predictions"
    );

    let mut writer = csv::Writer::from_path(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;

    match args.metric {
        Metric::Var => {
            writer
                .write_record(["topic", "sigma_1", "sigma_2", "sigma_3", "postings_lens"])
                .context("failed to write csv header")?;
        }
        metric => {
            writer
                .write_record(["topic", metric.as_str()])
                .context("failed to write csv header")?;
        }
    }

    for topic in topics.values() {
        let query = topic.title.as_str();

        if args.metric == Metric::Var {
            let scores = metrics::var(&index, document_count, query)
                .with_context(|| format!("var failed for topic {}", topic.number))?;
            info!(
                topic = topic.number,
                query,
                sigma_1 = scores.sigma_1,
                sigma_2 = scores.sigma_2,
                sigma_3 = scores.sigma_3,
                "computed weighting variance"
            );
            let lens = scores
                .postings_lens
                .iter()
                .map(|len| len.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            writer
                .write_record([
                    topic.number.to_string(),
                    format!("{}", scores.sigma_1),
                    format!("{}", scores.sigma_2),
                    format!("{}", scores.sigma_3),
                    lens,
                ])
                .context("failed to write csv row")?;
            continue;
        }

        let value = match args.metric {
            Metric::AvgIdf => metrics::avg_idf(&index, document_count, query),
            Metric::MaxIdf => metrics::max_idf(&index, document_count, query),
            Metric::AvgScq => metrics::avg_scq(&index, document_count, query),
            Metric::MaxScq => metrics::max_scq(&index, document_count, query),
            Metric::AvgIctf => metrics::avg_ictf(&index, document_count, query),
            Metric::Scs => metrics::scs(&index, document_count, query),
            Metric::Var => unreachable!("handled above"),
        }
        .with_context(|| {
            format!(
                "{} failed for topic {}",
                args.metric.as_str(),
                topic.number
            )
        })?;

        info!(
            topic = topic.number,
            query,
            value,
            metric = args.metric.as_str(),
            "computed metric"
        );
        writer
            .write_record([topic.number.to_string(), format!("{value}")])
            .context("failed to write csv row")?;
    }

    writer.flush().context("failed to flush csv output")?;
    info!(path = %output.display(), "wrote metric csv");

    Ok(())
}
