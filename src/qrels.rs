use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cli::Track;

/// Sentinel used where a track's qrels carry no credibility column (2022).
pub const CREDIBILITY_ABSENT: i8 = -1;

/// One assessor judgment for a (topic, document) pair.
///
/// `answer` holds the track's correctness-relevant raw column: the document
/// answer for 2020, supportiveness for 2021, the judged answer for 2022.
/// `iteration` is an opaque pass-through; it never enters any computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgment {
    pub topic_id: u32,
    pub iteration: String,
    pub doc_id: String,
    pub usefulness: i8,
    pub answer: i8,
    pub credibility: i8,
}

/// Reads a whitespace-separated qrels file with the track's column layout.
///
/// 2020/2021: `topic iteration docno usefulness answer credibility`.
/// 2022: `topic docno usefulness answer` — the iteration column does not
/// exist and is synthesized as `"0"`, matching the published derived files.
pub fn load_qrels(path: &Path, track: Track) -> Result<Vec<Judgment>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = parse_line(line, track)
            .with_context(|| format!("{}:{}: malformed qrels row", path.display(), index + 1))?;
        rows.push(row);
    }

    if rows.is_empty() {
        bail!("no qrels rows found in {}", path.display());
    }

    Ok(rows)
}

fn parse_line(line: &str, track: Track) -> Result<Judgment> {
    let fields: Vec<&str> = line.split_whitespace().collect();

    let expected = match track {
        Track::Y2020 | Track::Y2021 => 6,
        Track::Y2022 => 4,
    };
    if fields.len() != expected {
        bail!(
            "expected {expected} columns for track {}, found {}",
            track.as_str(),
            fields.len()
        );
    }

    let topic_id = fields[0]
        .parse::<u32>()
        .with_context(|| format!("invalid topic id: {}", fields[0]))?;

    match track {
        Track::Y2020 | Track::Y2021 => Ok(Judgment {
            topic_id,
            iteration: fields[1].to_string(),
            doc_id: fields[2].to_string(),
            usefulness: parse_label(fields[3], "usefulness")?,
            answer: parse_label(fields[4], "answer")?,
            credibility: parse_label(fields[5], "credibility")?,
        }),
        Track::Y2022 => Ok(Judgment {
            topic_id,
            iteration: "0".to_string(),
            doc_id: fields[1].to_string(),
            usefulness: parse_label(fields[2], "usefulness")?,
            answer: parse_label(fields[3], "answer")?,
            credibility: CREDIBILITY_ABSENT,
        }),
    }
}

fn parse_label(field: &str, column: &str) -> Result<i8> {
    field
        .parse::<i8>()
        .with_context(|| format!("invalid {column} value: {field}"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write qrels");
        file
    }

    #[test]
    fn parses_six_column_2021_rows() {
        let file = write_temp("101 0 doc-aa 2 2 1\n101 0 doc-bb 0 -1 -1\n");

        let rows = load_qrels(file.path(), Track::Y2021).expect("parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].topic_id, 101);
        assert_eq!(rows[0].doc_id, "doc-aa");
        assert_eq!(rows[0].usefulness, 2);
        assert_eq!(rows[0].answer, 2);
        assert_eq!(rows[0].credibility, 1);
        assert_eq!(rows[1].usefulness, 0);
    }

    #[test]
    fn synthesizes_iteration_for_2022_rows() {
        let file = write_temp("151 b2c3 1 1\n");

        let rows = load_qrels(file.path(), Track::Y2022).expect("parse");
        assert_eq!(rows[0].iteration, "0");
        assert_eq!(rows[0].doc_id, "b2c3");
        assert_eq!(rows[0].credibility, CREDIBILITY_ABSENT);
    }

    #[test]
    fn rejects_wrong_column_count_with_line_number() {
        let file = write_temp("1 0 doc 1 1 1\n2 0 doc 1\n");

        let err = load_qrels(file.path(), Track::Y2020).unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains(":2:"), "missing line number: {rendered}");
        assert!(rendered.contains("expected 6 columns"));
    }
}
