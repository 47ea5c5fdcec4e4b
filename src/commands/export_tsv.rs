use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::ExportTsvArgs;
use crate::util::write_lines;

/// Reformats every graded qrels file in a derived-qrels directory into a
/// 3-column TSV (`topic docno Grade`, header included). Files that already
/// are `.tsv` exports, carry digits in their name (the aspect tables), or
/// do not parse as 4-column graded qrels are skipped.
pub fn run(args: ExportTsvArgs) -> Result<()> {
    let entries = fs::read_dir(&args.qrels_dir)
        .with_context(|| format!("failed to read {}", args.qrels_dir.display()))?;

    let mut candidates: Vec<(PathBuf, String)> = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", args.qrels_dir.display()))?;
        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect {}", entry.path().display()))?
            .is_file()
        {
            continue;
        }

        let path = entry.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if name.ends_with(".tsv") || name.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }

        let name = name.to_string();
        candidates.push((path, name));
    }
    candidates.sort();

    if candidates.is_empty() {
        bail!("no graded qrels files found in {}", args.qrels_dir.display());
    }

    let mut exported = 0;
    for (path, name) in candidates {
        let rows = match parse_graded_file(&path) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping file: not a graded qrels");
                continue;
            }
        };

        let output = path.with_file_name(format!("{name}.tsv"));

        let mut lines = vec!["topic\tdocno\tGrade".to_string()];
        lines.extend(rows);
        write_lines(&output, &lines)?;

        info!(path = %output.display(), rows = lines.len() - 1, "wrote tsv export");
        exported += 1;
    }

    info!(files = exported, "tsv export completed");
    Ok(())
}

fn parse_graded_file(path: &Path) -> Result<Vec<String>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            bail!("line {}: expected 4 columns, found {}", index + 1, fields.len());
        }
        let topic = fields[0]
            .parse::<u32>()
            .with_context(|| format!("line {}: invalid topic id", index + 1))?;
        let grade = fields[3]
            .parse::<i64>()
            .with_context(|| format!("line {}: invalid grade", index + 1))?;

        rows.push(format!("{topic}\t{}\t{grade}", fields[2]));
    }

    if rows.is_empty() {
        bail!("file has no qrels rows");
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_graded_files_and_skips_everything_else() {
        let dir = tempfile::tempdir().expect("tempdir");

        fs::write(
            dir.path().join("misinfo-qrels-graded"),
            "101 0 doc-a 12\n101 0 doc-b -2\n",
        )
        .unwrap();
        // Digit-bearing names and existing exports are skipped outright.
        fs::write(dir.path().join("misinfo-qrels.3aspects"), "101 0 doc-a 1 1 1\n").unwrap();
        fs::write(dir.path().join("old-export.tsv"), "topic\tdocno\tGrade\n").unwrap();
        // Wrong shape: warned about and skipped, not fatal.
        fs::write(
            dir.path().join("misinfo-qrels.counts.txt"),
            "topic.id total useful\n101 3 2\n",
        )
        .unwrap();

        run(ExportTsvArgs {
            qrels_dir: dir.path().to_path_buf(),
        })
        .expect("export run");

        let exported =
            fs::read_to_string(dir.path().join("misinfo-qrels-graded.tsv")).expect("tsv");
        assert_eq!(exported, "topic\tdocno\tGrade\n101\tdoc-a\t12\n101\tdoc-b\t-2\n");

        assert!(!dir.path().join("misinfo-qrels.3aspects.tsv").exists());
        assert!(!dir.path().join("misinfo-qrels.counts.txt.tsv").exists());
        assert!(!dir.path().join("old-export.tsv.tsv").exists());
    }
}
