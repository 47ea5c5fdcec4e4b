use super::*;

use super::views::OutputFile;

pub fn run(args: DeriveQrelsArgs) -> Result<()> {
    let started_ts = Utc::now();
    let run_id = format!("derive-{}", utc_compact_string(started_ts));

    ensure_directory(&args.output)?;

    info!(
        track = args.track.as_str(),
        qrels = %args.qrels.display(),
        run_id = %run_id,
        "starting qrels derivation"
    );

    let topics = topics::load_topics(&args.topics, args.track)?;
    let mut rows = qrels::load_qrels(&args.qrels, args.track)?;

    let rows_total = rows.len();
    let mut warnings = Vec::new();

    if !args.exclude_topics.is_empty() {
        let excluded: HashSet<u32> = args.exclude_topics.iter().copied().collect();
        rows.retain(|row| !excluded.contains(&row.topic_id));
    }
    let rows_excluded = rows_total - rows.len();
    if rows_excluded > 0 {
        warn!(rows = rows_excluded, "dropped rows for excluded topics");
        warnings.push(format!("{rows_excluded} rows dropped via --exclude-topic"));
    }

    let outcome = match args.track {
        Track::Y2020 | Track::Y2021 => derive_labeled(&args, &topics, &rows)?,
        Track::Y2022 => derive_2022(&args, &topics, &mut rows)?,
    };
    warnings.extend(outcome.warnings);

    let mut output_names = Vec::with_capacity(outcome.outputs.len());
    for output in &outcome.outputs {
        let path = args.output.join(&output.name);
        write_lines(&path, &output.lines)?;
        info!(path = %path.display(), rows = output.lines.len(), "wrote derived view");
        output_names.push(output.name.clone());
    }

    let manifest = DeriveRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        track: args.track.as_str().to_string(),
        status: "completed".to_string(),
        generated_at: now_utc_string(),
        command: render_command(&args),
        paths: DerivePaths {
            qrels_path: args.qrels.display().to_string(),
            topics_path: args.topics.display().to_string(),
            prefs_path: args.prefs.as_ref().map(|path| path.display().to_string()),
            output_dir: args.output.display().to_string(),
        },
        counts: DeriveCounts {
            topics_total: topics.len(),
            rows_total,
            rows_excluded,
            graded_rows: outcome.graded_rows,
            helpful_rows: outcome.helpful_rows,
            harmful_rows: outcome.harmful_rows,
            preference_overrides: outcome.preference_overrides,
        },
        outputs: output_names,
        warnings,
    };

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        args.output
            .join(format!("derive_run_{}.json", utc_compact_string(started_ts)))
    });
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote derive run manifest");
    info!(
        rows = outcome.graded_rows,
        views = manifest.outputs.len(),
        "derivation completed"
    );

    Ok(())
}

struct DeriveOutcome {
    outputs: Vec<OutputFile>,
    graded_rows: usize,
    helpful_rows: usize,
    harmful_rows: usize,
    preference_overrides: usize,
    warnings: Vec<String>,
}

/// 2020/2021: grade from the track table, project the labeled views, and
/// refuse to write anything if an invariant fails.
fn derive_labeled(
    args: &DeriveQrelsArgs,
    topics: &BTreeMap<u32, Topic>,
    rows: &[Judgment],
) -> Result<DeriveOutcome> {
    let mut grades = Vec::with_capacity(rows.len());
    for row in rows {
        let topic = topics
            .get(&row.topic_id)
            .with_context(|| format!("qrels topic {} not found in topics file", row.topic_id))?;
        grades.push(grading::grade(args.track, topic.stance.polarity, row)?);
    }

    let facets = views::build_facets(args.track, topics, rows, &grades)?;
    checks::check_row_invariants(args.track, rows, &facets)?;

    let outputs = match args.track {
        Track::Y2020 => {
            let counts = views::build_counts_2020(rows, &facets);
            checks::check_counts_2020(&counts)?;
            views::build_views_2020(&args.name, rows, &facets, &counts)
        }
        Track::Y2021 => {
            let counts = views::build_counts_2021(rows, &facets);
            checks::check_counts_2021(&counts)?;
            views::build_views_2021(&args.name, rows, &facets, &counts)
        }
        Track::Y2022 => unreachable!("labeled derivation only covers 2020/2021"),
    };
    checks::check_projection_consistency(&args.name, &outputs)?;

    Ok(DeriveOutcome {
        graded_rows: rows.len(),
        helpful_rows: grades.iter().filter(|&&grade| grade > 0).count(),
        harmful_rows: grades.iter().filter(|&&grade| grade < 0).count(),
        preference_overrides: 0,
        outputs,
        warnings: Vec::new(),
    })
}

/// 2022: table grades with the preference-rank override merged on top;
/// rows for topics absent from the topics file are dropped, as the
/// original inner join did.
fn derive_2022(
    args: &DeriveQrelsArgs,
    topics: &BTreeMap<u32, Topic>,
    rows: &mut Vec<Judgment>,
) -> Result<DeriveOutcome> {
    let mut warnings = Vec::new();

    let before = rows.len();
    rows.retain(|row| topics.contains_key(&row.topic_id));
    let unknown = before - rows.len();
    if unknown > 0 {
        warn!(rows = unknown, "dropped rows for topics missing from the topics file");
        warnings.push(format!("{unknown} rows dropped for unknown topics"));
    }

    let mut correctness = Vec::with_capacity(rows.len());
    let mut table_grades = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        let polarity = topics[&row.topic_id].stance.polarity;
        correctness.push(grading::classify_correctness(
            args.track, polarity, row.answer,
        ));
        table_grades.push(grading::grade(args.track, polarity, row)?);
    }

    let prefs = match &args.prefs {
        Some(path) => {
            let set = prefs::load_preferences(path, topics)?;
            info!(
                matched = set.matched_rows,
                unmatched = set.unmatched_rows,
                "loaded preference judgments"
            );
            if set.unmatched_rows > 0 {
                warnings.push(format!(
                    "{} preference rows did not match any topic",
                    set.unmatched_rows
                ));
            }
            set
        }
        None => prefs::PreferenceSet::default(),
    };

    let mut preference_overrides = 0;
    let final_grades: Vec<i32> = rows
        .iter()
        .zip(&table_grades)
        .map(|(row, &table_grade)| {
            match prefs.override_grade(row.topic_id, &row.doc_id) {
                Some(grade) => {
                    preference_overrides += 1;
                    grade
                }
                None => table_grade,
            }
        })
        .collect();

    checks::check_2022(rows, &correctness, &table_grades, &final_grades)?;

    let outputs = views::build_views_2022(&args.name, rows, &correctness, &final_grades);

    Ok(DeriveOutcome {
        graded_rows: rows.len(),
        helpful_rows: final_grades.iter().filter(|&&grade| grade > 0).count(),
        harmful_rows: final_grades.iter().filter(|&&grade| grade < 0).count(),
        preference_overrides,
        outputs,
        warnings,
    })
}

fn render_command(args: &DeriveQrelsArgs) -> String {
    let mut command = format!(
        "misinfo derive-qrels --track {} --qrels {} --topics {} --output {} --name {}",
        args.track.as_str(),
        args.qrels.display(),
        args.topics.display(),
        args.output.display(),
        args.name
    );
    if let Some(prefs) = &args.prefs {
        command.push_str(&format!(" --prefs {}", prefs.display()));
    }
    for topic in &args.exclude_topics {
        command.push_str(&format!(" --exclude-topic {topic}"));
    }
    command
}
