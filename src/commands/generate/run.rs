use super::*;

use super::session::Completion;

/// Temperatures swept by the controversy task, low to high.
const CONTROVERSY_TEMPERATURES: [f32; 5] = [0.2, 0.375, 0.55, 0.725, 0.9];

pub fn run(args: GenerateArgs) -> Result<()> {
    let topics_map = topics::load_topics(&args.topics, args.track)?;
    let session = ChatSession::from_env(&args.api_base, &args.model, args.temperature)?;
    ensure_directory(&args.output_dir)?;

    info!(
        task = ?args.task,
        track = args.track.as_str(),
        topics = topics_map.len(),
        model = %args.model,
        "starting generation"
    );

    match args.task {
        GenerateTask::Variants => generate_variants(&session, &args, &topics_map),
        GenerateTask::Narratives => generate_narratives(&session, &args, &topics_map),
        GenerateTask::Evaluate => evaluate_queries(&session, &args, &topics_map),
        GenerateTask::Controversy => score_controversy(&session, &args, &topics_map),
        GenerateTask::Passages => write_passages(&session, &args, &topics_map),
    }
}

fn query_text<'a>(args: &GenerateArgs, topic: &'a Topic) -> &'a str {
    match args.query_field {
        QueryField::Description => &topic.description,
        QueryField::Title => &topic.title,
    }
}

fn classification(args: &GenerateArgs) -> String {
    format!(
        "variants_{}_{}_cot{}",
        if args.role { "role" } else { "norole" },
        if args.narrative { "narrative" } else { "nonarrative" },
        args.chain_of_thought
    )
}

fn generate_variants(
    session: &ChatSession,
    args: &GenerateArgs,
    topics_map: &BTreeMap<u32, Topic>,
) -> Result<()> {
    let n = args.variants;
    let mut variants: BTreeMap<u32, Vec<String>> = BTreeMap::new();

    for topic in topics_map.values() {
        let query = query_text(args, topic);
        let narrative = args.narrative.then_some(topic.narrative.as_str());

        info!(topic = topic.number, "requesting query variants");
        let list = session.complete_parsed(
            session.temperature,
            |attempt| {
                let mut prompt = prompts::query_variants(
                    query,
                    args.role,
                    narrative,
                    args.chain_of_thought,
                    n,
                );
                if attempt > 0 {
                    prompt.push_str(prompts::VARIANTS_FORMAT_REMINDER);
                }
                prompt
            },
            |reply| parse_variants(reply, n),
        )?;
        variants.insert(topic.number, list);
    }

    let stem = classification(args);
    for index in 0..n {
        let overrides: BTreeMap<u32, TopicOverrides> = variants
            .iter()
            .map(|(&number, list)| {
                (
                    number,
                    TopicOverrides {
                        description: Some(list[index].clone()),
                        narrative: None,
                    },
                )
            })
            .collect();

        let xml_path = args.output_dir.join(format!("{stem}_{}.xml", index + 1));
        let xml = topics::render_topics_xml(args.track, topics_map, &overrides);
        fs::write(&xml_path, xml)
            .with_context(|| format!("failed to write {}", xml_path.display()))?;

        let jsonl_lines: Vec<String> = variants
            .iter()
            .map(|(number, list)| {
                serde_json::json!({"_id": number.to_string(), "text": list[index]}).to_string()
            })
            .collect();
        let jsonl_path = args.output_dir.join(format!("{stem}_{}.jsonl", index + 1));
        write_lines(&jsonl_path, &jsonl_lines)?;

        info!(xml = %xml_path.display(), jsonl = %jsonl_path.display(), "wrote variant set");
    }

    Ok(())
}

/// The reply must be a JSON array with at least `n` string entries; extra
/// entries are dropped.
pub fn parse_variants(reply: &str, n: usize) -> Result<Vec<String>> {
    let mut list: Vec<String> =
        serde_json::from_str(reply).context("reply is not a JSON array of strings")?;
    ensure!(list.len() >= n, "expected {n} variants, got {}", list.len());
    list.truncate(n);
    Ok(list)
}

fn generate_narratives(
    session: &ChatSession,
    args: &GenerateArgs,
    topics_map: &BTreeMap<u32, Topic>,
) -> Result<()> {
    let mut overrides: BTreeMap<u32, TopicOverrides> = BTreeMap::new();

    for topic in topics_map.values() {
        let prompt = prompts::narrative(args.style, query_text(args, topic));

        info!(topic = topic.number, style = args.style.as_str(), "requesting narrative");
        let narrative = session.complete_parsed(
            session.temperature,
            |_attempt| prompt.clone(),
            |reply| {
                // Replies cut off mid-sentence come back without a final
                // period; ask again rather than publishing a fragment.
                ensure!(reply.ends_with('.'), "narrative does not end with a period");
                Ok(reply.to_string())
            },
        )?;
        overrides.insert(
            topic.number,
            TopicOverrides {
                description: None,
                narrative: Some(narrative),
            },
        );
    }

    let suffix = match args.query_field {
        QueryField::Description => String::new(),
        QueryField::Title => "_title".to_string(),
    };
    let path = args.output_dir.join(format!(
        "topics_with_generated_narratives_from_{}_{}{suffix}.xml",
        args.style.as_str(),
        args.track.as_str()
    ));
    let xml = topics::render_topics_xml(args.track, topics_map, &overrides);
    fs::write(&path, xml).with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), "wrote topics with generated narratives");
    Ok(())
}

fn evaluate_queries(
    session: &ChatSession,
    args: &GenerateArgs,
    topics_map: &BTreeMap<u32, Topic>,
) -> Result<()> {
    let mut scores: BTreeMap<String, serde_json::Value> = BTreeMap::new();

    for topic in topics_map.values() {
        let narrative = args.narrative.then_some(topic.narrative.as_str());
        let prompt = prompts::query_evaluation(
            query_text(args, topic),
            args.role,
            narrative,
            args.chain_of_thought,
        );

        // A topic whose reply cannot be scored is skipped, not retried;
        // the remaining topics still get their scores.
        let reply = match session.complete(&prompt) {
            Ok(Completion { text, tokens_used }) => {
                info!(topic = topic.number, tokens = tokens_used, "received evaluation reply");
                text
            }
            Err(err) => {
                warn!(topic = topic.number, error = %err, "skipping topic: completion failed");
                continue;
            }
        };
        match parse_score(&reply) {
            Ok(score) => {
                scores.insert(topic.number.to_string(), score);
            }
            Err(err) => {
                warn!(topic = topic.number, error = %err, "skipping topic: unscorable reply");
            }
        }
    }

    let path = args.output_dir.join(format!(
        "query_scores_{}_{}_cot{}.json",
        if args.role { "role" } else { "norole" },
        if args.narrative { "narrative" } else { "nonarrative" },
        args.chain_of_thought
    ));
    write_json_pretty(&path, &scores)?;

    info!(path = %path.display(), scored = scores.len(), "wrote query scores");
    Ok(())
}

pub fn parse_score(reply: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(reply).context("reply is not JSON")?;
    ensure!(value.is_object(), "reply is not a JSON score object");
    ensure!(value.get("H").is_some(), "score object has no H field");
    Ok(value)
}

fn score_controversy(
    session: &ChatSession,
    args: &GenerateArgs,
    topics_map: &BTreeMap<u32, Topic>,
) -> Result<()> {
    let mut rows = Vec::new();

    for topic in topics_map.values() {
        let mut scores = Vec::with_capacity(CONTROVERSY_TEMPERATURES.len());
        for &temperature in &CONTROVERSY_TEMPERATURES {
            info!(topic = topic.number, temperature, "requesting controversy score");
            let score = session.complete_parsed(
                temperature,
                |_attempt| prompts::controversy(&topic.title, args.role, args.judges, args.factors),
                |reply| parse_controversy(reply, args.factors),
            )?;
            scores.push(score);
        }
        rows.push((topic.number, scores));
    }

    let path = args.output_dir.join(format!(
        "controversy_scores_{}_{}.csv",
        if args.factors { "factors" } else { "total" },
        args.track.as_str()
    ));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    let mut header = vec!["topic".to_string()];
    header.extend((1..=CONTROVERSY_TEMPERATURES.len()).map(|i| format!("score{i}")));
    writer.write_record(&header).context("failed to write csv header")?;

    for (topic_id, scores) in &rows {
        let mut record = vec![topic_id.to_string()];
        record.extend(scores.iter().map(|score| score.to_string()));
        writer.write_record(&record).context("failed to write csv row")?;
    }
    writer.flush().context("failed to flush csv output")?;

    info!(path = %path.display(), topics = rows.len(), "wrote controversy scores");
    Ok(())
}

pub fn parse_controversy(reply: &str, factors: bool) -> Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(reply).context("reply is not JSON")?;
    if factors {
        ensure!(value.is_array(), "reply is not a JSON array of scores");
        ensure!(
            value.as_array().is_some_and(|scores| !scores.is_empty()),
            "score array is empty"
        );
    } else {
        ensure!(value.is_i64() || value.is_u64(), "reply is not an integer score");
    }
    Ok(value)
}

fn write_passages(
    session: &ChatSession,
    args: &GenerateArgs,
    topics_map: &BTreeMap<u32, Topic>,
) -> Result<()> {
    let mut rows = Vec::new();

    for topic in topics_map.values() {
        info!(topic = topic.number, "requesting passages");
        let passages = session.complete_parsed(
            session.temperature,
            |_attempt| prompts::passages(&topic.title),
            parse_passages,
        )?;
        rows.push((topic.number, passages));
    }

    let width = rows.iter().map(|(_, passages)| passages.len()).max().unwrap_or(0);
    let path = args.output_dir.join("passages.csv");
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    let mut header = vec!["topic".to_string()];
    header.extend((1..=width).map(|i| format!("passage{i}")));
    writer.write_record(&header).context("failed to write csv header")?;

    for (topic_id, passages) in &rows {
        let mut record = vec![topic_id.to_string()];
        record.extend(passages.iter().cloned());
        record.resize(width + 1, String::new());
        writer.write_record(&record).context("failed to write csv row")?;
    }
    writer.flush().context("failed to flush csv output")?;

    info!(path = %path.display(), topics = rows.len(), "wrote passages");
    Ok(())
}

pub fn parse_passages(reply: &str) -> Result<Vec<String>> {
    let passages: Vec<String> = reply
        .split("||PAS||")
        .map(str::trim)
        .filter(|passage| !passage.is_empty())
        .map(str::to_string)
        .collect();
    if passages.is_empty() {
        bail!("reply contains no passages");
    }
    Ok(passages)
}
