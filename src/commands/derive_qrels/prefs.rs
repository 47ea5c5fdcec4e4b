use super::*;

/// Preference judgments joined back to topic numbers.
///
/// The preference file keys topics by a composite label
/// `"{question} (Answer is {Yes|No})"`; the join reconstructs the same
/// label from the topics file. Ranks count from 1 = most preferred.
#[derive(Debug, Default)]
pub struct PreferenceSet {
    ranks: HashMap<(u32, String), i64>,
    max_rank_by_topic: HashMap<u32, i64>,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
}

impl PreferenceSet {
    /// Converts a preference rank into a grade that strictly outranks the
    /// 2022 table: `max_rank − rank + (max_table_grade + 1)`.
    pub fn override_grade(&self, topic_id: u32, doc_id: &str) -> Option<i32> {
        let rank = self.ranks.get(&(topic_id, doc_id.to_string()))?;
        let max_rank = self.max_rank_by_topic.get(&topic_id)?;
        Some((max_rank - rank) as i32 + grading::MAX_TABLE_GRADE_2022 + 1)
    }
}

pub fn load_preferences(path: &Path, topics: &BTreeMap<u32, Topic>) -> Result<PreferenceSet> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to read preference csv: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read preference csv headers: {}", path.display()))?
        .clone();
    let topic_column = column_index(&headers, "Topic ID", path)?;
    let doc_column = column_index(&headers, "Document UUID", path)?;
    let rank_column = column_index(&headers, "Grade", path)?;

    let label_to_topic: HashMap<String, u32> = topics
        .values()
        .map(|topic| (composite_topic_label(topic), topic.number))
        .collect();

    let mut set = PreferenceSet::default();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("{}: malformed preference row {}", path.display(), index + 2))?;

        let label = record.get(topic_column).unwrap_or_default().trim();
        let Some(&topic_id) = label_to_topic.get(label) else {
            set.unmatched_rows += 1;
            continue;
        };

        let doc_id = record.get(doc_column).unwrap_or_default().trim().to_string();
        let rank = parse_rank(record.get(rank_column).unwrap_or_default()).with_context(|| {
            format!("{}: invalid Grade in preference row {}", path.display(), index + 2)
        })?;

        let entry = set.max_rank_by_topic.entry(topic_id).or_insert(rank);
        *entry = (*entry).max(rank);
        set.ranks.insert((topic_id, doc_id), rank);
        set.matched_rows += 1;
    }

    Ok(set)
}

fn composite_topic_label(topic: &Topic) -> String {
    format!(
        "{} (Answer is {})",
        topic.description,
        capitalize(&topic.stance.label)
    )
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn parse_rank(field: &str) -> Result<i64> {
    let trimmed = field.trim();
    if let Ok(rank) = trimmed.parse::<i64>() {
        return Ok(rank);
    }

    // Spreadsheet exports sometimes render integral ranks as "3.0".
    let value = trimmed
        .parse::<f64>()
        .with_context(|| format!("not a number: {trimmed}"))?;
    ensure!(value.fract() == 0.0, "rank is not integral: {trimmed}");
    Ok(value as i64)
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|header| header.trim() == name)
        .with_context(|| format!("{} has no \"{name}\" column", path.display()))
}
