use serde::{Deserialize, Serialize};

/// Ground-truth polarity of a topic's declared answer or stance.
///
/// 2020/2022 topics answer yes/no; 2021 topics declare a helpful/unhelpful
/// stance. Grading only cares whether a document agrees or disagrees with
/// the declared side, so both vocabularies normalize to one polarity.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Polarity {
    Positive,
    Negative,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Stance {
    /// Label exactly as it appears in the topics file (`yes`, `unhelpful`, ...).
    pub label: String,
    pub polarity: Polarity,
}

#[derive(Clone, Debug)]
pub struct Topic {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub narrative: String,
    pub evidence: String,
    pub disclaimer: Option<String>,
    pub stance: Stance,
}

#[derive(Debug, Clone, Serialize)]
pub struct DerivePaths {
    pub qrels_path: String,
    pub topics_path: String,
    pub prefs_path: Option<String>,
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeriveCounts {
    pub topics_total: usize,
    pub rows_total: usize,
    pub rows_excluded: usize,
    pub graded_rows: usize,
    pub helpful_rows: usize,
    pub harmful_rows: usize,
    pub preference_overrides: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeriveRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub track: String,
    pub status: String,
    pub generated_at: String,
    pub command: String,
    pub paths: DerivePaths,
    pub counts: DeriveCounts,
    pub outputs: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPaths {
    pub cache_root: String,
    pub corpus_path: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexCounts {
    pub documents: u64,
    pub terms: u64,
    pub postings: u64,
    pub empty_documents: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub generated_at: String,
    pub corpus_sha256: String,
    pub paths: IndexPaths,
    pub counts: IndexCounts,
    pub warnings: Vec<String>,
}
