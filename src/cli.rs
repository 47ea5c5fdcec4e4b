use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "misinfo",
    version,
    about = "Health Misinformation Track qrels, QPP and query tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    DeriveQrels(DeriveQrelsArgs),
    ExportTsv(ExportTsvArgs),
    Index(IndexArgs),
    Qpp(QppArgs),
    Generate(GenerateArgs),
    ScoreAnswers(ScoreAnswersArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum)]
pub enum Track {
    #[value(name = "2020")]
    Y2020,
    #[value(name = "2021")]
    Y2021,
    #[value(name = "2022")]
    Y2022,
}

impl Track {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Y2020 => "2020",
            Self::Y2021 => "2021",
            Self::Y2022 => "2022",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeriveQrelsArgs {
    #[arg(long, value_enum)]
    pub track: Track,

    #[arg(long)]
    pub qrels: PathBuf,

    #[arg(long)]
    pub topics: PathBuf,

    /// Preference judgments CSV; only consulted for the 2022 track.
    #[arg(long)]
    pub prefs: Option<PathBuf>,

    #[arg(long, default_value = "derived-qrels")]
    pub output: PathBuf,

    /// Prefix for every generated file.
    #[arg(long, default_value = "misinfo-qrels")]
    pub name: String,

    #[arg(long = "exclude-topic")]
    pub exclude_topics: Vec<u32>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportTsvArgs {
    #[arg(long, default_value = "derived-qrels")]
    pub qrels_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    #[arg(long, default_value = ".cache/misinfo")]
    pub cache_root: PathBuf,

    /// BEIR-style corpus: one JSON object per line with _id/title/text.
    #[arg(long)]
    pub corpus: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Metric {
    AvgIdf,
    MaxIdf,
    AvgScq,
    MaxScq,
    AvgIctf,
    Scs,
    Var,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AvgIdf => "avg-idf",
            Self::MaxIdf => "max-idf",
            Self::AvgScq => "avg-scq",
            Self::MaxScq => "max-scq",
            Self::AvgIctf => "avg-ictf",
            Self::Scs => "scs",
            Self::Var => "var",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct QppArgs {
    #[arg(long, default_value = ".cache/misinfo")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub track: Track,

    #[arg(long)]
    pub topics: PathBuf,

    #[arg(long, value_enum)]
    pub metric: Metric,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum GenerateTask {
    Variants,
    Narratives,
    Evaluate,
    Controversy,
    Passages,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum NarrativeStyle {
    Examples,
    Style,
    Basic,
    Trec,
}

impl NarrativeStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Examples => "examples",
            Self::Style => "style",
            Self::Basic => "basic",
            Self::Trec => "trec",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum QueryField {
    Description,
    Title,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long, value_enum)]
    pub task: GenerateTask,

    #[arg(long, value_enum)]
    pub track: Track,

    #[arg(long)]
    pub topics: PathBuf,

    #[arg(long, default_value = "generated")]
    pub output_dir: PathBuf,

    /// Number of query variants requested per topic.
    #[arg(long, default_value_t = 5)]
    pub variants: usize,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub role: bool,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub narrative: bool,

    #[arg(long, default_value_t = 1)]
    pub chain_of_thought: u8,

    #[arg(long, value_enum, default_value_t = NarrativeStyle::Examples)]
    pub style: NarrativeStyle,

    #[arg(long, default_value_t = 1)]
    pub judges: usize,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub factors: bool,

    #[arg(long, value_enum, default_value_t = QueryField::Description)]
    pub query_field: QueryField,

    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub api_base: String,

    #[arg(long, default_value = "gpt-4o")]
    pub model: String,

    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreAnswersArgs {
    #[arg(long)]
    pub topics: PathBuf,

    /// Run file under evaluation: topic, answer, yes-probability, run name.
    #[arg(long)]
    pub run: PathBuf,
}
