use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::{DeriveQrelsArgs, Track};
use crate::model::{DeriveCounts, DerivePaths, DeriveRunManifest, Polarity, Topic};
use crate::qrels::{self, Judgment};
use crate::topics;
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty, write_lines};

mod checks;
mod grading;
mod prefs;
mod run;
#[cfg(test)]
mod tests;
mod views;

pub use grading::{Correctness, classify_correctness, grade};
pub use run::run;
