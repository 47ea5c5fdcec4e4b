use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result, bail, ensure};
use tracing::{info, warn};

use crate::cli::{GenerateArgs, GenerateTask, NarrativeStyle, QueryField};
use crate::model::Topic;
use crate::topics::{self, TopicOverrides};
use crate::util::{ensure_directory, write_json_pretty, write_lines};

mod prompts;
mod run;
mod session;
#[cfg(test)]
mod tests;

pub use run::run;
pub use session::{ChatSession, MAX_PARSE_ATTEMPTS};
