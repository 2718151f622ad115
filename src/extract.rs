//! Turns a crew result payload into a chat reply.

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

use crate::classify::Category;

/// Reply used when the payload carries nothing to show.
pub const NO_RESULTS: &str = "No results found for this task.";

/// Reply used when the payload could not be formatted.
pub const EXTRACTION_FAILED: &str = "⚠️ Something went wrong while formatting the crew result.";

/// Result body posted by the crew to the capture endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskResultPayload {
    #[serde(default)]
    pub input: Option<TaskInput>,
    /// Final answer of the whole crew, if it reported one.
    #[serde(default)]
    pub result: Option<Value>,
    /// Per-stage outputs, in pipeline order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub task_output: Vec<StageOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInput {
    #[serde(default)]
    pub query_post: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageOutput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub result: Value,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<StageOutput>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<StageOutput>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TaskResultPayload {
    /// The request text the crew echoed back.
    pub fn query(&self) -> Option<&str> {
        self.input.as_ref()?.query_post.as_deref()
    }

    fn summary(&self) -> Option<String> {
        match self.result.as_ref()? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("stage {index} ({name}) has no text result")]
    StageNotText { index: usize, name: String },
}

/// Format a payload for the given category. Never fails: formatting
/// problems produce [`EXTRACTION_FAILED`].
pub fn extract(payload: &TaskResultPayload, category: Category) -> String {
    match try_extract(payload, category) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, %category, "failed to extract crew result");
            EXTRACTION_FAILED.to_string()
        }
    }
}

fn try_extract(payload: &TaskResultPayload, category: Category) -> Result<String, ExtractError> {
    let stages = &payload.task_output;
    let banner = banner(category);

    match category {
        Category::Research if stages.len() >= 2 => {
            return Ok(format!(
                "{banner}\n\n**Summary**\n{}\n\n**Key Insights**\n{}",
                clean(stage_text(stages, 0)?),
                clean(stage_text(stages, 1)?),
            ));
        }
        Category::Blog if stages.len() >= 2 => {
            return Ok(format!("{banner}\n\n{}", clean(stage_text(stages, 1)?)));
        }
        Category::Twitter if stages.len() >= 3 => {
            return Ok(format!("{banner}\n\n{}", clean(stage_text(stages, 2)?)));
        }
        _ => {}
    }

    if let Some(summary) = payload.summary() {
        return Ok(format!("{banner}\n\n{}", clean(&summary)));
    }

    if !stages.is_empty() {
        return Ok(format!("{banner}\n\n{}", clean(stage_text(stages, 0)?)));
    }

    Ok(NO_RESULTS.to_string())
}

fn banner(category: Category) -> &'static str {
    match category {
        Category::Research => "🔬 **Research Results**",
        Category::Blog => "✍️ **Blog Post**",
        Category::Twitter => "🐦 **Twitter Thread**",
        Category::General => "🤖 **Crew Result**",
    }
}

fn stage_text(stages: &[StageOutput], index: usize) -> Result<&str, ExtractError> {
    let stage = &stages[index];
    stage.result.as_str().ok_or_else(|| ExtractError::StageNotText {
        index,
        name: stage.name.clone().unwrap_or_default(),
    })
}

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##+[ \t]+(.*)$").expect("valid regex"));
static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+-]*").expect("valid regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]\((?:[^()]|\([^)]*\))*\)").expect("valid regex"));
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Strip the markdown the crew emits that chat renders poorly.
///
/// Applied until nothing changes, so `clean(clean(s)) == clean(s)`.
pub fn clean(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = clean_once(&current).trim().to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

fn clean_once(text: &str) -> String {
    let text = HEADING.replace_all(text, "**$1**");
    let text = text.replace("**", "");
    let text = FENCE.replace_all(&text, "");
    let text = LINK.replace_all(&text, "");
    BLANK_RUN.replace_all(&text, "\n\n").into_owned()
}
