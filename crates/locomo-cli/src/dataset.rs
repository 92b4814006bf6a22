//! LoCoMo dataset loaders.
//!
//! - free-response: `locomo10.json`, an array of conversation samples with
//!   dynamic `session_N` keys and a `qa` list
//! - multiple-choice: LoCoMo-MC10, a JSON array or JSON-Lines of questions
//!   carrying their own `haystack_sessions`
//!
//! Missing fields default instead of failing so every QA pair yields exactly
//! one record.

use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use locomo_core::{
    BenchError, BenchResult, Category, ChoiceQuestion, ContextSource, Message, QuestionRecord,
};

pub fn load_free_response(path: &Path) -> BenchResult<Vec<QuestionRecord>> {
    let content = std::fs::read_to_string(path)?;
    parse_free_response(&content)
}

pub fn parse_free_response(content: &str) -> BenchResult<Vec<QuestionRecord>> {
    let data: Value = serde_json::from_str(content)?;
    let samples = match data {
        Value::Array(items) => items,
        Value::Object(_) => vec![data],
        _ => {
            return Err(BenchError::Dataset(
                "expected an array of conversation samples".into(),
            ))
        }
    };

    let mut records = Vec::new();
    for (idx, sample) in samples.iter().enumerate() {
        let Some(obj) = sample.as_object() else {
            warn!("skipping sample {idx}: not an object");
            continue;
        };
        let sample_id = obj
            .get("sample_id")
            .and_then(scalar_string)
            .unwrap_or_else(|| format!("sample_{idx}"));

        let messages = Arc::new(
            obj.get("conversation")
                .and_then(Value::as_object)
                .map(flatten_conversation)
                .unwrap_or_default(),
        );

        let qa = obj.get("qa").and_then(Value::as_array);
        for (qa_idx, item) in qa.into_iter().flatten().enumerate() {
            let (category, category_label) = parse_category(item.get("category"));
            records.push(QuestionRecord {
                question_id: format!("{sample_id}_q{qa_idx}"),
                session_id: sample_id.clone(),
                question: item.get("question").and_then(scalar_string).unwrap_or_default(),
                category,
                category_label,
                ground_truth: item.get("answer").and_then(scalar_string).unwrap_or_default(),
                evidence: item
                    .get("evidence")
                    .and_then(Value::as_array)
                    .map(|ev| ev.iter().filter_map(scalar_string).collect())
                    .unwrap_or_default(),
                context: ContextSource::Conversation(Arc::clone(&messages)),
            });
        }
        debug!(
            "sample {sample_id}: {} messages, {} questions",
            messages.len(),
            qa.map_or(0, Vec::len)
        );
    }
    Ok(records)
}

/// Recognized category, plus the raw value when it is present but not
/// recognized.
fn parse_category(value: Option<&Value>) -> (Category, Option<String>) {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return (Category::Unknown, None);
    };
    let category: Category = serde_json::from_value(value.clone()).unwrap_or_default();
    let label = (category == Category::Unknown)
        .then(|| scalar_string(value).unwrap_or_else(|| value.to_string()));
    (category, label)
}

/// Conversation turns in session order. Speaker A is the user; the first
/// turn of a dated session carries the date as a `[date] ` prefix.
fn flatten_conversation(conversation: &Map<String, Value>) -> Vec<Message> {
    let speaker_a = conversation
        .get("speaker_a")
        .and_then(Value::as_str)
        .unwrap_or("Speaker A");

    let mut sessions: Vec<(u32, &Vec<Value>)> = conversation
        .iter()
        .filter_map(|(key, value)| {
            let n = key.strip_prefix("session_")?.parse::<u32>().ok()?;
            Some((n, value.as_array()?))
        })
        .collect();
    sessions.sort_by_key(|(n, _)| *n);

    let mut messages = Vec::new();
    for (n, turns) in sessions {
        let date = conversation
            .get(&format!("session_{n}_date_time"))
            .and_then(Value::as_str)
            .unwrap_or("");
        for (i, turn) in turns.iter().enumerate() {
            let Some(turn) = turn.as_object() else {
                continue;
            };
            let text = turn.get("text").and_then(Value::as_str).unwrap_or("");
            if text.trim().is_empty() {
                continue;
            }
            let speaker = turn.get("speaker").and_then(Value::as_str).unwrap_or("");
            let role = if speaker == speaker_a { "user" } else { "assistant" };
            let content = if i == 0 && !date.is_empty() {
                format!("[{date}] {text}")
            } else {
                text.to_string()
            };
            messages.push(Message::new(role, content));
        }
    }
    messages
}

pub fn load_multiple_choice(path: &Path) -> BenchResult<Vec<ChoiceQuestion>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_multiple_choice(&content))
}

/// JSON array first, JSON-Lines otherwise. Unparsable lines are skipped.
pub fn parse_multiple_choice(content: &str) -> Vec<ChoiceQuestion> {
    let items: Vec<Value> = match serde_json::from_str::<Value>(content.trim_start()) {
        Ok(Value::Array(items)) if content.trim_start().starts_with('[') => items,
        _ => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str(line.trim()) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("skipping line {}: {e}", n + 1);
                    None
                }
            })
            .collect(),
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| match item.as_object() {
            Some(obj) => Some(parse_choice(idx, obj)),
            None => {
                warn!("skipping multiple-choice item {idx}: not a JSON object");
                None
            }
        })
        .collect()
}

fn parse_choice(idx: usize, obj: &Map<String, Value>) -> ChoiceQuestion {
    let question_id = obj
        .get("question_id")
        .and_then(scalar_string)
        .unwrap_or_else(|| format!("q_{idx}"));

    let messages: Vec<Message> = obj
        .get("haystack_sessions")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|turn| {
            let content = turn.get("content").and_then(Value::as_str)?;
            if content.trim().is_empty() {
                return None;
            }
            let role = turn.get("role").and_then(Value::as_str).unwrap_or("user");
            Some(Message::new(role, content))
        })
        .collect();

    ChoiceQuestion {
        session_id: question_id.clone(),
        question_id,
        question: obj.get("question").and_then(scalar_string).unwrap_or_default(),
        question_type: obj
            .get("question_type")
            .and_then(scalar_string)
            .unwrap_or_else(|| Category::Unknown.name().to_string()),
        choices: obj
            .get("choices")
            .and_then(Value::as_array)
            .map(|c| c.iter().filter_map(scalar_string).collect())
            .unwrap_or_default(),
        correct_choice_index: obj
            .get("correct_choice_index")
            .and_then(Value::as_u64)
            .map(|i| i as usize),
        context: ContextSource::Conversation(Arc::new(messages)),
    }
}

/// Strings as-is, numbers and booleans rendered; null and containers are absent.
fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First `max` records, or a seeded random subset of `max` records in
/// sampled order. `None` keeps everything in dataset order.
pub fn select<T: Clone>(
    records: Vec<T>,
    max: Option<usize>,
    random_sample: bool,
    seed: Option<u64>,
) -> Vec<T> {
    let Some(max) = max else {
        return records;
    };
    if !random_sample {
        let mut records = records;
        records.truncate(max);
        return records;
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    records
        .choose_multiple(&mut rng, max.min(records.len()))
        .cloned()
        .collect()
}

/// Hex SHA-256 of the dataset file, recorded in run summaries.
pub fn sha256_file(path: &Path) -> BenchResult<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
