//! Aggregate report shapes. Plain serde structs, serialized as nested JSON
//! objects in the run summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use locomo_core::Category;

use crate::stats::{CostEstimate, LatencyStats, TokenStats};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub total_questions: usize,
    pub mean_f1: f64,
    pub median_f1: f64,
    pub min_f1: f64,
    pub max_f1: f64,
    pub stdev_f1: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmLatency {
    pub mean_llm_response_seconds: f64,
    pub median_llm_response_seconds: f64,
    pub total_llm_time_seconds: f64,
}

/// Fraction of results scoring at least the correctness threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryAccuracy {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
}

impl CategoryAccuracy {
    pub fn new(total: usize, correct: usize) -> Self {
        let accuracy = if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        };
        Self {
            total,
            correct,
            accuracy,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyByCategory {
    pub threshold: f64,
    pub by_category: BTreeMap<Category, CategoryAccuracy>,
    pub overall_excluding_adversarial: CategoryAccuracy,
}

/// Free-response overall report. `Default` is the neutral empty report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallReport {
    pub overall: ScoreSummary,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency: Option<LatencyStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub retrieval_latency: Option<LatencyStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub llm_latency: Option<LlmLatency>,
    pub tokens: TokenStats,
    pub cost_estimation: CostEstimate,
    pub accuracy_by_category: AccuracyByCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub stdev: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTokens {
    pub total_input: u64,
    pub total_output: u64,
    pub total_tokens: u64,
    pub mean_input: f64,
    pub mean_output: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    pub category_id: Option<u8>,
    pub category_display: String,
    /// Distinct unrecognized dataset values that landed in this bucket.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    pub total: usize,
    pub f1: ScoreStats,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency: Option<LatencyStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub retrieval_latency: Option<LatencyStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub llm_latency: Option<LlmLatency>,
    pub tokens: GroupTokens,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowScoreEntry {
    pub question_id: String,
    /// First 100 characters of the question.
    pub question: String,
    pub ground_truth: String,
    pub prediction: String,
    pub f1_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LowScoreAnalysis {
    pub threshold: f64,
    pub total_low_scores: usize,
    pub low_score_rate_pct: f64,
    pub low_scores_by_category: BTreeMap<Category, Vec<LowScoreEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceSummary {
    pub total_questions: usize,
    pub correct_predictions: usize,
    pub accuracy_pct: f64,
}

/// Multiple-choice overall report. `Default` is the neutral empty report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOverallReport {
    pub overall: ChoiceSummary,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency: Option<LatencyStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub retrieval_latency: Option<LatencyStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub llm_latency: Option<LlmLatency>,
    pub tokens: TokenStats,
    pub cost_estimation: CostEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMetrics {
    pub total: usize,
    pub correct: usize,
    pub accuracy_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency: Option<LatencyStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub retrieval_latency: Option<LatencyStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub llm_latency: Option<LlmLatency>,
    pub tokens: GroupTokens,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceError {
    pub question_id: String,
    pub correct_index: Option<usize>,
    pub predicted_index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub total_errors: usize,
    pub error_rate_pct: f64,
    pub errors_by_type: BTreeMap<String, Vec<ChoiceError>>,
}
