use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Token usage of one LLM call.
///
/// `total_tokens` is whatever the endpoint reported; it is never recomputed,
/// even when it disagrees with `input_tokens + output_tokens`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenMetrics {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenMetrics {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }

    pub fn reported(input_tokens: u64, output_tokens: u64, total_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Per-question timings in seconds. Zero means "not measured".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub end_to_end_latency: f64,
    pub llm_response_time: f64,
    pub memory_retrieval_latency: f64,
}

impl Timings {
    /// End-to-end latency is retrieval plus generation.
    pub fn new(memory_retrieval_latency: f64, llm_response_time: f64) -> Self {
        let retrieval = non_negative(memory_retrieval_latency);
        let llm = non_negative(llm_response_time);
        Self {
            end_to_end_latency: retrieval + llm,
            llm_response_time: llm,
            memory_retrieval_latency: retrieval,
        }
    }
}

fn non_negative(secs: f64) -> f64 {
    if secs.is_finite() && secs > 0.0 {
        secs
    } else {
        0.0
    }
}

/// Which scoring branch produced a score. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMethod {
    F1,
    MultiHopF1,
    AdversarialBinary,
    MaxF1Multi,
}

impl EvalMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::F1 => "f1",
            Self::MultiHopF1 => "multi_hop_f1",
            Self::AdversarialBinary => "adversarial_binary",
            Self::MaxF1Multi => "max_f1_multi",
        }
    }
}

/// Output of the answer scorer for one (prediction, ground truth, category).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub score: f64,
    pub method: EvalMethod,
    pub normalized_prediction: String,
    pub normalized_ground_truth: String,
    pub category: Category,
    pub category_name: &'static str,
}

/// Clamp into [0, 1]; NaN becomes 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// One evaluated free-response outcome. Never mutated once tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub question_text: String,
    #[serde(default)]
    pub category: Category,
    /// Unrecognized dataset category, as given. Scored and bucketed as `Unknown`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_label: Option<String>,
    #[serde(default)]
    pub ground_truth: String,
    #[serde(default)]
    pub prediction: String,
    pub score: f64,
    pub evaluation_method: EvalMethod,
    #[serde(default)]
    pub normalized_prediction: String,
    #[serde(default)]
    pub normalized_ground_truth: String,
    #[serde(flatten)]
    pub timings: Timings,
    #[serde(default)]
    pub tokens: TokenMetrics,
}

impl QuestionResult {
    pub fn from_evaluation(
        question_id: impl Into<String>,
        question_text: impl Into<String>,
        ground_truth: impl Into<String>,
        prediction: impl Into<String>,
        evaluation: Evaluation,
        tokens: TokenMetrics,
        timings: Timings,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question_text: question_text.into(),
            category: evaluation.category,
            category_label: None,
            ground_truth: ground_truth.into(),
            prediction: prediction.into(),
            score: clamp_score(evaluation.score),
            evaluation_method: evaluation.method,
            normalized_prediction: evaluation.normalized_prediction,
            normalized_ground_truth: evaluation.normalized_ground_truth,
            timings,
            tokens,
        }
    }

    pub fn with_category_label(mut self, label: Option<String>) -> Self {
        self.category_label = label;
        self
    }
}

/// One evaluated multiple-choice outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceResult {
    pub question_id: String,
    pub question_text: String,
    pub question_type: String,
    pub correct_choice_index: Option<usize>,
    pub predicted_choice_index: Option<usize>,
    pub is_correct: bool,
    #[serde(flatten)]
    pub timings: Timings,
    #[serde(default)]
    pub tokens: TokenMetrics,
}

impl ChoiceResult {
    pub fn new(
        question_id: impl Into<String>,
        question_text: impl Into<String>,
        question_type: impl Into<String>,
        correct_choice_index: Option<usize>,
        predicted_choice_index: Option<usize>,
        tokens: TokenMetrics,
        timings: Timings,
    ) -> Self {
        // A missing prediction is never correct, even against a missing key.
        let is_correct = predicted_choice_index.is_some()
            && predicted_choice_index == correct_choice_index;
        Self {
            question_id: question_id.into(),
            question_text: question_text.into(),
            question_type: question_type.into(),
            correct_choice_index,
            predicted_choice_index,
            is_correct,
            timings,
            tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_metrics_reported_total_kept() {
        let t = TokenMetrics::reported(10, 5, 99);
        assert_eq!(t.total_tokens, 99);
        assert_eq!(TokenMetrics::new(10, 5).total_tokens, 15);
    }

    #[test]
    fn test_timings_never_negative() {
        let t = Timings::new(-1.0, f64::NAN);
        assert_eq!(t, Timings::default());
        let t = Timings::new(0.25, 1.5);
        assert_eq!(t.end_to_end_latency, 1.75);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(1.5), 1.0);
        assert_eq!(clamp_score(-0.1), 0.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(0.42), 0.42);
    }

    #[test]
    fn test_choice_result_missing_prediction_is_wrong() {
        let r = ChoiceResult::new(
            "q",
            "?",
            "single_hop",
            None,
            None,
            TokenMetrics::default(),
            Timings::default(),
        );
        assert!(!r.is_correct);
        let r = ChoiceResult::new(
            "q",
            "?",
            "single_hop",
            Some(3),
            Some(3),
            TokenMetrics::default(),
            Timings::default(),
        );
        assert!(r.is_correct);
    }

    #[test]
    fn test_question_result_json_roundtrip_flattens_timings() {
        let r = QuestionResult {
            question_id: "conv-1_q0".into(),
            question_text: "Where?".into(),
            category: Category::Unknown,
            category_label: Some("9".into()),
            ground_truth: "Paris".into(),
            prediction: "Paris".into(),
            score: 1.0,
            evaluation_method: EvalMethod::F1,
            normalized_prediction: "paris".into(),
            normalized_ground_truth: "paris".into(),
            timings: Timings::new(0.5, 1.0),
            tokens: TokenMetrics::new(100, 3),
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["end_to_end_latency"], 1.5);
        assert_eq!(json["category"], "unknown");
        assert_eq!(json["category_label"], "9");
        let back: QuestionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
