//! Run summary export.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use locomo_core::{Category, ChoiceResult, QuestionResult};
use locomo_metrics::{
    CategoryMetrics, ChoiceMetricsTracker, ChoiceOverallReport, ErrorAnalysis, FrMetricsTracker,
    LowScoreAnalysis, OverallReport, TypeMetrics,
};

/// Everything a finished run exports: identity, aggregates, and the ordered
/// per-question records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary<M, B, A, R> {
    pub run_id: String,
    pub benchmark: String,
    pub timestamp: DateTime<Utc>,
    pub dataset: String,
    #[serde(default)]
    pub dataset_sha256: Option<String>,
    pub total_questions: usize,
    pub total_time_seconds: f64,
    pub metrics: M,
    pub breakdown: B,
    pub analysis: A,
    pub results: Vec<R>,
}

pub type FrSummary = RunSummary<
    OverallReport,
    BTreeMap<Category, CategoryMetrics>,
    LowScoreAnalysis,
    QuestionResult,
>;

pub type McSummary =
    RunSummary<ChoiceOverallReport, BTreeMap<String, TypeMetrics>, ErrorAnalysis, ChoiceResult>;

/// Dataset identity recorded alongside the results.
#[derive(Debug, Clone, Default)]
pub struct DatasetInfo {
    pub path: String,
    pub sha256: Option<String>,
}

pub fn free_response_summary(
    tracker: &FrMetricsTracker,
    dataset: DatasetInfo,
    low_score_threshold: f64,
    total_time_seconds: f64,
) -> FrSummary {
    RunSummary {
        run_id: ulid::Ulid::new().to_string(),
        benchmark: "locomo-free-response".into(),
        timestamp: Utc::now(),
        dataset: dataset.path,
        dataset_sha256: dataset.sha256,
        total_questions: tracker.len(),
        total_time_seconds,
        metrics: tracker.overall_metrics(),
        breakdown: tracker.per_category_metrics(),
        analysis: tracker.low_score_analysis(low_score_threshold),
        results: tracker.results().to_vec(),
    }
}

pub fn multiple_choice_summary(
    tracker: &ChoiceMetricsTracker,
    dataset: DatasetInfo,
    total_time_seconds: f64,
) -> McSummary {
    RunSummary {
        run_id: ulid::Ulid::new().to_string(),
        benchmark: "locomo-multiple-choice".into(),
        timestamp: Utc::now(),
        dataset: dataset.path,
        dataset_sha256: dataset.sha256,
        total_questions: tracker.len(),
        total_time_seconds,
        metrics: tracker.overall_metrics(),
        breakdown: tracker.per_type_metrics(),
        analysis: tracker.error_analysis(),
        results: tracker.results().to_vec(),
    }
}

/// Pretty-printed JSON; parent directories are created as needed.
pub fn write_summary<T: Serialize>(summary: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Default output path: `results/locomo_{kind}_{YYYYmmdd_HHMMSS}.json`.
pub fn default_output_path(kind: &str) -> std::path::PathBuf {
    Path::new("results").join(format!(
        "locomo_{kind}_{}.json",
        Utc::now().format("%Y%m%d_%H%M%S")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use locomo_core::{EvalMethod, Timings, TokenMetrics};

    fn result(id: &str, category: Category, score: f64) -> QuestionResult {
        QuestionResult {
            question_id: id.into(),
            question_text: format!("question {id}"),
            category,
            category_label: None,
            ground_truth: "Paris".into(),
            prediction: "London".into(),
            score,
            evaluation_method: EvalMethod::F1,
            normalized_prediction: "london".into(),
            normalized_ground_truth: "paris".into(),
            timings: Timings::new(0.1, 0.9),
            tokens: TokenMetrics::new(500, 5),
        }
    }

    #[test]
    fn test_write_free_response_summary() {
        let mut tracker = FrMetricsTracker::new();
        tracker.add_result(result("q0", Category::SingleHop, 1.0));
        tracker.add_result(result("q1", Category::Temporal, 0.2));

        let summary = free_response_summary(
            &tracker,
            DatasetInfo {
                path: "data/locomo10.json".into(),
                sha256: Some("abc".into()),
            },
            0.5,
            12.5,
        );
        assert_eq!(summary.total_questions, 2);
        assert_eq!(summary.run_id.len(), 26);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        write_summary(&summary, &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["benchmark"], "locomo-free-response");
        assert_eq!(json["dataset_sha256"], "abc");
        assert_eq!(json["metrics"]["overall"]["total_questions"], 2);
        assert!(json["breakdown"]["single_hop"].is_object());
        assert_eq!(json["analysis"]["total_low_scores"], 1);
        assert_eq!(json["results"][1]["question_id"], "q1");

        let back: FrSummary = serde_json::from_value(json).unwrap();
        assert_eq!(back.results, tracker.results());
    }

    #[test]
    fn test_multiple_choice_summary_from_empty_tracker() {
        let summary =
            multiple_choice_summary(&ChoiceMetricsTracker::new(), DatasetInfo::default(), 0.0);
        assert_eq!(summary.total_questions, 0);
        assert_eq!(summary.metrics, ChoiceOverallReport::default());
        assert!(summary.results.is_empty());
    }

    #[test]
    fn test_default_output_path() {
        let p = default_output_path("fr");
        assert!(p.starts_with("results"));
        let name = p.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("locomo_fr_") && name.ends_with(".json"));
    }
}
