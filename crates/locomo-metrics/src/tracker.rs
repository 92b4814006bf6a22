use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use locomo_core::{clamp_score, Category, QuestionResult, Timings, TokenMetrics};

use crate::report::{
    AccuracyByCategory, CategoryAccuracy, CategoryMetrics, GroupTokens, LlmLatency,
    LowScoreAnalysis, LowScoreEntry, OverallReport, ScoreStats, ScoreSummary,
};
use crate::stats::{
    estimate_cost, latency_stats, median, LatencyStats, Pricing, StreamingStats, TokenStats,
};

/// A result counts as correct for accuracy rollups at or above this score.
pub const CORRECT_THRESHOLD: f64 = 0.5;

const LOW_SCORE_QUESTION_CHARS: usize = 100;

/// Append-only log of free-response outcomes.
///
/// Every report is recomputed from the full log, so reports can be pulled
/// at any point (mid-run progress, final export) without side effects.
#[derive(Debug)]
pub struct FrMetricsTracker {
    results: Vec<QuestionResult>,
    pricing: Pricing,
    started: Instant,
}

impl Default for FrMetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FrMetricsTracker {
    pub fn new() -> Self {
        Self::with_pricing(Pricing::default())
    }

    pub fn with_pricing(pricing: Pricing) -> Self {
        Self {
            results: Vec::new(),
            pricing,
            started: Instant::now(),
        }
    }

    /// Append one outcome. The score is clamped into [0, 1]; nothing is rejected.
    pub fn add_result(&mut self, mut result: QuestionResult) {
        result.score = clamp_score(result.score);
        self.results.push(result);
    }

    pub fn results(&self) -> &[QuestionResult] {
        &self.results
    }

    /// Drain the log, keeping pricing and the run clock.
    pub fn take_results(&mut self) -> Vec<QuestionResult> {
        std::mem::take(&mut self.results)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn overall_metrics(&self) -> OverallReport {
        if self.results.is_empty() {
            return OverallReport::default();
        }

        let total = self.results.len();
        let scores: Vec<f64> = self.results.iter().map(|r| r.score).collect();
        let s = StreamingStats::from_values(&scores);

        let tokens = TokenStats::from_tokens(self.results.iter().map(|r| &r.tokens), total);
        let cost_estimation = estimate_cost(
            &self.pricing,
            tokens.total_input_tokens,
            tokens.total_output_tokens,
            total,
        );

        OverallReport {
            overall: ScoreSummary {
                total_questions: total,
                mean_f1: s.mean(),
                median_f1: median(&scores),
                min_f1: s.min(),
                max_f1: s.max(),
                stdev_f1: s.std_dev(),
            },
            latency: latency_stats(&measured(
                self.results.iter().map(|r| r.timings.end_to_end_latency),
            )),
            retrieval_latency: latency_stats(&measured(
                self.results
                    .iter()
                    .map(|r| r.timings.memory_retrieval_latency),
            )),
            llm_latency: llm_latency(&measured(
                self.results.iter().map(|r| r.timings.llm_response_time),
            )),
            tokens,
            cost_estimation,
            accuracy_by_category: self.accuracy_by_category(),
        }
    }

    /// Share of results at or above [`CORRECT_THRESHOLD`], per category and
    /// pooled over every non-adversarial category.
    pub fn accuracy_by_category(&self) -> AccuracyByCategory {
        let mut counts: BTreeMap<Category, (usize, usize)> = BTreeMap::new();
        for r in &self.results {
            let entry = counts.entry(r.category).or_default();
            entry.0 += 1;
            if r.score >= CORRECT_THRESHOLD {
                entry.1 += 1;
            }
        }

        let (pooled_total, pooled_correct) = counts
            .iter()
            .filter(|(cat, _)| !cat.is_adversarial())
            .fold((0, 0), |acc, (_, &(t, c))| (acc.0 + t, acc.1 + c));

        AccuracyByCategory {
            threshold: CORRECT_THRESHOLD,
            by_category: counts
                .into_iter()
                .map(|(cat, (t, c))| (cat, CategoryAccuracy::new(t, c)))
                .collect(),
            overall_excluding_adversarial: CategoryAccuracy::new(pooled_total, pooled_correct),
        }
    }

    pub fn per_category_metrics(&self) -> BTreeMap<Category, CategoryMetrics> {
        let mut groups: BTreeMap<Category, Vec<&QuestionResult>> = BTreeMap::new();
        for r in &self.results {
            groups.entry(r.category).or_default().push(r);
        }

        groups
            .into_iter()
            .map(|(cat, rs)| {
                let scores: Vec<f64> = rs.iter().map(|r| r.score).collect();
                let s = StreamingStats::from_values(&scores);
                let (latency, retrieval_latency, llm_latency) =
                    group_latencies(rs.iter().map(|r| &r.timings));
                let metrics = CategoryMetrics {
                    category_id: cat.id(),
                    category_display: cat.display_name().to_string(),
                    labels: rs
                        .iter()
                        .filter_map(|r| r.category_label.clone())
                        .collect::<BTreeSet<_>>()
                        .into_iter()
                        .collect(),
                    total: rs.len(),
                    f1: ScoreStats {
                        mean: s.mean(),
                        median: median(&scores),
                        min: s.min(),
                        max: s.max(),
                        stdev: s.std_dev(),
                    },
                    latency,
                    retrieval_latency,
                    llm_latency,
                    tokens: group_tokens(rs.iter().map(|r| &r.tokens), rs.len()),
                };
                (cat, metrics)
            })
            .collect()
    }

    /// Every result strictly below `threshold`, grouped by category.
    pub fn low_score_analysis(&self, threshold: f64) -> LowScoreAnalysis {
        let mut by_category: BTreeMap<Category, Vec<LowScoreEntry>> = BTreeMap::new();
        for r in self.results.iter().filter(|r| r.score < threshold) {
            by_category.entry(r.category).or_default().push(LowScoreEntry {
                question_id: r.question_id.clone(),
                question: r.question_text.chars().take(LOW_SCORE_QUESTION_CHARS).collect(),
                ground_truth: r.ground_truth.clone(),
                prediction: r.prediction.clone(),
                f1_score: r.score,
            });
        }

        let total_low_scores: usize = by_category.values().map(Vec::len).sum();
        LowScoreAnalysis {
            threshold,
            total_low_scores,
            low_score_rate_pct: rate_pct(total_low_scores, self.results.len()),
            low_scores_by_category: by_category,
        }
    }
}

/// Keep only latencies that were actually measured.
pub(crate) fn measured(values: impl Iterator<Item = f64>) -> Vec<f64> {
    values.filter(|&v| v > 0.0).collect()
}

pub(crate) fn llm_latency(times: &[f64]) -> Option<LlmLatency> {
    if times.is_empty() {
        return None;
    }
    Some(LlmLatency {
        mean_llm_response_seconds: StreamingStats::from_values(times).mean(),
        median_llm_response_seconds: median(times),
        total_llm_time_seconds: times.iter().sum(),
    })
}

/// End-to-end, retrieval and LLM latency for one group, each over its
/// measured values only.
pub(crate) fn group_latencies<'a>(
    timings: impl Iterator<Item = &'a Timings> + Clone,
) -> (Option<LatencyStats>, Option<LatencyStats>, Option<LlmLatency>) {
    (
        latency_stats(&measured(timings.clone().map(|t| t.end_to_end_latency))),
        latency_stats(&measured(timings.clone().map(|t| t.memory_retrieval_latency))),
        llm_latency(&measured(timings.map(|t| t.llm_response_time))),
    )
}

pub(crate) fn group_tokens<'a>(
    tokens: impl IntoIterator<Item = &'a TokenMetrics>,
    total: usize,
) -> GroupTokens {
    let t = TokenStats::from_tokens(tokens, total);
    GroupTokens {
        total_input: t.total_input_tokens,
        total_output: t.total_output_tokens,
        total_tokens: t.total_tokens,
        mean_input: t.mean_input_tokens,
        mean_output: t.mean_output_tokens,
    }
}

pub(crate) fn rate_pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locomo_core::EvalMethod;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn result(id: &str, category: Category, score: f64, tokens: TokenMetrics) -> QuestionResult {
        QuestionResult {
            question_id: id.into(),
            question_text: format!("question {id}?"),
            category,
            category_label: None,
            ground_truth: "gt".into(),
            prediction: "pred".into(),
            score,
            evaluation_method: EvalMethod::F1,
            normalized_prediction: "pred".into(),
            normalized_ground_truth: "gt".into(),
            timings: Timings::new(0.1, 1.0),
            tokens,
        }
    }

    #[test]
    fn test_empty_tracker_is_neutral() {
        let t = FrMetricsTracker::new();
        let report = t.overall_metrics();
        assert_eq!(report, OverallReport::default());
        assert_eq!(report.overall.total_questions, 0);
        assert!(t.per_category_metrics().is_empty());
        let low = t.low_score_analysis(0.5);
        assert_eq!(low.low_score_rate_pct, 0.0);
        assert_eq!(low.total_low_scores, 0);
    }

    #[test]
    fn test_read_after_write_no_hidden_mutation() {
        let mut t = FrMetricsTracker::new();
        for i in 0..4 {
            let id = format!("q{i}");
            t.add_result(result(&id, Category::SingleHop, 1.0, TokenMetrics::default()));
            let _ = t.overall_metrics();
            let _ = t.per_category_metrics();
        }
        assert_eq!(t.overall_metrics().overall.total_questions, 4);
        assert_eq!(t.overall_metrics(), t.overall_metrics());
    }

    #[test]
    fn test_five_result_scenario() {
        let mut t = FrMetricsTracker::new();
        let scores = [0.9, 0.0, 0.5, 1.0, 0.3];
        for (i, s) in scores.iter().enumerate() {
            t.add_result(result(
                &format!("q{i}"),
                Category::SingleHop,
                *s,
                TokenMetrics::new(1000, 10),
            ));
        }
        let r = t.overall_metrics();
        assert!(approx(r.overall.mean_f1, 0.54));
        assert!(approx(r.overall.median_f1, 0.5));
        assert_eq!(r.overall.min_f1, 0.0);
        assert_eq!(r.overall.max_f1, 1.0);
        assert_eq!(r.tokens.total_input_tokens, 5000);
        assert_eq!(r.tokens.total_output_tokens, 50);

        let expected = 5000.0 / 1e6 * 0.014 + 50.0 / 1e6 * 0.056;
        assert!(approx(
            r.cost_estimation.total_cost_usd,
            (expected * 1e6f64).round() / 1e6
        ));
    }

    #[test]
    fn test_accuracy_excludes_adversarial() {
        let mut t = FrMetricsTracker::new();
        t.add_result(result("a", Category::SingleHop, 0.9, TokenMetrics::default()));
        t.add_result(result("b", Category::MultiHop, 0.5, TokenMetrics::default()));
        t.add_result(result("c", Category::Temporal, 0.2, TokenMetrics::default()));
        for i in 0..5 {
            let id = format!("adv{i}");
            t.add_result(result(&id, Category::Adversarial, 1.0, TokenMetrics::default()));
        }

        let acc = t.overall_metrics().accuracy_by_category;
        assert_eq!(acc.overall_excluding_adversarial.total, 3);
        assert_eq!(acc.overall_excluding_adversarial.correct, 2);
        assert!(approx(acc.overall_excluding_adversarial.accuracy, 2.0 / 3.0));
        assert_eq!(acc.by_category[&Category::Adversarial].total, 5);
        assert_eq!(acc.by_category[&Category::Adversarial].accuracy, 1.0);
    }

    #[test]
    fn test_scores_are_clamped() {
        let mut t = FrMetricsTracker::new();
        t.add_result(result("hi", Category::SingleHop, 3.0, TokenMetrics::default()));
        t.add_result(result("lo", Category::SingleHop, f64::NAN, TokenMetrics::default()));
        assert_eq!(t.results()[0].score, 1.0);
        assert_eq!(t.results()[1].score, 0.0);
    }

    #[test]
    fn test_unmeasured_latencies_excluded() {
        let mut t = FrMetricsTracker::new();
        let mut r = result("a", Category::SingleHop, 1.0, TokenMetrics::default());
        r.timings = Timings::default();
        t.add_result(r);
        let report = t.overall_metrics();
        assert_eq!(report.overall.total_questions, 1);
        assert!(report.latency.is_none());
        assert!(report.llm_latency.is_none());

        t.add_result(result("b", Category::SingleHop, 1.0, TokenMetrics::default()));
        let report = t.overall_metrics();
        let latency = report.latency.unwrap();
        assert!(approx(latency.total_latency_seconds, 1.1));
        assert!(approx(report.retrieval_latency.unwrap().mean_latency_seconds, 0.1));
        assert!(approx(report.llm_latency.unwrap().total_llm_time_seconds, 1.0));
    }

    #[test]
    fn test_per_category_grouping_and_order() {
        let mut t = FrMetricsTracker::new();
        t.add_result(result("t", Category::Temporal, 0.4, TokenMetrics::new(10, 2)));
        t.add_result(result("m", Category::MultiHop, 0.8, TokenMetrics::new(20, 4)));
        t.add_result(result("u", Category::Unknown, 0.0, TokenMetrics::default()));
        t.add_result(result("m2", Category::MultiHop, 0.6, TokenMetrics::new(30, 6)));

        let per = t.per_category_metrics();
        let keys: Vec<_> = per.keys().copied().collect();
        assert_eq!(
            keys,
            vec![Category::MultiHop, Category::Temporal, Category::Unknown]
        );
        let multi = &per[&Category::MultiHop];
        assert_eq!(multi.total, 2);
        assert_eq!(multi.category_id, Some(1));
        assert_eq!(multi.category_display, "Multi-Hop");
        assert!(approx(multi.f1.mean, 0.7));
        assert_eq!(multi.tokens.total_input, 50);
        assert!(approx(multi.tokens.mean_output, 5.0));
        assert_eq!(per[&Category::Unknown].category_id, None);
        assert!(multi.labels.is_empty());
    }

    #[test]
    fn test_unrecognized_labels_reported_in_unknown_bucket() {
        let mut t = FrMetricsTracker::new();
        for (id, label) in [("a", "9"), ("b", "open"), ("c", "9")] {
            let mut r = result(id, Category::Unknown, 0.5, TokenMetrics::default());
            r.category_label = Some(label.into());
            t.add_result(r);
        }
        t.add_result(result("d", Category::Unknown, 0.5, TokenMetrics::default()));

        let per = t.per_category_metrics();
        let unknown = &per[&Category::Unknown];
        assert_eq!(unknown.total, 4);
        assert_eq!(unknown.labels, vec!["9", "open"]);
        let json = serde_json::to_value(&per).unwrap();
        assert_eq!(json["unknown"]["labels"][1], "open");
        assert_eq!(t.results()[0].category_label.as_deref(), Some("9"));
    }

    #[test]
    fn test_per_category_latency_matches_overall_shape() {
        let mut t = FrMetricsTracker::new();
        for (i, llm) in [1.0, 2.0, 3.0, 4.0].iter().enumerate() {
            let id = format!("t{i}");
            let mut r = result(&id, Category::Temporal, 0.5, TokenMetrics::default());
            r.timings = Timings::new(0.5, *llm);
            t.add_result(r);
        }
        let mut unmeasured = result("t4", Category::Temporal, 0.5, TokenMetrics::default());
        unmeasured.timings = Timings::default();
        t.add_result(unmeasured);

        let per = t.per_category_metrics();
        let temporal = &per[&Category::Temporal];
        let e2e = temporal.latency.as_ref().unwrap();
        // end-to-end 1.5, 2.5, 3.5, 4.5
        assert_eq!(e2e.p99_latency_seconds, 4.5);
        assert_eq!(e2e.p95_latency_seconds, 4.5);
        assert!(approx(e2e.mean_latency_seconds, 3.0));
        assert!(approx(e2e.stdev_latency_seconds, (5.0f64 / 3.0).sqrt()));
        assert!(approx(e2e.total_latency_seconds, 12.0));

        let retrieval = temporal.retrieval_latency.as_ref().unwrap();
        assert_eq!(retrieval.stdev_latency_seconds, 0.0);
        assert!(approx(retrieval.mean_latency_seconds, 0.5));
        let llm = temporal.llm_latency.as_ref().unwrap();
        assert!(approx(llm.total_llm_time_seconds, 10.0));
        assert!(approx(llm.median_llm_response_seconds, 2.5));
    }

    #[test]
    fn test_low_score_analysis() {
        let mut t = FrMetricsTracker::new();
        let mut long = result("long", Category::OpenDomain, 0.1, TokenMetrics::default());
        long.question_text = "x".repeat(250);
        t.add_result(long);
        t.add_result(result("ok", Category::OpenDomain, 0.5, TokenMetrics::default()));
        t.add_result(result("bad", Category::SingleHop, 0.0, TokenMetrics::default()));
        t.add_result(result("fine", Category::SingleHop, 0.9, TokenMetrics::default()));

        let low = t.low_score_analysis(0.5);
        assert_eq!(low.total_low_scores, 2);
        assert!(approx(low.low_score_rate_pct, 50.0));
        let open = &low.low_scores_by_category[&Category::OpenDomain];
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].question.chars().count(), 100);
        assert_eq!(low.low_scores_by_category[&Category::SingleHop][0].question_id, "bad");
    }

    #[test]
    fn test_report_serializes_category_keys_by_name() {
        let mut t = FrMetricsTracker::new();
        t.add_result(result("a", Category::OpenDomain, 1.0, TokenMetrics::default()));
        let json = serde_json::to_value(t.per_category_metrics()).unwrap();
        assert_eq!(json["open_domain"]["category_id"], 4);
        let json = serde_json::to_value(t.overall_metrics()).unwrap();
        assert!(json["accuracy_by_category"]["by_category"]["open_domain"].is_object());
    }
}
