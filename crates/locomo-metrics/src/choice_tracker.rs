use std::collections::BTreeMap;
use std::time::Instant;

use locomo_core::ChoiceResult;

use crate::report::{ChoiceError, ChoiceOverallReport, ChoiceSummary, ErrorAnalysis, TypeMetrics};
use crate::stats::{estimate_cost, latency_stats, Pricing, TokenStats};
use crate::tracker::{group_latencies, group_tokens, llm_latency, measured, rate_pct};

/// Append-only log of multiple-choice outcomes, grouped by question type.
#[derive(Debug)]
pub struct ChoiceMetricsTracker {
    results: Vec<ChoiceResult>,
    pricing: Pricing,
    started: Instant,
}

impl Default for ChoiceMetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChoiceMetricsTracker {
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

    pub fn add_result(&mut self, result: ChoiceResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[ChoiceResult] {
        &self.results
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

    fn correct(&self) -> usize {
        self.results.iter().filter(|r| r.is_correct).count()
    }

    pub fn overall_metrics(&self) -> ChoiceOverallReport {
        if self.results.is_empty() {
            return ChoiceOverallReport::default();
        }

        let total = self.results.len();
        let correct = self.correct();
        let tokens = TokenStats::from_tokens(self.results.iter().map(|r| &r.tokens), total);
        let cost_estimation = estimate_cost(
            &self.pricing,
            tokens.total_input_tokens,
            tokens.total_output_tokens,
            total,
        );

        ChoiceOverallReport {
            overall: ChoiceSummary {
                total_questions: total,
                correct_predictions: correct,
                accuracy_pct: rate_pct(correct, total),
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
        }
    }

    /// Keyed by question type, sorted by name.
    pub fn per_type_metrics(&self) -> BTreeMap<String, TypeMetrics> {
        let mut groups: BTreeMap<&str, Vec<&ChoiceResult>> = BTreeMap::new();
        for r in &self.results {
            groups.entry(r.question_type.as_str()).or_default().push(r);
        }

        groups
            .into_iter()
            .map(|(qtype, rs)| {
                let correct = rs.iter().filter(|r| r.is_correct).count();
                let (latency, retrieval_latency, llm_latency) =
                    group_latencies(rs.iter().map(|r| &r.timings));
                let metrics = TypeMetrics {
                    total: rs.len(),
                    correct,
                    accuracy_pct: rate_pct(correct, rs.len()),
                    latency,
                    retrieval_latency,
                    llm_latency,
                    tokens: group_tokens(rs.iter().map(|r| &r.tokens), rs.len()),
                };
                (qtype.to_string(), metrics)
            })
            .collect()
    }

    pub fn error_analysis(&self) -> ErrorAnalysis {
        let mut errors_by_type: BTreeMap<String, Vec<ChoiceError>> = BTreeMap::new();
        for r in self.results.iter().filter(|r| !r.is_correct) {
            errors_by_type
                .entry(r.question_type.clone())
                .or_default()
                .push(ChoiceError {
                    question_id: r.question_id.clone(),
                    correct_index: r.correct_choice_index,
                    predicted_index: r.predicted_choice_index,
                });
        }

        let total_errors = self.results.len() - self.correct();
        ErrorAnalysis {
            total_errors,
            error_rate_pct: rate_pct(total_errors, self.results.len()),
            errors_by_type,
        }
    }
}
