//! Statistics shared by every tracker: order statistics over sorted copies,
//! a Welford accumulator for mean/stdev, token rollups and cost estimation.
//!
//! Every function is total. Empty input yields 0.0, never a panic or NaN.

use serde::{Deserialize, Serialize};

use locomo_core::TokenMetrics;

/// Nearest-rank, round-down percentile: `sorted[min(floor(n * p / 100), n - 1)]`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted(values);
    let index = (sorted.len() as f64 * p / 100.0).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}

pub fn mean(values: &[f64]) -> f64 {
    StreamingStats::from_values(values).mean()
}

/// Middle value, or the mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted(values);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Sample standard deviation (n - 1). 0.0 below two values.
pub fn stdev(values: &[f64]) -> f64 {
    StreamingStats::from_values(values).std_dev()
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Round half away from zero to six decimals (cost fields).
pub fn round6(x: f64) -> f64 {
    (x * 1_000_000.0).round() / 1_000_000.0
}

/// Single-pass mean, variance, min and max (Welford).
#[derive(Debug, Clone)]
pub struct StreamingStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for StreamingStats {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingStats {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn from_values(values: &[f64]) -> Self {
        let mut s = Self::new();
        for &v in values {
            s.push(v);
        }
        s
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).sqrt()
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub total_latency_seconds: f64,
    pub mean_latency_seconds: f64,
    pub median_latency_seconds: f64,
    pub p95_latency_seconds: f64,
    pub p99_latency_seconds: f64,
    pub min_latency_seconds: f64,
    pub max_latency_seconds: f64,
    pub stdev_latency_seconds: f64,
}

/// Full latency statistics, or `None` when nothing was measured.
pub fn latency_stats(latencies: &[f64]) -> Option<LatencyStats> {
    if latencies.is_empty() {
        return None;
    }
    let s = StreamingStats::from_values(latencies);
    Some(LatencyStats {
        total_latency_seconds: latencies.iter().sum(),
        mean_latency_seconds: s.mean(),
        median_latency_seconds: median(latencies),
        p95_latency_seconds: percentile(latencies, 95.0),
        p99_latency_seconds: percentile(latencies, 99.0),
        min_latency_seconds: s.min(),
        max_latency_seconds: s.max(),
        stdev_latency_seconds: s.std_dev(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenStats {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
    pub mean_input_tokens: f64,
    pub mean_output_tokens: f64,
    pub mean_total_tokens: f64,
}

impl TokenStats {
    /// Sums reported counts as-is; `total_tokens` is not recomputed.
    pub fn from_tokens<'a>(
        tokens: impl IntoIterator<Item = &'a TokenMetrics>,
        total_questions: usize,
    ) -> Self {
        let (input, output, total) = tokens.into_iter().fold((0u64, 0u64, 0u64), |acc, t| {
            (
                acc.0 + t.input_tokens,
                acc.1 + t.output_tokens,
                acc.2 + t.total_tokens,
            )
        });
        let per = |n: u64| {
            if total_questions == 0 {
                0.0
            } else {
                n as f64 / total_questions as f64
            }
        };
        Self {
            total_input_tokens: input,
            total_output_tokens: output,
            total_tokens: total,
            mean_input_tokens: per(input),
            mean_output_tokens: per(output),
            mean_total_tokens: per(total),
        }
    }
}

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_mtok: 0.014,
            output_per_mtok: 0.056,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub input_cost_usd: f64,
    pub output_cost_usd: f64,
    pub total_cost_usd: f64,
    pub cost_per_question_usd: f64,
}

/// Linear cost in the token counts. `cost_per_question_usd` is 0.0 when
/// there are no questions.
pub fn estimate_cost(
    pricing: &Pricing,
    input_tokens: u64,
    output_tokens: u64,
    num_questions: usize,
) -> CostEstimate {
    let input_cost = input_tokens as f64 / 1_000_000.0 * pricing.input_per_mtok;
    let output_cost = output_tokens as f64 / 1_000_000.0 * pricing.output_per_mtok;
    let total_cost = input_cost + output_cost;
    CostEstimate {
        input_cost_usd: round6(input_cost),
        output_cost_usd: round6(output_cost),
        total_cost_usd: round6(total_cost),
        cost_per_question_usd: if num_questions > 0 {
            round6(total_cost / num_questions as f64)
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_percentile_nearest_rank_round_down() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 95.0), 5.0);
        assert_eq!(percentile(&v, 50.0), 3.0);
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 100.0), 5.0);
        assert_eq!(percentile(&[], 95.0), 0.0);
    }

    #[test]
    fn test_percentile_ignores_input_order() {
        assert_eq!(percentile(&[5.0, 1.0, 4.0, 2.0, 3.0], 40.0), 3.0);
    }

    #[test]
    fn test_mean_median_stdev() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx(mean(&v), 5.0));
        assert!(approx(median(&v), 4.5));
        // sample variance = 32 / 7
        assert!(approx(stdev(&v), (32.0f64 / 7.0).sqrt()));
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_empty_and_single_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(stdev(&[]), 0.0);
        assert_eq!(stdev(&[42.0]), 0.0);
        let s = StreamingStats::new();
        assert_eq!(s.min(), 0.0);
        assert_eq!(s.max(), 0.0);
    }

    #[test]
    fn test_latency_stats() {
        assert!(latency_stats(&[]).is_none());
        let l = latency_stats(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(approx(l.total_latency_seconds, 10.0));
        assert!(approx(l.mean_latency_seconds, 2.5));
        assert!(approx(l.median_latency_seconds, 2.5));
        assert_eq!(l.p95_latency_seconds, 4.0);
        assert_eq!(l.p99_latency_seconds, 4.0);
        assert_eq!(l.min_latency_seconds, 1.0);
        assert_eq!(l.max_latency_seconds, 4.0);
    }

    #[test]
    fn test_cost_linearity() {
        let p = Pricing::default();
        assert_eq!(estimate_cost(&p, 1_000_000, 0, 1).total_cost_usd, 0.014);
        assert_eq!(estimate_cost(&p, 0, 1_000_000, 1).total_cost_usd, 0.056);
        let c = estimate_cost(&p, 2_000_000, 1_000_000, 4);
        assert!(approx(c.total_cost_usd, 0.084));
        assert!(approx(c.cost_per_question_usd, 0.021));
    }

    #[test]
    fn test_cost_zero_questions() {
        let c = estimate_cost(&Pricing::default(), 0, 0, 0);
        assert_eq!(c.cost_per_question_usd, 0.0);
        assert_eq!(c.total_cost_usd, 0.0);
        let c = estimate_cost(&Pricing::default(), 500, 500, 0);
        assert_eq!(c.cost_per_question_usd, 0.0);
    }

    #[test]
    fn test_cost_rounded_to_six_decimals() {
        // 7 input tokens = 9.8e-8 USD
        let c = estimate_cost(&Pricing::default(), 7, 0, 1);
        assert_eq!(c.input_cost_usd, 0.0);
        let c = estimate_cost(&Pricing::default(), 100, 0, 1);
        assert_eq!(c.input_cost_usd, 0.000001);
    }

    #[test]
    fn test_token_stats_keeps_reported_totals() {
        let tokens = [TokenMetrics::reported(10, 2, 20), TokenMetrics::new(30, 4)];
        let t = TokenStats::from_tokens(&tokens, 2);
        assert_eq!(t.total_input_tokens, 40);
        assert_eq!(t.total_output_tokens, 6);
        assert_eq!(t.total_tokens, 54);
        assert!(approx(t.mean_input_tokens, 20.0));
        assert!(approx(t.mean_total_tokens, 27.0));
        assert_eq!(TokenStats::from_tokens(&[], 0), TokenStats::default());
    }

    #[test]
    fn test_pricing_partial_override() {
        let p: Pricing = serde_json::from_str(r#"{"output_per_mtok": 1.0}"#).unwrap();
        assert_eq!(p.input_per_mtok, 0.014);
        assert_eq!(p.output_per_mtok, 1.0);
    }
}
