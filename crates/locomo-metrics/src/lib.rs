pub mod choice_tracker;
pub mod report;
pub mod stats;
pub mod tracker;

pub use choice_tracker::ChoiceMetricsTracker;
pub use report::{
    AccuracyByCategory, CategoryAccuracy, CategoryMetrics, ChoiceError, ChoiceOverallReport,
    ChoiceSummary, ErrorAnalysis, GroupTokens, LlmLatency, LowScoreAnalysis, LowScoreEntry,
    OverallReport, ScoreStats, ScoreSummary, TypeMetrics,
};
pub use stats::{
    estimate_cost, latency_stats, mean, median, percentile, stdev, CostEstimate, LatencyStats,
    Pricing, StreamingStats, TokenStats,
};
pub use tracker::{FrMetricsTracker, CORRECT_THRESHOLD};
