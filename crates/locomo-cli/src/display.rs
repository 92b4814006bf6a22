//! Console rendering: one progress line per question and end-of-run tables.

use locomo_core::{ChoiceResult, QuestionResult};
use locomo_metrics::LatencyStats;

use crate::output::{FrSummary, McSummary};

const WIDTH: usize = 70;

fn double_rule() -> String {
    "\u{2550}".repeat(WIDTH)
}

fn rule() -> String {
    "\u{2500}".repeat(WIDTH)
}

fn row(label: &str, value: impl std::fmt::Display) -> String {
    format!("{:<40} {:>12}", label, value.to_string())
}

fn fmt_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1000 {
        format!("{:.1}k", n as f64 / 1000.0)
    } else {
        format!("{n}")
    }
}

fn fmt_cost(c: f64) -> String {
    format!("${c:.4}")
}

fn fmt_secs(s: f64) -> String {
    format!("{s:.2}s")
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

pub fn fr_progress_line(index: usize, total: usize, r: &QuestionResult) -> String {
    format!(
        "[{index:>4}/{total}] {:<18} {:<12} F1 {:.3} ({})  tokens {}/{}  {}",
        truncate_chars(&r.question_id, 18),
        r.category.name(),
        r.score,
        r.evaluation_method.as_str(),
        r.tokens.input_tokens,
        r.tokens.output_tokens,
        fmt_secs(r.timings.end_to_end_latency),
    )
}

pub fn mc_progress_line(index: usize, total: usize, r: &ChoiceResult) -> String {
    let idx = |i: Option<usize>| i.map_or_else(|| "-".to_string(), |i| i.to_string());
    format!(
        "[{index:>4}/{total}] {:<18} {:<12} {} (pred {} / gold {})  tokens {}/{}  {}",
        truncate_chars(&r.question_id, 18),
        truncate_chars(&r.question_type, 12),
        if r.is_correct { "OK  " } else { "MISS" },
        idx(r.predicted_choice_index),
        idx(r.correct_choice_index),
        r.tokens.input_tokens,
        r.tokens.output_tokens,
        fmt_secs(r.timings.end_to_end_latency),
    )
}

fn latency_rows(lines: &mut Vec<String>, label: &str, stats: Option<&LatencyStats>) {
    let Some(s) = stats else {
        lines.push(row(label, "n/a"));
        return;
    };
    lines.push(row(&format!("{label} mean"), fmt_secs(s.mean_latency_seconds)));
    lines.push(row(&format!("{label} p50"), fmt_secs(s.median_latency_seconds)));
    lines.push(row(&format!("{label} p95"), fmt_secs(s.p95_latency_seconds)));
    lines.push(row(&format!("{label} p99"), fmt_secs(s.p99_latency_seconds)));
}

pub fn fr_summary_table(summary: &FrSummary) -> String {
    let m = &summary.metrics;
    let mut lines = vec![
        String::new(),
        format!(
            "LoCoMo Free-Response ({} questions, {:.1}s)",
            summary.total_questions, summary.total_time_seconds
        ),
        double_rule(),
        row("Mean F1", format!("{:.3}", m.overall.mean_f1)),
        row("Median F1", format!("{:.3}", m.overall.median_f1)),
        row("Std dev F1", format!("{:.3}", m.overall.stdev_f1)),
        row(
            "Accuracy (excl. adversarial)",
            format!(
                "{:.1}%",
                m.accuracy_by_category.overall_excluding_adversarial.accuracy * 100.0
            ),
        ),
        rule(),
    ];
    latency_rows(&mut lines, "End-to-end", m.latency.as_ref());
    latency_rows(&mut lines, "Retrieval", m.retrieval_latency.as_ref());
    lines.push(rule());
    lines.push(row(
        "Tokens (in/out)",
        format!(
            "{}/{}",
            fmt_tokens(m.tokens.total_input_tokens),
            fmt_tokens(m.tokens.total_output_tokens)
        ),
    ));
    lines.push(row("Estimated cost", fmt_cost(m.cost_estimation.total_cost_usd)));
    lines.push(rule());
    lines.push(format!(
        "{:<28} {:>6} {:>10} {:>10} {:>12}",
        "Category", "Count", "Mean F1", "Median", "Mean lat."
    ));
    for cm in summary.breakdown.values() {
        let label = if cm.labels.is_empty() {
            cm.category_display.clone()
        } else {
            format!("{} ({})", cm.category_display, cm.labels.join(", "))
        };
        lines.push(format!(
            "{:<28} {:>6} {:>10.3} {:>10.3} {:>12}",
            truncate_chars(&label, 28),
            cm.total,
            cm.f1.mean,
            cm.f1.median,
            cm.latency
                .as_ref()
                .map_or_else(|| "n/a".to_string(), |l| fmt_secs(l.mean_latency_seconds)),
        ));
    }
    lines.push(double_rule());
    lines.push(format!(
        "Low scores (< {}): {} ({:.1}%)",
        summary.analysis.threshold,
        summary.analysis.total_low_scores,
        summary.analysis.low_score_rate_pct
    ));
    lines.join("\n")
}

pub fn mc_summary_table(summary: &McSummary) -> String {
    let m = &summary.metrics;
    let mut lines = vec![
        String::new(),
        format!(
            "LoCoMo Multiple-Choice ({} questions, {:.1}s)",
            summary.total_questions, summary.total_time_seconds
        ),
        double_rule(),
        row(
            "Correct",
            format!(
                "{}/{}",
                m.overall.correct_predictions, m.overall.total_questions
            ),
        ),
        row("Accuracy", format!("{:.1}%", m.overall.accuracy_pct)),
        rule(),
    ];
    latency_rows(&mut lines, "End-to-end", m.latency.as_ref());
    latency_rows(&mut lines, "Retrieval", m.retrieval_latency.as_ref());
    lines.push(rule());
    lines.push(row(
        "Tokens (in/out)",
        format!(
            "{}/{}",
            fmt_tokens(m.tokens.total_input_tokens),
            fmt_tokens(m.tokens.total_output_tokens)
        ),
    ));
    lines.push(row("Estimated cost", fmt_cost(m.cost_estimation.total_cost_usd)));
    lines.push(rule());
    lines.push(format!(
        "{:<28} {:>6} {:>10} {:>12}",
        "Question type", "Count", "Correct", "Accuracy"
    ));
    for (qtype, tm) in &summary.breakdown {
        lines.push(format!(
            "{:<28} {:>6} {:>10} {:>11.1}%",
            truncate_chars(qtype, 28),
            tm.total,
            tm.correct,
            tm.accuracy_pct
        ));
    }
    lines.push(double_rule());
    lines.push(format!(
        "Errors: {} ({:.1}%)",
        summary.analysis.total_errors, summary.analysis.error_rate_pct
    ));
    lines.join("\n")
}
