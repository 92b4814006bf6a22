//! Offline re-scoring of a stored free-response summary.
//!
//! Predictions, timings and tokens are kept; only the scorer runs again.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use locomo_core::QuestionResult;
use locomo_metrics::FrMetricsTracker;
use locomo_score::Scorer;

/// The parts of a stored summary needed to re-score it.
#[derive(Debug, Deserialize)]
pub struct StoredRun {
    #[serde(default)]
    pub dataset: String,
    #[serde(default)]
    pub dataset_sha256: Option<String>,
    pub results: Vec<QuestionResult>,
}

pub fn load_stored_run(path: &Path) -> Result<StoredRun> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn rescore_one(scorer: &Scorer, stored: &QuestionResult) -> QuestionResult {
    let evaluation = scorer.evaluate(&stored.prediction, &stored.ground_truth, stored.category);
    QuestionResult::from_evaluation(
        &stored.question_id,
        &stored.question_text,
        &stored.ground_truth,
        &stored.prediction,
        evaluation,
        stored.tokens,
        stored.timings,
    )
    .with_category_label(stored.category_label.clone())
}

/// Re-evaluate every stored result on `workers` threads. The returned tracker
/// holds results in their original order whatever the interleaving was.
pub fn rescore(
    stored: &[QuestionResult],
    scorer: &Scorer,
    tracker: FrMetricsTracker,
    workers: usize,
) -> FrMetricsTracker {
    let workers = workers.max(1).min(stored.len().max(1));
    let next = AtomicUsize::new(0);
    let shared = Mutex::new(tracker);

    std::thread::scope(|s| {
        for w in 0..workers {
            let next = &next;
            let shared = &shared;
            s.spawn(move || {
                let mut done = 0usize;
                loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(stored) = stored.get(i) else {
                        break;
                    };
                    let result = rescore_one(scorer, stored);
                    shared
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .add_result(result);
                    done += 1;
                }
                debug!("rescore worker {w} scored {done} results");
            });
        }
    });

    let tracker = shared.into_inner().unwrap_or_else(PoisonError::into_inner);
    restore_order(stored, tracker)
}

/// Put results back in `stored` order. Duplicate ids keep their relative order.
fn restore_order(stored: &[QuestionResult], mut tracker: FrMetricsTracker) -> FrMetricsTracker {
    let mut slots: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, r) in stored.iter().enumerate().rev() {
        slots.entry(r.question_id.as_str()).or_default().push(i);
    }

    let mut ordered: Vec<Option<QuestionResult>> = vec![None; stored.len()];
    let mut extra = Vec::new();
    for result in tracker.take_results() {
        match slots
            .get_mut(result.question_id.as_str())
            .and_then(Vec::pop)
        {
            Some(i) => ordered[i] = Some(result),
            None => extra.push(result),
        }
    }
    for result in ordered.into_iter().flatten().chain(extra) {
        tracker.add_result(result);
    }
    tracker
}
