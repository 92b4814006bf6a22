//! Category-aware answer scoring.
//!
//! - adversarial: binary, 1.0 when the prediction abstains
//! - multi-hop: best-match token F1 per ground-truth fragment, averaged
//! - everything else: token F1, optionally max over prediction fragments

use std::collections::HashMap;

use serde::Deserialize;

use locomo_core::{Category, EvalMethod, Evaluation};

use crate::normalize::{normalize, tokenize_and_stem};

/// Phrases that count as a correct abstention on adversarial questions.
pub const NO_INFO_PHRASES: &[&str] = &[
    "no information available",
    "not mentioned",
    "cannot be determined",
    "not specified",
    "no evidence",
    "unknown",
    "not provided",
    "no data",
    "cannot determine",
    "not stated",
];

/// How non multi-hop, non adversarial categories are scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleHopMode {
    /// Plain token F1 on the whole strings.
    #[default]
    Plain,
    /// Split the prediction on commas and keep the best fragment's F1.
    MaxOverFragments,
}

#[derive(Debug, Clone, Default)]
pub struct Scorer {
    single_hop: SingleHopMode,
}

impl Scorer {
    pub fn new(single_hop: SingleHopMode) -> Self {
        Self { single_hop }
    }

    pub fn single_hop_mode(&self) -> SingleHopMode {
        self.single_hop
    }

    /// Score and method for one answer. Total: never fails, always in [0, 1].
    pub fn score(
        &self,
        prediction: &str,
        ground_truth: &str,
        category: Category,
    ) -> (f64, EvalMethod) {
        match category {
            Category::Adversarial => {
                let score = if is_no_information_answer(prediction) {
                    1.0
                } else {
                    0.0
                };
                (score, EvalMethod::AdversarialBinary)
            }
            Category::MultiHop => (multi_hop_f1(prediction, ground_truth), EvalMethod::MultiHopF1),
            _ => match self.single_hop {
                SingleHopMode::Plain => (f1_score(prediction, ground_truth), EvalMethod::F1),
                SingleHopMode::MaxOverFragments => {
                    (max_fragment_f1(prediction, ground_truth), EvalMethod::MaxF1Multi)
                }
            },
        }
    }

    pub fn evaluate(
        &self,
        prediction: &str,
        ground_truth: &str,
        category: Category,
    ) -> Evaluation {
        let (score, method) = self.score(prediction, ground_truth, category);
        Evaluation {
            score,
            method,
            normalized_prediction: normalize(prediction),
            normalized_ground_truth: normalize(ground_truth),
            category,
            category_name: category.name(),
        }
    }
}

/// Token-level F1 over stemmed multisets.
///
/// Both empty is a vacuous match (1.0); exactly one empty is 0.0.
pub fn f1_score(prediction: &str, ground_truth: &str) -> f64 {
    let pred_tokens = tokenize_and_stem(prediction);
    let gold_tokens = tokenize_and_stem(ground_truth);
    let pred = bag(&pred_tokens);
    let gold = bag(&gold_tokens);

    if pred.is_empty() || gold.is_empty() {
        return if pred.is_empty() && gold.is_empty() {
            1.0
        } else {
            0.0
        };
    }

    let common: usize = pred
        .iter()
        .map(|(token, &n)| n.min(gold.get(token).copied().unwrap_or(0)))
        .sum();

    let precision = common as f64 / pred.values().sum::<usize>() as f64;
    let recall = common as f64 / gold.values().sum::<usize>() as f64;
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

/// Mean over ground-truth fragments of the best F1 against any prediction
/// fragment. Falls back to plain F1 when either side has no fragments.
pub fn multi_hop_f1(prediction: &str, ground_truth: &str) -> f64 {
    let predictions = fragments(prediction);
    let ground_truths = fragments(ground_truth);

    if predictions.is_empty() || ground_truths.is_empty() {
        return f1_score(prediction, ground_truth);
    }

    let total: f64 = ground_truths
        .iter()
        .map(|gt| {
            predictions
                .iter()
                .map(|p| f1_score(p, gt))
                .fold(0.0, f64::max)
        })
        .sum();
    total / ground_truths.len() as f64
}

fn max_fragment_f1(prediction: &str, ground_truth: &str) -> f64 {
    let predictions = fragments(prediction);
    if predictions.is_empty() {
        return f1_score(prediction, ground_truth);
    }
    predictions
        .iter()
        .map(|p| f1_score(p, ground_truth))
        .fold(0.0, f64::max)
}

/// Case-insensitive substring match against [`NO_INFO_PHRASES`].
pub fn is_no_information_answer(prediction: &str) -> bool {
    let lower = prediction.to_lowercase();
    NO_INFO_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

fn fragments(text: &str) -> Vec<&str> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn bag(tokens: &[String]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_f1_exact_and_vacuous() {
        assert_eq!(f1_score("Paris", "Paris"), 1.0);
        assert_eq!(f1_score("The Eiffel Tower", "Eiffel Tower"), 1.0);
        assert_eq!(f1_score("", ""), 1.0);
        assert_eq!(f1_score("the", "a"), 1.0);
        assert_eq!(f1_score("hello", ""), 0.0);
        assert_eq!(f1_score("", "hello"), 0.0);
        assert_eq!(f1_score("London", "Paris"), 0.0);
    }

    #[test]
    fn test_f1_partial_overlap() {
        // 2 common of 4 predicted, 2 of 2 gold
        assert!(approx(f1_score("Eiffel Tower in Paris", "Eiffel Tower"), 2.0 / 3.0));
        // reversed: precision 1, recall 0.5
        assert!(approx(f1_score("Eiffel Tower", "Eiffel Tower in Paris"), 2.0 / 3.0));
    }

    #[test]
    fn test_f1_multiset_counts() {
        // pred {run:2}, gold {run:1}: common 1, p = 0.5, r = 1
        assert!(approx(f1_score("running runs", "run"), 2.0 / 3.0));
    }

    #[test]
    fn test_f1_stemming_matches_inflections() {
        assert_eq!(f1_score("She was running", "she was run"), 1.0);
    }

    #[test]
    fn test_f1_self_match_and_bounds() {
        for s in ["x", "7 May 2023", "Caroline's LGBTQ group", "a, b, c"] {
            let f = f1_score(s, s);
            assert_eq!(f, 1.0, "self F1 for {s:?}");
        }
        let f = f1_score("one two three", "three four");
        assert!((0.0..=1.0).contains(&f));
    }

    #[test]
    fn test_adversarial_binary() {
        let scorer = Scorer::default();
        let e = scorer.evaluate("No information available.", "anything", Category::Adversarial);
        assert_eq!(e.score, 1.0);
        assert_eq!(e.method, EvalMethod::AdversarialBinary);
        let e = scorer.evaluate("Paris", "anything", Category::Adversarial);
        assert_eq!(e.score, 0.0);
        let e = scorer.evaluate("", "", Category::Adversarial);
        assert_eq!(e.score, 0.0);
        assert!(is_no_information_answer("That is NOT MENTIONED anywhere"));
    }

    #[test]
    fn test_multi_hop_order_independent() {
        assert_eq!(multi_hop_f1("1889, Paris", "Paris, 1889"), 1.0);
        let scorer = Scorer::default();
        let e = scorer.evaluate("1889, Paris", "Paris, 1889", Category::MultiHop);
        assert_eq!(e.score, 1.0);
        assert_eq!(e.method, EvalMethod::MultiHopF1);
    }

    #[test]
    fn test_multi_hop_partial_recall() {
        // one of two facts recalled
        assert!(approx(multi_hop_f1("Paris", "Paris, 1889"), 0.5));
    }

    #[test]
    fn test_multi_hop_falls_back_without_fragments() {
        assert_eq!(multi_hop_f1(",", "Paris"), f1_score(",", "Paris"));
        assert_eq!(multi_hop_f1("", ""), 1.0);
    }

    #[test]
    fn test_single_hop_modes() {
        let plain = Scorer::new(SingleHopMode::Plain);
        let e = plain.evaluate("London, Paris", "Paris", Category::SingleHop);
        assert_eq!(e.method, EvalMethod::F1);
        assert!(approx(e.score, 2.0 / 3.0));

        let multi = Scorer::new(SingleHopMode::MaxOverFragments);
        let e = multi.evaluate("London, Paris", "Paris", Category::SingleHop);
        assert_eq!(e.method, EvalMethod::MaxF1Multi);
        assert_eq!(e.score, 1.0);
    }

    #[test]
    fn test_unknown_category_uses_plain_f1() {
        let e = Scorer::default().evaluate("Paris", "Paris", Category::Unknown);
        assert_eq!(e.score, 1.0);
        assert_eq!(e.method, EvalMethod::F1);
        assert_eq!(e.category_name, "unknown");
    }

    #[test]
    fn test_evaluation_carries_normalized_text() {
        let e = Scorer::default().evaluate("The Louvre!", "the louvre", Category::OpenDomain);
        assert_eq!(e.normalized_prediction, "louvre");
        assert_eq!(e.normalized_ground_truth, "louvre");
        assert_eq!(e.category_name, "open_domain");
    }

    #[test]
    fn test_single_hop_mode_from_config_string() {
        let mode: SingleHopMode = serde_json::from_str(r#""max_over_fragments""#).unwrap();
        assert_eq!(mode, SingleHopMode::MaxOverFragments);
    }
}
