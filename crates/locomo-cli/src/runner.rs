//! Benchmark run loops.
//!
//! Records are processed strictly in the order given. Collaborator failures
//! never abort a run: a failed retrieval becomes an empty context and a failed
//! completion becomes an empty prediction with zero tokens, so every record
//! produces exactly one result.

use std::time::Instant;

use tracing::{debug, info, warn};

use locomo_core::{
    ChoiceQuestion, ChoiceResult, Completion, ContextSource, LlmBackend, MemoryBackend, Message,
    QuestionRecord, QuestionResult, Snippet, Timings,
};
use locomo_metrics::{ChoiceMetricsTracker, FrMetricsTracker};
use locomo_score::Scorer;

use crate::config::Config;
use crate::prompts;
use crate::retry::RetryPolicy;

/// Knobs for one run, resolved from config.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub top_k: usize,
    pub min_similarity: f64,
    pub choice_min_similarity: f64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub choice_max_tokens: u32,
    pub clear_sessions: bool,
}

impl RunSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            top_k: cfg.memory.top_k,
            min_similarity: cfg.memory.min_similarity,
            choice_min_similarity: cfg.memory.choice_min_similarity,
            temperature: cfg.llm.temperature,
            max_tokens: cfg.llm.max_tokens,
            choice_max_tokens: cfg.llm.choice_max_tokens,
            clear_sessions: cfg.run.clear_sessions,
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Called after each record with (1-based index, total, result).
pub type Progress<'p, R> = &'p mut dyn FnMut(usize, usize, &R);

pub struct Runner<'a> {
    memory: &'a dyn MemoryBackend,
    llm: &'a dyn LlmBackend,
    retry: RetryPolicy,
    settings: RunSettings,
}

/// Outcome of the context step: formatted context and retrieval seconds.
struct Context {
    text: String,
    retrieval_seconds: f64,
}

impl<'a> Runner<'a> {
    pub fn new(
        memory: &'a dyn MemoryBackend,
        llm: &'a dyn LlmBackend,
        retry: RetryPolicy,
        settings: RunSettings,
    ) -> Self {
        Self {
            memory,
            llm,
            retry,
            settings,
        }
    }

    /// Free-response loop. Consecutive records of one conversation share a
    /// single memory session, ingested once.
    pub fn run_free_response(
        &self,
        records: &[QuestionRecord],
        scorer: &Scorer,
        tracker: &mut FrMetricsTracker,
        progress: Progress<'_, QuestionResult>,
    ) {
        let total = records.len();
        let mut current: Option<String> = None;

        for (i, record) in records.iter().enumerate() {
            let context = match &record.context {
                ContextSource::Conversation(messages) => {
                    let session = format!("locomo-fr-{}", record.session_id);
                    if current.as_deref() != Some(session.as_str()) {
                        if let Some(previous) = current.take() {
                            self.finish_session(&previous);
                        }
                        self.ingest(messages, &session);
                        current = Some(session);
                    }
                    self.retrieve(
                        &record.question,
                        self.settings.top_k,
                        self.settings.min_similarity,
                    )
                }
                ContextSource::Snippets(snippets) => Context {
                    text: provided_context(snippets),
                    retrieval_seconds: 0.0,
                },
            };

            let messages =
                prompts::free_response_messages(&record.question, &context.text, record.category);
            let (completion, llm_seconds) = self.complete(&messages, self.settings.max_tokens);

            let evaluation =
                scorer.evaluate(&completion.text, &record.ground_truth, record.category);
            let result = QuestionResult::from_evaluation(
                &record.question_id,
                &record.question,
                &record.ground_truth,
                completion.text,
                evaluation,
                completion.tokens,
                Timings::new(context.retrieval_seconds, llm_seconds),
            )
            .with_category_label(record.category_label.clone());
            progress(i + 1, total, &result);
            tracker.add_result(result);
        }

        if let Some(last) = current {
            self.finish_session(&last);
        }
        info!("free-response run finished: {} results", tracker.len());
    }

    /// Multiple-choice loop. Every question carries its own haystack, so each
    /// one gets a fresh session.
    pub fn run_multiple_choice(
        &self,
        questions: &[ChoiceQuestion],
        tracker: &mut ChoiceMetricsTracker,
        progress: Progress<'_, ChoiceResult>,
    ) {
        let total = questions.len();
        for (i, q) in questions.iter().enumerate() {
            let context = match &q.context {
                ContextSource::Conversation(messages) => {
                    let session = format!("locomo-mc-{}", q.session_id);
                    self.ingest(messages, &session);
                    let ctx = self.retrieve(
                        &q.question,
                        self.settings.top_k,
                        self.settings.choice_min_similarity,
                    );
                    self.finish_session(&session);
                    ctx
                }
                ContextSource::Snippets(snippets) => Context {
                    text: provided_context(snippets),
                    retrieval_seconds: 0.0,
                },
            };

            let messages = prompts::choice_messages(&q.question, &context.text, &q.choices);
            let (completion, llm_seconds) =
                self.complete(&messages, self.settings.choice_max_tokens);
            let predicted = prompts::parse_choice_index(&completion.text);
            if predicted.is_none() {
                debug!("{}: no choice index in {:?}", q.question_id, completion.text);
            }

            let result = ChoiceResult::new(
                &q.question_id,
                &q.question,
                &q.question_type,
                q.correct_choice_index,
                predicted,
                completion.tokens,
                Timings::new(context.retrieval_seconds, llm_seconds),
            );
            progress(i + 1, total, &result);
            tracker.add_result(result);
        }
        info!("multiple-choice run finished: {} results", tracker.len());
    }

    fn ingest(&self, messages: &[Message], session: &str) {
        if messages.is_empty() {
            return;
        }
        match self
            .retry
            .run("ingest", || self.memory.ingest(messages, session))
        {
            Ok(ids) => debug!("ingested {} of {} turns into {session}", ids.len(), messages.len()),
            Err(e) => warn!("ingest into {session} failed, continuing without it: {e}"),
        }
    }

    /// Only the successful attempt is timed; failed attempts and backoff
    /// sleeps are not retrieval latency.
    fn retrieve(&self, query: &str, top_k: usize, min_similarity: f64) -> Context {
        let attempt = self.retry.run("retrieve", || {
            let start = Instant::now();
            self.memory
                .retrieve(query, top_k, min_similarity)
                .map(|snippets| (snippets, start.elapsed().as_secs_f64()))
        });
        match attempt {
            Ok((snippets, seconds)) => Context {
                text: prompts::format_context(&snippets),
                retrieval_seconds: seconds,
            },
            Err(e) => {
                warn!("retrieval failed, answering without context: {e}");
                Context {
                    text: String::new(),
                    retrieval_seconds: 0.0,
                }
            }
        }
    }

    /// Returns the completion and its latency; a failure is an empty
    /// completion with nothing measured. The collaborator's own latency wins
    /// over the locally timed successful attempt.
    fn complete(&self, messages: &[Message], max_tokens: u32) -> (Completion, f64) {
        let attempt = self.retry.run("completion", || {
            let start = Instant::now();
            self.llm
                .complete(messages, self.settings.temperature, max_tokens)
                .map(|c| (c, start.elapsed().as_secs_f64()))
        });
        match attempt {
            Ok((c, measured)) => {
                let seconds = if c.latency_seconds > 0.0 {
                    c.latency_seconds
                } else {
                    measured
                };
                (c, seconds)
            }
            Err(e) => {
                warn!("completion failed, scoring an empty prediction: {e}");
                (Completion::default(), 0.0)
            }
        }
    }

    /// Best-effort eviction; never retried, never fatal.
    fn finish_session(&self, session: &str) {
        if !self.settings.clear_sessions {
            return;
        }
        match self.memory.clear(session) {
            Ok(n) => debug!("cleared {n} memories from {session}"),
            Err(e) => warn!("failed to clear {session}: {e}"),
        }
    }
}

fn provided_context(snippets: &[String]) -> String {
    let snippets: Vec<Snippet> = snippets
        .iter()
        .map(|s| Snippet {
            content: s.clone(),
            relevance_score: 0.0,
        })
        .collect();
    prompts::format_context(&snippets)
}
