use crate::error::BenchResult;
use crate::question::Message;

/// A retrieved context snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub content: String,
    pub relevance_score: f64,
}

/// Memory store the benchmark runs against.
///
/// Elapsed time is measured by the caller around each call.
pub trait MemoryBackend {
    fn health(&self) -> bool;

    /// Store messages under `session_id`; returns the created memory ids.
    fn ingest(&self, messages: &[Message], session_id: &str) -> BenchResult<Vec<String>>;

    fn retrieve(&self, query: &str, top_k: usize, min_similarity: f64)
        -> BenchResult<Vec<Snippet>>;

    /// Delete everything tagged with `session_id`; returns the number deleted.
    fn clear(&self, session_id: &str) -> BenchResult<usize>;
}
