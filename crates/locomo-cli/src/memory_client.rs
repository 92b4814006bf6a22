//! REST client for the memory store under test.
//!
//! Endpoints (relative to the API base URL):
//! - `GET /health`
//! - `POST /memories` (one call per conversation turn)
//! - `POST /memories/search`
//! - `DELETE /memories/{id}`
//!
//! Every response is wrapped as `{"success": bool, "data": ...}`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use locomo_core::{BenchError, BenchResult, MemoryBackend, Message, Snippet};

/// Upper bound on memories fetched when clearing a session.
const CLEAR_LIMIT: usize = 1000;

pub struct HttpMemoryClient {
    agent: ureq::Agent,
    base_url: String,
    domain: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Health {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: Option<String>,
    summary: Option<String>,
    content: Option<String>,
    relevance_score: Option<f64>,
    memory: Option<Created>,
}

impl SearchHit {
    fn memory_id(&self) -> Option<&str> {
        self.memory
            .as_ref()
            .and_then(|m| m.id.as_deref())
            .or(self.id.as_deref())
    }
}

impl HttpMemoryClient {
    pub fn new(base_url: &str, domain: &str, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            domain: domain.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> BenchResult<T> {
        let resp = self
            .agent
            .post(&self.url(path))
            .send_json(body)
            .map_err(http_error)?;
        resp.into_json().map_err(|e| {
            BenchError::Collaborator(format!("malformed response from {path}: {e}"))
        })
    }

    fn search(&self, body: serde_json::Value) -> BenchResult<Vec<SearchHit>> {
        let env: Envelope<Vec<SearchHit>> = self.post("/memories/search", body)?;
        Ok(env.data.unwrap_or_default())
    }
}

impl MemoryBackend for HttpMemoryClient {
    fn health(&self) -> bool {
        let resp = match self.agent.get(&self.url("/health")).call() {
            Ok(r) => r,
            Err(e) => {
                warn!("health check failed: {}", http_error(e));
                return false;
            }
        };
        match resp.into_json::<Envelope<Health>>() {
            Ok(env) => env.success && env.data.is_some_and(|h| h.status == "healthy"),
            Err(e) => {
                warn!("health check returned malformed body: {e}");
                false
            }
        }
    }

    fn ingest(&self, messages: &[Message], session_id: &str) -> BenchResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut last_error = None;
        for (i, msg) in messages.iter().enumerate() {
            if msg.content.trim().is_empty() {
                continue;
            }
            let body = json!({
                "content": msg.content,
                "importance": 5,
                "tags": [
                    msg.role,
                    "conversation-turn",
                    format!("position-{i}"),
                    format!("session-{session_id}"),
                ],
                "domain": self.domain,
                "source": format!("locomo-{session_id}-turn-{i}"),
            });
            match self.post::<Envelope<Created>>("/memories", body) {
                Ok(env) if env.success => {
                    if let Some(id) = env.data.and_then(|d| d.id) {
                        ids.push(id);
                    }
                }
                Ok(_) => debug!("memory store rejected turn {i} of {session_id}"),
                Err(e) => {
                    warn!("failed to ingest turn {i} of {session_id}: {e}");
                    last_error = Some(e);
                }
            }
        }
        // Nothing stored and at least one transport failure: let the caller retry.
        match last_error {
            Some(e) if ids.is_empty() => Err(e),
            _ => Ok(ids),
        }
    }

    fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        min_similarity: f64,
    ) -> BenchResult<Vec<Snippet>> {
        let hits = self.search(json!({
            "query": query,
            "limit": top_k,
            "use_ai": true,
            "response_format": "concise",
            "min_similarity": min_similarity,
        }))?;
        Ok(hits
            .into_iter()
            .map(|h| Snippet {
                content: h.summary.or(h.content).unwrap_or_default(),
                relevance_score: h.relevance_score.unwrap_or(0.0),
            })
            .collect())
    }

    fn clear(&self, session_id: &str) -> BenchResult<usize> {
        let hits = self.search(json!({
            "query": format!("session-{session_id}"),
            "limit": CLEAR_LIMIT,
        }))?;
        let mut deleted = 0;
        for id in hits.iter().filter_map(SearchHit::memory_id) {
            match self.agent.delete(&self.url(&format!("/memories/{id}"))).call() {
                Ok(_) => deleted += 1,
                Err(e) => warn!("failed to delete memory {id}: {}", http_error(e)),
            }
        }
        Ok(deleted)
    }
}

fn http_error(e: ureq::Error) -> BenchError {
    match e {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            BenchError::Collaborator(format!("HTTP {code}: {body}"))
        }
        ureq::Error::Transport(t) => BenchError::Collaborator(t.to_string()),
    }
}
