use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::category::Category;

/// One chat turn, used both for memory ingestion and LLM prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// Where the answering context for a question comes from.
#[derive(Debug, Clone)]
pub enum ContextSource {
    /// Raw conversation turns, ingested into the memory store before retrieval.
    /// Shared by every question of the same conversation.
    Conversation(Arc<Vec<Message>>),
    /// Snippets that were retrieved ahead of time; the memory store is skipped.
    Snippets(Vec<String>),
}

impl ContextSource {
    pub fn messages(&self) -> &[Message] {
        match self {
            Self::Conversation(messages) => messages,
            Self::Snippets(_) => &[],
        }
    }
}

impl Default for ContextSource {
    fn default() -> Self {
        Self::Conversation(Arc::new(Vec::new()))
    }
}

/// One evaluable free-response question. Built once by the loader, never mutated.
#[derive(Debug, Clone)]
pub struct QuestionRecord {
    pub question_id: String,
    /// Memory session key; records of one conversation share it.
    pub session_id: String,
    pub question: String,
    pub category: Category,
    /// The dataset's category value as given, kept when it is not recognized.
    pub category_label: Option<String>,
    pub ground_truth: String,
    pub evidence: Vec<String>,
    pub context: ContextSource,
}

/// One multiple-choice question (LoCoMo-MC10).
#[derive(Debug, Clone)]
pub struct ChoiceQuestion {
    pub question_id: String,
    pub session_id: String,
    pub question: String,
    pub question_type: String,
    pub choices: Vec<String>,
    pub correct_choice_index: Option<usize>,
    pub context: ContextSource,
}
