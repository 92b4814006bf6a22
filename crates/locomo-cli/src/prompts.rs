//! Prompt text and response parsing for both benchmark variants.

use locomo_core::{Category, Message, Snippet};

const ADVERSARIAL_SYSTEM: &str = "You are a helpful assistant. Answer questions based ONLY on the provided context.
If the answer is not found in the context, respond with \"No information available\" or similar.";

const DIRECT_SYSTEM: &str = "You are a helpful assistant. Answer questions based on the provided context.
Provide concise, direct answers without explanation.";

const CHOICE_SYSTEM: &str =
    "You are a helpful assistant. Answer questions based on provided context.";

pub fn free_response_system(category: Category) -> &'static str {
    if category.is_adversarial() {
        ADVERSARIAL_SYSTEM
    } else {
        DIRECT_SYSTEM
    }
}

pub fn free_response_messages(question: &str, context: &str, category: Category) -> Vec<Message> {
    let prompt = format!(
        "Based on the following conversation context, answer the question.

CONTEXT:
{context}

QUESTION: {question}

Provide a concise, direct answer. Do not explain your reasoning."
    );
    vec![
        Message::system(free_response_system(category)),
        Message::user(prompt),
    ]
}

pub fn choice_messages(question: &str, context: &str, choices: &[String]) -> Vec<Message> {
    let choices_text = choices
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{i}. {c}"))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!(
        "You have been given a conversation with specific information. Using that information, answer the following multiple-choice question by returning ONLY the choice index (0-9).

CONTEXT:
{context}

QUESTION: {question}

CHOICES:
{choices_text}

Return ONLY the choice index (0-9), nothing else."
    );
    vec![Message::system(CHOICE_SYSTEM), Message::user(prompt)]
}

/// `[Memory i] content` lines, each followed by its relevance when non-zero.
pub fn format_context(snippets: &[Snippet]) -> String {
    let mut parts = Vec::with_capacity(snippets.len() * 2);
    for (i, s) in snippets.iter().enumerate() {
        parts.push(format!("[Memory {}] {}", i + 1, s.content));
        if s.relevance_score != 0.0 {
            parts.push(format!("(Relevance: {:.2})", s.relevance_score));
        }
    }
    parts.join("\n")
}

/// First digit standing alone as a word, e.g. `"Answer: 3."` -> 3.
/// `"10"` or `"3a"` do not count.
pub fn parse_choice_index(response: &str) -> Option<usize> {
    let chars: Vec<char> = response.chars().collect();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    (0..chars.len()).find_map(|i| {
        let c = chars[i];
        let alone = c.is_ascii_digit()
            && (i == 0 || !is_word(chars[i - 1]))
            && chars.get(i + 1).map_or(true, |&n| !is_word(n));
        if alone {
            c.to_digit(10).map(|d| d as usize)
        } else {
            None
        }
    })
}
