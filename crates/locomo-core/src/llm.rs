use crate::error::BenchResult;
use crate::question::Message;
use crate::result::TokenMetrics;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub tokens: TokenMetrics,
    pub latency_seconds: f64,
}

pub trait LlmBackend {
    fn complete(
        &self,
        messages: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> BenchResult<Completion>;
}
