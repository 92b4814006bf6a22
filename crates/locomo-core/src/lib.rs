pub mod category;
pub mod error;
pub mod llm;
pub mod memory;
pub mod question;
pub mod result;

pub use category::Category;
pub use error::{BenchError, BenchResult};
pub use llm::{Completion, LlmBackend};
pub use memory::{MemoryBackend, Snippet};
pub use question::{ChoiceQuestion, ContextSource, Message, QuestionRecord};
pub use result::{
    clamp_score, ChoiceResult, EvalMethod, Evaluation, QuestionResult, Timings, TokenMetrics,
};
