pub mod normalize;
pub mod porter;
pub mod scorer;

pub use normalize::{normalize, tokenize_and_stem};
pub use porter::stem;
pub use scorer::{f1_score, is_no_information_answer, multi_hop_f1, Scorer, SingleHopMode};
