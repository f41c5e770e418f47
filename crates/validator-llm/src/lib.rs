// Model-facing side of the data validator: prompt construction, the
// OpenRouter client and verdict parsing.

pub mod client;
pub mod prompt;
pub mod verdict;

pub use client::{ClientSettings, FactChecker, LlmError, OpenRouterClient};
pub use verdict::Verdict;
