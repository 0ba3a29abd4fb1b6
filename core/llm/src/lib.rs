//! LLM chat-completion client used for plan synthesis and instruction
//! compilation, plus the strict-JSON extraction contract from spec §4.1.

mod circuit_breaker;
mod client;
mod error;
mod json_extract;

pub use circuit_breaker::CircuitBreaker;
pub use client::{LlmClient, MockLlmClient, OpenRouterClient};
pub use error::{LlmError, LlmResult};
pub use json_extract::extract_json_object;
