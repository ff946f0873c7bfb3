//! LLM-backed code generation for apidrift
//!
//! Implements [`apidrift_core::CodeGenerator`] on top of the OpenAI
//! chat-completions and Anthropic messages APIs.

pub mod client;
pub mod error;
pub mod fences;
pub mod generator;
pub mod prompts;

pub use client::{ChatClient, LlmConfig};
pub use error::{LlmError, LlmResult};
pub use fences::strip_code_fences;
pub use generator::{LlmGenerator, LlmGeneratorFactory};
pub use prompts::Prompt;
