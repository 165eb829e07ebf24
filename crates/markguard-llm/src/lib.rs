//! MarkGuard-LLM: external capabilities used by the analysis core
//!
//! ## Layer 1 - External capabilities
//!
//! The core never talks HTTP itself. It depends on four async traits:
//!
//! - `Generator`: free-text generation, optionally grounded on a mark image
//! - `Judge`: structured judgment returning JSON that matches a schema
//! - `Embedder`: text to vector
//! - `CaseLawSearch`: keyword search and detail fetch against a public
//!   case-law service
//!
//! `OpenAiClient` implements the first three against any OpenAI-compatible
//! endpoint; `LawApiClient` implements the last. Scripted fakes live in
//! [`fakes`].

pub mod caselaw;
mod capability;
mod error;
pub mod fakes;
pub mod image;
pub mod openai;

pub use capability::{
    CaseLawSearch, CaseRecord, Detail, Embedder, GenerationRequest, Generator, Judge,
    JudgmentRequest, PromptTask,
};
pub use caselaw::{strip_html, CaseLawConfig, LawApiClient};
pub use error::LlmError;
pub use openai::{LlmConfig, OpenAiClient};

/// Result type for capability calls
pub type LlmResult<T> = std::result::Result<T, LlmError>;
