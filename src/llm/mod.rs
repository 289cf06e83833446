//! LLM integration for evidence fusion.

mod client;

pub use client::{
    LlmClient, LlmConfig, LlmError, LlmProvider, DEFAULT_FUSION_PROMPT, NOT_SPECIFIED,
};
