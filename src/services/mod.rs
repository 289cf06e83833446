//! Service layer for fichetech.
//!
//! Evidence extraction, fusion and narrative parsing, independent of the
//! CLI and HTTP surfaces.

mod aggregator;
mod fusion;
mod narrative;
mod pipeline;
mod tokenizer;

pub use aggregator::{classify_file, classify_text, EvidenceAggregator};
pub use fusion::{
    ChatRole, ChatTurn, CompletionService, Fusion, FusionOrchestrator, FUSION_ERROR_PREFIX,
};
pub use narrative::{NarrativeParser, ParsedNarrative, TechnicalSheet};
pub use pipeline::{build_ocr_manager, AnalysisPipeline, PipelineError};
pub use tokenizer::important_tokens;
