//! fichetech - product technical sheets from heterogeneous evidence.
//!
//! Photos of rating plates, PDF datasheets, product page links and free-text
//! notes are each turned into text, fused by a completion service into one
//! narrative, and parsed into a structured [`models::ProductSheet`].

pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod scrapers;
pub mod server;
pub mod services;
