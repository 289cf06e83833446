//! Data models for fichetech.

mod evidence;
mod request;
mod sheet;

pub use evidence::{
    EvidenceDetails, EvidenceError, EvidenceItem, EvidenceStatus, SourceKind, UrlInfo,
};
pub use request::{AnalysisRequest, AnalysisResponse, FileReport, InputFile, TextReport};
pub use sheet::ProductSheet;
