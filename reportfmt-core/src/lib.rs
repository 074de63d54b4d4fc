// reportfmt Core Library
//
// Normalizes and formats .docx internship reports against a fixed template:
// role classification, vertical spacing, page breaks, styles and an
// academic-language pass. Main interface is DocumentProcessor.

pub mod classifier;
pub mod config;
pub mod docx;
pub mod error;
pub mod language;
pub mod processor;
pub mod rules;
pub mod types;

// Re-export main types and functions for easy use
pub use classifier::{classify, ContentClassifier};
pub use config::FormatterConfig;
pub use docx::Document;
pub use error::{DocxError, InputError};
pub use processor::{
    default_output_path, validate_input, Action, DocumentProcessor, ProcessingOptions,
    ProcessingSummary,
};
pub use rules::{
    breaks_before, enumerate_breaks, page_break_before, rule_for, Normalizer, RuleEngine,
    SectionBreaks, SpacingTable, Stage, StageReport,
};
pub use types::*;
