// Document rules
// Each stage of the pipeline is a DocumentRule over the whole document:
// - engine.rs: RuleEngine, Stage, StageReport
// - spacing.rs: role → spacing table with tolerance
// - section_breaks.rs: section-break enumeration and page-break lookback
// - normalizer.rs: blank runs, page breaks before chapters, spacing pass
// - page_breaks.rs: removal of stray manual page breaks
// - formatting.rs: fonts, alignment, page geometry, tables

pub mod engine;
pub mod formatting;
pub mod normalizer;
pub mod page_breaks;
pub mod section_breaks;
pub mod spacing;

pub use engine::*;
pub use formatting::{FormattingReport, StyleFormatter};
pub use normalizer::Normalizer;
pub use page_breaks::{BreakInventory, PageBreakCleanup, PageBreakReport};
pub use section_breaks::{breaks_before, enumerate_breaks, page_break_before, SectionBreaks};
pub use spacing::{rule_for, SpacingTable};
