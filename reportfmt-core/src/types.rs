use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a top-level body block, assigned when a document is loaded.
pub type ParagraphId = Uuid;

// ===== CLASSIFICATION =====

/// Semantic role of a paragraph, derived from its text alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTag {
    ChapterHeading,
    MajorSection,
    SectionHeading,
    SubsectionHeading,
    FigureTableCaption,
    QuoteBlock,
    ListItem,
    Paragraph,
    Empty,
}

impl RoleTag {
    pub const ALL: [RoleTag; 9] = [
        RoleTag::ChapterHeading,
        RoleTag::MajorSection,
        RoleTag::SectionHeading,
        RoleTag::SubsectionHeading,
        RoleTag::FigureTableCaption,
        RoleTag::QuoteBlock,
        RoleTag::ListItem,
        RoleTag::Paragraph,
        RoleTag::Empty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTag::ChapterHeading => "chapter_heading",
            RoleTag::MajorSection => "major_section",
            RoleTag::SectionHeading => "section_heading",
            RoleTag::SubsectionHeading => "subsection_heading",
            RoleTag::FigureTableCaption => "figure_table_caption",
            RoleTag::QuoteBlock => "quote_block",
            RoleTag::ListItem => "list_item",
            RoleTag::Paragraph => "paragraph",
            RoleTag::Empty => "empty",
        }
    }

    /// Chapter, major section, section and subsection headings.
    pub fn is_heading(&self) -> bool {
        matches!(
            self,
            RoleTag::ChapterHeading
                | RoleTag::MajorSection
                | RoleTag::SectionHeading
                | RoleTag::SubsectionHeading
        )
    }

    /// Roles that start a new page and qualify for the section-break discount.
    pub fn is_top_level(&self) -> bool {
        matches!(self, RoleTag::ChapterHeading | RoleTag::MajorSection)
    }

    pub fn description(&self) -> &'static str {
        match self {
            RoleTag::ChapterHeading => "Chapter headings (Chapter 1, CHAPTER 2)",
            RoleTag::MajorSection => "Major sections (1. Introduction)",
            RoleTag::SectionHeading => "Section headings (1.1 Background)",
            RoleTag::SubsectionHeading => "Subsection headings (1.1.1 Problem Statement)",
            RoleTag::FigureTableCaption => "Figure and table captions",
            RoleTag::QuoteBlock => "Quotations and indented blocks",
            RoleTag::ListItem => "Bulleted, numbered and lettered list items",
            RoleTag::Paragraph => "Body paragraphs",
            RoleTag::Empty => "Empty paragraphs",
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== SPACING =====

/// Required spacing around a paragraph, in line-units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacingRule {
    pub before: u32,
    pub after: u32,
}

impl SpacingRule {
    pub const NONE: SpacingRule = SpacingRule { before: 0, after: 0 };

    pub fn new(before: u32, after: u32) -> Self {
        Self { before, after }
    }

    pub fn to_points(&self, points_per_line: f32) -> SpacingPoints {
        SpacingPoints {
            before: self.before as f32 * points_per_line,
            after: self.after as f32 * points_per_line,
        }
    }
}

/// Concrete paragraph spacing in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpacingPoints {
    pub before: f32,
    pub after: f32,
}

// ===== SECTIONS =====

/// How a section starts relative to the previous one (`w:sectPr/w:type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionBreakKind {
    NextPage,
    OddPage,
    EvenPage,
    Continuous,
}

impl SectionBreakKind {
    /// Maps a `w:type` value; an absent type means `nextPage`.
    pub fn from_ooxml(value: Option<&str>) -> Self {
        match value {
            Some("continuous") => SectionBreakKind::Continuous,
            // Column breaks do not force a new page.
            Some("nextColumn") => SectionBreakKind::Continuous,
            Some("oddPage") => SectionBreakKind::OddPage,
            Some("evenPage") => SectionBreakKind::EvenPage,
            _ => SectionBreakKind::NextPage,
        }
    }

    pub fn forces_new_page(&self) -> bool {
        !matches!(self, SectionBreakKind::Continuous)
    }
}

impl fmt::Display for SectionBreakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionBreakKind::NextPage => "next_page",
            SectionBreakKind::OddPage => "odd_page",
            SectionBreakKind::EvenPage => "even_page",
            SectionBreakKind::Continuous => "continuous",
        };
        f.write_str(name)
    }
}

/// A section boundary, anchored on the first paragraph of the new section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionBreak {
    /// Index of the paragraph in the top-level paragraph sequence
    pub index: usize,
    pub paragraph_id: ParagraphId,
    pub kind: SectionBreakKind,
}

// ===== NORMALIZATION REPORT =====

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpacingChange {
    pub from: f32,
    pub to: f32,
}

/// What the spacing pass did to one paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParagraphOutcome {
    Unchanged,
    Respaced {
        before: Option<SpacingChange>,
        after: Option<SpacingChange>,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphReport {
    pub index: usize,
    pub id: ParagraphId,
    pub role: RoleTag,
    pub preview: String,
    /// Target spacing after discount and heading/content coupling
    pub expected: SpacingPoints,
    pub section_break_before: bool,
    pub outcome: ParagraphOutcome,
}

/// A paragraph a structural step (removal, insertion) could not handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedParagraph {
    pub id: ParagraphId,
    pub step: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub paragraphs_removed: usize,
    pub paragraphs_respaced: usize,
    pub page_breaks_inserted: usize,
    pub heading_content_fixed: usize,
    pub section_breaks_discounted: usize,
    pub line_spacing_updated: usize,
    pub skipped: Vec<SkippedParagraph>,
    pub paragraphs: Vec<ParagraphReport>,
    /// Spacing rule applied per role, one line each
    #[serde(default)]
    pub standards: Vec<String>,
}

impl NormalizationReport {
    /// Paragraphs skipped by any step, structural or spacing.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
            + self
                .paragraphs
                .iter()
                .filter(|p| matches!(p.outcome, ParagraphOutcome::Skipped { .. }))
                .count()
    }

    pub fn role_counts(&self) -> Vec<(RoleTag, usize)> {
        RoleTag::ALL
            .iter()
            .map(|role| {
                let count = self.paragraphs.iter().filter(|p| p.role == *role).count();
                (*role, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    pub fn print_summary(&self) {
        println!("📏 Line-break normalization:");
        println!("   - Blank paragraphs removed: {}", self.paragraphs_removed);
        println!("   - Paragraphs re-spaced: {}", self.paragraphs_respaced);
        println!("   - Page breaks inserted: {}", self.page_breaks_inserted);
        println!("   - Heading/content pairs fixed: {}", self.heading_content_fixed);
        println!("   - Section-break discounts: {}", self.section_breaks_discounted);
        if self.line_spacing_updated > 0 {
            println!("   - Line spacing updated: {}", self.line_spacing_updated);
        }
        let skipped = self.skipped_count();
        if skipped > 0 {
            println!("   ⚠️  Skipped paragraphs: {skipped}");
        }
        println!("📋 Content structure:");
        for (role, count) in self.role_counts() {
            println!("   {:.<45} {}", role.description(), count);
        }
        if !self.standards.is_empty() {
            println!("📐 Spacing standards:");
            for line in &self.standards {
                println!("   - {line}");
            }
        }
    }
}

/// Shortened single-line text for reports and log lines.
pub fn text_preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max_chars {
        let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        flat
    }
}
