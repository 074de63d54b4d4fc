use super::engine::{DocumentRule, StageReport};
use super::normalizer::Normalizer;
use super::section_breaks::enumerate_breaks;
use crate::classifier::ContentClassifier;
use crate::config::PageBreakConfig;
use crate::docx::{Document, Paragraph};
use crate::types::{text_preview, NormalizationReport, SectionBreak, SkippedParagraph};
use anyhow::Result;
use serde::Serialize;

/// Where the document breaks pages, at one point in time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BreakInventory {
    /// Indices of paragraphs holding a manual page break
    pub page_breaks: Vec<usize>,
    pub section_breaks: Vec<SectionBreak>,
    /// Chapter and major-section headings with their indices
    pub chapters: Vec<(usize, String)>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PageBreakReport {
    pub before: BreakInventory,
    pub removed: usize,
    pub skipped: Vec<SkippedParagraph>,
    /// Blank-run collapse and page-break insertion
    pub normalization: NormalizationReport,
    pub after: BreakInventory,
}

impl PageBreakReport {
    pub fn print_summary(&self) {
        println!("📄 Page-break cleanup:");
        println!(
            "   - Manual page breaks: {} → {}",
            self.before.page_breaks.len(),
            self.after.page_breaks.len()
        );
        println!("   - Section breaks: {}", self.after.section_breaks.len());
        println!("   - Unnecessary breaks removed: {}", self.removed);
        println!(
            "   - Blank paragraphs removed: {}",
            self.normalization.paragraphs_removed
        );
        println!(
            "   - Page breaks inserted: {}",
            self.normalization.page_breaks_inserted
        );
        let skipped = self.skipped.len() + self.normalization.skipped.len();
        if skipped > 0 {
            println!("   ⚠️  Skipped paragraphs: {skipped}");
        }
        for (index, heading) in &self.after.chapters {
            println!("   📑 {:>4}: {}", index, heading);
        }
    }
}

/// Removes manual page breaks that do not lead into a chapter, then lets the
/// normalizer collapse blank runs and add the breaks chapters are missing.
pub struct PageBreakCleanup<'a> {
    classifier: &'a ContentClassifier,
    config: &'a PageBreakConfig,
    normalizer: Normalizer<'a>,
}

impl<'a> PageBreakCleanup<'a> {
    pub fn new(
        classifier: &'a ContentClassifier,
        config: &'a PageBreakConfig,
        normalizer: Normalizer<'a>,
    ) -> Self {
        Self {
            classifier,
            config,
            normalizer,
        }
    }

    pub fn inventory(&self, document: &Document) -> BreakInventory {
        let mut inventory = BreakInventory {
            section_breaks: enumerate_breaks(document),
            ..BreakInventory::default()
        };
        for (index, paragraph) in document.paragraphs().enumerate() {
            if paragraph.has_page_break() {
                inventory.page_breaks.push(index);
            }
            let text = paragraph.text();
            if self.classifier.classify(&text).is_top_level() {
                inventory.chapters.push((index, text_preview(&text, 60)));
            }
        }
        inventory
    }

    /// Chapter or major heading, or the title of a preliminary section.
    pub fn starts_new_page(&self, text: &str) -> bool {
        if self.classifier.classify(text).is_top_level() {
            return true;
        }
        let lower = text.trim().to_lowercase();
        self.config
            .preliminary_sections
            .iter()
            .any(|title| lower.starts_with(title.as_str()))
    }

    pub fn remove_unnecessary_breaks(&self, document: &mut Document, report: &mut PageBreakReport) {
        let paragraphs: Vec<Paragraph> = document.paragraphs().collect();
        let mut doomed = Vec::new();

        for (index, paragraph) in paragraphs.iter().enumerate() {
            if !paragraph.is_page_break_only() {
                continue;
            }
            let end = (index + 1 + self.config.heading_lookahead).min(paragraphs.len());
            let next_text = paragraphs[index + 1..end]
                .iter()
                .map(|p| p.text())
                .find(|text| !text.trim().is_empty());
            let needed = next_text.is_some_and(|text| self.starts_new_page(&text));
            if !needed {
                log::debug!("Removing page break at paragraph {index}");
                doomed.push(paragraph.id());
            }
        }

        for id in doomed {
            match document.remove_paragraph(id) {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    log::warn!("page_break_cleanup: skipping paragraph {id}: {e}");
                    report.skipped.push(SkippedParagraph {
                        id,
                        step: "page_break_cleanup".to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    pub fn clean(&self, document: &mut Document) -> PageBreakReport {
        let mut report = PageBreakReport {
            before: self.inventory(document),
            ..PageBreakReport::default()
        };

        self.remove_unnecessary_breaks(document, &mut report);
        self.normalizer
            .collapse_blank_runs(document, &mut report.normalization);
        if self.normalizer.inserts_page_breaks() {
            self.normalizer
                .insert_page_breaks(document, &mut report.normalization);
        }

        report.after = self.inventory(document);
        report
    }
}

impl DocumentRule for PageBreakCleanup<'_> {
    fn apply(&self, document: &mut Document) -> Result<StageReport> {
        Ok(StageReport::PageBreaks(self.clean(document)))
    }

    fn name(&self) -> &str {
        "PageBreaks"
    }
}
