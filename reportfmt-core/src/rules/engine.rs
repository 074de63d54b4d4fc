use super::formatting::{FormattingReport, StyleFormatter};
use super::normalizer::Normalizer;
use super::page_breaks::{PageBreakCleanup, PageBreakReport};
use super::spacing::SpacingTable;
use crate::classifier::ContentClassifier;
use crate::config::FormatterConfig;
use crate::docx::Document;
use crate::language::{AnalysisReport, AutoFixReport, AutoFixer, DocumentAnalyzer};
use crate::types::NormalizationReport;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::time::{Duration, Instant};

/// A pass over the whole document.
pub trait DocumentRule {
    fn apply(&self, document: &mut Document) -> Result<StageReport>;
    fn name(&self) -> &str;
}

/// Pipeline stages, in the order the `complete` action runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    AutoFix,
    LineBreaks,
    Spacing,
    PageBreaks,
    Format,
    Analyze,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::AutoFix,
        Stage::LineBreaks,
        Stage::Spacing,
        Stage::PageBreaks,
        Stage::Format,
        Stage::Analyze,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::AutoFix => "AutoFix",
            Stage::LineBreaks => "LineBreaks",
            Stage::Spacing => "Spacing",
            Stage::PageBreaks => "PageBreaks",
            Stage::Format => "Format",
            Stage::Analyze => "Analyze",
        }
    }

    pub fn from_name(name: &str) -> Option<Stage> {
        Stage::ALL.iter().copied().find(|stage| stage.name() == name)
    }

    /// Only analysis leaves the document untouched.
    pub fn modifies_document(&self) -> bool {
        !matches!(self, Stage::Analyze)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one stage, serialized into the processing summary.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageReport {
    AutoFix(AutoFixReport),
    LineBreaks(NormalizationReport),
    Spacing(NormalizationReport),
    PageBreaks(PageBreakReport),
    Format(FormattingReport),
    Analyze(AnalysisReport),
}

impl StageReport {
    pub fn stage(&self) -> Stage {
        match self {
            StageReport::AutoFix(_) => Stage::AutoFix,
            StageReport::LineBreaks(_) => Stage::LineBreaks,
            StageReport::Spacing(_) => Stage::Spacing,
            StageReport::PageBreaks(_) => Stage::PageBreaks,
            StageReport::Format(_) => Stage::Format,
            StageReport::Analyze(_) => Stage::Analyze,
        }
    }

    pub fn print_summary(&self) {
        match self {
            StageReport::AutoFix(report) => report.print_summary(),
            StageReport::LineBreaks(report) | StageReport::Spacing(report) => {
                report.print_summary()
            }
            StageReport::PageBreaks(report) => report.print_summary(),
            StageReport::Format(report) => report.print_summary(),
            StageReport::Analyze(report) => report.print_summary(),
        }
    }
}

/// Runs stages against a document, sharing one classifier and spacing table.
pub struct RuleEngine<'a> {
    config: &'a FormatterConfig,
    classifier: ContentClassifier,
    spacing: SpacingTable,
    insert_page_breaks: bool,
    pub rule_timings: RefCell<Vec<(String, Duration)>>,
}

impl<'a> RuleEngine<'a> {
    pub fn new(config: &'a FormatterConfig) -> Result<Self> {
        Ok(Self {
            config,
            classifier: ContentClassifier::new(&config.classification)?,
            spacing: SpacingTable::new(&config.spacing),
            insert_page_breaks: config.normalizer.insert_page_breaks,
            rule_timings: RefCell::new(Vec::new()),
        })
    }

    /// Overrides `normalizer.insert_page_breaks` for this engine.
    pub fn set_insert_page_breaks(&mut self, enabled: bool) {
        self.insert_page_breaks = enabled;
    }

    pub fn apply_rules(
        &self,
        document: &mut Document,
        stages: &[Stage],
    ) -> Result<Vec<StageReport>> {
        println!(
            "⚙️  Applying {} stage(s) with profile: {}",
            stages.len(),
            self.config.profile
        );
        println!("📊 Paragraphs in document: {}", document.paragraph_count());

        // Clear previous timings
        self.rule_timings.borrow_mut().clear();

        let mut reports = Vec::with_capacity(stages.len());
        for stage in stages {
            if !self.config.pipeline.is_enabled(stage.name()) {
                println!("   ⏭️  Skipping disabled rule: {}", stage);
                continue;
            }

            println!("🔧 Applying rule: {}", stage);
            let report = self.apply_rule_by_name(*stage, document)?;
            report.print_summary();
            println!(
                "   ✅ {} paragraphs after {}",
                document.paragraph_count(),
                stage
            );
            reports.push(report);
        }

        Ok(reports)
    }

    fn apply_rule_by_name(&self, stage: Stage, document: &mut Document) -> Result<StageReport> {
        let rule_start = Instant::now();
        let result = match stage {
            Stage::AutoFix => {
                println!("✏️  AUTO-FIXING LANGUAGE AND CITATIONS...");
                let rule = AutoFixer::new(
                    &self.config.language,
                    &self.config.citations,
                    &self.classifier,
                )?;
                rule.apply(document)
            }
            Stage::LineBreaks => {
                println!("📏 NORMALIZING LINE BREAKS AND SPACING...");
                let rule = self.normalizer().with_page_breaks(self.insert_page_breaks);
                rule.apply(document)
            }
            Stage::Spacing => {
                println!("📐 OPTIMIZING PARAGRAPH SPACING...");
                let rule = Normalizer::spacing_only(
                    &self.classifier,
                    &self.spacing,
                    &self.config.normalizer,
                    self.config.styles.line_spacing,
                );
                rule.apply(document)
            }
            Stage::PageBreaks => {
                println!("📄 CLEANING UP PAGE BREAKS...");
                let normalizer = self.normalizer().with_page_breaks(self.insert_page_breaks);
                let rule =
                    PageBreakCleanup::new(&self.classifier, &self.config.page_breaks, normalizer);
                rule.apply(document)
            }
            Stage::Format => {
                println!("🎨 APPLYING REPORT STYLES...");
                let rule = StyleFormatter::new(&self.classifier, &self.config.styles);
                rule.apply(document)
            }
            Stage::Analyze => {
                println!("🔍 ANALYZING LANGUAGE AND CITATIONS...");
                let rule = DocumentAnalyzer::new(&self.config.language, &self.config.citations)?;
                rule.apply(document)
            }
        };

        let rule_duration = rule_start.elapsed();
        self.rule_timings
            .borrow_mut()
            .push((stage.name().to_string(), rule_duration));
        result
    }

    fn normalizer(&self) -> Normalizer<'_> {
        Normalizer::new(&self.classifier, &self.spacing, &self.config.normalizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;

    fn doc(body: &str) -> Document {
        Document::from_document_xml(&format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
        ))
        .unwrap()
    }

    fn p(text: &str) -> String {
        format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }

    #[test]
    fn stage_names_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_name(stage.name()), Some(stage));
        }
        assert_eq!(Stage::from_name("Unknown"), None);
        assert!(!Stage::Analyze.modifies_document());
    }

    #[test]
    fn runs_stages_in_order_and_records_timings() {
        let config = FormatterConfig::default();
        let engine = RuleEngine::new(&config).unwrap();
        let mut document = doc(&format!(
            "{}{}{}{}",
            p("Chapter 1: Introduction"),
            p(""),
            p(""),
            p("We don't skip this paragraph.")
        ));

        let reports = engine
            .apply_rules(&mut document, &[Stage::LineBreaks, Stage::Analyze])
            .unwrap();

        let stages: Vec<Stage> = reports.iter().map(|r| r.stage()).collect();
        assert_eq!(stages, vec![Stage::LineBreaks, Stage::Analyze]);
        let timings = engine.rule_timings.borrow();
        assert_eq!(timings.len(), 2);
        assert_eq!(timings[0].0, "LineBreaks");
        match &reports[0] {
            StageReport::LineBreaks(report) => assert_eq!(report.paragraphs_removed, 1),
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn disabled_stages_are_skipped() {
        let mut config = FormatterConfig::default();
        config.pipeline.rules = vec![RuleConfig {
            name: "LineBreaks".to_string(),
            enabled: false,
        }];
        let engine = RuleEngine::new(&config).unwrap();
        let mut document = doc(&format!("{}{}{}", p("Text"), p(""), p("")));

        let reports = engine
            .apply_rules(&mut document, &[Stage::LineBreaks])
            .unwrap();
        assert!(reports.is_empty());
        assert_eq!(document.paragraph_count(), 3);
    }

    #[test]
    fn page_break_override_reaches_the_normalizer() {
        let config = FormatterConfig::default();
        let mut engine = RuleEngine::new(&config).unwrap();
        engine.set_insert_page_breaks(false);
        let mut document = doc(&format!(
            "{}{}",
            p("Chapter 1: Introduction"),
            p("Chapter 2: Background")
        ));

        engine
            .apply_rules(&mut document, &[Stage::LineBreaks, Stage::PageBreaks])
            .unwrap();
        assert_eq!(document.paragraph_count(), 2);
    }

    #[test]
    fn stage_reports_serialize_with_stage_tag() {
        let report = StageReport::LineBreaks(NormalizationReport::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stage"], "line_breaks");
        assert_eq!(json["paragraphs_removed"], 0);
    }
}
