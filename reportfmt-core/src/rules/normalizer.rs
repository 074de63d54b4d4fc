use super::engine::{DocumentRule, StageReport};
use super::section_breaks::{page_break_in_window, SectionBreaks};
use super::spacing::SpacingTable;
use crate::classifier::ContentClassifier;
use crate::config::NormalizerConfig;
use crate::docx::{Document, Paragraph, Spacing};
use crate::error::DocxError;
use crate::types::{
    text_preview, NormalizationReport, ParagraphId, ParagraphOutcome, ParagraphReport, RoleTag,
    SkippedParagraph, SpacingChange, SpacingPoints,
};
use anyhow::Result;

const PREVIEW_CHARS: usize = 60;
const LINE_SPACING_TOLERANCE: f32 = 0.01;

/// Which stage the normalizer runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Collapse, page breaks and spacing
    LineBreaks,
    /// Collapse and spacing plus line spacing, page breaks untouched
    Spacing,
}

/// Brings vertical spacing in line with the role table.
///
/// Runs three passes over the document: blank-run collapse, page-break
/// insertion before top-level headings, then a single forward spacing pass
/// that computes each paragraph's final target (rule, section-break
/// discount, heading/content coupling) and writes it only when the current
/// value is outside the tolerance. Running it twice changes nothing.
pub struct Normalizer<'a> {
    classifier: &'a ContentClassifier,
    spacing: &'a SpacingTable,
    config: &'a NormalizerConfig,
    mode: Mode,
    insert_page_breaks: bool,
    line_spacing: Option<f32>,
}

/// One paragraph's computed target, before any write.
struct SpacingPlan {
    index: usize,
    id: ParagraphId,
    role: RoleTag,
    preview: String,
    expected: SpacingPoints,
    section_break_before: bool,
    coupled: bool,
    current: Result<Spacing, String>,
}

impl<'a> Normalizer<'a> {
    pub fn new(
        classifier: &'a ContentClassifier,
        spacing: &'a SpacingTable,
        config: &'a NormalizerConfig,
    ) -> Self {
        Self {
            classifier,
            spacing,
            config,
            mode: Mode::LineBreaks,
            insert_page_breaks: config.insert_page_breaks,
            line_spacing: None,
        }
    }

    /// Spacing-only variant: never inserts page breaks and sets line spacing.
    pub fn spacing_only(
        classifier: &'a ContentClassifier,
        spacing: &'a SpacingTable,
        config: &'a NormalizerConfig,
        line_spacing: f32,
    ) -> Self {
        Self {
            mode: Mode::Spacing,
            insert_page_breaks: false,
            line_spacing: Some(line_spacing),
            ..Self::new(classifier, spacing, config)
        }
    }

    pub fn with_page_breaks(mut self, enabled: bool) -> Self {
        self.insert_page_breaks = enabled;
        self
    }

    pub fn inserts_page_breaks(&self) -> bool {
        self.insert_page_breaks
    }

    pub fn normalize(&self, document: &mut Document) -> NormalizationReport {
        let mut report = NormalizationReport {
            standards: self.spacing.describe(),
            ..NormalizationReport::default()
        };
        self.collapse_blank_runs(document, &mut report);
        if self.insert_page_breaks {
            self.insert_page_breaks(document, &mut report);
        }
        self.assign_spacing(document, &mut report);
        if let Some(multiple) = self.line_spacing {
            self.apply_line_spacing(document, multiple, &mut report);
        }
        report
    }

    /// Keeps the first `max_blank_run` blank paragraphs of every run.
    pub fn collapse_blank_runs(&self, document: &mut Document, report: &mut NormalizationReport) {
        let snapshot: Vec<(ParagraphId, bool)> = document
            .paragraphs()
            .map(|p| (p.id(), p.is_blank()))
            .collect();

        let mut run = 0;
        let mut doomed = Vec::new();
        for (id, blank) in snapshot {
            if !blank {
                run = 0;
                continue;
            }
            run += 1;
            if run > self.config.max_blank_run {
                doomed.push(id);
            }
        }

        for id in doomed {
            match document.remove_paragraph(id) {
                Ok(()) => report.paragraphs_removed += 1,
                Err(e) => skip(report, id, "blank_run_collapse", e),
            }
        }
    }

    /// Puts a page-break paragraph before every top-level heading except the
    /// first, unless the heading already starts a new page.
    pub fn insert_page_breaks(&self, document: &mut Document, report: &mut NormalizationReport) {
        let breaks = SectionBreaks::detect(document);
        let paragraphs: Vec<Paragraph> = document.paragraphs().collect();

        let mut targets = Vec::new();
        let mut seen_first = false;
        for (index, paragraph) in paragraphs.iter().enumerate() {
            if !self.classifier.classify(&paragraph.text()).is_top_level() {
                continue;
            }
            if !seen_first {
                seen_first = true;
                continue;
            }
            let already_breaks = paragraph.page_break_before()
                || breaks.breaks_before(paragraph.id())
                || page_break_in_window(&paragraphs, index, self.config.page_break_lookback);
            if !already_breaks {
                targets.push(paragraph.id());
            }
        }

        for id in targets {
            match document.insert_page_break_before(id) {
                Ok(_) => {
                    log::debug!("Inserted page break before paragraph {id}");
                    report.page_breaks_inserted += 1;
                }
                Err(e) => skip(report, id, "page_break_insertion", e),
            }
        }
    }

    /// One forward pass: compute every paragraph's final target, then write
    /// the values that are outside the tolerance.
    pub fn assign_spacing(&self, document: &mut Document, report: &mut NormalizationReport) {
        let plans = self.plan_spacing(document);

        for plan in plans {
            let outcome = match &plan.current {
                _ if plan.role == RoleTag::Empty => ParagraphOutcome::Unchanged,
                Err(reason) => {
                    log::warn!("Skipping paragraph {} ({}): {}", plan.index, plan.preview, reason);
                    ParagraphOutcome::Skipped {
                        reason: reason.clone(),
                    }
                }
                Ok(current) => self.write_spacing(document, &plan, current, report),
            };

            report.paragraphs.push(ParagraphReport {
                index: plan.index,
                id: plan.id,
                role: plan.role,
                preview: plan.preview,
                expected: plan.expected,
                section_break_before: plan.section_break_before,
                outcome,
            });
        }
    }

    fn plan_spacing(&self, document: &Document) -> Vec<SpacingPlan> {
        let breaks = SectionBreaks::detect(document);
        let paragraphs: Vec<Paragraph> = document.paragraphs().collect();
        let texts: Vec<String> = paragraphs.iter().map(|p| p.text()).collect();
        let roles: Vec<RoleTag> = texts.iter().map(|t| self.classifier.classify(t)).collect();
        let coupled = self.coupled_paragraphs(&roles);

        paragraphs
            .iter()
            .enumerate()
            .map(|(index, paragraph)| {
                let role = roles[index];
                let section_break_before = breaks.breaks_before(paragraph.id());
                let expected = if role == RoleTag::Empty {
                    SpacingPoints::default()
                } else {
                    self.target_for(role, section_break_before, coupled[index])
                };
                SpacingPlan {
                    index,
                    id: paragraph.id(),
                    role,
                    preview: text_preview(&texts[index], PREVIEW_CHARS),
                    expected,
                    section_break_before,
                    coupled: coupled[index],
                    current: paragraph.spacing().map_err(|e| e.to_string()),
                }
            })
            .collect()
    }

    /// Marks the first non-empty paragraph within the lookahead after each heading.
    fn coupled_paragraphs(&self, roles: &[RoleTag]) -> Vec<bool> {
        let mut coupled = vec![false; roles.len()];
        for (index, role) in roles.iter().enumerate() {
            if !role.is_heading() {
                continue;
            }
            let end = (index + 1 + self.config.heading_content_lookahead).min(roles.len());
            if let Some(next) = (index + 1..end).find(|&j| roles[j] != RoleTag::Empty) {
                coupled[next] = true;
            }
        }
        coupled
    }

    /// Rule, then section-break discount, then coupling.
    pub fn target_for(
        &self,
        role: RoleTag,
        section_break_before: bool,
        coupled: bool,
    ) -> SpacingPoints {
        let rule = self.spacing.rule_for(role);
        let mut before = rule.before;
        if role.is_top_level() && section_break_before {
            before = before.saturating_sub(self.config.section_break_discount);
        }
        let mut expected = SpacingPoints {
            before: self.spacing.to_points(before),
            after: self.spacing.to_points(rule.after),
        };
        if coupled {
            expected.before = 0.0;
        }
        expected
    }

    fn write_spacing(
        &self,
        document: &mut Document,
        plan: &SpacingPlan,
        current: &Spacing,
        report: &mut NormalizationReport,
    ) -> ParagraphOutcome {
        // An overriding Lines/Autospacing value always differs from the target
        let before = (current.before_overridden
            || self.spacing.needs_update(current.before_or_zero(), plan.expected.before))
        .then_some(SpacingChange {
            from: current.before_or_zero(),
            to: plan.expected.before,
        });
        let after = (current.after_overridden
            || self.spacing.needs_update(current.after_or_zero(), plan.expected.after))
        .then_some(SpacingChange {
            from: current.after_or_zero(),
            to: plan.expected.after,
        });

        if plan.role.is_top_level() && plan.section_break_before {
            report.section_breaks_discounted += 1;
        }
        if before.is_none() && after.is_none() {
            return ParagraphOutcome::Unchanged;
        }

        let mut paragraph = match document.paragraph_mut(plan.id) {
            Ok(paragraph) => paragraph,
            Err(e) => {
                log::warn!("Skipping paragraph {}: {}", plan.index, e);
                return ParagraphOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };
        if let Some(change) = before {
            paragraph.set_spacing_before(change.to);
        }
        if let Some(change) = after {
            paragraph.set_spacing_after(change.to);
        }

        log::debug!(
            "Re-spaced paragraph {} [{}] {:?}/{:?}",
            plan.index,
            plan.role,
            before,
            after
        );
        report.paragraphs_respaced += 1;
        if plan.coupled && before.is_some() {
            report.heading_content_fixed += 1;
        }
        ParagraphOutcome::Respaced { before, after }
    }

    fn apply_line_spacing(
        &self,
        document: &mut Document,
        multiple: f32,
        report: &mut NormalizationReport,
    ) {
        let mut targets = Vec::new();
        for paragraph in document.paragraphs() {
            if paragraph.text().trim().is_empty() {
                continue;
            }
            match paragraph.line_spacing() {
                Ok(Some(current)) if (current - multiple).abs() < LINE_SPACING_TOLERANCE => {}
                Ok(_) => targets.push(paragraph.id()),
                Err(e) => skip(report, paragraph.id(), "line_spacing", e),
            }
        }

        for id in targets {
            match document.paragraph_mut(id) {
                Ok(mut paragraph) => {
                    paragraph.set_line_spacing(multiple);
                    report.line_spacing_updated += 1;
                }
                Err(e) => skip(report, id, "line_spacing", e),
            }
        }
    }
}

fn skip(report: &mut NormalizationReport, id: ParagraphId, step: &str, error: DocxError) {
    log::warn!("{step}: skipping paragraph {id}: {error}");
    report.skipped.push(SkippedParagraph {
        id,
        step: step.to_string(),
        reason: error.to_string(),
    });
}

impl DocumentRule for Normalizer<'_> {
    fn apply(&self, document: &mut Document) -> Result<StageReport> {
        let report = self.normalize(document);
        Ok(match self.mode {
            Mode::LineBreaks => StageReport::LineBreaks(report),
            Mode::Spacing => StageReport::Spacing(report),
        })
    }

    fn name(&self) -> &str {
        match self.mode {
            Mode::LineBreaks => "LineBreaks",
            Mode::Spacing => "Spacing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassificationConfig, SpacingConfig};

    struct Fixture {
        classifier: ContentClassifier,
        spacing: SpacingTable,
        config: NormalizerConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                classifier: ContentClassifier::new(&ClassificationConfig::default()).unwrap(),
                spacing: SpacingTable::new(&SpacingConfig::default()),
                config: NormalizerConfig::default(),
            }
        }

        fn normalizer(&self) -> Normalizer<'_> {
            Normalizer::new(&self.classifier, &self.spacing, &self.config)
        }
    }

    fn doc(body: &str) -> Document {
        Document::from_document_xml(&format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
        ))
        .unwrap()
    }

    /// Two sections: `first` closes the opening one, the body-level `w:sectPr`
    /// of type `kind` closes (and so types) the one starting at `second`.
    fn two_sections(first: &str, second: &str, kind: &str) -> Document {
        Document::from_document_xml(&format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{first}<w:p><w:pPr><w:sectPr/></w:pPr></w:p>{second}<w:sectPr><w:type w:val="{kind}"/></w:sectPr></w:body></w:document>"#
        ))
        .unwrap()
    }

    fn p(text: &str) -> String {
        format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }

    fn spaced(text: &str, before_twips: u32, after_twips: u32) -> String {
        format!(
            r#"<w:p><w:pPr><w:spacing w:before="{before_twips}" w:after="{after_twips}"/></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
        )
    }

    fn spacing_of(document: &Document, index: usize) -> (f32, f32) {
        let s = document.paragraph_at(index).unwrap().spacing().unwrap();
        (s.before_or_zero(), s.after_or_zero())
    }

    #[test]
    fn blank_runs_keep_one_blank() {
        let fixture = Fixture::new();
        let mut document = doc(&format!(
            "{}{}{}{}{}{}",
            p("First"),
            p(""),
            p("  "),
            p(""),
            p("Second"),
            p("")
        ));
        let mut report = NormalizationReport::default();
        fixture.normalizer().collapse_blank_runs(&mut document, &mut report);

        assert_eq!(report.paragraphs_removed, 2);
        assert_eq!(document.paragraph_texts(), vec!["First", "", "Second", ""]);
    }

    #[test]
    fn structural_empty_paragraphs_survive_collapse() {
        let fixture = Fixture::new();
        let mut document = doc(&format!(
            r#"{}{}<w:p><w:r><w:br w:type="page"/></w:r></w:p>{}<w:p><w:r><w:drawing/></w:r></w:p>{}"#,
            p("Text"),
            p(""),
            p(""),
            p("")
        ));
        let mut report = NormalizationReport::default();
        fixture.normalizer().collapse_blank_runs(&mut document, &mut report);

        assert_eq!(report.paragraphs_removed, 0);
        assert_eq!(document.paragraph_count(), 6);
    }

    #[test]
    fn respaces_outside_tolerance_only() {
        let fixture = Fixture::new();
        // Chapter wants 36/18; 35.5/18.5 is within 1pt
        let mut document = doc(&format!(
            "{}{}{}",
            spaced("Chapter 1: Introduction", 710, 370),
            spaced("Body text of the chapter.", 0, 0),
            spaced("1.1 Background", 0, 0)
        ));
        let report = fixture.normalizer().normalize(&mut document);

        assert_eq!(report.paragraphs[0].outcome, ParagraphOutcome::Unchanged);
        assert_eq!(spacing_of(&document, 0), (35.5, 18.5));
        assert_eq!(spacing_of(&document, 2).0, 18.0);
        assert_eq!(
            report.paragraphs[2].outcome,
            ParagraphOutcome::Respaced {
                before: Some(SpacingChange { from: 0.0, to: 18.0 }),
                after: None
            }
        );
    }

    #[test]
    fn content_after_heading_has_no_space_before() {
        let fixture = Fixture::new();
        let mut document = doc(&format!(
            "{}{}{}",
            p("2.1 Methodology"),
            p(""),
            spaced("2.1.1 Data Collection", 360, 0)
        ));
        let report = fixture.normalizer().normalize(&mut document);

        assert_eq!(report.paragraphs[0].role, RoleTag::SectionHeading);
        assert_eq!(report.paragraphs[2].role, RoleTag::SubsectionHeading);
        assert_eq!(report.paragraphs[2].expected.before, 0.0);
        assert_eq!(spacing_of(&document, 2).0, 0.0);
        assert_eq!(report.heading_content_fixed, 1);
    }

    #[test]
    fn coupling_respects_lookahead() {
        let fixture = Fixture::new();
        let config = NormalizerConfig {
            max_blank_run: 5,
            ..NormalizerConfig::default()
        };
        let normalizer = Normalizer::new(&fixture.classifier, &fixture.spacing, &config);
        let mut document = doc(&format!(
            "{}{}{}{}",
            p("2.1 Methodology"),
            p(""),
            p(""),
            p("2.2 Data Sources")
        ));
        let report = normalizer.normalize(&mut document);
        // Outside the two-paragraph window the heading keeps its own rule
        assert_eq!(report.paragraphs[3].expected.before, 18.0);
        assert_eq!(report.heading_content_fixed, 0);
    }

    #[test]
    fn hard_section_break_discounts_chapter_spacing() {
        let fixture = Fixture::new();
        for kind in ["nextPage", "oddPage", "evenPage"] {
            let mut document = two_sections(
                &p("Opening remarks of the report."),
                &p("Chapter 1: Introduction"),
                kind,
            );
            let report = fixture.normalizer().normalize(&mut document);

            let chapter = &report.paragraphs[2];
            assert!(chapter.section_break_before, "{kind}");
            assert_eq!(chapter.expected.before, 18.0);
            assert_eq!(report.section_breaks_discounted, 1);
            assert_eq!(spacing_of(&document, 2).0, 18.0);
        }
    }

    #[test]
    fn continuous_section_break_is_not_discounted() {
        let fixture = Fixture::new();
        let mut document =
            two_sections(&p("Some text."), &p("Chapter 1: Introduction"), "continuous");
        let report = fixture.normalizer().normalize(&mut document);
        assert!(!report.paragraphs[2].section_break_before);
        assert_eq!(report.section_breaks_discounted, 0);
        assert_eq!(spacing_of(&document, 2).0, 36.0);
    }

    #[test]
    fn page_breaks_go_before_later_chapters_only() {
        let fixture = Fixture::new();
        let mut document = doc(&format!(
            "{}{}{}{}",
            p("Chapter 1: Introduction"),
            p("Intro body."),
            p("Chapter 2: Background"),
            p("Background body.")
        ));
        let report = fixture.normalizer().normalize(&mut document);

        assert_eq!(report.page_breaks_inserted, 1);
        assert!(document.paragraph_at(2).unwrap().is_page_break_only());
        assert_eq!(
            document.paragraph_at(3).unwrap().text(),
            "Chapter 2: Background"
        );
        assert!(!document.paragraph_at(0).unwrap().has_page_break());
    }

    #[test]
    fn existing_breaks_are_respected() {
        let fixture = Fixture::new();
        let mut document = doc(&format!(
            r#"{}{}<w:p><w:r><w:br w:type="page"/></w:r></w:p>{}{}<w:p><w:pPr><w:pageBreakBefore/></w:pPr><w:r><w:t>Chapter 3: Design</w:t></w:r></w:p>"#,
            p("Chapter 1: Introduction"),
            p("Body."),
            p(""),
            p("Chapter 2: Background"),
        ));
        let report = fixture.normalizer().normalize(&mut document);
        assert_eq!(report.page_breaks_inserted, 0);
    }

    #[test]
    fn page_break_insertion_can_be_disabled() {
        let fixture = Fixture::new();
        let mut document = doc(&format!(
            "{}{}",
            p("Chapter 1: Introduction"),
            p("Chapter 2: Background")
        ));
        let report = fixture
            .normalizer()
            .with_page_breaks(false)
            .normalize(&mut document);
        assert_eq!(report.page_breaks_inserted, 0);
        assert_eq!(document.paragraph_count(), 2);
    }

    #[test]
    fn second_run_changes_nothing() {
        let fixture = Fixture::new();
        let mut document = doc(&format!(
            "{}{}{}{}{}{}{}",
            p("Chapter 1: Introduction"),
            p(""),
            p(""),
            p("Opening paragraph."),
            p("Figure 1: Architecture"),
            p("Chapter 2: Literature Review"),
            p("1.1 Overview")
        ));
        fixture.normalizer().normalize(&mut document);
        let first = document.to_document_xml().unwrap();

        let report = fixture.normalizer().normalize(&mut document);
        assert_eq!(report.paragraphs_removed, 0);
        assert_eq!(report.paragraphs_respaced, 0);
        assert_eq!(report.page_breaks_inserted, 0);
        assert_eq!(document.to_document_xml().unwrap(), first);
    }

    #[test]
    fn malformed_spacing_is_skipped_not_fatal() {
        let fixture = Fixture::new();
        let mut document = doc(&format!(
            r#"<w:p><w:pPr><w:spacing w:before="wide"/></w:pPr><w:r><w:t>Broken</w:t></w:r></w:p>{}"#,
            p("1.1 Overview")
        ));
        let report = fixture.normalizer().normalize(&mut document);

        assert!(matches!(
            report.paragraphs[0].outcome,
            ParagraphOutcome::Skipped { .. }
        ));
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(spacing_of(&document, 1).0, 18.0);
    }

    #[test]
    fn overriding_spacing_attributes_are_cleared() {
        let fixture = Fixture::new();
        let mut document = doc(concat!(
            r#"<w:p><w:pPr><w:spacing w:before="0" w:beforeAutospacing="1" w:afterLines="200"/></w:pPr>"#,
            r#"<w:r><w:t>Plain body sentence.</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:spacing w:before="0" w:beforeAutospacing="0"/></w:pPr>"#,
            r#"<w:r><w:t>Another body sentence.</w:t></w:r></w:p>"#
        ));
        let report = fixture.normalizer().normalize(&mut document);

        assert_eq!(report.paragraphs_respaced, 1);
        assert!(matches!(
            report.paragraphs[0].outcome,
            ParagraphOutcome::Respaced {
                before: Some(_),
                after: Some(_)
            }
        ));
        assert_eq!(report.paragraphs[1].outcome, ParagraphOutcome::Unchanged);

        let xml = document.to_document_xml().unwrap();
        assert!(!xml.contains("w:beforeAutospacing=\"1\""));
        assert!(!xml.contains("w:afterLines"));
        let spacing = document.paragraph_at(0).unwrap().spacing().unwrap();
        assert!(!spacing.before_overridden && !spacing.after_overridden);
    }

    #[test]
    fn non_finite_spacing_is_skipped() {
        let fixture = Fixture::new();
        for value in ["NaN", "inf", "-inf"] {
            let mut document = doc(&format!(
                r#"<w:p><w:pPr><w:spacing w:before="{value}"/></w:pPr><w:r><w:t>1.1 Background</w:t></w:r></w:p>"#
            ));
            let report = fixture.normalizer().normalize(&mut document);
            assert!(
                matches!(report.paragraphs[0].outcome, ParagraphOutcome::Skipped { .. }),
                "{value}"
            );
        }
    }

    #[test]
    fn spacing_mode_sets_line_spacing_without_page_breaks() {
        let fixture = Fixture::new();
        let normalizer =
            Normalizer::spacing_only(&fixture.classifier, &fixture.spacing, &fixture.config, 1.5);
        let mut document = doc(&format!(
            "{}{}{}",
            p("Chapter 1: Introduction"),
            p("Chapter 2: Background"),
            p("")
        ));
        let report = normalizer.normalize(&mut document);

        assert_eq!(normalizer.name(), "Spacing");
        assert_eq!(report.page_breaks_inserted, 0);
        assert_eq!(report.line_spacing_updated, 2);
        assert_eq!(
            document.paragraph_at(0).unwrap().line_spacing().unwrap(),
            Some(1.5)
        );
    }

    #[test]
    fn report_lists_spacing_standards() {
        let fixture = Fixture::new();
        let mut document = doc(&p("Body text."));
        let report = fixture.normalizer().normalize(&mut document);

        assert_eq!(report.standards.len(), fixture.spacing.describe().len());
        assert!(report.standards.contains(
            &"Chapter headings (Chapter 1, CHAPTER 2): 2 line(s) before, 1 line(s) after"
                .to_string()
        ));
    }
}
