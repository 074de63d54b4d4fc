// Language and citation checks
// - checker.rs: first-person pronouns and contractions
// - citations.rs: APA in-text citations and bare URLs
// - autofix.rs: rewrites body text into academic register

pub mod autofix;
pub mod checker;
pub mod citations;

pub use autofix::{AutoFixReport, AutoFixer, Fix, FixKind, ParagraphFixes};
pub use checker::{IssueKind, LanguageChecker, LanguageIssue};
pub use citations::{CitationChecker, UrlMatch};

use crate::config::{CitationConfig, LanguageConfig};
use crate::docx::Document;
use crate::rules::{DocumentRule, StageReport};
use anyhow::Result;
use serde::Serialize;

const ISSUES_SHOWN: usize = 10;

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub paragraphs_checked: usize,
    pub paragraphs_skipped: usize,
    pub first_person_count: usize,
    pub contraction_count: usize,
    pub citations_found: usize,
    pub bare_url_count: usize,
    pub issues: Vec<LanguageIssue>,
}

impl AnalysisReport {
    pub fn print_summary(&self) {
        println!("🔍 Language analysis:");
        println!("   - Paragraphs checked: {}", self.paragraphs_checked);
        println!("   - Front-matter paragraphs skipped: {}", self.paragraphs_skipped);
        println!("   - First-person usages: {}", self.first_person_count);
        println!("   - Contractions: {}", self.contraction_count);
        println!("📚 Citations:");
        println!("   - APA in-text citations: {}", self.citations_found);
        println!("   - Bare URLs: {}", self.bare_url_count);

        for issue in self.issues.iter().take(ISSUES_SHOWN) {
            println!(
                "   ⚠️  Paragraph {}: '{}' → {}",
                issue.paragraph_index, issue.matched, issue.suggestion
            );
        }
        if self.issues.len() > ISSUES_SHOWN {
            println!("   ... and {} more", self.issues.len() - ISSUES_SHOWN);
        }
    }
}

/// Read-only pass combining the language and citation checks.
pub struct DocumentAnalyzer {
    language: LanguageChecker,
    citations: CitationChecker,
}

impl DocumentAnalyzer {
    pub fn new(language: &LanguageConfig, citations: &CitationConfig) -> Result<Self> {
        Ok(Self {
            language: LanguageChecker::new(language)?,
            citations: CitationChecker::new(citations)?,
        })
    }

    pub fn analyze(&self, document: &Document) -> AnalysisReport {
        let mut report = AnalysisReport::default();

        for (index, paragraph) in document.paragraphs().enumerate() {
            let text = paragraph.text();
            if text.trim().is_empty() {
                continue;
            }

            report.citations_found += self.citations.citations(&text).len();
            for url in self.citations.bare_urls(&text) {
                report.bare_url_count += 1;
                report.issues.push(LanguageIssue {
                    kind: IssueKind::BareUrl,
                    paragraph_index: index,
                    matched: url.url.clone(),
                    start: url.start,
                    end: url.end,
                    suggestion: self.citations.citation_for(&url.url),
                });
            }

            if self.language.should_skip(&text) {
                report.paragraphs_skipped += 1;
                continue;
            }
            report.paragraphs_checked += 1;
            for issue in self.language.check_paragraph(index, &text) {
                match issue.kind {
                    IssueKind::FirstPerson => report.first_person_count += 1,
                    IssueKind::Contraction => report.contraction_count += 1,
                    IssueKind::BareUrl => {}
                }
                report.issues.push(issue);
            }
        }

        report
            .issues
            .sort_by_key(|issue| (issue.paragraph_index, issue.start));
        report
    }
}

impl DocumentRule for DocumentAnalyzer {
    fn apply(&self, document: &mut Document) -> Result<StageReport> {
        Ok(StageReport::Analyze(self.analyze(document)))
    }

    fn name(&self) -> &str {
        "Analyze"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn analysis_counts_issues_and_citations() {
        let document = doc(&format!(
            "{}{}{}{}",
            p("ACKNOWLEDGEMENT: I thank my supervisor."),
            p("We can't ignore caching (Smith, 2020)."),
            p(""),
            p("Details at https://github.com/org/repo for reference.")
        ));
        let analyzer =
            DocumentAnalyzer::new(&LanguageConfig::default(), &CitationConfig::default()).unwrap();
        let report = analyzer.analyze(&document);

        assert_eq!(report.paragraphs_checked, 2);
        assert_eq!(report.paragraphs_skipped, 1);
        assert_eq!(report.first_person_count, 1);
        assert_eq!(report.contraction_count, 1);
        assert_eq!(report.citations_found, 1);
        assert_eq!(report.bare_url_count, 1);

        let kinds: Vec<(usize, IssueKind)> = report
            .issues
            .iter()
            .map(|i| (i.paragraph_index, i.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (1, IssueKind::FirstPerson),
                (1, IssueKind::Contraction),
                (3, IssueKind::BareUrl)
            ]
        );
        assert_eq!(
            report.issues[2].suggestion,
            "(GitHub, retrieved from https://github.com/org/repo)"
        );
    }

    #[test]
    fn analysis_does_not_modify_the_document() {
        let mut document = doc(&p("I don't modify anything."));
        let before = document.to_document_xml().unwrap();
        let analyzer =
            DocumentAnalyzer::new(&LanguageConfig::default(), &CitationConfig::default()).unwrap();
        analyzer.apply(&mut document).unwrap();
        assert_eq!(document.to_document_xml().unwrap(), before);
    }
}
