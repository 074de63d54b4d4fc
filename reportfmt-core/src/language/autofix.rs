use super::checker::{compile_all, contraction_regex};
use super::citations::CitationChecker;
use crate::classifier::ContentClassifier;
use crate::config::{CitationConfig, LanguageConfig};
use crate::docx::Document;
use crate::rules::{DocumentRule, StageReport};
use crate::types::{text_preview, ParagraphId, RoleTag, SkippedParagraph};
use anyhow::Result;
use regex::{Captures, Regex};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    FirstPerson,
    Contraction,
    AcademicPhrase,
    UrlCitation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fix {
    pub kind: FixKind,
    pub original: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParagraphFixes {
    pub index: usize,
    pub before: String,
    pub after: String,
    pub fixes: Vec<Fix>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AutoFixReport {
    pub paragraphs_modified: usize,
    pub total_fixes: usize,
    pub paragraphs: Vec<ParagraphFixes>,
    pub skipped: Vec<SkippedParagraph>,
}

impl AutoFixReport {
    pub fn count(&self, kind: FixKind) -> usize {
        self.paragraphs
            .iter()
            .flat_map(|p| &p.fixes)
            .filter(|fix| fix.kind == kind)
            .count()
    }

    pub fn print_summary(&self) {
        println!("✏️  Auto-fix results:");
        println!("   - Paragraphs modified: {}", self.paragraphs_modified);
        println!("   - Total fixes: {}", self.total_fixes);
        println!("   - First person: {}", self.count(FixKind::FirstPerson));
        println!("   - Contractions: {}", self.count(FixKind::Contraction));
        println!("   - Academic phrasing: {}", self.count(FixKind::AcademicPhrase));
        println!("   - URL citations: {}", self.count(FixKind::UrlCitation));
        if !self.skipped.is_empty() {
            println!("   ⚠️  Skipped paragraphs: {}", self.skipped.len());
        }
    }
}

/// Rewrites body text into academic register.
///
/// Each paragraph goes through first-person rewrites, contraction expansion,
/// phrase improvements and finally bare-URL citation, in that order. The
/// output of a pass never matches its own patterns, so a second run finds
/// nothing to do. Headings, captions and quotations are left alone.
pub struct AutoFixer<'a> {
    classifier: &'a ContentClassifier,
    first_person: Vec<(Regex, String)>,
    contractions: Vec<(Regex, String)>,
    phrases: Vec<(Regex, String)>,
    citations: CitationChecker,
}

fn paired(regexes: Vec<Regex>, replacements: impl Iterator<Item = String>) -> Vec<(Regex, String)> {
    regexes.into_iter().zip(replacements).collect()
}

impl<'a> AutoFixer<'a> {
    pub fn new(
        language: &LanguageConfig,
        citations: &CitationConfig,
        classifier: &'a ContentClassifier,
    ) -> Result<Self> {
        let first_person_patterns: Vec<String> = language
            .first_person_rewrites
            .iter()
            .map(|r| r.pattern.clone())
            .collect();
        let phrase_patterns: Vec<String> = language
            .academic_phrases
            .iter()
            .map(|r| r.pattern.clone())
            .collect();
        let contractions = language
            .contractions
            .iter()
            .map(|c| Ok((contraction_regex(&c.contraction)?, c.expansion.clone())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            classifier,
            first_person: paired(
                compile_all(&first_person_patterns, "first-person rewrite")?,
                language.first_person_rewrites.iter().map(|r| r.replacement.clone()),
            ),
            contractions,
            phrases: paired(
                compile_all(&phrase_patterns, "academic phrase")?,
                language.academic_phrases.iter().map(|r| r.replacement.clone()),
            ),
            citations: CitationChecker::new(citations)?,
        })
    }

    /// Applies every rewrite to `text`, returning the new text and the fixes made.
    pub fn fix_text(&self, text: &str) -> (String, Vec<Fix>) {
        let mut fixes = Vec::new();
        let mut current = text.to_string();

        let passes = [
            (&self.first_person, FixKind::FirstPerson),
            (&self.contractions, FixKind::Contraction),
            (&self.phrases, FixKind::AcademicPhrase),
        ];
        for (rewrites, kind) in passes {
            for (regex, replacement) in rewrites {
                current = replace_matching_case(regex, &current, replacement, kind, &mut fixes);
            }
        }
        current = self.cite_urls(&current, &mut fixes);

        (current, fixes)
    }

    fn cite_urls(&self, text: &str, fixes: &mut Vec<Fix>) -> String {
        let urls = self.citations.bare_urls(text);
        if urls.is_empty() {
            return text.to_string();
        }
        let mut result = String::with_capacity(text.len() + urls.len() * 24);
        let mut last = 0;
        for url in urls {
            let citation = self.citations.citation_for(&url.url);
            result.push_str(&text[last..url.start]);
            result.push_str(&citation);
            fixes.push(Fix {
                kind: FixKind::UrlCitation,
                original: url.url,
                replacement: citation,
            });
            last = url.end;
        }
        result.push_str(&text[last..]);
        result
    }

    /// Only running text is rewritten.
    fn is_fixable(role: RoleTag) -> bool {
        matches!(role, RoleTag::Paragraph | RoleTag::ListItem)
    }

    pub fn fix_document(&self, document: &mut Document) -> AutoFixReport {
        let mut report = AutoFixReport::default();

        let mut planned: Vec<(usize, ParagraphId, String, String, Vec<Fix>)> = Vec::new();
        for (index, paragraph) in document.paragraphs().enumerate() {
            let text = paragraph.text();
            if !Self::is_fixable(self.classifier.classify(&text)) {
                continue;
            }
            let (fixed, fixes) = self.fix_text(&text);
            if fixes.is_empty() || fixed == text {
                continue;
            }
            if paragraph.has_embedded_objects() {
                log::warn!("Auto-fix skipping paragraph {index}: contains embedded objects");
                report.skipped.push(SkippedParagraph {
                    id: paragraph.id(),
                    step: "auto_fix".to_string(),
                    reason: "contains embedded objects".to_string(),
                });
                continue;
            }
            planned.push((index, paragraph.id(), text, fixed, fixes));
        }

        for (index, id, before, after, fixes) in planned {
            match document.paragraph_mut(id) {
                Ok(mut paragraph) => paragraph.replace_text(&after),
                Err(e) => {
                    log::warn!("Auto-fix skipping paragraph {index}: {e}");
                    report.skipped.push(SkippedParagraph {
                        id,
                        step: "auto_fix".to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            }
            log::debug!("Auto-fixed paragraph {index} with {} change(s)", fixes.len());
            report.paragraphs_modified += 1;
            report.total_fixes += fixes.len();
            report.paragraphs.push(ParagraphFixes {
                index,
                before: text_preview(&before, 80),
                after: text_preview(&after, 80),
                fixes,
            });
        }

        report
    }
}

fn replace_matching_case(
    regex: &Regex,
    text: &str,
    replacement: &str,
    kind: FixKind,
    fixes: &mut Vec<Fix>,
) -> String {
    regex
        .replace_all(text, |caps: &Captures| {
            let original = &caps[0];
            let replaced = match_case(original, replacement);
            fixes.push(Fix {
                kind,
                original: original.to_string(),
                replacement: replaced.clone(),
            });
            replaced
        })
        .into_owned()
}

/// Gives `replacement` the case of the first letter of `original`.
fn match_case(original: &str, replacement: &str) -> String {
    let Some(first) = original.chars().next() else {
        return replacement.to_string();
    };
    let mut chars = replacement.chars();
    let Some(head) = chars.next() else {
        return String::new();
    };
    let head: String = if first.is_uppercase() {
        head.to_uppercase().collect()
    } else {
        head.to_lowercase().collect()
    };
    head + chars.as_str()
}

impl DocumentRule for AutoFixer<'_> {
    fn apply(&self, document: &mut Document) -> Result<StageReport> {
        Ok(StageReport::AutoFix(self.fix_document(document)))
    }

    fn name(&self) -> &str {
        "AutoFix"
    }
}
