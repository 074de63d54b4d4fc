use crate::config::LanguageConfig;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    FirstPerson,
    Contraction,
    BareUrl,
}

/// A finding in one paragraph. Spans are byte offsets into the paragraph text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageIssue {
    pub kind: IssueKind,
    pub paragraph_index: usize,
    pub matched: String,
    pub start: usize,
    pub end: usize,
    pub suggestion: String,
}

/// Academic-register checks: first-person pronouns and contractions.
#[derive(Debug)]
pub struct LanguageChecker {
    first_person: Vec<Regex>,
    contractions: Vec<(Regex, String)>,
    skip_keywords: Vec<String>,
}

/// Matches a contraction typed with either a straight or a curly apostrophe.
pub(crate) fn contraction_regex(contraction: &str) -> Result<Regex> {
    let pattern = format!(r"\b{}\b", regex::escape(contraction).replace('\'', "['’]"));
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid contraction '{contraction}'"))
}

pub(crate) fn compile_all(patterns: &[String], what: &str) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("invalid {what} pattern '{pattern}'"))
        })
        .collect()
}

impl LanguageChecker {
    pub fn new(config: &LanguageConfig) -> Result<Self> {
        let contractions = config
            .contractions
            .iter()
            .map(|c| Ok((contraction_regex(&c.contraction)?, c.expansion.clone())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            first_person: compile_all(&config.first_person_patterns, "first-person")?,
            contractions,
            skip_keywords: config.skip_keywords.clone(),
        })
    }

    /// Front matter such as certificates and acknowledgments is written in
    /// the first person on purpose.
    pub fn should_skip(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.skip_keywords
            .iter()
            .any(|keyword| lower.contains(keyword.as_str()))
    }

    pub fn check_paragraph(&self, paragraph_index: usize, text: &str) -> Vec<LanguageIssue> {
        let mut issues = Vec::new();

        for regex in &self.first_person {
            for m in regex.find_iter(text) {
                issues.push(LanguageIssue {
                    kind: IssueKind::FirstPerson,
                    paragraph_index,
                    matched: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                    suggestion: "Rewrite in the third person or passive voice".to_string(),
                });
            }
        }

        for (regex, expansion) in &self.contractions {
            for m in regex.find_iter(text) {
                issues.push(LanguageIssue {
                    kind: IssueKind::Contraction,
                    paragraph_index,
                    matched: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                    suggestion: format!("Use '{expansion}'"),
                });
            }
        }

        issues.sort_by_key(|issue| issue.start);
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> LanguageChecker {
        LanguageChecker::new(&LanguageConfig::default()).unwrap()
    }

    #[test]
    fn finds_first_person_pronouns() {
        let issues = checker().check_paragraph(3, "We tested our model and I wrote the report.");
        let matched: Vec<&str> = issues.iter().map(|i| i.matched.as_str()).collect();
        assert_eq!(matched, vec!["We", "our", "I"]);
        assert!(issues.iter().all(|i| i.kind == IssueKind::FirstPerson));
        assert_eq!(issues[0].paragraph_index, 3);
        assert_eq!((issues[0].start, issues[0].end), (0, 2));
    }

    #[test]
    fn lowercase_i_is_not_a_pronoun() {
        let issues = checker().check_paragraph(0, "Appendix i lists the figures.");
        assert!(issues.is_empty());
    }

    #[test]
    fn contractions_with_either_apostrophe() {
        let issues = checker().check_paragraph(0, "It doesn't scale and it’s slow.");
        let contractions: Vec<&LanguageIssue> = issues
            .iter()
            .filter(|i| i.kind == IssueKind::Contraction)
            .collect();
        assert_eq!(contractions.len(), 2);
        assert_eq!(contractions[0].suggestion, "Use 'does not'");
        assert_eq!(contractions[1].matched, "it’s");
        assert_eq!(contractions[1].suggestion, "Use 'it is'");
    }

    #[test]
    fn preliminary_paragraphs_are_skipped() {
        let checker = checker();
        assert!(checker.should_skip("ACKNOWLEDGEMENT"));
        assert!(checker.should_skip("This certificate confirms that"));
        assert!(!checker.should_skip("The system architecture"));
    }
}
