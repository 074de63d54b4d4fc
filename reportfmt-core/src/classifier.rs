use crate::config::ClassificationConfig;
use crate::types::RoleTag;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

static DEFAULT_CLASSIFIER: LazyLock<ContentClassifier> = LazyLock::new(|| {
    ContentClassifier::new(&ClassificationConfig::default())
        .expect("built-in classification patterns compile")
});

// A bare "<int>. " list marker, used by the numbered-heading refinement.
static NUMBERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+").unwrap());

/// Classify paragraph text with the built-in pattern table.
pub fn classify(text: &str) -> RoleTag {
    DEFAULT_CLASSIFIER.classify(text)
}

/// A single test in the classification table.
#[derive(Debug)]
enum Predicate {
    /// Regex tested against the trimmed text
    Pattern(Regex),
    /// Raw text starts with at least this many spaces (a tab counts as four)
    Indented(usize),
}

impl Predicate {
    fn matches(&self, raw: &str, trimmed: &str) -> bool {
        match self {
            Predicate::Pattern(regex) => regex.is_match(trimmed),
            Predicate::Indented(min_spaces) => leading_spaces(raw) >= *min_spaces,
        }
    }
}

fn leading_spaces(raw: &str) -> usize {
    raw.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Ordered (predicates, role) table; the first role with a matching predicate wins.
#[derive(Debug)]
pub struct ContentClassifier {
    table: Vec<(RoleTag, Vec<Predicate>)>,
    numbered_heading_max_words: usize,
}

impl ContentClassifier {
    pub fn new(config: &ClassificationConfig) -> Result<Self> {
        let mut table = Vec::with_capacity(config.groups.len());
        for group in &config.groups {
            let mut predicates = Vec::with_capacity(group.patterns.len() + 1);
            for pattern in &group.patterns {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("invalid {} pattern '{}'", group.role, pattern))?;
                predicates.push(Predicate::Pattern(regex));
            }
            if group.role == RoleTag::QuoteBlock && config.quote_indent_spaces > 0 {
                predicates.push(Predicate::Indented(config.quote_indent_spaces));
            }
            table.push((group.role, predicates));
        }

        // Indented quotes still apply when a custom table leaves out the quote group.
        if config.quote_indent_spaces > 0
            && !table.iter().any(|(role, _)| *role == RoleTag::QuoteBlock)
        {
            table.push((
                RoleTag::QuoteBlock,
                vec![Predicate::Indented(config.quote_indent_spaces)],
            ));
        }

        Ok(Self {
            table,
            numbered_heading_max_words: config.numbered_heading_max_words,
        })
    }

    /// Total over all input: whitespace-only text is `Empty`, unmatched text is `Paragraph`.
    pub fn classify(&self, text: &str) -> RoleTag {
        let raw = text.trim_end();
        let trimmed = raw.trim_start();
        if trimmed.is_empty() {
            return RoleTag::Empty;
        }

        let role = self
            .table
            .iter()
            .find(|(_, predicates)| predicates.iter().any(|p| p.matches(raw, trimmed)))
            .map(|(role, _)| *role)
            .unwrap_or(RoleTag::Paragraph);

        if role == RoleTag::ListItem {
            self.refine_list_item(trimmed)
        } else {
            role
        }
    }

    /// Short capitalized numbered lines ("1. Introduction.") are headings, not list entries.
    fn refine_list_item(&self, trimmed: &str) -> RoleTag {
        let Some(marker) = NUMBERED_MARKER.find(trimmed) else {
            return RoleTag::ListItem;
        };
        let remainder = &trimmed[marker.end()..];
        let starts_capital = remainder
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false);
        let words = remainder.split_whitespace().count();

        if starts_capital && words <= self.numbered_heading_max_words {
            RoleTag::MajorSection
        } else {
            RoleTag::ListItem
        }
    }
}
