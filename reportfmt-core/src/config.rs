use crate::rules::Stage;
use crate::types::{RoleTag, SpacingRule};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_profile_name() -> String {
    "iost-internship-report".to_string()
}

/// Complete formatter configuration. Every section falls back to the
/// institutional template defaults when omitted from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// Human-readable name of the template this config describes
    #[serde(default = "default_profile_name")]
    pub profile: String,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub spacing: SpacingConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub page_breaks: PageBreakConfig,
    #[serde(default)]
    pub styles: StyleConfig,
    #[serde(default)]
    pub language: LanguageConfig,
    #[serde(default)]
    pub citations: CitationConfig,
    /// Stages that may be switched off globally
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

// ===== CLASSIFICATION =====

/// One role and the patterns that select it. Groups are tested in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternGroup {
    pub role: RoleTag,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Ordered pattern groups, first match wins
    #[serde(default = "default_pattern_groups")]
    pub groups: Vec<PatternGroup>,
    /// Leading spaces that make a line a quote block (0 disables the check)
    #[serde(default = "default_quote_indent_spaces")]
    pub quote_indent_spaces: usize,
    /// Numbered list entries up to this many words are promoted to major sections
    #[serde(default = "default_numbered_heading_max_words")]
    pub numbered_heading_max_words: usize,
}

fn default_quote_indent_spaces() -> usize {
    4
}

fn default_numbered_heading_max_words() -> usize {
    5
}

fn group(role: RoleTag, patterns: &[&str]) -> PatternGroup {
    PatternGroup {
        role,
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
    }
}

// Patterns are compiled case-insensitive; `(?-i:...)` pins the capital letter
// that separates a numbered heading from a numbered sentence.
fn default_pattern_groups() -> Vec<PatternGroup> {
    vec![
        group(RoleTag::ChapterHeading, &[r"^chapter\s+\d+"]),
        group(
            RoleTag::MajorSection,
            &[r"^\d+\.\s+(?-i:[A-Z])[^.]*$", r"^\d+\s+(?-i:[A-Z])[^.]*$"],
        ),
        group(
            RoleTag::SectionHeading,
            &[
                r"^\d+\.\d+\s+(?-i:[A-Z])[^.]*$",
                r"^\d+\.\d+\.\s+(?-i:[A-Z])[^.]*$",
            ],
        ),
        group(
            RoleTag::SubsectionHeading,
            &[
                r"^\d+\.\d+\.\d+\s+(?-i:[A-Z])[^.]*$",
                r"^\d+\.\d+\.\d+\.\s+(?-i:[A-Z])[^.]*$",
            ],
        ),
        group(
            RoleTag::FigureTableCaption,
            &[r"^figure\s+\d+\.\d+", r"^table\s+\d+\.\d+"],
        ),
        group(
            RoleTag::ListItem,
            &[r"^[•●○◦▪■□‣⁃·\-*]\s+", r"^\d+\.\s+", r"^[a-z]\)\s+"],
        ),
        group(RoleTag::QuoteBlock, &[r#"^".*"$"#, r"^“.*”$"]),
    ]
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            groups: default_pattern_groups(),
            quote_indent_spaces: default_quote_indent_spaces(),
            numbered_heading_max_words: default_numbered_heading_max_words(),
        }
    }
}

// ===== SPACING =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacingConfig {
    /// Points per line-unit (12pt body font at 1.5 lines)
    #[serde(default = "default_points_per_line")]
    pub points_per_line: f32,
    /// Differences at or below this many points are left alone
    #[serde(default = "default_tolerance_points")]
    pub tolerance_points: f32,
    /// Spacing in line-units per role; missing roles use the paragraph rule
    #[serde(default = "default_spacing_rules")]
    pub rules: BTreeMap<RoleTag, SpacingRule>,
}

fn default_points_per_line() -> f32 {
    18.0
}

fn default_tolerance_points() -> f32 {
    1.0
}

fn default_spacing_rules() -> BTreeMap<RoleTag, SpacingRule> {
    BTreeMap::from([
        (RoleTag::ChapterHeading, SpacingRule::new(2, 1)),
        (RoleTag::MajorSection, SpacingRule::new(2, 1)),
        (RoleTag::SectionHeading, SpacingRule::new(1, 0)),
        (RoleTag::SubsectionHeading, SpacingRule::new(1, 0)),
        (RoleTag::FigureTableCaption, SpacingRule::new(1, 1)),
        (RoleTag::QuoteBlock, SpacingRule::new(1, 1)),
        (RoleTag::ListItem, SpacingRule::new(0, 0)),
        (RoleTag::Paragraph, SpacingRule::new(0, 0)),
    ])
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            points_per_line: default_points_per_line(),
            tolerance_points: default_tolerance_points(),
            rules: default_spacing_rules(),
        }
    }
}

// ===== NORMALIZER =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Longest run of blank paragraphs left in place
    #[serde(default = "default_max_blank_run")]
    pub max_blank_run: usize,
    /// Insert page breaks before chapter and major section headings
    #[serde(default = "default_true")]
    pub insert_page_breaks: bool,
    /// Preceding paragraphs searched for an existing page break
    #[serde(default = "default_page_break_lookback")]
    pub page_break_lookback: usize,
    /// Paragraphs after a heading searched for its first content line
    #[serde(default = "default_heading_content_lookahead")]
    pub heading_content_lookahead: usize,
    /// Line-units removed from the "before" rule after a hard section break
    #[serde(default = "default_section_break_discount")]
    pub section_break_discount: u32,
}

fn default_max_blank_run() -> usize {
    1
}

fn default_page_break_lookback() -> usize {
    3
}

fn default_heading_content_lookahead() -> usize {
    2
}

fn default_section_break_discount() -> u32 {
    1
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_blank_run: default_max_blank_run(),
            insert_page_breaks: true,
            page_break_lookback: default_page_break_lookback(),
            heading_content_lookahead: default_heading_content_lookahead(),
            section_break_discount: default_section_break_discount(),
        }
    }
}

// ===== PAGE BREAK CLEANUP =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageBreakConfig {
    /// Paragraphs after a manual page break searched for the heading it belongs to
    #[serde(default = "default_break_heading_lookahead")]
    pub heading_lookahead: usize,
    /// Front-matter titles that legitimately start on a new page (lowercase)
    #[serde(default = "default_preliminary_sections")]
    pub preliminary_sections: Vec<String>,
}

fn default_break_heading_lookahead() -> usize {
    4
}

fn default_preliminary_sections() -> Vec<String> {
    [
        "certificate",
        "acknowledgment",
        "acknowledgement",
        "abstract",
        "table of contents",
        "list of figures",
        "list of tables",
        "list of abbreviations",
        "executive summary",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for PageBreakConfig {
    fn default() -> Self {
        Self {
            heading_lookahead: default_break_heading_lookahead(),
            preliminary_sections: default_preliminary_sections(),
        }
    }
}

// ===== STYLES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// `w:jc` value
    pub fn as_ooxml(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleStyle {
    pub font_size: f32,
    /// Headings are made bold; false leaves existing emphasis untouched
    #[serde(default)]
    pub bold: bool,
    pub alignment: Alignment,
}

/// Page geometry in inches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
    pub page_width: f32,
    pub page_height: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        // A4 with a wider binding margin
        Self {
            top: 1.0,
            bottom: 1.0,
            left: 1.25,
            right: 1.0,
            page_width: 8.27,
            page_height: 11.69,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStyle {
    #[serde(default = "default_true")]
    pub center: bool,
    #[serde(default = "default_body_font_size")]
    pub font_size: f32,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            center: true,
            font_size: default_body_font_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Line spacing multiple applied to every non-empty paragraph
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default = "default_role_styles")]
    pub roles: BTreeMap<RoleTag, RoleStyle>,
    #[serde(default)]
    pub tables: TableStyle,
    #[serde(default)]
    pub page: PageLayout,
}

fn default_font_family() -> String {
    "Times New Roman".to_string()
}

fn default_line_spacing() -> f32 {
    1.5
}

fn default_body_font_size() -> f32 {
    12.0
}

fn style(font_size: f32, bold: bool, alignment: Alignment) -> RoleStyle {
    RoleStyle {
        font_size,
        bold,
        alignment,
    }
}

fn default_role_styles() -> BTreeMap<RoleTag, RoleStyle> {
    BTreeMap::from([
        (RoleTag::ChapterHeading, style(16.0, true, Alignment::Left)),
        (RoleTag::MajorSection, style(16.0, true, Alignment::Left)),
        (RoleTag::SectionHeading, style(14.0, true, Alignment::Left)),
        (RoleTag::SubsectionHeading, style(12.0, true, Alignment::Left)),
        (RoleTag::FigureTableCaption, style(12.0, true, Alignment::Center)),
        (RoleTag::QuoteBlock, style(12.0, false, Alignment::Justify)),
        (RoleTag::ListItem, style(12.0, false, Alignment::Left)),
        (RoleTag::Paragraph, style(12.0, false, Alignment::Justify)),
    ])
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            line_spacing: default_line_spacing(),
            roles: default_role_styles(),
            tables: TableStyle::default(),
            page: PageLayout::default(),
        }
    }
}

// ===== LANGUAGE =====

/// A regex and the text that replaces its matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rewrite {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contraction {
    pub contraction: String,
    pub expansion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Paragraphs mentioning any of these (lowercase) are not checked
    #[serde(default = "default_skip_keywords")]
    pub skip_keywords: Vec<String>,
    #[serde(default = "default_first_person_patterns")]
    pub first_person_patterns: Vec<String>,
    #[serde(default = "default_contractions")]
    pub contractions: Vec<Contraction>,
    #[serde(default = "default_first_person_rewrites")]
    pub first_person_rewrites: Vec<Rewrite>,
    #[serde(default = "default_academic_phrases")]
    pub academic_phrases: Vec<Rewrite>,
}

fn default_skip_keywords() -> Vec<String> {
    ["certificate", "acknowledgment", "acknowledgement", "abstract"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_first_person_patterns() -> Vec<String> {
    [
        r"(?-i)\bI\b",
        r"\bwe\b",
        r"\byou\b",
        r"\bme\b",
        r"\bus\b",
        r"\bmy\b",
        r"\bour\b",
        r"\byour\b",
        r"\bmyself\b",
        r"\bourselves\b",
        r"\byourself\b",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_contractions() -> Vec<Contraction> {
    [
        ("don't", "do not"),
        ("won't", "will not"),
        ("can't", "cannot"),
        ("shouldn't", "should not"),
        ("wouldn't", "would not"),
        ("couldn't", "could not"),
        ("isn't", "is not"),
        ("aren't", "are not"),
        ("wasn't", "was not"),
        ("weren't", "were not"),
        ("haven't", "have not"),
        ("hasn't", "has not"),
        ("hadn't", "had not"),
        ("doesn't", "does not"),
        ("didn't", "did not"),
        ("it's", "it is"),
        ("that's", "that is"),
        ("there's", "there is"),
    ]
    .iter()
    .map(|(contraction, expansion)| Contraction {
        contraction: contraction.to_string(),
        expansion: expansion.to_string(),
    })
    .collect()
}

fn rewrites(pairs: &[(&str, &str)]) -> Vec<Rewrite> {
    pairs
        .iter()
        .map(|(pattern, replacement)| Rewrite {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        })
        .collect()
}

fn default_first_person_rewrites() -> Vec<Rewrite> {
    rewrites(&[
        (r"\bI implemented\b", "The implementation involved"),
        (r"\bI developed\b", "The development process included"),
        (r"\bI created\b", "The creation of"),
        (r"\bI designed\b", "The design process involved"),
        (r"\bI used\b", "The approach utilized"),
        (r"\bI found\b", "The findings revealed"),
        (r"\bI observed\b", "The observation showed"),
        (r"\bI analyzed\b", "The analysis revealed"),
        (r"\bI tested\b", "Testing procedures involved"),
        (r"\bI learned\b", "The learning outcomes included"),
        (r"\bWe implemented\b", "The implementation involved"),
        (r"\bWe developed\b", "The development process included"),
        (r"\bWe created\b", "The creation of"),
        (r"\bWe designed\b", "The design process involved"),
        (r"\bWe used\b", "The approach utilized"),
        (r"\bWe found\b", "The findings revealed"),
        (r"\bWe observed\b", "The observation showed"),
        (r"\bWe analyzed\b", "The analysis revealed"),
        (r"\bWe tested\b", "Testing procedures involved"),
    ])
}

fn default_academic_phrases() -> Vec<Rewrite> {
    rewrites(&[
        (r"\bvery important\b", "significant"),
        (r"\bvery good\b", "effective"),
        (r"\bvery bad\b", "ineffective"),
        (r"\ba lot of\b", "numerous"),
        (r"\bbig\b", "significant"),
        (r"\bsmall\b", "minimal"),
        (r"\bget\b", "obtain"),
        (r"\bmake\b", "create"),
        (r"\bshow\b", "demonstrate"),
        (r"\bprove\b", "demonstrate"),
        (r"\bthing\b", "element"),
        (r"\bstuff\b", "components"),
    ])
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            skip_keywords: default_skip_keywords(),
            first_person_patterns: default_first_person_patterns(),
            contractions: default_contractions(),
            first_person_rewrites: default_first_person_rewrites(),
            academic_phrases: default_academic_phrases(),
        }
    }
}

// ===== CITATIONS =====

/// Well-known site and the source name used when citing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlSource {
    pub domain: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationConfig {
    /// In-text citation formats that count as properly cited
    #[serde(default = "default_apa_patterns")]
    pub apa_patterns: Vec<String>,
    #[serde(default = "default_url_sources")]
    pub url_sources: Vec<UrlSource>,
}

fn default_apa_patterns() -> Vec<String> {
    [
        r"\([A-Za-z]+,\s*\d{4}\)",
        r"\([A-Za-z]+\s+&\s+[A-Za-z]+,\s*\d{4}\)",
        r"\([A-Za-z]+\s+et\s+al\.,\s*\d{4}\)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_url_sources() -> Vec<UrlSource> {
    [
        ("django.com", "Django Software Foundation"),
        ("djangoproject.com", "Django Software Foundation"),
        ("python.org", "Python Software Foundation"),
        ("github.com", "GitHub"),
        ("stackoverflow.com", "Stack Overflow"),
        ("wikipedia.org", "Wikipedia"),
        ("w3schools.com", "W3Schools"),
        ("mozilla.org", "Mozilla Developer Network"),
    ]
    .iter()
    .map(|(domain, name)| UrlSource {
        domain: domain.to_string(),
        name: name.to_string(),
    })
    .collect()
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            apa_patterns: default_apa_patterns(),
            url_sources: default_url_sources(),
        }
    }
}

// ===== PIPELINE =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Stages by name; a stage listed as disabled is skipped by every action
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Name of the stage
    pub name: String,
    /// Whether this stage is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl PipelineConfig {
    pub fn is_enabled(&self, name: &str) -> bool {
        self.rules
            .iter()
            .find(|rule| rule.name == name)
            .map(|rule| rule.enabled)
            .unwrap_or(true)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let names = [
            "AutoFix",
            "LineBreaks",
            "Spacing",
            "PageBreaks",
            "Format",
            "Analyze",
        ];
        Self {
            rules: names
                .iter()
                .map(|name| RuleConfig {
                    name: name.to_string(),
                    enabled: true,
                })
                .collect(),
        }
    }
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            classification: ClassificationConfig::default(),
            spacing: SpacingConfig::default(),
            normalizer: NormalizerConfig::default(),
            page_breaks: PageBreakConfig::default(),
            styles: StyleConfig::default(),
            language: LanguageConfig::default(),
            citations: CitationConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl FormatterConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FormatterConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.spacing.points_per_line <= 0.0 {
            bail!(
                "spacing.points_per_line must be positive, got {}",
                self.spacing.points_per_line
            );
        }
        if self.spacing.tolerance_points < 0.0 {
            bail!(
                "spacing.tolerance_points must not be negative, got {}",
                self.spacing.tolerance_points
            );
        }
        if self.styles.line_spacing <= 0.0 {
            bail!(
                "styles.line_spacing must be positive, got {}",
                self.styles.line_spacing
            );
        }
        for rule in &self.pipeline.rules {
            if Stage::from_name(&rule.name).is_none() {
                bail!("unknown pipeline rule '{}'", rule.name);
            }
        }
        Ok(())
    }
}
