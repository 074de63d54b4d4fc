use crate::config::FormatterConfig;
use crate::docx::Document;
use crate::error::InputError;
use crate::rules::{RuleEngine, Stage, StageReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        println!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    /// Adds a timing measured elsewhere, such as by the rule engine.
    pub fn record(&mut self, step_name: &str, elapsed: Duration) {
        if self.enabled {
            self.timings.push((step_name.to_string(), elapsed));
        }
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            println!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// What the user asked for on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Format,
    Analyze,
    AutoFix,
    LineBreaks,
    Breaks,
    Spacing,
    Both,
    #[default]
    Complete,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Format,
        Action::Analyze,
        Action::AutoFix,
        Action::LineBreaks,
        Action::Breaks,
        Action::Spacing,
        Action::Both,
        Action::Complete,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Action::Format => "format",
            Action::Analyze => "analyze",
            Action::AutoFix => "autofix",
            Action::LineBreaks => "linebreaks",
            Action::Breaks => "breaks",
            Action::Spacing => "spacing",
            Action::Both => "both",
            Action::Complete => "complete",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Action::Format => "apply fonts, sizes, alignment, margins and table layout",
            Action::Analyze => "report first person, contractions and citations (read-only)",
            Action::AutoFix => "rewrite first person, contractions, phrasing and bare URLs",
            Action::LineBreaks => "collapse blank runs, add chapter page breaks, fix spacing",
            Action::Breaks => "remove stray page breaks and add missing ones",
            Action::Spacing => "fix paragraph spacing and line spacing",
            Action::Both => "format, then analyze",
            Action::Complete => "auto-fix, normalize, format, then analyze",
        }
    }

    pub fn stages(&self) -> &'static [Stage] {
        match self {
            Action::Format => &[Stage::Format],
            Action::Analyze => &[Stage::Analyze],
            Action::AutoFix => &[Stage::AutoFix],
            Action::LineBreaks => &[Stage::LineBreaks],
            Action::Breaks => &[Stage::PageBreaks],
            Action::Spacing => &[Stage::Spacing],
            Action::Both => &[Stage::Format, Stage::Analyze],
            Action::Complete => &[
                Stage::AutoFix,
                Stage::LineBreaks,
                Stage::Format,
                Stage::Analyze,
            ],
        }
    }

    /// File-name prefix of the default output; `None` when nothing is written.
    pub fn output_prefix(&self) -> Option<&'static str> {
        match self {
            Action::Format | Action::Both => Some("formatted_"),
            Action::Analyze => None,
            Action::AutoFix => Some("auto_fixed_"),
            Action::LineBreaks => Some("line_break_fixed_"),
            Action::Breaks => Some("page_optimized_"),
            Action::Spacing => Some("spacing_optimized_"),
            Action::Complete => Some("final_"),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.keyword() == lower)
            .ok_or_else(|| {
                let known: Vec<&str> = Action::ALL.iter().map(|a| a.keyword()).collect();
                format!("unknown action '{s}', expected one of: {}", known.join(", "))
            })
    }
}

/// Checks the input before any stage runs.
pub fn validate_input(path: &Path) -> Result<(), InputError> {
    if !path.is_file() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    let is_docx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
    if !is_docx {
        return Err(InputError::WrongExtension(path.to_path_buf()));
    }
    Ok(())
}

/// `<prefix><file name>` next to the input.
pub fn default_output_path(input: &Path, action: Action) -> Option<PathBuf> {
    let prefix = action.output_prefix()?;
    let name = input.file_name()?.to_string_lossy();
    Some(input.with_file_name(format!("{prefix}{name}")))
}

#[derive(Debug, Clone, Default)]
pub struct ProcessingOptions {
    /// Overrides the default output path
    pub output: Option<PathBuf>,
    /// Run every stage but do not write the output
    pub dry_run: bool,
    /// Print per-step timings
    pub profile: bool,
    /// Overrides `normalizer.insert_page_breaks`
    pub insert_page_breaks: Option<bool>,
}

/// Everything one run did, written by `--report`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingSummary {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub action: Action,
    pub dry_run: bool,
    pub profile: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// SHA-256 of document.xml before and after the stages ran
    pub digest_before: String,
    pub digest_after: String,
    pub stages: Vec<StageReport>,
    pub timings_ms: Vec<(String, u128)>,
}

impl ProcessingSummary {
    pub fn changed(&self) -> bool {
        self.digest_before != self.digest_after
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("failed to write report to {}", path.display()))
    }
}

pub struct DocumentProcessor {
    config: FormatterConfig,
}

impl DocumentProcessor {
    pub fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Runs the action's stages on an in-memory document.
    pub fn process_document(
        &self,
        document: &mut Document,
        action: Action,
        options: &ProcessingOptions,
    ) -> Result<(Vec<StageReport>, Vec<(String, Duration)>)> {
        let mut engine = RuleEngine::new(&self.config)?;
        if let Some(enabled) = options.insert_page_breaks {
            engine.set_insert_page_breaks(enabled);
        }
        let reports = engine.apply_rules(document, action.stages())?;
        let timings = engine.rule_timings.borrow().clone();
        Ok((reports, timings))
    }

    pub fn process_file(
        &self,
        input: &Path,
        action: Action,
        options: &ProcessingOptions,
    ) -> Result<ProcessingSummary> {
        validate_input(input)?;

        let start_time = Instant::now();
        let started_at = Utc::now();
        let mut profiler = StepProfiler::new(options.profile);

        println!("📄 Processing document: {}", input.display());
        println!("🎯 Action: {} ({})", action, action.description());

        let mut document = profiler
            .time_step("Load document", || Document::open(input))
            .with_context(|| format!("failed to open {}", input.display()))?;
        let digest_before = document.content_digest()?;

        let (stages, timings) = self.process_document(&mut document, action, options)?;
        for (name, elapsed) in &timings {
            profiler.record(name, *elapsed);
        }
        let digest_after = document.content_digest()?;

        let output = action
            .output_prefix()
            .and_then(|_| options.output.clone().or_else(|| default_output_path(input, action)));

        if let Some(path) = &output {
            if options.dry_run {
                println!("🧪 Dry run: not writing {}", path.display());
            } else {
                profiler
                    .time_step("Save document", || document.save(path))
                    .with_context(|| format!("failed to save {}", path.display()))?;
                println!("💾 Saved: {}", path.display());
            }
        }

        profiler.print_summary();
        println!(
            "⏱️  Total processing time: {:.0}ms",
            start_time.elapsed().as_millis()
        );

        Ok(ProcessingSummary {
            input: input.to_path_buf(),
            output,
            action,
            dry_run: options.dry_run,
            profile: self.config.profile.clone(),
            started_at,
            finished_at: Utc::now(),
            digest_before,
            digest_after,
            stages,
            timings_ms: timings
                .into_iter()
                .map(|(name, elapsed)| (name, elapsed.as_millis()))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_keywords_parse() {
        for action in Action::ALL {
            assert_eq!(action.keyword().parse::<Action>(), Ok(action));
        }
        assert_eq!("AutoFix".parse::<Action>(), Ok(Action::AutoFix));
        assert!("publish".parse::<Action>().is_err());
        assert_eq!(Action::default(), Action::Complete);
    }

    #[test]
    fn stage_lists_per_action() {
        assert_eq!(Action::Breaks.stages(), &[Stage::PageBreaks]);
        assert_eq!(Action::Both.stages(), &[Stage::Format, Stage::Analyze]);
        assert_eq!(
            Action::Complete.stages(),
            &[Stage::AutoFix, Stage::LineBreaks, Stage::Format, Stage::Analyze]
        );
    }

    #[test]
    fn default_output_sits_next_to_input() {
        let input = Path::new("/reports/internship.docx");
        assert_eq!(
            default_output_path(input, Action::Complete),
            Some(PathBuf::from("/reports/final_internship.docx"))
        );
        assert_eq!(
            default_output_path(input, Action::LineBreaks),
            Some(PathBuf::from("/reports/line_break_fixed_internship.docx"))
        );
        assert_eq!(default_output_path(input, Action::Analyze), None);
    }

    #[test]
    fn input_validation() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.docx");
        assert!(matches!(
            validate_input(&missing),
            Err(InputError::NotFound(_))
        ));

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "plain").unwrap();
        assert!(matches!(
            validate_input(&text),
            Err(InputError::WrongExtension(_))
        ));

        let upper = dir.path().join("REPORT.DOCX");
        std::fs::write(&upper, "zip").unwrap();
        assert!(validate_input(&upper).is_ok());
    }

    #[test]
    fn profiler_disabled_records_nothing() {
        let mut profiler = StepProfiler::new(false);
        let value = profiler.time_step("step", || 42);
        profiler.record("other", Duration::from_millis(5));
        assert_eq!(value, 42);
        assert!(profiler.timings.is_empty());
    }
}
