use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

// Import from reportfmt-core
use reportfmt_core::{Action, DocumentProcessor, FormatterConfig, ProcessingOptions};

// Import CLI utilities
use reportfmt::{load_config, user_config_path};

#[derive(Parser)]
#[command(name = "reportfmt")]
#[command(about = "Format and check .docx internship reports against the institutional template")]
struct Args {
    /// Path to the .docx report to process
    document: Option<PathBuf>,

    /// Action: format, analyze, autofix, linebreaks, breaks, spacing, both, complete
    #[arg(default_value = "complete")]
    action: Action,

    /// Output file path (default: <prefix><name>.docx next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run every stage but do not write the output document
    #[arg(long)]
    dry_run: bool,

    /// Write the processing summary with all stage reports as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Do not insert page breaks before chapter headings
    #[arg(long)]
    no_page_breaks: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Print the default configuration as YAML and exit
    #[arg(long)]
    show_config: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("🦀 reportfmt Internship Report Formatter");

    if args.show_config {
        println!("{}", FormatterConfig::default().to_yaml()?);
        return Ok(());
    }

    let Some(document) = &args.document else {
        show_help();
        return Ok(());
    };

    if !document.exists() {
        println!("⚠️  Document not found at: {}", document.display());
        println!("   Please check the file path.");
        return Ok(());
    }

    let (config, source) = match load_config(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ Config loading failed: {e:#}");
            return Ok(());
        }
    };
    println!("📋 {}", source.describe());

    let options = ProcessingOptions {
        output: args.output.clone(),
        dry_run: args.dry_run,
        profile: args.profile,
        insert_page_breaks: args.no_page_breaks.then_some(false),
    };

    let processor = DocumentProcessor::new(config);
    match processor.process_file(document, args.action, &options) {
        Ok(summary) => {
            if summary.changed() {
                println!("✅ Successfully processed document");
            } else {
                println!("✅ Document already conforms, no changes needed");
            }

            if let Some(report_path) = &args.report {
                match summary.write_json(report_path) {
                    Ok(()) => println!("💾 Report saved to: {}", report_path.display()),
                    Err(e) => eprintln!("❌ Report writing failed: {e:#}"),
                }
            }
        }
        Err(e) => {
            eprintln!("❌ Processing failed: {e:#}");
        }
    }

    Ok(())
}

fn show_help() {
    println!("\n📋 Usage: reportfmt <document.docx> [action] [options]");

    println!("\n🎯 Actions:");
    for action in Action::ALL {
        println!("  {:<12} {}", action.keyword(), action.description());
    }

    println!("\n⚙️  Options:");
    println!("  -o, --output <path>     Output file path (auto-generated if not specified)");
    println!("  -c, --config <path>     Load custom config file");
    println!("  --dry-run               Process in memory without writing the document");
    println!("  --report <path>         Save the processing summary as JSON");
    println!("  --no-page-breaks        Do not insert page breaks before chapters");
    println!("  --profile               Print per-stage timings");
    println!("  --show-config           Print the default configuration as YAML");

    if let Some(path) = user_config_path() {
        println!("\n📁 User config (used when no --config is given):");
        println!("  {}", path.display());
    }

    println!("\n📝 Usage Examples:");
    println!("  reportfmt report.docx");
    println!("  reportfmt report.docx analyze");
    println!("  reportfmt report.docx linebreaks --no-page-breaks -o fixed.docx");
    println!("  reportfmt report.docx complete -c template.yaml --report summary.json");
}
