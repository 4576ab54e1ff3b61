use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::Path;

use surveyprog_core::config::AssemblyConfig;
use surveyprog_core::extractor::{parse_raw_facts, HeuristicExtractor};
use surveyprog_core::{AssemblyOutput, ExtractedData, FactExtractor, ProgramAssembler};

#[derive(Parser)]
#[command(name = "surveyprog")]
#[command(about = "Assemble an engineering-survey program document from a template and order text")]
struct Args {
    /// Path to the WordprocessingML template (document.xml)
    #[arg(short, long)]
    template: String,

    /// Order text file(s): the primary order first, supplements after
    #[arg(short, long)]
    source: Vec<String>,

    /// Pre-extracted facts JSON (an AI extractor payload); bypasses
    /// the keyword heuristic except as per-field fallback
    #[arg(long)]
    facts: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Output file path (if not specified, auto-generated based on template)
    #[arg(short, long)]
    output: Option<String>,

    /// Write the assembly report JSON next to the output
    #[arg(long)]
    report: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("🦀 Surveyprog Document Assembler");

    if !Path::new(&args.template).exists() {
        println!("⚠️  Template not found at: {}", args.template);
        println!("   Please check the file path.");
        return Ok(());
    }

    let template = fs::read_to_string(&args.template)
        .with_context(|| format!("reading template {}", args.template))?;

    let config = AssemblyConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {config_path}");
    } else {
        println!("📋 Using default config");
    }

    let mut source_texts = Vec::new();
    for path in &args.source {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading source text {path}"))?;
        source_texts.push(text);
    }

    let assembler = ProgramAssembler::with_config(config);
    let output = if let Some(facts_path) = &args.facts {
        assemble_from_payload(&assembler, &template, facts_path, &source_texts, args.profile)?
    } else {
        if source_texts.is_empty() {
            println!("⚠️  No --source text and no --facts payload; with no facts the program reduces to the baseline work set.");
        }
        let refs: Vec<&str> = source_texts.iter().map(String::as_str).collect();
        let extractor = HeuristicExtractor::new();
        if args.profile {
            let sources: Vec<ExtractedData> = source_texts
                .iter()
                .map(|text| extractor.extract(text, None).unwrap_or_default())
                .collect();
            assembler.assemble_with_profiling(&template, &sources, true)?
        } else {
            assembler.assemble_from_texts(&template, &refs, &extractor)?
        }
    };

    let output_path = args.output.unwrap_or_else(|| derive_output_path(&args.template));
    fs::write(&output_path, &output.document)
        .with_context(|| format!("writing {output_path}"))?;
    println!("💾 Assembled document written to: {output_path}");

    if args.report {
        let report_path = format!("{output_path}.report.json");
        let json = serde_json::to_string_pretty(&output.report)?;
        fs::write(&report_path, json).with_context(|| format!("writing {report_path}"))?;
        println!("💾 Assembly report written to: {report_path}");
    }

    if !output.report.issues.is_empty() {
        println!("⚠️  {} region(s) degraded to no-ops — see the report for details", output.report.issues.len());
    }

    Ok(())
}

/// Assemble from a pre-extracted facts payload, degrading per field to
/// the keyword heuristic over the concatenated source texts.
fn assemble_from_payload(
    assembler: &ProgramAssembler,
    template: &str,
    facts_path: &str,
    source_texts: &[String],
    profile: bool,
) -> Result<AssemblyOutput> {
    let payload = fs::read_to_string(facts_path)
        .with_context(|| format!("reading facts payload {facts_path}"))?;
    let fallback_text = source_texts.join("\n");

    let mut issues = Vec::new();
    let data = parse_raw_facts(&payload, &fallback_text, &mut issues);
    if !issues.is_empty() {
        println!("⚠️  Extractor payload degraded on {} field(s)", issues.len());
    }

    let mut output = assembler.assemble_with_profiling(template, &[data], profile)?;
    output.report.issues.splice(0..0, issues);
    Ok(output)
}

fn derive_output_path(template_path: &str) -> String {
    let path = Path::new(template_path);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("program");
    match path.parent().and_then(|p| p.to_str()) {
        Some(dir) if !dir.is_empty() => format!("{dir}/{stem}_assembled.xml"),
        _ => format!("{stem}_assembled.xml"),
    }
}
