//! Batch command - extract many document files with a bounded worker pool.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use docket_core::extract::DocumentExtractor;
use docket_core::models::document::{CanonicalDocument, DocumentType, FieldKey};

use super::extract::{format_document, read_text, resolve_type};
use super::{load_config, parse_document_type, OutputFormat};

/// Columns of `summary.csv`.
const SUMMARY_HEADER: [&str; 10] = [
    "filename",
    "status",
    "document_type",
    "container_number",
    "bl_number",
    "gross_weight",
    "fields_extracted",
    "degraded",
    "processing_time_ms",
    "error",
];

#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern selecting the document text files
    #[arg(required = true)]
    pattern: String,

    /// Declared type for every file (detected per file when omitted)
    #[arg(short = 't', long = "type", value_parser = parse_document_type)]
    document_type: Option<DocumentType>,

    /// Directory receiving one output file per input
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Write summary.csv (into --output-dir when given)
    #[arg(long)]
    summary: bool,

    /// Files extracted concurrently (default: batch.max_concurrency)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Report failed files instead of aborting
    #[arg(long)]
    continue_on_error: bool,
}

/// Extraction result for one input file.
struct FileOutcome {
    path: PathBuf,
    result: Result<CanonicalDocument, String>,
    elapsed: Duration,
}

impl FileOutcome {
    fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    fn summary_row(&self) -> Vec<String> {
        let millis = self.elapsed.as_millis().to_string();
        match &self.result {
            Ok(doc) => {
                let value = |key| doc.value(key).map(|v| v.to_string()).unwrap_or_default();
                vec![
                    self.file_name().to_string(),
                    "success".to_string(),
                    doc.document_type.to_string(),
                    value(FieldKey::ContainerNumber),
                    value(FieldKey::BlNumber),
                    value(FieldKey::GrossWeight),
                    format!("{}/{}", doc.present_count(), doc.fields.len()),
                    doc.degraded.to_string(),
                    millis,
                    String::new(),
                ]
            }
            Err(e) => {
                let mut row = vec![String::new(); SUMMARY_HEADER.len()];
                row[0] = self.file_name().to_string();
                row[1] = "error".to_string();
                row[8] = millis;
                row[9] = e.clone();
                row
            }
        }
    }
}

/// Tallies printed after a run.
#[derive(Default)]
struct BatchSummary {
    succeeded: usize,
    degraded: usize,
    failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    fn tally(outcomes: &[FileOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match &outcome.result {
                Ok(doc) => {
                    summary.succeeded += 1;
                    if doc.degraded {
                        summary.degraded += 1;
                    }
                }
                Err(e) => summary.failed.push((outcome.path.clone(), e.clone())),
            }
        }
        summary
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let started = Instant::now();
    let config = load_config(config_path)?;

    let mut inputs = Vec::new();
    for entry in glob::glob(&args.pattern)? {
        match entry {
            Ok(path) if path.is_file() => inputs.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable path: {}", e),
        }
    }
    if inputs.is_empty() {
        anyhow::bail!("No files match {}", args.pattern);
    }

    let jobs = args.jobs.unwrap_or(config.batch.max_concurrency).max(1);
    println!(
        "{} Extracting {} files with {} workers",
        style("ℹ").blue(),
        inputs.len(),
        jobs
    );

    let bar = ProgressBar::new(inputs.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {elapsed_precise} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let extractor = DocumentExtractor::new(config.extraction.clone());
    let declared = args.document_type;

    let mut outcomes: Vec<FileOutcome> = stream::iter(inputs)
        .map(|path| {
            let extractor = &extractor;
            let bar = &bar;
            async move {
                let file_started = Instant::now();
                let result = extract_file(extractor, &path, declared)
                    .await
                    .map_err(|e| e.to_string());
                bar.inc(1);
                FileOutcome {
                    path,
                    result,
                    elapsed: file_started.elapsed(),
                }
            }
        })
        .buffer_unordered(jobs)
        .collect()
        .await;
    bar.finish_and_clear();

    // Workers finish out of order
    outcomes.sort_by(|a, b| a.path.cmp(&b.path));
    let summary = BatchSummary::tally(&outcomes);

    if let Some((path, e)) = summary.failed.first() {
        if !args.continue_on_error {
            anyhow::bail!("{}: {} (use --continue-on-error to skip)", path.display(), e);
        }
    }

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)?;
        for outcome in &outcomes {
            if let Ok(doc) = &outcome.result {
                write_output(dir, &outcome.path, doc, args.format)?;
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_deref()
            .unwrap_or_else(|| Path::new("."))
            .join("summary.csv");
        write_summary(&summary_path, &outcomes)?;
        println!("{} Summary: {}", style("✓").green(), summary_path.display());
    }

    println!(
        "{} Processed {} files in {:.2?}: {} ok ({} degraded), {} failed",
        style("✓").green(),
        outcomes.len(),
        started.elapsed(),
        style(summary.succeeded).green(),
        style(summary.degraded).yellow(),
        style(summary.failed.len()).red()
    );
    for (path, e) in &summary.failed {
        println!("  {} {}: {}", style("✗").red(), path.display(), e);
    }

    Ok(())
}

async fn extract_file(
    extractor: &DocumentExtractor,
    path: &Path,
    declared: Option<DocumentType>,
) -> anyhow::Result<CanonicalDocument> {
    let text = read_text(path)?;
    let document_type = resolve_type(declared, &text);
    Ok(extractor.extract(&text, document_type).await)
}

fn write_output(
    dir: &Path,
    input: &Path,
    doc: &CanonicalDocument,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let extension = match format {
        OutputFormat::Json => "json",
        OutputFormat::Csv => "csv",
        OutputFormat::Text => "txt",
    };
    let target = dir.join(format!("{}.{}", stem, extension));
    fs::write(&target, format_document(doc, format)?)?;
    debug!("{} -> {}", input.display(), target.display());
    Ok(())
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(SUMMARY_HEADER)?;
    for outcome in outcomes {
        writer.write_record(outcome.summary_row())?;
    }
    writer.flush()?;
    Ok(())
}
