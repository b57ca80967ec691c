//! Extract command - canonical fields from a single document text file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use docket_core::extract::{classify, DocumentExtractor};
use docket_core::models::document::{CanonicalDocument, DocumentType};

use super::{load_config, parse_document_type, OutputFormat};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file holding the document text
    #[arg(required = true)]
    input: PathBuf,

    /// Declared document type (detected from the text when omitted)
    #[arg(short = 't', long = "type", value_parser = parse_document_type)]
    document_type: Option<DocumentType>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Extracting fields from {}", args.input.display());
    let text = read_text(&args.input)?;
    let document_type = resolve_type(args.document_type, &text);

    let extractor = DocumentExtractor::new(config.extraction);
    let document = extractor.extract(&text, document_type).await;

    if document.degraded {
        eprintln!(
            "{} Extraction degraded: {}",
            style("⚠").yellow(),
            document.warnings.join("; ")
        );
    }

    let output = format_document(&document, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

/// Read a document's text layer, replacing invalid UTF-8.
pub fn read_text(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// The declared type, or the classifier's guess.
pub fn resolve_type(declared: Option<DocumentType>, text: &str) -> DocumentType {
    declared.unwrap_or_else(|| {
        let guess = classify(text);
        debug!(
            "Classified document as {} (score {})",
            guess.document_type, guess.score
        );
        guess.document_type
    })
}

pub fn format_document(document: &CanonicalDocument, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(document)?),
        OutputFormat::Csv => format_document_csv(document),
        OutputFormat::Text => Ok(format_document_text(document)),
    }
}

fn format_document_csv(document: &CanonicalDocument) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["field", "value", "confidence", "source"])?;
    for (key, field) in &document.fields {
        wtr.write_record([
            key.as_str(),
            &field.value.as_ref().map(|v| v.to_string()).unwrap_or_default(),
            &format!("{:.2}", field.confidence),
            &serde_json::to_value(field.source)?
                .as_str()
                .unwrap_or_default()
                .to_string(),
        ])?;
    }
    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_document_text(document: &CanonicalDocument) -> String {
    let mut output = String::new();
    output.push_str(&format!("Document type: {}\n", document.document_type));
    output.push_str(&format!(
        "Fields: {}/{} extracted\n\n",
        document.present_count(),
        document.fields.len()
    ));

    for (key, field) in &document.fields {
        match &field.value {
            Some(value) => output.push_str(&format!(
                "  {:<22} {} ({:.0}%)\n",
                key.as_str(),
                value,
                field.confidence * 100.0
            )),
            None => output.push_str(&format!("  {:<22} -\n", key.as_str())),
        }
    }

    if !document.warnings.is_empty() {
        output.push_str("\nWarnings:\n");
        for warning in &document.warnings {
            output.push_str(&format!("  - {}\n", warning));
        }
    }
    output
}
