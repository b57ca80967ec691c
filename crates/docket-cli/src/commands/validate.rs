//! Validate command - run the rule set over a stored shipment.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use docket_core::models::report::{Decision, Severity, ValidationReport};
use docket_core::models::shipment::ShipmentId;
use docket_core::pipeline::CompliancePipeline;

use super::{load_config, open_store, save_store, OutputFormat};

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Shipment to validate
    #[arg(required = true)]
    shipment_id: String,

    /// Store snapshot file
    #[arg(short, long)]
    store: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Exit with an error when the decision is REJECT
    #[arg(long)]
    fail_on_reject: bool,
}

pub async fn run(args: ValidateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&args.store)?;
    let pipeline = CompliancePipeline::from_store(config, store.clone())?;

    let report = pipeline
        .validate(&ShipmentId::new(args.shipment_id.as_str()))
        .await?;
    save_store(&store, &args.store).await?;
    info!("Validation recorded in {}", args.store.display());

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Csv => format_report_csv(&report)?,
        OutputFormat::Text => format_report_text(&report),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Report written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.fail_on_reject && report.decision == Decision::Reject {
        anyhow::bail!("Shipment {} was rejected", report.shipment_id);
    }
    Ok(())
}

fn format_report_csv(report: &ValidationReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rule_id",
        "rule_name",
        "category",
        "severity",
        "passed",
        "message",
        "subject_document_id",
    ])?;
    for result in &report.results {
        wtr.write_record([
            result.rule_id.as_str(),
            result.rule_name.as_str(),
            &result.category.to_string(),
            &result.severity.to_string(),
            if result.passed { "true" } else { "false" },
            result.message.as_str(),
            result
                .subject_document_id
                .as_ref()
                .map(|d| d.as_str())
                .unwrap_or(""),
        ])?;
    }
    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_report_text(report: &ValidationReport) -> String {
    let mut output = String::new();
    let decision = match report.decision {
        Decision::Approve => style(report.decision.to_string()).green(),
        Decision::Hold => style(report.decision.to_string()).yellow(),
        Decision::Reject => style(report.decision.to_string()).red(),
    };
    output.push_str(&format!(
        "Shipment {} ({}): {}\n",
        report.shipment_id, report.product_type, decision
    ));
    output.push_str(&format!(
        "{} rules, {} errors, {} warnings\n\n",
        report.results.len(),
        report.failure_count(Severity::Error),
        report.failure_count(Severity::Warning)
    ));

    for result in &report.results {
        let mark = if result.passed {
            style("✓").green()
        } else {
            match result.severity {
                Severity::Error => style("✗").red(),
                Severity::Warning => style("!").yellow(),
                Severity::Info => style("?").blue(),
            }
        };
        output.push_str(&format!(
            "  {} {:<9} {:<8} {}\n",
            mark,
            result.rule_id,
            result.severity.to_string(),
            result.message
        ));
    }
    output
}
