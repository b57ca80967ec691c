//! Sync command - preview and apply document-to-shipment syncs.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use docket_core::models::document::{DocumentId, FieldKey, FieldValue};
use docket_core::models::sync::{
    ApplySyncRequest, ChangeKind, FieldStatus, SyncPreview, SyncResult,
};
use docket_core::pipeline::CompliancePipeline;

use super::{load_config, open_store, save_store};

/// Arguments for the sync command.
#[derive(Args)]
pub struct SyncArgs {
    #[command(subcommand)]
    command: SyncCommand,
}

#[derive(Subcommand)]
enum SyncCommand {
    /// Show what a sync would change, without writing
    Preview(PreviewArgs),

    /// Write accepted fields to the shipment
    Apply(ApplyArgs),

    /// Apply the sync if every change only fills blanks or placeholders
    Auto(StoreArgs),
}

#[derive(Args)]
struct StoreArgs {
    /// Document to sync from
    document_id: String,

    /// Store snapshot file
    #[arg(short, long)]
    store: PathBuf,

    /// Print JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PreviewArgs {
    #[command(flatten)]
    common: StoreArgs,

    /// Save the preview for a later `sync apply --preview`
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Args)]
struct ApplyArgs {
    #[command(flatten)]
    common: StoreArgs,

    /// Accepted field (repeatable; defaults to the preview's proposed fields)
    #[arg(short, long = "field", value_parser = parse_field_key, value_delimiter = ',')]
    fields: Vec<FieldKey>,

    /// Who accepted the sync
    #[arg(short, long)]
    actor: String,

    /// Saved preview; fields that changed since are reported as conflicted
    #[arg(short, long)]
    preview: Option<PathBuf>,
}

pub async fn run(args: SyncArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        SyncCommand::Preview(preview_args) => preview(preview_args, config_path).await,
        SyncCommand::Apply(apply_args) => apply(apply_args, config_path).await,
        SyncCommand::Auto(auto_args) => auto(auto_args, config_path).await,
    }
}

fn parse_field_key(value: &str) -> Result<FieldKey, String> {
    FieldKey::from_str(value).ok_or_else(|| format!("unknown field '{}'", value))
}

async fn preview(args: PreviewArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&args.common.store)?;
    let pipeline = CompliancePipeline::from_store(config, store)?;

    let preview = pipeline
        .preview_sync(&DocumentId::new(args.common.document_id.as_str()))
        .await?;

    if let Some(path) = &args.save {
        fs::write(path, serde_json::to_string_pretty(&preview)?)?;
        eprintln!("{} Preview saved to {}", style("✓").green(), path.display());
    }

    if args.common.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        print!("{}", format_preview(&preview));
    }
    Ok(())
}

async fn apply(args: ApplyArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let document_id = DocumentId::new(args.common.document_id.as_str());

    let saved = match &args.preview {
        Some(path) => {
            let saved: SyncPreview = serde_json::from_str(&fs::read_to_string(path)?)?;
            if saved.document_id != document_id {
                anyhow::bail!(
                    "Preview {} was computed for document {}, not {}",
                    path.display(),
                    saved.document_id,
                    document_id
                );
            }
            Some(saved)
        }
        None if args.fields.is_empty() => {
            anyhow::bail!("No fields accepted. Pass --field or --preview.");
        }
        None => None,
    };

    let store = open_store(&args.common.store)?;
    let pipeline = CompliancePipeline::from_store(config, store.clone())?;

    // Without a saved preview, accept against the shipment as it is now.
    let preview = match saved {
        Some(saved) => saved,
        None => pipeline.preview_sync(&document_id).await?,
    };
    let fields = if args.fields.is_empty() {
        preview.proposed_fields()
    } else {
        args.fields.clone()
    };
    let request = ApplySyncRequest::from_preview(&preview, fields, args.actor.as_str());

    let result = pipeline.apply_sync(&request).await?;
    save_store(&store, &args.common.store).await?;

    if args.common.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", format_result(&result));
    }
    Ok(())
}

async fn auto(args: StoreArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&args.store)?;
    let pipeline = CompliancePipeline::from_store(config, store.clone())?;

    let outcome = pipeline
        .auto_sync(&DocumentId::new(args.document_id.as_str()), None)
        .await?;
    if outcome.result.is_some() {
        save_store(&store, &args.store).await?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    match &outcome.result {
        Some(result) => print!("{}", format_result(result)),
        None => {
            print!("{}", format_preview(&outcome.preview));
            println!(
                "{} Not applied: {}",
                style("ℹ").blue(),
                outcome
                    .preview
                    .blocked_reason
                    .as_deref()
                    .unwrap_or("changes need operator review")
            );
        }
    }
    Ok(())
}

fn display(value: Option<&FieldValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn format_preview(preview: &SyncPreview) -> String {
    let mut output = format!(
        "Document {} -> shipment {} (version {})\n",
        preview.document_id, preview.shipment_id, preview.shipment_version
    );
    for change in &preview.changes {
        if matches!(change.kind, ChangeKind::NoValue | ChangeKind::Unchanged) {
            continue;
        }
        let mark = if change.locked {
            style("locked").red()
        } else if change.will_update {
            style("update").green()
        } else {
            style("review").yellow()
        };
        output.push_str(&format!(
            "  [{}] {:<20} {} -> {} ({:.0}%)\n",
            mark,
            change.field.as_str(),
            display(change.current_value.as_ref()),
            display(change.new_value.as_ref()),
            change.confidence * 100.0
        ));
    }
    output.push_str(&format!(
        "Auto-sync: {}\n",
        if preview.auto_synced { "yes" } else { "no" }
    ));
    output
}

fn format_result(result: &SyncResult) -> String {
    let mut output = format!(
        "Shipment {} now at version {}\n",
        result.shipment_id, result.shipment_version
    );
    for outcome in &result.outcomes {
        let status = match outcome.status {
            FieldStatus::Written => style("written").green(),
            FieldStatus::Conflicted => style("conflicted").red(),
            FieldStatus::Protected => style("protected").yellow(),
            FieldStatus::Unchanged => style("unchanged").dim(),
            FieldStatus::NoValue => style("no value").dim(),
            FieldStatus::NotInDocument => style("not in document").dim(),
        };
        output.push_str(&format!(
            "  {:<20} {} ({} -> {})\n",
            outcome.field.as_str(),
            status,
            display(outcome.before.as_ref()),
            display(outcome.after.as_ref())
        ));
    }
    output
}
