//! Command handlers for bucket-upload CLI

use crate::Cli;
use anyhow::{Context, Result};
use bucket_upload_core::{
    clamp_concurrency, load_config, parse_headers, plan_upload, validate_config, IgnoreSettings,
    ObjectMetadata, ObjectOptions, ObjectUpload, StorageClient, UploadObserver, UploadOptions,
    UploadPlan, UploadRequest, Uploader,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::{info, warn};

/// Name of the step output listing uploaded objects
const OUTPUT_NAME: &str = "uploaded";

/// Handle an upload run
pub async fn handle_upload(cli: Cli) -> Result<()> {
    let metadata = match cli.headers.as_deref() {
        Some(headers) => parse_headers(headers)?,
        None => ObjectMetadata::default(),
    };

    let request = UploadRequest {
        workspace: cli.workspace.clone(),
        path: cli.path.clone(),
        destination: cli.destination.clone(),
        glob: cli.glob.clone(),
        parent: cli.parent,
        ignore: IgnoreSettings {
            enabled: cli.process_gcloudignore,
            path: cli.gcloudignore_path.clone(),
        },
    };

    let plan = plan_upload(&request)?;
    let concurrency = clamp_concurrency(cli.concurrency, plan.objects.len())?;

    if plan.objects.is_empty() {
        warn!(path = %cli.path, glob = %cli.glob, "no files found to upload");
        return report(&[], cli.json);
    }

    if cli.dry_run {
        if !cli.json {
            print_plan(&plan);
        }
        let planned: Vec<String> = plan.objects.iter().map(|o| o.destination.clone()).collect();
        return report(&planned, cli.json);
    }

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.storage.endpoint = Some(endpoint);
    }
    if let Some(region) = cli.region {
        config.storage.region = region;
    }
    validate_config(&config)?;

    let client = StorageClient::new(&config.storage, plan.bucket.clone()).await?;

    let progress = ProgressBar::new(plan.objects.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?.progress_chars("=> "),
    );

    let options = UploadOptions {
        concurrency,
        gzip: cli.gzip,
        resumable: cli.resumable,
        predefined_acl: cli.predefined_acl,
        metadata,
        ..UploadOptions::default()
    }
    .with_observer(Arc::new(ProgressObserver {
        progress: progress.clone(),
    }));

    info!(bucket = %plan.bucket, objects = plan.objects.len(), "uploading");
    let result = Uploader::new(client).upload(&plan.objects, &options).await;
    progress.finish_and_clear();

    let uploaded = result?;
    info!(bucket = %plan.bucket, objects = uploaded.len(), "✅ upload complete");
    report(&uploaded, cli.json)
}

/// Advances the progress bar as objects are handed to the store
struct ProgressObserver {
    progress: ProgressBar,
}

impl UploadObserver for ProgressObserver {
    fn on_upload_object(
        &self,
        source: &Path,
        destination: &str,
        options: &ObjectOptions,
    ) -> bucket_upload_core::Result<()> {
        info!(
            source = %source.display(),
            destination,
            gzip = options.gzip,
            resumable = options.resumable,
            "uploading object"
        );
        self.progress.set_message(destination.to_string());
        self.progress.inc(1);
        Ok(())
    }
}

/// Print the planned uploads as a table
fn print_plan(plan: &UploadPlan) {
    #[derive(Tabled)]
    struct PlanRow {
        source: String,
        object: String,
    }

    let rows: Vec<PlanRow> = plan
        .objects
        .iter()
        .map(|ObjectUpload { source, destination }| PlanRow {
            source: source.display().to_string(),
            object: format!("{}/{}", plan.bucket, destination),
        })
        .collect();

    println!("Planned {} upload(s):", rows.len());
    println!("{}", Table::new(rows));
}

/// Print the uploaded object list and set the step output
fn report(objects: &[String], json: bool) -> Result<()> {
    let joined = objects.join(",");

    if json {
        println!("{}", serde_json::to_string(objects)?);
    } else {
        println!("{}", joined);
    }

    write_step_output(OUTPUT_NAME, &joined)
}

/// Append `name=value` to the file named by `GITHUB_OUTPUT`, when running in Actions
fn write_step_output(name: &str, value: &str) -> Result<()> {
    let Some(path) = std::env::var_os("GITHUB_OUTPUT") else {
        return Ok(());
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open step output file {}", Path::new(&path).display()))?;
    writeln!(file, "{}={}", name, value)?;

    Ok(())
}
