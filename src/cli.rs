//!
//! CLI interface for pdf-upload: argument parsing and the `run` entrypoint.
//!
//! All document, metadata and destination logic lives in the
//! [`pdf-upload-core`] crate; this module only maps arguments onto an
//! [`UploadRequest`], prints the progress line and wires in the GCS client.
//!
//! - For command-line users: use the installed `pdf-upload` binary with `--help`.
//! - For programmatic/integration use: call [`run`] with a constructed [`Cli`],
//!   or [`run_with`] to supply your own [`ObjectStore`].
//!
//! [`pdf-upload-core`]: ../../pdf_upload_core/
use crate::upload::GcsClient;
use anyhow::{Context, Result};
use clap::Parser;
use pdf_upload_core::contract::{ObjectStore, UploadedObject};
use pdf_upload_core::publish::{execute, prepare, UploadPlan, UploadRequest};
use std::path::PathBuf;

/// Upload a PDF to Google Cloud Storage with metadata from its document info.
#[derive(Parser, Debug)]
#[clap(
    name = "pdf-upload",
    version,
    about = "Upload a PDF to Google Cloud Storage with metadata taken from its document info and the command line"
)]
pub struct Cli {
    /// PDF file to upload
    pub filename: PathBuf,

    /// Path in GCS to write the file, e.g. gs://bucket/prefix
    #[clap(long)]
    pub dest_path: String,

    /// User id to add to the file's GCS metadata
    #[clap(long, allow_negative_numbers = true)]
    pub user_id: Option<i64>,

    /// Tags to add to the file's GCS metadata
    #[clap(long, num_args = 1..)]
    pub tags: Vec<String>,
}

impl From<Cli> for UploadRequest {
    fn from(cli: Cli) -> Self {
        UploadRequest {
            filename: cli.filename,
            destination: cli.dest_path,
            user_id: cli.user_id,
            tags: cli.tags,
        }
    }
}

/// Async CLI entrypoint for main() and integration tests. Uploads through a
/// [`GcsClient`] configured from the environment.
///
/// The document and destination are checked before the client is built, so a
/// bad file or `--dest-path` is reported even when the storage environment is
/// misconfigured.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let plan = plan_upload(cli)?;
    let client = GcsClient::new_from_env().context("Failed to configure storage client")?;
    upload_plan(&client, plan).await.map(|_| ())
}

/// Same as [`run`], against the given store.
pub async fn run_with<S>(cli: Cli, store: &S) -> Result<UploadedObject>
where
    S: ObjectStore + ?Sized,
{
    let plan = plan_upload(cli)?;
    upload_plan(store, plan).await
}

fn plan_upload(cli: Cli) -> Result<UploadPlan> {
    let request = UploadRequest::from(cli);
    tracing::info!(
        file = %request.filename.display(),
        dest_path = %request.destination,
        user_id = ?request.user_id,
        tags = ?request.tags,
        "Starting upload"
    );

    let plan = prepare(request)?;
    println!("{}", plan.progress_line());
    Ok(plan)
}

async fn upload_plan<S>(store: &S, plan: UploadPlan) -> Result<UploadedObject>
where
    S: ObjectStore + ?Sized,
{
    match execute(store, plan).await {
        Ok(object) => {
            tracing::info!(bucket = %object.bucket, name = %object.name, "Upload finished");
            Ok(object)
        }
        Err(e) => {
            tracing::error!(error = %e, "Upload failed");
            Err(e.into())
        }
    }
}
