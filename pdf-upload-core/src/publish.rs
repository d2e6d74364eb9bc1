//! Orchestrates one upload: metadata → destination → object store.
//!
//! The flow is split in two so the caller can report progress in between:
//!   - [`prepare`] reads the document and resolves the destination (no network)
//!   - [`execute`] checks the bucket and uploads the file through an [`ObjectStore`]
//!
//! Each step fails fast; nothing is retried and nothing needs cleaning up
//! since the upload is a single request.

use std::path::PathBuf;

use tracing::{error, info};

use crate::contract::{ObjectStore, ObjectUpload, StoreError, UploadedObject};
use crate::destination::{resolve_destination, Destination, DestinationError};
use crate::doc_info::DocumentError;
use crate::metadata::{build_metadata, UploadMetadata};

/// Content type stored with every uploaded document.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Caller input for one upload, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub filename: PathBuf,
    pub destination: String,
    pub user_id: Option<i64>,
    pub tags: Vec<String>,
}

/// A resolved upload, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub source: PathBuf,
    pub destination: Destination,
    pub metadata: UploadMetadata,
}

impl UploadPlan {
    /// Human-readable progress line for this upload.
    pub fn progress_line(&self) -> String {
        format!("Uploading {} to {}", self.source.display(), self.destination)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Destination(#[from] DestinationError),
    #[error("bucket {bucket} is not available: {source}")]
    Bucket {
        bucket: String,
        #[source]
        source: StoreError,
    },
    #[error("upload to {destination} failed: {source}")]
    Upload {
        destination: String,
        #[source]
        source: StoreError,
    },
}

/// Builds the metadata from the document and resolves where it goes.
pub fn prepare(request: UploadRequest) -> Result<UploadPlan, PublishError> {
    let UploadRequest {
        filename,
        destination,
        user_id,
        tags,
    } = request;

    let metadata = build_metadata(&filename, user_id, &tags)?;
    let destination = resolve_destination(&destination, &filename)?;
    info!(
        file = %filename.display(),
        destination = %destination,
        "Upload prepared"
    );

    Ok(UploadPlan {
        source: filename,
        destination,
        metadata,
    })
}

/// Sends a prepared upload to `store`.
pub async fn execute<S>(store: &S, plan: UploadPlan) -> Result<UploadedObject, PublishError>
where
    S: ObjectStore + ?Sized,
{
    let UploadPlan {
        source,
        destination,
        metadata,
    } = plan;

    match store.get_bucket(&destination.bucket).await {
        Ok(bucket) => {
            info!(bucket = %bucket.name, location = ?bucket.location, "Bucket found");
        }
        Err(e) => {
            error!(bucket = %destination.bucket, error = %e, "Bucket lookup failed");
            return Err(PublishError::Bucket {
                bucket: destination.bucket,
                source: e,
            });
        }
    }

    let upload = ObjectUpload {
        source,
        bucket: destination.bucket.clone(),
        object_key: destination.object_key.clone(),
        content_type: PDF_CONTENT_TYPE.to_string(),
        metadata: metadata.into_map(),
    };

    match store.upload_file(upload).await {
        Ok(object) => {
            info!(
                bucket = %object.bucket,
                name = %object.name,
                size = ?object.size,
                generation = ?object.generation,
                "Upload complete"
            );
            Ok(object)
        }
        Err(e) => {
            error!(destination = %destination, error = %e, "Upload failed");
            Err(PublishError::Upload {
                destination: destination.to_string(),
                source: e,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_line_names_source_and_destination() {
        let plan = UploadPlan {
            source: PathBuf::from("docs/report.pdf"),
            destination: Destination {
                bucket: "mx-docs".into(),
                object_key: "incoming/report.pdf".into(),
            },
            metadata: UploadMetadata::default(),
        };
        assert_eq!(
            plan.progress_line(),
            "Uploading docs/report.pdf to gs://mx-docs/incoming/report.pdf"
        );
    }
}
