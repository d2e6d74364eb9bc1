#![allow(unused)]

//! # contract: interface to the remote object store
//!
//! This module defines the [`ObjectStore`] trait and the plain data types that
//! travel across it. Implementors connect to a real storage API (see the
//! `pdf-upload` crate for the GCS JSON API client) or are generated by
//! `mockall` for tests.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; `MockObjectStore` is exported when
//!   the `test-export-mocks` feature is on (it is by default).
//!
//! ## Error Handling
//! - All methods return [`StoreError`], a boxed error. Implementors convert
//!   transport, auth and API failures into it without retrying.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use mockall::{automock, predicate::*};

/// Error type for the ObjectStore trait (boxed, like any upstream client error).
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Bucket as reported by the store when it is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    pub name: String,
    pub location: Option<String>,
}

/// Everything needed to store one local file as an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUpload {
    /// Local file to read the object content from.
    pub source: PathBuf,
    pub bucket: String,
    pub object_key: String,
    /// MIME type stored with the object.
    pub content_type: String,
    /// Custom metadata attached to the object as opaque key/value pairs.
    pub metadata: BTreeMap<String, String>,
}

/// Object as reported back by the store after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub bucket: String,
    pub name: String,
    pub size: Option<u64>,
    pub generation: Option<String>,
}

/// Trait for the remote object store the file is published to.
///
/// The trait is `Send` + `Sync` and intended for async/await usage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Look up a bucket by name. Fails when it does not exist or is not accessible.
    async fn get_bucket(&self, name: &str) -> Result<BucketInfo, StoreError>;

    /// Upload the whole file in one request with its metadata attached.
    async fn upload_file(&self, upload: ObjectUpload) -> Result<UploadedObject, StoreError>;
}
