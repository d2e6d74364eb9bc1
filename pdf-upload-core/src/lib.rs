#![doc = "pdf-upload-core: core logic library for pdf-upload."]

//! This crate contains the storage-agnostic part of pdf-upload: reading the
//! document info dictionary of a PDF, building the object metadata,
//! resolving `gs://` destinations and driving an upload through the
//! [`contract::ObjectStore`] trait.
//!
//! The concrete HTTP client lives in the `pdf-upload` crate.
//!
//! # Usage
//! Build a [`publish::UploadRequest`], call [`publish::prepare`] and hand the
//! resulting plan to [`publish::execute`] together with an `ObjectStore`.

pub mod contract;
pub mod destination;
pub mod doc_info;
pub mod metadata;
pub mod publish;
#[cfg(any(test, feature = "test-export-mocks"))]
pub mod testing;
