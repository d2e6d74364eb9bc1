//! Builds the custom metadata attached to the uploaded object.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::doc_info::{read_document_info, DocumentError};

pub const USER_ID_KEY: &str = "user_id";
pub const TITLE_KEY: &str = "title";
pub const TAGS_KEY: &str = "tags";

/// Flat string-to-string metadata for one upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMetadata(BTreeMap<String, String>);

impl UploadMetadata {
    /// Assembles metadata from the parts. `user_id` is left out when absent,
    /// `title` becomes `""` when absent and tags are joined with `,` as given.
    pub fn new(user_id: Option<i64>, title: Option<&str>, tags: &[String]) -> Self {
        let mut map = BTreeMap::new();
        if let Some(id) = user_id {
            map.insert(USER_ID_KEY.to_string(), id.to_string());
        }
        map.insert(TITLE_KEY.to_string(), title.unwrap_or_default().to_string());
        map.insert(TAGS_KEY.to_string(), tags.join(","));
        UploadMetadata(map)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

/// Reads the document info of `filename` and combines it with the caller's
/// user id and tags.
pub fn build_metadata<P: AsRef<Path>>(
    filename: P,
    user_id: Option<i64>,
    tags: &[String],
) -> Result<UploadMetadata, DocumentError> {
    let filename = filename.as_ref();
    let doc_info = read_document_info(filename)?;
    let metadata = UploadMetadata::new(user_id, doc_info.title.as_deref(), tags);
    info!(
        file = %filename.display(),
        has_title = doc_info.title.is_some(),
        tag_count = tags.len(),
        "Built upload metadata"
    );
    debug!(?metadata, "Upload metadata (full debug)");
    Ok(metadata)
}
