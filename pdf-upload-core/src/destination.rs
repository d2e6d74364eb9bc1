//! Resolves a `gs://bucket[/prefix]` destination and a local filename into a
//! bucket and object key.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{error, info};

/// The only scheme accepted for destinations.
pub const GCS_SCHEME: &str = "gs";

/// Where an object is written: bucket plus key within the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub bucket: String,
    pub object_key: String,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{GCS_SCHEME}://{}/{}", self.bucket, self.object_key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DestinationError {
    #[error("destination {0:?} does not start with gs://")]
    MissingScheme(String),
    #[error("destination {uri:?} uses unsupported scheme {scheme:?}, expected gs")]
    UnsupportedScheme { uri: String, scheme: String },
    #[error("destination {0:?} has no bucket name")]
    MissingBucket(String),
    #[error("{0:?} has no file name to use as object name")]
    MissingFileName(String),
}

fn uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*)://([^/]*)(?:/(.*))?$")
            .expect("destination pattern is valid")
    })
}

/// Splits `uri` into bucket and object key for `filename`.
///
/// `gs://bucket/prefix` gives `prefix/<basename>`, `gs://bucket` gives
/// `<basename>`. Trailing slashes on the prefix are ignored.
pub fn resolve_destination<P: AsRef<Path>>(
    uri: &str,
    filename: P,
) -> Result<Destination, DestinationError> {
    let filename = filename.as_ref();

    let caps = uri_pattern().captures(uri).ok_or_else(|| {
        error!(uri, "Destination is not a URI");
        DestinationError::MissingScheme(uri.to_string())
    })?;

    let scheme = &caps[1];
    if scheme != GCS_SCHEME {
        error!(uri, scheme, "Unsupported destination scheme");
        return Err(DestinationError::UnsupportedScheme {
            uri: uri.to_string(),
            scheme: scheme.to_string(),
        });
    }

    let bucket = &caps[2];
    if bucket.is_empty() {
        error!(uri, "Destination has no bucket");
        return Err(DestinationError::MissingBucket(uri.to_string()));
    }

    let basename = filename
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| DestinationError::MissingFileName(filename.display().to_string()))?;

    let prefix = caps
        .get(3)
        .map(|m| m.as_str().trim_end_matches('/'))
        .unwrap_or_default();
    let object_key = if prefix.is_empty() {
        basename
    } else {
        format!("{prefix}/{basename}")
    };

    let destination = Destination {
        bucket: bucket.to_string(),
        object_key,
    };
    info!(uri, bucket = %destination.bucket, object_key = %destination.object_key, "Resolved destination");
    Ok(destination)
}
