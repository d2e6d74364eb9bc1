//! Storage client configuration, taken from the environment.
//!
//! pdf-upload has no config file and defines no variables of its own. It
//! follows the conventions of the Google Cloud client libraries:
//!
//! - `STORAGE_EMULATOR_HOST`: talk to an emulator instead of GCS, without credentials
//! - `GOOGLE_OAUTH_ACCESS_TOKEN`: bearer token used as-is
//! - `GCE_METADATA_HOST`: host of the metadata server tokens are requested from
//!
//! A `.env` file is honoured because `main` loads it before anything else.

use anyhow::{Context, Result};
use reqwest::Url;
use tracing::{error, info};

pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

pub const EMULATOR_HOST_VAR: &str = "STORAGE_EMULATOR_HOST";
pub const ACCESS_TOKEN_VAR: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const METADATA_HOST_VAR: &str = "GCE_METADATA_HOST";

/// How requests to the store are authorised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// No Authorization header (emulators, test servers).
    Anonymous,
    /// A ready-made OAuth2 access token.
    AccessToken(String),
    /// Ask the compute metadata server for a token before each request.
    MetadataServer { token_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Base URL of the JSON API, without trailing slash.
    pub endpoint: String,
    pub credentials: Credentials,
}

/// Loads the storage configuration from the process environment.
pub fn load_config() -> Result<StorageConfig> {
    load_config_with(|key| std::env::var(key).ok())
}

/// Loads the storage configuration using `lookup` to read variables.
pub fn load_config_with<F>(lookup: F) -> Result<StorageConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let emulator = non_empty(EMULATOR_HOST_VAR);
    let endpoint = match emulator.as_deref() {
        Some(host) => {
            let endpoint = with_scheme(host);
            Url::parse(&endpoint).with_context(|| {
                error!(host, "Invalid storage emulator host");
                format!("{EMULATOR_HOST_VAR} is not a valid host: {host:?}")
            })?;
            info!(endpoint = %endpoint, "Using storage emulator endpoint");
            endpoint
        }
        None => DEFAULT_ENDPOINT.to_string(),
    };

    let credentials = if let Some(token) = non_empty(ACCESS_TOKEN_VAR) {
        info!("Using access token from environment");
        Credentials::AccessToken(token)
    } else if emulator.is_some() {
        Credentials::Anonymous
    } else {
        let host = non_empty(METADATA_HOST_VAR).unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());
        let token_url = format!("{}{METADATA_TOKEN_PATH}", with_scheme(&host));
        info!(token_url = %token_url, "Using metadata server credentials");
        Credentials::MetadataServer { token_url }
    };

    Ok(StorageConfig {
        endpoint,
        credentials,
    })
}

fn with_scheme(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
