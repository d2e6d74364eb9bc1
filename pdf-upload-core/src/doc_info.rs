//! Reads the document info dictionary (`/Info` in the trailer) of a PDF file.
//!
//! Only the fields pdf-upload cares about are extracted. The whole file is
//! read into memory and the handle is closed before parsing starts.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object};
use tracing::{debug, error, info};

/// Fields taken from a PDF's document info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a valid PDF document: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
}

/// Opens `path` and returns its document info. A document without an
/// `/Info` dictionary yields a `DocumentInfo` with every field unset.
pub fn read_document_info<P: AsRef<Path>>(path: P) -> Result<DocumentInfo, DocumentError> {
    let path = path.as_ref();
    info!(path = %path.display(), "Reading document info");

    let bytes = std::fs::read(path).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to read document");
        DocumentError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    let doc = Document::load_mem(&bytes).map_err(|e| {
        error!(error = %e, path = %path.display(), "Failed to parse document");
        DocumentError::Parse {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    let info = match info_dictionary(&doc) {
        Some(dict) => DocumentInfo {
            title: text_field(&doc, dict, b"Title"),
            author: text_field(&doc, dict, b"Author"),
            subject: text_field(&doc, dict, b"Subject"),
        },
        None => {
            debug!(path = %path.display(), "Document has no info dictionary");
            DocumentInfo::default()
        }
    };

    debug!(?info, path = %path.display(), "Document info extracted");
    Ok(info)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    resolve(doc, info)?.as_dict().ok()
}

// Text strings go through lopdf's decoder (UTF-16BE/UTF-8 byte order marks,
// otherwise PDFDocEncoding). Anything it rejects is read as lossy UTF-8.
fn text_field(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let value = resolve(doc, dict.get(key).ok()?)?;
    let bytes = value.as_str().ok()?;
    match lopdf::decode_text_string(value) {
        Ok(text) => Some(text),
        Err(e) => {
            debug!(error = %e, key = %String::from_utf8_lossy(key), "Falling back to lossy UTF-8");
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
