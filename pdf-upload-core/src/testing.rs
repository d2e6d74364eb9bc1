//! PDF fixtures for tests, exported alongside the mocks so the CLI crate can
//! use the same documents.

use std::path::Path;

use lopdf::{dictionary, Dictionary, Document, Object};

/// Where the info dictionary is stored in the trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoPlacement {
    /// `/Info 5 0 R`, as most writers emit it.
    Indirect,
    /// The dictionary inline in the trailer.
    Direct,
}

/// Writes a one-page PDF whose info dictionary carries a `Producer` and, when
/// given, a `Title`.
pub fn write_pdf(path: &Path, title: Option<&str>) -> Result<(), lopdf::Error> {
    let mut info = dictionary! { "Producer" => Object::string_literal("pdf-upload tests") };
    if let Some(title) = title {
        info.set("Title", Object::string_literal(title));
    }
    write_pdf_with_info(path, Some(info), InfoPlacement::Indirect)
}

/// Writes a one-page PDF with the given info dictionary, or none at all.
pub fn write_pdf_with_info(
    path: &Path,
    info: Option<Dictionary>,
    placement: InfoPlacement,
) -> Result<(), lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    match (info, placement) {
        (Some(info), InfoPlacement::Indirect) => {
            let info_id = doc.add_object(info);
            doc.trailer.set("Info", info_id);
        }
        (Some(info), InfoPlacement::Direct) => doc.trailer.set("Info", info),
        (None, _) => {}
    }
    doc.save(path)?;
    Ok(())
}
