//! Extension-based document format detection

use ragline_vector_data::DocType;
use std::path::Path;

/// Map a file path to its document format. Anything outside the supported
/// set aborts ingestion before extraction is attempted.
pub fn doc_type_for_path(path: &Path) -> DocType {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => DocType::Pdf,
        "docx" | "txt" | "rtf" => DocType::Docx,
        _ => DocType::Unsupported,
    }
}
