//! Text extraction for supported document formats
//!
//! PDF pages are extracted one at a time, each under an independent
//! protective timeout so one pathological page cannot wedge the whole
//! ingest. DOCX-family documents come back as a single page numbered 1.

use crate::error::{IngestError, IngestResult};
use ragline_vector_data::DocType;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Guard against a single malformed page stalling extraction
const PAGE_EXTRACT_TIMEOUT: Duration = Duration::from_secs(10);

/// One extracted page of document text
#[derive(Debug, Clone)]
pub struct RawPage {
    pub number: u32,
    pub text: String,
}

/// Extract page texts from the spooled upload at `path`.
///
/// # Errors
///
/// Returns `IngestError::Extraction` when the document cannot be opened or
/// parsed, and `IngestError::Unsupported` for the `Unsupported` format.
/// Individual unreadable PDF pages are skipped, not fatal.
pub async fn extract_text(path: &Path, doc_type: DocType) -> IngestResult<Vec<RawPage>> {
    match doc_type {
        DocType::Pdf => extract_pdf(path).await,
        DocType::Docx => extract_docx_family(path).await,
        DocType::Unsupported => Err(IngestError::Unsupported(path.display().to_string())),
    }
}

async fn extract_pdf(path: &Path) -> IngestResult<Vec<RawPage>> {
    let load_path = path.to_owned();
    let doc = tokio::task::spawn_blocking(move || lopdf::Document::load(load_path))
        .await
        .map_err(|e| IngestError::Extraction(format!("pdf load task failed: {e}")))?
        .map_err(|e| IngestError::Extraction(format!("failed to open pdf: {e}")))?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    debug!(pages = page_numbers.len(), "extracting pdf");

    let doc = Arc::new(doc);
    let mut pages = Vec::new();
    for number in page_numbers {
        match protect_extract(Arc::clone(&doc), number).await {
            Ok(text) => pages.push(RawPage { number, text }),
            Err(e) => {
                // Skip the page and keep going; a timed-out extraction keeps
                // running on the blocking pool, we just stop waiting for it.
                warn!(page = number, error = %e, "skipping unreadable pdf page");
            }
        }
    }
    Ok(pages)
}

async fn protect_extract(doc: Arc<lopdf::Document>, page: u32) -> IngestResult<String> {
    let task = tokio::task::spawn_blocking(move || doc.extract_text(&[page]));
    match tokio::time::timeout(PAGE_EXTRACT_TIMEOUT, task).await {
        Ok(Ok(Ok(text))) => Ok(text),
        Ok(Ok(Err(e))) => Err(IngestError::Extraction(format!("page parse failed: {e}"))),
        Ok(Err(e)) => Err(IngestError::Extraction(format!("page task failed: {e}"))),
        Err(_) => Err(IngestError::Extraction("page extraction timed out".into())),
    }
}

async fn extract_docx_family(path: &Path) -> IngestResult<Vec<RawPage>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let text = if ext == "docx" {
        let archive_path: PathBuf = path.to_owned();
        tokio::task::spawn_blocking(move || docx_body_text(&archive_path))
            .await
            .map_err(|e| IngestError::Extraction(format!("docx task failed: {e}")))??
    } else {
        // .txt and .rtf are read as plain text
        tokio::fs::read_to_string(path).await?
    };

    // Word-family extraction has no page boundaries; everything lands on
    // page 1.
    Ok(vec![RawPage { number: 1, text }])
}

/// Pull the visible text out of `word/document.xml` inside the docx zip.
fn docx_body_text(path: &Path) -> IngestResult<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| IngestError::Extraction(format!("failed to open docx archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| IngestError::Extraction(format!("docx body missing: {e}")))?
        .read_to_string(&mut xml)?;

    let mut reader = quick_xml::Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader
            .read_event()
            .map_err(|e| IngestError::Extraction(format!("docx xml parse failed: {e}")))?
        {
            quick_xml::events::Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            quick_xml::events::Event::End(e) if e.local_name().as_ref() == b"t" => in_text = false,
            quick_xml::events::Event::Text(t) if in_text => {
                let piece = t
                    .unescape()
                    .map_err(|e| IngestError::Extraction(format!("docx text decode failed: {e}")))?;
                out.push_str(&piece);
            }
            quick_xml::events::Event::End(e) if e.local_name().as_ref() == b"p" => out.push('\n'),
            quick_xml::events::Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}
