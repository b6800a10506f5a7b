//! Document and chunk models shared by ingestion and storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Detected document format. `Unsupported` aborts ingestion before
/// extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocType {
    #[serde(rename = "PDF")]
    Pdf,
    /// Word-family formats plus plain text; extracted as one page
    #[serde(rename = "DOCX")]
    Docx,
    #[serde(rename = "ERROR")]
    Unsupported,
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
            Self::Unsupported => "ERROR",
        };
        write!(f, "{label}")
    }
}

/// An ingested document. The id equals the ingest job id so status lookups
/// and provenance tags line up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "source_doc_id")]
    pub id: String,
    #[serde(rename = "doc_name")]
    pub name: String,
    #[serde(rename = "ingested_at")]
    pub ingested_at: DateTime<Utc>,
    pub content_type: DocType,
}

/// The embedding unit: a bounded text fragment tagged with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocChunk {
    pub doc: Document,
    pub chunk_id: String,
    #[serde(rename = "content")]
    pub text: String,
    pub page_num: u32,
    #[serde(rename = "chunk_order")]
    pub page_order: usize,
    /// Which embedding model produced this chunk's vector; lets several
    /// models coexist in one collection later
    pub embedding_model: String,
}

#[cfg(test)]
mod tests {
    use super::{DocChunk, DocType, Document};
    use chrono::Utc;

    #[test]
    fn doc_type_uses_the_wire_labels() {
        assert_eq!(DocType::Pdf.to_string(), "PDF");
        assert_eq!(DocType::Unsupported.to_string(), "ERROR");
        let json = serde_json::to_string(&DocType::Docx).expect("serialize");
        assert_eq!(json, "\"DOCX\"");
    }

    #[test]
    fn chunk_serializes_with_payload_field_names() {
        let chunk = DocChunk {
            doc: Document {
                id: "doc-1".into(),
                name: "d".into(),
                ingested_at: Utc::now(),
                content_type: DocType::Pdf,
            },
            chunk_id: "chunk-1".into(),
            text: "body".into(),
            page_num: 3,
            page_order: 2,
            embedding_model: "m".into(),
        };
        let json = serde_json::to_string(&chunk).expect("serialize");
        assert!(json.contains("\"content\":\"body\""));
        assert!(json.contains("\"chunk_order\":2"));
        assert!(json.contains("\"source_doc_id\":\"doc-1\""));
    }
}
