//! Document ingestion pipeline
//!
//! Takes a spooled upload through format detection, text extraction,
//! recursive chunking, and batched embed+upsert into the vector store.

pub mod chunker;
pub mod detect;
pub mod error;
pub mod extract;
pub mod pipeline;

pub use chunker::{prepare_chunks, split_text};
pub use detect::doc_type_for_path;
pub use error::{IngestError, IngestResult};
pub use extract::{RawPage, extract_text};
pub use pipeline::{IngestOptions, batch_ingest, process_document_ingestion};
