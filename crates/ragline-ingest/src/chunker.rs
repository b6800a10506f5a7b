//! Recursive separator-based text splitter with overlap
//!
//! Sizes are in characters, not tokens. Separators are tried best-first for
//! semantic continuity; the overlap re-seeds each chunk with the tail of
//! the previous one.

use ragline_vector_data::{DocChunk, Document};
use crate::extract::RawPage;
use uuid::Uuid;

/// Splitter limits for document pages
pub const MAX_CHUNK_CHARS: usize = 1000;
pub const CHUNK_OVERLAP: usize = 150;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn last_chars(s: &str, n: usize) -> String {
    let len = char_len(s);
    if len <= n {
        return s.to_owned();
    }
    s.chars().skip(len - n).collect()
}

/// Split `text` into chunks of at most roughly `limit` characters,
/// consecutive chunks sharing up to `overlap` trailing characters.
pub fn split_text(text: &str, limit: usize, overlap: usize) -> Vec<String> {
    if char_len(text) <= limit {
        return vec![text.to_owned()];
    }

    let Some(separator) = SEPARATORS.iter().find(|s| text.contains(**s)) else {
        // No separator anywhere: hard cut and keep the prefix.
        return vec![text.chars().take(limit).collect()];
    };
    let sep_len = char_len(separator);

    let mut chunks = Vec::new();
    let mut current = String::new();
    for part in text.split(separator) {
        if char_len(&current) + char_len(part) + sep_len > limit {
            if !current.is_empty() {
                chunks.push(current.clone());
            }
            // Seed the next chunk with the tail of the emitted one.
            let seed = if char_len(&current) > overlap {
                last_chars(&current, overlap)
            } else {
                String::new()
            };
            current = seed;
        }
        if !current.is_empty() {
            current.push_str(separator);
        }
        current.push_str(part);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Split every extracted page and tag the chunks with provenance.
pub fn prepare_chunks(pages: &[RawPage], doc: &Document, embedding_model: &str) -> Vec<DocChunk> {
    let mut all_chunks = Vec::new();
    for page in pages {
        let pieces = split_text(&page.text, MAX_CHUNK_CHARS, CHUNK_OVERLAP);
        for (order, text) in pieces.into_iter().enumerate() {
            all_chunks.push(DocChunk {
                doc: doc.clone(),
                chunk_id: Uuid::new_v4().to_string(),
                text,
                page_num: page.number,
                page_order: order,
                embedding_model: embedding_model.to_owned(),
            });
        }
    }
    all_chunks
}

#[cfg(test)]
mod tests {
    use super::{prepare_chunks, split_text};
    use crate::extract::RawPage;
    use chrono::Utc;
    use ragline_vector_data::{DocType, Document};

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text("tiny", 100, 10);
        assert_eq!(chunks, vec!["tiny".to_owned()]);
    }

    #[test]
    fn long_text_splits_with_overlap() {
        let text = "One sentence here. Another short one. Third bit now. A final piece";
        let chunks = split_text(text, 30, 5);
        assert!(chunks.len() >= 2, "expected multiple chunks, got {chunks:?}");

        // Parts all fit under the limit, so every chunk stays within the
        // limit plus one separator.
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 30 + 2,
                "chunk too long: {chunk:?}"
            );
        }

        // The second chunk starts with the tail of the first.
        let tail: String = chunks[0]
            .chars()
            .skip(chunks[0].chars().count().saturating_sub(5))
            .collect();
        assert!(
            chunks[1].starts_with(&tail),
            "overlap missing: {tail:?} vs {:?}",
            chunks[1]
        );
    }

    #[test]
    fn separator_free_text_is_hard_cut() {
        let text = "x".repeat(50);
        let chunks = split_text(&text, 30, 5);
        assert_eq!(chunks, vec!["x".repeat(30)]);
    }

    #[test]
    fn paragraph_separator_wins_over_spaces() {
        let text = format!("{}\n\n{}", "a".repeat(20), "b".repeat(20));
        let chunks = split_text(&text, 25, 5);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("aaa"));
        assert!(chunks[1].ends_with("bbb"));
    }

    #[test]
    fn multibyte_text_never_splits_inside_a_character() {
        let text = "é".repeat(50);
        let chunks = split_text(&text, 30, 5);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chars().count(), 30);
    }

    #[test]
    fn chunks_carry_page_and_order_tags() {
        let doc = Document {
            id: "doc-1".into(),
            name: "d".into(),
            ingested_at: Utc::now(),
            content_type: DocType::Pdf,
        };
        let pages = vec![
            RawPage {
                number: 1,
                text: "Page one content.".into(),
            },
            RawPage {
                number: 2,
                text: "Page two content.".into(),
            },
        ];

        let chunks = prepare_chunks(&pages, &doc, "test-embedding-model");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].doc.id, "doc-1");
        assert_eq!(chunks[0].page_num, 1);
        assert_eq!(chunks[0].page_order, 0);
        assert_eq!(chunks[1].page_num, 2);
        assert_ne!(chunks[0].chunk_id, chunks[1].chunk_id);
    }
}
