//! Recursive character splitting.
//!
//! Text is split on the first separator in `["\n\n", "\n", " ", ""]` that occurs in it, keeping
//! each separator at the start of the piece that follows. Pieces that still exceed the window
//! are split again with the remaining separators, and small pieces are merged back into windows
//! of at most `chunk_size` characters with `chunk_overlap` characters carried between them.
//!
//! Lengths are counted in Unicode scalar values, not bytes.

use crate::loaders::{Document, Metadata};
use std::collections::VecDeque;

use super::types::ChunkingError;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A window of document text handed to the summarizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Chunk text, trimmed.
    pub text: String,
    /// Metadata of the source document plus `start_index`.
    pub metadata: Metadata,
}

/// Splitter with a fixed window and overlap.
#[derive(Debug, Clone, Copy)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveCharacterSplitter {
    /// Validate the window parameters.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: chunk_overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split every document, recording where each chunk starts in its document.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            let text = document.page_content.as_str();
            let mut index = 0usize;
            let mut previous_len = 0usize;
            for piece in self.split_text(text) {
                let offset = (index + previous_len).saturating_sub(self.chunk_overlap);
                let mut metadata = document.metadata.clone();
                if let Some(found) = find_from_char(text, &piece, offset) {
                    index = found;
                    metadata.insert("start_index".into(), found.into());
                }
                previous_len = char_len(&piece);
                chunks.push(Chunk {
                    text: piece,
                    metadata,
                });
            }
        }
        chunks
    }

    /// Split raw text into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut remaining: &[&str] = &[];
        for (i, &candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate;
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut good: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                chunks.extend(self.merge(&good));
                good.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !good.is_empty() {
            chunks.extend(self.merge(&good));
        }
        chunks
    }

    /// Greedily pack pieces into windows, keeping up to `chunk_overlap` characters of the
    /// previous window at the front of the next one.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        total,
                        chunk_size = self.chunk_size,
                        "Created a chunk larger than the window"
                    );
                }
                if !current.is_empty() {
                    if let Some(doc) = join(&current) {
                        docs.push(doc);
                    }
                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some(front) => total -= char_len(front),
                            None => break,
                        }
                    }
                }
            }
            current.push_back(piece);
            total += len;
        }

        if let Some(doc) = join(&current) {
            docs.push(doc);
        }
        docs
    }
}

fn join(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Split on `separator`, attaching each separator to the start of the following piece.
/// An empty separator splits into single characters. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(start, c)| &text[start..start + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        pieces.push(&text[start..index]);
        start = index;
    }
    pieces.push(&text[start..]);
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Character index of `needle` in `haystack`, searching from character offset `from`.
fn find_from_char(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let byte_start = haystack
        .char_indices()
        .nth(from)
        .map(|(byte, _)| byte)
        .unwrap_or(haystack.len());
    haystack[byte_start..]
        .find(needle)
        .map(|byte| from + char_len(&haystack[byte_start..byte_start + byte]))
}
