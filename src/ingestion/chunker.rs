//! Recursive character chunking with bounded size and fixed overlap.

use serde::{Deserialize, Serialize};

/// A bounded contiguous slice of source text with provenance metadata.
///
/// Chunks are immutable once created: `id` is the zero-based ordinal within
/// the source, and `position_info` is the human-readable "Chunk k of n" label
/// surfaced alongside answers for citation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based ordinal of this chunk within its source.
    pub id: usize,
    /// The chunk text, bounded by the configured maximum length.
    pub text: String,
    /// Identifier of the source document this chunk came from.
    pub source: String,
    /// Human-readable position label, e.g. "Chunk 3 of 7".
    pub position_info: String,
}

/// Splits `text` into overlapping segments of at most `max_chars` characters.
///
/// Split points are chosen greedily, preferring the coarsest boundary that
/// fits inside the size bound: paragraph breaks first, then sentence ends,
/// then line breaks, and finally an arbitrary character cut. Adjacent
/// segments share exactly `overlap` characters copied from the tail of the
/// previous segment, except when a segment is too short for the overlap to
/// make forward progress.
///
/// Empty or whitespace-only input yields no chunks. Text that already fits
/// within `max_chars` yields exactly one chunk with no overlap applied.
///
/// # Examples
///
/// ```
/// use ragweave::ingestion::chunk_text;
///
/// let chunks = chunk_text("Short note.", "memo.txt", 800, 100);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].position_info, "Chunk 1 of 1");
/// ```
pub fn chunk_text(text: &str, source: &str, max_chars: usize, overlap: usize) -> Vec<Chunk> {
    debug_assert!(overlap < max_chars, "overlap must be smaller than max_chars");

    if text.trim().is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the string. All
    // window arithmetic counts characters; slicing stays on these offsets so
    // multi-byte input never splits mid-character.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;

    let mut segments: Vec<&str> = Vec::new();
    let mut start = 0usize;
    while start < total_chars {
        let window_end = (start + max_chars).min(total_chars);
        let window_start_byte = boundaries[start];
        if window_end == total_chars {
            segments.push(&text[window_start_byte..]);
            break;
        }

        let window = &text[window_start_byte..boundaries[window_end]];
        let split_byte = window_start_byte + find_split(window);
        let split = boundaries.partition_point(|&offset| offset < split_byte);

        segments.push(&text[window_start_byte..split_byte]);

        // Only step back for overlap when the segment extends past it;
        // otherwise the loop would revisit the same characters forever.
        start = if split - start > overlap {
            split - overlap
        } else {
            split
        };
    }

    let total = segments.len();
    segments
        .into_iter()
        .enumerate()
        .map(|(id, segment)| Chunk {
            id,
            text: segment.to_string(),
            source: source.to_string(),
            position_info: format!("Chunk {} of {}", id + 1, total),
        })
        .collect()
}

/// Picks the split point (byte offset into `window`, always > 0) for a
/// window that exceeds the size bound.
fn find_split(window: &str) -> usize {
    // Paragraph boundary: split after the blank line.
    if let Some(pos) = window.rfind("\n\n") {
        if pos > 0 {
            return pos + 2;
        }
    }

    // Sentence boundary: split after the latest terminator.
    let mut best = 0;
    for pattern in [". ", "! ", "? ", ".\n", "!\n", "?\n"] {
        if let Some(pos) = window.rfind(pattern) {
            best = best.max(pos + pattern.len());
        }
    }
    if best > 0 {
        return best;
    }

    // Line boundary, then arbitrary character cut.
    if let Some(pos) = window.rfind('\n') {
        if pos > 0 {
            return pos + 1;
        }
    }
    window.len()
}
