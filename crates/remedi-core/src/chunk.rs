//! Chunking: splitting text into independently processed pieces and
//! reassembling the processed pieces into one string.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use crate::message::ProcessorResponse;
use crate::segment::Segmenter;

/// Placeholder inserted for chunks with no ok response.
pub const CHUNK_PLACEHOLDER: &str = "<Missing Chunk>";

/// Separator used when several segments are grouped into one chunk.
const SEGMENT_JOINER: &str = " ";

/// One piece of a larger text, addressed by `index` among `total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: u32,
    pub total: u32,
    pub text: String,
}

/// Segment `text` and turn the segments into chunks.
///
/// With `max_chunks` unset every segment is its own chunk. Otherwise
/// consecutive segments are grouped so that no more than `max_chunks`
/// chunks come out.
pub fn split(text: &str, segmenter: &dyn Segmenter, max_chunks: Option<NonZeroUsize>) -> Vec<Chunk> {
    chunks_from_segments(segmenter.segment(text), max_chunks)
}

/// Assign ordering metadata to already segmented text.
pub fn chunks_from_segments(segments: Vec<String>, max_chunks: Option<NonZeroUsize>) -> Vec<Chunk> {
    let per_chunk = match max_chunks {
        Some(max) if segments.len() > max.get() => segments.len().div_ceil(max.get()),
        _ => 1,
    };

    let texts: Vec<String> = segments
        .chunks(per_chunk)
        .map(|group| group.join(SEGMENT_JOINER))
        .collect();

    let total = texts.len() as u32;
    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            index: index as u32,
            total,
            text,
        })
        .collect()
}

/// Rebuild one string from an unordered, possibly incomplete set of
/// chunk responses.
///
/// The chunk count is the largest `num_chs` seen. For a duplicated index
/// the response declaring the larger count is kept, and among equal
/// counts the later one. Indices are emitted in order; a chunk whose
/// response is missing or not ok becomes [`CHUNK_PLACEHOLDER`] when
/// `placeholders` is set and is skipped otherwise.
pub fn reassemble<'a, I>(responses: I, delimiter: &str, placeholders: bool) -> String
where
    I: IntoIterator<Item = &'a ProcessorResponse>,
{
    let mut by_index: BTreeMap<u32, &ProcessorResponse> = BTreeMap::new();
    let mut total = 0u32;

    for response in responses {
        let declared = response.number_of_chunks.max(1);
        if response.chunk_index >= declared {
            tracing::debug!(
                token = %response.job_token,
                chunk_index = response.chunk_index,
                number_of_chunks = declared,
                "chunk index out of range, ignoring"
            );
            continue;
        }
        total = total.max(declared);

        let replace = by_index
            .get(&response.chunk_index)
            .map_or(true, |kept| declared >= kept.number_of_chunks.max(1));
        if replace {
            by_index.insert(response.chunk_index, response);
        }
    }

    let mut parts = Vec::with_capacity(total as usize);
    for index in 0..total {
        match by_index.get(&index) {
            Some(response) if response.status.is_ok() => parts.push(response.text.as_str()),
            _ if placeholders => parts.push(CHUNK_PLACEHOLDER),
            _ => {}
        }
    }
    parts.join(delimiter)
}
