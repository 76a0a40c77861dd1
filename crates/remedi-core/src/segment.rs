//! Sentence segmentation seam.
//!
//! The protocol sends translation text as an ordered list of sentences.
//! Finding sentence boundaries is locale-aware work delegated to a
//! [`Segmenter`]; the default uses the ICU4X sentence break rules.

/// Splits text into ordered, trimmed, non-empty segments.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// UAX #29 sentence boundaries via `icu_segmenter`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcuSentenceSegmenter;

impl Segmenter for IcuSentenceSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        let segmenter = icu_segmenter::SentenceSegmenter::new(Default::default());
        let breaks: Vec<usize> = segmenter.segment_str(text).collect();

        breaks
            .windows(2)
            .map(|w| text[w[0]..w[1]].trim())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }
}
