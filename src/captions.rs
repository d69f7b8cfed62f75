use crate::config::Tuning;

pub const MIN_SEGMENTS: usize = 3;
pub const MIN_WORDS_PER_SEGMENT: usize = 6;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionTiming {
    /// Nominal on-screen time used to decide how many segments to aim for.
    pub segment_seconds: f64,
    pub min_seconds: f64,
    pub max_seconds: f64,
}

impl Default for CaptionTiming {
    fn default() -> Self {
        Self {
            segment_seconds: 2.5,
            min_seconds: 1.4,
            max_seconds: 4.0,
        }
    }
}

impl From<&Tuning> for CaptionTiming {
    fn from(t: &Tuning) -> Self {
        Self {
            segment_seconds: t.caption_segment_seconds,
            min_seconds: t.caption_min_seconds,
            max_seconds: t.caption_max_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionChunk {
    pub text: String,
    pub start_offset_seconds: f64,
    pub duration_seconds: f64,
}

impl CaptionChunk {
    pub fn end_seconds(&self) -> f64 {
        self.start_offset_seconds + self.duration_seconds
    }
}

/// Splits narration into fixed-size word groups laid end to end from t=0.
///
/// Generation stops once the timeline is full, so trailing words can be left
/// without a caption. The last chunk is shortened to end exactly at
/// `resolved_duration`.
pub fn segment_captions(
    text: &str,
    resolved_duration: f64,
    timing: &CaptionTiming,
) -> Vec<CaptionChunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || resolved_duration <= 0.0 {
        return Vec::new();
    }

    let approx_segments =
        ((resolved_duration / timing.segment_seconds).floor() as usize).max(MIN_SEGMENTS);
    let words_per_segment = (words.len() / approx_segments).max(MIN_WORDS_PER_SEGMENT);
    let segment_duration = (resolved_duration / approx_segments as f64)
        .max(timing.min_seconds)
        .min(timing.max_seconds);

    let mut chunks = Vec::new();
    let mut t = 0.0;
    for group in words.chunks(words_per_segment) {
        let remaining = resolved_duration - t;
        if remaining <= EPSILON {
            break;
        }
        let duration = segment_duration.min(remaining);
        chunks.push(CaptionChunk {
            text: group.join(" "),
            start_offset_seconds: t,
            duration_seconds: duration,
        });
        t += duration;
    }
    chunks
}

pub fn captioned_word_count(chunks: &[CaptionChunk]) -> usize {
    chunks.iter().map(|c| c.text.split_whitespace().count()).sum()
}
