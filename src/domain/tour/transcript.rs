//! Timestamped transcript segmentation for generated narration.
//!
//! Timing is estimated from text alone (no audio analysis): the narration is
//! split into readable segments and the estimated duration is distributed
//! across them in proportion to character count.

use super::model::TranscriptSegment;

const WORDS_PER_MINUTE: f64 = 150.0;
const MAX_PARAGRAPH_SEGMENT_CHARS: usize = 200;
const MAX_SENTENCE_SEGMENT_CHARS: usize = 300;
const MIN_SEGMENT_CHARS: usize = 10;
const MIN_SEGMENT_SECONDS: f64 = 2.0;

/// Estimated playback duration in seconds at a 150 wpm speaking rate
pub fn estimate_audio_duration(content: &str) -> f64 {
    let word_count = content.split_whitespace().count() as f64;
    word_count / WORDS_PER_MINUTE * 60.0
}

/// Split narration into segments and distribute `estimated_duration_seconds`
/// across them by character-count ratio. Each segment gets at least 2
/// seconds; the final segment's end time is forced to the estimated duration
/// so the transcript never outruns or undershoots the audio.
pub fn generate_transcript_segments(
    content: &str,
    estimated_duration_seconds: f64,
) -> Vec<TranscriptSegment> {
    let segments = split_into_segments(content);
    if segments.is_empty() {
        return Vec::new();
    }

    let total_chars: usize = segments.iter().map(|s| s.len()).sum();
    let mut transcript = Vec::with_capacity(segments.len());
    let mut current_time = 0.0_f64;

    for segment in &segments {
        let ratio = if total_chars > 0 {
            segment.len() as f64 / total_chars as f64
        } else {
            0.0
        };
        let duration = (estimated_duration_seconds * ratio).max(MIN_SEGMENT_SECONDS);

        transcript.push(TranscriptSegment {
            start_time: round2(current_time),
            end_time: round2(current_time + duration),
            text: segment.trim().to_string(),
        });

        current_time += duration;
    }

    if let Some(last) = transcript.last_mut() {
        last.end_time = round2(estimated_duration_seconds);
    }

    transcript
}

/// Paragraphs first, then sentences for paragraphs over 200 chars, then
/// comma-separated phrases for sentences over 300 chars. Fragments under 10
/// chars are merged into their predecessor.
fn split_into_segments(content: &str) -> Vec<String> {
    let mut segments = Vec::new();

    for paragraph in content.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if paragraph.len() <= MAX_PARAGRAPH_SEGMENT_CHARS {
            segments.push(paragraph.to_string());
            continue;
        }

        for sentence in paragraph.split(['.', '!', '?']) {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }

            if sentence.len() > MAX_SENTENCE_SEGMENT_CHARS {
                for phrase in sentence.split(',') {
                    let phrase = phrase.trim();
                    if !phrase.is_empty() {
                        segments.push(phrase.to_string());
                    }
                }
            } else {
                segments.push(sentence.to_string());
            }
        }
    }

    let mut merged: Vec<String> = Vec::with_capacity(segments.len());
    for segment in segments {
        match merged.last_mut() {
            Some(previous) if segment.len() < MIN_SEGMENT_CHARS => {
                previous.push(' ');
                previous.push_str(&segment);
            }
            _ => merged.push(segment),
        }
    }

    merged
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
