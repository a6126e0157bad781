use super::GroupError;
use crate::domain::{CaptionSegment, CaptionWord, TimedWord, ms_to_seconds};

/// Partitions `words` into consecutive segments of `group_size` words; the
/// last segment holds whatever remains. Grouping is purely positional, gaps
/// between words are ignored.
pub fn group_words(
    words: &[TimedWord],
    group_size: usize,
) -> Result<Vec<CaptionSegment>, GroupError> {
    if group_size == 0 {
        return Err(GroupError::InvalidGroupSize(group_size));
    }

    Ok(words.chunks(group_size).filter_map(segment).collect())
}

fn segment(chunk: &[TimedWord]) -> Option<CaptionSegment> {
    let (first, last) = (chunk.first()?, chunk.last()?);

    Some(CaptionSegment {
        text: chunk
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        start: ms_to_seconds(first.start_ms),
        end: ms_to_seconds(last.end_ms),
        words: chunk.iter().map(CaptionWord::from).collect(),
    })
}
