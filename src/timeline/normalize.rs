// Leading silence removal
// Re-bases a timeline so the first sounding note starts at tick zero

use super::types::{Timeline, TimedEvent, Track};

/// Earliest absolute tick of any sounding NoteOn across all tracks
///
/// Zero-velocity NoteOns are note-offs and never count. A timeline without
/// any sounding note has an offset of 0.
pub fn onset_offset(timeline: &Timeline) -> u64 {
    timeline
        .tracks
        .iter()
        .filter_map(|track| {
            track
                .to_absolute()
                .into_iter()
                .find(|timed| timed.kind.is_onset())
                .map(|timed| timed.tick)
        })
        .min()
        .unwrap_or(0)
}

/// Shift every track left by the global onset offset
///
/// Events that precede the first note (tempo, track names, pedal) are clamped
/// to tick 0 rather than dropped. Returns a fresh timeline; the input is untouched.
pub fn trim_leading_silence(timeline: &Timeline) -> Timeline {
    trim_leading_silence_with_offset(timeline).0
}

/// Same as [`trim_leading_silence`], also reporting the offset that was applied
pub fn trim_leading_silence_with_offset(timeline: &Timeline) -> (Timeline, u64) {
    let offset = onset_offset(timeline);

    let tracks = timeline
        .tracks
        .iter()
        .map(|track| {
            let shifted: Vec<TimedEvent> = track
                .to_absolute()
                .into_iter()
                .map(|timed| TimedEvent::new(timed.tick.saturating_sub(offset), timed.kind))
                .collect();
            Track::from_absolute(&shifted)
        })
        .collect();

    log::info!(
        "Trimmed {} ticks of leading silence across {} tracks",
        offset,
        timeline.tracks.len()
    );

    (Timeline::new(timeline.ticks_per_beat, tracks), offset)
}
