// Voice splitting - treble/bass partition by pitch
// Produces a two-track timeline the notation converter renders as a piano staff

use serde::{Deserialize, Serialize};

use super::types::{EventKind, MetaEvent, TimedEvent, Timeline, Track};
use super::{TimelineError, TimelineResult};

/// Channel assigned to the upper voice
pub const UPPER_CHANNEL: u8 = 0;

/// Channel assigned to the lower voice
pub const LOWER_CHANNEL: u8 = 1;

/// Voice split settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    /// Lowest pitch of the upper voice (60 = middle C)
    pub threshold: u8,

    /// Track name written at the head of the upper voice (empty = none)
    pub upper_name: String,

    /// Track name written at the head of the lower voice (empty = none)
    pub lower_name: String,
}

impl Default for SplitOptions {
    fn default() -> Self {
        SplitOptions {
            threshold: 60,
            upper_name: "Upper".to_string(),
            lower_name: "Lower".to_string(),
        }
    }
}

impl SplitOptions {
    pub fn with_threshold(threshold: u8) -> Self {
        SplitOptions {
            threshold,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> TimelineResult<()> {
        if self.threshold > 127 {
            return Err(TimelineError::InvalidParameter(format!(
                "pitch threshold {} is outside the MIDI range 0-127",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Partition a timeline into `[upper, lower]` voices
///
/// Notes at or above the threshold go up (channel 0), the rest go down
/// (channel 1). Velocity plays no part. Tempo and time-signature events are
/// copied into both voices so each stays independently playable. Other meta
/// and controller events are dropped. Each voice is stably ordered by absolute
/// tick, so events that coincide keep their input order (track by track).
pub fn split_voices(timeline: &Timeline, options: &SplitOptions) -> TimelineResult<Timeline> {
    options.validate()?;

    let mut upper = voice_head(&options.upper_name);
    let mut lower = voice_head(&options.lower_name);

    for track in &timeline.tracks {
        for timed in track.to_absolute() {
            match timed.kind.pitch() {
                Some(pitch) if pitch >= options.threshold => {
                    upper.push(TimedEvent::new(timed.tick, timed.kind.with_channel(UPPER_CHANNEL)));
                }
                Some(_) => {
                    lower.push(TimedEvent::new(timed.tick, timed.kind.with_channel(LOWER_CHANNEL)));
                }
                None if timed.kind.is_shared() => {
                    upper.push(timed.clone());
                    lower.push(timed);
                }
                None => {}
            }
        }
    }

    let upper = finish_voice(upper);
    let lower = finish_voice(lower);

    log::info!(
        "Split at pitch {}: {} upper notes, {} lower notes",
        options.threshold,
        upper.note_count(),
        lower.note_count()
    );

    Ok(Timeline::new(timeline.ticks_per_beat, vec![upper, lower]))
}

fn voice_head(name: &str) -> Vec<TimedEvent> {
    if name.is_empty() {
        Vec::new()
    } else {
        vec![TimedEvent::new(
            0,
            EventKind::Meta(MetaEvent::TrackName(name.to_string())),
        )]
    }
}

/// Sort by tick (stable), delta-encode and terminate
fn finish_voice(mut events: Vec<TimedEvent>) -> Track {
    events.sort_by_key(|timed| timed.tick);

    let needs_end = events
        .last()
        .map(|timed| !timed.kind.is_end_of_track())
        .unwrap_or(true);
    if needs_end {
        let end_tick = events.last().map(|timed| timed.tick).unwrap_or(0);
        events.push(TimedEvent::new(end_tick, EventKind::Meta(MetaEvent::EndOfTrack)));
    }

    Track::from_absolute(&events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::normalize::trim_leading_silence;
    use crate::timeline::types::Event;

    fn note_on(pitch: u8, velocity: u8) -> EventKind {
        EventKind::NoteOn {
            pitch,
            velocity,
            channel: 3,
        }
    }

    fn note_off(pitch: u8) -> EventKind {
        EventKind::NoteOff { pitch, channel: 3 }
    }

    fn piano_take() -> Timeline {
        Timeline::new(
            480,
            vec![Track::new(vec![
                Event::new(0, EventKind::TempoChange { micros_per_beat: 500_000 }),
                Event::new(
                    0,
                    EventKind::TimeSignature {
                        numerator: 4,
                        denominator: 4,
                    },
                ),
                Event::new(0, note_on(48, 70)),
                Event::new(0, note_on(72, 80)),
                Event::new(
                    0,
                    EventKind::ControlChange {
                        controller: 64,
                        value: 127,
                        channel: 3,
                    },
                ),
                Event::new(240, note_on(60, 90)),
                Event::new(240, note_off(72)),
                Event::new(0, note_off(48)),
                Event::new(100, note_off(60)),
                Event::new(0, EventKind::Meta(MetaEvent::EndOfTrack)),
            ])],
        )
    }

    fn pitched(track: &Track) -> Vec<u8> {
        track.events.iter().filter_map(|e| e.kind.pitch()).collect()
    }

    #[test]
    fn test_split_is_complete() {
        let input = piano_take();
        let split = split_voices(&input, &SplitOptions::default()).unwrap();

        let input_pitched = pitched(&input.tracks[0]).len();
        let upper = pitched(&split.tracks[0]);
        let lower = pitched(&split.tracks[1]);

        assert_eq!(split.tracks.len(), 2);
        assert_eq!(upper.len() + lower.len(), input_pitched);
        assert!(upper.iter().all(|&p| p >= 60));
        assert!(lower.iter().all(|&p| p < 60));
    }

    #[test]
    fn test_split_retags_channels() {
        let split = split_voices(&piano_take(), &SplitOptions::default()).unwrap();

        for (track, channel) in split.tracks.iter().zip([UPPER_CHANNEL, LOWER_CHANNEL]) {
            for event in &track.events {
                match event.kind {
                    EventKind::NoteOn { channel: c, .. } | EventKind::NoteOff { channel: c, .. } => {
                        assert_eq!(c, channel)
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_shared_events_in_both_voices() {
        let split = split_voices(&piano_take(), &SplitOptions::default()).unwrap();

        for track in &split.tracks {
            let shared = track.events.iter().filter(|e| e.kind.is_shared()).count();
            assert_eq!(shared, 2);
            assert!(track.ends_with_end_of_track());
            assert!(!track
                .events
                .iter()
                .any(|e| matches!(e.kind, EventKind::ControlChange { .. })));
        }
    }

    #[test]
    fn test_split_voices_are_time_monotonic() {
        let split = split_voices(&piano_take(), &SplitOptions::default()).unwrap();

        for track in &split.tracks {
            let ticks: Vec<u64> = track.to_absolute().iter().map(|t| t.tick).collect();
            assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
        }

        let upper = split.tracks[0].to_absolute();
        let off_72 = upper
            .iter()
            .find(|t| t.kind == EventKind::NoteOff { pitch: 72, channel: 0 })
            .unwrap();
        assert_eq!(off_72.tick, 480);
    }

    #[test]
    fn test_merge_keeps_track_order_for_ties() {
        let timeline = Timeline::new(
            480,
            vec![
                Track::new(vec![Event::new(100, note_on(70, 10))]),
                Track::new(vec![Event::new(100, note_on(71, 10))]),
            ],
        );
        let options = SplitOptions {
            threshold: 60,
            upper_name: String::new(),
            lower_name: String::new(),
        };

        let split = split_voices(&timeline, &options).unwrap();
        assert_eq!(pitched(&split.tracks[0]), vec![70, 71]);
        assert_eq!(split.tracks[0].events[1].delta, 0);
    }

    #[test]
    fn test_empty_voice_keeps_shared_events_and_end_marker() {
        let timeline = Timeline::new(
            480,
            vec![Track::new(vec![
                Event::new(0, EventKind::TempoChange { micros_per_beat: 500_000 }),
                Event::new(10, note_on(80, 64)),
                Event::new(10, note_off(80)),
            ])],
        );

        let split = split_voices(&timeline, &SplitOptions::default()).unwrap();
        let lower = &split.tracks[1];

        assert_eq!(lower.note_count(), 0);
        assert_eq!(lower.len(), 3); // name, tempo, end
        assert_eq!(
            lower.events[0].kind,
            EventKind::Meta(MetaEvent::TrackName("Lower".to_string()))
        );
        assert!(lower.ends_with_end_of_track());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let result = split_voices(&piano_take(), &SplitOptions::with_threshold(128));
        assert!(matches!(result, Err(TimelineError::InvalidParameter(_))));
    }

    #[test]
    fn test_normalize_then_split_scenario() {
        let timeline = Timeline::new(
            480,
            vec![Track::new(vec![
                Event::new(0, EventKind::TempoChange { micros_per_beat: 500_000 }),
                Event::new(0, note_on(40, 0)),
                Event::new(240, note_on(67, 80)),
                Event::new(240, note_off(67)),
                Event::new(0, EventKind::Meta(MetaEvent::EndOfTrack)),
            ])],
        );

        let trimmed = trim_leading_silence(&timeline);
        let split = split_voices(&trimmed, &SplitOptions::default()).unwrap();

        let upper = split.tracks[0].to_absolute();
        let upper_kinds: Vec<&EventKind> = upper.iter().map(|t| &t.kind).collect();
        assert!(upper_kinds.contains(&&EventKind::TempoChange { micros_per_beat: 500_000 }));
        let on = upper
            .iter()
            .find(|t| matches!(t.kind, EventKind::NoteOn { pitch: 67, .. }))
            .unwrap();
        let off = upper
            .iter()
            .find(|t| matches!(t.kind, EventKind::NoteOff { pitch: 67, .. }))
            .unwrap();
        assert_eq!(on.tick, 0);
        assert_eq!(off.tick, 240);

        let lower = &split.tracks[1];
        assert_eq!(pitched(lower), vec![40]);
        assert_eq!(lower.note_count(), 0);
        assert!(lower
            .events
            .iter()
            .any(|e| e.kind == EventKind::TempoChange { micros_per_beat: 500_000 }));
    }
}
