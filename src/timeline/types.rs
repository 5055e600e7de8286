// Timeline data model
// Timed MIDI events, tracks, and absolute/delta tick conversion

use serde::{Deserialize, Serialize};

/// Largest tempo value a Standard MIDI File can carry (24-bit)
pub const MAX_TEMPO: u32 = 0x00FF_FFFF;

/// Largest delta time a Standard MIDI File can carry (28-bit VLQ)
pub const MAX_DELTA: u32 = 0x0FFF_FFFF;

/// Meta markers the engine understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaEvent {
    /// Sequence/track name, used by the notation converter as a staff label
    TrackName(String),

    /// Required last event of every track
    EndOfTrack,
}

/// What happened at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Key pressed. A velocity of 0 is a note-off in disguise.
    NoteOn { pitch: u8, velocity: u8, channel: u8 },

    NoteOff { pitch: u8, channel: u8 },

    /// Controller change (sustain pedal and friends)
    ControlChange { controller: u8, value: u8, channel: u8 },

    /// Microseconds per quarter note
    TempoChange { micros_per_beat: u32 },

    /// Denominator is the written value (4 for x/4), not the MIDI power of two
    TimeSignature { numerator: u8, denominator: u8 },

    Meta(MetaEvent),
}

impl EventKind {
    /// Pitch of note events, `None` for everything else
    pub fn pitch(&self) -> Option<u8> {
        match self {
            EventKind::NoteOn { pitch, .. } | EventKind::NoteOff { pitch, .. } => Some(*pitch),
            _ => None,
        }
    }

    /// True for a NoteOn that actually sounds (velocity > 0)
    pub fn is_onset(&self) -> bool {
        matches!(self, EventKind::NoteOn { velocity, .. } if *velocity > 0)
    }

    /// Tempo and time-signature events belong to every voice
    pub fn is_shared(&self) -> bool {
        matches!(
            self,
            EventKind::TempoChange { .. } | EventKind::TimeSignature { .. }
        )
    }

    pub fn is_end_of_track(&self) -> bool {
        matches!(self, EventKind::Meta(MetaEvent::EndOfTrack))
    }

    /// Copy of a note event re-tagged to another channel; other kinds are returned unchanged
    pub fn with_channel(&self, channel: u8) -> EventKind {
        match self {
            EventKind::NoteOn { pitch, velocity, .. } => EventKind::NoteOn {
                pitch: *pitch,
                velocity: *velocity,
                channel,
            },
            EventKind::NoteOff { pitch, .. } => EventKind::NoteOff {
                pitch: *pitch,
                channel,
            },
            other => other.clone(),
        }
    }
}

/// An event as stored: ticks since the previous event on the same track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub delta: u32,
    pub kind: EventKind,
}

impl Event {
    pub fn new(delta: u32, kind: EventKind) -> Self {
        Event { delta, kind }
    }
}

/// An event positioned by cumulative ticks from the start of its track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub tick: u64,
    pub kind: EventKind,
}

impl TimedEvent {
    pub fn new(tick: u64, kind: EventKind) -> Self {
        TimedEvent { tick, kind }
    }
}

/// Convert stored delta times to absolute ticks
pub fn delta_to_absolute(events: &[Event]) -> Vec<TimedEvent> {
    let mut tick = 0u64;
    events
        .iter()
        .map(|event| {
            tick += u64::from(event.delta);
            TimedEvent::new(tick, event.kind.clone())
        })
        .collect()
}

/// Convert absolute ticks back to delta times
///
/// Input must already be ordered by tick. Gaps wider than a `u32` saturate.
pub fn absolute_to_delta(events: &[TimedEvent]) -> Vec<Event> {
    let mut prev_tick = 0u64;
    events
        .iter()
        .map(|timed| {
            let delta = timed.tick.saturating_sub(prev_tick);
            prev_tick = timed.tick;
            Event::new(u32::try_from(delta).unwrap_or(u32::MAX), timed.kind.clone())
        })
        .collect()
}

/// Ordered events sharing one tick resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub events: Vec<Event>,
}

impl Track {
    pub fn new(events: Vec<Event>) -> Self {
        Track { events }
    }

    /// Build a track from absolute-time events (must be sorted by tick)
    pub fn from_absolute(events: &[TimedEvent]) -> Self {
        Track::new(absolute_to_delta(events))
    }

    pub fn to_absolute(&self) -> Vec<TimedEvent> {
        delta_to_absolute(&self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of sounding NoteOn events
    pub fn note_count(&self) -> usize {
        self.events.iter().filter(|e| e.kind.is_onset()).count()
    }

    pub fn ends_with_end_of_track(&self) -> bool {
        self.events
            .last()
            .map(|e| e.kind.is_end_of_track())
            .unwrap_or(false)
    }

    /// Absolute tick of the last event
    pub fn duration_ticks(&self) -> u64 {
        self.events.iter().map(|e| u64::from(e.delta)).sum()
    }
}

/// One tick resolution plus one or more parallel tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    /// Pulses per quarter note, typically 384, 480 or 960
    pub ticks_per_beat: u16,

    pub tracks: Vec<Track>,
}

impl Timeline {
    pub fn new(ticks_per_beat: u16, tracks: Vec<Track>) -> Self {
        Timeline {
            ticks_per_beat,
            tracks,
        }
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(Track::note_count).sum()
    }

    /// Total event count across all tracks
    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }
}
