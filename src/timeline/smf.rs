// Standard MIDI File codec
// Decodes SMF bytes into timelines and encodes them back using midly

use std::fs;
use std::path::Path;

use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use super::types::{Event, EventKind, MetaEvent, Timeline, Track, MAX_DELTA, MAX_TEMPO};
use super::{TimelineError, TimelineResult};

/// MIDI clocks per metronome click written with time signatures
const CLOCKS_PER_CLICK: u8 = 24;

/// Notated 32nd notes per MIDI quarter note
const THIRTY_SECONDS_PER_QUARTER: u8 = 8;

impl Timeline {
    /// Decode a Standard MIDI File
    ///
    /// Requires metrical timing and an end-of-track marker closing every track.
    /// Messages the engine does not model (pitch bend, aftertouch, sysex, ...) are
    /// dropped, with their delta time carried onto the next kept event.
    pub fn from_smf_bytes(bytes: &[u8]) -> TimelineResult<Self> {
        let smf = Smf::parse(bytes)?;

        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(tpb) => tpb.as_int(),
            Timing::Timecode(..) => return Err(TimelineError::UnsupportedTiming),
        };

        if smf.tracks.is_empty() {
            return Err(TimelineError::Malformed("file contains no tracks".to_string()));
        }

        let mut tracks = Vec::with_capacity(smf.tracks.len());
        for (index, raw) in smf.tracks.iter().enumerate() {
            tracks.push(decode_track(index, raw)?);
        }

        Ok(Timeline::new(ticks_per_beat, tracks))
    }

    /// Encode as a format 1 (parallel tracks) Standard MIDI File
    pub fn to_smf_bytes(&self) -> TimelineResult<Vec<u8>> {
        let header = Header {
            format: Format::Parallel,
            timing: Timing::Metrical(self.ticks_per_beat.into()),
        };

        let mut tracks = Vec::with_capacity(self.tracks.len());
        for track in &self.tracks {
            tracks.push(encode_track(track)?);
        }

        let smf = Smf { header, tracks };

        let mut bytes = Vec::new();
        smf.write(&mut bytes)
            .map_err(|e| TimelineError::Encode(e.to_string()))?;

        Ok(bytes)
    }
}

/// Read and decode a MIDI file from disk
pub fn read_timeline(path: &Path) -> TimelineResult<Timeline> {
    let bytes = fs::read(path)?;
    Timeline::from_smf_bytes(&bytes)
}

/// Encode a timeline and write it to disk
pub fn write_timeline(path: &Path, timeline: &Timeline) -> TimelineResult<()> {
    let bytes = timeline.to_smf_bytes()?;
    fs::write(path, bytes)?;
    Ok(())
}

fn decode_track(index: usize, raw: &[TrackEvent<'_>]) -> TimelineResult<Track> {
    let terminated = raw
        .last()
        .map(|e| matches!(e.kind, TrackEventKind::Meta(MetaMessage::EndOfTrack)))
        .unwrap_or(false);
    if !terminated {
        return Err(TimelineError::Malformed(format!(
            "track {} has no end-of-track marker",
            index
        )));
    }

    let mut events = Vec::with_capacity(raw.len());
    let mut carried = 0u32;

    for event in raw {
        let delta = carried.saturating_add(event.delta.as_int());
        match decode_kind(&event.kind)? {
            Some(kind) => {
                events.push(Event::new(delta, kind));
                carried = 0;
            }
            None => {
                log::debug!("Track {}: skipping unsupported event {:?}", index, event.kind);
                carried = delta;
            }
        }
    }

    Ok(Track::new(events))
}

fn decode_kind(kind: &TrackEventKind<'_>) -> TimelineResult<Option<EventKind>> {
    let decoded = match kind {
        TrackEventKind::Midi { channel, message } => {
            let channel = channel.as_int();
            match message {
                MidiMessage::NoteOn { key, vel } => Some(EventKind::NoteOn {
                    pitch: key.as_int(),
                    velocity: vel.as_int(),
                    channel,
                }),
                MidiMessage::NoteOff { key, .. } => Some(EventKind::NoteOff {
                    pitch: key.as_int(),
                    channel,
                }),
                MidiMessage::Controller { controller, value } => Some(EventKind::ControlChange {
                    controller: controller.as_int(),
                    value: value.as_int(),
                    channel,
                }),
                _ => None,
            }
        }
        TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => Some(EventKind::TempoChange {
            micros_per_beat: tempo.as_int(),
        }),
        TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, power, _, _)) => {
            if *power > 7 {
                return Err(TimelineError::Malformed(format!(
                    "time signature denominator 2^{} out of range",
                    power
                )));
            }
            Some(EventKind::TimeSignature {
                numerator: *numerator,
                denominator: 1u8 << power,
            })
        }
        TrackEventKind::Meta(MetaMessage::TrackName(name)) => Some(EventKind::Meta(
            MetaEvent::TrackName(String::from_utf8_lossy(name).into_owned()),
        )),
        TrackEventKind::Meta(MetaMessage::EndOfTrack) => Some(EventKind::Meta(MetaEvent::EndOfTrack)),
        _ => None,
    };

    Ok(decoded)
}

fn encode_track(track: &Track) -> TimelineResult<Vec<TrackEvent<'_>>> {
    let mut events = Vec::with_capacity(track.len() + 1);

    for event in &track.events {
        let delta = if event.delta > MAX_DELTA {
            log::warn!("Clamping delta time {} to {}", event.delta, MAX_DELTA);
            MAX_DELTA
        } else {
            event.delta
        };

        events.push(TrackEvent {
            delta: delta.into(),
            kind: encode_kind(&event.kind)?,
        });
    }

    Ok(events)
}

fn encode_kind(kind: &EventKind) -> TimelineResult<TrackEventKind<'_>> {
    let encoded = match kind {
        EventKind::NoteOn {
            pitch,
            velocity,
            channel,
        } => TrackEventKind::Midi {
            channel: channel_nibble(*channel)?.into(),
            message: MidiMessage::NoteOn {
                key: data_byte("pitch", *pitch)?.into(),
                vel: data_byte("velocity", *velocity)?.into(),
            },
        },
        EventKind::NoteOff { pitch, channel } => TrackEventKind::Midi {
            channel: channel_nibble(*channel)?.into(),
            message: MidiMessage::NoteOff {
                key: data_byte("pitch", *pitch)?.into(),
                vel: 0.into(),
            },
        },
        EventKind::ControlChange {
            controller,
            value,
            channel,
        } => TrackEventKind::Midi {
            channel: channel_nibble(*channel)?.into(),
            message: MidiMessage::Controller {
                controller: data_byte("controller", *controller)?.into(),
                value: data_byte("controller value", *value)?.into(),
            },
        },
        EventKind::TempoChange { micros_per_beat } => {
            let tempo = if *micros_per_beat > MAX_TEMPO {
                log::warn!("Clamping tempo {} to {}", micros_per_beat, MAX_TEMPO);
                MAX_TEMPO
            } else {
                *micros_per_beat
            };
            TrackEventKind::Meta(MetaMessage::Tempo(tempo.into()))
        }
        EventKind::TimeSignature {
            numerator,
            denominator,
        } => {
            if !denominator.is_power_of_two() {
                return Err(TimelineError::Encode(format!(
                    "time signature denominator {} is not a power of two",
                    denominator
                )));
            }
            TrackEventKind::Meta(MetaMessage::TimeSignature(
                *numerator,
                denominator.trailing_zeros() as u8,
                CLOCKS_PER_CLICK,
                THIRTY_SECONDS_PER_QUARTER,
            ))
        }
        EventKind::Meta(MetaEvent::TrackName(name)) => {
            TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes()))
        }
        EventKind::Meta(MetaEvent::EndOfTrack) => TrackEventKind::Meta(MetaMessage::EndOfTrack),
    };

    Ok(encoded)
}

/// MIDI data bytes carry 7 bits; anything wider would be masked on write
fn data_byte(field: &str, value: u8) -> TimelineResult<u8> {
    if value > 0x7F {
        return Err(TimelineError::Encode(format!(
            "{} {} does not fit in 7 bits",
            field, value
        )));
    }
    Ok(value)
}

fn channel_nibble(channel: u8) -> TimelineResult<u8> {
    if channel > 0x0F {
        return Err(TimelineError::Encode(format!(
            "channel {} is outside 0-15",
            channel
        )));
    }
    Ok(channel)
}
