//! Note identifiers and playback duration tokens.

use super::{name_to_note, note_to_name, ticks_to_seconds, TICKS_PER_BEAT};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Identifier for one pitch of the instrument.
///
/// Wraps a MIDI note number (60 = C4) and displays as its note name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(u8);

impl NoteId {
    /// Creates a note from a MIDI note number, clamped to 0-127.
    pub fn from_midi(pitch: u8) -> Self {
        Self(pitch.min(127))
    }

    /// Returns the MIDI note number.
    pub fn midi(self) -> u8 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&note_to_name(self.0))
    }
}

impl FromStr for NoteId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        name_to_note(s)
            .map(Self)
            .ok_or_else(|| format!("invalid note name: {s:?}"))
    }
}

/// Opaque playback length attached to a recorded note.
///
/// Only the sound engine gives it a length in time, through
/// [`DurationToken::as_seconds`] at the engine's tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum DurationToken {
    #[serde(rename = "1n")]
    Whole,
    #[serde(rename = "2n")]
    Half,
    #[serde(rename = "4n")]
    Quarter,
    #[default]
    #[serde(rename = "8n")]
    Eighth,
    #[serde(rename = "16n")]
    Sixteenth,
}

impl DurationToken {
    /// Length of the token in ticks.
    pub fn ticks(self) -> u32 {
        match self {
            DurationToken::Whole => TICKS_PER_BEAT * 4,
            DurationToken::Half => TICKS_PER_BEAT * 2,
            DurationToken::Quarter => TICKS_PER_BEAT,
            DurationToken::Eighth => TICKS_PER_BEAT / 2,
            DurationToken::Sixteenth => TICKS_PER_BEAT / 4,
        }
    }

    /// Length of the token in seconds at the given tempo.
    pub fn as_seconds(self, tempo: u32) -> f64 {
        ticks_to_seconds(self.ticks(), tempo)
    }

    /// Short label, as written in config files.
    pub fn label(self) -> &'static str {
        match self {
            DurationToken::Whole => "1n",
            DurationToken::Half => "2n",
            DurationToken::Quarter => "4n",
            DurationToken::Eighth => "8n",
            DurationToken::Sixteenth => "16n",
        }
    }
}

impl fmt::Display for DurationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_display_and_parse() {
        let note = NoteId::from_midi(61);
        assert_eq!(note.to_string(), "C#4");
        assert_eq!("C#4".parse::<NoteId>(), Ok(note));
        assert!("X4".parse::<NoteId>().is_err());
        assert!("é4".parse::<NoteId>().is_err());
    }

    #[test]
    fn test_note_clamping() {
        assert_eq!(NoteId::from_midi(200).midi(), 127);
    }

    #[test]
    fn test_duration_seconds() {
        // Eighth note at 120 BPM = a quarter second
        assert!((DurationToken::Eighth.as_seconds(120) - 0.25).abs() < 1e-9);
        assert!((DurationToken::Whole.as_seconds(60) - 4.0).abs() < 1e-9);
        assert_eq!(DurationToken::default(), DurationToken::Eighth);
    }

    #[test]
    fn test_duration_labels_match_serde_names() {
        #[derive(Deserialize)]
        struct Holder {
            d: DurationToken,
        }
        for token in [
            DurationToken::Whole,
            DurationToken::Half,
            DurationToken::Quarter,
            DurationToken::Eighth,
            DurationToken::Sixteenth,
        ] {
            let parsed: Holder = toml::from_str(&format!("d = \"{}\"", token)).unwrap();
            assert_eq!(parsed.d, token);
        }
    }
}
