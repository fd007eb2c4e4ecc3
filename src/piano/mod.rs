//! Piano vocabulary: note identifiers, duration tokens, and the key layout.
//!
//! The instrument is a fixed single-octave keyboard from C4 to C5. Every
//! other module refers to pitches through [`NoteId`] and to the key set
//! through [`PIANO_KEYS`].

mod note;

pub use note::{DurationToken, NoteId};

/// Standard note names within an octave, indexed by `pitch % 12`.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Ticks per beat (quarter note), used to size duration tokens.
pub const TICKS_PER_BEAT: u32 = 480;

/// Default tempo in beats per minute.
pub const DEFAULT_TEMPO: u32 = 120;

/// Computer keyboard key to MIDI note mapping, lowest key first.
///
/// Home row keys are the white keys, the row above holds the black keys.
pub const PIANO_KEYS: [(char, u8); 13] = [
    ('a', 60), // C4
    ('w', 61), // C#4
    ('s', 62), // D4
    ('e', 63), // D#4
    ('d', 64), // E4
    ('f', 65), // F4
    ('t', 66), // F#4
    ('g', 67), // G4
    ('y', 68), // G#4
    ('h', 69), // A4
    ('u', 70), // A#4
    ('j', 71), // B4
    ('k', 72), // C5
];

/// Looks up the note bound to a computer keyboard key (case-insensitive).
pub fn note_for_key(key: char) -> Option<NoteId> {
    let key = key.to_ascii_lowercase();
    PIANO_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, pitch)| NoteId::from_midi(*pitch))
}

/// Returns the computer keyboard key bound to a note, if any.
pub fn key_for_note(note: NoteId) -> Option<char> {
    PIANO_KEYS
        .iter()
        .find(|(_, pitch)| *pitch == note.midi())
        .map(|(k, _)| *k)
}

/// Returns the notes of the instrument, lowest first.
pub fn piano_notes() -> impl Iterator<Item = NoteId> {
    PIANO_KEYS.iter().map(|(_, pitch)| NoteId::from_midi(*pitch))
}

/// Whether a note belongs to the instrument's fixed key set.
pub fn has_key(note: NoteId) -> bool {
    PIANO_KEYS.iter().any(|(_, pitch)| *pitch == note.midi())
}

/// Converts a MIDI note number to a human-readable note name with octave.
///
/// # Examples
///
/// ```
/// use pianola::piano::note_to_name;
///
/// assert_eq!(note_to_name(60), "C4");
/// ```
pub fn note_to_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", NOTE_NAMES[note_index], octave)
}

/// Converts a note name like "C4" or "F#5" to a MIDI note number.
///
/// Returns `None` for malformed names or pitches outside 0-127.
pub fn name_to_note(name: &str) -> Option<u8> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let octave_start = name.find(|c: char| c.is_ascii_digit() || c == '-')?;

    let note_part = &name[..octave_start];
    let octave_part = &name[octave_start..];

    let note_index = NOTE_NAMES.iter().position(|&n| n == note_part)?;
    let octave: i8 = octave_part.parse().ok()?;

    // MIDI note = (octave + 1) * 12 + note_index
    let midi_note = (octave as i16 + 1) * 12 + note_index as i16;
    if (0..=127).contains(&midi_note) {
        Some(midi_note as u8)
    } else {
        None
    }
}

/// Converts ticks to seconds based on tempo.
pub fn ticks_to_seconds(ticks: u32, tempo: u32) -> f64 {
    let beats = ticks as f64 / TICKS_PER_BEAT as f64;
    beats * 60.0 / tempo.max(1) as f64
}

/// Whether a MIDI pitch falls on a black key.
pub fn is_black(pitch: u8) -> bool {
    matches!(pitch % 12, 1 | 3 | 6 | 8 | 10)
}
