//! Key input surfaces: turn terminal keyboard and mouse activity into note events.
//!
//! The recorder only sees [`PianoInput`] values. Knowledge about terminals,
//! autorepeat and pointer dragging stays here.

use crate::piano::{self, NoteId};
use crate::recorder::Millis;
use crossterm::event::KeyEventKind;
use std::collections::HashMap;

/// A logical note event for the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PianoInput {
    /// A key went down. With `repeat_suppressed`, a key that is already
    /// sounding is not struck again.
    NoteOn {
        note: NoteId,
        repeat_suppressed: bool,
    },
    NoteOff(NoteId),
    /// The pointer was released: silence everything.
    ReleaseAll,
}

/// Computer keyboard as a piano.
///
/// Terminals with the keyboard enhancement protocol report releases and
/// repeats; older terminals only report presses, with autorepeat showing up
/// as more presses. For those, a key counts as released once it has seen no
/// press for `release_after_ms`.
#[derive(Debug)]
pub struct KeyboardSurface {
    reports_releases: bool,
    release_after_ms: Millis,
    /// Held notes and the time of their latest press.
    held: HashMap<NoteId, Millis>,
}

impl KeyboardSurface {
    pub fn new(reports_releases: bool, release_after_ms: Millis) -> Self {
        Self {
            reports_releases,
            release_after_ms,
            held: HashMap::new(),
        }
    }

    pub fn reports_releases(&self) -> bool {
        self.reports_releases
    }

    /// Whether a note is held down on the computer keyboard.
    pub fn is_held(&self, note: NoteId) -> bool {
        self.held.contains_key(&note)
    }

    /// Translates a key event. Keys outside the piano layout yield nothing.
    pub fn key_event(&mut self, key: char, kind: KeyEventKind, now: Millis) -> Option<PianoInput> {
        let note = piano::note_for_key(key)?;
        match kind {
            KeyEventKind::Press => {
                self.held.insert(note, now);
                Some(PianoInput::NoteOn {
                    note,
                    repeat_suppressed: true,
                })
            }
            KeyEventKind::Repeat => {
                self.held.insert(note, now);
                None
            }
            KeyEventKind::Release => {
                self.held.remove(&note);
                Some(PianoInput::NoteOff(note))
            }
        }
    }

    /// Releases keys that went quiet, on terminals without release events.
    pub fn expire(&mut self, now: Millis) -> Vec<PianoInput> {
        if self.reports_releases {
            return Vec::new();
        }
        let window = self.release_after_ms;
        let mut expired: Vec<NoteId> = self
            .held
            .iter()
            .filter(|(_, last)| now.saturating_sub(**last) >= window)
            .map(|(note, _)| *note)
            .collect();
        expired.sort();
        for note in &expired {
            self.held.remove(note);
        }
        expired.into_iter().map(PianoInput::NoteOff).collect()
    }

    /// Forgets every held key without producing events.
    pub fn clear(&mut self) {
        self.held.clear();
    }
}

/// Mouse as a piano: press a key, drag across keys for a glissando.
#[derive(Debug, Default)]
pub struct PointerSurface {
    down: bool,
    over: Option<NoteId>,
}

impl PointerSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the button went down on the piano and is still held.
    pub fn is_down(&self) -> bool {
        self.down
    }

    /// Button pressed over `target` (None = not over a key).
    pub fn press(&mut self, target: Option<NoteId>) -> Vec<PianoInput> {
        let Some(note) = target else {
            return Vec::new();
        };
        self.down = true;
        self.over = Some(note);
        vec![PianoInput::NoteOn {
            note,
            repeat_suppressed: false,
        }]
    }

    /// Pointer moved with the button held.
    pub fn drag(&mut self, target: Option<NoteId>) -> Vec<PianoInput> {
        if !self.down || target == self.over {
            return Vec::new();
        }
        let mut events = Vec::with_capacity(2);
        if let Some(old) = self.over {
            events.push(PianoInput::NoteOff(old));
        }
        if let Some(note) = target {
            events.push(PianoInput::NoteOn {
                note,
                repeat_suppressed: false,
            });
        }
        self.over = target;
        events
    }

    /// Button released anywhere.
    pub fn release(&mut self) -> Vec<PianoInput> {
        if !self.down {
            return Vec::new();
        }
        self.down = false;
        self.over = None;
        vec![PianoInput::ReleaseAll]
    }
}
