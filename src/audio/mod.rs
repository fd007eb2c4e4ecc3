//! Sound engines driven by the piano and the recorder.
//!
//! The recorder only needs the four operations of [`SoundEngine`]. Two
//! implementations exist:
//! - [`AudioEngine`]: SoundFont synthesis via rustysynth, output via rodio
//! - [`SilentEngine`]: used when no SoundFont is available

pub mod engine;

pub use engine::AudioEngine;

use crate::piano::{DurationToken, NoteId};

/// The capability the recorder drives.
///
/// Implementations own their timing and sound quality. Failures inside the
/// engine are never reported back; a broken engine simply stays quiet.
pub trait SoundEngine {
    /// Starts a note and holds it until released.
    fn attack(&mut self, note: NoteId);

    /// Releases a held note.
    fn release(&mut self, note: NoteId);

    /// Starts a note and releases it after `duration`.
    fn attack_release(&mut self, note: NoteId, duration: DurationToken);

    /// Releases every sounding note, including pending timed releases.
    fn release_all(&mut self);

    /// Performs time-based upkeep. Called once per frame.
    fn service(&mut self) {}

    /// Selects the instrument; engines without instruments ignore it.
    fn set_program(&mut self, _program: u8) {}

    /// Display name of an instrument.
    fn instrument_name(&self, program: u8) -> String {
        format!("Program {}", program)
    }
}

/// Engine that produces no sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentEngine;

impl SoundEngine for SilentEngine {
    fn attack(&mut self, _note: NoteId) {}

    fn release(&mut self, _note: NoteId) {}

    fn attack_release(&mut self, _note: NoteId, _duration: DurationToken) {}

    fn release_all(&mut self) {}

    fn instrument_name(&self, _program: u8) -> String {
        "No sound".to_string()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// One call received by [`MockEngine`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum EngineCall {
        Attack(NoteId),
        Release(NoteId),
        AttackRelease(NoteId, DurationToken),
        ReleaseAll,
    }

    /// Engine that records every call for assertions.
    #[derive(Debug, Default)]
    pub struct MockEngine {
        pub calls: Vec<EngineCall>,
        pub program: Option<u8>,
    }

    impl MockEngine {
        pub fn new() -> Self {
            Self::default()
        }

        /// Notes passed to `attack_release`, in call order.
        pub fn played(&self) -> Vec<NoteId> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    EngineCall::AttackRelease(n, _) => Some(*n),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, call: EngineCall) -> usize {
            self.calls.iter().filter(|c| **c == call).count()
        }
    }

    impl SoundEngine for MockEngine {
        fn attack(&mut self, note: NoteId) {
            self.calls.push(EngineCall::Attack(note));
        }

        fn release(&mut self, note: NoteId) {
            self.calls.push(EngineCall::Release(note));
        }

        fn attack_release(&mut self, note: NoteId, duration: DurationToken) {
            self.calls.push(EngineCall::AttackRelease(note, duration));
        }

        fn release_all(&mut self) {
            self.calls.push(EngineCall::ReleaseAll);
        }

        fn set_program(&mut self, program: u8) {
            self.program = Some(program);
        }
    }
}
