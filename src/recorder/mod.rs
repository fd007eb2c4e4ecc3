//! One-take recorder and player for the piano.
//!
//! The [`Recorder`] owns the transport state, the recorded take, the
//! pending playback callbacks and the per-key highlight state. All timing
//! is expressed in logical milliseconds passed in by the caller, so the
//! main loop supplies a monotonic clock and tests supply plain numbers.

mod timeline;

pub use timeline::{Millis, Timeline, TimerHandle};

use crate::audio::SoundEngine;
use crate::piano::{self, DurationToken, NoteId};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// A note captured while recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    /// The key that was struck.
    pub note: NoteId,
    /// Milliseconds since the recording started.
    pub offset_ms: Millis,
    /// Playback length, interpreted by the sound engine.
    pub duration: DurationToken,
}

/// The transport's mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Idle,
    Recording,
    Playing,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportState::Idle => "idle",
            TransportState::Recording => "recording",
            TransportState::Playing => "playing",
        })
    }
}

/// Transport operations a user can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    Record,
    Play,
    Stop,
}

impl fmt::Display for TransportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportAction::Record => "record",
            TransportAction::Play => "play",
            TransportAction::Stop => "stop",
        })
    }
}

/// Status text shown next to the transport buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Recording,
    Recorded,
    Playing,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Idle => "Idle",
            Status::Recording => "Recording...",
            Status::Recorded => "Recorded",
            Status::Playing => "Playing...",
        }
    }
}

/// Availability of the transport buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub record_enabled: bool,
    pub play_enabled: bool,
    /// The Stop button is only shown, and only usable, during playback.
    pub stop_visible: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            record_enabled: true,
            play_enabled: false,
            stop_visible: false,
        }
    }
}

/// Requests the recorder ignored. A rejected request leaves all state as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    /// The operation is not offered in the current state.
    #[error("{action} ignored while {state}")]
    InvalidTransition {
        action: TransportAction,
        state: TransportState,
    },
    /// The note has no key on this instrument.
    #[error("no key for note {0}")]
    MissingTarget(NoteId),
}

/// Tunable timings of the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecorderSettings {
    /// Duration token stored with every captured note.
    pub default_duration: DurationToken,
    /// How long a key stays highlighted when played back.
    pub flash_ms: Millis,
    /// Delay after the last note before playback ends.
    pub tail_ms: Millis,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            default_duration: DurationToken::Eighth,
            flash_ms: 200,
            tail_ms: 500,
        }
    }
}

/// Deferred playback work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cue {
    /// Sound the take's event at this index.
    Trigger(usize),
    /// End the highlight of a played-back key.
    Unflash(NoteId),
    /// Playback finished; return to idle.
    Finish,
}

/// The recorder/player state machine.
#[derive(Debug)]
pub struct Recorder {
    settings: RecorderSettings,
    state: TransportState,
    session: Vec<NoteEvent>,
    session_start: Millis,
    playback_start: Millis,
    timeline: Timeline<Cue>,
    /// Handles of every playback cue still waiting to fire.
    pending: HashSet<TimerHandle>,
    active: HashSet<NoteId>,
    status: Status,
    controls: Controls,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(RecorderSettings::default())
    }
}

impl Recorder {
    pub fn new(settings: RecorderSettings) -> Self {
        Self {
            settings,
            state: TransportState::Idle,
            session: Vec::new(),
            session_start: 0,
            playback_start: 0,
            timeline: Timeline::new(),
            pending: HashSet::new(),
            active: HashSet::new(),
            status: Status::Idle,
            controls: Controls::default(),
        }
    }

    // ==================== Accessors ====================

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// The current take, in capture order.
    pub fn session(&self) -> &[NoteEvent] {
        &self.session
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    /// Whether a key is currently highlighted, by live play or playback.
    pub fn is_active(&self, note: NoteId) -> bool {
        self.active.contains(&note)
    }

    /// Number of playback callbacks still waiting to fire.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Deadline of the next playback callback, if any.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.timeline.next_deadline()
    }

    /// Time into the current recording or playback; the take's length when idle.
    pub fn elapsed_ms(&self, now: Millis) -> Millis {
        match self.state {
            TransportState::Recording => now.saturating_sub(self.session_start),
            TransportState::Playing => now.saturating_sub(self.playback_start),
            TransportState::Idle => self.session.last().map_or(0, |e| e.offset_ms),
        }
    }

    // ==================== Live input ====================

    /// Strikes a key.
    ///
    /// With `repeat_suppressed`, a key that is already highlighted is left
    /// alone: no second attack and no second capture. Returns whether the
    /// note was struck.
    pub fn note_on(
        &mut self,
        note: NoteId,
        repeat_suppressed: bool,
        now: Millis,
        engine: &mut dyn SoundEngine,
    ) -> Result<bool, Rejected> {
        if !piano::has_key(note) {
            return Err(Rejected::MissingTarget(note));
        }
        if repeat_suppressed && self.active.contains(&note) {
            return Ok(false);
        }

        engine.attack(note);
        self.active.insert(note);

        if self.state == TransportState::Recording {
            let event = NoteEvent {
                note,
                offset_ms: now.saturating_sub(self.session_start),
                duration: self.settings.default_duration,
            };
            debug!(note = %note, offset_ms = event.offset_ms, "captured note");
            self.session.push(event);
        }
        Ok(true)
    }

    /// Releases a key. Releases are never recorded.
    pub fn note_off(&mut self, note: NoteId, engine: &mut dyn SoundEngine) -> Result<(), Rejected> {
        if !piano::has_key(note) {
            return Err(Rejected::MissingTarget(note));
        }
        engine.release(note);
        self.active.remove(&note);
        Ok(())
    }

    /// Silences everything and clears every highlight, e.g. when the pointer is released.
    pub fn release_all_live(&mut self, engine: &mut dyn SoundEngine) {
        engine.release_all();
        self.active.clear();
    }

    // ==================== Transport ====================

    /// Starts a new recording when idle, finishes it when recording.
    pub fn toggle_record(&mut self, now: Millis) -> Result<(), Rejected> {
        match self.state {
            TransportState::Idle => {
                self.session.clear();
                self.session_start = now;
                self.state = TransportState::Recording;
                self.status = Status::Recording;
                self.controls.play_enabled = false;
                info!("recording started");
                Ok(())
            }
            TransportState::Recording => {
                self.state = TransportState::Idle;
                self.status = Status::Recorded;
                self.controls.play_enabled = !self.session.is_empty();
                info!(notes = self.session.len(), "recording finished");
                Ok(())
            }
            TransportState::Playing => Err(Rejected::InvalidTransition {
                action: TransportAction::Record,
                state: self.state,
            }),
        }
    }

    /// Plays the take back from the start.
    pub fn play(&mut self, now: Millis) -> Result<(), Rejected> {
        let rejected = Rejected::InvalidTransition {
            action: TransportAction::Play,
            state: self.state,
        };
        if self.state != TransportState::Idle {
            return Err(rejected);
        }
        let Some(last) = self.session.last() else {
            return Err(rejected);
        };
        let end = now + last.offset_ms + self.settings.tail_ms;

        for (index, event) in self.session.iter().enumerate() {
            let handle = self.timeline.schedule(now + event.offset_ms, Cue::Trigger(index));
            self.pending.insert(handle);
        }
        let handle = self.timeline.schedule(end, Cue::Finish);
        self.pending.insert(handle);

        self.playback_start = now;
        self.state = TransportState::Playing;
        self.status = Status::Playing;
        self.controls = Controls {
            record_enabled: false,
            play_enabled: false,
            stop_visible: true,
        };
        info!(notes = self.session.len(), ends_at = end, "playback started");
        Ok(())
    }

    /// Stops playback early.
    pub fn stop(&mut self, engine: &mut dyn SoundEngine) -> Result<(), Rejected> {
        if self.state != TransportState::Playing {
            return Err(Rejected::InvalidTransition {
                action: TransportAction::Stop,
                state: self.state,
            });
        }
        info!("playback stopped");
        self.finish_playback(engine);
        Ok(())
    }

    /// Fires every playback callback due at `now`.
    pub fn tick(&mut self, now: Millis, engine: &mut dyn SoundEngine) {
        while let Some((handle, deadline, cue)) = self.timeline.pop_due(now) {
            self.pending.remove(&handle);
            match cue {
                Cue::Trigger(index) => {
                    let Some(event) = self.session.get(index).copied() else {
                        continue;
                    };
                    if !piano::has_key(event.note) {
                        continue;
                    }
                    engine.attack_release(event.note, event.duration);
                    self.active.insert(event.note);
                    let unflash = self
                        .timeline
                        .schedule(deadline + self.settings.flash_ms, Cue::Unflash(event.note));
                    self.pending.insert(unflash);
                }
                Cue::Unflash(note) => {
                    self.active.remove(&note);
                }
                Cue::Finish => {
                    info!("playback finished");
                    self.finish_playback(engine);
                }
            }
        }
    }

    /// Leaves playback: cancels every pending cue and resets the controls.
    fn finish_playback(&mut self, engine: &mut dyn SoundEngine) {
        let cancelled = self.pending.len();
        for handle in self.pending.drain() {
            self.timeline.cancel(handle);
        }
        if cancelled > 0 {
            debug!(cancelled, "cancelled pending playback cues");
        }
        if !self.timeline.is_empty() {
            warn!(stray = self.timeline.len(), "dropping untracked playback cues");
            self.timeline.clear();
        }

        engine.release_all();
        self.active.clear();

        self.state = TransportState::Idle;
        self.status = Status::Idle;
        self.controls = Controls {
            record_enabled: true,
            play_enabled: !self.session.is_empty(),
            stop_visible: false,
        };
    }
}
