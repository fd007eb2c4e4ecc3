//! SoundFont sound engine.
//!
//! Renders a rustysynth synthesizer through a rodio output stream. Held
//! notes sound until released; timed notes are released by [`AudioEngine::service`]
//! once their duration has elapsed.

use super::SoundEngine;
use crate::piano::{DurationToken, NoteId, DEFAULT_TEMPO};
use anyhow::{Context, Result};
use rodio::{OutputStream, OutputStreamHandle, Source};
use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Audio buffer size for low-latency playback.
const BUFFER_SIZE: usize = 256;

/// MIDI channel used for the piano.
const CHANNEL: i32 = 0;

/// Audio source that generates samples from the synthesizer.
/// Implements rodio's Source trait for playback.
struct SynthSource {
    /// The synthesizer instance.
    synth: Arc<Mutex<Synthesizer>>,
    /// Left channel buffer.
    left_buf: Vec<f32>,
    /// Right channel buffer.
    right_buf: Vec<f32>,
    /// Current position in the buffer.
    buf_pos: usize,
    /// Current channel (0 = left, 1 = right).
    channel: usize,
}

impl SynthSource {
    fn new(synth: Arc<Mutex<Synthesizer>>) -> Self {
        Self {
            synth,
            left_buf: vec![0.0; BUFFER_SIZE],
            right_buf: vec![0.0; BUFFER_SIZE],
            buf_pos: BUFFER_SIZE, // Start at end to trigger first render
            channel: 0,
        }
    }
}

impl Iterator for SynthSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        // Render a new buffer when we've exhausted the current one
        if self.buf_pos >= BUFFER_SIZE {
            // Held live notes and timed playback notes share one synthesizer,
            // so always render; it outputs silence when nothing sounds.
            if let Ok(mut synth) = self.synth.lock() {
                synth.render(&mut self.left_buf, &mut self.right_buf);
            } else {
                // Only fill with silence if we can't get the lock
                self.left_buf.fill(0.0);
                self.right_buf.fill(0.0);
            }
            self.buf_pos = 0;
        }

        // Interleave stereo samples: L, R, L, R, ...
        let sample = if self.channel == 0 {
            self.left_buf[self.buf_pos]
        } else {
            self.right_buf[self.buf_pos]
        };

        // Advance to next channel/sample
        self.channel = 1 - self.channel;
        if self.channel == 0 {
            self.buf_pos += 1;
        }

        Some(sample)
    }
}

impl Source for SynthSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        2 // Stereo
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

/// A note started by `attack_release`, waiting for its release time.
#[derive(Debug, Clone, Copy)]
struct TimedRelease {
    at: Instant,
    note: NoteId,
}

/// SoundFont-backed [`SoundEngine`].
pub struct AudioEngine {
    synth: Arc<Mutex<Synthesizer>>,
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
    velocity: u8,
    /// Tempo used to turn duration tokens into time.
    tempo: u32,
    timed_releases: Vec<TimedRelease>,
    /// Instrument names indexed by program number (0-127).
    instrument_names: [String; 128],
}

impl AudioEngine {
    /// Loads a SoundFont and opens the default audio output.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The SoundFont file cannot be read
    /// - The SoundFont is invalid
    /// - Audio output cannot be initialized
    pub fn new<P: AsRef<Path>>(soundfont_path: P, velocity: u8, tempo: u32) -> Result<Self> {
        let path = soundfont_path.as_ref();
        let mut file = BufReader::new(
            File::open(path)
                .with_context(|| format!("Failed to open SoundFont: {}", path.display()))?,
        );
        let soundfont = Arc::new(
            SoundFont::new(&mut file)
                .map_err(|e| anyhow::anyhow!("Failed to load SoundFont: {:?}", e))?,
        );

        let instrument_names = Self::extract_instrument_names(&soundfont);

        let settings = SynthesizerSettings::new(SAMPLE_RATE as i32);
        let synth = Synthesizer::new(&soundfont, &settings)
            .map_err(|e| anyhow::anyhow!("Failed to create synthesizer: {:?}", e))?;
        let synth = Arc::new(Mutex::new(synth));

        let (stream, stream_handle) =
            OutputStream::try_default().context("Failed to open audio output")?;

        let source = SynthSource::new(Arc::clone(&synth));
        stream_handle
            .play_raw(source)
            .context("Failed to start audio playback")?;

        info!(soundfont = %path.display(), "audio engine ready");

        Ok(Self {
            synth,
            _stream: stream,
            _stream_handle: stream_handle,
            velocity: velocity.min(127),
            tempo: if tempo == 0 { DEFAULT_TEMPO } else { tempo },
            timed_releases: Vec::new(),
            instrument_names,
        })
    }

    /// Maps bank 0 presets to their program numbers, falling back to "Program N".
    fn extract_instrument_names(soundfont: &SoundFont) -> [String; 128] {
        let mut names: [String; 128] = std::array::from_fn(|i| format!("Program {}", i));

        for preset in soundfont.get_presets() {
            let bank = preset.get_bank_number();
            let program = preset.get_patch_number();

            if bank == 0 && (0..128).contains(&program) {
                names[program as usize] = preset.get_name().to_string();
            }
        }

        names
    }

    fn with_synth(&self, f: impl FnOnce(&mut Synthesizer)) {
        if let Ok(mut synth) = self.synth.lock() {
            f(&mut synth);
        }
    }
}

impl SoundEngine for AudioEngine {
    fn attack(&mut self, note: NoteId) {
        // A held note supersedes any pending timed release of the same key.
        self.timed_releases.retain(|r| r.note != note);
        let velocity = self.velocity as i32;
        self.with_synth(|synth| synth.note_on(CHANNEL, note.midi() as i32, velocity));
    }

    fn release(&mut self, note: NoteId) {
        self.with_synth(|synth| synth.note_off(CHANNEL, note.midi() as i32));
    }

    fn attack_release(&mut self, note: NoteId, duration: DurationToken) {
        self.attack(note);
        let length = Duration::from_secs_f64(duration.as_seconds(self.tempo));
        self.timed_releases.push(TimedRelease {
            at: Instant::now() + length,
            note,
        });
    }

    fn release_all(&mut self) {
        self.timed_releases.clear();
        self.with_synth(|synth| synth.note_off_all(false));
    }

    fn service(&mut self) {
        if self.timed_releases.is_empty() {
            return;
        }
        let now = Instant::now();
        let (due, waiting): (Vec<TimedRelease>, Vec<TimedRelease>) =
            self.timed_releases.drain(..).partition(|r| r.at <= now);
        self.timed_releases = waiting;
        for release in due {
            self.release(release.note);
        }
    }

    fn set_program(&mut self, program: u8) {
        let program = program.min(127) as i32;
        // Program change is MIDI command 0xC0 (192)
        self.with_synth(|synth| synth.process_midi_message(CHANNEL, 0xC0, program, 0));
    }

    fn instrument_name(&self, program: u8) -> String {
        self.instrument_names[program.min(127) as usize].clone()
    }
}
