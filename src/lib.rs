//! pianola - A terminal piano with a one-take recorder.
//!
//! Play notes from the computer keyboard or the mouse, record a take, and
//! play it back through a SoundFont synthesizer.

pub mod app;
pub mod audio;
pub mod config;
pub mod input;
pub mod piano;
pub mod recorder;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use audio::{AudioEngine, SilentEngine, SoundEngine};
pub use config::Config;
pub use piano::{DurationToken, NoteId};
pub use recorder::{NoteEvent, Recorder, TransportState};
