//! Application state and event handling.
//!
//! [`App`] owns the recorder, the sound engine and both input surfaces,
//! and routes terminal events between them. Time is passed in as logical
//! milliseconds since startup; the main loop reads it from [`App::now_ms`].

use crate::audio::SoundEngine;
use crate::config::Config;
use crate::input::{KeyboardSurface, PianoInput, PointerSurface};
use crate::piano::{self, NoteId};
use crate::recorder::{Millis, Recorder, Rejected, TransportAction};
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tracing::debug;

/// How long a status message stays visible.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Screen regions for mouse hit testing, updated on every render.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegions {
    pub record_button: Rect,
    pub play_button: Rect,
    /// Empty while the Stop button is hidden.
    pub stop_button: Rect,
    /// Hit areas of the piano keys. Black keys come first because they
    /// are drawn over the white keys.
    pub keys: Vec<(Rect, NoteId)>,
}

impl LayoutRegions {
    /// Checks if a point is within a rectangle.
    fn contains(rect: Rect, x: u16, y: u16) -> bool {
        x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
    }

    /// The piano key under the given screen coordinates.
    pub fn key_at(&self, x: u16, y: u16) -> Option<NoteId> {
        self.keys
            .iter()
            .find(|(rect, _)| Self::contains(*rect, x, y))
            .map(|(_, note)| *note)
    }

    /// The transport button under the given screen coordinates.
    pub fn button_at(&self, x: u16, y: u16) -> Option<TransportAction> {
        if Self::contains(self.record_button, x, y) {
            Some(TransportAction::Record)
        } else if Self::contains(self.play_button, x, y) {
            Some(TransportAction::Play)
        } else if Self::contains(self.stop_button, x, y) {
            Some(TransportAction::Stop)
        } else {
            None
        }
    }
}

/// Main application state.
pub struct App {
    recorder: Recorder,
    engine: Box<dyn SoundEngine>,
    keyboard: KeyboardSurface,
    pointer: PointerSurface,
    /// Start of the logical clock.
    epoch: Instant,
    /// Currently selected General MIDI program.
    pub program: u8,
    /// Status message to display temporarily.
    pub status_message: Option<(String, Instant)>,
    pub show_help: bool,
    pub layout: LayoutRegions,
    pub should_quit: bool,
}

impl App {
    /// Creates the application around an already constructed sound engine.
    ///
    /// `reports_releases` tells whether the terminal delivers key release events.
    pub fn new(config: &Config, mut engine: Box<dyn SoundEngine>, reports_releases: bool) -> Self {
        engine.set_program(config.program);
        Self {
            recorder: Recorder::new(config.recorder),
            engine,
            keyboard: KeyboardSurface::new(reports_releases, config.input.key_release_ms),
            pointer: PointerSurface::new(),
            epoch: Instant::now(),
            program: config.program,
            status_message: None,
            show_help: false,
            layout: LayoutRegions::default(),
            should_quit: false,
        }
    }

    /// Milliseconds since the application started.
    pub fn now_ms(&self) -> Millis {
        self.epoch.elapsed().as_millis() as Millis
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn keyboard(&self) -> &KeyboardSurface {
        &self.keyboard
    }

    pub fn instrument_name(&self) -> String {
        self.engine.instrument_name(self.program)
    }

    /// Sets a status message to display temporarily.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    /// Per-frame upkeep: synthesized key releases, due playback cues, engine timers.
    pub fn update(&mut self, now: Millis) {
        for input in self.keyboard.expire(now) {
            self.apply(input, now);
        }
        self.recorder.tick(now, self.engine.as_mut());
        self.engine.service();
        self.clear_expired_status();
    }

    /// Feeds one input event to the recorder.
    pub fn apply(&mut self, input: PianoInput, now: Millis) {
        let result = match input {
            PianoInput::NoteOn {
                note,
                repeat_suppressed,
            } => self
                .recorder
                .note_on(note, repeat_suppressed, now, self.engine.as_mut())
                .map(|_| ()),
            PianoInput::NoteOff(note) => self.recorder.note_off(note, self.engine.as_mut()),
            PianoInput::ReleaseAll => {
                self.release_all_notes();
                Ok(())
            }
        };
        Self::ignore(result);
    }

    // ==================== Transport ====================

    pub fn toggle_record(&mut self, now: Millis) {
        Self::ignore(self.recorder.toggle_record(now));
    }

    pub fn play(&mut self, now: Millis) {
        Self::ignore(self.recorder.play(now));
    }

    pub fn stop(&mut self) {
        Self::ignore(self.recorder.stop(self.engine.as_mut()));
    }

    /// Stops during playback, plays otherwise.
    pub fn play_or_stop(&mut self, now: Millis) {
        if self.recorder.controls().stop_visible {
            self.stop();
        } else {
            self.play(now);
        }
    }

    /// Handles a click on a transport button. Disabled buttons do nothing.
    pub fn press_button(&mut self, action: TransportAction, now: Millis) {
        let controls = self.recorder.controls();
        match action {
            TransportAction::Record if controls.record_enabled => self.toggle_record(now),
            TransportAction::Play if controls.play_enabled => self.play(now),
            TransportAction::Stop if controls.stop_visible => self.stop(),
            _ => debug!(%action, "button disabled"),
        }
    }

    /// Selects the next or previous instrument, wrapping at the ends.
    pub fn cycle_instrument(&mut self, delta: i8) {
        self.program = (self.program as i16 + delta as i16).rem_euclid(128) as u8;
        self.engine.set_program(self.program);
        let name = self.instrument_name();
        self.set_status(format!("Instrument: {}", name));
    }

    fn ignore(result: Result<(), Rejected>) {
        if let Err(rejected) = result {
            debug!(%rejected, "request ignored");
        }
    }

    // ==================== Terminal events ====================

    /// Handles a key event of any kind (press, repeat or release).
    pub fn handle_key(&mut self, key: KeyEvent, now: Millis) {
        let pressed = key.kind == KeyEventKind::Press;

        if pressed
            && key.modifiers.contains(KeyModifiers::CONTROL)
            && key.code == KeyCode::Char('c')
        {
            self.should_quit = true;
            return;
        }

        if self.show_help {
            if pressed && matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q'))
            {
                self.show_help = false;
            }
            // Keys held when the overlay opened must still be let go.
            if let KeyCode::Char(c) = key.code {
                let held = piano::note_for_key(c).is_some_and(|note| self.keyboard.is_held(note));
                if key.kind == KeyEventKind::Release && held {
                    if let Some(input) = self.keyboard.key_event(c, key.kind, now) {
                        self.apply(input, now);
                    }
                }
            }
            return;
        }

        if let KeyCode::Char(c) = key.code {
            if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                && piano::note_for_key(c).is_some()
            {
                if let Some(input) = self.keyboard.key_event(c, key.kind, now) {
                    self.apply(input, now);
                }
                return;
            }
        }

        if !pressed {
            return;
        }

        match key.code {
            KeyCode::Char('r') | KeyCode::Char('R') => self.toggle_record(now),
            KeyCode::Char('p') | KeyCode::Char('P') => self.play(now),
            KeyCode::Char('x') | KeyCode::Char('X') => self.stop(),
            KeyCode::Char(' ') => self.play_or_stop(now),
            KeyCode::Char('[') => self.cycle_instrument(-1),
            KeyCode::Char(']') => self.cycle_instrument(1),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    /// Handles a mouse event: transport buttons and piano keys.
    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Millis) {
        let (x, y) = (mouse.column, mouse.row);
        let inputs = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.show_help {
                    self.show_help = false;
                    return;
                }
                if let Some(action) = self.layout.button_at(x, y) {
                    self.press_button(action, now);
                    return;
                }
                let target = self.layout.key_at(x, y);
                self.pointer.press(target)
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let target = self.layout.key_at(x, y);
                self.pointer.drag(target)
            }
            MouseEventKind::Up(MouseButton::Left) => self.pointer.release(),
            _ => Vec::new(),
        };
        for input in inputs {
            self.apply(input, now);
        }
    }

    /// Silences everything and forgets held computer keys, e.g. on pointer
    /// release, focus loss or shutdown.
    pub fn release_all_notes(&mut self) {
        self.keyboard.clear();
        self.recorder.release_all_live(self.engine.as_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::MockEngine;
    use crate::recorder::{Status, TransportState};

    fn new_app(reports_releases: bool) -> App {
        App::new(
            &Config::default(),
            Box::new(MockEngine::new()),
            reports_releases,
        )
    }

    fn press(c: char) -> KeyEvent {
        KeyEvent::new_with_kind(KeyCode::Char(c), KeyModifiers::NONE, KeyEventKind::Press)
    }

    fn release(c: char) -> KeyEvent {
        KeyEvent::new_with_kind(KeyCode::Char(c), KeyModifiers::NONE, KeyEventKind::Release)
    }

    fn repeat(c: char) -> KeyEvent {
        KeyEvent::new_with_kind(KeyCode::Char(c), KeyModifiers::NONE, KeyEventKind::Repeat)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn n(name: &str) -> NoteId {
        name.parse().unwrap()
    }

    /// Two buttons on row 0 and two keys on row 5.
    fn test_layout() -> LayoutRegions {
        LayoutRegions {
            record_button: Rect::new(0, 0, 10, 1),
            play_button: Rect::new(12, 0, 8, 1),
            stop_button: Rect::default(),
            keys: vec![(Rect::new(0, 5, 4, 3), n("C4")), (Rect::new(4, 5, 4, 3), n("D4"))],
        }
    }

    #[test]
    fn test_keyboard_take_and_playback() {
        let mut app = new_app(true);

        app.handle_key(press('r'), 0);
        assert_eq!(app.recorder().state(), TransportState::Recording);

        app.handle_key(press('a'), 0);
        app.handle_key(release('a'), 100);
        app.handle_key(press('s'), 300);
        app.handle_key(release('s'), 350);
        app.handle_key(press('r'), 400);

        let offsets: Vec<_> = app
            .recorder()
            .session()
            .iter()
            .map(|e| (e.note, e.offset_ms))
            .collect();
        assert_eq!(offsets, vec![(n("C4"), 0), (n("D4"), 300)]);
        assert_eq!(app.recorder().status(), Status::Recorded);

        app.handle_key(press(' '), 1_000);
        assert_eq!(app.recorder().state(), TransportState::Playing);
        app.update(1_000);
        assert!(app.recorder().is_active(n("C4")));

        app.update(1_800);
        assert_eq!(app.recorder().state(), TransportState::Idle);
        assert!(app.recorder().controls().play_enabled);
    }

    #[test]
    fn test_space_stops_playback() {
        let mut app = new_app(true);
        app.handle_key(press('r'), 0);
        app.handle_key(press('a'), 0);
        app.handle_key(press('s'), 300);
        app.handle_key(press('r'), 400);

        app.handle_key(press('p'), 1_000);
        app.update(1_150);
        app.handle_key(press(' '), 1_150);

        assert_eq!(app.recorder().state(), TransportState::Idle);
        assert_eq!(app.recorder().pending_len(), 0);
    }

    #[test]
    fn test_repeat_events_are_not_captured() {
        let mut app = new_app(true);
        app.handle_key(press('r'), 0);
        app.handle_key(press('h'), 10);
        for at in [500, 530, 560] {
            app.handle_key(repeat('h'), at);
        }
        app.handle_key(release('h'), 600);
        app.handle_key(press('r'), 700);

        assert_eq!(app.recorder().session().len(), 1);
    }

    #[test]
    fn test_held_key_without_release_events() {
        let mut app = new_app(false);
        app.handle_key(press('r'), 0);
        app.handle_key(press('h'), 10);
        // Autorepeat shows up as presses on such terminals.
        for at in [510, 540, 570] {
            app.handle_key(press('h'), at);
            app.update(at);
        }
        assert!(app.recorder().is_active(n("A4")));

        app.update(1_170);
        assert!(!app.recorder().is_active(n("A4")));
        app.handle_key(press('r'), 1_200);

        assert_eq!(app.recorder().session().len(), 1);
    }

    #[test]
    fn test_mouse_buttons_and_keys() {
        let mut app = new_app(true);
        app.layout = test_layout();

        // Play is disabled with no take.
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 13, 0), 0);
        assert_eq!(app.recorder().state(), TransportState::Idle);

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 2, 0), 0);
        assert_eq!(app.recorder().state(), TransportState::Recording);

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 1, 6), 50);
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 5, 6), 120);
        assert!(!app.recorder().is_active(n("C4")));
        assert!(app.recorder().is_active(n("D4")));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 5, 6), 200);
        assert!(!app.recorder().is_active(n("D4")));

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 2, 0), 300);
        let offsets: Vec<_> = app
            .recorder()
            .session()
            .iter()
            .map(|e| e.offset_ms)
            .collect();
        assert_eq!(offsets, vec![50, 120]);

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 13, 0), 400);
        assert_eq!(app.recorder().state(), TransportState::Playing);
    }

    #[test]
    fn test_button_click_during_playback_keeps_playing() {
        let mut app = new_app(true);
        app.layout = test_layout();
        app.handle_key(press('r'), 0);
        app.handle_key(press('a'), 0);
        app.handle_key(release('a'), 50);
        app.handle_key(press('r'), 100);

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 13, 0), 1_000);
        app.update(1_000);
        // Releasing the mouse over the button is not a piano release.
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 13, 0), 1_010);
        assert!(app.recorder().is_active(n("C4")));

        // Record is disabled while playing.
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 2, 0), 1_020);
        assert_eq!(app.recorder().state(), TransportState::Playing);
    }

    #[test]
    fn test_help_overlay_swallows_keys() {
        let mut app = new_app(true);
        app.handle_key(press('?'), 0);
        assert!(app.show_help);

        app.handle_key(press('r'), 10);
        app.handle_key(press('a'), 10);
        assert_eq!(app.recorder().state(), TransportState::Idle);
        assert!(!app.recorder().is_active(n("C4")));

        app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE), 20);
        assert!(!app.show_help);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_key_released_under_help_overlay() {
        let mut app = new_app(true);
        app.handle_key(press('a'), 0);
        assert!(app.recorder().is_active(n("C4")));

        app.handle_key(press('?'), 10);
        app.handle_key(release('a'), 20);
        // Presses are still swallowed while the overlay is open.
        app.handle_key(press('s'), 25);
        app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE), 30);

        assert!(!app.show_help);
        assert!(!app.recorder().is_active(n("C4")));
        assert!(!app.keyboard().is_held(n("C4")));
        assert!(!app.recorder().is_active(n("D4")));

        // The next press strikes the key again.
        app.handle_key(press('r'), 40);
        app.handle_key(press('a'), 50);
        assert!(app.recorder().is_active(n("C4")));
        assert_eq!(app.recorder().session().len(), 1);
    }

    #[test]
    fn test_pointer_release_forgets_held_keys() {
        let mut app = new_app(false);
        app.layout = test_layout();
        app.handle_key(press('r'), 0);
        app.handle_key(press('h'), 10);
        assert!(app.keyboard().is_held(n("A4")));

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 1, 6), 100);
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 1, 6), 150);

        assert!(!app.keyboard().is_held(n("A4")));
        assert!(!app.recorder().is_active(n("A4")));
        assert!(!app.recorder().is_active(n("C4")));
        app.update(1_000);
        assert_eq!(app.recorder().session().len(), 2);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = new_app(true);
        app.handle_key(
            KeyEvent::new_with_kind(KeyCode::Char('c'), KeyModifiers::CONTROL, KeyEventKind::Press),
            0,
        );
        assert!(app.should_quit);

        let mut app = new_app(true);
        app.handle_key(press('q'), 0);
        assert!(app.should_quit);
    }

    #[test]
    fn test_cycle_instrument_wraps() {
        let mut app = new_app(true);
        app.cycle_instrument(-1);
        assert_eq!(app.program, 127);
        app.cycle_instrument(1);
        assert_eq!(app.program, 0);
        assert!(app.status_message.is_some());
    }

    #[test]
    fn test_layout_hit_testing() {
        let layout = test_layout();
        assert_eq!(layout.key_at(0, 5), Some(n("C4")));
        assert_eq!(layout.key_at(7, 7), Some(n("D4")));
        assert_eq!(layout.key_at(8, 5), None);
        assert_eq!(layout.button_at(9, 0), Some(TransportAction::Record));
        assert_eq!(layout.button_at(11, 0), None);
        // A hidden Stop button has no area.
        assert_eq!(layout.button_at(0, 1), None);
    }
}
