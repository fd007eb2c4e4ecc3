//! Terminal user interface components.
//!
//! The screen has four parts: the transport bar, the take view, the piano,
//! and a footer with contextual key hints.

mod help;
mod keyboard;
mod take;
mod transport;

use crate::app::{App, LayoutRegions};
use crate::recorder::TransportState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

pub use help::render_help;
pub use keyboard::{key_areas, render_keyboard};
pub use take::render_take;
pub use transport::{render_transport, ButtonAreas};

/// Renders the complete UI and updates the layout regions used for mouse hit testing.
pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport
            Constraint::Min(3),    // Take
            Constraint::Length(9), // Piano
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    let buttons = render_transport(frame, chunks[0], app);
    render_take(frame, chunks[1], app);
    let keys = render_keyboard(frame, chunks[2], app);
    frame.render_widget(Paragraph::new(build_contextual_help(app)), chunks[3]);

    app.layout = LayoutRegions {
        record_button: buttons.record,
        play_button: buttons.play,
        stop_button: buttons.stop,
        keys,
    };

    if app.show_help {
        render_help(frame, app.keyboard().reports_releases());
    }
}

/// Builds the footer hints for the current transport state.
fn build_contextual_help(app: &App) -> Line<'static> {
    let key_style = Style::default().fg(Color::Yellow);
    let bracket_style = Style::default().fg(Color::DarkGray);
    let desc_style = Style::default().fg(Color::DarkGray);

    let hints: &[(&str, &str)] = match app.recorder().state() {
        TransportState::Idle if app.recorder().controls().play_enabled => &[
            ("r", "Record "),
            ("p", "Play "),
            ("[]", "Instrument "),
            ("?", "Help "),
            ("q", "Quit"),
        ],
        TransportState::Idle => &[
            ("r", "Record "),
            ("[]", "Instrument "),
            ("?", "Help "),
            ("q", "Quit"),
        ],
        TransportState::Recording => &[("r", "Finish recording "), ("?", "Help ")],
        TransportState::Playing => &[("x", "Stop "), ("Space", "Stop "), ("?", "Help ")],
    };

    let mut spans = Vec::with_capacity(hints.len() * 3);
    for (key, desc) in hints {
        spans.push(Span::styled("[", bracket_style));
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(format!("]{}", desc), desc_style));
    }
    Line::from(spans)
}

/// Helper function to center a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentEngine;
    use crate::config::Config;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_updates_layout() {
        let mut app = App::new(&Config::default(), Box::new(SilentEngine), true);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        assert_eq!(app.layout.keys.len(), 13);
        assert!(app.layout.record_button.width > 0);
        assert!(app.layout.play_button.width > 0);
        assert_eq!(app.layout.stop_button, Rect::default());

        let text = buffer_text(&terminal);
        assert!(text.contains("Record"));
        assert!(text.contains("Idle"));
        assert!(text.contains("C#4"));
    }

    #[test]
    fn test_stop_button_shown_during_playback() {
        let mut app = App::new(&Config::default(), Box::new(SilentEngine), true);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        app.toggle_record(0);
        app.apply(
            crate::input::PianoInput::NoteOn {
                note: "C4".parse().unwrap(),
                repeat_suppressed: false,
            },
            0,
        );
        app.toggle_record(10);
        app.play(app.now_ms());

        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        assert!(app.layout.stop_button.width > 0);
        let text = buffer_text(&terminal);
        assert!(text.contains("Playing..."));
        assert!(text.contains("Take (1 notes"));
    }

    #[test]
    fn test_help_overlay_renders() {
        let mut app = App::new(&Config::default(), Box::new(SilentEngine), false);
        app.show_help = true;
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();

        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Transport"));
        assert!(text.contains("does not report key releases"));
    }
}
