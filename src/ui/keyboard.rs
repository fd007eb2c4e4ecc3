//! Piano keyboard display.
//!
//! Draws the thirteen keys with their note names and computer keyboard
//! bindings, highlighting keys that are sounding live or in playback.

use crate::app::App;
use crate::piano::{self, NoteId};
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

/// Narrowest white key that still fits its labels.
const MIN_WHITE_WIDTH: u16 = 3;

/// Computes the key areas inside `inner`.
///
/// Black keys are listed first and cover the upper part of the boundary
/// between their neighbouring white keys.
pub fn key_areas(inner: Rect) -> Vec<(Rect, NoteId)> {
    let white_count = piano::piano_notes()
        .filter(|n| !piano::is_black(n.midi()))
        .count() as u16;
    if white_count == 0 || inner.height == 0 {
        return Vec::new();
    }
    let white_width = (inner.width / white_count).max(MIN_WHITE_WIDTH);
    let black_width = (white_width / 2).max(1) | 1;
    let black_height = (inner.height * 3 / 5).max(1);

    let mut whites = Vec::new();
    let mut blacks = Vec::new();
    let mut white_index: u16 = 0;

    for note in piano::piano_notes() {
        if piano::is_black(note.midi()) {
            // Centered on the boundary after the previous white key.
            let boundary = inner.x + white_index * white_width;
            let x = boundary.saturating_sub(black_width / 2 + 1);
            blacks.push((Rect::new(x, inner.y, black_width, black_height), note));
        } else {
            let x = inner.x + white_index * white_width;
            // One column gap between white keys.
            let width = white_width.saturating_sub(1).max(1);
            whites.push((Rect::new(x, inner.y, width, inner.height), note));
            white_index += 1;
        }
    }

    let right = inner.x + inner.width;
    blacks
        .into_iter()
        .chain(whites)
        .filter(|(rect, _)| rect.x + rect.width <= right)
        .collect()
}

fn key_style(active: bool, black: bool) -> Style {
    match (active, black) {
        (true, _) => Style::default()
            .fg(Color::White)
            .bg(Color::Blue)
            .add_modifier(Modifier::BOLD),
        (false, true) => Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
        (false, false) => Style::default()
            .fg(Color::Black)
            .bg(Color::White)
            .add_modifier(Modifier::BOLD),
    }
}

/// Labels a key: blank lines above, note name and bound key at the bottom.
fn key_lines(note: NoteId, height: u16) -> Vec<Line<'static>> {
    let binding = piano::key_for_note(note)
        .map(|k| k.to_ascii_uppercase().to_string())
        .unwrap_or_default();
    let name = note.to_string();
    let mut lines: Vec<Line<'static>> = Vec::new();
    for _ in 0..height.saturating_sub(2) {
        lines.push(Line::from(""));
    }
    if height >= 2 {
        lines.push(Line::from(name));
    }
    lines.push(Line::from(binding));
    lines
}

/// Renders the piano and returns the key areas for hit testing.
pub fn render_keyboard(frame: &mut Frame, area: Rect, app: &App) -> Vec<(Rect, NoteId)> {
    let block = Block::default()
        .title(" Piano ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let keys = key_areas(inner);
    let recorder = app.recorder();

    // White keys first so black keys are drawn on top.
    for (rect, note) in keys.iter().rev() {
        let black = piano::is_black(note.midi());
        let style = key_style(recorder.is_active(*note), black);
        if black {
            frame.render_widget(Clear, *rect);
        }
        frame.render_widget(
            Paragraph::new(key_lines(*note, rect.height))
                .style(style)
                .alignment(Alignment::Center),
            *rect,
        );
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_areas_cover_every_key() {
        let keys = key_areas(Rect::new(1, 1, 80, 7));
        assert_eq!(keys.len(), 13);
        // Black keys come first.
        assert!(keys[..5].iter().all(|(_, n)| piano::is_black(n.midi())));
        assert!(keys[5..].iter().all(|(_, n)| !piano::is_black(n.midi())));
    }

    #[test]
    fn test_black_keys_sit_between_whites() {
        let inner = Rect::new(0, 0, 80, 10);
        let keys = key_areas(inner);
        let area = |name: &str| {
            let note: NoteId = name.parse().unwrap();
            keys.iter().find(|(_, n)| *n == note).map(|(r, _)| *r).unwrap()
        };
        let c = area("C4");
        let c_sharp = area("C#4");
        let d = area("D4");
        assert!(c_sharp.x > c.x && c_sharp.x < d.x);
        assert!(c_sharp.height < c.height);
        assert_eq!(c.height, 10);
    }

    #[test]
    fn test_narrow_area_drops_keys_that_do_not_fit() {
        let keys = key_areas(Rect::new(0, 0, 12, 5));
        assert!(keys.len() < 13);
        assert!(keys.iter().all(|(r, _)| r.x + r.width <= 12));
        assert!(key_areas(Rect::new(0, 0, 80, 0)).is_empty());
    }
}
