//! Take view: the notes captured in the current recording.

use crate::app::App;
use crate::recorder::TransportState;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub fn render_take(frame: &mut Frame, area: Rect, app: &App) {
    let recorder = app.recorder();
    let session = recorder.session();
    let length_secs = session.last().map_or(0.0, |e| e.offset_ms as f64 / 1000.0);

    let block = Block::default()
        .title(format!(
            " Take ({} notes, {:.2}s) ",
            session.len(),
            length_secs
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if session.is_empty() {
        let hint = match recorder.state() {
            TransportState::Recording => "Recording: play some keys.",
            _ => "No take yet. Press r (or click Record) to start recording.",
        };
        frame.render_widget(
            Paragraph::new(Span::styled(
                hint,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )),
            inner,
        );
        return;
    }

    // Keep the newest events in view while recording; during playback
    // follow the playhead.
    let played_until = match recorder.state() {
        TransportState::Playing => Some(recorder.elapsed_ms(app.now_ms())),
        _ => None,
    };
    let focus = match played_until {
        Some(at) => session.iter().filter(|e| e.offset_ms <= at).count(),
        None => session.len(),
    };
    let visible = inner.height as usize;
    let start = focus.saturating_sub(visible);

    let lines: Vec<Line> = session
        .iter()
        .enumerate()
        .skip(start)
        .take(visible)
        .map(|(i, event)| {
            let played = played_until.is_some_and(|at| event.offset_ms <= at);
            let note_style = if played {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::styled(format!("{:>4}  ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{:<4}", event.note.to_string()), note_style),
                Span::styled(
                    format!("  +{:>7.3}s  ", event.offset_ms as f64 / 1000.0),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(event.duration.label(), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}
