//! Transport bar rendering.
//!
//! Shows the Record, Play and Stop buttons, the status text, elapsed time
//! and the current instrument.

use crate::app::App;
use crate::recorder::{Status, TransportState};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Screen areas of the transport buttons, for hit testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonAreas {
    pub record: Rect,
    pub play: Rect,
    /// Empty while Stop is hidden.
    pub stop: Rect,
}

/// Appends a button label to the row and returns its screen area.
fn push_button(
    spans: &mut Vec<Span<'static>>,
    x: &mut u16,
    row: Rect,
    label: &'static str,
    style: Style,
) -> Rect {
    let remaining = (row.x + row.width).saturating_sub(*x);
    let width = (label.chars().count() as u16).min(remaining);
    let area = Rect::new(*x, row.y, width, 1);
    spans.push(Span::styled(label, style));
    spans.push(Span::raw(" "));
    *x = x.saturating_add(width + 1);
    area
}

fn button_style(enabled: bool, color: Color) -> Style {
    if enabled {
        Style::default()
            .fg(Color::Black)
            .bg(color)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Idle => Color::Gray,
        Status::Recording => Color::Red,
        Status::Recorded => Color::Green,
        Status::Playing => Color::Cyan,
    }
}

/// Renders the transport bar at the top of the screen.
pub fn render_transport(frame: &mut Frame, area: Rect, app: &App) -> ButtonAreas {
    let block = Block::default()
        .title(" Transport ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return ButtonAreas::default();
    }

    let recorder = app.recorder();
    let controls = recorder.controls();
    let now = app.now_ms();

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut x = inner.x;
    let row = Rect::new(inner.x, inner.y, inner.width, 1);

    let record_label = if recorder.state() == TransportState::Recording {
        "[ Stop Rec ]"
    } else {
        "[ Record ]"
    };
    let record = push_button(
        &mut spans,
        &mut x,
        row,
        record_label,
        button_style(controls.record_enabled, Color::Red),
    );
    let play = push_button(
        &mut spans,
        &mut x,
        row,
        "[ Play ]",
        button_style(controls.play_enabled, Color::Green),
    );
    let stop = if controls.stop_visible {
        push_button(
            &mut spans,
            &mut x,
            row,
            "[ Stop ]",
            button_style(true, Color::Yellow),
        )
    } else {
        Rect::default()
    };

    let status = recorder.status();
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        status.label(),
        Style::default()
            .fg(status_color(status))
            .add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled(
        format!("  {:>6.2}s", recorder.elapsed_ms(now) as f64 / 1000.0),
        Style::default().fg(Color::White),
    ));
    spans.push(Span::styled("  Inst: ", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
        app.instrument_name(),
        Style::default().fg(Color::White),
    ));

    if let Some((msg, _)) = &app.status_message {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            msg.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), row);

    ButtonAreas { record, play, stop }
}
