//! Help overlay rendering.
//!
//! Displays keyboard shortcuts and mouse controls in a modal overlay.

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;

/// Key binding entry for the help display.
struct KeyBinding {
    key: &'static str,
    description: &'static str,
}

const PIANO_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "a s d f g h j k",
        description: "White keys C4 to C5",
    },
    KeyBinding {
        key: "w e t y u",
        description: "Black keys C#4 to A#4",
    },
    KeyBinding {
        key: "[ / ]",
        description: "Previous / next instrument",
    },
];

const TRANSPORT_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "r",
        description: "Start / finish recording (replaces the take)",
    },
    KeyBinding {
        key: "p",
        description: "Play the take",
    },
    KeyBinding {
        key: "x",
        description: "Stop playback",
    },
    KeyBinding {
        key: "Space",
        description: "Play / stop",
    },
];

const GENERAL_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "?",
        description: "Toggle this help",
    },
    KeyBinding {
        key: "q / Esc",
        description: "Quit",
    },
    KeyBinding {
        key: "Ctrl+C",
        description: "Force quit",
    },
];

const MOUSE_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Click key",
        description: "Play a note",
    },
    KeyBinding {
        key: "Drag",
        description: "Slide across keys",
    },
    KeyBinding {
        key: "Click button",
        description: "Record / Play / Stop",
    },
];

fn add_section(lines: &mut Vec<Line<'static>>, title: &'static str, bindings: &[KeyBinding]) {
    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(Color::White);

    lines.push(Line::from(Span::styled(title, section_style)));
    for binding in bindings {
        lines.push(Line::from(vec![
            Span::styled(format!("{:18}", binding.key), key_style),
            Span::styled(binding.description, desc_style),
        ]));
    }
    lines.push(Line::from(""));
}

/// Renders the help overlay.
///
/// `reports_releases` adds a note about terminals that cannot report key
/// releases, where held keys are released after a short quiet period.
pub fn render_help(frame: &mut Frame, reports_releases: bool) {
    let area = centered_rect(60, 80, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let mut lines: Vec<Line<'static>> = Vec::new();
    add_section(&mut lines, "Piano", PIANO_BINDINGS);
    add_section(&mut lines, "Transport", TRANSPORT_BINDINGS);
    add_section(&mut lines, "Mouse", MOUSE_BINDINGS);
    add_section(&mut lines, "General", GENERAL_BINDINGS);

    if !reports_releases {
        lines.push(Line::from(Span::styled(
            "This terminal does not report key releases: held keys",
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(Span::styled(
            "are released shortly after their last press.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    frame.render_widget(Paragraph::new(lines), chunks[0]);

    let footer = Paragraph::new(Line::from(Span::styled(
        "Close: ?/Esc/Click",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));
    frame.render_widget(footer, chunks[1]);
}
