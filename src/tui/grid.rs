use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::shared::DisplayState;

const NAME_WIDTH: usize = 10;

// one row per track, two columns per step; the playback cursor inverts its
// column and every 4th step gets a brighter beat marker
pub fn draw_step_grid(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut lines = Vec::with_capacity(state.grid.len() + 1);
    lines.push(ruler(state));

    for (track_idx, row) in state.grid.iter().enumerate() {
        let name = state
            .track_names
            .get(track_idx)
            .map(String::as_str)
            .unwrap_or("");
        let mut spans = vec![Span::styled(
            format!("{name:>NAME_WIDTH$} "),
            Style::default().fg(Color::Gray),
        )];

        for (step_idx, cell) in row.iter().enumerate() {
            let on_cursor = state.current_step == Some(step_idx);
            let glyph = if cell.active {
                match cell.velocity {
                    v if v >= 0.66 => "██",
                    v if v >= 0.33 => "▓▓",
                    _ => "░░",
                }
            } else if step_idx % 4 == 0 {
                "··"
            } else {
                "  "
            };

            let mut style = if cell.active {
                // conditional hits render dimmer than certain ones
                if cell.probability < 1.0 {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default().fg(Color::LightMagenta)
                }
            } else {
                Style::default().fg(Color::DarkGray)
            };
            if on_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(glyph, style));
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn ruler(state: &DisplayState) -> Line<'static> {
    let steps = state.grid.first().map_or(0, Vec::len);
    let mut spans = vec![Span::raw(" ".repeat(NAME_WIDTH + 1))];
    for i in 0..steps {
        let label = if i % 4 == 0 {
            format!("{:<2}", i / 4 + 1)
        } else {
            "  ".to_string()
        };
        spans.push(Span::styled(label, Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}
