use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::grid;
use crate::shared::{DisplayState, NUM_SLOTS};

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // status bar
            Constraint::Length(3),  // slot bank
            Constraint::Min(14),    // step grid
            Constraint::Length(2),  // key help
        ])
        .split(area);

    draw_status(frame, sections[0], state);
    draw_slots(frame, sections[1], state);
    grid::draw_step_grid(frame, sections[2], state);
    draw_help(frame, sections[3]);
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let transport = if state.playing { "▶" } else { "■" };
    let jam = if state.live_jam_enabled {
        format!("jam {:>3.0}%", state.live_jam_intensity * 100.0)
    } else {
        "jam off".to_string()
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {transport} "),
            Style::default().fg(Color::LightMagenta),
        ),
        Span::raw(format!("{:>5.0} bpm  ", state.tempo)),
        Span::styled(
            format!("{}  ", state.pattern_name),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("[{}]  ", state.style.name())),
        Span::raw(format!("intensity {:>3.0}%  ", state.intensity * 100.0)),
        Span::raw(format!("swing {:>3.0}%  ", state.swing * 100.0)),
        Span::styled(
            jam,
            if state.live_jam_enabled {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::DarkGray)
            },
        ),
    ]);
    let block = Block::default().borders(Borders::ALL).title("beatsmith");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_slots(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut spans = vec![Span::raw(" ")];
    for slot in 0..NUM_SLOTS {
        let label = format!(" {} ", slot + 1);
        let style = if slot == state.active_slot {
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD)
        } else if state.queued_slot == Some(slot) {
            // queued switch blinks in at the next bar
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if state.slot_filled[slot] {
            Style::default().fg(Color::Gray)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }
    let block = Block::default().borders(Borders::ALL).title("slots");
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Line::from(Span::styled(
        " space play  1-8 queue slot (shift: now)  s/S style  g/G generate  r reseed  \
         c clear  [/] intensity  -/= tempo  j jam  ,/. jam amt  esc quit",
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(help), area);
}
