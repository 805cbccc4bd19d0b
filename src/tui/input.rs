use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::shared::InputEvent;

// poll for input from the terminal and resolve keys to semantic input events
pub fn poll_input(timeout: Duration) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::PlayPress],

        // plain digits queue a slot switch to the next bar; shifted digits
        // (the symbol above the digit) switch immediately
        KeyCode::Char(c @ '1'..='8') => {
            vec![InputEvent::SelectSlot(c as usize - '1' as usize)]
        }
        KeyCode::Char(c) if shifted_digit(c).is_some() => match shifted_digit(c) {
            Some(slot) => vec![InputEvent::SwitchSlotNow(slot)],
            None => vec![],
        },

        // lowercase = forward, shifted = backward
        KeyCode::Char('s') => vec![InputEvent::NextStyle],
        KeyCode::Char('S') => vec![InputEvent::PrevStyle],

        // lowercase = plain skeleton, shifted = busier overlay
        KeyCode::Char('g') => vec![InputEvent::Generate],
        KeyCode::Char('G') => vec![InputEvent::GenerateBusy],

        KeyCode::Char('r') => vec![InputEvent::Reseed],
        KeyCode::Char('c') => vec![InputEvent::ClearPattern],

        // knobs
        KeyCode::Char('[') => vec![InputEvent::AdjustIntensity(-0.05)],
        KeyCode::Char(']') => vec![InputEvent::AdjustIntensity(0.05)],
        KeyCode::Char('-') => vec![InputEvent::AdjustTempo(-2.0)],
        KeyCode::Char('=') => vec![InputEvent::AdjustTempo(2.0)],

        KeyCode::Char('j') => vec![InputEvent::ToggleLiveJam],
        KeyCode::Char(',') => vec![InputEvent::AdjustJamIntensity(-0.05)],
        KeyCode::Char('.') => vec![InputEvent::AdjustJamIntensity(0.05)],

        _ => vec![],
    }
}

// US layout shift row: !@#$%^&* over 1-8
fn shifted_digit(c: char) -> Option<usize> {
    "!@#$%^&*".find(c)
}
