mod audio;
mod audio_api;
mod middle;
mod pattern;
mod persistence;
mod project;
mod sequencer;
mod shared;
mod style;
mod tui;
mod variation;

use std::path::PathBuf;

use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use middle::Middle;
use shared::InputEvent;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope

    let audio = audio::start_audio()?;

    let project_dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let project = persistence::load_project(&project_dir).unwrap_or_default();
    let mut middle = Middle::with_project(project);

    // push the restored state down to the engine before anything plays
    for cmd in middle.startup_commands() {
        audio.send(cmd);
    }

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps

    loop {
        if let Some(fb) = audio.poll_feedback() {
            middle.apply_feedback(fb);
        }

        let ds = middle.display_state();
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds);
        })?;

        let events = tui::input::poll_input(tick_rate)?;
        for event in events {
            if event == InputEvent::Quit {
                // save before quitting
                let _ = persistence::save_project(&project_dir, &middle.to_project());
                drop(term);
                drop(audio);
                return Ok(());
            }
            let cmds = middle.handle_input(event);
            for cmd in cmds {
                audio.send(cmd);
            }
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
