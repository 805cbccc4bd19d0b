// Constants and the types shared between the tui, the middle layer, and the
// audio side. The tui only ever renders a DisplayState snapshot; all of the
// actual state lives in middle.rs and on the audio thread.

use crate::style::Style;

pub const NUM_SLOTS: usize = 8;
pub const NUM_TRACKS: usize = 12;
pub const DEFAULT_STEPS: usize = 16;

pub const MIN_TEMPO: f64 = 40.0;
pub const MAX_TEMPO: f64 = 260.0;
pub const DEFAULT_TEMPO: f64 = 120.0;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // transport
    PlayPress,
    AdjustTempo(f64),

    // slot bank: plain number keys queue to the next bar while playing,
    // shifted ones switch immediately
    SelectSlot(usize),
    SwitchSlotNow(usize),

    // active slot controls
    NextStyle,
    PrevStyle,
    Generate,     // complexity 0.5 (skeleton only)
    GenerateBusy, // complexity 0.8 (skeleton + complexity overlay)
    Reseed,
    ClearPattern,

    // intensity + live jam
    AdjustIntensity(f32),
    ToggleLiveJam,
    AdjustJamIntensity(f32),

    Quit,
}

/// What one grid cell looks like after the intensity pipeline ran.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridCell {
    pub active: bool,
    pub velocity: f32,
    pub probability: f32,
}

/// Everything the tui needs to draw one frame. Built fresh by the middle
/// layer every tick; the cursor arrives by value from the audio feedback
/// channel, so nothing here aliases real-time state.
#[derive(Clone, Debug)]
pub struct DisplayState {
    pub grid: Vec<Vec<GridCell>>, // NUM_TRACKS rows, pattern-length columns
    pub track_names: Vec<String>,
    pub current_step: Option<usize>,
    pub active_slot: usize,
    pub queued_slot: Option<usize>,
    pub slot_filled: [bool; NUM_SLOTS],
    pub pattern_name: String,
    pub style: Style,
    pub swing: f32,
    pub intensity: f32,
    pub live_jam_enabled: bool,
    pub live_jam_intensity: f32,
    pub tempo: f64,
    pub playing: bool,
}
