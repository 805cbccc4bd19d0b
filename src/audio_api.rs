use crate::pattern::Pattern;
use crate::style::Style;

/// Everything the control layer may ask of the audio thread. Commands are
/// drained with try_recv at the top of each callback; anything that needs a
/// whole pattern carries it by value so the audio side never touches shared
/// state.
#[derive(Clone, Debug)]
pub enum AudioCommand {
    // slot bank
    LoadPattern { slot: usize, pattern: Pattern },
    SwitchSlot { slot: usize, immediate: bool },
    ClearSlot(usize),

    // per-slot variation parameters
    SetSlotStyle { slot: usize, style: Style },
    SetSlotSeed { slot: usize, seed: u32 },

    // global parameters
    SetIntensity(f32),
    SetLiveJamEnabled(bool),
    SetLiveJamIntensity(f32),

    // transport
    SetTempo(f64),
    SetPlaying(bool),
}

/// Snapshot the engine pushes back once per block. The cursor travels by
/// value; the tui never reads audio-thread state directly.
#[derive(Clone, Copy, Debug)]
pub struct EngineFeedback {
    pub active_slot: usize,
    pub queued_slot: Option<usize>,
    pub current_step: Option<usize>,
    pub playing: bool,
}
