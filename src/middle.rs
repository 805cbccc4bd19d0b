// Non-real-time owner of the project state. Keeps a mirror of every slot's
// base pattern, style and seed, translates input events into audio commands,
// and rebuilds the DisplayState each frame by running the same intensity
// pipeline the audio thread runs. The mirror never aliases audio-thread
// state; commits of queued slot switches arrive through the feedback channel.

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::audio_api::{AudioCommand, EngineFeedback};
use crate::pattern::Pattern;
use crate::project::{ProjectFile, SlotFile};
use crate::shared::{
    DEFAULT_STEPS, DisplayState, GridCell, InputEvent, MAX_TEMPO, MIN_TEMPO, NUM_SLOTS, NUM_TRACKS,
};
use crate::style::{self, Style};
use crate::variation::apply_intensity;

pub struct Middle {
    slots: Vec<Option<Pattern>>,
    styles: [Style; NUM_SLOTS],
    seeds: [u32; NUM_SLOTS],
    active_slot: usize,
    queued_slot: Option<usize>,

    intensity: f32,
    live_jam_enabled: bool,
    live_jam_intensity: f32,

    tempo: f64,
    playing: bool,
    current_step: Option<usize>,

    seed_rng: SmallRng,
}

impl Middle {
    /// Restore from a saved project, or start fresh with slot 0 holding the
    /// default rock pattern.
    pub fn with_project(project: ProjectFile) -> Self {
        let mut seed_rng = SmallRng::from_entropy();
        let mut slots: Vec<Option<Pattern>> = (0..NUM_SLOTS).map(|_| None).collect();
        let mut styles = [Style::Rock; NUM_SLOTS];
        let mut seeds = [0u32; NUM_SLOTS];
        for seed in &mut seeds {
            *seed = seed_rng.next_u32();
        }

        for (i, slot) in project.slots.iter().take(NUM_SLOTS).enumerate() {
            if let Some(file) = slot {
                slots[i] = Some(file.to_pattern());
                styles[i] = file.style();
                seeds[i] = file.seed;
            }
        }

        if slots.iter().all(Option::is_none) {
            let mut p = Pattern::new("Rock Basic");
            style::generate_base(&mut p, Style::Rock);
            style::apply_complexity(&mut p, Style::Rock, 0.5);
            slots[0] = Some(p);
        }

        Self {
            slots,
            styles,
            seeds,
            active_slot: project.active_slot.min(NUM_SLOTS - 1),
            queued_slot: None,
            intensity: project.intensity.clamp(0.0, 1.0),
            live_jam_enabled: project.live_jam_enabled,
            live_jam_intensity: project.live_jam_intensity.clamp(0.0, 1.0),
            tempo: project.tempo.clamp(MIN_TEMPO, MAX_TEMPO),
            playing: false,
            current_step: None,
            seed_rng,
        }
    }

    /// Full sync of the engine after startup; the engine's own defaults are
    /// thrown away so the mirror is the single source of truth.
    pub fn startup_commands(&self) -> Vec<AudioCommand> {
        let mut cmds = Vec::new();
        for slot in 0..NUM_SLOTS {
            if let Some(p) = &self.slots[slot] {
                cmds.push(AudioCommand::LoadPattern {
                    slot,
                    pattern: p.clone(),
                });
            } else {
                cmds.push(AudioCommand::ClearSlot(slot));
            }
            cmds.push(AudioCommand::SetSlotStyle {
                slot,
                style: self.styles[slot],
            });
            cmds.push(AudioCommand::SetSlotSeed {
                slot,
                seed: self.seeds[slot],
            });
        }
        cmds.push(AudioCommand::SwitchSlot {
            slot: self.active_slot,
            immediate: true,
        });
        cmds.push(AudioCommand::SetIntensity(self.intensity));
        cmds.push(AudioCommand::SetLiveJamEnabled(self.live_jam_enabled));
        cmds.push(AudioCommand::SetLiveJamIntensity(self.live_jam_intensity));
        cmds.push(AudioCommand::SetTempo(self.tempo));
        cmds
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<AudioCommand> {
        match event {
            InputEvent::PlayPress => {
                self.playing = !self.playing;
                if !self.playing {
                    self.current_step = None;
                    self.queued_slot = None;
                }
                vec![AudioCommand::SetPlaying(self.playing)]
            }
            InputEvent::AdjustTempo(delta) => {
                self.tempo = (self.tempo + delta).clamp(MIN_TEMPO, MAX_TEMPO);
                vec![AudioCommand::SetTempo(self.tempo)]
            }

            InputEvent::SelectSlot(slot) => {
                if slot >= NUM_SLOTS {
                    return Vec::new();
                }
                if slot == self.active_slot {
                    self.queued_slot = None;
                    // the engine drops its own queued switch on a
                    // same-slot select; the cancel has to reach it too
                    return vec![AudioCommand::SwitchSlot {
                        slot,
                        immediate: false,
                    }];
                }
                if self.playing {
                    // commit arrives via feedback at the next bar line
                    self.queued_slot = Some(slot);
                } else {
                    self.active_slot = slot;
                }
                vec![AudioCommand::SwitchSlot {
                    slot,
                    immediate: false,
                }]
            }
            InputEvent::SwitchSlotNow(slot) => {
                if slot >= NUM_SLOTS {
                    return Vec::new();
                }
                self.active_slot = slot;
                self.queued_slot = None;
                vec![AudioCommand::SwitchSlot {
                    slot,
                    immediate: true,
                }]
            }

            InputEvent::NextStyle => self.set_style(self.styles[self.active_slot].next()),
            InputEvent::PrevStyle => self.set_style(self.styles[self.active_slot].prev()),

            InputEvent::Generate => self.generate(0.5),
            InputEvent::GenerateBusy => self.generate(0.8),

            InputEvent::Reseed => {
                let seed = self.seed_rng.next_u32();
                self.seeds[self.active_slot] = seed;
                vec![AudioCommand::SetSlotSeed {
                    slot: self.active_slot,
                    seed,
                }]
            }
            InputEvent::ClearPattern => {
                if let Some(p) = self.slots[self.active_slot].as_mut() {
                    p.clear();
                }
                vec![AudioCommand::ClearSlot(self.active_slot)]
            }

            InputEvent::AdjustIntensity(delta) => {
                self.intensity = (self.intensity + delta).clamp(0.0, 1.0);
                // every intensity move also re-rolls the active slot's seed,
                // so riding the knob sweeps through fresh variations
                let seed = self.seed_rng.next_u32();
                self.seeds[self.active_slot] = seed;
                vec![
                    AudioCommand::SetIntensity(self.intensity),
                    AudioCommand::SetSlotSeed {
                        slot: self.active_slot,
                        seed,
                    },
                ]
            }
            InputEvent::ToggleLiveJam => {
                self.live_jam_enabled = !self.live_jam_enabled;
                vec![AudioCommand::SetLiveJamEnabled(self.live_jam_enabled)]
            }
            InputEvent::AdjustJamIntensity(delta) => {
                self.live_jam_intensity = (self.live_jam_intensity + delta).clamp(0.0, 1.0);
                vec![AudioCommand::SetLiveJamIntensity(self.live_jam_intensity)]
            }

            InputEvent::Quit => Vec::new(),
        }
    }

    fn set_style(&mut self, style: Style) -> Vec<AudioCommand> {
        self.styles[self.active_slot] = style;
        vec![AudioCommand::SetSlotStyle {
            slot: self.active_slot,
            style,
        }]
    }

    fn generate(&mut self, complexity: f32) -> Vec<AudioCommand> {
        let slot = self.active_slot;
        let style = self.styles[slot];
        let mut p = Pattern::new(&format!("Generated {}", slot + 1));
        style::generate_base(&mut p, style);
        style::apply_complexity(&mut p, style, complexity);
        self.slots[slot] = Some(p.clone());
        let seed = self.seed_rng.next_u32();
        self.seeds[slot] = seed;
        vec![
            AudioCommand::LoadPattern { slot, pattern: p },
            AudioCommand::SetSlotSeed { slot, seed },
        ]
    }

    /// Fold the latest engine snapshot into the mirror.
    pub fn apply_feedback(&mut self, fb: EngineFeedback) {
        self.active_slot = fb.active_slot;
        self.queued_slot = fb.queued_slot;
        self.current_step = fb.current_step;
        self.playing = fb.playing;
    }

    /// Rebuild the frame snapshot. Runs the same seeded pipeline as the audio
    /// side, so the grid shows what will actually play (minus live jam).
    pub fn display_state(&self) -> DisplayState {
        let style = self.styles[self.active_slot];
        let (grid, track_names, pattern_name, swing) = match &self.slots[self.active_slot] {
            Some(base) => {
                let played =
                    apply_intensity(base, self.intensity, style, self.seeds[self.active_slot]);
                let grid = played
                    .tracks()
                    .iter()
                    .map(|track| {
                        (0..track.len())
                            .map(|i| {
                                track.step(i).map_or(GridCell::default(), |s| GridCell {
                                    active: s.is_active(),
                                    velocity: s.velocity(),
                                    probability: s.probability(),
                                })
                            })
                            .collect()
                    })
                    .collect();
                let names = played
                    .tracks()
                    .iter()
                    .map(|t| t.name().to_string())
                    .collect();
                (grid, names, base.name().to_string(), base.swing())
            }
            None => {
                let empty = Pattern::new("");
                let names = empty
                    .tracks()
                    .iter()
                    .map(|t| t.name().to_string())
                    .collect();
                (
                    vec![vec![GridCell::default(); DEFAULT_STEPS]; NUM_TRACKS],
                    names,
                    "(empty)".to_string(),
                    0.0,
                )
            }
        };

        let mut slot_filled = [false; NUM_SLOTS];
        for (i, slot) in self.slots.iter().enumerate() {
            slot_filled[i] = slot.is_some();
        }

        DisplayState {
            grid,
            track_names,
            current_step: self.current_step,
            active_slot: self.active_slot,
            queued_slot: self.queued_slot,
            slot_filled,
            pattern_name,
            style,
            swing,
            intensity: self.intensity,
            live_jam_enabled: self.live_jam_enabled,
            live_jam_intensity: self.live_jam_intensity,
            tempo: self.tempo,
            playing: self.playing,
        }
    }

    /// Snapshot for saving.
    pub fn to_project(&self) -> ProjectFile {
        ProjectFile {
            slots: (0..NUM_SLOTS)
                .map(|i| {
                    self.slots[i]
                        .as_ref()
                        .map(|p| SlotFile::from_pattern(p, self.styles[i], self.seeds[i]))
                })
                .collect(),
            active_slot: self.active_slot,
            tempo: self.tempo,
            intensity: self.intensity,
            live_jam_enabled: self.live_jam_enabled,
            live_jam_intensity: self.live_jam_intensity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{KICK, SNARE};

    fn fresh() -> Middle {
        Middle::with_project(ProjectFile::default())
    }

    #[test]
    fn fresh_project_seeds_slot_zero() {
        let m = fresh();
        let ds = m.display_state();
        assert!(ds.slot_filled[0]);
        assert!((1..crate::shared::NUM_SLOTS).all(|i| !ds.slot_filled[i]));
        assert_eq!(ds.pattern_name, "Rock Basic");
        assert_eq!(ds.tempo, crate::shared::DEFAULT_TEMPO);
    }

    #[test]
    fn play_press_toggles_and_clears_the_cursor() {
        let mut m = fresh();
        let cmds = m.handle_input(InputEvent::PlayPress);
        assert!(matches!(cmds[0], AudioCommand::SetPlaying(true)));
        m.apply_feedback(EngineFeedback {
            active_slot: 0,
            queued_slot: None,
            current_step: Some(3),
            playing: true,
        });
        assert_eq!(m.display_state().current_step, Some(3));

        let cmds = m.handle_input(InputEvent::PlayPress);
        assert!(matches!(cmds[0], AudioCommand::SetPlaying(false)));
        assert_eq!(m.display_state().current_step, None);
    }

    #[test]
    fn tempo_clamps_to_range() {
        let mut m = fresh();
        m.handle_input(InputEvent::AdjustTempo(10_000.0));
        assert_eq!(m.display_state().tempo, MAX_TEMPO);
        m.handle_input(InputEvent::AdjustTempo(-10_000.0));
        assert_eq!(m.display_state().tempo, MIN_TEMPO);
    }

    #[test]
    fn slot_selection_queues_while_playing() {
        let mut m = fresh();
        m.handle_input(InputEvent::PlayPress);
        let cmds = m.handle_input(InputEvent::SelectSlot(4));
        assert!(matches!(
            cmds[0],
            AudioCommand::SwitchSlot {
                slot: 4,
                immediate: false
            }
        ));
        let ds = m.display_state();
        assert_eq!(ds.active_slot, 0);
        assert_eq!(ds.queued_slot, Some(4));

        // the bar line commit comes back through feedback
        m.apply_feedback(EngineFeedback {
            active_slot: 4,
            queued_slot: None,
            current_step: Some(0),
            playing: true,
        });
        let ds = m.display_state();
        assert_eq!(ds.active_slot, 4);
        assert_eq!(ds.queued_slot, None);
    }

    #[test]
    fn reselecting_the_active_slot_cancels_the_engine_queue() {
        use crate::sequencer::{Sequencer, Transport};

        fn forward(seq: &mut Sequencer, cmds: Vec<AudioCommand>) {
            for cmd in cmds {
                match cmd {
                    AudioCommand::LoadPattern { slot, pattern } => seq.load_pattern(slot, pattern),
                    AudioCommand::SwitchSlot { slot, immediate } => {
                        seq.switch_to_slot(slot, immediate)
                    }
                    _ => {}
                }
            }
        }
        fn playing(ppq: f64) -> Transport {
            Transport {
                tempo: Some(120.0),
                position_qn: Some(ppq),
                playing: true,
            }
        }

        let mut m = fresh();
        let mut seq = Sequencer::new();
        let mut out = Vec::new();

        let cmds = m.handle_input(InputEvent::PlayPress);
        forward(&mut seq, cmds);
        seq.process_block(&playing(0.01), 44100.0, &mut out);

        let cmds = m.handle_input(InputEvent::SelectSlot(4));
        forward(&mut seq, cmds);
        assert_eq!(seq.queued_slot(), Some(4));

        // re-selecting the active slot must cancel on BOTH sides
        let cmds = m.handle_input(InputEvent::SelectSlot(0));
        assert!(!cmds.is_empty(), "cancel never sent to the engine");
        forward(&mut seq, cmds);
        assert_eq!(seq.queued_slot(), None);

        // the bar line passes without the dropped switch committing
        seq.process_block(&playing(4.0), 44100.0, &mut out);
        assert_eq!(seq.active_slot(), 0);
        let ds = m.display_state();
        assert_eq!(ds.active_slot, 0);
        assert_eq!(ds.queued_slot, None);
    }

    #[test]
    fn slot_selection_is_direct_when_stopped() {
        let mut m = fresh();
        m.handle_input(InputEvent::SelectSlot(2));
        let ds = m.display_state();
        assert_eq!(ds.active_slot, 2);
        assert_eq!(ds.queued_slot, None);
    }

    #[test]
    fn generate_fills_the_active_slot() {
        let mut m = fresh();
        m.handle_input(InputEvent::SelectSlot(3));
        m.handle_input(InputEvent::NextStyle); // rock -> metal
        let cmds = m.handle_input(InputEvent::Generate);
        assert!(
            cmds.iter()
                .any(|c| matches!(c, AudioCommand::LoadPattern { slot: 3, .. }))
        );
        assert!(
            cmds.iter()
                .any(|c| matches!(c, AudioCommand::SetSlotSeed { slot: 3, .. }))
        );
        let ds = m.display_state();
        assert!(ds.slot_filled[3]);
        assert_eq!(ds.style, Style::Metal);
        assert_eq!(ds.pattern_name, "Generated 4");
    }

    #[test]
    fn intensity_moves_reroll_the_seed() {
        let mut m = fresh();
        let cmds = m.handle_input(InputEvent::AdjustIntensity(0.1));
        assert!(matches!(cmds[0], AudioCommand::SetIntensity(_)));
        assert!(matches!(cmds[1], AudioCommand::SetSlotSeed { slot: 0, .. }));
        let ds = m.display_state();
        assert!((ds.intensity - 0.6).abs() < 1e-6);
    }

    #[test]
    fn display_grid_reflects_the_seeded_pipeline() {
        let mut m = fresh();
        m.handle_input(InputEvent::AdjustIntensity(-1.0)); // floor it
        let ds = m.display_state();
        assert_eq!(ds.grid.len(), NUM_TRACKS);
        assert_eq!(ds.grid[KICK].len(), DEFAULT_STEPS);
        // rock base kick at 0.9 scaled by 0.3 at zero intensity
        let cell = ds.grid[KICK][0];
        assert!(cell.active);
        assert!((cell.velocity - 0.27).abs() < 1e-4);
        assert!(ds.grid[SNARE][8].active);
    }

    #[test]
    fn clear_pattern_empties_the_base_but_keeps_the_slot() {
        let mut m = fresh();
        let cmds = m.handle_input(InputEvent::ClearPattern);
        assert!(matches!(cmds[0], AudioCommand::ClearSlot(0)));
        assert!(m.display_state().slot_filled[0]);
        // the BASE is empty; the displayed grid may still show pipeline
        // additions, so check the serialized form
        let saved = m.to_project();
        let slot = saved.slots[0].as_ref().unwrap();
        assert!(slot.tracks.iter().all(|t| t.steps.is_empty()));
    }

    #[test]
    fn project_round_trip_preserves_the_mirror() {
        let mut m = fresh();
        m.handle_input(InputEvent::SelectSlot(2));
        m.handle_input(InputEvent::NextStyle);
        m.handle_input(InputEvent::Generate);
        m.handle_input(InputEvent::AdjustTempo(20.0));
        m.handle_input(InputEvent::ToggleLiveJam);

        let saved = m.to_project();
        let restored = Middle::with_project(saved);
        let a = m.display_state();
        let b = restored.display_state();
        assert_eq!(a.active_slot, b.active_slot);
        assert_eq!(a.slot_filled, b.slot_filled);
        assert_eq!(a.style, b.style);
        assert_eq!(a.tempo, b.tempo);
        assert_eq!(a.live_jam_enabled, b.live_jam_enabled);
        // same seed and intensity, so the same grid
        for (ra, rb) in a.grid.iter().zip(&b.grid) {
            for (ca, cb) in ra.iter().zip(rb) {
                assert_eq!(ca.active, cb.active);
            }
        }
    }
}
