// Audio-thread owner of the sequencer and the drum kit. The callback hands
// every block here: drain commands, snapshot the internal transport, let the
// sequencer emit triggers, then render sample by sample while counting the
// pending trigger offsets down.

use crossbeam_channel::Sender;

use super::StereoFrame;
use super::kit::Kit;
use crate::audio_api::{AudioCommand, EngineFeedback};
use crate::sequencer::{Sequencer, Transport, TriggerEvent, TriggerKind};
use crate::shared::{DEFAULT_TEMPO, MAX_TEMPO, MIN_TEMPO};

const MAX_PENDING: usize = 128; // hard cap so we won't malloc in the callback

#[derive(Clone, Copy)]
struct Pending {
    event: TriggerEvent,
    remaining: usize,
}

pub struct Engine {
    sample_rate: f64,
    sequencer: Sequencer,
    kit: Kit,

    tempo: f64,
    playing: bool,
    position_qn: f64,

    events: Vec<TriggerEvent>,
    pending: [Option<Pending>; MAX_PENDING],

    feedback_tx: Sender<EngineFeedback>,
}

impl Engine {
    pub fn new(sample_rate: u32, feedback_tx: Sender<EngineFeedback>) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            sequencer: Sequencer::new(),
            kit: Kit::new(sample_rate as f32),
            tempo: DEFAULT_TEMPO,
            playing: false,
            position_qn: 0.0,
            events: Vec::with_capacity(64),
            pending: [None; MAX_PENDING],
            feedback_tx,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::LoadPattern { slot, pattern } => {
                self.sequencer.load_pattern(slot, pattern);
            }
            AudioCommand::SwitchSlot { slot, immediate } => {
                self.sequencer.switch_to_slot(slot, immediate);
            }
            AudioCommand::ClearSlot(slot) => self.sequencer.clear_slot(slot),
            AudioCommand::SetSlotStyle { slot, style } => {
                self.sequencer.set_slot_style(slot, style);
            }
            AudioCommand::SetSlotSeed { slot, seed } => {
                self.sequencer.set_slot_seed(slot, seed);
            }
            AudioCommand::SetIntensity(intensity) => self.sequencer.set_intensity(intensity),
            AudioCommand::SetLiveJamEnabled(enabled) => {
                self.sequencer.set_live_jam_enabled(enabled);
            }
            AudioCommand::SetLiveJamIntensity(intensity) => {
                self.sequencer.set_live_jam_intensity(intensity);
            }
            AudioCommand::SetTempo(tempo) => {
                self.tempo = tempo.clamp(MIN_TEMPO, MAX_TEMPO);
            }
            AudioCommand::SetPlaying(playing) => {
                if playing && !self.playing {
                    // always restart from the top of the bar
                    self.position_qn = 0.0;
                }
                self.playing = playing;
                if !playing {
                    self.kit.release_all();
                }
            }
        }
    }

    pub fn render_block(&mut self, frames: &mut [StereoFrame]) {
        let transport = Transport {
            tempo: Some(self.tempo),
            position_qn: Some(self.position_qn),
            playing: self.playing,
        };

        self.events.clear();
        self.sequencer
            .process_block(&transport, self.sample_rate, &mut self.events);
        for i in 0..self.events.len() {
            self.schedule(self.events[i]);
        }

        let qn_per_sample = self.tempo / 60.0 / self.sample_rate;
        for frame in frames.iter_mut() {
            self.fire_due();
            let s = self.kit.next_sample();
            frame.left = s;
            frame.right = s;
            if self.playing {
                self.position_qn += qn_per_sample;
            }
        }

        let _ = self.feedback_tx.try_send(EngineFeedback {
            active_slot: self.sequencer.active_slot(),
            queued_slot: self.sequencer.queued_slot(),
            current_step: self.playing.then(|| self.sequencer.current_step()),
            playing: self.playing,
        });
    }

    fn schedule(&mut self, event: TriggerEvent) {
        if let Some(slot) = self.pending.iter_mut().find(|p| p.is_none()) {
            *slot = Some(Pending {
                event,
                remaining: event.offset,
            });
        }
        // full table drops the trigger rather than blocking the callback
    }

    fn fire_due(&mut self) {
        for slot in &mut self.pending {
            let Some(p) = slot.as_mut() else { continue };
            if p.remaining == 0 {
                match p.event.kind {
                    TriggerKind::On => self.kit.note_on(p.event.note, p.event.velocity),
                    TriggerKind::Off => self.kit.note_off(p.event.note),
                }
                *slot = None;
            } else {
                p.remaining -= 1;
            }
        }
    }
}
