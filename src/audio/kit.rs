// Synthesized 12-voice drum kit. Each GM note maps to a small recipe of a
// pitched sine (with an exponential pitch drop) plus a noise burst, both
// under one exponential amplitude envelope. Crude, but it keeps the whole
// instrument allocation-free and sample-accurate.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::pattern::gm;

const MAX_VOICES: usize = 32; // hard cap so we won't malloc in the callback

#[derive(Clone, Copy)]
struct Recipe {
    freq: f32,
    freq_decay: f32, // per-sample multiplier on the phase increment
    tone: f32,
    noise: f32,
    decay_secs: f32,
}

fn recipe(note: u8) -> Recipe {
    match note {
        gm::KICK => Recipe {
            freq: 120.0,
            freq_decay: 0.9995,
            tone: 1.0,
            noise: 0.05,
            decay_secs: 0.25,
        },
        gm::SNARE => Recipe {
            freq: 190.0,
            freq_decay: 0.9998,
            tone: 0.4,
            noise: 0.8,
            decay_secs: 0.12,
        },
        gm::HIHAT_CLOSED => Recipe {
            freq: 0.0,
            freq_decay: 1.0,
            tone: 0.0,
            noise: 0.6,
            decay_secs: 0.04,
        },
        gm::HIHAT_PEDAL => Recipe {
            freq: 0.0,
            freq_decay: 1.0,
            tone: 0.0,
            noise: 0.5,
            decay_secs: 0.05,
        },
        gm::HIHAT_OPEN => Recipe {
            freq: 0.0,
            freq_decay: 1.0,
            tone: 0.0,
            noise: 0.6,
            decay_secs: 0.35,
        },
        gm::CRASH => Recipe {
            freq: 520.0,
            freq_decay: 1.0,
            tone: 0.1,
            noise: 0.8,
            decay_secs: 0.9,
        },
        gm::SPLASH => Recipe {
            freq: 660.0,
            freq_decay: 1.0,
            tone: 0.1,
            noise: 0.7,
            decay_secs: 0.45,
        },
        gm::CHINA => Recipe {
            freq: 440.0,
            freq_decay: 1.0,
            tone: 0.15,
            noise: 0.85,
            decay_secs: 0.7,
        },
        gm::RIDE => Recipe {
            freq: 520.0,
            freq_decay: 1.0,
            tone: 0.25,
            noise: 0.35,
            decay_secs: 0.5,
        },
        gm::RIDE_BELL => Recipe {
            freq: 880.0,
            freq_decay: 1.0,
            tone: 0.5,
            noise: 0.2,
            decay_secs: 0.35,
        },
        gm::TOM_HIGH => Recipe {
            freq: 200.0,
            freq_decay: 0.9996,
            tone: 0.9,
            noise: 0.1,
            decay_secs: 0.2,
        },
        gm::TOM_LOW => Recipe {
            freq: 140.0,
            freq_decay: 0.9996,
            tone: 0.9,
            noise: 0.1,
            decay_secs: 0.25,
        },
        _ => Recipe {
            freq: 220.0,
            freq_decay: 1.0,
            tone: 0.5,
            noise: 0.3,
            decay_secs: 0.15,
        },
    }
}

#[derive(Clone, Copy)]
struct DrumVoice {
    note: u8,
    phase: f32,
    phase_inc: f32,
    freq_decay: f32,
    tone: f32,
    noise: f32,
    env: f32,
    decay: f32,
    alive: bool,
}

const DEAD: DrumVoice = DrumVoice {
    note: 0,
    phase: 0.0,
    phase_inc: 0.0,
    freq_decay: 1.0,
    tone: 0.0,
    noise: 0.0,
    env: 0.0,
    decay: 1.0,
    alive: false,
};

pub struct Kit {
    sample_rate: f32,
    voices: [DrumVoice; MAX_VOICES],
    noise_rng: SmallRng,
    release_coeff: f32,
}

impl Kit {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            voices: [DEAD; MAX_VOICES],
            noise_rng: SmallRng::from_entropy(),
            release_coeff: decay_coeff(0.03, sample_rate),
        }
    }

    pub fn note_on(&mut self, note: u8, velocity: u8) {
        // closed hat and pedal choke the open hat
        if note == gm::HIHAT_CLOSED || note == gm::HIHAT_PEDAL {
            self.choke(gm::HIHAT_OPEN);
        }

        let r = recipe(note);
        let slot = self
            .voices
            .iter()
            .position(|v| !v.alive)
            .unwrap_or_else(|| self.quietest());
        self.voices[slot] = DrumVoice {
            note,
            phase: 0.0,
            phase_inc: std::f32::consts::TAU * r.freq / self.sample_rate,
            freq_decay: r.freq_decay,
            tone: r.tone,
            noise: r.noise,
            env: 0.25 * velocity as f32 / 127.0,
            decay: decay_coeff(r.decay_secs, self.sample_rate),
            alive: true,
        };
    }

    /// Push every voice on this note into its release tail.
    pub fn note_off(&mut self, note: u8) {
        for v in &mut self.voices {
            if v.alive && v.note == note {
                v.decay = v.decay.min(self.release_coeff);
            }
        }
    }

    pub fn release_all(&mut self) {
        for v in &mut self.voices {
            if v.alive {
                v.decay = v.decay.min(self.release_coeff);
            }
        }
    }

    fn choke(&mut self, note: u8) {
        for v in &mut self.voices {
            if v.alive && v.note == note {
                v.decay = v.decay.min(self.release_coeff);
            }
        }
    }

    fn quietest(&self) -> usize {
        let mut slot = 0;
        let mut env = f32::MAX;
        for (i, v) in self.voices.iter().enumerate() {
            if v.env < env {
                env = v.env;
                slot = i;
            }
        }
        slot
    }

    pub fn next_sample(&mut self) -> f32 {
        let noise = self.noise_rng.gen_range(-1.0f32..1.0);
        let mut out = 0.0f32;
        for v in &mut self.voices {
            if !v.alive {
                continue;
            }
            out += v.env * (v.tone * v.phase.sin() + v.noise * noise);
            v.phase += v.phase_inc;
            if v.phase > std::f32::consts::TAU {
                v.phase -= std::f32::consts::TAU;
            }
            v.phase_inc *= v.freq_decay;
            v.env *= v.decay;
            if v.env < 0.0005 {
                v.alive = false;
            }
        }
        out
    }
}

fn decay_coeff(secs: f32, sample_rate: f32) -> f32 {
    // reach roughly -60 dB after `secs`
    (-6.9 / (secs * sample_rate)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy(kit: &mut Kit, samples: usize) -> f32 {
        (0..samples).map(|_| kit.next_sample().abs()).sum()
    }

    #[test]
    fn idle_kit_is_silent() {
        let mut kit = Kit::new(44100.0);
        assert_eq!(energy(&mut kit, 512), 0.0);
    }

    #[test]
    fn triggered_voice_sounds_and_decays() {
        let mut kit = Kit::new(44100.0);
        kit.note_on(gm::SNARE, 100);
        let early = energy(&mut kit, 1024);
        assert!(early > 0.0);
        // a snare at 0.12s decay is gone well before half a second
        let _ = energy(&mut kit, 22050);
        let tail = energy(&mut kit, 1024);
        assert!(tail < early * 0.01, "tail {tail} vs early {early}");
    }

    #[test]
    fn note_off_shortens_the_tail() {
        let mut held = Kit::new(44100.0);
        held.note_on(gm::CRASH, 110);
        let _ = energy(&mut held, 2048);
        let held_tail = energy(&mut held, 8192);

        let mut cut = Kit::new(44100.0);
        cut.note_on(gm::CRASH, 110);
        let _ = energy(&mut cut, 2048);
        cut.note_off(gm::CRASH);
        let cut_tail = energy(&mut cut, 8192);

        assert!(cut_tail < held_tail);
    }

    #[test]
    fn closed_hat_chokes_the_open_hat() {
        let mut kit = Kit::new(44100.0);
        kit.note_on(gm::HIHAT_OPEN, 110);
        let _ = energy(&mut kit, 1024);
        kit.note_on(gm::HIHAT_CLOSED, 1);
        // after the choke the open hat tail collapses within ~60 ms
        let _ = energy(&mut kit, 4096);
        let tail = energy(&mut kit, 1024);
        assert!(tail < 0.05, "open hat still ringing: {tail}");
    }
}
