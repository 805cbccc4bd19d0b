// serde schema for the on-disk project, plus conversions to and from the
// runtime Pattern type. Only ACTIVE steps are written; everything else is
// reconstructed from defaults on load, which also makes old or hand-edited
// files degrade gracefully instead of failing to parse.

use serde::{Deserialize, Serialize};

use crate::pattern::{Pattern, TimeSignature};
use crate::shared::{DEFAULT_STEPS, DEFAULT_TEMPO, NUM_SLOTS, NUM_TRACKS};
use crate::style::Style;

fn default_tempo() -> f64 {
    DEFAULT_TEMPO
}

fn default_intensity() -> f32 {
    0.5
}

fn default_length() -> usize {
    DEFAULT_STEPS
}

fn default_sig_numerator() -> u32 {
    4
}

fn default_sig_denominator() -> u32 {
    4
}

fn default_velocity() -> f32 {
    0.8
}

fn default_probability() -> f32 {
    1.0
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub slots: Vec<Option<SlotFile>>,
    #[serde(default)]
    pub active_slot: usize,
    #[serde(default = "default_tempo")]
    pub tempo: f64,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    #[serde(default)]
    pub live_jam_enabled: bool,
    #[serde(default = "default_intensity")]
    pub live_jam_intensity: f32,
}

impl Default for ProjectFile {
    fn default() -> Self {
        Self {
            slots: (0..NUM_SLOTS).map(|_| None).collect(),
            active_slot: 0,
            tempo: default_tempo(),
            intensity: default_intensity(),
            live_jam_enabled: false,
            live_jam_intensity: default_intensity(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlotFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub style: usize,
    #[serde(default)]
    pub seed: u32,
    #[serde(default)]
    pub swing: f32,
    #[serde(default = "default_length")]
    pub length: usize,
    #[serde(default = "default_sig_numerator")]
    pub sig_numerator: u32,
    #[serde(default = "default_sig_denominator")]
    pub sig_denominator: u32,
    #[serde(default)]
    pub tracks: Vec<TrackFile>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrackFile {
    #[serde(default)]
    pub steps: Vec<StepFile>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StepFile {
    pub index: usize,
    #[serde(default = "default_velocity")]
    pub velocity: f32,
    #[serde(default)]
    pub micro_timing: f32,
    #[serde(default = "default_probability")]
    pub probability: f32,
}

impl SlotFile {
    pub fn from_pattern(pattern: &Pattern, style: Style, seed: u32) -> Self {
        let tracks = pattern
            .tracks()
            .iter()
            .map(|track| {
                let steps = (0..track.len())
                    .filter_map(|i| {
                        let s = track.step(i)?;
                        s.is_active().then(|| StepFile {
                            index: i,
                            velocity: s.velocity(),
                            micro_timing: s.micro_timing(),
                            probability: s.probability(),
                        })
                    })
                    .collect();
                TrackFile { steps }
            })
            .collect();
        let sig = pattern.time_signature();
        Self {
            name: pattern.name().to_string(),
            style: style.index(),
            seed,
            swing: pattern.swing(),
            length: pattern.len(),
            sig_numerator: sig.numerator,
            sig_denominator: sig.denominator,
            tracks,
        }
    }

    pub fn to_pattern(&self) -> Pattern {
        let mut p = Pattern::new(&self.name);
        p.set_time_signature(TimeSignature {
            numerator: self.sig_numerator.max(1),
            denominator: self.sig_denominator.max(1),
        });
        if self.length > 0 && self.length != p.len() {
            p.set_len(self.length);
        }
        p.set_swing(self.swing);
        // only the roster's tracks; extra tracks in the file are ignored
        for (track_idx, track) in self.tracks.iter().enumerate().take(NUM_TRACKS) {
            for step in &track.steps {
                if let Some(s) = p.step_mut(track_idx, step.index) {
                    s.set_active(true);
                    s.set_velocity(step.velocity);
                    s.set_micro_timing(step.micro_timing);
                    s.set_probability(step.probability);
                }
            }
        }
        p
    }

    pub fn style(&self) -> Style {
        Style::from_index(self.style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{KICK, SNARE};
    use crate::style;

    #[test]
    fn round_trip_keeps_active_steps_only() {
        let mut p = Pattern::new("groove");
        style::generate_base(&mut p, Style::Funk);
        p.step_mut(KICK, 3).unwrap().set_micro_timing(0.2);
        p.track_mut(KICK).unwrap().hit(3, 0.77);

        let file = SlotFile::from_pattern(&p, Style::Funk, 42);
        // only active steps serialize
        let kick_steps = &file.tracks[KICK].steps;
        assert!(kick_steps.iter().all(|s| p.step(KICK, s.index).unwrap().is_active()));

        let back = file.to_pattern();
        assert_eq!(back.name(), "groove");
        assert_eq!(back.len(), p.len());
        for track in 0..p.num_tracks() {
            for step in 0..p.len() {
                let a = p.step(track, step).unwrap();
                let b = back.step(track, step).unwrap();
                assert_eq!(a.is_active(), b.is_active(), "{track}/{step}");
                if a.is_active() {
                    assert_eq!(a.velocity(), b.velocity());
                    assert_eq!(a.micro_timing(), b.micro_timing());
                    assert_eq!(a.probability(), b.probability());
                }
            }
        }
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{
            "slots": [
                { "tracks": [ { "steps": [ { "index": 0 } ] } ] },
                null
            ]
        }"#;
        let file: ProjectFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.tempo, 120.0);
        assert_eq!(file.intensity, 0.5);
        assert!(!file.live_jam_enabled);

        let slot = file.slots[0].as_ref().unwrap();
        assert_eq!(slot.length, 16);
        assert_eq!(slot.sig_numerator, 4);
        assert_eq!(slot.style(), Style::Rock);

        let p = slot.to_pattern();
        let s = p.step(KICK, 0).unwrap();
        assert!(s.is_active());
        assert_eq!(s.velocity(), 0.8);
        assert_eq!(s.probability(), 1.0);
        assert!(!p.step(SNARE, 0).unwrap().is_active());
    }

    #[test]
    fn oversized_step_indices_are_dropped_on_load() {
        let json = r#"{ "name": "x", "tracks": [ { "steps": [ { "index": 99 } ] } ] }"#;
        let slot: SlotFile = serde_json::from_str(json).unwrap();
        let p = slot.to_pattern();
        assert!((0..p.len()).all(|i| !p.step(KICK, i).unwrap().is_active()));
    }

    #[test]
    fn empty_project_file_parses() {
        let file: ProjectFile = serde_json::from_str("{}").unwrap();
        assert!(file.slots.is_empty());
        assert_eq!(file.tempo, 120.0);
    }
}
