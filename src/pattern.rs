// Step / Track / Pattern value types. This is the substrate everything else
// (style tables, variation engine, sequencer) operates on. No failure modes:
// out-of-range values are clamped, out-of-range indices are silent no-ops.

use crate::shared::{DEFAULT_STEPS, NUM_TRACKS};

// General MIDI drum map (channel 10)
pub mod gm {
    pub const KICK: u8 = 36;
    pub const SNARE: u8 = 38;
    pub const HIHAT_CLOSED: u8 = 42;
    pub const HIHAT_OPEN: u8 = 46;
    pub const HIHAT_PEDAL: u8 = 44;
    pub const CRASH: u8 = 49;
    pub const SPLASH: u8 = 57;
    pub const RIDE: u8 = 51;
    pub const RIDE_BELL: u8 = 53;
    pub const TOM_HIGH: u8 = 50;
    pub const TOM_LOW: u8 = 45;
    pub const CHINA: u8 = 52;
}

// Track indices into the fixed 12-voice roster. The variation tables address
// tracks by these positions, so the roster order is part of the contract.
pub const KICK: usize = 0;
pub const SNARE: usize = 1;
pub const HIHAT: usize = 2;
pub const OPEN_HAT: usize = 3;
pub const CRASH: usize = 4;
pub const RIDE: usize = 5;
pub const TOM_HI: usize = 6;
pub const TOM_LO: usize = 7;
pub const RIDE_BELL: usize = 8;
pub const HH_PEDAL: usize = 9;
pub const SPLASH: usize = 10;
pub const CHINA: usize = 11;

/// One 16th-note slot: purely value-typed, no identity beyond its position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    active: bool,
    velocity: f32,     // 0.0 - 1.0
    micro_timing: f32, // -0.5 to +0.5, in step units
    probability: f32,  // 0.0 - 1.0 gate chance
}

impl Default for Step {
    fn default() -> Self {
        Self {
            active: false,
            velocity: 0.8,
            micro_timing: 0.0,
            probability: 1.0,
        }
    }
}

impl Step {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn set_velocity(&mut self, v: f32) {
        self.velocity = v.clamp(0.0, 1.0);
    }

    pub fn micro_timing(&self) -> f32 {
        self.micro_timing
    }

    pub fn set_micro_timing(&mut self, mt: f32) {
        self.micro_timing = mt.clamp(-0.5, 0.5);
    }

    pub fn probability(&self) -> f32 {
        self.probability
    }

    pub fn set_probability(&mut self, p: f32) {
        self.probability = p.clamp(0.0, 1.0);
    }
}

/// One percussion voice's sequence of steps across a pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    name: String,
    note: u8,
    steps: Vec<Step>,
}

impl Track {
    pub fn new(name: &str, note: u8) -> Self {
        Self {
            name: name.to_string(),
            note,
            steps: vec![Step::default(); DEFAULT_STEPS],
        }
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn step_mut(&mut self, index: usize) -> Option<&mut Step> {
        self.steps.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    // truncates or zero-fills with default steps
    pub fn set_len(&mut self, num_steps: usize) {
        self.steps.resize(num_steps, Step::default());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn set_note(&mut self, note: u8) {
        self.note = note;
    }

    pub fn clear(&mut self) {
        for step in &mut self.steps {
            *step = Step::default();
        }
    }

    /// Activate a step with the given velocity; no-op when out of range.
    pub fn hit(&mut self, index: usize, velocity: f32) {
        if let Some(step) = self.steps.get_mut(index) {
            step.set_active(true);
            step.set_velocity(velocity);
        }
    }

    /// Like `hit` but also sets the gate probability.
    pub fn hit_with_probability(&mut self, index: usize, velocity: f32, probability: f32) {
        if let Some(step) = self.steps.get_mut(index) {
            step.set_active(true);
            step.set_velocity(velocity);
            step.set_probability(probability);
        }
    }

    pub fn deactivate(&mut self, index: usize) {
        if let Some(step) = self.steps.get_mut(index) {
            step.set_active(false);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub const FOUR_FOUR: TimeSignature = TimeSignature {
        numerator: 4,
        denominator: 4,
    };

    // 16th-note resolution
    pub fn steps_per_bar(&self) -> usize {
        (self.numerator as usize * 16) / self.denominator as usize
    }
}

/// A bar of drums: the fixed 12-voice roster, a swing amount, a time signature
/// and the playback cursor. All tracks always share the same length.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    name: String,
    tracks: Vec<Track>,
    signature: TimeSignature,
    swing: f32,
    current_step: usize,
}

impl Pattern {
    pub fn new(name: &str) -> Self {
        let tracks = vec![
            Track::new("Kick", gm::KICK),
            Track::new("Snare", gm::SNARE),
            Track::new("Hi-Hat", gm::HIHAT_CLOSED),
            Track::new("Open HH", gm::HIHAT_OPEN),
            Track::new("Crash", gm::CRASH),
            Track::new("Ride", gm::RIDE),
            Track::new("Tom Hi", gm::TOM_HIGH),
            Track::new("Tom Low", gm::TOM_LOW),
            Track::new("Ride Bell", gm::RIDE_BELL),
            Track::new("HH Pedal", gm::HIHAT_PEDAL),
            Track::new("Splash", gm::SPLASH),
            Track::new("China", gm::CHINA),
        ];
        debug_assert_eq!(tracks.len(), NUM_TRACKS);
        Self {
            name: name.to_string(),
            tracks,
            signature: TimeSignature::FOUR_FOUR,
            swing: 0.0,
            current_step: 0,
        }
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn swing(&self) -> f32 {
        self.swing
    }

    pub fn set_swing(&mut self, s: f32) {
        self.swing = s.clamp(0.0, 0.75);
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn set_current_step(&mut self, step: usize) {
        self.current_step = step;
    }

    pub fn len(&self) -> usize {
        self.tracks.first().map_or(DEFAULT_STEPS, Track::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // invariant: all tracks share one length
    pub fn set_len(&mut self, num_steps: usize) {
        for track in &mut self.tracks {
            track.set_len(num_steps);
        }
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.signature
    }

    pub fn set_time_signature(&mut self, ts: TimeSignature) {
        self.signature = ts;
        self.set_len(ts.steps_per_bar());
    }

    pub fn clear(&mut self) {
        for track in &mut self.tracks {
            track.clear();
        }
        self.current_step = 0;
    }

    /// Step accessor crossing track and step bounds in one go.
    pub fn step(&self, track: usize, step: usize) -> Option<&Step> {
        self.tracks.get(track).and_then(|t| t.step(step))
    }

    pub fn step_mut(&mut self, track: usize, step: usize) -> Option<&mut Step> {
        self.tracks.get_mut(track).and_then(|t| t.step_mut(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_defaults() {
        let s = Step::default();
        assert!(!s.is_active());
        assert_eq!(s.velocity(), 0.8);
        assert_eq!(s.micro_timing(), 0.0);
        assert_eq!(s.probability(), 1.0);
    }

    #[test]
    fn setters_clamp_instead_of_rejecting() {
        let mut s = Step::default();
        s.set_velocity(1.7);
        assert_eq!(s.velocity(), 1.0);
        s.set_velocity(-0.2);
        assert_eq!(s.velocity(), 0.0);
        s.set_micro_timing(3.0);
        assert_eq!(s.micro_timing(), 0.5);
        s.set_micro_timing(-3.0);
        assert_eq!(s.micro_timing(), -0.5);
        s.set_probability(9.0);
        assert_eq!(s.probability(), 1.0);

        let mut p = Pattern::new("clamp");
        p.set_swing(0.9);
        assert_eq!(p.swing(), 0.75);
        p.set_swing(-0.1);
        assert_eq!(p.swing(), 0.0);
    }

    #[test]
    fn roster_is_fixed_and_gm_mapped() {
        let p = Pattern::new("roster");
        assert_eq!(p.num_tracks(), NUM_TRACKS);
        assert_eq!(p.track(KICK).unwrap().note(), 36);
        assert_eq!(p.track(SNARE).unwrap().note(), 38);
        assert_eq!(p.track(HIHAT).unwrap().note(), 42);
        assert_eq!(p.track(OPEN_HAT).unwrap().note(), 46);
        assert_eq!(p.track(CHINA).unwrap().note(), 52);
        assert_eq!(p.track(SPLASH).unwrap().note(), 57);
    }

    #[test]
    fn time_signature_drives_length() {
        let mut p = Pattern::new("ts");
        p.set_time_signature(TimeSignature {
            numerator: 4,
            denominator: 4,
        });
        assert_eq!(p.len(), 16);
        p.set_time_signature(TimeSignature {
            numerator: 3,
            denominator: 4,
        });
        assert_eq!(p.len(), 12);
        for track in p.tracks() {
            assert_eq!(track.len(), 12);
        }
        p.set_time_signature(TimeSignature {
            numerator: 7,
            denominator: 8,
        });
        assert_eq!(p.len(), 14);
    }

    #[test]
    fn resize_zero_fills_with_defaults() {
        let mut p = Pattern::new("resize");
        p.track_mut(KICK).unwrap().hit(15, 0.9);
        p.set_len(8);
        assert_eq!(p.len(), 8);
        p.set_len(16);
        // the old step 15 was truncated away, refilled with a default
        let s = p.step(KICK, 15).unwrap();
        assert!(!s.is_active());
        assert_eq!(s.velocity(), 0.8);
    }

    #[test]
    fn clear_resets_steps_and_cursor() {
        let mut p = Pattern::new("clear");
        p.track_mut(SNARE).unwrap().hit_with_probability(4, 0.5, 0.3);
        p.set_current_step(7);
        p.clear();
        assert_eq!(p.current_step(), 0);
        let s = p.step(SNARE, 4).unwrap();
        assert!(!s.is_active());
        assert_eq!(s.velocity(), 0.8);
        assert_eq!(s.probability(), 1.0);
    }

    #[test]
    fn out_of_range_indices_are_noops() {
        let mut p = Pattern::new("oob");
        assert!(p.track(12).is_none());
        assert!(p.step(0, 16).is_none());
        p.track_mut(KICK).unwrap().hit(99, 1.0); // silently ignored
        assert!(p.tracks()[KICK].step(15).is_some());
    }
}
