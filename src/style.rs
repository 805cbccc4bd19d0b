// The closed style roster plus the hand-authored base skeletons. Base
// generation is a table, not an open hierarchy: every style maps to a fixed
// set of kick/snare/hat hits, and the optional complexity overlay layers a
// small fixed set of extra hits on top. Nothing in here draws randomness;
// humanization is the variation engine's job.

use serde::{Deserialize, Serialize};

use crate::pattern::{self, Pattern};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Style {
    Rock,
    Metal,
    Jazz,
    Funk,
    Electronic,
    HipHop,
    Latin,
    Punk,
}

pub const ALL_STYLES: [Style; 8] = [
    Style::Rock,
    Style::Metal,
    Style::Jazz,
    Style::Funk,
    Style::Electronic,
    Style::HipHop,
    Style::Latin,
    Style::Punk,
];

impl Style {
    pub fn name(&self) -> &'static str {
        match self {
            Style::Rock => "Rock",
            Style::Metal => "Metal",
            Style::Jazz => "Jazz",
            Style::Funk => "Funk",
            Style::Electronic => "Electronic",
            Style::HipHop => "Hip-Hop",
            Style::Latin => "Latin",
            Style::Punk => "Punk",
        }
    }

    pub fn index(&self) -> usize {
        ALL_STYLES.iter().position(|s| s == self).unwrap_or(0)
    }

    // unknown indices fall back to Rock rather than erroring
    pub fn from_index(index: usize) -> Style {
        ALL_STYLES.get(index).copied().unwrap_or(Style::Rock)
    }

    pub fn next(&self) -> Style {
        Style::from_index((self.index() + 1) % ALL_STYLES.len())
    }

    pub fn prev(&self) -> Style {
        Style::from_index((self.index() + ALL_STYLES.len() - 1) % ALL_STYLES.len())
    }
}

/// Build the base skeleton for a style into a fresh cleared pattern.
pub fn generate_base(pattern: &mut Pattern, style: Style) {
    pattern.clear();
    match style {
        Style::Rock => rock(pattern),
        Style::Metal => metal(pattern),
        Style::Jazz => jazz(pattern),
        Style::Funk => funk(pattern),
        Style::Electronic => electronic(pattern),
        Style::HipHop => hip_hop(pattern),
        Style::Latin => latin(pattern),
        Style::Punk => punk(pattern),
    }
}

fn rock(p: &mut Pattern) {
    if let Some(kick) = p.track_mut(pattern::KICK) {
        kick.hit(0, 0.9);
    }
    if let Some(snare) = p.track_mut(pattern::SNARE) {
        snare.hit(8, 0.9);
    }
    if let Some(hat) = p.track_mut(pattern::HIHAT) {
        hat.hit_with_probability(4, 0.4, 0.7);
    }
}

fn metal(p: &mut Pattern) {
    if let Some(kick) = p.track_mut(pattern::KICK) {
        kick.hit(0, 0.95);
        kick.hit_with_probability(2, 0.7, 0.8);
    }
    if let Some(snare) = p.track_mut(pattern::SNARE) {
        snare.hit(8, 0.95);
    }
    if let Some(ride) = p.track_mut(pattern::RIDE) {
        ride.hit_with_probability(6, 0.5, 0.7);
    }
}

fn jazz(p: &mut Pattern) {
    p.set_swing(0.67);
    if let Some(kick) = p.track_mut(pattern::KICK) {
        kick.hit(0, 0.5);
    }
    if let Some(snare) = p.track_mut(pattern::SNARE) {
        snare.hit(8, 0.55);
    }
    if let Some(ride) = p.track_mut(pattern::RIDE) {
        ride.hit(2, 0.3);
        ride.hit_with_probability(10, 0.35, 0.7);
    }
}

fn funk(p: &mut Pattern) {
    if let Some(kick) = p.track_mut(pattern::KICK) {
        kick.hit(0, 0.9);
        kick.hit_with_probability(6, 0.6, 0.75);
    }
    if let Some(snare) = p.track_mut(pattern::SNARE) {
        snare.hit(8, 0.85);
    }
    if let Some(hat) = p.track_mut(pattern::HIHAT) {
        hat.hit(4, 0.5);
        hat.hit_with_probability(12, 0.4, 0.8);
    }
}

fn electronic(p: &mut Pattern) {
    if let Some(kick) = p.track_mut(pattern::KICK) {
        kick.hit(0, 0.9);
    }
    if let Some(snare) = p.track_mut(pattern::SNARE) {
        snare.hit_with_probability(8, 0.7, 0.8);
    }
    if let Some(hat) = p.track_mut(pattern::HIHAT) {
        hat.hit(4, 0.4);
        hat.hit(12, 0.5);
    }
}

fn hip_hop(p: &mut Pattern) {
    if let Some(kick) = p.track_mut(pattern::KICK) {
        kick.hit(0, 0.95);
    }
    if let Some(snare) = p.track_mut(pattern::SNARE) {
        snare.hit(8, 0.9);
    }
    if let Some(hat) = p.track_mut(pattern::HIHAT) {
        hat.hit(4, 0.45);
        hat.hit_with_probability(12, 0.35, 0.6);
    }
}

fn latin(p: &mut Pattern) {
    if let Some(kick) = p.track_mut(pattern::KICK) {
        kick.hit(0, 0.75);
        kick.hit_with_probability(6, 0.5, 0.8);
    }
    if let Some(snare) = p.track_mut(pattern::SNARE) {
        snare.hit(8, 0.8);
    }
    if let Some(open) = p.track_mut(pattern::OPEN_HAT) {
        open.hit(4, 0.55);
        open.hit_with_probability(12, 0.5, 0.75);
    }
}

fn punk(p: &mut Pattern) {
    if let Some(kick) = p.track_mut(pattern::KICK) {
        kick.hit(0, 0.9);
    }
    if let Some(snare) = p.track_mut(pattern::SNARE) {
        snare.hit(8, 1.0);
    }
    if let Some(hat) = p.track_mut(pattern::HIHAT) {
        hat.hit_with_probability(4, 0.6, 0.7);
        hat.hit(12, 0.65);
    }
}

/// Deterministic complexity overlay: a small fixed set of extra hits per
/// style, gated by thresholds on the complexity knob. Distinct from the
/// seeded intensity pipeline, which runs at playback time.
pub fn apply_complexity(p: &mut Pattern, style: Style, complexity: f32) {
    match style {
        Style::Rock => {
            if complexity > 0.5 {
                if let Some(kick) = p.track_mut(pattern::KICK) {
                    kick.hit(2, 0.7);
                    kick.hit(10, 0.7);
                }
            }
            if complexity > 0.7 {
                if let Some(snare) = p.track_mut(pattern::SNARE) {
                    snare.hit(4, 0.8);
                }
            }
        }
        Style::Metal => {
            if complexity > 0.6 {
                if let Some(kick) = p.track_mut(pattern::KICK) {
                    kick.hit(1, 0.7);
                    kick.hit(9, 0.7);
                }
            }
            if complexity > 0.7 {
                if let Some(snare) = p.track_mut(pattern::SNARE) {
                    snare.hit(4, 0.9);
                }
            }
        }
        Style::Jazz => {
            if complexity > 0.6 {
                if let Some(snare) = p.track_mut(pattern::SNARE) {
                    snare.hit(7, 0.25);
                    snare.hit(15, 0.3);
                }
            }
        }
        Style::Electronic => {
            if complexity > 0.6 {
                if let Some(snare) = p.track_mut(pattern::SNARE) {
                    snare.hit(4, 0.8);
                }
            }
            if complexity > 0.7 {
                if let Some(kick) = p.track_mut(pattern::KICK) {
                    kick.hit(6, 0.7);
                }
            }
        }
        Style::HipHop => {
            if complexity > 0.6 {
                if let Some(snare) = p.track_mut(pattern::SNARE) {
                    snare.hit(4, 0.9);
                }
            }
            if complexity > 0.7 {
                if let Some(kick) = p.track_mut(pattern::KICK) {
                    kick.hit(3, 0.8);
                }
            }
        }
        Style::Funk => {
            if complexity > 0.6 {
                if let Some(snare) = p.track_mut(pattern::SNARE) {
                    snare.hit(4, 0.9);
                }
            }
            if complexity > 0.7 {
                if let Some(snare) = p.track_mut(pattern::SNARE) {
                    snare.hit(10, 0.35);
                }
            }
        }
        Style::Latin => {
            if complexity > 0.6 {
                if let Some(snare) = p.track_mut(pattern::SNARE) {
                    snare.hit(4, 0.8);
                }
            }
            if complexity > 0.7 {
                if let Some(kick) = p.track_mut(pattern::KICK) {
                    kick.hit(13, 0.7);
                }
            }
        }
        Style::Punk => {
            if complexity > 0.6 {
                if let Some(snare) = p.track_mut(pattern::SNARE) {
                    snare.hit(4, 1.0);
                }
            }
            if complexity > 0.7 {
                if let Some(hat) = p.track_mut(pattern::HIHAT) {
                    for i in (1..16).step_by(2) {
                        hat.hit(i, 0.6);
                    }
                }
            }
        }
    }
}
