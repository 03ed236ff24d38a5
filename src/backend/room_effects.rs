//! Shoebox room rendering: six early reflection taps and a comb/allpass late reverb.
//!
//! All delay lines are sized at construction; updating properties only
//! rewrites coefficients, so the render thread can apply them in place.

use crate::math::Vec3;
use crate::room::{ReflectionProperties, ReverbProperties, SPEED_OF_SOUND, Wall};

const REFERENCE_SAMPLE_RATE: f32 = 44_100.0;
const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const ALLPASS_FEEDBACK: f32 = 0.5;
const REVERB_INPUT_GAIN: f32 = 0.015;
const MAX_COMB_FEEDBACK: f32 = 0.98;
const MAX_DAMPING: f32 = 0.9;

/// Longest reflection path the delay line can hold, in seconds.
pub const MAX_REFLECTION_DELAY_SECONDS: f32 = 1.0;

/// Bands averaged for the mid-frequency decay (250 Hz to 2 kHz).
const MID_BANDS: std::ops::Range<usize> = 3..7;
/// Bands averaged for the high-frequency decay (4 kHz and 8 kHz).
const HIGH_BANDS: std::ops::Range<usize> = 7..9;

fn scaled_length(samples: usize, sample_rate: u32) -> usize {
    ((samples as f32 * sample_rate as f32 / REFERENCE_SAMPLE_RATE) as usize).max(1)
}

/// Feedback comb with a one-pole low-pass in the loop.
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    damp: f32,
    store: f32,
}

impl Comb {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length],
            index: 0,
            feedback: 0.0,
            damp: 0.0,
            store: 0.0,
        }
    }

    fn delay_seconds(&self, sample_rate: u32) -> f32 {
        self.buffer.len() as f32 / sample_rate as f32
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.store = output * (1.0 - self.damp) + self.store * self.damp;
        self.buffer[self.index] = input + self.store * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.store = 0.0;
    }
}

struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        self.buffer[self.index] = input + delayed * ALLPASS_FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        delayed - input
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
    }
}

/// Comb feedback giving a 60 dB decay after `rt60` seconds.
pub fn comb_feedback(delay_seconds: f32, rt60: f32) -> f32 {
    if rt60 <= 0.0 {
        return 0.0;
    }
    10f32
        .powf(-3.0 * delay_seconds / rt60)
        .min(MAX_COMB_FEEDBACK)
}

/// Loop damping from how much faster the high bands decay than the mids.
pub fn comb_damping(reverb: &ReverbProperties) -> f32 {
    let mid = reverb.mean_rt60(MID_BANDS);
    if mid <= 0.0 {
        return 0.0;
    }
    let high = reverb.mean_rt60(HIGH_BANDS);
    (1.0 - high / mid).clamp(0.0, MAX_DAMPING)
}

/// Distance from `listener` to each wall of the room, indexed by [`Wall`].
///
/// Walls the listener stands beyond report zero.
pub fn wall_distances(reflections: &ReflectionProperties, listener: Vec3) -> [f32; 6] {
    let local = reflections.room_rotation.inverse() * (listener - reflections.room_position);
    let half = reflections.room_dimensions * 0.5;

    Wall::ALL.map(|wall| {
        let distance = match wall {
            Wall::Left => local.x + half.x,
            Wall::Right => half.x - local.x,
            Wall::Floor => local.y + half.y,
            Wall::Ceiling => half.y - local.y,
            Wall::Front => local.z + half.z,
            Wall::Back => half.z - local.z,
        };
        distance.max(0.0)
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ReflectionTap {
    delay: usize,
    left: f32,
    right: f32,
}

fn wall_pan(wall: Wall) -> (f32, f32) {
    match wall {
        Wall::Left => (1.0, 0.0),
        Wall::Right => (0.0, 1.0),
        _ => (std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
    }
}

pub struct RoomEffects {
    sample_rate: u32,
    reflections: ReflectionProperties,
    reverb_gain: f32,
    reflections_on: bool,
    reverb_on: bool,

    reflection_line: Vec<f32>,
    write_index: usize,
    taps: [ReflectionTap; 6],

    combs: [Vec<Comb>; 2],
    allpasses: [Vec<Allpass>; 2],
}

impl RoomEffects {
    pub fn new(sample_rate: u32) -> Self {
        let line_len = (MAX_REFLECTION_DELAY_SECONDS * sample_rate as f32) as usize + 1;
        let bank = |spread: usize| -> Vec<Comb> {
            COMB_TUNINGS
                .iter()
                .map(|&t| Comb::new(scaled_length(t + spread, sample_rate)))
                .collect()
        };
        let diffusers = |spread: usize| -> Vec<Allpass> {
            ALLPASS_TUNINGS
                .iter()
                .map(|&t| Allpass::new(scaled_length(t + spread, sample_rate)))
                .collect()
        };

        Self {
            sample_rate,
            reflections: ReflectionProperties::disabled(),
            reverb_gain: 0.0,
            reflections_on: false,
            reverb_on: false,
            reflection_line: vec![0.0; line_len],
            write_index: 0,
            taps: [ReflectionTap::default(); 6],
            combs: [bank(0), bank(STEREO_SPREAD)],
            allpasses: [diffusers(0), diffusers(STEREO_SPREAD)],
        }
    }

    pub fn is_active(&self) -> bool {
        self.reflections_on || self.reverb_on
    }

    /// Applies new reflection properties. Call [`Self::set_listener_position`]
    /// afterwards to place the taps.
    pub fn set_reflections(&mut self, properties: &ReflectionProperties) {
        self.reflections = *properties;
        let enabled = properties.is_enabled();
        if !enabled && self.reflections_on {
            self.reflection_line.fill(0.0);
        }
        self.reflections_on = enabled;
    }

    pub fn set_reverb(&mut self, properties: &ReverbProperties) {
        let enabled = properties.is_enabled();
        if !enabled {
            if self.reverb_on {
                self.combs.iter_mut().flatten().for_each(Comb::clear);
                self.allpasses.iter_mut().flatten().for_each(Allpass::clear);
            }
            self.reverb_on = false;
            self.reverb_gain = 0.0;
            return;
        }

        let rt60 = properties.mean_rt60(MID_BANDS);
        let damp = comb_damping(properties);
        let sample_rate = self.sample_rate;
        for comb in self.combs.iter_mut().flatten() {
            comb.feedback = comb_feedback(comb.delay_seconds(sample_rate), rt60);
            comb.damp = damp;
        }
        self.reverb_gain = properties.gain;
        self.reverb_on = true;
    }

    /// Recomputes reflection delays and gains for a listener at `position`.
    pub fn set_listener_position(&mut self, position: Vec3) {
        if !self.reflections_on {
            return;
        }
        let max_delay = self.reflection_line.len() - 1;
        let distances = wall_distances(&self.reflections, position);

        for (tap, wall) in self.taps.iter_mut().zip(Wall::ALL) {
            // Round trip to the wall and back
            let path = 2.0 * distances[wall as usize];
            let delay = (path / SPEED_OF_SOUND * self.sample_rate as f32).round() as usize;
            let gain = self.reflections.coefficients[wall as usize] * self.reflections.gain
                / path.max(1.0);
            let (left, right) = wall_pan(wall);

            *tap = ReflectionTap {
                delay: delay.min(max_delay),
                left: gain * left,
                right: gain * right,
            };
        }
    }

    /// Adds the room response to `send` into the interleaved stereo `output`.
    pub fn process(&mut self, send: &[f32], output: &mut [f32]) {
        if !self.is_active() {
            return;
        }
        let line_len = self.reflection_line.len();

        for (&input, frame) in send.iter().zip(output.chunks_exact_mut(2)) {
            let mut left = 0.0;
            let mut right = 0.0;

            if self.reflections_on {
                self.reflection_line[self.write_index] = input;
                for tap in &self.taps {
                    let read = (self.write_index + line_len - tap.delay) % line_len;
                    let delayed = self.reflection_line[read];
                    left += delayed * tap.left;
                    right += delayed * tap.right;
                }
                self.write_index = (self.write_index + 1) % line_len;
            }

            if self.reverb_on {
                let excitation = input * REVERB_INPUT_GAIN;
                let [left_combs, right_combs] = &mut self.combs;
                let [left_allpasses, right_allpasses] = &mut self.allpasses;

                let mut wet_left: f32 = left_combs.iter_mut().map(|c| c.process(excitation)).sum();
                let mut wet_right: f32 = right_combs.iter_mut().map(|c| c.process(excitation)).sum();
                for allpass in left_allpasses.iter_mut() {
                    wet_left = allpass.process(wet_left);
                }
                for allpass in right_allpasses.iter_mut() {
                    wet_right = allpass.process(wet_right);
                }
                left += wet_left * self.reverb_gain;
                right += wet_right * self.reverb_gain;
            }

            frame[0] += left;
            frame[1] += right;
        }
    }
}
