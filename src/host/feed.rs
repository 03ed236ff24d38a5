use crate::pipeline::AudioFrame;
use std::f32::consts::TAU;

/// Supplies host input frames to the render thread.
pub trait InputFeed: Send + 'static {
    /// Overwrites every frame of `frames` with the next input.
    fn fill(&mut self, frames: &mut [AudioFrame]);
}

/// Feeds silence.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilenceFeed;

impl InputFeed for SilenceFeed {
    fn fill(&mut self, frames: &mut [AudioFrame]) {
        frames.fill(AudioFrame::SILENCE);
    }
}

/// Sine tone on both channels.
#[derive(Debug, Clone)]
pub struct ToneFeed {
    phase: f32,
    increment: f32,
    amplitude: f32,
}

impl ToneFeed {
    pub fn new(frequency: f32, amplitude: f32, sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            increment: TAU * frequency / sample_rate as f32,
            amplitude,
        }
    }
}

impl InputFeed for ToneFeed {
    fn fill(&mut self, frames: &mut [AudioFrame]) {
        for frame in frames {
            let sample = self.phase.sin() * self.amplitude;
            *frame = AudioFrame::new(sample, sample);
            self.phase = (self.phase + self.increment) % TAU;
        }
    }
}

impl<F> InputFeed for F
where
    F: FnMut(&mut [AudioFrame]) + Send + 'static,
{
    fn fill(&mut self, frames: &mut [AudioFrame]) {
        self(frames)
    }
}
