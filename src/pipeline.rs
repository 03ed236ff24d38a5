//! Per-callback render protocol: feed → render → emit.
//!
//! [`RenderPipeline`] owns the scratch buffers, sized once from the negotiated
//! frames per buffer. A callback only touches those buffers and the engine, so
//! it never allocates. Anything that keeps the engine from rendering (no handle
//! installed, the engine declining this cycle) yields explicit silence.

use crate::api::SourceId;
use crate::config::NUM_OUTPUT_CHANNELS;
use crate::handle::EngineSlot;
use std::sync::Arc;

/// One stereo frame as exchanged with the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioFrame {
    pub left: f32,
    pub right: f32,
}

impl AudioFrame {
    pub const SILENCE: AudioFrame = AudioFrame {
        left: 0.0,
        right: 0.0,
    };

    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

/// Renders one spatialized source through the engine, callback by callback.
pub struct RenderPipeline {
    slot: Arc<EngineSlot>,
    frames_per_buffer: usize,
    // Cached buffers to avoid allocations
    mono_input: Vec<f32>,
    stereo_output: Vec<f32>,
}

impl RenderPipeline {
    /// # Panics
    ///
    /// Panics if `frames_per_buffer` is zero.
    pub fn new(slot: Arc<EngineSlot>, frames_per_buffer: usize) -> Self {
        assert!(
            frames_per_buffer > 0,
            "frames per buffer must be positive"
        );
        let stereo_samples = frames_per_buffer
            .checked_mul(NUM_OUTPUT_CHANNELS)
            .expect("stereo scratch buffer size overflows usize");

        Self {
            slot,
            frames_per_buffer,
            mono_input: vec![0.0; frames_per_buffer],
            stereo_output: vec![0.0; stereo_samples],
        }
    }

    pub fn frames_per_buffer(&self) -> usize {
        self.frames_per_buffer
    }

    /// Hands an interleaved input buffer of `num_channels` channels to the engine.
    ///
    /// No-op when no engine is installed.
    pub fn process_source(&self, source_id: SourceId, num_channels: usize, input: &[f32]) {
        assert!(num_channels > 0, "source input needs at least one channel");
        if let Some(handle) = self.slot.load() {
            let num_frames = input.len() / num_channels;
            handle
                .api()
                .set_interleaved_buffer(source_id, input, num_channels, num_frames);
        }
    }

    /// Renders the listener mix into `output` (interleaved stereo).
    ///
    /// Every sample of `output` is zero when no engine is installed or the
    /// engine produced no valid output, whatever `output` held before.
    pub fn process_listener(&self, output: &mut [f32]) {
        let num_frames = output.len() / NUM_OUTPUT_CHANNELS;

        let rendered = match self.slot.load() {
            Some(handle) => {
                handle
                    .api()
                    .fill_interleaved_output_buffer(NUM_OUTPUT_CHANNELS, num_frames, output)
            }
            None => false,
        };

        if !rendered {
            let num_samples = NUM_OUTPUT_CHANNELS
                .checked_mul(num_frames)
                .expect("output buffer size overflows usize");
            output[..num_samples].fill(0.0);
            // An odd trailing sample cannot belong to a frame but must not leak stale data
            output[num_samples..].fill(0.0);
        }
    }

    /// Runs one host callback for `source_id`.
    ///
    /// Only the left channel of `input` is consumed. Callbacks longer than the
    /// scratch buffers are processed in consecutive blocks of at most
    /// [`Self::frames_per_buffer`] frames. A shorter trailing block is silence
    /// when the engine only renders whole blocks, as [`SteamAudioApi`] does.
    ///
    /// [`SteamAudioApi`]: crate::backend::SteamAudioApi
    ///
    /// # Panics
    ///
    /// Panics if `input` and `output` have different lengths.
    pub fn process(&mut self, source_id: SourceId, input: &[AudioFrame], output: &mut [AudioFrame]) {
        assert_eq!(
            input.len(),
            output.len(),
            "input and output frame counts differ"
        );

        for (input_block, output_block) in input
            .chunks(self.frames_per_buffer)
            .zip(output.chunks_mut(self.frames_per_buffer))
        {
            self.process_block(source_id, input_block, output_block);
        }
    }

    fn process_block(&mut self, source_id: SourceId, input: &[AudioFrame], output: &mut [AudioFrame]) {
        let frames = input.len();

        // Feed
        let mono = &mut self.mono_input[..frames];
        for (sample, frame) in mono.iter_mut().zip(input) {
            *sample = frame.left;
        }
        self.process_source(source_id, 1, &self.mono_input[..frames]);

        // Render
        let mut stereo = std::mem::take(&mut self.stereo_output);
        self.process_listener(&mut stereo[..frames * NUM_OUTPUT_CHANNELS]);

        // Emit
        for (frame, samples) in output
            .iter_mut()
            .zip(stereo.chunks_exact(NUM_OUTPUT_CHANNELS))
        {
            frame.left = samples[0];
            frame.right = samples[1];
        }
        self.stereo_output = stereo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeDesc;
    use crate::test_support::{ApiCall, ApiRecorder, init_logger, recording_factory};
    use std::sync::atomic::Ordering;

    fn initialized_pipeline(frames_per_buffer: usize) -> (RenderPipeline, Arc<ApiRecorder>) {
        init_logger();
        let slot = Arc::new(EngineSlot::new());
        let (recorder, factory) = recording_factory();
        let desc = BridgeDesc {
            frames_per_buffer,
            ..Default::default()
        };
        slot.initialize(&desc, &*factory).unwrap();
        (RenderPipeline::new(slot, frames_per_buffer), recorder)
    }

    #[test]
    fn declined_render_is_silence_regardless_of_prior_contents() {
        let (pipeline, recorder) = initialized_pipeline(16);
        recorder.render_ok.store(false, Ordering::SeqCst);

        for frames in [0usize, 1, 7, 16] {
            let mut output = vec![0.75f32; frames * 2];
            pipeline.process_listener(&mut output);
            assert!(output.iter().all(|&s| s == 0.0), "frames = {}", frames);
        }
    }

    #[test]
    fn missing_handle_yields_silence() {
        let mut pipeline = RenderPipeline::new(Arc::new(EngineSlot::new()), 8);
        let input = vec![AudioFrame::new(0.5, -0.5); 8];
        let mut output = vec![AudioFrame::new(9.0, 9.0); 8];

        pipeline.process(SourceId::from_raw(0), &input, &mut output);

        assert!(output.iter().all(|&f| f == AudioFrame::SILENCE));
    }

    #[test]
    fn rendered_stereo_is_deinterleaved() {
        let (mut pipeline, recorder) = initialized_pipeline(4);
        let rendered: Vec<f32> = (0..8).map(|i| i as f32 * 0.1).collect();
        *recorder.scripted_output.lock().unwrap() = Some(rendered.clone());

        let input = vec![AudioFrame::SILENCE; 4];
        let mut output = vec![AudioFrame::SILENCE; 4];
        pipeline.process(SourceId::from_raw(0), &input, &mut output);

        for (i, frame) in output.iter().enumerate() {
            assert_eq!(frame.left, rendered[2 * i]);
            assert_eq!(frame.right, rendered[2 * i + 1]);
        }
    }

    #[test]
    fn feeds_left_channel_as_mono() {
        let (mut pipeline, recorder) = initialized_pipeline(4);
        let id = SourceId::from_raw(0);
        let input: Vec<AudioFrame> = (0..4).map(|i| AudioFrame::new(i as f32, -100.0)).collect();
        let mut output = vec![AudioFrame::SILENCE; 4];

        pipeline.process(id, &input, &mut output);

        assert_eq!(
            recorder.calls(),
            vec![
                ApiCall::SetInterleavedBuffer {
                    id,
                    num_channels: 1,
                    num_frames: 4
                },
                ApiCall::FillOutput {
                    num_channels: 2,
                    num_frames: 4
                },
            ]
        );
        // The stub mirrors the mono input to both channels
        for (i, frame) in output.iter().enumerate() {
            assert_eq!(frame.left, i as f32);
            assert_eq!(frame.right, i as f32);
        }
    }

    #[test]
    fn zero_frames_is_a_no_op_render() {
        let (mut pipeline, recorder) = initialized_pipeline(4);
        let mut output: Vec<AudioFrame> = Vec::new();

        pipeline.process(SourceId::from_raw(0), &[], &mut output);

        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn long_callbacks_are_split_into_blocks() {
        let (mut pipeline, recorder) = initialized_pipeline(4);
        let id = SourceId::from_raw(0);
        let input: Vec<AudioFrame> = (0..10).map(|i| AudioFrame::new(i as f32, 0.0)).collect();
        let mut output = vec![AudioFrame::SILENCE; 10];

        pipeline.process(id, &input, &mut output);

        let fills: Vec<usize> = recorder
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::FillOutput { num_frames, .. } => Some(num_frames),
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec![4, 4, 2]);
        for (i, frame) in output.iter().enumerate() {
            assert_eq!(frame.left, i as f32);
        }
    }

    #[test]
    #[should_panic(expected = "input and output frame counts differ")]
    fn mismatched_buffers_are_a_contract_violation() {
        let (mut pipeline, _) = initialized_pipeline(4);
        let input = vec![AudioFrame::SILENCE; 4];
        let mut output = vec![AudioFrame::SILENCE; 3];
        pipeline.process(SourceId::from_raw(0), &input, &mut output);
    }
}
