use super::feed::InputFeed;
use crate::config::{BridgeDesc, NUM_OUTPUT_CHANNELS};
use crate::effect::SpatialEffectInstance;
use crate::error::{PetalSonicError, Result};
use crate::pipeline::AudioFrame;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Blocks of headroom between the render thread and the device.
const RING_BLOCKS: usize = 4;

/// Produces fixed-size interleaved blocks from an effect instance and a feed.
pub struct BlockRenderer<F: InputFeed> {
    instance: SpatialEffectInstance,
    feed: F,
    // Cached buffers to avoid allocations
    input: Vec<AudioFrame>,
    output: Vec<AudioFrame>,
    interleaved: Vec<f32>,
}

impl<F: InputFeed> BlockRenderer<F> {
    pub fn new(instance: SpatialEffectInstance, feed: F, frames_per_buffer: usize) -> Self {
        Self {
            instance,
            feed,
            input: vec![AudioFrame::SILENCE; frames_per_buffer],
            output: vec![AudioFrame::SILENCE; frames_per_buffer],
            interleaved: vec![0.0; frames_per_buffer * NUM_OUTPUT_CHANNELS],
        }
    }

    pub fn frames_per_block(&self) -> usize {
        self.input.len()
    }

    /// Renders the next block and returns it as interleaved stereo.
    pub fn next_block(&mut self) -> &[f32] {
        self.feed.fill(&mut self.input);
        self.instance.process(&self.input, &mut self.output);
        for (samples, frame) in self
            .interleaved
            .chunks_exact_mut(NUM_OUTPUT_CHANNELS)
            .zip(&self.output)
        {
            samples[0] = frame.left;
            samples[1] = frame.right;
        }
        &self.interleaved
    }
}

/// Copies buffered samples into a device buffer, padding with silence.
///
/// `scratch` bounds how many samples move per pass. Returns `true` when the
/// ring ran dry before `data` was full.
pub fn fill_from_ring<T, C>(consumer: &mut C, scratch: &mut [f32], data: &mut [T]) -> bool
where
    T: SizedSample + FromSample<f32>,
    C: Consumer<Item = f32>,
{
    let mut underrun = false;
    for chunk in data.chunks_mut(scratch.len()) {
        let wanted = &mut scratch[..chunk.len()];
        let popped = consumer.pop_slice(wanted);
        if popped < wanted.len() {
            underrun = true;
            wanted[popped..].fill(0.0);
        }
        for (sample, value) in chunk.iter_mut().zip(wanted.iter()) {
            *sample = T::from_sample(*value);
        }
    }
    underrun
}

/// Standalone host: renders an effect instance on its own thread and plays
/// the result on the default output device.
pub struct HostOutput {
    desc: BridgeDesc,
    stream: Option<cpal::Stream>,
    render_thread: Option<JoinHandle<()>>,
    is_running: Arc<AtomicBool>,
    frames_rendered: Arc<AtomicUsize>,
    underruns: Arc<AtomicUsize>,
}

impl HostOutput {
    pub fn new(desc: BridgeDesc) -> Self {
        Self {
            desc,
            stream: None,
            render_thread: None,
            is_running: Arc::new(AtomicBool::new(false)),
            frames_rendered: Arc::new(AtomicUsize::new(0)),
            underruns: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Opens the device and starts rendering `instance` fed by `feed`.
    ///
    /// The instance moves to the render thread and is dropped there on
    /// [`Self::stop`]. Starting a running output is a no-op.
    pub fn start<F: InputFeed>(&mut self, instance: SpatialEffectInstance, feed: F) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            PetalSonicError::AudioDevice("No default output device available".into())
        })?;
        let default_config = device.default_output_config().map_err(|e| {
            PetalSonicError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;

        let config = cpal::StreamConfig {
            channels: self.desc.channels,
            sample_rate: cpal::SampleRate(self.desc.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(self.desc.frames_per_buffer as u32),
        };

        let block_samples = self.desc.frames_per_buffer * NUM_OUTPUT_CHANNELS;
        let (producer, consumer) = HeapRb::<f32>::new(block_samples * RING_BLOCKS).split();

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => self.create_stream::<f32>(&device, &config, consumer)?,
            cpal::SampleFormat::I16 => self.create_stream::<i16>(&device, &config, consumer)?,
            cpal::SampleFormat::U16 => self.create_stream::<u16>(&device, &config, consumer)?,
            format => {
                return Err(PetalSonicError::AudioFormat(format!(
                    "Unsupported sample format: {:?}",
                    format
                )));
            }
        };

        self.is_running.store(true, Ordering::Release);
        let renderer = BlockRenderer::new(instance, feed, self.desc.frames_per_buffer);
        let block_duration =
            Duration::from_secs_f64(self.desc.frames_per_buffer as f64 / self.desc.sample_rate as f64);
        let is_running = self.is_running.clone();
        let frames_rendered = self.frames_rendered.clone();

        let render_thread = thread::Builder::new()
            .name("petalsonic-render".into())
            .spawn(move || {
                render_loop(renderer, producer, is_running, frames_rendered, block_duration)
            })
            .map_err(|e| {
                self.is_running.store(false, Ordering::Release);
                PetalSonicError::Engine(format!("Failed to spawn render thread: {}", e))
            })?;

        if let Err(e) = stream.play() {
            self.is_running.store(false, Ordering::Release);
            let _ = render_thread.join();
            return Err(PetalSonicError::AudioDevice(format!(
                "Failed to start stream: {}",
                e
            )));
        }

        self.stream = Some(stream);
        self.render_thread = Some(render_thread);
        log::info!(
            "Host output started ({} Hz, {} frames per buffer)",
            self.desc.sample_rate,
            self.desc.frames_per_buffer
        );
        Ok(())
    }

    /// Stops the stream and joins the render thread. No-op when stopped.
    pub fn stop(&mut self) -> Result<()> {
        self.is_running.store(false, Ordering::Release);
        // Dropping the stream stops the device callback
        self.stream.take();

        if let Some(render_thread) = self.render_thread.take() {
            render_thread
                .join()
                .map_err(|_| PetalSonicError::Engine("Render thread panicked".into()))?;
            log::info!(
                "Host output stopped after {} frames ({} underruns)",
                self.frames_rendered(),
                self.underruns()
            );
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Frames rendered by the bridge since the output was created.
    pub fn frames_rendered(&self) -> usize {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    /// Device callbacks that found the ring short of samples.
    pub fn underruns(&self) -> usize {
        self.underruns.load(Ordering::Relaxed)
    }

    pub fn desc(&self) -> &BridgeDesc {
        &self.desc
    }

    fn create_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut consumer: HeapCons<f32>,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let is_running = self.is_running.clone();
        let underruns = self.underruns.clone();
        let mut scratch = vec![0.0f32; self.desc.frames_per_buffer * NUM_OUTPUT_CHANNELS];

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if !is_running.load(Ordering::Acquire) {
                        data.fill(T::from_sample(0.0f32));
                        return;
                    }
                    if fill_from_ring(&mut consumer, &mut scratch, data) {
                        underruns.fetch_add(1, Ordering::Relaxed);
                    }
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| PetalSonicError::AudioDevice(format!("Failed to build stream: {}", e)))
    }
}

impl Drop for HostOutput {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("Failed to stop host output: {}", e);
        }
    }
}

fn render_loop<F: InputFeed>(
    mut renderer: BlockRenderer<F>,
    mut producer: HeapProd<f32>,
    is_running: Arc<AtomicBool>,
    frames_rendered: Arc<AtomicUsize>,
    block_duration: Duration,
) {
    let frames = renderer.frames_per_block();
    let block_samples = frames * NUM_OUTPUT_CHANNELS;

    while is_running.load(Ordering::Acquire) {
        if producer.vacant_len() < block_samples {
            thread::sleep(block_duration / 4);
            continue;
        }
        producer.push_slice(renderer.next_block());
        frames_rendered.fetch_add(frames, Ordering::Relaxed);
    }
}
