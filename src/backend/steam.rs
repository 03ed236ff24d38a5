use super::command::{ApiCommand, Released, SourceParam};
use super::hrtf;
use super::room_effects::RoomEffects;
use super::source::{
    MAX_AMBISONIC_ORDER, MixTargets, NUM_AMBISONIC_CHANNELS, SoundObjectEffects, SpatialSource,
    null_channel_ptrs,
};
use crate::api::{DistanceRolloffModel, RenderingMode, SourceId, SpatialAudioApi};
use crate::config::{BridgeDesc, NUM_OUTPUT_CHANNELS};
use crate::error::{PetalSonicError, Result};
use crate::math::{Pose, Quat, Vec3};
use crate::room::{ReflectionProperties, ReverbProperties};
use audionimbus::{
    AmbisonicsDecodeEffect, AmbisonicsDecodeEffectParams, AmbisonicsDecodeEffectSettings,
    AudioBufferSettings, AudioSettings, Context, ContextSettings, CoordinateSystem, Hrtf,
    SpeakerLayout, Vector3, audio_buffer::AudioBuffer as NimbusBuffer,
};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

/// Capacity of the control-to-render command queue.
pub const COMMAND_CAPACITY: usize = 1024;

/// Commands applied per render-thread call; the rest wait for the next call.
pub const MAX_COMMANDS_PER_DRAIN: usize = 256;

/// Live sources the render state holds. Further insertions are handed back.
pub const MAX_SOURCES: usize = 64;

fn to_vector(v: Vec3) -> Vector3 {
    Vector3::new(v.x, v.y, v.z)
}

/// Everything the render thread touches. Only ever reached through `try_lock`.
struct RenderState {
    context: Context,
    hrtf: Hrtf,
    decode_effect: AmbisonicsDecodeEffect,

    sources: HashMap<SourceId, Box<SpatialSource>>,
    released: Sender<Released>,
    room: RoomEffects,
    listener: Pose,
    master_volume: f32,
    stereo_speaker_mode: bool,
    sample_rate: u32,

    // Cached buffers to avoid allocations
    ambisonics_buf: Vec<f32>,
    room_send_buf: Vec<f32>,
    decoded_buf: Vec<f32>,
    mix_buf: Vec<f32>,
}

impl RenderState {
    fn apply(&mut self, command: ApiCommand) {
        match command {
            ApiCommand::Insert(id, source) => {
                if self.sources.len() < MAX_SOURCES {
                    self.sources.insert(id, source);
                } else {
                    self.release(Released::Rejected(id, source));
                }
            }
            ApiCommand::Destroy(id) => {
                if let Some(source) = self.sources.remove(&id) {
                    self.release(Released::Destroyed(id, source));
                }
            }
            ApiCommand::MasterVolume(volume) => self.master_volume = volume,
            ApiCommand::StereoSpeakerMode(enabled) => self.stereo_speaker_mode = enabled,
            ApiCommand::HeadPosition(position) => {
                self.listener.position = position;
                self.room.set_listener_position(position);
            }
            ApiCommand::HeadRotation(rotation) => self.listener.rotation = rotation,
            ApiCommand::Source(id, param) => {
                if let Some(source) = self.sources.get_mut(&id) {
                    source.params.apply(param);
                }
            }
            ApiCommand::Reflections(properties) => {
                self.room.set_reflections(&properties);
                self.room.set_listener_position(self.listener.position);
            }
            ApiCommand::Reverb(properties) => self.room.set_reverb(&properties),
        }
    }

    fn release(&self, released: Released) {
        // Full only if the control side stops collecting; the source is then freed here
        let _ = self.released.try_send(released);
    }

    /// Renders one engine block into the interleaved `output`.
    fn render(&mut self, output: &mut [f32]) -> Result<()> {
        self.ambisonics_buf.fill(0.0);
        self.room_send_buf.fill(0.0);

        for source in self.sources.values_mut() {
            source.render(
                &self.listener,
                self.sample_rate,
                MixTargets {
                    ambisonics: &mut self.ambisonics_buf,
                    room_send: &mut self.room_send_buf,
                },
            )?;
        }

        self.decode()?;
        self.room.process(&self.room_send_buf, &mut self.mix_buf);

        for (out, mixed) in output.iter_mut().zip(&self.mix_buf) {
            *out = mixed * self.master_volume;
        }
        Ok(())
    }

    /// Decodes the world-frame ambisonic sum for the current listener orientation.
    fn decode(&mut self) -> Result<()> {
        let params = AmbisonicsDecodeEffectParams {
            order: MAX_AMBISONIC_ORDER as u32,
            hrtf: &self.hrtf,
            orientation: CoordinateSystem {
                right: to_vector(self.listener.right()),
                up: to_vector(self.listener.up()),
                ahead: to_vector(self.listener.forward()),
                ..Default::default()
            },
            binaural: !self.stereo_speaker_mode,
        };

        let mut input_ptrs = null_channel_ptrs::<NUM_AMBISONIC_CHANNELS>();
        let input_buf = NimbusBuffer::try_borrowed_with_data_and_settings(
            &self.ambisonics_buf,
            &mut input_ptrs,
            AudioBufferSettings {
                num_channels: Some(NUM_AMBISONIC_CHANNELS as u32),
                ..Default::default()
            },
        )
        .map_err(|e| {
            PetalSonicError::SpatialAudio(format!("Failed to create ambisonics buffer: {}", e))
        })?;
        let mut output_ptrs = null_channel_ptrs::<NUM_OUTPUT_CHANNELS>();
        let output_buf = NimbusBuffer::try_borrowed_with_data_and_settings(
            &mut self.decoded_buf,
            &mut output_ptrs,
            AudioBufferSettings {
                num_channels: Some(NUM_OUTPUT_CHANNELS as u32),
                ..Default::default()
            },
        )
        .map_err(|e| {
            PetalSonicError::SpatialAudio(format!("Failed to create decode buffer: {}", e))
        })?;

        self.decode_effect.apply(&params, &input_buf, &output_buf);
        output_buf.interleave(&self.context, &mut self.mix_buf);
        Ok(())
    }
}

/// [`SpatialAudioApi`] implemented on Steam Audio.
///
/// Sound objects are encoded into a second-order ambisonic bus in world
/// space and decoded once per block through the HRTF, with room reflections
/// and late reverb mixed on top. Rendering works on whole engine blocks of
/// `frames_per_buffer` frames.
///
/// # Thread Safety
///
/// Control calls only enqueue an [`ApiCommand`] on a bounded queue; the
/// audio thread drains it before each render. Sources are built by the
/// creating thread and handed back on destruction, so Steam Audio effects
/// are never created or freed on the audio thread. The audio thread reaches
/// the render state with `try_lock`, so it never waits: a contended lock
/// skips the block.
pub struct SteamAudioApi {
    context: Context,
    audio_settings: AudioSettings,
    commands: Sender<ApiCommand>,
    pending: Receiver<ApiCommand>,
    released: Receiver<Released>,
    next_id: AtomicI32,
    frame_size: usize,
    render: Mutex<RenderState>,
}

impl SteamAudioApi {
    pub fn new(desc: &BridgeDesc) -> Result<Self> {
        log::info!(
            "Initializing Steam Audio backend (sample_rate: {} Hz, frame_size: {})",
            desc.sample_rate,
            desc.frames_per_buffer
        );

        let context = Context::try_new(&ContextSettings::default()).map_err(|e| {
            PetalSonicError::SpatialAudio(format!("Failed to create Steam Audio context: {}", e))
        })?;

        let audio_settings = AudioSettings {
            sampling_rate: desc.sample_rate,
            frame_size: desc.frames_per_buffer as u32,
        };
        let hrtf = hrtf::load_hrtf(&context, &audio_settings, desc.hrtf_path.as_deref())?;

        let decode_effect = AmbisonicsDecodeEffect::try_new(
            &context,
            &audio_settings,
            &AmbisonicsDecodeEffectSettings {
                max_order: MAX_AMBISONIC_ORDER as u32,
                speaker_layout: SpeakerLayout::Stereo,
                hrtf: &hrtf,
            },
        )
        .map_err(|e| {
            PetalSonicError::SpatialAudio(format!("Failed to create AmbisonicsDecodeEffect: {}", e))
        })?;

        // Every release comes from a lifecycle command, and lifecycle calls collect first
        let (release_tx, released) = bounded(COMMAND_CAPACITY + 1);
        let frame_size = desc.frames_per_buffer;
        let state = RenderState {
            context: context.clone(),
            hrtf,
            decode_effect,
            // Twice the live limit keeps tombstone cleanup a rehash in place
            sources: HashMap::with_capacity(2 * MAX_SOURCES),
            released: release_tx,
            room: RoomEffects::new(desc.sample_rate),
            listener: Pose::identity(),
            master_volume: 1.0,
            stereo_speaker_mode: false,
            sample_rate: desc.sample_rate,
            ambisonics_buf: vec![0.0; frame_size * NUM_AMBISONIC_CHANNELS],
            room_send_buf: vec![0.0; frame_size],
            decoded_buf: vec![0.0; frame_size * NUM_OUTPUT_CHANNELS],
            mix_buf: vec![0.0; frame_size * NUM_OUTPUT_CHANNELS],
        };

        let (commands, pending) = bounded(COMMAND_CAPACITY);
        Ok(Self {
            context,
            audio_settings,
            commands,
            pending,
            released,
            next_id: AtomicI32::new(0),
            frame_size,
            render: Mutex::new(state),
        })
    }

    /// Builds a boxed engine; usable directly as an engine factory.
    pub fn boxed(desc: &BridgeDesc) -> Result<Box<dyn SpatialAudioApi>> {
        Ok(Box::new(Self::new(desc)?))
    }

    /// Queues a command. `false` means the queue is full and the command was dropped.
    fn send(&self, command: ApiCommand) -> bool {
        // The receiver lives in self, so the channel cannot be disconnected
        self.commands.try_send(command).is_ok()
    }

    fn send_param(&self, source_id: SourceId, param: SourceParam) {
        self.send(ApiCommand::Source(source_id, param));
    }

    /// Queues a source for the render state, or returns `INVALID` when the queue is full.
    fn insert(&self, source: SpatialSource) -> SourceId {
        let id = self.allocate_id();
        if self.send(ApiCommand::Insert(id, Box::new(source))) {
            id
        } else {
            log::warn!("Command queue full, dropping new source {}", id);
            SourceId::INVALID
        }
    }

    fn allocate_id(&self) -> SourceId {
        SourceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Frees sources the render thread has handed back. Control thread only.
    fn collect_released(&self) {
        for released in self.released.try_iter() {
            match released {
                Released::Destroyed(id, _) => log::debug!("Destroyed source {}", id),
                Released::Rejected(id, _) => log::warn!(
                    "Source {} discarded, {} sources already live",
                    id,
                    MAX_SOURCES
                ),
            }
        }
    }

    fn drain(&self, state: &mut RenderState) {
        for command in self.pending.try_iter().take(MAX_COMMANDS_PER_DRAIN) {
            state.apply(command);
        }
    }
}

impl SpatialAudioApi for SteamAudioApi {
    fn fill_interleaved_output_buffer(
        &self,
        num_channels: usize,
        num_frames: usize,
        output: &mut [f32],
    ) -> bool {
        if num_channels != NUM_OUTPUT_CHANNELS {
            return false;
        }
        let Ok(mut state) = self.render.try_lock() else {
            return false;
        };
        self.drain(&mut state);
        if num_frames == 0 {
            return true;
        }
        // A partial block is refused rather than rendered, so no effect state advances
        let samples = self.frame_size * NUM_OUTPUT_CHANNELS;
        if num_frames != self.frame_size || output.len() < samples {
            return false;
        }
        state.render(&mut output[..samples]).is_ok()
    }

    fn set_interleaved_buffer(
        &self,
        source_id: SourceId,
        input: &[f32],
        num_channels: usize,
        num_frames: usize,
    ) {
        let Ok(mut state) = self.render.try_lock() else {
            return;
        };
        self.drain(&mut state);
        if num_frames != self.frame_size {
            return;
        }
        if let Some(source) = state.sources.get_mut(&source_id) {
            source.set_input(input, num_channels, num_frames);
        }
    }

    fn set_master_volume(&self, volume: f32) {
        self.send(ApiCommand::MasterVolume(volume));
    }

    fn set_stereo_speaker_mode(&self, enabled: bool) {
        self.send(ApiCommand::StereoSpeakerMode(enabled));
    }

    fn set_head_position(&self, x: f32, y: f32, z: f32) {
        self.send(ApiCommand::HeadPosition(Vec3::new(x, y, z)));
    }

    fn set_head_rotation(&self, x: f32, y: f32, z: f32, w: f32) {
        self.send(ApiCommand::HeadRotation(Quat::from_xyzw(x, y, z, w)));
    }

    fn create_ambisonic_source(&self, num_channels: usize) -> SourceId {
        self.collect_released();
        if num_channels == 0 {
            log::warn!("Refusing to create a soundfield without channels");
            return SourceId::INVALID;
        }
        let id = self.insert(SpatialSource::soundfield(num_channels, self.frame_size));
        if id.is_valid() {
            log::debug!("Created soundfield {} ({} channels)", id, num_channels);
        }
        id
    }

    fn create_sound_object_source(&self, rendering_mode: RenderingMode) -> SourceId {
        self.collect_released();
        let effects =
            match SoundObjectEffects::new(&self.context, &self.audio_settings, rendering_mode) {
                Ok(effects) => effects,
                Err(e) => {
                    log::error!("Failed to create sound object: {}", e);
                    return SourceId::INVALID;
                }
            };
        let id = self.insert(SpatialSource::sound_object(effects, self.frame_size));
        if id.is_valid() {
            log::debug!("Created sound object {} ({:?})", id, rendering_mode);
        }
        id
    }

    fn destroy_source(&self, source_id: SourceId) {
        self.collect_released();
        if !self.send(ApiCommand::Destroy(source_id)) {
            log::warn!("Command queue full, source {} stays alive", source_id);
        }
    }

    fn set_source_position(&self, source_id: SourceId, x: f32, y: f32, z: f32) {
        self.send_param(source_id, SourceParam::Position(Vec3::new(x, y, z)));
    }

    fn set_source_rotation(&self, source_id: SourceId, x: f32, y: f32, z: f32, w: f32) {
        self.send_param(source_id, SourceParam::Rotation(Quat::from_xyzw(x, y, z, w)));
    }

    fn set_source_volume(&self, source_id: SourceId, volume: f32) {
        self.send_param(source_id, SourceParam::Volume(volume));
    }

    fn set_source_distance_attenuation(&self, source_id: SourceId, distance_attenuation: f32) {
        self.send_param(
            source_id,
            SourceParam::DistanceAttenuation(distance_attenuation),
        );
    }

    fn set_source_distance_model(
        &self,
        source_id: SourceId,
        rolloff: DistanceRolloffModel,
        min_distance: f32,
        max_distance: f32,
    ) {
        self.send_param(
            source_id,
            SourceParam::DistanceModel {
                rolloff,
                min_distance,
                max_distance,
            },
        );
    }

    fn set_source_room_effects_gain(&self, source_id: SourceId, room_effects_gain: f32) {
        self.send_param(source_id, SourceParam::RoomEffectsGain(room_effects_gain));
    }

    fn set_sound_object_directivity(&self, source_id: SourceId, alpha: f32, order: f32) {
        self.send_param(source_id, SourceParam::Directivity { alpha, order });
    }

    fn set_sound_object_listener_directivity(&self, source_id: SourceId, alpha: f32, order: f32) {
        self.send_param(source_id, SourceParam::ListenerDirectivity { alpha, order });
    }

    fn set_sound_object_near_field_effect_gain(&self, source_id: SourceId, gain: f32) {
        self.send_param(source_id, SourceParam::NearFieldGain(gain));
    }

    fn set_sound_object_occlusion_intensity(&self, source_id: SourceId, intensity: f32) {
        self.send_param(source_id, SourceParam::OcclusionIntensity(intensity));
    }

    fn set_sound_object_spread(&self, source_id: SourceId, spread_deg: f32) {
        self.send_param(source_id, SourceParam::Spread(spread_deg));
    }

    fn set_reflection_properties(&self, properties: &ReflectionProperties) {
        self.send(ApiCommand::Reflections(*properties));
    }

    fn set_reverb_properties(&self, properties: &ReverbProperties) {
        self.send(ApiCommand::Reverb(*properties));
    }
}
