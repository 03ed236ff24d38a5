use super::attenuation::{
    ambisonic_order, directivity_gain, distance_attenuation, near_field_boost, occlusion_pole,
    spread_directional_gain,
};
use super::command::SourceParam;
use crate::api::{DistanceRolloffModel, RenderingMode};
use crate::error::{PetalSonicError, Result};
use crate::math::{Pose, Quat, Vec3};
use audionimbus::{
    AmbisonicsEncodeEffect, AmbisonicsEncodeEffectParams, AmbisonicsEncodeEffectSettings,
    AudioBufferSettings, AudioSettings, Context, DirectEffect, DirectEffectParams,
    DirectEffectSettings, Direction, Sample, audio_buffer::AudioBuffer as NimbusBuffer,
};

/// Highest ambisonic order rendered by the backend.
pub const MAX_AMBISONIC_ORDER: usize = 2;

/// Channel count of a [`MAX_AMBISONIC_ORDER`] soundfield.
pub const NUM_AMBISONIC_CHANNELS: usize = (MAX_AMBISONIC_ORDER + 1) * (MAX_AMBISONIC_ORDER + 1);

/// Empty channel-pointer table for one borrowed Steam Audio buffer.
pub fn null_channel_ptrs<const N: usize>() -> [*mut Sample; N] {
    [std::ptr::null_mut(); N]
}

/// Gain converting an ambiX (SN3D) channel to the N3D normalization the decoder expects.
pub fn sn3d_to_n3d(channel: usize) -> f32 {
    let order = (channel as f32).sqrt().floor();
    (2.0 * order + 1.0).sqrt()
}

/// Parameters shared by every source kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceParams {
    pub position: Vec3,
    pub rotation: Quat,
    pub volume: f32,
    pub distance_attenuation: f32,
    pub rolloff: DistanceRolloffModel,
    pub min_distance: f32,
    pub max_distance: f32,
    pub room_effects_gain: f32,
    pub directivity: (f32, f32),
    pub listener_directivity: (f32, f32),
    pub near_field_gain: f32,
    pub occlusion_intensity: f32,
    pub spread_deg: f32,
}

impl Default for SourceParams {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            volume: 1.0,
            distance_attenuation: 1.0,
            rolloff: DistanceRolloffModel::Logarithmic,
            min_distance: 1.0,
            max_distance: 500.0,
            room_effects_gain: 1.0,
            directivity: (0.0, 1.0),
            listener_directivity: (0.0, 1.0),
            near_field_gain: 0.0,
            occlusion_intensity: 0.0,
            spread_deg: 0.0,
        }
    }
}

impl SourceParams {
    pub fn apply(&mut self, param: SourceParam) {
        match param {
            SourceParam::Position(position) => self.position = position,
            SourceParam::Rotation(rotation) => self.rotation = rotation,
            SourceParam::Volume(volume) => self.volume = volume,
            SourceParam::DistanceAttenuation(value) => self.distance_attenuation = value,
            SourceParam::DistanceModel {
                rolloff,
                min_distance,
                max_distance,
            } => {
                self.rolloff = rolloff;
                self.min_distance = min_distance;
                self.max_distance = max_distance;
            }
            SourceParam::RoomEffectsGain(gain) => self.room_effects_gain = gain,
            SourceParam::Directivity { alpha, order } => self.directivity = (alpha, order),
            SourceParam::ListenerDirectivity { alpha, order } => {
                self.listener_directivity = (alpha, order)
            }
            SourceParam::NearFieldGain(gain) => self.near_field_gain = gain,
            SourceParam::OcclusionIntensity(intensity) => self.occlusion_intensity = intensity,
            SourceParam::Spread(spread) => self.spread_deg = spread,
        }
    }

    /// Gain applied before the direct effect: volume and near-field boost.
    pub fn input_gain(&self, distance: f32) -> f32 {
        self.volume * near_field_boost(self.near_field_gain, distance)
    }

    /// Direct-path attenuation in `[0, 1]`: distance model times both directivity patterns.
    pub fn direct_gain(&self, listener: &Pose, distance: f32, to_source: Vec3) -> f32 {
        let attenuation = distance_attenuation(
            self.rolloff,
            distance,
            self.min_distance,
            self.max_distance,
        )
        .unwrap_or(self.distance_attenuation);

        let source_forward = self.rotation * -Vec3::Z;
        let (alpha, order) = self.directivity;
        let source_pattern = directivity_gain(alpha, order, source_forward, -to_source);
        let (alpha, order) = self.listener_directivity;
        let listener_pattern = directivity_gain(alpha, order, listener.forward(), to_source);

        (attenuation * source_pattern * listener_pattern).clamp(0.0, 1.0)
    }
}

/// Steam Audio effects owned by one sound object.
pub struct SoundObjectEffects {
    mode: RenderingMode,
    direct_effect: DirectEffect,
    encode_effect: AmbisonicsEncodeEffect,
    occlusion_state: f32,
    direct_buf: Vec<f32>,
    encode_buf: Vec<f32>,
}

impl SoundObjectEffects {
    pub fn new(context: &Context, audio_settings: &AudioSettings, mode: RenderingMode) -> Result<Self> {
        let direct_effect = DirectEffect::try_new(
            context,
            audio_settings,
            &DirectEffectSettings { num_channels: 1 },
        )
        .map_err(|e| PetalSonicError::SpatialAudio(format!("Failed to create DirectEffect: {}", e)))?;

        let encode_effect = AmbisonicsEncodeEffect::try_new(
            context,
            audio_settings,
            &AmbisonicsEncodeEffectSettings {
                max_order: MAX_AMBISONIC_ORDER as u32,
            },
        )
        .map_err(|e| {
            PetalSonicError::SpatialAudio(format!("Failed to create AmbisonicsEncodeEffect: {}", e))
        })?;

        let frame_size = audio_settings.frame_size as usize;
        Ok(Self {
            mode,
            direct_effect,
            encode_effect,
            occlusion_state: 0.0,
            direct_buf: vec![0.0; frame_size],
            encode_buf: vec![0.0; frame_size * NUM_AMBISONIC_CHANNELS],
        })
    }
}

pub enum SourceKind {
    SoundObject(Box<SoundObjectEffects>),
    Soundfield { num_channels: usize },
}

/// Render-side state of one source.
pub struct SpatialSource {
    pub params: SourceParams,
    pub kind: SourceKind,
    /// Planar input of the current block, one `frame_size` run per channel
    input: Vec<f32>,
    has_input: bool,
}

/// Mix targets a source renders into.
pub struct MixTargets<'a> {
    /// Planar ambisonic sum, [`NUM_AMBISONIC_CHANNELS`] runs of `frame_size`
    pub ambisonics: &'a mut [f32],
    /// Mono send to the room effects
    pub room_send: &'a mut [f32],
}

impl SpatialSource {
    pub fn sound_object(effects: SoundObjectEffects, frame_size: usize) -> Self {
        Self {
            params: SourceParams::default(),
            kind: SourceKind::SoundObject(Box::new(effects)),
            input: vec![0.0; frame_size],
            has_input: false,
        }
    }

    pub fn soundfield(num_channels: usize, frame_size: usize) -> Self {
        Self {
            params: SourceParams::default(),
            kind: SourceKind::Soundfield { num_channels },
            input: vec![0.0; frame_size * num_channels],
            has_input: false,
        }
    }

    pub fn num_channels(&self) -> usize {
        match self.kind {
            SourceKind::SoundObject(_) => 1,
            SourceKind::Soundfield { num_channels } => num_channels,
        }
    }

    /// Stores one interleaved engine block, de-interleaved to planar runs.
    ///
    /// Returns `false` and keeps the previous state when the layout does not
    /// match this source or the block is not exactly one engine block long.
    pub fn set_input(&mut self, input: &[f32], num_channels: usize, num_frames: usize) -> bool {
        let frame_size = self.input.len() / self.num_channels();
        if num_channels != self.num_channels()
            || num_frames != frame_size
            || input.len() < num_channels * num_frames
        {
            return false;
        }

        for (channel, run) in self.input.chunks_exact_mut(frame_size).enumerate() {
            for (frame, sample) in run.iter_mut().enumerate() {
                *sample = input[frame * num_channels + channel];
            }
        }
        self.has_input = true;
        true
    }

    /// Renders the pending input block into `mix` and consumes it.
    pub fn render(&mut self, listener: &Pose, sample_rate: u32, mut mix: MixTargets<'_>) -> Result<()> {
        if !self.has_input {
            return Ok(());
        }
        self.has_input = false;

        match &mut self.kind {
            SourceKind::Soundfield { num_channels } => {
                let frame_size = self.input.len() / *num_channels;
                let used = (*num_channels).min(NUM_AMBISONIC_CHANNELS);
                for channel in 0..used {
                    let gain = self.params.volume * sn3d_to_n3d(channel);
                    let run = &self.input[channel * frame_size..(channel + 1) * frame_size];
                    let target = &mut mix.ambisonics[channel * frame_size..(channel + 1) * frame_size];
                    for (out, sample) in target.iter_mut().zip(run) {
                        *out += sample * gain;
                    }
                }
                Ok(())
            }
            SourceKind::SoundObject(effects) => {
                render_sound_object(&self.params, effects, &mut self.input, listener, sample_rate, mix)
            }
        }
    }
}

fn render_sound_object(
    params: &SourceParams,
    effects: &mut SoundObjectEffects,
    input: &mut [f32],
    listener: &Pose,
    sample_rate: u32,
    mut mix: MixTargets<'_>,
) -> Result<()> {
    let frame_size = input.len();
    let distance = listener.position.distance(params.position);
    let to_source = listener
        .direction_to(params.position)
        .unwrap_or_else(|| listener.forward());

    // Volume, near-field boost, then the occlusion low-pass
    let gain = params.input_gain(distance);
    let pole = occlusion_pole(params.occlusion_intensity, sample_rate);
    let mut state = effects.occlusion_state;
    for sample in input.iter_mut() {
        state = (1.0 - pole) * *sample * gain + pole * state;
        *sample = state;
    }
    effects.occlusion_state = state;

    let direct_params = DirectEffectParams {
        distance_attenuation: Some(params.direct_gain(listener, distance, to_source)),
        air_absorption: None,
        directivity: None,
        occlusion: None,
        transmission: None,
    };
    let mut input_ptrs = null_channel_ptrs::<1>();
    let input_buf = NimbusBuffer::try_borrowed_with_data_and_settings(
        &*input,
        &mut input_ptrs,
        AudioBufferSettings {
            num_channels: Some(1),
            ..Default::default()
        },
    )
    .map_err(|e| PetalSonicError::SpatialAudio(format!("Failed to create input buffer: {}", e)))?;
    let mut direct_ptrs = null_channel_ptrs::<1>();
    let direct_buf = NimbusBuffer::try_borrowed_with_data_and_settings(
        &mut effects.direct_buf,
        &mut direct_ptrs,
        AudioBufferSettings {
            num_channels: Some(1),
            ..Default::default()
        },
    )
    .map_err(|e| PetalSonicError::SpatialAudio(format!("Failed to create direct buffer: {}", e)))?;
    effects
        .direct_effect
        .apply(&direct_params, &input_buf, &direct_buf);

    for (send, sample) in mix.room_send.iter_mut().zip(&effects.direct_buf) {
        *send += sample * params.room_effects_gain;
    }

    let Some(order) = ambisonic_order(effects.mode) else {
        return Ok(());
    };

    let encode_params = AmbisonicsEncodeEffectParams {
        direction: Direction::new(to_source.x, to_source.y, to_source.z),
        order: order as u32,
    };
    let num_channels = (order + 1) * (order + 1);
    effects.encode_buf.fill(0.0);
    {
        let mut direct_ptrs = null_channel_ptrs::<1>();
        let mut encoded_ptrs = null_channel_ptrs::<NUM_AMBISONIC_CHANNELS>();
        let direct_in = NimbusBuffer::try_borrowed_with_data_and_settings(
            &effects.direct_buf,
            &mut direct_ptrs,
            AudioBufferSettings {
                num_channels: Some(1),
                ..Default::default()
            },
        )
        .map_err(|e| PetalSonicError::SpatialAudio(format!("Failed to create direct buffer: {}", e)))?;
        let encoded = NimbusBuffer::try_borrowed_with_data_and_settings(
            &mut effects.encode_buf[..num_channels * frame_size],
            &mut encoded_ptrs[..num_channels],
            AudioBufferSettings {
                num_channels: Some(num_channels as u32),
                ..Default::default()
            },
        )
        .map_err(|e| PetalSonicError::SpatialAudio(format!("Failed to create encode buffer: {}", e)))?;
        effects
            .encode_effect
            .apply(&encode_params, &direct_in, &encoded);
    }

    // Spread widens the source by pulling back the directional components
    let directional = spread_directional_gain(params.spread_deg);
    for (channel, run) in effects.encode_buf[..num_channels * frame_size]
        .chunks_exact(frame_size)
        .enumerate()
    {
        let weight = if channel == 0 { 1.0 } else { directional };
        let target = &mut mix.ambisonics[channel * frame_size..(channel + 1) * frame_size];
        for (out, sample) in target.iter_mut().zip(run) {
            *out += sample * weight;
        }
    }
    Ok(())
}
