//! Call contract of the spatialization engine.
//!
//! [`SpatialAudioApi`] is everything the bridge needs from an engine: source
//! lifecycle, per-source and listener parameters, room acoustics, and the two
//! audio-thread calls that feed source input and render the listener mix.
//!
//! # Thread Safety
//!
//! All methods take `&self`. The bridge calls parameter setters from a control
//! thread while the audio thread is inside [`SpatialAudioApi::fill_interleaved_output_buffer`],
//! with no lock around either. Implementations own the job of making that safe.

mod types;

pub use types::{DistanceRolloffModel, RenderingMode, SourceId};

use crate::room::{ReflectionProperties, ReverbProperties};

pub trait SpatialAudioApi: Send + Sync {
    /// Renders the listener mix into `output` as interleaved samples.
    ///
    /// Returns `false` when no valid output was produced this cycle. The
    /// contents of `output` are then unspecified.
    /// Must be called from the audio thread.
    fn fill_interleaved_output_buffer(
        &self,
        num_channels: usize,
        num_frames: usize,
        output: &mut [f32],
    ) -> bool;

    /// Hands the next interleaved input buffer of a source to the engine.
    /// Must be called from the audio thread.
    fn set_interleaved_buffer(
        &self,
        source_id: SourceId,
        input: &[f32],
        num_channels: usize,
        num_frames: usize,
    );

    fn set_master_volume(&self, volume: f32);

    fn set_stereo_speaker_mode(&self, enabled: bool);

    fn set_head_position(&self, x: f32, y: f32, z: f32);

    fn set_head_rotation(&self, x: f32, y: f32, z: f32, w: f32);

    /// Creates an ambiX soundfield source with `num_channels` ambisonic channels.
    fn create_ambisonic_source(&self, num_channels: usize) -> SourceId;

    /// Creates a mono sound object source.
    fn create_sound_object_source(&self, rendering_mode: RenderingMode) -> SourceId;

    fn destroy_source(&self, source_id: SourceId);

    fn set_source_position(&self, source_id: SourceId, x: f32, y: f32, z: f32);

    fn set_source_rotation(&self, source_id: SourceId, x: f32, y: f32, z: f32, w: f32);

    fn set_source_volume(&self, source_id: SourceId, volume: f32);

    /// Overrides the distance attenuation. Only effective with [`DistanceRolloffModel::None`].
    fn set_source_distance_attenuation(&self, source_id: SourceId, distance_attenuation: f32);

    fn set_source_distance_model(
        &self,
        source_id: SourceId,
        rolloff: DistanceRolloffModel,
        min_distance: f32,
        max_distance: f32,
    );

    fn set_source_room_effects_gain(&self, source_id: SourceId, room_effects_gain: f32);

    fn set_sound_object_directivity(&self, source_id: SourceId, alpha: f32, order: f32);

    fn set_sound_object_listener_directivity(&self, source_id: SourceId, alpha: f32, order: f32);

    fn set_sound_object_near_field_effect_gain(&self, source_id: SourceId, gain: f32);

    fn set_sound_object_occlusion_intensity(&self, source_id: SourceId, intensity: f32);

    fn set_sound_object_spread(&self, source_id: SourceId, spread_deg: f32);

    fn set_reflection_properties(&self, properties: &ReflectionProperties);

    fn set_reverb_properties(&self, properties: &ReverbProperties);
}
