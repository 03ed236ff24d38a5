//! Source and listener parameter updates.
//!
//! Every operation loads the slot's current handle and forwards to the engine.
//! With no handle installed the operation does nothing (creators return
//! [`SourceId::INVALID`]). Nothing is buffered or batched here: an update takes
//! effect on the engine's next render pass.

use crate::api::{DistanceRolloffModel, RenderingMode, SourceId};
use crate::handle::EngineSlot;
use crate::math::Pose;
use crate::room::{
    NUM_REVERB_BANDS, RoomProperties, compute_reflection_properties, compute_reverb_properties,
    compute_reverb_properties_from_rt60s,
};
use std::sync::Arc;

/// Parameter entry point for the control thread.
///
/// Cloning is cheap; clones share the same [`EngineSlot`].
#[derive(Clone)]
pub struct SpatialGateway {
    slot: Arc<EngineSlot>,
}

impl SpatialGateway {
    pub fn new(slot: Arc<EngineSlot>) -> Self {
        Self { slot }
    }

    pub fn slot(&self) -> &Arc<EngineSlot> {
        &self.slot
    }

    /// Updates the listener's master gain.
    pub fn set_listener_gain(&self, gain: f32) {
        if let Some(handle) = self.slot.load() {
            handle.api().set_master_volume(gain);
        }
    }

    /// Switches between binaural and stereo speaker rendering.
    pub fn set_listener_stereo_speaker_mode(&self, enabled: bool) {
        if let Some(handle) = self.slot.load() {
            handle.api().set_stereo_speaker_mode(enabled);
        }
    }

    /// Updates the listener's position, then its rotation.
    pub fn set_listener_transform(&self, pose: Pose) {
        if let Some(handle) = self.slot.load() {
            let api = handle.api();
            let (p, q) = (pose.position, pose.rotation);
            api.set_head_position(p.x, p.y, p.z);
            api.set_head_rotation(q.x, q.y, q.z, q.w);
        }
    }

    /// Updates the room the listener is in.
    ///
    /// `None` disables room effects by applying the handle's null presets.
    /// Otherwise reflections are derived from the room, and reverb either from
    /// the room or, when given, from the explicit per-band `rt60s`.
    pub fn set_room_properties(
        &self,
        room: Option<&RoomProperties>,
        rt60s: Option<&[f32; NUM_REVERB_BANDS]>,
    ) {
        let Some(handle) = self.slot.load() else {
            return;
        };
        let api = handle.api();

        let Some(room) = room else {
            api.set_reflection_properties(handle.null_reflection());
            api.set_reverb_properties(handle.null_reverb());
            return;
        };

        api.set_reflection_properties(&compute_reflection_properties(room));
        let reverb = match rt60s {
            Some(rt60s) => compute_reverb_properties_from_rt60s(
                rt60s,
                room.reverb_brightness,
                room.reverb_time,
                room.reverb_gain,
            ),
            None => compute_reverb_properties(room),
        };
        api.set_reverb_properties(&reverb);
    }

    /// Creates an ambisonic soundfield source.
    pub fn create_soundfield(&self, num_channels: usize) -> SourceId {
        match self.slot.load() {
            Some(handle) => handle.api().create_ambisonic_source(num_channels),
            None => SourceId::INVALID,
        }
    }

    /// Creates a mono sound object with automatic distance attenuation disabled.
    ///
    /// The caller drives attenuation through [`Self::set_source_distance_attenuation`]
    /// until it picks another model with [`Self::set_source_distance_model`].
    pub fn create_sound_object(&self, rendering_mode: RenderingMode) -> SourceId {
        let Some(handle) = self.slot.load() else {
            return SourceId::INVALID;
        };
        let api = handle.api();
        let id = api.create_sound_object_source(rendering_mode);
        api.set_source_distance_model(id, DistanceRolloffModel::None, 0.0, 0.0);
        log::debug!("Created sound object {} ({:?})", id, rendering_mode);
        id
    }

    /// Releases a source. The id must not be used afterwards.
    pub fn destroy_source(&self, id: SourceId) {
        if let Some(handle) = self.slot.load() {
            handle.api().destroy_source(id);
            log::debug!("Destroyed source {}", id);
        }
    }

    /// Updates a source's position, then its rotation.
    pub fn set_source_transform(&self, id: SourceId, pose: Pose) {
        if let Some(handle) = self.slot.load() {
            let api = handle.api();
            let (p, q) = (pose.position, pose.rotation);
            api.set_source_position(id, p.x, p.y, p.z);
            api.set_source_rotation(id, q.x, q.y, q.z, q.w);
        }
    }

    pub fn set_source_gain(&self, id: SourceId, gain: f32) {
        if let Some(handle) = self.slot.load() {
            handle.api().set_source_volume(id, gain);
        }
    }

    /// Sets the source's emission pattern: `alpha` blends omni (0) to dipole (1),
    /// `order` sharpens it.
    pub fn set_source_directivity(&self, id: SourceId, alpha: f32, order: f32) {
        if let Some(handle) = self.slot.load() {
            handle.api().set_sound_object_directivity(id, alpha, order);
        }
    }

    /// Sets the listener's sensitivity pattern towards this source.
    pub fn set_source_listener_directivity(&self, id: SourceId, alpha: f32, order: f32) {
        if let Some(handle) = self.slot.load() {
            handle
                .api()
                .set_sound_object_listener_directivity(id, alpha, order);
        }
    }

    pub fn set_source_spread(&self, id: SourceId, spread_deg: f32) {
        if let Some(handle) = self.slot.load() {
            handle.api().set_sound_object_spread(id, spread_deg);
        }
    }

    pub fn set_source_near_field_effect_gain(&self, id: SourceId, gain: f32) {
        if let Some(handle) = self.slot.load() {
            handle.api().set_sound_object_near_field_effect_gain(id, gain);
        }
    }

    pub fn set_source_occlusion_intensity(&self, id: SourceId, intensity: f32) {
        if let Some(handle) = self.slot.load() {
            handle.api().set_sound_object_occlusion_intensity(id, intensity);
        }
    }

    pub fn set_source_room_effects_gain(&self, id: SourceId, gain: f32) {
        if let Some(handle) = self.slot.load() {
            handle.api().set_source_room_effects_gain(id, gain);
        }
    }

    pub fn set_source_distance_attenuation(&self, id: SourceId, attenuation: f32) {
        if let Some(handle) = self.slot.load() {
            handle.api().set_source_distance_attenuation(id, attenuation);
        }
    }

    pub fn set_source_distance_model(
        &self,
        id: SourceId,
        rolloff: DistanceRolloffModel,
        min_distance: f32,
        max_distance: f32,
    ) {
        if let Some(handle) = self.slot.load() {
            handle
                .api()
                .set_source_distance_model(id, rolloff, min_distance, max_distance);
        }
    }
}
