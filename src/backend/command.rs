use super::source::SpatialSource;
use crate::api::{DistanceRolloffModel, SourceId};
use crate::math::{Quat, Vec3};
use crate::room::{ReflectionProperties, ReverbProperties};

/// A parameter change addressed to one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceParam {
    Position(Vec3),
    Rotation(Quat),
    Volume(f32),
    DistanceAttenuation(f32),
    DistanceModel {
        rolloff: DistanceRolloffModel,
        min_distance: f32,
        max_distance: f32,
    },
    RoomEffectsGain(f32),
    Directivity { alpha: f32, order: f32 },
    ListenerDirectivity { alpha: f32, order: f32 },
    NearFieldGain(f32),
    OcclusionIntensity(f32),
    Spread(f32),
}

/// Control-thread request, applied by the render thread before its next pass.
///
/// Sources arrive fully built so the render thread never creates Steam Audio
/// effects.
pub enum ApiCommand {
    Insert(SourceId, Box<SpatialSource>),
    Destroy(SourceId),
    MasterVolume(f32),
    StereoSpeakerMode(bool),
    HeadPosition(Vec3),
    HeadRotation(Quat),
    Source(SourceId, SourceParam),
    Reflections(ReflectionProperties),
    Reverb(ReverbProperties),
}

/// A source leaving the render state, handed back to be freed on the control thread.
pub enum Released {
    Destroyed(SourceId, Box<SpatialSource>),
    /// Arrived while the render state was already at capacity.
    Rejected(SourceId, Box<SpatialSource>),
}
