/// Identifier of a source registered with the spatialization engine.
///
/// Ids are handed out by the engine on creation. Once destroyed, an id must
/// not be used again by the caller even if the engine recycles it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub(crate) i32);

impl SourceId {
    /// Sentinel returned when no source could be created. Operations on it are no-ops.
    pub const INVALID: SourceId = SourceId(-1);

    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SourceId({})", self.0)
    }
}

/// Quality/method used to render a sound object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderingMode {
    /// First-order ambisonics panned to stereo speakers
    StereoPanning,
    /// First-order ambisonics with HRTF decoding
    BinauralLowQuality,
    /// Second-order ambisonics with HRTF decoding
    BinauralMediumQuality,
    /// Highest order available with HRTF decoding
    #[default]
    BinauralHighQuality,
    /// Only the room (reflections and reverb) contribution is rendered
    RoomEffectsOnly,
}

/// Automatic distance attenuation curve applied to a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceRolloffModel {
    /// Attenuation falls off with the logarithm of distance, from 1 at min to 0 at max
    Logarithmic,
    /// Attenuation falls off linearly between min and max distance
    Linear,
    /// No automatic attenuation; the caller supplies it
    #[default]
    None,
}
