// Steam Audio backend
//
// A concrete SpatialAudioApi: per-source direct effects and ambisonic
// encoding, one shared HRTF decode, and shoebox room effects.

mod attenuation;
mod command;
mod hrtf;
mod room_effects;
mod source;
mod steam;

pub use attenuation::{NEAR_FIELD_THRESHOLD, distance_attenuation, directivity_gain};
pub use steam::SteamAudioApi;
