//! Room acoustics.
//!
//! A [`RoomProperties`] describes a shoebox room: where it is, how big it is
//! and what its six walls are made of. The pure functions in this module turn
//! it into the two parameter sets the engine consumes:
//!
//! - [`ReflectionProperties`]: one reflection coefficient per wall, for early reflections
//! - [`ReverbProperties`]: reverberation time per octave band, for the late tail
//!
//! Reverberation times can also be supplied directly with
//! [`compute_reverb_properties_from_rt60s`], bypassing the geometric estimate.

pub mod material;
pub mod properties;

pub use material::{NUM_REVERB_BANDS, OCTAVE_BAND_CENTRES_HZ, WallMaterial};
pub use properties::{
    ReflectionProperties, ReverbProperties, RoomProperties, SPEED_OF_SOUND, Wall,
    compute_reflection_properties, compute_reverb_properties,
    compute_reverb_properties_from_rt60s,
};
