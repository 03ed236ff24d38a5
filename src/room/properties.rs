use super::material::{NUM_REVERB_BANDS, WallMaterial};
use crate::math::{Quat, Vec3};

/// Speed of sound in air, in metres per second.
pub const SPEED_OF_SOUND: f32 = 343.0;

/// Sabine's constant, in seconds per metre.
const SABINE_CONSTANT: f32 = 0.161;

/// Air absorption coefficient per octave band, in 1/m (20 °C, 50% humidity).
const AIR_ABSORPTION: [f32; NUM_REVERB_BANDS] = [
    0.0, 0.0, 0.0001, 0.0003, 0.0006, 0.0010, 0.0019, 0.0058, 0.0203,
];

/// Surfaces of a shoebox room, indexing the six-element arrays below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wall {
    /// -X
    Left = 0,
    /// +X
    Right = 1,
    /// -Y
    Floor = 2,
    /// +Y
    Ceiling = 3,
    /// -Z
    Front = 4,
    /// +Z
    Back = 5,
}

impl Wall {
    pub const ALL: [Wall; 6] = [
        Wall::Left,
        Wall::Right,
        Wall::Floor,
        Wall::Ceiling,
        Wall::Front,
        Wall::Back,
    ];

    /// Area of this wall for a room of the given dimensions.
    pub fn area(self, dimensions: Vec3) -> f32 {
        match self {
            Wall::Left | Wall::Right => dimensions.y * dimensions.z,
            Wall::Floor | Wall::Ceiling => dimensions.x * dimensions.z,
            Wall::Front | Wall::Back => dimensions.x * dimensions.y,
        }
    }
}

/// Geometry and materials of a shoebox room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomProperties {
    /// Centre of the room in world space
    pub position: Vec3,
    pub rotation: Quat,
    /// Width, height and depth in metres
    pub dimensions: Vec3,
    /// One material per [`Wall`], in declaration order
    pub materials: [WallMaterial; 6],
    /// Scales all reflection coefficients
    pub reflection_scalar: f32,
    pub reverb_gain: f32,
    /// Scales all reverberation times
    pub reverb_time: f32,
    /// Tilts reverberation times towards high (> 0) or low (< 0) bands, in [-1, 1]
    pub reverb_brightness: f32,
}

impl Default for RoomProperties {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            dimensions: Vec3::ZERO,
            materials: [WallMaterial::TRANSPARENT; 6],
            reflection_scalar: 1.0,
            reverb_gain: 1.0,
            reverb_time: 1.0,
            reverb_brightness: 0.0,
        }
    }
}

impl RoomProperties {
    pub fn volume(&self) -> f32 {
        self.dimensions.x * self.dimensions.y * self.dimensions.z
    }

    pub fn surface_area(&self) -> f32 {
        Wall::ALL.iter().map(|wall| wall.area(self.dimensions)).sum()
    }
}

/// Early reflection parameters derived from a room.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectionProperties {
    pub room_position: Vec3,
    pub room_rotation: Quat,
    pub room_dimensions: Vec3,
    /// Pressure reflection coefficient per [`Wall`]
    pub coefficients: [f32; 6],
    pub gain: f32,
}

impl ReflectionProperties {
    /// Preset that turns early reflections off.
    pub fn disabled() -> Self {
        Self {
            room_position: Vec3::ZERO,
            room_rotation: Quat::IDENTITY,
            room_dimensions: Vec3::ZERO,
            coefficients: [0.0; 6],
            gain: 0.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.gain > 0.0 && self.coefficients.iter().any(|&c| c > 0.0)
    }
}

impl Default for ReflectionProperties {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Late reverberation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbProperties {
    /// Reverberation time per octave band, in seconds
    pub rt60_values: [f32; NUM_REVERB_BANDS],
    pub gain: f32,
}

impl ReverbProperties {
    /// Preset that turns the late reverb off.
    pub fn disabled() -> Self {
        Self {
            rt60_values: [0.0; NUM_REVERB_BANDS],
            gain: 0.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.gain > 0.0 && self.rt60_values.iter().any(|&t| t > 0.0)
    }

    /// Mean reverberation time over the given band range.
    pub fn mean_rt60(&self, bands: std::ops::Range<usize>) -> f32 {
        let len = bands.len();
        if len == 0 {
            return 0.0;
        }
        self.rt60_values[bands].iter().sum::<f32>() / len as f32
    }
}

impl Default for ReverbProperties {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Derives early reflection parameters from room geometry and materials.
///
/// Each wall's coefficient is `reflection_scalar * sqrt(1 - mean absorption)`,
/// the pressure counterpart of the energy reflected by the surface.
pub fn compute_reflection_properties(room: &RoomProperties) -> ReflectionProperties {
    let mut coefficients = [0.0; 6];
    for wall in Wall::ALL {
        let absorption = room.materials[wall as usize].mean_absorption().clamp(0.0, 1.0);
        coefficients[wall as usize] = (room.reflection_scalar * (1.0 - absorption).sqrt()).max(0.0);
    }

    ReflectionProperties {
        room_position: room.position,
        room_rotation: room.rotation,
        room_dimensions: room.dimensions,
        coefficients,
        gain: 1.0,
    }
}

/// Derives per-band reverberation times from room geometry using Eyring's formula.
///
/// Rooms with no volume, or whose surfaces absorb everything, produce zero RT60s.
pub fn compute_reverb_properties(room: &RoomProperties) -> ReverbProperties {
    let volume = room.volume();
    let surface_area = room.surface_area();
    let mut rt60_values = [0.0; NUM_REVERB_BANDS];

    if volume > 0.0 && surface_area > 0.0 {
        for (band, rt60) in rt60_values.iter_mut().enumerate() {
            let absorbed: f32 = Wall::ALL
                .iter()
                .map(|&wall| wall.area(room.dimensions) * room.materials[wall as usize].absorption[band])
                .sum();
            let mean_absorption = absorbed / surface_area;
            if mean_absorption >= 1.0 {
                continue;
            }

            let denominator = -surface_area * (1.0 - mean_absorption).ln()
                + 4.0 * AIR_ABSORPTION[band] * volume;
            if denominator > 0.0 {
                *rt60 = SABINE_CONSTANT * volume / denominator;
            }
        }
    }

    adjust_reverb(
        rt60_values,
        room.reverb_brightness,
        room.reverb_time,
        room.reverb_gain,
    )
}

/// Builds reverb parameters from explicit per-band reverberation times.
pub fn compute_reverb_properties_from_rt60s(
    rt60s: &[f32; NUM_REVERB_BANDS],
    brightness: f32,
    time_scalar: f32,
    gain: f32,
) -> ReverbProperties {
    adjust_reverb(*rt60s, brightness, time_scalar, gain)
}

fn adjust_reverb(
    mut rt60_values: [f32; NUM_REVERB_BANDS],
    brightness: f32,
    time_scalar: f32,
    gain: f32,
) -> ReverbProperties {
    let brightness = brightness.clamp(-1.0, 1.0);
    let last_band = (NUM_REVERB_BANDS - 1) as f32;
    for (band, rt60) in rt60_values.iter_mut().enumerate() {
        // -1 at the lowest band, +1 at the highest
        let tilt = 2.0 * band as f32 / last_band - 1.0;
        let modifier = (1.0 + brightness * tilt).max(0.0);
        *rt60 = (*rt60 * modifier * time_scalar).max(0.0);
    }

    ReverbProperties {
        rt60_values,
        gain: gain.max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plaster_room() -> RoomProperties {
        RoomProperties {
            dimensions: Vec3::new(6.0, 3.0, 8.0),
            materials: [WallMaterial::PLASTER_SMOOTH; 6],
            ..Default::default()
        }
    }

    #[test]
    fn transparent_room_has_no_reflections_or_reverb() {
        let room = RoomProperties {
            dimensions: Vec3::new(4.0, 3.0, 5.0),
            ..Default::default()
        };

        let reflections = compute_reflection_properties(&room);
        assert_eq!(reflections.coefficients, [0.0; 6]);
        assert!(!reflections.is_enabled());

        let reverb = compute_reverb_properties(&room);
        assert_eq!(reverb.rt60_values, [0.0; NUM_REVERB_BANDS]);
        assert!(!reverb.is_enabled());
    }

    #[test]
    fn zero_volume_room_has_no_reverb() {
        let room = RoomProperties {
            materials: [WallMaterial::MARBLE; 6],
            ..Default::default()
        };
        assert!(!compute_reverb_properties(&room).is_enabled());
    }

    #[test]
    fn hard_walls_reflect_more_than_soft_walls() {
        let mut room = plaster_room();
        room.materials[Wall::Left as usize] = WallMaterial::CURTAIN_HEAVY;

        let reflections = compute_reflection_properties(&room);
        assert!(reflections.is_enabled());
        assert!(
            reflections.coefficients[Wall::Right as usize]
                > reflections.coefficients[Wall::Left as usize]
        );
        assert_eq!(reflections.room_dimensions, room.dimensions);
    }

    #[test]
    fn reverb_time_grows_with_room_size_and_shrinks_with_absorption() {
        let small = plaster_room();
        let large = RoomProperties {
            dimensions: small.dimensions * 2.0,
            ..small.clone()
        };
        let damped = RoomProperties {
            materials: [WallMaterial::CURTAIN_HEAVY; 6],
            ..small.clone()
        };

        let small_rt = compute_reverb_properties(&small).mean_rt60(3..6);
        let large_rt = compute_reverb_properties(&large).mean_rt60(3..6);
        let damped_rt = compute_reverb_properties(&damped).mean_rt60(3..6);

        assert!(small_rt > 0.0);
        assert!(large_rt > small_rt);
        assert!(damped_rt < small_rt);
    }

    #[test]
    fn explicit_rt60s_are_scaled_and_tilted() {
        let rt60s = [1.0; NUM_REVERB_BANDS];

        let flat = compute_reverb_properties_from_rt60s(&rt60s, 0.0, 2.0, 0.5);
        assert_eq!(flat.rt60_values, [2.0; NUM_REVERB_BANDS]);
        assert_eq!(flat.gain, 0.5);

        let bright = compute_reverb_properties_from_rt60s(&rt60s, 0.5, 1.0, 1.0);
        assert!(bright.rt60_values[NUM_REVERB_BANDS - 1] > bright.rt60_values[0]);
        assert!((bright.rt60_values[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disabled_presets_are_inert() {
        assert!(!ReflectionProperties::disabled().is_enabled());
        assert!(!ReverbProperties::disabled().is_enabled());
        assert_eq!(ReverbProperties::default(), ReverbProperties::disabled());
    }
}
