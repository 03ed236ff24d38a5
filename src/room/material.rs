//! Acoustic wall materials.
//!
//! Absorption is given per octave band, matching [`OCTAVE_BAND_CENTRES_HZ`].
//! The two lowest bands reuse the 125 Hz value and the 8 kHz band reuses the
//! 4 kHz value, since published tables rarely measure outside 125 Hz – 4 kHz.

/// Number of octave bands used for reverberation times and absorption.
pub const NUM_REVERB_BANDS: usize = 9;

/// Centre frequencies of the octave bands, in Hz.
pub const OCTAVE_BAND_CENTRES_HZ: [f32; NUM_REVERB_BANDS] = [
    31.25, 62.5, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0,
];

/// Acoustic properties of a room surface.
///
/// # Example
///
/// ```
/// use petalsonic_bridge::room::WallMaterial;
///
/// let walls = WallMaterial::PLASTER_SMOOTH;
/// assert!(walls.mean_absorption() < 0.1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallMaterial {
    /// Fraction of incident energy absorbed in each octave band (0.0 - 1.0)
    pub absorption: [f32; NUM_REVERB_BANDS],
}

/// Expands a 125 Hz – 4 kHz absorption table to all bands.
const fn bands(a: [f32; 6]) -> [f32; NUM_REVERB_BANDS] {
    [a[0], a[0], a[0], a[1], a[2], a[3], a[4], a[5], a[5]]
}

impl WallMaterial {
    /// Fully absorbing surface: an open side of the room
    pub const TRANSPARENT: Self = Self {
        absorption: [1.0; NUM_REVERB_BANDS],
    };

    pub const ACOUSTIC_CEILING_TILES: Self = Self {
        absorption: bands([0.70, 0.66, 0.72, 0.92, 0.88, 0.75]),
    };

    pub const BRICK_BARE: Self = Self {
        absorption: bands([0.03, 0.03, 0.03, 0.04, 0.05, 0.07]),
    };

    pub const BRICK_PAINTED: Self = Self {
        absorption: bands([0.01, 0.01, 0.02, 0.02, 0.02, 0.03]),
    };

    pub const CONCRETE_BLOCK_COARSE: Self = Self {
        absorption: bands([0.36, 0.44, 0.31, 0.29, 0.39, 0.25]),
    };

    pub const CONCRETE_BLOCK_PAINTED: Self = Self {
        absorption: bands([0.10, 0.05, 0.06, 0.07, 0.09, 0.08]),
    };

    pub const CURTAIN_HEAVY: Self = Self {
        absorption: bands([0.14, 0.35, 0.55, 0.72, 0.70, 0.65]),
    };

    pub const GLASS_THIN: Self = Self {
        absorption: bands([0.18, 0.06, 0.04, 0.03, 0.02, 0.02]),
    };

    pub const GLASS_THICK: Self = Self {
        absorption: bands([0.35, 0.25, 0.18, 0.12, 0.07, 0.04]),
    };

    pub const GRASS: Self = Self {
        absorption: bands([0.11, 0.26, 0.60, 0.69, 0.92, 0.99]),
    };

    pub const MARBLE: Self = Self {
        absorption: bands([0.01, 0.01, 0.01, 0.01, 0.02, 0.02]),
    };

    pub const METAL: Self = Self {
        absorption: bands([0.13, 0.10, 0.06, 0.05, 0.04, 0.04]),
    };

    pub const PARQUET_ON_CONCRETE: Self = Self {
        absorption: bands([0.04, 0.04, 0.07, 0.06, 0.06, 0.07]),
    };

    pub const PLASTER_SMOOTH: Self = Self {
        absorption: bands([0.013, 0.015, 0.02, 0.03, 0.04, 0.05]),
    };

    pub const PLYWOOD_PANEL: Self = Self {
        absorption: bands([0.28, 0.22, 0.17, 0.09, 0.10, 0.11]),
    };

    pub const WATER_OR_ICE: Self = Self {
        absorption: bands([0.01, 0.01, 0.01, 0.015, 0.02, 0.02]),
    };

    pub const WOOD_PANEL: Self = Self {
        absorption: bands([0.42, 0.21, 0.10, 0.08, 0.06, 0.06]),
    };

    /// Average absorption over all bands.
    pub fn mean_absorption(&self) -> f32 {
        self.absorption.iter().sum::<f32>() / NUM_REVERB_BANDS as f32
    }
}

impl Default for WallMaterial {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}
