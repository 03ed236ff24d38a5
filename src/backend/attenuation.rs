//! Per-source gain laws evaluated once per render pass.

use crate::api::{DistanceRolloffModel, RenderingMode};
use crate::math::Vec3;

/// Distance under which the near-field boost kicks in, in metres.
pub const NEAR_FIELD_THRESHOLD: f32 = 1.0;

/// Largest accepted near-field effect gain.
pub const MAX_NEAR_FIELD_GAIN: f32 = 9.0;

const MAX_OCCLUSION_CUTOFF_HZ: f32 = 20_000.0;
const MIN_OCCLUSION_CUTOFF_HZ: f32 = 200.0;

/// Automatic distance attenuation, or `None` when the model leaves it to the caller.
pub fn distance_attenuation(
    rolloff: DistanceRolloffModel,
    distance: f32,
    min_distance: f32,
    max_distance: f32,
) -> Option<f32> {
    if rolloff == DistanceRolloffModel::None {
        return None;
    }
    if distance <= min_distance {
        return Some(1.0);
    }
    if distance >= max_distance || max_distance <= min_distance {
        return Some(0.0);
    }

    let attenuation = if rolloff == DistanceRolloffModel::Logarithmic {
        // ln(max/d) / ln(max/min), with min floored so the ratio stays finite
        let min_distance = min_distance.max(f32::EPSILON);
        (max_distance / distance).ln() / (max_distance / min_distance).ln()
    } else {
        (max_distance - distance) / (max_distance - min_distance)
    };
    Some(attenuation.clamp(0.0, 1.0))
}

/// Gain of a `(1 - alpha) + alpha * cos(theta)` pattern raised to `order`.
///
/// `forward` is the axis of the pattern and `direction` the unit vector
/// towards the other party. `alpha = 0` is omnidirectional, `0.5` cardioid,
/// `1` figure-of-eight.
pub fn directivity_gain(alpha: f32, order: f32, forward: Vec3, direction: Vec3) -> f32 {
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha == 0.0 {
        return 1.0;
    }
    let cos_theta = forward.dot(direction).clamp(-1.0, 1.0);
    ((1.0 - alpha) + alpha * cos_theta)
        .abs()
        .powf(order.max(1.0))
}

/// Broadband boost applied to sources closer than [`NEAR_FIELD_THRESHOLD`].
///
/// Full gain at zero distance doubles the level; the boost fades linearly to
/// unity at the threshold.
pub fn near_field_boost(gain: f32, distance: f32) -> f32 {
    if distance >= NEAR_FIELD_THRESHOLD {
        return 1.0;
    }
    let proximity = 1.0 - distance.max(0.0) / NEAR_FIELD_THRESHOLD;
    1.0 + gain.clamp(0.0, MAX_NEAR_FIELD_GAIN) / MAX_NEAR_FIELD_GAIN * proximity
}

/// Weight of the directional ambisonic components for a given spread.
///
/// 0° keeps a point source; 360° leaves only the omnidirectional component.
pub fn spread_directional_gain(spread_deg: f32) -> f32 {
    1.0 - spread_deg.clamp(0.0, 360.0) / 360.0
}

/// Pole of the one-pole low-pass used for occlusion. Zero means no filtering.
pub fn occlusion_pole(intensity: f32, sample_rate: u32) -> f32 {
    if intensity <= 0.0 {
        return 0.0;
    }
    let cutoff = (MAX_OCCLUSION_CUTOFF_HZ / (1.0 + 9.0 * intensity)).max(MIN_OCCLUSION_CUTOFF_HZ);
    (-2.0 * std::f32::consts::PI * cutoff / sample_rate as f32).exp()
}

/// Ambisonic order a sound object is encoded at, or `None` when only room
/// effects are rendered.
pub fn ambisonic_order(mode: RenderingMode) -> Option<usize> {
    match mode {
        RenderingMode::StereoPanning | RenderingMode::BinauralLowQuality => Some(1),
        RenderingMode::BinauralMediumQuality | RenderingMode::BinauralHighQuality => Some(2),
        RenderingMode::RoomEffectsOnly => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rolloff_defers_to_caller() {
        assert_eq!(
            distance_attenuation(DistanceRolloffModel::None, 50.0, 0.0, 0.0),
            None
        );
    }

    #[test]
    fn rolloff_curves_span_min_to_max() {
        for model in [DistanceRolloffModel::Logarithmic, DistanceRolloffModel::Linear] {
            assert_eq!(distance_attenuation(model, 0.5, 1.0, 100.0), Some(1.0));
            assert_eq!(distance_attenuation(model, 100.0, 1.0, 100.0), Some(0.0));

            let near = distance_attenuation(model, 10.0, 1.0, 100.0).unwrap();
            let far = distance_attenuation(model, 50.0, 1.0, 100.0).unwrap();
            assert!(near > far && far > 0.0, "{:?}", model);
        }

        let linear = distance_attenuation(DistanceRolloffModel::Linear, 50.5, 1.0, 100.0).unwrap();
        assert!((linear - 0.5).abs() < 1e-6);
    }

    #[test]
    fn omni_pattern_ignores_direction() {
        assert_eq!(directivity_gain(0.0, 4.0, Vec3::Z, -Vec3::Z), 1.0);
    }

    #[test]
    fn cardioid_nulls_behind() {
        let front = directivity_gain(0.5, 1.0, -Vec3::Z, -Vec3::Z);
        let side = directivity_gain(0.5, 1.0, -Vec3::Z, Vec3::X);
        let back = directivity_gain(0.5, 1.0, -Vec3::Z, Vec3::Z);

        assert!((front - 1.0).abs() < 1e-6);
        assert!((side - 0.5).abs() < 1e-6);
        assert!(back.abs() < 1e-6);

        let sharper = directivity_gain(0.5, 2.0, -Vec3::Z, Vec3::X);
        assert!((sharper - 0.25).abs() < 1e-6);
    }

    #[test]
    fn near_field_boost_only_inside_threshold() {
        assert_eq!(near_field_boost(9.0, 2.0), 1.0);
        assert_eq!(near_field_boost(0.0, 0.1), 1.0);
        assert!((near_field_boost(9.0, 0.0) - 2.0).abs() < 1e-6);
        assert!((near_field_boost(100.0, 0.5) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn spread_and_occlusion_bounds() {
        assert_eq!(spread_directional_gain(0.0), 1.0);
        assert_eq!(spread_directional_gain(720.0), 0.0);
        assert_eq!(occlusion_pole(0.0, 48000), 0.0);

        let light = occlusion_pole(0.2, 48000);
        let heavy = occlusion_pole(1.0, 48000);
        assert!(heavy > light && light > 0.0 && heavy < 1.0);
    }

    #[test]
    fn rendering_mode_selects_order() {
        assert_eq!(ambisonic_order(RenderingMode::StereoPanning), Some(1));
        assert_eq!(ambisonic_order(RenderingMode::BinauralHighQuality), Some(2));
        assert_eq!(ambisonic_order(RenderingMode::RoomEffectsOnly), None);
    }
}
