//! Math types for PetalSonic

pub use glam::{Quat, Vec3};

/// Position and orientation of the listener or a source.
///
/// Uses a right-handed, Y-up frame where an unrotated pose faces -Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * (-Vec3::Z)
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.position.distance(other.position)
    }

    /// Unit vector from this pose towards `target`, or `None` when the two coincide.
    pub fn direction_to(&self, target: Vec3) -> Option<Vec3> {
        (target - self.position).try_normalize()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}
