use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World-space pose of a brush tip, pointer ray or tracked controller.
///
/// The brush points along its local -Z axis (forward) with local +Y as up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl BrushPose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` pointing along `forward`
    pub fn looking(position: Vec3, forward: Vec3) -> Self {
        let forward = forward.normalize_or(Vec3::NEG_Z);
        Self {
            position,
            rotation: Quat::from_rotation_arc(Vec3::NEG_Z, forward),
        }
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Whether `other` is within `epsilon` in position and direction
    pub fn approx_eq(&self, other: &BrushPose, epsilon: f32) -> bool {
        self.position.distance(other.position) <= epsilon
            && self.forward().distance(other.forward()) <= epsilon
    }
}

/// Phase of the painter's per-event state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaintPhase {
    #[default]
    Idle,
    CameraPositioned,
    Rendered,
    Composited,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looking_forward() {
        let pose = BrushPose::looking(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        assert!((pose.forward() - Vec3::X).length() < 1e-5);
        assert!(pose.up().dot(pose.forward()).abs() < 1e-5);
    }

    #[test]
    fn test_approx_eq() {
        let a = BrushPose::looking(Vec3::ZERO, Vec3::NEG_Z);
        let b = BrushPose::looking(Vec3::new(0.0, 0.0, 1e-6), Vec3::NEG_Z);
        let c = BrushPose::looking(Vec3::new(0.0, 0.1, 0.0), Vec3::NEG_Z);
        assert!(a.approx_eq(&b, 1e-4));
        assert!(!a.approx_eq(&c, 1e-4));
    }
}
