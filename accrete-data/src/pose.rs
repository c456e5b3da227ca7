//! Rigid frame poses.

use crate::error::LayoutError;
use glam::{Mat3, Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Rotation blocks with a smaller absolute determinant count as singular.
const MIN_DETERMINANT: f32 = 1e-6;

const HOMOGENEOUS_TOLERANCE: f32 = 1e-6;

/// Rigid transform from a frame's sensor coordinates to the scene-global frame.
///
/// Serialised as a row-major 4x4 matrix, the layout most driving datasets use
/// for their per-frame pose files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[[f64; 4]; 4]", into = "[[f64; 4]; 4]")]
pub struct Pose {
    matrix: Mat4,
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            matrix: Mat4::from_translation(translation),
        }
    }

    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        Self {
            matrix: Mat4::from_rotation_translation(rotation, translation),
        }
    }

    /// Build a pose from a row-major 4x4 matrix.
    pub fn from_row_major(rows: [[f32; 4]; 4]) -> Self {
        Self {
            matrix: Mat4::from_cols_array_2d(&rows).transpose(),
        }
    }

    /// The pose as a row-major 4x4 matrix.
    pub fn to_row_major(&self) -> [[f32; 4]; 4] {
        self.matrix.transpose().to_cols_array_2d()
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    pub fn translation(&self) -> Vec3 {
        self.matrix.w_axis.truncate()
    }

    /// The transform from the global frame back into this pose's local frame.
    ///
    /// Only meaningful for an invertible pose; see [`Pose::try_inverse`].
    pub fn inverse(&self) -> Self {
        Self {
            matrix: self.matrix.inverse(),
        }
    }

    /// Like [`Pose::inverse`], but fails instead of producing NaNs when the
    /// matrix is not an invertible rigid transform.
    pub fn try_inverse(&self) -> Result<Self, LayoutError> {
        check_rigid(&self.matrix)?;
        Ok(self.inverse())
    }

    /// Apply `self` first, then `next`.
    pub fn then(&self, next: &Pose) -> Self {
        Self {
            matrix: next.matrix * self.matrix,
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix.transform_point3(point)
    }
}

/// A pose matrix must be finite, keep the homogeneous row `[0, 0, 0, 1]` and
/// have a non-singular rotation block.
fn check_rigid(matrix: &Mat4) -> Result<(), LayoutError> {
    if !matrix.is_finite() {
        return Err(LayoutError::NonFinitePose);
    }
    let bottom = matrix.row(3);
    if !bottom.abs_diff_eq(Vec4::W, HOMOGENEOUS_TOLERANCE) {
        return Err(LayoutError::DegeneratePose);
    }
    if Mat3::from_mat4(*matrix).determinant().abs() < MIN_DETERMINANT {
        return Err(LayoutError::DegeneratePose);
    }
    Ok(())
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl TryFrom<[[f64; 4]; 4]> for Pose {
    type Error = LayoutError;

    fn try_from(rows: [[f64; 4]; 4]) -> Result<Self, Self::Error> {
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(LayoutError::NonFinitePose);
        }
        let pose = Self::from_row_major(rows.map(|row| row.map(|v| v as f32)));
        check_rigid(&pose.matrix)?;
        Ok(pose)
    }
}

impl From<Pose> for [[f64; 4]; 4] {
    fn from(pose: Pose) -> Self {
        pose.to_row_major().map(|row| row.map(f64::from))
    }
}
