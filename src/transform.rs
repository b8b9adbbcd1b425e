//! Rigid-body transforms and rotation-vector conversions.
//!
//! Surface orientations are stored as axis-angle *rotation vectors* in
//! degrees (direction = rotation axis, magnitude = rotation angle). Composing
//! orientations therefore goes through a rotation-matrix intermediate:
//! convert, multiply, convert back. The conversions live here so the
//! `Surface` boundary is the only place the rotation-vector form appears.

use nalgebra::{Matrix3, Rotation3, Vector3};

// ---------------------------------------------------------------------------
// RigidTransform – rotation followed by translation
// ---------------------------------------------------------------------------

/// A rigid-body transform: `p ↦ R·p + T`.
///
/// The default value is the identity (no rotation, no translation) and is
/// constructed fresh per call site.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidTransform {
    /// 3x3 rotation matrix. Expected orthonormal with determinant +1;
    /// not validated here (see [`is_rotation_matrix`]).
    pub rotation: Matrix3<f64>,
    /// Translation 3-vector, applied after the rotation.
    pub translation: Vector3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }
}

impl RigidTransform {
    /// Build a transform from a rotation matrix and a translation vector.
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// A pure rotation.
    pub fn from_rotation(rotation: Matrix3<f64>) -> Self {
        Self {
            rotation,
            translation: Vector3::zeros(),
        }
    }

    /// A pure translation.
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation,
        }
    }

    /// A pure translation from components.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self::from_translation(Vector3::new(dx, dy, dz))
    }

    /// Apply this transform to a point: rotate, then translate.
    pub fn apply(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * point + self.translation
    }

    /// Compose two transforms: `self` followed by `other`.
    pub fn then(&self, other: &RigidTransform) -> RigidTransform {
        RigidTransform {
            rotation: other.rotation * self.rotation,
            translation: other.rotation * self.translation + other.translation,
        }
    }
}

// ---------------------------------------------------------------------------
// Rotation-vector (degrees) ↔ rotation matrix
// ---------------------------------------------------------------------------

/// Convert a tilt rotation vector (degrees) to a rotation matrix.
pub fn rotation_from_tilt_deg(tilts: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::from_scaled_axis(tilts.map(f64::to_radians)).into_inner()
}

/// Convert a rotation matrix back to a tilt rotation vector in degrees.
///
/// Near a rotation angle of 180° the axis-angle representation is not
/// unique: a round trip may flip the axis sign while still describing the
/// identical rotation. Compare at the matrix level when that matters.
pub fn tilt_deg_from_rotation(matrix: &Matrix3<f64>) -> Vector3<f64> {
    Rotation3::from_matrix_unchecked(*matrix)
        .scaled_axis()
        .map(f64::to_degrees)
}

/// Check that a matrix is a proper rotation: `RᵀR ≈ I` and `det R ≈ +1`.
///
/// Advisory helper only; `transform` trusts its caller.
pub fn is_rotation_matrix(matrix: &Matrix3<f64>) -> bool {
    const TOL: f64 = 1e-9;
    let gram = matrix.transpose() * matrix;
    (gram - Matrix3::identity()).norm() < TOL && (matrix.determinant() - 1.0).abs() < TOL
}
