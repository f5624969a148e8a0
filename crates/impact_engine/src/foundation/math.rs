//! Math utilities and types
//!
//! World-space simulation runs in double precision; structures can sit far
//! from the origin and single precision clips contact points by centimetres.

pub use nalgebra::{
    Vector3,
    Matrix3, Matrix4,
    UnitQuaternion,
};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f64>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f64>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f64>;

/// Integer coordinate of a cell inside a structure grid
pub type CellCoord = Vector3<i32>;

/// Squared lengths below this are treated as zero-length vectors
pub const DEGENERATE_LENGTH_SQUARED: f64 = 1e-12;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Inverse of [`Self::to_matrix`]
    pub fn inverse_matrix(&self) -> Mat4 {
        try_inverse_or_identity(&self.to_matrix())
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        transform_point(&self.to_matrix(), point)
    }

    /// Apply this transform to a vector
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.to_matrix().transform_vector(&vector)
    }
}

/// Transform a position by an affine matrix
pub fn transform_point(matrix: &Mat4, point: Vec3) -> Vec3 {
    matrix.transform_point(&Point3::from(point)).coords
}

/// Transform a surface normal by an affine matrix, renormalising the result
///
/// Uses the upper 3x3 block directly; shapes in this crate only carry
/// rotation and uniform scale, so the inverse-transpose is not needed.
pub fn transform_normal(matrix: &Mat4, normal: Vec3) -> Vec3 {
    let transformed = matrix.transform_vector(&normal);
    if transformed.magnitude_squared() < DEGENERATE_LENGTH_SQUARED {
        transformed
    } else {
        transformed.normalize()
    }
}

/// Invert a matrix, falling back to identity for singular input
pub fn try_inverse_or_identity(matrix: &Mat4) -> Mat4 {
    matrix.try_inverse().unwrap_or_else(|| {
        log::warn!("Singular transform encountered, substituting identity");
        Mat4::identity()
    })
}

/// Normalise a vector, or `None` if it is too short to carry a direction
pub fn try_normalize(vector: Vec3) -> Option<Vec3> {
    if vector.magnitude_squared() < DEGENERATE_LENGTH_SQUARED {
        None
    } else {
        Some(vector.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_transform_roundtrip_through_inverse() {
        let transform = Transform::from_position_rotation(
            Vec3::new(10.0, -4.0, 2.5),
            Quat::from_axis_angle(&Vec3::y_axis(), 0.7),
        );
        let point = Vec3::new(1.0, 2.0, 3.0);
        let world = transform.transform_point(point);
        let back = transform_point(&transform.inverse_matrix(), world);
        assert_relative_eq!(back, point, epsilon = EPSILON);
    }

    #[test]
    fn test_transform_normal_is_unit_length() {
        let matrix = Mat4::new_scaling(3.0);
        let normal = transform_normal(&matrix, Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(normal.magnitude(), 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_try_normalize_rejects_zero() {
        assert!(try_normalize(Vec3::zeros()).is_none());
        assert!(try_normalize(Vec3::new(0.0, 0.0, 2.0)).is_some());
    }
}
