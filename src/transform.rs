// src/transform.rs
//
// Adapter over the host's 4x4 anchor transform. The host reports a
// column-major matrix: element (row, col) lives at index col * 4 + row,
// with the translation in the last column (indices 12..15).

use crate::types::Vec3;

const DEG_PER_RAD: f32 = 180.0 / std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnMajorTransform {
    m: [f32; 16],
}

impl ColumnMajorTransform {
    /// Wraps a raw matrix. Anything other than 16 finite values is rejected.
    pub fn from_slice(raw: &[f32]) -> Option<Self> {
        if raw.len() != 16 || raw.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let mut m = [0.0; 16];
        m.copy_from_slice(raw);
        Some(Self { m })
    }

    fn at(&self, row: usize, col: usize) -> f32 {
        self.m[col * 4 + row]
    }

    fn column(&self, col: usize) -> Vec3 {
        Vec3::new(self.at(0, col), self.at(1, col), self.at(2, col))
    }

    pub fn translation(&self) -> Vec3 {
        self.column(3)
    }

    /// The anchor's local +Y axis in world space. For a horizontal plane this
    /// is the surface normal.
    pub fn up_normal(&self) -> Option<Vec3> {
        self.column(1).normalized()
    }

    /// XYZ Euler angles in degrees from the normalized rotation basis.
    pub fn rotation_euler_degrees(&self) -> Option<Vec3> {
        let x_axis = self.column(0).normalized()?;
        let y_axis = self.column(1).normalized()?;
        let z_axis = self.column(2).normalized()?;

        // r[row][col] of the pure rotation
        let r20 = x_axis.z;
        let r21 = y_axis.z;
        let r22 = z_axis.z;
        let r10 = x_axis.y;
        let r00 = x_axis.x;
        let r01 = y_axis.x;
        let r11 = y_axis.y;

        let sy = (-r20).clamp(-1.0, 1.0);
        let pitch = sy.asin();

        let (roll, yaw) = if sy.abs() < 0.9999 {
            (r21.atan2(r22), r10.atan2(r00))
        } else {
            // Gimbal lock: fold everything into yaw
            (0.0, (-r01).atan2(r11))
        };

        Some(Vec3::new(
            roll * DEG_PER_RAD,
            pitch * DEG_PER_RAD,
            yaw * DEG_PER_RAD,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_at(t: Vec3) -> Vec<f32> {
        vec![
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            t.x, t.y, t.z, 1.0,
        ]
    }

    #[test]
    fn test_identity_translation_and_normal() {
        let t = ColumnMajorTransform::from_slice(&identity_at(Vec3::new(0.5, -1.2, -2.0))).unwrap();
        assert_eq!(t.translation(), Vec3::new(0.5, -1.2, -2.0));
        assert_eq!(t.up_normal(), Some(Vec3::UP));
        let euler = t.rotation_euler_degrees().unwrap();
        assert!(euler.length() < 1e-4);
    }

    #[test]
    fn test_yaw_rotation_extracted() {
        // 90 degrees about Z
        let raw = vec![
            0.0, 1.0, 0.0, 0.0, //
            -1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let t = ColumnMajorTransform::from_slice(&raw).unwrap();
        let euler = t.rotation_euler_degrees().unwrap();
        assert!((euler.z - 90.0).abs() < 1e-3);
        assert!(euler.x.abs() < 1e-3 && euler.y.abs() < 1e-3);
    }

    #[test]
    fn test_scaled_basis_is_normalized() {
        let mut raw = identity_at(Vec3::ZERO);
        raw[5] = 3.0;
        let t = ColumnMajorTransform::from_slice(&raw).unwrap();
        assert_eq!(t.up_normal(), Some(Vec3::UP));
    }

    #[test]
    fn test_degenerate_matrix_yields_none() {
        let raw = vec![0.0; 16];
        let t = ColumnMajorTransform::from_slice(&raw).unwrap();
        assert!(t.up_normal().is_none());
        assert!(t.rotation_euler_degrees().is_none());
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(ColumnMajorTransform::from_slice(&[1.0; 12]).is_none());
        let mut raw = identity_at(Vec3::ZERO);
        raw[0] = f32::NAN;
        assert!(ColumnMajorTransform::from_slice(&raw).is_none());
    }
}
