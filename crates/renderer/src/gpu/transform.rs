use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

pub const FIELD_OF_VIEW_DEGREES: f32 = 60.0;
pub const ASPECT_RATIO: f32 = 4.0 / 3.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;
pub const CAMERA_DISTANCE: f32 = 2.0;
/// Rotation speed around the Y axis.
pub const DEGREES_PER_SECOND: f32 = 20.0;

const FALLBACK_REFRESH_RATE: f32 = 60.0;

/// Rotation of the planet after `frame` frames on a display refreshing at `refresh_rate` Hz.
pub fn rotation_degrees(frame: u64, refresh_rate: f32) -> f32 {
    let refresh_rate = if refresh_rate.is_finite() && refresh_rate > 0.0 {
        refresh_rate
    } else {
        FALLBACK_REFRESH_RATE
    };
    DEGREES_PER_SECOND * frame as f32 / refresh_rate
}

/// Model-view-projection matrix for the given frame.
///
/// Projection uses wgpu's 0..1 clip-space depth.
pub fn planet_transform(frame: u64, refresh_rate: f32) -> Mat4 {
    let projection = Mat4::perspective_rh(
        FIELD_OF_VIEW_DEGREES.to_radians(),
        ASPECT_RATIO,
        NEAR_PLANE,
        FAR_PLANE,
    );
    let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -CAMERA_DISTANCE));
    let model = Mat4::from_rotation_y(rotation_degrees(frame, refresh_rate).to_radians());
    projection * view * model
}

/// Layout of the `matrix` uniform block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct TransformUniform {
    matrix: [[f32; 4]; 4],
}

impl TransformUniform {
    pub(crate) fn new(matrix: Mat4) -> Self {
        Self {
            matrix: matrix.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn first_frame_has_no_rotation() {
        let expected = Mat4::perspective_rh(60f32.to_radians(), 4.0 / 3.0, 0.1, 100.0)
            * Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0));
        assert!(planet_transform(0, 60.0).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn rotation_advances_twenty_degrees_per_second() {
        assert_eq!(rotation_degrees(60, 60.0), 20.0);
        assert_eq!(rotation_degrees(144, 144.0), 20.0);
        assert_eq!(rotation_degrees(3, 60.0), 1.0);
        assert_eq!(rotation_degrees(30, 0.0), 10.0);
    }

    #[test]
    fn planet_centre_projects_to_screen_centre() {
        let clip = planet_transform(123, 60.0) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(clip.x.abs() < 1e-6);
        assert!(clip.y.abs() < 1e-6);
        assert!((clip.w - CAMERA_DISTANCE).abs() < 1e-6);
        let depth = clip.z / clip.w;
        assert!(depth > 0.0 && depth < 1.0);
    }

    #[test]
    fn quarter_turn_moves_the_prime_meridian() {
        // 270 frames at 60 Hz is 90 degrees.
        let rotated = planet_transform(270, 60.0);
        let unrotated = planet_transform(0, 60.0);
        let point = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let expected = unrotated * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert!((rotated * point).abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn uniform_is_column_major() {
        let matrix = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let uniform = TransformUniform::new(matrix);
        assert_eq!(uniform.matrix[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(bytemuck::bytes_of(&uniform).len(), 64);
    }
}
