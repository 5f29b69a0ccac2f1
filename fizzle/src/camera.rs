use nalgebra::{Matrix4, Point3, Vector3};

/// Anything that can produce a view matrix for a draw.
pub trait Camera {
    fn view_matrix(&self) -> Matrix4<f32>;
    fn position(&self) -> Vector3<f32>;
}

/// Free look camera: a position plus yaw (around +Y) and pitch, in radians.
///
/// With zero yaw and pitch it looks down -Z.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct YawPitchCamera {
    pub position: Vector3<f32>,
    pub yaw: f32,
    pub pitch: f32,
}

const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.001;
/// Closest an [`OrbitCamera`] gets to its target. At zero the eye would sit
/// on the target and the view would be undefined.
pub const MIN_ORBIT_DISTANCE: f32 = 1.0e-3;

impl YawPitchCamera {
    pub fn new(position: Vector3<f32>) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vector3::new(-sy * cp, sp, -cy * cp)
    }

    pub fn right(&self) -> Vector3<f32> {
        let (sy, cy) = self.yaw.sin_cos();
        Vector3::new(cy, 0.0, -sy)
    }

    pub fn rotate(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Moves along the view direction and the horizontal right vector.
    pub fn translate(&mut self, forward: f32, right: f32, up: f32) {
        self.position += self.forward() * forward + self.right() * right + Vector3::y() * up;
    }
}

impl Camera for YawPitchCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::from(self.position);
        let target = eye + self.forward();
        Matrix4::look_at_rh(&eye, &target, &Vector3::y())
    }

    fn position(&self) -> Vector3<f32> {
        self.position
    }
}

/// Camera circling a target point at a fixed distance.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Vector3<f32>,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl OrbitCamera {
    pub fn new(target: Vector3<f32>, distance: f32) -> Self {
        Self {
            target,
            distance: distance.max(MIN_ORBIT_DISTANCE),
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn rotate(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance + delta).max(MIN_ORBIT_DISTANCE);
    }
}

impl Camera for OrbitCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            &Point3::from(self.position()),
            &Point3::from(self.target),
            &Vector3::y(),
        )
    }

    fn position(&self) -> Vector3<f32> {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + Vector3::new(sy * cp, sp, cy * cp) * self.distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = YawPitchCamera::new(Vector3::new(0.0, 0.0, 5.0));
        let view = camera.view_matrix();

        let origin = view.transform_point(&Point3::origin());
        assert!((origin.coords - Vector3::new(0.0, 0.0, -5.0)).norm() < 1.0e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = YawPitchCamera::new(Vector3::zeros());
        camera.rotate(0.0, 10.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
        assert!(camera.forward().y > 0.99);
    }

    #[test]
    fn orbit_keeps_distance() {
        let mut camera = OrbitCamera::new(Vector3::new(1.0, 2.0, 3.0), 4.0);
        camera.rotate(1.2, 0.4);
        let offset = camera.position() - camera.target;
        assert!((offset.norm() - 4.0).abs() < 1.0e-5);

        let target_in_view = camera
            .view_matrix()
            .transform_point(&Point3::from(camera.target));
        assert!((target_in_view.coords - Vector3::new(0.0, 0.0, -4.0)).norm() < 1.0e-4);
    }

    #[test]
    fn orbit_zoom_stops_short_of_the_target() {
        let mut camera = OrbitCamera::new(Vector3::new(0.0, 1.0, 0.0), 1.0);
        camera.zoom(-5.0);
        assert_eq!(camera.distance, MIN_ORBIT_DISTANCE);
        assert!(camera.view_matrix().iter().all(|v| v.is_finite()));

        let camera = OrbitCamera::new(Vector3::zeros(), 0.0);
        assert_eq!(camera.distance, MIN_ORBIT_DISTANCE);
        assert!(camera.view_matrix().iter().all(|v| v.is_finite()));
    }
}
