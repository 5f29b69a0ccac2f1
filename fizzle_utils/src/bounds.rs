use nalgebra::{Matrix4, Point3, Vector3};

/// Axis-aligned bounds of a mesh in its own (unscaled, unrotated) space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingRect {
    pub bottom_left: Vector3<f32>,
    pub top_right: Vector3<f32>,
}

impl Default for BoundingRect {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingRect {
    pub fn empty() -> Self {
        Self {
            bottom_left: Vector3::repeat(f32::INFINITY),
            top_right: Vector3::repeat(f32::NEG_INFINITY),
        }
    }

    pub fn from_min_max(bottom_left: Vector3<f32>, top_right: Vector3<f32>) -> Self {
        Self {
            bottom_left,
            top_right,
        }
    }

    /// Smallest rect containing every point. Empty input yields [`BoundingRect::empty`].
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vector3<f32>>) -> Self {
        let mut rect = Self::empty();
        for p in points {
            rect.extend(p);
        }
        rect
    }

    pub fn extend(&mut self, point: &Vector3<f32>) {
        self.bottom_left = self.bottom_left.inf(point);
        self.top_right = self.top_right.sup(point);
    }

    pub fn is_empty(&self) -> bool {
        self.bottom_left.x > self.top_right.x
            || self.bottom_left.y > self.top_right.y
            || self.bottom_left.z > self.top_right.z
    }

    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.top_right - self.bottom_left
    }

    pub fn contains(&self, point: &Vector3<f32>) -> bool {
        point.x >= self.bottom_left.x
            && point.y >= self.bottom_left.y
            && point.z >= self.bottom_left.z
            && point.x <= self.top_right.x
            && point.y <= self.top_right.y
            && point.z <= self.top_right.z
    }

    /// The matrix is expected to be affine
    pub fn transformed(&self, transform: &Matrix4<f32>) -> Self {
        if self.is_empty() {
            return *self;
        }

        let mut rect = Self::empty();

        for i in 0..8 {
            let x = if i & 1 == 0 {
                self.bottom_left.x
            } else {
                self.top_right.x
            };
            let y = if i & 2 == 0 {
                self.bottom_left.y
            } else {
                self.top_right.y
            };
            let z = if i & 4 == 0 {
                self.bottom_left.z
            } else {
                self.top_right.z
            };

            let point = transform.transform_point(&Point3::new(x, y, z));
            rect.extend(&point.coords);
        }

        rect
    }
}
