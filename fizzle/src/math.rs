pub use ::nalgebra;
pub use ::nalgebra::{Matrix3, Matrix4};
pub use ::nalgebra::{Vector2, Vector3, Vector4};
pub use ::nalgebra::{Point3, Unit, UnitQuaternion};
