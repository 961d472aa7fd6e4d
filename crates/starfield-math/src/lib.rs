//! f32 bounding boxes, view frustums, and camera poses shared by the star field crates.

mod aabb;
mod camera;
mod frustum;

pub use aabb::Aabb;
pub use camera::CameraPose;
pub use frustum::Frustum;
