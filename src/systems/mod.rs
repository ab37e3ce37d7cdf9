//! Systems module - shot resolution, fire control and their ECS systems.

pub mod accuracy;
pub mod ballistics;
#[cfg(feature = "dim3")]
pub mod collision;
pub mod damage;
pub mod fire_control;
pub mod surface;
