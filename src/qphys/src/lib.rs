pub mod constraint;
pub mod controller_message;
pub mod error;
pub mod fluid;
pub mod gravity;
pub mod network;
pub mod params;
pub mod particle;
pub mod pendulum;
pub mod physical_model;
pub mod posbox;
pub mod selector;
pub mod simulation;
pub mod time_manager;

pub type V2 = nalgebra::Vector2<f32>;
pub type V3 = nalgebra::Vector3<f32>;
pub type V2d = nalgebra::Vector2<f64>;
