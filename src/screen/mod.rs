pub mod classifier;
pub mod controls;
pub mod intent;
pub mod label;
pub mod patterns;
pub mod screen_model;
