pub mod memory;
pub mod normalize;
pub mod profile;
pub mod store;
