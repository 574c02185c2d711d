pub mod config;
pub mod validate;
pub mod weights;
