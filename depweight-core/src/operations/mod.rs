pub mod weigh;

pub use weigh::{WeighOptions, weigh};
