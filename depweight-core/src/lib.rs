pub mod config;
pub mod console;
pub mod error;
pub mod operations;
pub mod registry;
pub mod validate;
pub mod version;
pub mod weights;

pub use config::DepweightConfig;
pub use error::DepweightError;
pub use registry::{Language, Registry, RegistryClient, ResolvedSpec, SessionCache};
pub use weights::{WeightMap, WeightOptions, compute_weights};

pub type Result<T> = std::result::Result<T, DepweightError>;
