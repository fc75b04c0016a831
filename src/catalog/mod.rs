pub mod model;

pub use model::{Algorithm, Catalog, CatalogError, Category, HardwareSpec};

/// Algorithm a fresh game starts on.
pub const DEFAULT_ALGORITHM: &str = "SHA-256";
