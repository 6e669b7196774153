// Configuration loading

pub mod catalog;
pub mod error;
pub mod settings;

pub use catalog::Catalog;
pub use error::ConfigError;
pub use settings::Settings;
