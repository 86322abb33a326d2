mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{ConfigError, EmbeddingProvider, Settings};
