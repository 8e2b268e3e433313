//! Re-exports of the most commonly used core types.

pub use crate::config::{ConfigError, ConfigProperties, KeelConfig};
pub use crate::error::ApiError;
pub use crate::layers::init_tracing;
