//! # keel-core
//!
//! Ambient runtime shared by every Keel crate: layered configuration
//! ([`KeelConfig`]), tracing bootstrap ([`init_tracing`]) and the error shape
//! handed to outer boundaries ([`ApiError`]).

pub mod config;
pub mod error;
pub mod layers;
pub mod prelude;

pub use config::{ConfigError, ConfigProperties, ConfigValue, FromConfigValue, KeelConfig};
pub use error::{error_body, ApiError};
pub use layers::init_tracing;

pub use http::StatusCode;
