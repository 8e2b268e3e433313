use super::{ConfigError, KeelConfig};

/// A strongly-typed configuration section rooted at a key prefix.
///
/// ```ignore
/// impl ConfigProperties for DataSettings {
///     fn prefix() -> &'static str { "keel.data" }
///
///     fn from_config(config: &KeelConfig) -> Result<Self, ConfigError> {
///         Ok(Self {
///             max_page_size: config.get_or("keel.data.max_page_size", 100),
///         })
///     }
/// }
/// ```
pub trait ConfigProperties: Sized {
    /// The configuration key prefix (e.g. `"keel.data"`).
    fn prefix() -> &'static str;

    /// Construct the section from raw configuration values.
    fn from_config(config: &KeelConfig) -> Result<Self, ConfigError>;

    /// Join the section prefix with a relative key.
    fn key(relative: &str) -> String {
        format!("{}.{relative}", Self::prefix())
    }
}
