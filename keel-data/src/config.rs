use keel_core::config::{ConfigError, ConfigProperties, KeelConfig};

/// The `keel.data` configuration section.
///
/// ```yaml
/// keel:
///   data:
///     max_page_size: 100
///     default_page_size: 20
///     system_identity: system
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSettings {
    /// Upper bound for page sizes; larger requests are clamped.
    pub max_page_size: u64,
    /// Page size used when the caller gives none.
    pub default_page_size: u64,
    /// Recorded as `created_by` / `modified_by` when no user is acting.
    pub system_identity: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            default_page_size: 20,
            system_identity: "system".to_string(),
        }
    }
}

impl DataSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size < 1 {
            return Err(invalid("max_page_size", "must be at least 1"));
        }
        if self.default_page_size < 1 || self.default_page_size > self.max_page_size {
            return Err(invalid(
                "default_page_size",
                "must be between 1 and max_page_size",
            ));
        }
        if self.system_identity.trim().is_empty() {
            return Err(invalid("system_identity", "must not be blank"));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        key: DataSettings::key(key),
        message: message.to_string(),
    }
}

impl ConfigProperties for DataSettings {
    fn prefix() -> &'static str {
        "keel.data"
    }

    fn from_config(config: &KeelConfig) -> Result<Self, ConfigError> {
        let defaults = DataSettings::default();
        let settings = DataSettings {
            max_page_size: config
                .get_opt(&Self::key("max_page_size"))?
                .unwrap_or(defaults.max_page_size),
            default_page_size: config
                .get_opt(&Self::key("default_page_size"))?
                .unwrap_or(defaults.default_page_size),
            system_identity: config
                .get_opt(&Self::key("system_identity"))?
                .unwrap_or(defaults.system_identity),
        };
        settings.validate()?;
        Ok(settings)
    }
}
