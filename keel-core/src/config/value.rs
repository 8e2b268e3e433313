use std::str::FromStr;

use super::ConfigError;

/// One configuration entry after flattening.
///
/// Nested YAML mappings never reach this type: the loader turns them into
/// dotted keys. Sequences are kept whole and also flattened by index.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<ConfigValue>),
}

impl From<&serde_yaml::Value> for ConfigValue {
    fn from(value: &serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => ConfigValue::Null,
            Yaml::Bool(b) => ConfigValue::Bool(*b),
            Yaml::Number(n) => n
                .as_i64()
                .map(ConfigValue::Integer)
                .or_else(|| n.as_f64().map(ConfigValue::Float))
                .unwrap_or_else(|| ConfigValue::String(n.to_string())),
            Yaml::String(s) => ConfigValue::String(s.clone()),
            Yaml::Sequence(items) => ConfigValue::List(items.iter().map(Self::from).collect()),
            // only reachable through the dotted keys the loader writes
            Yaml::Mapping(_) => ConfigValue::Null,
            Yaml::Tagged(tagged) => Self::from(&tagged.value),
        }
    }
}

impl ConfigValue {
    /// Text form of a scalar. Environment overrides always arrive as text,
    /// so every typed read can fall back to it.
    fn scalar_text(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Integer(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(f.to_string()),
            ConfigValue::Bool(b) => Some(b.to_string()),
            ConfigValue::Null | ConfigValue::List(_) => None,
        }
    }

    fn parse_scalar<T: FromStr>(&self, key: &str, expected: &'static str) -> Result<T, ConfigError> {
        self.scalar_text()
            .and_then(|text| text.trim().parse().ok())
            .ok_or_else(|| mismatch(key, expected))
    }
}

fn mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

/// Conversion from a [`ConfigValue`] into a concrete type.
pub trait FromConfigValue: Sized {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError>;
}

impl FromConfigValue for String {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        value.scalar_text().ok_or_else(|| mismatch(key, "String"))
    }
}

impl FromConfigValue for i64 {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Integer(i) => Ok(*i),
            other => other.parse_scalar(key, "i64"),
        }
    }
}

impl FromConfigValue for f64 {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Float(f) => Ok(*f),
            ConfigValue::Integer(i) => Ok(*i as f64),
            other => other.parse_scalar(key, "f64"),
        }
    }
}

impl FromConfigValue for bool {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        if let ConfigValue::Bool(b) = value {
            return Ok(*b);
        }
        let text = value.scalar_text().map(|s| s.trim().to_ascii_lowercase());
        match text.as_deref() {
            Some("true" | "yes" | "on" | "1") => Ok(true),
            Some("false" | "no" | "off" | "0") => Ok(false),
            _ => Err(mismatch(key, "bool")),
        }
    }
}

// Sizes and counts: negative values are a mismatch, not a wrap.
macro_rules! unsigned_from_config {
    ($($ty:ty),+) => {
        $(
            impl FromConfigValue for $ty {
                fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
                    match value {
                        ConfigValue::Integer(i) => {
                            <$ty>::try_from(*i).map_err(|_| mismatch(key, stringify!($ty)))
                        }
                        other => other.parse_scalar(key, stringify!($ty)),
                    }
                }
            }
        )+
    };
}

unsigned_from_config!(u32, u64, usize);

impl<T: FromConfigValue> FromConfigValue for Option<T> {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        if matches!(value, ConfigValue::Null) {
            Ok(None)
        } else {
            T::from_config_value(value, key).map(Some)
        }
    }
}

/// Lists read element-wise; elements are reported under their indexed key.
impl<T: FromConfigValue> FromConfigValue for Vec<T> {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::from_config_value(item, &format!("{key}.{i}")))
                .collect(),
            ConfigValue::Null => Ok(Vec::new()),
            scalar => T::from_config_value(scalar, key).map(|one| vec![one]),
        }
    }
}
