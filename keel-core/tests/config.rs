use keel_core::config::{ConfigError, ConfigProperties, ConfigValue, KeelConfig};
use serial_test::serial;

#[test]
fn test_empty_config() {
    let config = KeelConfig::empty();
    assert!(matches!(
        config.get::<String>("nonexistent"),
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn test_set_and_get() {
    let mut config = KeelConfig::empty();
    config.set("app.name", ConfigValue::String("ledger".into()));
    assert_eq!(config.get::<String>("app.name").unwrap(), "ledger");
}

#[test]
fn test_get_or_default() {
    let config = KeelConfig::empty();
    assert_eq!(config.get_or("missing", 42i64), 42);
}

#[test]
fn test_get_opt_rejects_bad_value() {
    let mut config = KeelConfig::empty();
    config.set("keel.data.max_page_size", ConfigValue::String("lots".into()));
    assert!(matches!(
        config.get_opt::<u64>("keel.data.max_page_size"),
        Err(ConfigError::TypeMismatch { .. })
    ));
    assert_eq!(config.get_opt::<u64>("keel.data.other").unwrap(), None);
}

#[test]
fn test_type_conversions() {
    let mut config = KeelConfig::empty();
    config.set("int_val", ConfigValue::Integer(42));
    config.set("float_val", ConfigValue::Float(2.5));
    config.set("bool_val", ConfigValue::String("yes".into()));
    config.set("null_val", ConfigValue::Null);

    assert_eq!(config.get::<i64>("int_val").unwrap(), 42);
    assert_eq!(config.get::<u32>("int_val").unwrap(), 42);
    assert_eq!(config.get::<f64>("float_val").unwrap(), 2.5);
    assert!(config.get::<bool>("bool_val").unwrap());
    assert_eq!(config.get::<String>("int_val").unwrap(), "42");
    assert!(config.get::<Option<String>>("null_val").unwrap().is_none());
}

#[test]
fn test_negative_integer_rejected_for_unsigned() {
    let mut config = KeelConfig::empty();
    config.set("size", ConfigValue::Integer(-1));
    assert!(config.get::<u64>("size").is_err());
}

#[test]
fn test_flatten_yaml() {
    let yaml = r#"
keel:
  data:
    max_page_size: 50
    system_identity: "batch"
  modules:
    - finance
    - shipments
"#;
    let config = KeelConfig::from_yaml_str(yaml, "test").unwrap();

    assert_eq!(config.get::<u64>("keel.data.max_page_size").unwrap(), 50);
    assert_eq!(
        config.get::<String>("keel.data.system_identity").unwrap(),
        "batch"
    );
    let modules: Vec<String> = config.get("keel.modules").unwrap();
    assert_eq!(modules, vec!["finance", "shipments"]);
    assert_eq!(config.get::<String>("keel.modules.1").unwrap(), "shipments");
}

#[test]
fn test_invalid_yaml_is_load_error() {
    let err = KeelConfig::from_yaml_str("keel: [unclosed", "test").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

struct Greeting {
    text: String,
}

impl ConfigProperties for Greeting {
    fn prefix() -> &'static str {
        "app.greeting"
    }

    fn from_config(config: &KeelConfig) -> Result<Self, ConfigError> {
        Ok(Greeting {
            text: config.get_or(&Self::key("text"), "hello".to_string()),
        })
    }
}

#[test]
fn test_typed_section_deref() {
    let config = KeelConfig::from_yaml_str("app:\n  greeting:\n    text: hi\n", "test")
        .unwrap()
        .with_typed::<Greeting>()
        .unwrap();
    assert_eq!(config.text, "hi");
    assert_eq!(config.profile(), "test");
    assert!(config.raw().contains_key("app.greeting.text"));
}

#[test]
#[serial]
fn test_load_from_dir_layers_profile_and_env() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("application.yaml"),
        "keel:\n  data:\n    max_page_size: 100\n    default_page_size: 20\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("application-qa.yaml"),
        "keel:\n  data:\n    max_page_size: 40\n",
    )
    .unwrap();

    std::env::remove_var("KEEL_PROFILE");
    std::env::set_var("KEEL_DATA_DEFAULT_PAGE_SIZE", "15");
    let config = KeelConfig::load_from_dir(dir.path(), "qa").unwrap();
    std::env::remove_var("KEEL_DATA_DEFAULT_PAGE_SIZE");

    assert_eq!(config.profile(), "qa");
    assert_eq!(config.get::<u64>("keel.data.max_page_size").unwrap(), 40);
    assert_eq!(config.get::<u64>("keel.data.default_page_size").unwrap(), 15);
}

#[test]
#[serial]
fn test_profile_env_var_wins() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("KEEL_PROFILE", "prod");
    let config = KeelConfig::load_from_dir(dir.path(), "dev").unwrap();
    std::env::remove_var("KEEL_PROFILE");
    assert_eq!(config.profile(), "prod");
}
