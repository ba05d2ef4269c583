use std::env;
use std::fs;
use tempfile::tempdir;

#[cfg(test)]
mod config_tests {
    use super::*;
    use site_metrics::config::{Config, MalformedPolicy};

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.logging.level, "WARN");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.output, "console");

        assert_eq!(config.processing.on_malformed, MalformedPolicy::Skip);
        assert!(!config.output.json_pretty);
    }

    #[test]
    fn test_env_variable_override() {
        env::set_var("LOG_LEVEL", "DEBUG");
        env::set_var("SITE_METRICS_ON_MALFORMED", "abort");
        env::set_var("SITE_METRICS_JSON_PRETTY", "true");

        let mut config = Config::default();
        config
            .apply_env_overrides()
            .expect("Failed to apply env overrides");

        assert_eq!(config.logging.level, "DEBUG");
        assert_eq!(config.processing.on_malformed, MalformedPolicy::Abort);
        assert!(config.output.json_pretty);

        env::set_var("SITE_METRICS_ON_MALFORMED", "sometimes");
        assert!(Config::default().apply_env_overrides().is_err());

        env::remove_var("LOG_LEVEL");
        env::remove_var("SITE_METRICS_ON_MALFORMED");
        env::remove_var("SITE_METRICS_JSON_PRETTY");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.logging.output = "syslog".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_creates_log_directory_for_file_output() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let log_dir = temp_dir.path().join("nested").join("logs");

        let mut config = Config::default();
        config.logging.output = "file".to_string();
        config.paths.log_directory = log_dir.clone();

        config.validate().expect("validation should create the directory");
        assert!(log_dir.is_dir());
    }

    #[test]
    fn test_config_file_loading() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("site-metrics.toml");

        let test_config = r#"
[logging]
level = "DEBUG"
format = "json"
output = "console"

[processing]
on_malformed = "abort"

[output]
json_pretty = true
        "#;

        fs::write(&config_path, test_config).expect("Failed to write test config");

        let config = Config::load_from_file(&config_path).expect("Failed to load config");

        assert_eq!(config.logging.level, "DEBUG");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.processing.on_malformed, MalformedPolicy::Abort);
        assert!(config.output.json_pretty);
        // missing section falls back to defaults
        assert_eq!(config.paths.log_directory, std::path::PathBuf::from("logs"));
        assert_eq!(config.source.as_deref(), Some(config_path.as_path()));
    }

    #[test]
    fn test_config_save_and_reload() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("saved.toml");

        let mut config = Config::default();
        config.processing.on_malformed = MalformedPolicy::Abort;
        config.save_to_file(&config_path).expect("Failed to save config");

        let toml_string = fs::read_to_string(&config_path).unwrap();
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("[processing]"));
        assert!(toml_string.contains("on_malformed = \"abort\""));
        assert!(!toml_string.contains("source"));

        let reloaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(reloaded.processing.on_malformed, MalformedPolicy::Abort);
        assert_eq!(reloaded.logging.level, config.logging.level);
    }
}
