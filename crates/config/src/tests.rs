#[cfg(test)]
mod config_tests {
    use crate::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.instance, "0");
        assert_eq!(config.metrics.interval_seconds, 60);
        // maxage must cover at least two emission intervals
        assert!(config.health.maxage_seconds >= config.metrics.interval_seconds * 2);
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
instance = "2"

[amqp]
url = "amqp://broker:5672"

[metrics]
prefix = "dev.warehouse.event"
interval_seconds = 30
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.instance, "2");
        assert_eq!(config.amqp.url, "amqp://broker:5672");
        assert_eq!(config.metrics.prefix, "dev.warehouse.event");
        assert_eq!(config.metrics.interval_seconds, 30);
        // untouched sections fall back to defaults
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.warehouse.archive_service, "brainlife/app-archive");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = AppConfig::load(Some("/nonexistent/warehouse.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_small_maxage() {
        let mut config = AppConfig::default();
        config.metrics.interval_seconds = 60;
        config.health.maxage_seconds = 100;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("maxage_seconds"));
    }

    #[test]
    fn test_validate_rejects_slack_without_token() {
        let mut config = AppConfig::default();
        config.slack.enabled = true;
        config.slack.token = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_validator_datatypes() {
        let config = ValidatorConfig::default();
        assert_eq!(
            config.datatypes.get("58c33bcee13a50849b25879a").unwrap(),
            "brain-life/validator-neuro-anat"
        );
        assert!(!config.enabled);
    }
}
