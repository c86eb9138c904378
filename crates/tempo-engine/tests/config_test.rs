use std::io::Write;
use tempfile::NamedTempFile;
use std::path::PathBuf;
use tempo_engine::config::loader::{ConfigError, ConfigLoader, candidate_paths};
use tempo_engine::config::schema::TempoConfig;
use tempo_engine::protocol::{Feature, Product};

#[test]
fn test_default_values() {
    let config = TempoConfig::default();
    assert_eq!(config.foundations.max_chunk_ms, 480_000);
    assert!(!config.fluency.guard_validation);
    assert_eq!(
        config.keys.key(Product::Foundations, Feature::ValidateLesson),
        "foundations.validate_lesson"
    );
    assert_eq!(
        config.keys.key(Product::FluencyBuilder, Feature::AddTime),
        "fluency_builder.add_time"
    );
}

#[tokio::test]
async fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
keys:
  foundations_time: "captures/time"
foundations:
  max_chunk_ms: 60000
fluency:
  guard_validation: true
detect:
  fluency_hosts:
    - "fluency.example.com"
    "#
    )
    .unwrap();

    let config = ConfigLoader::load_from(file.path())
        .await
        .expect("Failed to load config from file");

    assert_eq!(config.keys.foundations_time, "captures/time");
    // Unset keys keep their defaults.
    assert_eq!(config.keys.fluency_time, "fluency_builder.add_time");
    assert_eq!(config.foundations.max_chunk_ms, 60_000);
    assert!(config.fluency.guard_validation);
    assert_eq!(config.detect.fluency_hosts, vec!["fluency.example.com"]);
    assert!(config.direct.user_agent.is_none());
}

#[tokio::test]
async fn test_load_from_nonexistent_file() {
    let result =
        ConfigLoader::load_from(std::path::Path::new("/nonexistent/path/tempo.yaml")).await;
    match result {
        Err(ConfigError::Io { path, .. }) => {
            assert_eq!(path, PathBuf::from("/nonexistent/path/tempo.yaml"))
        }
        other => panic!("expected an io error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_load_from_empty_file_uses_defaults() {
    let file = NamedTempFile::new().unwrap();
    let config = ConfigLoader::load_from(file.path()).await.unwrap();
    assert_eq!(config.foundations.max_chunk_ms, 480_000);
    assert_eq!(config.keys.fluency_validation, "fluency_builder.validate_lesson");
}

#[test]
fn test_parse_rejects_shared_store_keys() {
    let err = ConfigLoader::parse(
        r#"
keys:
  fluency_time: "captured"
  foundations_time: "captured"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("captured")));
}

#[test]
fn test_parse_rejects_blank_store_key() {
    let err = ConfigLoader::parse("keys:\n  foundations_validation: \"  \"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_candidate_paths_order() {
    let paths = candidate_paths(
        Some(PathBuf::from("/etc/tempo.yaml")),
        Some(PathBuf::from("/home/u")),
    );
    assert_eq!(
        paths,
        vec![
            PathBuf::from("/etc/tempo.yaml"),
            PathBuf::from("./tempo.yaml"),
            PathBuf::from("/home/u/.tempo/config.yaml"),
        ]
    );

    let paths = candidate_paths(None, None);
    assert_eq!(paths, vec![PathBuf::from("./tempo.yaml")]);
}

#[tokio::test]
async fn test_load_from_invalid_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "foundations: [not, a, map").unwrap();
    let result = ConfigLoader::load_from(file.path()).await;
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}
