use anyhow::Result;
use serde_json::json;
use tempfile::TempDir;
use trove_archive::{ArchiveFormat, WriteMode};
use trove_config::{BatchSettings, ConfigError};

#[test]
fn settings_deserialize_with_defaults_for_missing_fields() -> Result<()> {
    let settings: BatchSettings = serde_json::from_value(json!({
        "source_root": "/srv/archive/src",
        "destination_root": "/srv/archive/out",
        "format": "zip",
        "concurrency": 3,
        "start_at": "2024-02-01",
        "limit": 5
    }))?;
    let config = settings.validate()?;
    assert_eq!(config.format, ArchiveFormat::Zip);
    assert_eq!(config.concurrency.get(), 3);
    assert_eq!(config.start_at.as_deref(), Some("2024-02-01"));
    assert_eq!(config.limit, Some(5));
    assert_eq!(config.options.write_mode, WriteMode::Direct);
    assert_eq!(config.options.compression_level, 6);
    Ok(())
}

#[test]
fn unknown_fields_are_rejected() {
    let result = serde_json::from_value::<BatchSettings>(json!({ "goroutines": 4 }));
    assert!(result.is_err());
}

#[test]
fn invalid_values_fail_before_any_work() {
    let cases = [
        (
            BatchSettings {
                format: "rar".into(),
                ..BatchSettings::default()
            },
            "format",
        ),
        (
            BatchSettings {
                concurrency: 0,
                ..BatchSettings::default()
            },
            "concurrency",
        ),
        (
            BatchSettings {
                limit: Some(-1),
                ..BatchSettings::default()
            },
            "limit",
        ),
        (
            BatchSettings {
                compression_level: Some(11),
                ..BatchSettings::default()
            },
            "compression_level",
        ),
        (
            BatchSettings {
                source_root: "".into(),
                ..BatchSettings::default()
            },
            "source_root",
        ),
    ];
    for (settings, field) in cases {
        let err = settings.validate().err();
        assert_eq!(err.as_ref().and_then(ConfigError::field), Some(field));
    }
}

#[test]
fn destination_inside_source_is_rejected() -> Result<()> {
    let temp = TempDir::new()?;
    let settings = BatchSettings {
        source_root: temp.path().join("src"),
        destination_root: temp.path().join("src").join("..").join("src").join("out"),
        ..BatchSettings::default()
    };
    let err = settings.validate().err();
    assert!(matches!(
        err,
        Some(ConfigError::InvalidField {
            field: "destination_root",
            reason: "inside_source_root",
            ..
        })
    ));
    Ok(())
}

#[test]
fn relative_roots_resolve_without_touching_the_working_directory() -> Result<()> {
    let before = std::env::current_dir()?;
    let settings = BatchSettings {
        source_root: "data/src".into(),
        destination_root: "./data/out".into(),
        ..BatchSettings::default()
    };
    let config = settings.validate()?;
    assert_eq!(config.source_root, before.join("data").join("src"));
    assert_eq!(config.destination_root, before.join("data").join("out"));
    assert_eq!(std::env::current_dir()?, before);
    Ok(())
}
