//! Loading engine configuration from disk.

use std::io::Write;

use markguard_core::{EngineConfig, MarkGuardError};

#[test]
fn partial_file_keeps_defaults_for_everything_else() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[retry]
max_rewrite = 1

[risk.anchors]
phonetic = [[0.0, 0.0], [80.0, 0.6], [100.0, 1.0]]
"#
    )
    .unwrap();

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.retry.max_rewrite, 1);
    assert_eq!(config.retry.max_web_search, 3);
    assert_eq!(config.risk.anchors.phonetic.anchors().len(), 3);
    assert_eq!(config.risk.anchors.visual, EngineConfig::default().risk.anchors.visual);
    assert_eq!(config.precedent.top_k, 5);
}

#[test]
fn invalid_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[risk.risk_threshold]\nhigh = 1.5").unwrap();
    assert!(matches!(
        EngineConfig::load(file.path()),
        Err(MarkGuardError::InvalidConfig(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        EngineConfig::load(dir.path().join("absent.toml")),
        Err(MarkGuardError::Io(_))
    ));
}
