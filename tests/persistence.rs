use rowview::shared::columns::{ColumnSchema, ColumnSummary, MemoryChunk};
use rowview::transform::TransformKind;
use rowview::{ConfigError, MissingPolicy, RowView, ViewConfig, ViewError};
use std::fs;

fn schema() -> Vec<ColumnSchema> {
    vec![
        ColumnSchema::categorical("grade", vec!["a".into(), "b".into(), "c".into()]),
        ColumnSchema::binary("smoker", ColumnSummary::new(0.25, 0.5, 0.0, 1.0)),
        ColumnSchema::numeric("dose", ColumnSummary::new(2.0, 4.0, 0.0, 16.0)),
        ColumnSchema::numeric("outcome", ColumnSummary::new(0.5, 0.5, 0.0, 1.0)),
    ]
}

#[test]
fn config_file_rebuilds_the_same_view() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("view.toml");
    let config = ViewConfig {
        missing_bucket: true,
        binary_columns: true,
        missing: MissingPolicy::Propagate,
        predictor_transform: TransformKind::Descale,
        ..ViewConfig::default()
    };
    config.save(&path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("missing = \"propagate\""));
    assert!(text.contains("predictor_transform = \"descale\""));

    let loaded = ViewConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    let original = RowView::new(&schema(), &config).unwrap();
    let rebuilt = RowView::new(&schema(), &loaded).unwrap();
    assert_eq!(original, rebuilt);
    assert_eq!(
        rebuilt.output_feature_names(),
        vec!["grade.b", "grade.c", "grade.missing(NA)", "smoker", "dose", "Intercept"]
    );
}

#[test]
fn malformed_config_files_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "predictor_transform = \"whiten\"\n").unwrap();
    assert!(matches!(ViewConfig::load(&path), Err(ConfigError::TomlParseError(_))));

    let missing = dir.path().join("absent.toml");
    assert!(matches!(ViewConfig::load(&missing), Err(ConfigError::IoError(_))));

    let err: ViewError = ViewConfig::load(&missing).unwrap_err().into();
    assert!(err.to_string().starts_with("Configuration error:"));
}

#[test]
fn configured_view_survives_json_round_trip() {
    let view = RowView::new(&schema(), &ViewConfig::default())
        .unwrap()
        .for_validation();
    let json = serde_json::to_string(&view).unwrap();
    let restored: RowView = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, view);
    assert!(restored.is_validation());

    let chunks = vec![
        MemoryChunk::categorical([Some(2), Some(5)]),
        MemoryChunk::numeric(vec![1.0, 0.0]),
        MemoryChunk::numeric(vec![6.0, 2.0]),
        MemoryChunk::numeric(vec![1.0, 0.0]),
    ];
    let before = view.extract_dense_rows(&chunks).unwrap();
    let after = restored.extract_dense_rows(&chunks).unwrap();
    assert_eq!(before, after);
    // Level 5 was never seen in training.
    assert!(after[1].bins().is_empty());
}
