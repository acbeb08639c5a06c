mod common;

use std::fs;

use common::init_logging;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vidbatch_core::{DatasetRecord, JobResult};
use vidbatch_engine::{FsResultSink, FsSinkSettings, ResultSink, SinkError};

fn record(url: &str) -> DatasetRecord {
    DatasetRecord::from(&JobResult::failure(url, "boom"))
}

fn dataset_files(settings: &FsSinkSettings) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(settings.dataset_dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn records_are_numbered_and_numbering_continues_after_reopen() {
    init_logging();
    let root = TempDir::new().unwrap();
    let settings = FsSinkSettings::with_root(root.path().to_path_buf());

    let sink = FsResultSink::open(settings.clone()).unwrap();
    sink.append_record(&record("https://x/a")).await.unwrap();
    sink.append_record(&record("https://x/b")).await.unwrap();
    drop(sink);

    let reopened = FsResultSink::open(settings.clone()).unwrap();
    reopened.append_record(&record("https://x/c")).await.unwrap();

    assert_eq!(
        dataset_files(&settings),
        vec!["000000001.json", "000000002.json", "000000003.json"]
    );

    let third = fs::read_to_string(settings.dataset_dir().join("000000003.json")).unwrap();
    let parsed: DatasetRecord = serde_json::from_str(&third).unwrap();
    assert_eq!(parsed, record("https://x/c"));
    let raw: serde_json::Value = serde_json::from_str(&third).unwrap();
    assert_eq!(raw["video_url"], "https://x/c");
    assert!(raw["title"].is_null());
}

#[tokio::test]
async fn blob_is_stored_with_metadata_and_file_url() {
    init_logging();
    let root = TempDir::new().unwrap();
    let settings = FsSinkSettings::with_root(root.path().to_path_buf());
    let sink = FsResultSink::open(settings.clone()).unwrap();

    let url = sink
        .store_blob("Cat-Video-abc.mp4", b"bytes".to_vec(), "video/mp4")
        .await
        .unwrap();

    let stored = settings.key_value_store_dir().join("Cat-Video-abc.mp4");
    assert_eq!(fs::read(&stored).unwrap(), b"bytes");
    assert!(url.starts_with("file://"));
    assert!(url.ends_with("/key_value_stores/default/Cat-Video-abc.mp4"));

    let metadata: serde_json::Value = serde_json::from_slice(
        &fs::read(
            settings
                .key_value_store_dir()
                .join("Cat-Video-abc.mp4.__metadata__.json"),
        )
        .unwrap(),
    )
    .unwrap();
    assert_eq!(metadata["key"], "Cat-Video-abc.mp4");
    assert_eq!(metadata["contentType"], "video/mp4");
}

#[tokio::test]
async fn public_base_url_is_used_when_configured() {
    init_logging();
    let root = TempDir::new().unwrap();
    let settings = FsSinkSettings {
        public_base_url: Some("https://cdn.example/records/".to_string()),
        ..FsSinkSettings::with_root(root.path().to_path_buf())
    };
    let sink = FsResultSink::open(settings).unwrap();

    let url = sink
        .store_blob("clip.webm", b"x".to_vec(), "video/webm")
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.example/records/clip.webm");
}

#[tokio::test]
async fn invalid_keys_are_refused_without_writing() {
    init_logging();
    let root = TempDir::new().unwrap();
    let settings = FsSinkSettings::with_root(root.path().to_path_buf());
    let sink = FsResultSink::open(settings.clone()).unwrap();

    let err = sink
        .store_blob("../escape.mp4", b"x".to_vec(), "video/mp4")
        .await
        .unwrap_err();
    assert!(matches!(err, SinkError::InvalidKey(_)));
    assert_eq!(
        fs::read_dir(settings.key_value_store_dir()).unwrap().count(),
        0
    );
}
