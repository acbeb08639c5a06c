use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use vidbatch_core::DatasetRecord;
use vidbatch_logging::batch_debug;

use crate::persist::{ensure_storage_dir, AtomicFileWriter};
use crate::SinkError;

const MAX_KEY_LEN: usize = 256;

/// Durable run output: an append-only dataset plus a key-value blob store.
#[async_trait::async_trait]
pub trait ResultSink: Send + Sync {
    async fn append_record(&self, record: &DatasetRecord) -> Result<(), SinkError>;

    /// Stores `bytes` under `key` and returns the URL it can be fetched from.
    async fn store_blob(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SinkError>;
}

#[derive(Debug, Clone)]
pub struct FsSinkSettings {
    pub root: PathBuf,
    pub dataset: String,
    pub key_value_store: String,
    /// Base of public blob URLs; `file://` URLs are returned when unset.
    pub public_base_url: Option<String>,
}

impl FsSinkSettings {
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            dataset: "default".to_string(),
            key_value_store: "default".to_string(),
            public_base_url: None,
        }
    }

    pub fn dataset_dir(&self) -> PathBuf {
        self.root.join("datasets").join(&self.dataset)
    }

    pub fn key_value_store_dir(&self) -> PathBuf {
        self.root.join("key_value_stores").join(&self.key_value_store)
    }
}

/// Local storage in the platform's on-disk layout:
/// `datasets/<name>/000000001.json` and `key_value_stores/<name>/<key>`.
#[derive(Debug)]
pub struct FsResultSink {
    settings: FsSinkSettings,
    records: AtomicFileWriter,
    blobs: AtomicFileWriter,
    next_index: Mutex<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlobMetadata<'a> {
    key: &'a str,
    content_type: &'a str,
}

impl FsResultSink {
    pub fn open(settings: FsSinkSettings) -> Result<Self, SinkError> {
        let dataset_dir = settings.dataset_dir();
        let store_dir = settings.key_value_store_dir();
        ensure_storage_dir(&dataset_dir)?;
        ensure_storage_dir(&store_dir)?;
        let next_index = last_record_index(&dataset_dir)? + 1;
        Ok(Self {
            records: AtomicFileWriter::new(dataset_dir),
            blobs: AtomicFileWriter::new(store_dir),
            next_index: Mutex::new(next_index),
            settings,
        })
    }

    pub fn settings(&self) -> &FsSinkSettings {
        &self.settings
    }

    fn take_index(&self) -> u64 {
        let mut next = self
            .next_index
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let index = *next;
        *next += 1;
        index
    }

    fn public_url(&self, key: &str, stored: &Path) -> Result<String, SinkError> {
        if let Some(base) = &self.settings.public_base_url {
            return Ok(format!("{}/{}", base.trim_end_matches('/'), key));
        }
        let absolute = fs::canonicalize(stored)?;
        url::Url::from_file_path(&absolute)
            .map(String::from)
            .map_err(|_| {
                SinkError::Unavailable(format!("{} is not a file url", absolute.display()))
            })
    }
}

fn last_record_index(dir: &Path) -> Result<u64, SinkError> {
    let mut last = 0;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let index = name
            .to_str()
            .and_then(|n| n.strip_suffix(".json"))
            .and_then(|stem| stem.parse::<u64>().ok());
        if let Some(index) = index {
            last = last.max(index);
        }
    }
    Ok(last)
}

fn validate_key(key: &str) -> Result<(), SinkError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!-_.'()".contains(c));
    if valid {
        Ok(())
    } else {
        Err(SinkError::InvalidKey(key.to_string()))
    }
}

async fn blocking<T, F>(work: F) -> Result<T, SinkError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SinkError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| SinkError::Unavailable(err.to_string()))?
}

#[async_trait::async_trait]
impl ResultSink for FsResultSink {
    async fn append_record(&self, record: &DatasetRecord) -> Result<(), SinkError> {
        let body = serde_json::to_vec_pretty(record)?;
        let name = format!("{:09}.json", self.take_index());
        let writer = self.records.clone();
        let path = blocking(move || Ok(writer.write(&name, &body)?)).await?;
        batch_debug!("record for {} written to {:?}", record.video_url, path);
        Ok(())
    }

    async fn store_blob(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SinkError> {
        validate_key(key)?;
        let metadata = serde_json::to_vec_pretty(&BlobMetadata { key, content_type })?;
        let writer = self.blobs.clone();
        let owned_key = key.to_string();
        let stored = blocking(move || {
            let stored = writer.write(&owned_key, &bytes)?;
            writer.write(&format!("{owned_key}.__metadata__.json"), &metadata)?;
            Ok(stored)
        })
        .await?;
        self.public_url(key, &stored)
    }
}
