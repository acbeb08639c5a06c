#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use tempfile::TempDir;
use vidbatch_core::{DatasetRecord, JobId, JobRequest};
use vidbatch_engine::{
    EngineEvent, Extraction, ExtractionError, ExtractionKind, Extractor, ProgressSink,
    ProviderError, ProxyPool, ProxyProvider, ResultSink, SinkError, StatusChannel,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(vidbatch_logging::initialize_for_tests);
}

pub fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|u| u.to_string()).collect()
}

/// Writes an executable `yt-dlp` shell script with the given body.
#[cfg(unix)]
pub fn fake_ytdlp(bin_dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = bin_dir.join("yt-dlp");
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[derive(Debug, Clone)]
pub enum Scripted {
    /// Writes `{title}.{ext}` into the extractor's directory and reports it.
    Download {
        title: Option<String>,
        ext: String,
        bytes: Vec<u8>,
    },
    /// Reports success without any file.
    NoFile,
    /// Reports a path that does not exist.
    MissingFile,
    Fail(ExtractionError),
}

impl Scripted {
    pub fn video(title: &str) -> Self {
        Scripted::Download {
            title: Some(title.to_string()),
            ext: "mp4".to_string(),
            bytes: b"not really a video".to_vec(),
        }
    }

    pub fn fail(message: &str) -> Self {
        Scripted::Fail(ExtractionError::new(ExtractionKind::AccessRestricted, message))
    }
}

/// Extractor double: per-URL outcome and delay, remembers every request.
pub struct ScriptedExtractor {
    pub dir: TempDir,
    script: HashMap<String, (Duration, Scripted)>,
    seen: Mutex<Vec<JobRequest>>,
    written: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            script: HashMap::new(),
            seen: Mutex::new(Vec::new()),
            written: AtomicUsize::new(0),
        }
    }

    pub fn on(mut self, url: &str, delay_ms: u64, outcome: Scripted) -> Self {
        self.script
            .insert(url.to_string(), (Duration::from_millis(delay_ms), outcome));
        self
    }

    pub fn seen(&self) -> Vec<JobRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn files_left(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

#[async_trait::async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(
        &self,
        _job_id: JobId,
        request: &JobRequest,
        _sink: &dyn ProgressSink,
    ) -> Result<Extraction, ExtractionError> {
        self.seen.lock().unwrap().push(request.clone());
        let (delay, outcome) = self
            .script
            .get(&request.source_url)
            .cloned()
            .unwrap_or((Duration::ZERO, Scripted::NoFile));
        tokio::time::sleep(delay).await;

        match outcome {
            Scripted::Download { title, ext, bytes } => {
                let name = format!("{}.{}", title.as_deref().unwrap_or("untitled"), ext);
                // Every extraction owns its file, as the real extractors guarantee.
                let name = format!("{}-{}", self.written.fetch_add(1, Ordering::SeqCst), name);
                let path = self.dir.path().join(name);
                std::fs::write(&path, bytes).unwrap();
                Ok(Extraction {
                    title,
                    uploader: Some("someone".to_string()),
                    duration_seconds: Some(42.0),
                    content_location: Some(path),
                })
            }
            Scripted::NoFile => Ok(Extraction {
                title: Some("ghost".to_string()),
                ..Extraction::default()
            }),
            Scripted::MissingFile => Ok(Extraction {
                title: Some("ghost".to_string()),
                content_location: Some(self.dir.path().join("never-written.mp4")),
                ..Extraction::default()
            }),
            Scripted::Fail(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub key: String,
    pub len: usize,
    pub content_type: String,
}

#[derive(Default)]
pub struct RecordingSink {
    pub records: Mutex<Vec<DatasetRecord>>,
    pub blobs: Mutex<Vec<StoredBlob>>,
    pub fail_append: bool,
    pub fail_blob: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_append() -> Self {
        Self {
            fail_append: true,
            ..Self::default()
        }
    }

    pub fn failing_blob() -> Self {
        Self {
            fail_blob: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<DatasetRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn blobs(&self) -> Vec<StoredBlob> {
        self.blobs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ResultSink for RecordingSink {
    async fn append_record(&self, record: &DatasetRecord) -> Result<(), SinkError> {
        if self.fail_append {
            return Err(SinkError::Unavailable("dataset is read-only".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn store_blob(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SinkError> {
        if self.fail_blob {
            return Err(SinkError::Unavailable("store is full".to_string()));
        }
        self.blobs.lock().unwrap().push(StoredBlob {
            key: key.to_string(),
            len: bytes.len(),
            content_type: content_type.to_string(),
        });
        Ok(format!("https://store.example/records/{key}"))
    }
}

#[derive(Default)]
pub struct RecordingStatus {
    pub updates: Mutex<Vec<String>>,
    pub finished: Mutex<Option<String>>,
}

impl RecordingStatus {
    pub fn updates(&self) -> Vec<String> {
        self.updates.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Option<String> {
        self.finished.lock().unwrap().clone()
    }
}

impl StatusChannel for RecordingStatus {
    fn set_status(&self, message: &str) {
        self.updates.lock().unwrap().push(message.to_string());
    }

    fn finish(&self, message: &str) {
        *self.finished.lock().unwrap() = Some(message.to_string());
    }
}

/// Pool whose providers number their endpoints; can refuse to open.
#[derive(Default)]
pub struct CountingProxyPool {
    pub refuse: bool,
    pub opened: AtomicUsize,
}

impl CountingProxyPool {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl ProxyPool for CountingProxyPool {
    async fn provider(&self, group: &str) -> Result<Box<dyn ProxyProvider>, ProviderError> {
        if self.refuse {
            return Err(ProviderError::new(group, "permission denied"));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingProvider {
            group: group.to_string(),
            next: AtomicUsize::new(0),
        }))
    }
}

struct CountingProvider {
    group: String,
    next: AtomicUsize,
}

#[async_trait::async_trait]
impl ProxyProvider for CountingProvider {
    async fn next_endpoint(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("http://{}-{}.proxy.test:8000", self.group, n)
    }
}

/// Collects progress events forwarded by the orchestrator.
#[derive(Default)]
pub struct CollectingProgress {
    pub events: Mutex<Vec<EngineEvent>>,
}

impl ProgressSink for CollectingProgress {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
