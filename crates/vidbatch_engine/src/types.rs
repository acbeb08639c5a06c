use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use vidbatch_core::{ConfigurationError, JobId, JobResult};

use crate::persist::PersistError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queued,
    Downloading,
    Uploading,
    Recording,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub stage: Stage,
    pub percent: Option<f32>,
    pub bytes: Option<u64>,
}

impl JobProgress {
    pub fn stage(job_id: JobId, stage: Stage) -> Self {
        Self {
            job_id,
            stage,
            percent: None,
            bytes: None,
        }
    }
}

#[derive(Debug)]
pub enum EngineEvent {
    Progress(JobProgress),
    /// `Err` only carries a record-keeping failure; job failures are data.
    JobCompleted {
        job_id: JobId,
        result: Result<JobResult, SinkError>,
    },
}

/// What an extractor hands back after retrieving one video.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub duration_seconds: Option<f64>,
    pub content_location: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionError {
    pub kind: ExtractionKind,
    pub message: String,
}

impl ExtractionError {
    pub fn new(kind: ExtractionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ExtractionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionKind {
    InvalidUrl,
    ToolNotFound,
    Unsupported,
    AccessRestricted,
    FormatUnavailable,
    HttpStatus(u16),
    Timeout,
    TooLarge,
    Network,
    Parse,
    Process,
    Io,
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionKind::InvalidUrl => write!(f, "invalid url"),
            ExtractionKind::ToolNotFound => write!(f, "extractor not found"),
            ExtractionKind::Unsupported => write!(f, "unsupported source"),
            ExtractionKind::AccessRestricted => write!(f, "access restricted"),
            ExtractionKind::FormatUnavailable => write!(f, "format unavailable"),
            ExtractionKind::HttpStatus(code) => write!(f, "http status {code}"),
            ExtractionKind::Timeout => write!(f, "timeout"),
            ExtractionKind::TooLarge => write!(f, "content too large"),
            ExtractionKind::Network => write!(f, "network error"),
            ExtractionKind::Parse => write!(f, "unreadable extractor output"),
            ExtractionKind::Process => write!(f, "extractor failed"),
            ExtractionKind::Io => write!(f, "io error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("proxy provider unavailable for group '{group}': {message}")]
pub struct ProviderError {
    pub group: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(group: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Run-level failures. Each one stops the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("result sink failed: {0}")]
    Sink(#[from] SinkError),
    #[error("job results lost: {processed}/{total} reported before the channel closed")]
    JobLost { processed: usize, total: usize },
}
