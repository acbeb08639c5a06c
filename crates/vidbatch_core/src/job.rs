pub type JobId = u64;

/// One URL's unit of work. Built once per input URL before any job starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub source_url: String,
    pub quality: String,
    pub proxy_endpoint: Option<String>,
}

impl JobRequest {
    pub fn new(
        source_url: impl Into<String>,
        quality: impl Into<String>,
        proxy_endpoint: Option<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            quality: quality.into(),
            proxy_endpoint,
        }
    }
}

/// Outcome of one job. Produced exactly once per [`JobRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum JobResult {
    Success {
        source_url: String,
        title: Option<String>,
        uploader: Option<String>,
        duration_seconds: Option<f64>,
        /// Local path or public retrieval URL.
        location: String,
    },
    Failure {
        source_url: String,
        error_message: String,
    },
}

impl JobResult {
    pub fn failure(source_url: impl Into<String>, error_message: impl Into<String>) -> Self {
        JobResult::Failure {
            source_url: source_url.into(),
            error_message: error_message.into(),
        }
    }

    pub fn source_url(&self) -> &str {
        match self {
            JobResult::Success { source_url, .. } | JobResult::Failure { source_url, .. } => {
                source_url
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            JobResult::Failure { error_message, .. } => Some(error_message),
            JobResult::Success { .. } => None,
        }
    }
}
