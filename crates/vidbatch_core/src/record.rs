use serde::{Deserialize, Serialize};

use crate::JobResult;

/// One dataset entry per processed URL.
///
/// Absent fields serialize as `null` so every record has the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub video_url: String,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<f64>,
    pub location: Option<String>,
    pub error: Option<String>,
}

impl From<&JobResult> for DatasetRecord {
    fn from(result: &JobResult) -> Self {
        match result {
            JobResult::Success {
                source_url,
                title,
                uploader,
                duration_seconds,
                location,
            } => DatasetRecord {
                video_url: source_url.clone(),
                title: title.clone(),
                uploader: uploader.clone(),
                duration: *duration_seconds,
                location: Some(location.clone()),
                error: None,
            },
            JobResult::Failure {
                source_url,
                error_message,
            } => DatasetRecord {
                video_url: source_url.clone(),
                title: None,
                uploader: None,
                duration: None,
                location: None,
                error: Some(error_message.clone()),
            },
        }
    }
}
