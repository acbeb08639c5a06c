use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use vidbatch_core::{DatasetRecord, JobId, JobRequest, JobResult};
use vidbatch_logging::{batch_error, batch_info, batch_warn};

use crate::content_type::guess_content_type;
use crate::filename::storage_key;
use crate::{
    EngineEvent, Extraction, ExtractionError, Extractor, JobProgress, ProgressSink, ResultSink,
    SinkError, Stage,
};

/// Where a successful job leaves the retrieved bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistMode {
    /// Keep the file where the extractor put it and record its path.
    #[default]
    LocalPath,
    /// Upload into the sink's blob store, record the public URL, remove the local file.
    UploadBlob,
}

/// Job-internal failures. They end up as the failure record's message.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("extraction failed ({0})")]
    Extraction(#[from] ExtractionError),
    #[error("extraction finished but produced no retrievable file")]
    MissingContent,
    #[error("could not read downloaded file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("upload failed: {0}")]
    Storage(SinkError),
}

/// One URL's end-to-end processing.
#[derive(Clone)]
pub struct DownloadJob {
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn ResultSink>,
    mode: PersistMode,
}

impl DownloadJob {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn ResultSink>,
        mode: PersistMode,
    ) -> Self {
        Self {
            extractor,
            sink,
            mode,
        }
    }

    /// Runs the job and records its outcome.
    ///
    /// Only a failing dataset append is returned as `Err`; every other
    /// failure becomes a [`JobResult::Failure`].
    pub async fn execute(
        &self,
        job_id: JobId,
        request: &JobRequest,
        progress: &dyn ProgressSink,
    ) -> Result<JobResult, SinkError> {
        batch_info!(
            "job {} starting {} with quality {}",
            job_id,
            request.source_url,
            request.quality
        );
        progress.emit(EngineEvent::Progress(JobProgress::stage(job_id, Stage::Downloading)));

        let result = match self.retrieve(job_id, request, progress).await {
            Ok(result) => result,
            Err(err) => {
                batch_error!("job {} {} failed: {}", job_id, request.source_url, err);
                JobResult::failure(&request.source_url, err.to_string())
            }
        };

        progress.emit(EngineEvent::Progress(JobProgress::stage(job_id, Stage::Recording)));
        self.sink.append_record(&DatasetRecord::from(&result)).await?;
        progress.emit(EngineEvent::Progress(JobProgress::stage(job_id, Stage::Done)));
        Ok(result)
    }

    async fn retrieve(
        &self,
        job_id: JobId,
        request: &JobRequest,
        progress: &dyn ProgressSink,
    ) -> Result<JobResult, JobError> {
        let extraction = self.extractor.extract(job_id, request, progress).await?;
        let Extraction {
            title,
            uploader,
            duration_seconds,
            content_location,
        } = extraction;

        let path = content_location
            .filter(|path| path.is_file())
            .ok_or(JobError::MissingContent)?;
        batch_info!("job {} downloaded {:?}", job_id, path);

        let location = match self.mode {
            PersistMode::LocalPath => path.to_string_lossy().into_owned(),
            PersistMode::UploadBlob => {
                progress.emit(EngineEvent::Progress(JobProgress::stage(job_id, Stage::Uploading)));
                let uploaded = self.upload(&path, title.as_deref()).await;
                remove_local(job_id, &path).await;
                uploaded?
            }
        };

        Ok(JobResult::Success {
            source_url: request.source_url.clone(),
            title,
            uploader,
            duration_seconds,
            location,
        })
    }

    async fn upload(&self, path: &Path, title: Option<&str>) -> Result<String, JobError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| JobError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path.extension().and_then(|ext| ext.to_str());
        let key = storage_key(title, extension);
        let content_type = guess_content_type(path);
        self.sink
            .store_blob(&key, bytes, content_type)
            .await
            .map_err(JobError::Storage)
    }
}

/// The local copy is transient in upload mode, whether the upload worked or not.
async fn remove_local(job_id: JobId, path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        batch_warn!("job {} could not remove {:?}: {}", job_id, path, err);
    }
}
