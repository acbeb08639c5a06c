use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use tokio::io::AsyncWriteExt;
use vidbatch_core::{JobId, JobRequest};
use vidbatch_logging::batch_debug;

use crate::filename::local_file_name;
use crate::persist::{ensure_storage_dir, reserve_unique, PersistError};
use crate::{
    EngineEvent, Extraction, ExtractionError, ExtractionKind, Extractor, JobProgress,
    ProgressSink, Stage,
};

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub output_dir: PathBuf,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Accepted content-type prefixes; a response without a content type is accepted.
    pub allowed_content_types: Vec<String>,
}

impl HttpSettings {
    pub fn with_output_dir(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(600),
            redirect_limit: 5,
            max_bytes: 4 * 1024 * 1024 * 1024,
            allowed_content_types: vec![
                "video/".to_string(),
                "audio/".to_string(),
                "application/octet-stream".to_string(),
                "binary/octet-stream".to_string(),
            ],
        }
    }
}

/// Extractor for URLs that point straight at a media file.
///
/// The quality selector has no meaning for a single file and is ignored.
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    settings: HttpSettings,
}

impl HttpExtractor {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, proxy: Option<&str>) -> Result<reqwest::Client, ExtractionError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(
                self.settings.redirect_limit,
            ));
        if let Some(endpoint) = proxy {
            let proxy = reqwest::Proxy::all(endpoint)
                .map_err(|err| ExtractionError::new(ExtractionKind::Network, err.to_string()))?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|err| ExtractionError::new(ExtractionKind::Network, err.to_string()))
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| ct.starts_with(&allowed.to_ascii_lowercase()))
    }
}

#[async_trait::async_trait]
impl Extractor for HttpExtractor {
    async fn extract(
        &self,
        job_id: JobId,
        request: &JobRequest,
        sink: &dyn ProgressSink,
    ) -> Result<Extraction, ExtractionError> {
        let parsed = reqwest::Url::parse(&request.source_url)
            .map_err(|err| ExtractionError::new(ExtractionKind::InvalidUrl, err.to_string()))?;
        let client = self.build_client(request.proxy_endpoint.as_deref())?;

        let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::new(
                ExtractionKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_length = response.content_length();
        if let Some(len) = content_length {
            if len > self.settings.max_bytes {
                return Err(ExtractionError::new(
                    ExtractionKind::TooLarge,
                    format!("{len} bytes exceeds limit of {}", self.settings.max_bytes),
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(ExtractionError::new(
                    ExtractionKind::Unsupported,
                    format!("content type {ct} is not media"),
                ));
            }
        }

        let final_url = response.url().clone();
        let (title, extension) = name_parts(&final_url, content_type.as_deref());
        let file_name = local_file_name(title.as_deref(), &extension);

        ensure_storage_dir(&self.settings.output_dir).map_err(persist_error)?;
        let staging = tempfile::Builder::new()
            .prefix(".part-")
            .tempfile_in(&self.settings.output_dir)
            .map_err(io_error)?;
        let mut file = tokio::fs::File::from_std(staging.reopen().map_err(io_error)?);

        sink.emit(EngineEvent::Progress(JobProgress {
            job_id,
            stage: Stage::Downloading,
            percent: Some(0.0),
            bytes: Some(0),
        }));

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            written += chunk.len() as u64;
            if written > self.settings.max_bytes {
                return Err(ExtractionError::new(
                    ExtractionKind::TooLarge,
                    format!("stream exceeded limit of {} bytes", self.settings.max_bytes),
                ));
            }
            file.write_all(&chunk).await.map_err(io_error)?;
            sink.emit(EngineEvent::Progress(JobProgress {
                job_id,
                stage: Stage::Downloading,
                percent: content_length
                    .filter(|len| *len > 0)
                    .map(|len| (written as f64 / len as f64 * 100.0) as f32),
                bytes: Some(written),
            }));
        }
        file.flush().await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;
        drop(file);

        // The placeholder claims the name; persisting replaces only that.
        let target =
            reserve_unique(&self.settings.output_dir, &file_name).map_err(persist_error)?;
        if let Err(err) = staging.persist(&target) {
            let _ = std::fs::remove_file(&target);
            return Err(io_error(err.error));
        }
        batch_debug!("job {} wrote {} bytes to {:?}", job_id, written, target);

        Ok(Extraction {
            title,
            uploader: final_url.host_str().map(str::to_string),
            duration_seconds: None,
            content_location: Some(target),
        })
    }
}

/// Title and extension from the last path segment, e.g. `Cat%20Video.mp4`.
fn name_parts(url: &reqwest::Url, content_type: Option<&str>) -> (Option<String>, String) {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            url::form_urlencoded::parse(format!("n={segment}").as_bytes())
                .next()
                .map(|(_, value)| value.into_owned())
                .unwrap_or_else(|| segment.to_string())
        });

    let (stem, ext) = match segment.as_deref() {
        Some(name) => {
            let path = Path::new(name);
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string);
            let ext = path
                .extension()
                .and_then(|s| s.to_str())
                .map(str::to_ascii_lowercase);
            (stem, ext)
        }
        None => (None, None),
    };
    let ext = ext
        .or_else(|| content_type.and_then(extension_for_content_type))
        .unwrap_or_else(|| "bin".to_string());
    (stem.filter(|s| !s.trim().is_empty()), ext)
}

fn extension_for_content_type(content_type: &str) -> Option<String> {
    let ct = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match ct.as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        "video/quicktime" => "mov",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/ogg" => "ogg",
        _ => return None,
    };
    Some(ext.to_string())
}

fn io_error(err: std::io::Error) -> ExtractionError {
    ExtractionError::new(ExtractionKind::Io, err.to_string())
}

fn persist_error(err: PersistError) -> ExtractionError {
    ExtractionError::new(ExtractionKind::Io, err.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> ExtractionError {
    if err.is_timeout() {
        return ExtractionError::new(ExtractionKind::Timeout, err.to_string());
    }
    ExtractionError::new(ExtractionKind::Network, err.to_string())
}
