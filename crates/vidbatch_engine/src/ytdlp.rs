//! `yt-dlp` process adapter.
//!
//! Each job downloads into its own staging directory below the output
//! directory. The finished file is moved up into the output directory; the
//! staging directory, including any `.part` leftovers, is removed whether the
//! download succeeded or not.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use vidbatch_core::{JobId, JobRequest};
use vidbatch_logging::{batch_debug, batch_info};

use crate::persist::{ensure_storage_dir, move_into};
use crate::{
    EngineEvent, Extraction, ExtractionError, ExtractionKind, Extractor, JobProgress,
    ProgressSink, Stage,
};

/// Number of stderr lines kept for the failure message when no `ERROR:` line shows up.
const STDERR_TAIL: usize = 5;

#[derive(Debug, Clone)]
pub struct YtDlpSettings {
    pub binary: PathBuf,
    pub output_dir: PathBuf,
    pub socket_timeout_secs: Option<u32>,
    pub extra_args: Vec<String>,
}

impl YtDlpSettings {
    pub fn with_output_dir(output_dir: PathBuf) -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            output_dir,
            socket_timeout_secs: Some(30),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    settings: YtDlpSettings,
}

impl YtDlpExtractor {
    pub fn new(settings: YtDlpSettings) -> Self {
        Self { settings }
    }

    fn build_args(&self, request: &JobRequest, staging: &Path) -> Vec<String> {
        let template = staging.join("%(title)s.%(ext)s");
        let mut args = vec![
            "-f".to_string(),
            request.quality.clone(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--dump-single-json".to_string(),
            "--no-simulate".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
        ];
        if let Some(secs) = self.settings.socket_timeout_secs {
            args.push("--socket-timeout".to_string());
            args.push(secs.to_string());
        }
        if let Some(proxy) = &request.proxy_endpoint {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        args.extend(self.settings.extra_args.iter().cloned());
        args.push("--".to_string());
        args.push(request.source_url.clone());
        args
    }
}

#[async_trait::async_trait]
impl Extractor for YtDlpExtractor {
    async fn extract(
        &self,
        job_id: JobId,
        request: &JobRequest,
        sink: &dyn ProgressSink,
    ) -> Result<Extraction, ExtractionError> {
        validate_source_url(&request.source_url)?;

        ensure_storage_dir(&self.settings.output_dir)
            .map_err(|err| ExtractionError::new(ExtractionKind::Io, err.to_string()))?;
        let staging = tempfile::Builder::new()
            .prefix(".job-")
            .tempdir_in(&self.settings.output_dir)
            .map_err(|err| ExtractionError::new(ExtractionKind::Io, err.to_string()))?;

        let args = self.build_args(request, staging.path());
        batch_debug!(
            "job {} running {} {}",
            job_id,
            self.settings.binary.display(),
            args.join(" ")
        );
        if request.proxy_endpoint.is_some() {
            batch_info!("job {} uses a proxy endpoint", job_id);
        }

        let mut child = Command::new(&self.settings.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                let kind = if err.kind() == std::io::ErrorKind::NotFound {
                    ExtractionKind::ToolNotFound
                } else {
                    ExtractionKind::Process
                };
                ExtractionError::new(
                    kind,
                    format!("failed to start {}: {err}", self.settings.binary.display()),
                )
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stdout {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        };
        let read_stderr = async {
            let mut diagnostics = StderrDiagnostics::default();
            if let Some(pipe) = stderr {
                let mut lines = BufReader::new(pipe).lines();
                while let Some(line) = lines.next_line().await? {
                    if let Some(percent) = parse_progress_percent(&line) {
                        sink.emit(EngineEvent::Progress(JobProgress {
                            job_id,
                            stage: Stage::Downloading,
                            percent: Some(percent),
                            bytes: None,
                        }));
                    } else {
                        diagnostics.push(line);
                    }
                }
            }
            Ok::<_, std::io::Error>(diagnostics)
        };

        let (stdout, diagnostics, status) = tokio::join!(read_stdout, read_stderr, child.wait());
        let io = |err: std::io::Error| ExtractionError::new(ExtractionKind::Io, err.to_string());
        let stdout = stdout.map_err(io)?;
        let diagnostics = diagnostics.map_err(io)?;
        let status = status.map_err(io)?;

        if !status.success() {
            let message = diagnostics
                .message()
                .unwrap_or_else(|| format!("yt-dlp exited with {status}"));
            return Err(ExtractionError::new(classify_error(&message), message));
        }

        let info: YtDlpInfo = serde_json::from_slice(&stdout)
            .map_err(|err| ExtractionError::new(ExtractionKind::Parse, err.to_string()))?;

        let content_location = match info.downloaded_path() {
            Some(path) if path.is_file() => Some(
                move_into(&self.settings.output_dir, &path)
                    .map_err(|err| ExtractionError::new(ExtractionKind::Io, err.to_string()))?,
            ),
            _ => None,
        };

        Ok(Extraction {
            title: info.title,
            uploader: info.uploader,
            duration_seconds: info.duration,
            content_location,
        })
    }
}

fn validate_source_url(raw: &str) -> Result<(), ExtractionError> {
    let parsed = url::Url::parse(raw)
        .map_err(|err| ExtractionError::new(ExtractionKind::InvalidUrl, err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ExtractionError::new(
            ExtractionKind::InvalidUrl,
            format!("unsupported scheme '{other}'"),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    requested_downloads: Vec<RequestedDownload>,
    filepath: Option<String>,
    #[serde(rename = "_filename")]
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequestedDownload {
    filepath: Option<String>,
}

impl YtDlpInfo {
    fn downloaded_path(&self) -> Option<PathBuf> {
        self.requested_downloads
            .iter()
            .find_map(|download| download.filepath.clone())
            .or_else(|| self.filepath.clone())
            .or_else(|| self.filename.clone())
            .map(PathBuf::from)
    }
}

#[derive(Debug, Default)]
struct StderrDiagnostics {
    errors: Vec<String>,
    tail: Vec<String>,
}

impl StderrDiagnostics {
    fn push(&mut self, line: String) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if let Some(error) = trimmed.strip_prefix("ERROR:") {
            self.errors.push(error.trim().to_string());
        }
        if self.tail.len() == STDERR_TAIL {
            self.tail.remove(0);
        }
        self.tail.push(trimmed.to_string());
    }

    fn message(&self) -> Option<String> {
        if !self.errors.is_empty() {
            Some(self.errors.join("; "))
        } else if !self.tail.is_empty() {
            Some(self.tail.join("\n"))
        } else {
            None
        }
    }
}

/// Percentage from a `[download]  42.3% of 10.00MiB at ...` line.
fn parse_progress_percent(line: &str) -> Option<f32> {
    let rest = line.trim().strip_prefix("[download]")?.trim_start();
    let (number, _) = rest.split_once('%')?;
    number.trim().parse().ok()
}

fn classify_error(message: &str) -> ExtractionKind {
    let lower = message.to_ascii_lowercase();
    if lower.contains("unsupported url") || lower.contains("no video formats found") {
        return ExtractionKind::Unsupported;
    }
    if lower.contains("requested format is not available")
        || lower.contains("format is not available")
    {
        return ExtractionKind::FormatUnavailable;
    }
    if lower.contains("403")
        || lower.contains("forbidden")
        || lower.contains("private video")
        || lower.contains("sign in")
        || lower.contains("members-only")
        || lower.contains("age-restricted")
        || lower.contains("not available in your country")
    {
        return ExtractionKind::AccessRestricted;
    }
    if let Some(code) = http_error_code(&lower) {
        return ExtractionKind::HttpStatus(code);
    }
    if lower.contains("timed out") || lower.contains("timeout") {
        return ExtractionKind::Timeout;
    }
    if lower.contains("unable to download")
        || lower.contains("connection")
        || lower.contains("name resolution")
        || lower.contains("proxy")
    {
        return ExtractionKind::Network;
    }
    ExtractionKind::Process
}

fn http_error_code(lower: &str) -> Option<u16> {
    let (_, rest) = lower.split_once("http error ")?;
    rest.get(..3)?.parse().ok()
}
