use std::sync::Arc;

use tokio::sync::mpsc;
use vidbatch_core::{
    final_status, progress_line, ConfigurationError, JobId, JobRequest, RunInput, RunSummary,
};
use vidbatch_logging::{batch_debug, batch_info, batch_trace};

use crate::extract::ChannelProgressSink;
use crate::{
    DownloadJob, EngineEvent, Extractor, JobProgress, PersistMode, ProgressSink, ProxyPool,
    ProxyProvider, ResultSink, RunError, Stage, StatusChannel,
};

/// Runs one job per URL concurrently and aggregates results as they finish.
pub struct Orchestrator {
    extractor: Arc<dyn Extractor>,
    proxies: Arc<dyn ProxyPool>,
    sink: Arc<dyn ResultSink>,
    status: Arc<dyn StatusChannel>,
    mode: PersistMode,
    observer: Option<Arc<dyn ProgressSink>>,
}

impl Orchestrator {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        proxies: Arc<dyn ProxyPool>,
        sink: Arc<dyn ResultSink>,
        status: Arc<dyn StatusChannel>,
        mode: PersistMode,
    ) -> Self {
        Self {
            extractor,
            proxies,
            sink,
            status,
            mode,
            observer: None,
        }
    }

    /// Receives every per-job progress event seen by the run loop.
    pub fn with_progress_observer(mut self, observer: Arc<dyn ProgressSink>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub async fn run_input(&self, input: &RunInput) -> Result<RunSummary, RunError> {
        self.run(&input.video_urls, &input.quality, input.proxy_group())
            .await
    }

    pub async fn run(
        &self,
        source_urls: &[String],
        quality: &str,
        proxy_group: Option<&str>,
    ) -> Result<RunSummary, RunError> {
        if source_urls.is_empty() {
            return Err(ConfigurationError::EmptyUrlList.into());
        }

        let provider = match proxy_group {
            Some(group) => {
                batch_info!("Using {} proxies.", group);
                Some(self.proxies.provider(group).await?)
            }
            None => {
                batch_info!("Proxy is disabled.");
                None
            }
        };
        let requests = draw_requests(source_urls, quality, provider.as_deref()).await;

        let total = requests.len();
        batch_info!("Starting download of {} videos.", total);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let job = DownloadJob::new(self.extractor.clone(), self.sink.clone(), self.mode);
        for (index, request) in requests.into_iter().enumerate() {
            let job_id = index as JobId + 1;
            let job = job.clone();
            let tx = tx.clone();
            let _ = tx.send(EngineEvent::Progress(JobProgress::stage(job_id, Stage::Queued)));
            tokio::spawn(async move {
                let progress = ChannelProgressSink::new(tx.clone());
                let result = job.execute(job_id, &request, &progress).await;
                let _ = tx.send(EngineEvent::JobCompleted { job_id, result });
            });
        }
        drop(tx);

        let mut summary = RunSummary::new(total);
        while !summary.is_complete() {
            let Some(event) = rx.recv().await else {
                return Err(RunError::JobLost {
                    processed: summary.processed,
                    total,
                });
            };
            match event {
                EngineEvent::Progress(progress) => {
                    batch_trace!(
                        "job {} {:?} {:?}%",
                        progress.job_id,
                        progress.stage,
                        progress.percent
                    );
                    if let Some(observer) = &self.observer {
                        observer.emit(EngineEvent::Progress(progress));
                    }
                }
                EngineEvent::JobCompleted { job_id, result } => {
                    let result = result?;
                    summary.record(&result);
                    batch_debug!("job {} reported after {} others", job_id, summary.processed - 1);
                    self.status.set_status(&progress_line(&summary, &result));
                }
            }
        }

        self.status.finish(&final_status(&summary));
        Ok(summary)
    }
}

/// One endpoint per URL, drawn up front so no job ever re-draws.
async fn draw_requests(
    source_urls: &[String],
    quality: &str,
    provider: Option<&dyn ProxyProvider>,
) -> Vec<JobRequest> {
    let mut requests = Vec::with_capacity(source_urls.len());
    for url in source_urls {
        let endpoint = match provider {
            Some(provider) => Some(provider.next_endpoint().await),
            None => None,
        };
        requests.push(JobRequest::new(url.as_str(), quality, endpoint));
    }
    requests
}
